use super::super::domain::{DegreeLevel, Issue};
use super::super::rules::degree_points;
use super::tables::{InstitutionVerdict, SourceVerdict};
use super::{Disqualifier, Scorecard, TrackFactor, TrackInput};

pub(super) fn ineligible_institution(input: &TrackInput<'_>) -> Option<Disqualifier> {
    let institution = input.applicant.evaluation.institution.as_ref()?;
    match input
        .tables
        .institution(input.visa_type, &institution.institution_type)
    {
        InstitutionVerdict::Ineligible(entry) => Some(Disqualifier::IneligibleInstitution {
            institution_type: institution.institution_type.clone(),
            reason: entry.note.clone(),
        }),
        _ if !institution.accredited => Some(Disqualifier::IneligibleInstitution {
            institution_type: institution.institution_type.clone(),
            reason: format!("{} is not accredited", institution.name),
        }),
        _ => None,
    }
}

pub(super) fn ineligible_employer(input: &TrackInput<'_>) -> Option<Disqualifier> {
    let institution = input.applicant.evaluation.institution.as_ref()?;
    match input
        .tables
        .institution(input.visa_type, &institution.institution_type)
    {
        InstitutionVerdict::Ineligible(entry) => Some(Disqualifier::IneligibleEmployer {
            institution_type: institution.institution_type.clone(),
            reason: entry.note.clone(),
        }),
        _ => None,
    }
}

/// Expiry of the current visa when it falls before the filing date.
pub(super) fn visa_expired(input: &TrackInput<'_>) -> Option<Disqualifier> {
    let expiry = input
        .applicant
        .evaluation
        .stay
        .as_ref()
        .and_then(|stay| stay.visa_expiry)?;
    (expiry < input.reference_date()).then_some(Disqualifier::VisaExpired { expired_on: expiry })
}

pub(super) fn disallowed_source(input: &TrackInput<'_>) -> Option<Disqualifier> {
    let current = input.applicant.evaluation.current_visa.as_deref()?;
    match input.tables.source_verdict(input.visa_type, current) {
        SourceVerdict::Disallowed => Some(Disqualifier::DisallowedSourceVisa {
            current_visa: current.trim().to_string(),
        }),
        _ => None,
    }
}

pub(super) fn nationality_outside_table(input: &TrackInput<'_>) -> Option<Disqualifier> {
    match input.nationality() {
        Some(code) if input.tables.is_native_speaker(code) => None,
        nationality => Some(Disqualifier::NationalityNotEligible {
            nationality: nationality.map(str::to_string),
        }),
    }
}

pub(super) fn criminal_record(input: &TrackInput<'_>) -> Option<Disqualifier> {
    input
        .applicant
        .evaluation
        .history
        .criminal_record
        .then_some(Disqualifier::CriminalRecord)
}

pub(super) fn degree_below(input: &TrackInput<'_>, minimum: DegreeLevel) -> Option<Disqualifier> {
    let held = input
        .applicant
        .evaluation
        .education
        .as_ref()
        .map(|education| education.highest_degree)
        .unwrap_or(DegreeLevel::NoDegree);
    (held < minimum).then_some(Disqualifier::DegreeBelowMinimum { held, minimum })
}

pub(super) fn salary_below_floor(input: &TrackInput<'_>) -> Option<Disqualifier> {
    let floor = input.tables.salary_floor(input.visa_type)?;
    let declared = input
        .applicant
        .evaluation
        .contract
        .as_ref()
        .map(|contract| contract.annual_salary)
        .unwrap_or(0);
    (declared < floor).then_some(Disqualifier::SalaryBelowFloor { declared, floor })
}

/// Institution or employer standing from the eligibility table.
pub(super) fn sponsor(
    input: &TrackInput<'_>,
    card: &mut Scorecard,
    factor: TrackFactor,
    weight: f64,
) {
    let Some(institution) = input.applicant.evaluation.institution.as_ref() else {
        card.component(factor, weight, 0.0, "sponsor not declared");
        return;
    };

    match input
        .tables
        .institution(input.visa_type, &institution.institution_type)
    {
        InstitutionVerdict::Eligible(entry) => {
            let mut score = f64::from(entry.score);
            if let Some(region) = institution.region.as_deref() {
                if input.tables.is_incentive_region(region) {
                    score += 5.0;
                    card.strength(format!("{} is in an incentivised region", institution.name));
                }
            }
            card.component(
                factor,
                weight,
                score,
                format!(
                    "{} listed as {} ({})",
                    institution.name, institution.institution_type, entry.note
                ),
            );
        }
        // Ineligible sponsors are disqualified before scoring.
        InstitutionVerdict::Ineligible(_) => {
            card.component(factor, weight, 0.0, "sponsor ineligible");
        }
        InstitutionVerdict::Unlisted => {
            card.issue(Issue::warning(format!(
                "sponsor type '{}' is not in the eligibility table",
                institution.institution_type
            )));
            card.recommend("Confirm sponsor eligibility with the immigration office");
            card.component(factor, weight, 50.0, "sponsor type not listed");
        }
    }
}

/// Degree, relevant experience, and position seniority blended 50/30/20.
pub(super) fn qualification_score(input: &TrackInput<'_>, minimum_years: f32) -> (f64, String) {
    let attributes = &input.applicant.evaluation;
    let degree = attributes
        .education
        .as_ref()
        .map(|education| education.highest_degree)
        .unwrap_or(DegreeLevel::NoDegree);
    let degree_score = degree_points(degree);

    let years = attributes
        .experience
        .as_ref()
        .map(|experience| experience.relevant_years.max(0.0))
        .unwrap_or(0.0);
    let experience_score = if minimum_years <= 0.0 || years >= minimum_years {
        (70.0 + f64::from(years - minimum_years.max(0.0)) * 10.0).min(100.0)
    } else {
        f64::from(years / minimum_years) * 60.0
    };

    let seniority = attributes
        .position
        .as_ref()
        .map(|position| f64::from(position.level.seniority_score()))
        .unwrap_or(60.0);

    let score = degree_score * 0.5 + experience_score * 0.3 + seniority * 0.2;
    let notes = format!(
        "{}, {years:.1} relevant years, seniority {seniority:.0}",
        degree.label()
    );
    (score, notes)
}

pub(super) fn qualification(
    input: &TrackInput<'_>,
    card: &mut Scorecard,
    weight: f64,
    minimum_years: f32,
) {
    let (score, notes) = qualification_score(input, minimum_years);
    if score >= 85.0 {
        card.strength(format!("strong qualifications: {notes}"));
    } else if score < 50.0 {
        card.recommend("Strengthen the qualification evidence (degree, experience, position)");
    }
    card.component(TrackFactor::Qualification, weight, score, notes);
}

pub(super) fn documentation(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let documents = input.documents;
    card.component(
        TrackFactor::Documentation,
        weight,
        f64::from(documents.score),
        format!(
            "{} of {} required slots submitted, {} invalid",
            documents.submitted_slots,
            documents.required_slots,
            documents.penalized_invalid_count()
        ),
    );
}

/// Registration, remaining validity, and violation history of the current stay.
pub(super) fn stay_compliance(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let attributes = &input.applicant.evaluation;
    let Some(stay) = attributes.stay.as_ref() else {
        card.component(TrackFactor::StayCompliance, weight, 50.0, "stay details not declared");
        return;
    };

    let mut score: f64 = match stay.visa_expiry {
        Some(expiry) => {
            let days_left = (expiry - input.reference_date()).num_days();
            if days_left < 0 {
                0.0
            } else if days_left < 30 {
                card.issue(Issue::warning(format!(
                    "current visa expires in {days_left} days"
                )));
                60.0
            } else {
                100.0
            }
        }
        None => 60.0,
    };

    let history = attributes.history;
    if history.prior_violations > 0 {
        score -= (20.0 * f64::from(history.prior_violations)).min(60.0);
    }
    if history.unresolved_violations {
        score -= 40.0;
        card.recommend("Resolve outstanding immigration violations before filing");
    }
    if !stay.registered {
        score = score.min(40.0);
        card.issue(Issue::warning("alien registration not on file"));
    }

    let notes = match stay.visa_expiry {
        Some(expiry) => format!("visa valid until {expiry}, registered: {}", stay.registered),
        None => format!("visa expiry not declared, registered: {}", stay.registered),
    };
    card.component(TrackFactor::StayCompliance, weight, score, notes);
}

/// Duration, salary, and weekly hours of the declared contract, blended 50/30/20.
pub(super) fn contract_terms(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let Some(contract) = input.applicant.evaluation.contract.as_ref() else {
        card.component(TrackFactor::Contract, weight, 30.0, "contract not declared");
        card.recommend("Attach the signed employment contract");
        return;
    };

    let minimum_months = input.tables.minimum_contract_months;
    let duration =
        (f64::from(contract.duration_months) / f64::from(minimum_months)).min(1.0) * 100.0;
    if contract.duration_months < minimum_months {
        card.issue(Issue::warning(format!(
            "contract runs {} months, {minimum_months} expected",
            contract.duration_months
        )));
    }

    let salary = match input.tables.salary_floor(input.visa_type) {
        Some(floor) if floor > 0 => {
            let ratio = contract.annual_salary as f64 / floor as f64;
            if ratio >= 1.5 {
                card.strength(format!("salary {} well above the floor", contract.annual_salary));
            }
            ratio.min(1.0) * 100.0
        }
        _ => 100.0,
    };

    let hours = match input.tables.weekly_hour_minimum(input.visa_type) {
        Some(minimum) if minimum > 0.0 => {
            if contract.weekly_hours < minimum {
                card.issue(Issue::warning(format!(
                    "{:.1} weekly hours below the {minimum:.1} hour minimum",
                    contract.weekly_hours
                )));
            }
            f64::from((contract.weekly_hours / minimum).min(1.0)) * 100.0
        }
        _ => 100.0,
    };

    if contract.exclusive {
        card.strength("exclusive employment contract");
    }

    card.component(
        TrackFactor::Contract,
        weight,
        duration * 0.5 + salary * 0.3 + hours * 0.2,
        format!(
            "{} months, salary {}, {:.1} hours/week",
            contract.duration_months, contract.annual_salary, contract.weekly_hours
        ),
    );
}

/// Continuity of the sponsoring employment since the current visa was issued.
pub(super) fn employment_continuity(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let attributes = &input.applicant.evaluation;
    let mut score: f64 = if attributes.employer_changed {
        card.recommend("Attach the release letter from the previous employer");
        65.0
    } else {
        card.strength("continuous employment with the same sponsor");
        100.0
    };

    if let Some(contract) = attributes.contract.as_ref() {
        if contract.duration_months < input.tables.minimum_contract_months {
            score -= 15.0;
        }
        if let Some(previous) = attributes.previous_annual_salary {
            if contract.annual_salary < previous {
                score -= 20.0;
                card.issue(Issue::warning(format!(
                    "salary decreased from {previous} to {}",
                    contract.annual_salary
                )));
            }
        }
    }

    let notes = if attributes.employer_changed {
        "employer changed during the current stay".to_string()
    } else {
        "same employer".to_string()
    };
    card.component(TrackFactor::EmploymentContinuity, weight, score, notes);
}

pub(super) fn source_visa(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let Some(current) = input.applicant.evaluation.current_visa.as_deref() else {
        card.component(TrackFactor::SourceVisa, weight, 0.0, "current visa not declared");
        return;
    };

    match input.tables.source_verdict(input.visa_type, current) {
        SourceVerdict::Allowed => card.component(
            TrackFactor::SourceVisa,
            weight,
            100.0,
            format!("{current} may change to {}", input.visa_type),
        ),
        SourceVerdict::Unlisted => {
            card.issue(Issue::warning(format!(
                "change from {current} to {} is discretionary",
                input.visa_type
            )));
            card.component(
                TrackFactor::SourceVisa,
                weight,
                40.0,
                format!("{current} is not listed for {}", input.visa_type),
            );
        }
        SourceVerdict::Disallowed => card.component(
            TrackFactor::SourceVisa,
            weight,
            0.0,
            format!("{current} may not change to {}", input.visa_type),
        ),
    }
}

pub(super) fn nationality(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    match input.nationality() {
        Some(code) if input.tables.is_native_speaker(code) => card.component(
            TrackFactor::Nationality,
            weight,
            100.0,
            format!("{code} is a native-speaker nationality"),
        ),
        Some(code) => card.component(
            TrackFactor::Nationality,
            weight,
            0.0,
            format!("{code} is outside the native-speaker table"),
        ),
        None => card.component(TrackFactor::Nationality, weight, 0.0, "nationality not declared"),
    }
}
