use serde::{Deserialize, Serialize};

use super::super::context::EvaluationContext;
use super::super::domain::{ApplicationType, DegreeLevel, Issue};
use super::super::error::{ConfigurationError, RuleExecutionError};
use super::super::evaluators::{InstitutionVerdict, SourceVerdict};
use super::definition::RuleOutcome;

/// Closed set of configurable rule checks. Each variant maps to one handler below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    InstitutionEligibility,
    SourceVisaCompatibility,
    StayWindow {
        #[serde(default = "default_warning_days")]
        warning_days: i64,
    },
    DegreeLevel {
        minimum: DegreeLevel,
    },
    RelevantExperience {
        minimum_years: f32,
    },
    PositionLevel,
    SalaryFloor,
    DocumentCompleteness,
    DocumentValidity,
    ImmigrationHistory,
    CriminalRecord,
    ContractStability {
        minimum_months: u32,
    },
}

fn default_warning_days() -> i64 {
    30
}

impl RuleKind {
    pub fn validate(&self, rule_id: &str) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidRuleParameters {
            rule_id: rule_id.to_string(),
            reason,
        };
        match self {
            RuleKind::StayWindow { warning_days } if *warning_days < 0 => Err(invalid(format!(
                "warning_days must not be negative (got {warning_days})"
            ))),
            RuleKind::RelevantExperience { minimum_years }
                if !minimum_years.is_finite() || *minimum_years < 0.0 =>
            {
                Err(invalid(format!(
                    "minimum_years must be a non-negative number (got {minimum_years})"
                )))
            }
            RuleKind::ContractStability { minimum_months } if *minimum_months == 0 => {
                Err(invalid("minimum_months must be positive".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Track restrictions intrinsic to the check, applied on top of the configured scope.
    pub fn applies(&self, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            RuleKind::SourceVisaCompatibility => ctx.application_type == ApplicationType::Change,
            RuleKind::StayWindow { .. } => matches!(
                ctx.application_type,
                ApplicationType::Extension | ApplicationType::Reentry
            ),
            _ => true,
        }
    }

    pub fn run(
        &self,
        rule_id: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<RuleOutcome, RuleExecutionError> {
        match self {
            RuleKind::InstitutionEligibility => Ok(institution_eligibility(ctx)),
            RuleKind::SourceVisaCompatibility => source_visa_compatibility(rule_id, ctx),
            RuleKind::StayWindow { warning_days } => stay_window(rule_id, ctx, *warning_days),
            RuleKind::DegreeLevel { minimum } => Ok(degree_level(ctx, *minimum)),
            RuleKind::RelevantExperience { minimum_years } => {
                Ok(relevant_experience(ctx, *minimum_years))
            }
            RuleKind::PositionLevel => Ok(position_level(ctx)),
            RuleKind::SalaryFloor => Ok(salary_floor(ctx)),
            RuleKind::DocumentCompleteness => Ok(document_completeness(ctx)),
            RuleKind::DocumentValidity => Ok(document_validity(ctx)),
            RuleKind::ImmigrationHistory => Ok(immigration_history(ctx)),
            RuleKind::CriminalRecord => Ok(criminal_record(ctx)),
            RuleKind::ContractStability { minimum_months } => {
                Ok(contract_stability(ctx, *minimum_months))
            }
        }
    }
}

fn institution_eligibility(ctx: &EvaluationContext<'_>) -> RuleOutcome {
    let Some(institution) = ctx.applicant.evaluation.institution.as_ref() else {
        return RuleOutcome::scored(50.0)
            .with_issue(Issue::warning("sponsoring institution not declared"))
            .with_recommendation("Declare the sponsoring institution or employer");
    };

    match ctx
        .tables
        .institution(ctx.visa_type, &institution.institution_type)
    {
        InstitutionVerdict::Eligible(entry) => {
            let mut outcome = RuleOutcome::scored(f64::from(entry.score));
            if institution.accredited {
                outcome = outcome.with_strength(format!(
                    "{} is an eligible {} sponsor ({})",
                    institution.name, ctx.visa_type, entry.note
                ));
            } else {
                outcome.score = outcome.score.min(30.0);
                outcome = outcome
                    .with_issue(Issue::warning(format!(
                        "{} has no current accreditation on file",
                        institution.name
                    )))
                    .with_recommendation("Obtain proof of the institution's accreditation");
            }
            outcome
        }
        InstitutionVerdict::Ineligible(entry) => RuleOutcome::scored(0.0).with_issue(
            Issue::critical(format!(
                "{} ({}) cannot sponsor {}: {}",
                institution.name, institution.institution_type, ctx.visa_type, entry.note
            )),
        ),
        InstitutionVerdict::Unlisted => RuleOutcome::scored(50.0)
            .with_issue(Issue::warning(format!(
                "institution type '{}' is not listed for {}",
                institution.institution_type, ctx.visa_type
            )))
            .with_recommendation("Confirm sponsor eligibility with the immigration office"),
    }
}

fn source_visa_compatibility(
    rule_id: &str,
    ctx: &EvaluationContext<'_>,
) -> Result<RuleOutcome, RuleExecutionError> {
    let current = ctx
        .applicant
        .evaluation
        .current_visa
        .as_deref()
        .ok_or_else(|| RuleExecutionError::MissingInput {
            rule_id: rule_id.to_string(),
            input: "current_visa".to_string(),
        })?;

    let outcome = match ctx.tables.source_verdict(ctx.visa_type, current) {
        SourceVerdict::Allowed => RuleOutcome::scored(100.0).with_strength(format!(
            "change of status from {current} to {} is permitted",
            ctx.visa_type
        )),
        SourceVerdict::Disallowed => RuleOutcome::scored(0.0).with_issue(Issue::critical(format!(
            "change of status from {current} to {} is not permitted",
            ctx.visa_type
        ))),
        SourceVerdict::Unlisted => RuleOutcome::scored(40.0)
            .with_issue(Issue::warning(format!(
                "change from {current} to {} is discretionary",
                ctx.visa_type
            )))
            .with_recommendation("Request a pre-filing consultation on the change of status"),
    };
    Ok(outcome)
}

fn stay_window(
    rule_id: &str,
    ctx: &EvaluationContext<'_>,
    warning_days: i64,
) -> Result<RuleOutcome, RuleExecutionError> {
    let stay = ctx.applicant.evaluation.stay.as_ref();
    let expiry = stay
        .and_then(|stay| stay.visa_expiry)
        .ok_or_else(|| RuleExecutionError::MissingInput {
            rule_id: rule_id.to_string(),
            input: "stay.visa_expiry".to_string(),
        })?;

    let days_left = (expiry - ctx.reference_date()).num_days();
    let mut outcome = if days_left < 0 {
        RuleOutcome::scored(0.0).with_issue(Issue::critical(format!(
            "current visa expired on {expiry}"
        )))
    } else if days_left < warning_days {
        RuleOutcome::scored(60.0)
            .with_issue(Issue::warning(format!(
                "current visa expires in {days_left} days"
            )))
            .with_recommendation("File before the current visa expires")
    } else {
        RuleOutcome::scored(100.0).with_strength(format!("{days_left} days of stay remaining"))
    };

    if !stay.map(|stay| stay.registered).unwrap_or(false) {
        outcome.score = outcome.score.min(50.0);
        outcome = outcome
            .with_issue(Issue::warning("alien registration not on file"))
            .with_recommendation("Register the stay or attach the alien registration card");
    }
    Ok(outcome)
}

pub(crate) fn degree_points(level: DegreeLevel) -> f64 {
    match level {
        DegreeLevel::Doctorate => 100.0,
        DegreeLevel::Master => 85.0,
        DegreeLevel::Bachelor => 70.0,
        DegreeLevel::Associate => 45.0,
        DegreeLevel::HighSchool => 25.0,
        DegreeLevel::NoDegree => 0.0,
    }
}

fn degree_level(ctx: &EvaluationContext<'_>, minimum: DegreeLevel) -> RuleOutcome {
    let Some(education) = ctx.applicant.evaluation.education.as_ref() else {
        return RuleOutcome::scored(0.0)
            .with_issue(Issue::warning("education history not declared"))
            .with_recommendation("Declare the highest completed degree");
    };

    let held = education.highest_degree;
    if held < minimum {
        return RuleOutcome::scored(degree_points(held).min(30.0))
            .with_issue(Issue::warning(format!(
                "{} is below the required {}",
                held.label(),
                minimum.label()
            )))
            .with_recommendation(format!("{} or higher is expected", minimum.label()));
    }

    let outcome = RuleOutcome::scored(degree_points(held));
    if held >= DegreeLevel::Master {
        outcome.with_strength(format!("holds a {}", held.label()))
    } else {
        outcome
    }
}

fn relevant_experience(ctx: &EvaluationContext<'_>, minimum_years: f32) -> RuleOutcome {
    let Some(experience) = ctx.applicant.evaluation.experience.as_ref() else {
        return RuleOutcome::scored(20.0)
            .with_issue(Issue::warning("work experience not declared"));
    };

    let years = experience.relevant_years.max(0.0);
    if years >= minimum_years {
        let surplus = f64::from(years - minimum_years);
        let outcome = RuleOutcome::scored((70.0 + surplus * 10.0).min(100.0));
        if surplus >= 3.0 {
            outcome.with_strength(format!("{years:.1} years of relevant experience"))
        } else {
            outcome
        }
    } else if minimum_years > 0.0 {
        RuleOutcome::scored(f64::from(years / minimum_years) * 60.0)
            .with_issue(Issue::warning(format!(
                "{years:.1} years of relevant experience, {minimum_years:.1} expected"
            )))
            .with_recommendation("Document additional relevant experience with career certificates")
    } else {
        RuleOutcome::scored(70.0)
    }
}

fn position_level(ctx: &EvaluationContext<'_>) -> RuleOutcome {
    match ctx.applicant.evaluation.position.as_ref() {
        Some(position) => {
            let score = position.level.seniority_score();
            let outcome = RuleOutcome::scored(f64::from(score));
            if score >= 90 {
                outcome.with_strength(format!("senior appointment as {}", position.title))
            } else {
                outcome
            }
        }
        None => RuleOutcome::scored(50.0).with_issue(Issue::warning("position not declared")),
    }
}

fn salary_floor(ctx: &EvaluationContext<'_>) -> RuleOutcome {
    let Some(floor) = ctx.tables.salary_floor(ctx.visa_type) else {
        return RuleOutcome::scored(100.0);
    };
    let Some(contract) = ctx.applicant.evaluation.contract.as_ref() else {
        return RuleOutcome::scored(40.0)
            .with_issue(Issue::warning("contract salary not declared"))
            .with_recommendation("Attach the employment contract with salary terms");
    };

    let salary = contract.annual_salary;
    if salary >= floor {
        let outcome = RuleOutcome::scored(100.0);
        if salary as f64 >= floor as f64 * 1.5 {
            outcome.with_strength(format!("salary {salary} well above the {floor} floor"))
        } else {
            outcome
        }
    } else {
        let ratio = if floor == 0 { 1.0 } else { salary as f64 / floor as f64 };
        RuleOutcome::scored(ratio * 60.0)
            .with_issue(Issue::critical(format!(
                "annual salary {salary} below the {} floor of {floor}",
                ctx.visa_type
            )))
            .with_recommendation("Renegotiate compensation to meet the salary floor")
    }
}

fn document_completeness(ctx: &EvaluationContext<'_>) -> RuleOutcome {
    let documents = ctx.documents;
    let mut outcome = RuleOutcome::scored(documents.completeness);
    if documents.missing.is_empty() {
        outcome = outcome.with_strength("all required documents submitted");
    }
    for missing in &documents.missing {
        outcome = outcome.with_recommendation(format!("Submit {}", missing.id));
    }
    outcome
}

fn document_validity(ctx: &EvaluationContext<'_>) -> RuleOutcome {
    let documents = ctx.documents;
    let mut outcome = RuleOutcome::scored(f64::from(documents.score));
    for invalid in documents.invalid.iter().filter(|invalid| !invalid.optional) {
        outcome = outcome.with_issue(Issue::warning(format!(
            "{} failed validation: {}",
            invalid.document,
            invalid.reasons.join("; ")
        )));
    }
    outcome
}

fn immigration_history(ctx: &EvaluationContext<'_>) -> RuleOutcome {
    let history = ctx.applicant.evaluation.history;
    if history.is_clean() {
        return RuleOutcome::scored(100.0).with_strength("clean immigration history");
    }

    let mut score = 100.0;
    let mut outcome = RuleOutcome::default();
    if history.unresolved_violations {
        score -= 60.0;
        outcome = outcome
            .with_issue(Issue::critical("unresolved immigration violations"))
            .with_recommendation("Resolve outstanding violations before filing");
    }
    if history.prior_violations > 0 {
        score -= (15.0 * f64::from(history.prior_violations)).min(45.0);
        outcome = outcome.with_issue(Issue::warning(format!(
            "{} prior immigration violation(s)",
            history.prior_violations
        )));
    }
    if history.prior_refusals > 0 {
        score -= (10.0 * f64::from(history.prior_refusals)).min(30.0);
        outcome = outcome.with_issue(Issue::warning(format!(
            "{} prior visa refusal(s)",
            history.prior_refusals
        )));
    }
    if history.tax_arrears {
        score -= 25.0;
        outcome = outcome
            .with_issue(Issue::warning("outstanding tax arrears"))
            .with_recommendation("Settle tax arrears and attach the tax payment certificate");
    }
    outcome.score = score;
    outcome
}

fn criminal_record(ctx: &EvaluationContext<'_>) -> RuleOutcome {
    if ctx.applicant.evaluation.history.criminal_record {
        RuleOutcome::scored(0.0)
            .with_issue(Issue::critical("criminal record declared"))
            .with_recommendation("Obtain legal advice on the criminal record before filing")
    } else {
        RuleOutcome::scored(100.0)
    }
}

fn contract_stability(ctx: &EvaluationContext<'_>, minimum_months: u32) -> RuleOutcome {
    let Some(contract) = ctx.applicant.evaluation.contract.as_ref() else {
        return RuleOutcome::scored(40.0).with_issue(Issue::warning("contract terms not declared"));
    };

    let mut outcome = if contract.duration_months >= minimum_months {
        RuleOutcome::scored(100.0)
    } else {
        RuleOutcome::scored(f64::from(contract.duration_months) / f64::from(minimum_months) * 100.0)
            .with_issue(Issue::warning(format!(
                "contract runs {} months, {minimum_months} expected",
                contract.duration_months
            )))
    };

    if let Some(minimum) = ctx.tables.weekly_hour_minimum(ctx.visa_type) {
        if contract.weekly_hours < minimum {
            outcome.score -= 20.0;
            outcome = outcome.with_issue(Issue::warning(format!(
                "{:.1} weekly hours below the {minimum:.1} hour minimum",
                contract.weekly_hours
            )));
        }
    }
    if contract.exclusive {
        outcome = outcome.with_strength("exclusive employment contract");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_warning_window_is_rejected() {
        match (RuleKind::StayWindow { warning_days: -1 }).validate("stay") {
            Err(ConfigurationError::InvalidRuleParameters { rule_id, .. }) => {
                assert_eq!(rule_id, "stay")
            }
            other => panic!("expected invalid parameters, got {other:?}"),
        }
    }

    #[test]
    fn kinds_deserialize_from_tagged_objects() {
        let kind: RuleKind =
            serde_json::from_str(r#"{ "kind": "degree_level", "minimum": "master" }"#)
                .expect("parses");
        assert_eq!(
            kind,
            RuleKind::DegreeLevel {
                minimum: DegreeLevel::Master
            }
        );

        let stay: RuleKind = serde_json::from_str(r#"{ "kind": "stay_window" }"#).expect("parses");
        assert_eq!(stay, RuleKind::StayWindow { warning_days: 30 });
    }

    #[test]
    fn degree_points_increase_with_level() {
        assert!(degree_points(DegreeLevel::Doctorate) > degree_points(DegreeLevel::Master));
        assert!(degree_points(DegreeLevel::Bachelor) > degree_points(DegreeLevel::Associate));
        assert_eq!(degree_points(DegreeLevel::NoDegree), 0.0);
    }
}
