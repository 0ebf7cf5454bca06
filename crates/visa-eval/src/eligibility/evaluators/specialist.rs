use super::super::domain::{ApplicationType, DegreeLevel, Issue, VisaType};
use super::checks;
use super::{Disqualifier, RequiredField, Scorecard, TrackEvaluator, TrackFactor, TrackInput};

/// Years of experience accepted in place of a bachelor's degree.
const EXPERIENCE_IN_LIEU_OF_DEGREE: f32 = 5.0;

fn specialist_qualification(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let attributes = &input.applicant.evaluation;
    let degree = attributes
        .education
        .as_ref()
        .map(|education| education.highest_degree)
        .unwrap_or(DegreeLevel::NoDegree);
    let years = attributes
        .experience
        .as_ref()
        .map(|experience| experience.relevant_years)
        .unwrap_or(0.0);

    // Master's, bachelor's plus one year, or five years of experience.
    let minimum_years = match degree {
        DegreeLevel::Master | DegreeLevel::Doctorate => 0.0,
        DegreeLevel::Bachelor => 1.0,
        _ => EXPERIENCE_IN_LIEU_OF_DEGREE,
    };
    let (mut score, notes) = checks::qualification_score(input, minimum_years);
    if degree < DegreeLevel::Bachelor && years >= EXPERIENCE_IN_LIEU_OF_DEGREE {
        // Experience substitutes for the missing degree.
        score = score.max(70.0);
    } else if years < minimum_years {
        card.issue(Issue::warning(format!(
            "{} with {years:.1} years does not meet the E-7 qualification path",
            degree.label()
        )));
    }

    card.component(TrackFactor::Qualification, weight, score, notes);
}

/// E-7 new issuance for a designated professional occupation.
pub(super) struct NewSpecialist;

impl TrackEvaluator for NewSpecialist {
    fn name(&self) -> &'static str {
        "e7_new"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E7
    }

    fn application_type(&self) -> ApplicationType {
        ApplicationType::New
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        &[
            RequiredField::Education,
            RequiredField::Institution,
            RequiredField::Contract,
            RequiredField::Position,
        ]
    }

    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier> {
        [
            checks::ineligible_employer(input),
            checks::salary_below_floor(input),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        specialist_qualification(input, card, 0.35);
        checks::sponsor(input, card, TrackFactor::Employer, 0.25);
        checks::contract_terms(input, card, 0.25);
        checks::documentation(input, card, 0.15);
    }
}

pub(super) struct SpecialistExtension;

impl TrackEvaluator for SpecialistExtension {
    fn name(&self) -> &'static str {
        "e7_extension"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E7
    }

    fn application_type(&self) -> ApplicationType {
        ApplicationType::Extension
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        &[
            RequiredField::Institution,
            RequiredField::Contract,
            RequiredField::Stay,
        ]
    }

    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier> {
        [checks::visa_expired(input), checks::salary_below_floor(input)]
            .into_iter()
            .flatten()
            .collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        checks::contract_terms(input, card, 0.35);
        checks::sponsor(input, card, TrackFactor::Employer, 0.20);
        checks::stay_compliance(input, card, 0.30);
        checks::documentation(input, card, 0.15);
    }
}
