use super::super::domain::{ApplicationType, DegreeLevel, VisaType};
use super::checks;
use super::{Disqualifier, RequiredField, Scorecard, TrackEvaluator, TrackFactor, TrackInput};

const TEACHING_CERTIFICATIONS: [&str; 3] = ["tefl", "tesol", "celta"];
const MINIMUM_RELEVANT_YEARS: f32 = 1.0;

/// General qualification plus credit for recognised language-teaching certificates.
fn instructor_qualification(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let (mut score, mut notes) = checks::qualification_score(input, MINIMUM_RELEVANT_YEARS);

    if let Some(teaching) = input.applicant.evaluation.teaching.as_ref() {
        if let Some(certification) = TEACHING_CERTIFICATIONS
            .iter()
            .find(|name| teaching.has_certification(name))
        {
            score += 10.0;
            notes.push_str(&format!(", {} certified", certification.to_ascii_uppercase()));
            card.strength(format!(
                "holds a {} teaching certificate",
                certification.to_ascii_uppercase()
            ));
        } else {
            card.recommend("A TEFL, TESOL, or CELTA certificate strengthens the application");
        }
        if teaching.years >= 2.0 {
            score += 5.0;
        }
    }

    card.component(TrackFactor::Qualification, weight, score, notes);
}

/// E-2 new issuance for a native-speaker language instructor.
pub(super) struct NewInstructor;

impl TrackEvaluator for NewInstructor {
    fn name(&self) -> &'static str {
        "e2_new"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E2
    }

    fn application_type(&self) -> ApplicationType {
        ApplicationType::New
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        &[
            RequiredField::Nationality,
            RequiredField::Education,
            RequiredField::Institution,
        ]
    }

    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier> {
        [
            checks::nationality_outside_table(input),
            checks::criminal_record(input),
            checks::degree_below(input, DegreeLevel::Bachelor),
            checks::ineligible_employer(input),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        checks::nationality(input, card, 0.20);
        instructor_qualification(input, card, 0.30);
        checks::sponsor(input, card, TrackFactor::Employer, 0.20);
        checks::contract_terms(input, card, 0.15);
        checks::documentation(input, card, 0.15);
    }
}

pub(super) struct InstructorExtension;

impl TrackEvaluator for InstructorExtension {
    fn name(&self) -> &'static str {
        "e2_extension"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E2
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
        [
            checks::visa_expired(input),
            checks::criminal_record(input),
            checks::ineligible_employer(input),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        checks::contract_terms(input, card, 0.35);
        checks::stay_compliance(input, card, 0.25);
        checks::sponsor(input, card, TrackFactor::Employer, 0.25);
        checks::documentation(input, card, 0.15);
    }
}

pub(super) struct InstructorChange;

impl TrackEvaluator for InstructorChange {
    fn name(&self) -> &'static str {
        "e2_change"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E2
    }

    fn application_type(&self) -> ApplicationType {
        ApplicationType::Change
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        &[
            RequiredField::CurrentVisa,
            RequiredField::Nationality,
            RequiredField::Education,
            RequiredField::Institution,
        ]
    }

    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier> {
        [
            checks::disallowed_source(input),
            checks::nationality_outside_table(input),
            checks::criminal_record(input),
            checks::degree_below(input, DegreeLevel::Bachelor),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        checks::source_visa(input, card, 0.20);
        checks::nationality(input, card, 0.15);
        instructor_qualification(input, card, 0.25);
        checks::sponsor(input, card, TrackFactor::Employer, 0.15);
        checks::contract_terms(input, card, 0.10);
        checks::documentation(input, card, 0.15);
    }
}
