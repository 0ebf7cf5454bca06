use super::super::domain::{ApplicationType, Issue, VisaType};
use super::checks;
use super::{Disqualifier, RequiredField, Scorecard, TrackEvaluator, TrackFactor, TrackInput};

const MINIMUM_RELEVANT_YEARS: f32 = 2.0;

/// Teaching plan, research plan, and weekly teaching load, blended 40/30/30.
fn activity_plan(input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
    let attributes = &input.applicant.evaluation;
    let Some(plan) = attributes.activity_plan.as_ref() else {
        card.recommend("Submit a teaching and research activity plan");
        card.component(TrackFactor::ActivityPlan, weight, 40.0, "activity plan not declared");
        return;
    };

    let involves_research = attributes
        .position
        .as_ref()
        .map(|position| position.activity.involves_research())
        .unwrap_or(false);

    let teaching = if plan.teaching_plan { 40.0 } else { 0.0 };
    let research = if plan.research_plan || !involves_research {
        30.0
    } else {
        card.recommend("Add a research plan for the research component of the position");
        0.0
    };
    let hours = match input.tables.weekly_hour_minimum(VisaType::E1) {
        Some(minimum) if minimum > 0.0 => {
            if plan.weekly_teaching_hours < minimum {
                card.issue(Issue::warning(format!(
                    "{:.1} weekly teaching hours below the {minimum:.1} hour minimum",
                    plan.weekly_teaching_hours
                )));
            }
            f64::from((plan.weekly_teaching_hours / minimum).min(1.0)) * 30.0
        }
        _ => 30.0,
    };

    card.component(
        TrackFactor::ActivityPlan,
        weight,
        teaching + research + hours,
        format!(
            "teaching plan: {}, research plan: {}, {:.1} teaching hours/week",
            plan.teaching_plan, plan.research_plan, plan.weekly_teaching_hours
        ),
    );
}

/// E-1 new issuance at an accredited higher-education institution.
pub(super) struct NewProfessor;

impl TrackEvaluator for NewProfessor {
    fn name(&self) -> &'static str {
        "e1_new"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E1
    }

    fn application_type(&self) -> ApplicationType {
        ApplicationType::New
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        &[
            RequiredField::Institution,
            RequiredField::Education,
            RequiredField::Position,
        ]
    }

    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier> {
        checks::ineligible_institution(input).into_iter().collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        checks::sponsor(input, card, TrackFactor::Institution, 0.30);
        checks::qualification(input, card, 0.30, MINIMUM_RELEVANT_YEARS);
        activity_plan(input, card, 0.25);
        checks::documentation(input, card, 0.15);
    }
}

/// E-1 extension of stay with the same or a new institution.
pub(super) struct ProfessorExtension;

impl TrackEvaluator for ProfessorExtension {
    fn name(&self) -> &'static str {
        "e1_extension"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E1
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
        [checks::ineligible_institution(input), checks::visa_expired(input)]
            .into_iter()
            .flatten()
            .collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        checks::employment_continuity(input, card, 0.35);
        activity_plan(input, card, 0.25);
        checks::stay_compliance(input, card, 0.25);
        checks::documentation(input, card, 0.15);
    }
}

/// Change of status into E-1 from another visa held in-country.
pub(super) struct ProfessorChange;

impl TrackEvaluator for ProfessorChange {
    fn name(&self) -> &'static str {
        "e1_change"
    }

    fn visa_type(&self) -> VisaType {
        VisaType::E1
    }

    fn application_type(&self) -> ApplicationType {
        ApplicationType::Change
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        &[
            RequiredField::CurrentVisa,
            RequiredField::Institution,
            RequiredField::Education,
        ]
    }

    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier> {
        [checks::disallowed_source(input), checks::ineligible_institution(input)]
            .into_iter()
            .flatten()
            .collect()
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        checks::source_visa(input, card, 0.20);
        checks::sponsor(input, card, TrackFactor::Institution, 0.25);
        checks::qualification(input, card, 0.30, MINIMUM_RELEVANT_YEARS);
        checks::stay_compliance(input, card, 0.10);
        checks::documentation(input, card, 0.15);
    }
}
