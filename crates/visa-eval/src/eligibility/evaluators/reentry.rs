use super::super::domain::{ApplicationType, Issue, VisaType};
use super::checks;
use super::{Disqualifier, RequiredField, Scorecard, TrackEvaluator, TrackFactor, TrackInput};

/// Re-entry permit for a registered holder of any supported work visa.
pub(super) struct ReentryPermit {
    visa_type: VisaType,
}

impl ReentryPermit {
    pub(super) fn new(visa_type: VisaType) -> Self {
        Self { visa_type }
    }

    fn status(&self, input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
        let attributes = &input.applicant.evaluation;
        let days_left = attributes
            .stay
            .as_ref()
            .and_then(|stay| stay.visa_expiry)
            .map(|expiry| (expiry - input.reference_date()).num_days())
            .unwrap_or(0);

        let mut score: f64 = if days_left >= 90 {
            100.0
        } else if days_left >= 30 {
            80.0
        } else {
            card.issue(Issue::warning(format!(
                "visa expires in {days_left} days, consider extending before travel"
            )));
            60.0
        };
        let history = attributes.history;
        if history.prior_violations > 0 || history.unresolved_violations {
            score -= 20.0;
        }
        card.component(
            TrackFactor::ImmigrationStatus,
            weight,
            score,
            format!("registered, {days_left} days of validity remaining"),
        );
    }

    fn absence(&self, input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
        let Some(stay) = input.applicant.evaluation.stay.as_ref() else {
            return;
        };
        let (Some(departure), Some(planned_return)) = (stay.planned_departure, stay.planned_return)
        else {
            card.recommend("Declare planned departure and return dates");
            card.component(TrackFactor::Absence, weight, 60.0, "travel dates not declared");
            return;
        };

        let days_abroad = (planned_return - departure).num_days().max(0);
        let mut score: f64 = match days_abroad {
            0..=90 => 100.0,
            91..=180 => 85.0,
            181..=365 => 70.0,
            _ => 50.0,
        };
        if let Some(expiry) = stay.visa_expiry {
            if (expiry - planned_return).num_days() < 30 {
                score -= 15.0;
                card.issue(Issue::warning(
                    "planned return falls within 30 days of visa expiry",
                ));
            }
        }
        card.component(
            TrackFactor::Absence,
            weight,
            score,
            format!("{days_abroad} days abroad"),
        );
    }

    fn employment(&self, input: &TrackInput<'_>, card: &mut Scorecard, weight: f64) {
        let (score, notes) = match input.applicant.evaluation.contract.as_ref() {
            Some(contract) if contract.duration_months >= input.tables.minimum_contract_months => {
                (100.0, "employment continues through the absence")
            }
            Some(_) => (70.0, "contract shorter than the minimum term"),
            None => {
                card.issue(Issue::warning("no active employment contract declared"));
                (50.0, "employment not declared")
            }
        };
        card.component(TrackFactor::Employment, weight, score, notes);
    }
}

impl TrackEvaluator for ReentryPermit {
    fn name(&self) -> &'static str {
        match self.visa_type {
            VisaType::E1 => "e1_reentry",
            VisaType::E2 => "e2_reentry",
            VisaType::E7 => "e7_reentry",
        }
    }

    fn visa_type(&self) -> VisaType {
        self.visa_type
    }

    fn application_type(&self) -> ApplicationType {
        ApplicationType::Reentry
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        &[RequiredField::Stay, RequiredField::VisaExpiry]
    }

    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier> {
        let mut disqualifiers = Vec::new();
        let Some(stay) = input.applicant.evaluation.stay.as_ref() else {
            return disqualifiers;
        };
        if !stay.registered {
            disqualifiers.push(Disqualifier::UnregisteredStay);
        }
        disqualifiers.extend(checks::visa_expired(input));
        if let (Some(planned_return), Some(visa_expiry)) = (stay.planned_return, stay.visa_expiry) {
            if planned_return > visa_expiry {
                disqualifiers.push(Disqualifier::ReturnAfterExpiry {
                    planned_return,
                    visa_expiry,
                });
            }
        }
        disqualifiers
    }

    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard) {
        self.status(input, card, 0.40);
        self.absence(input, card, 0.30);
        self.employment(input, card, 0.20);
        checks::documentation(input, card, 0.10);
    }
}
