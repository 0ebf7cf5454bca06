//! Per-visa, per-track scoring formulas.
//!
//! Every evaluator checks its categorical disqualifiers first. Any disqualifier forces a
//! score of 0 and `REJECTED` and the weighted formula is skipped entirely.

mod checks;
mod instructor;
mod professor;
mod reentry;
mod specialist;
mod tables;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::EvaluationContext;
use super::domain::{clamp_score, ApplicantData, ApplicationType, DegreeLevel, Issue, VisaType};
use super::error::EligibilityError;

pub use tables::{
    normalize_visa_code, ChangeSourcePolicy, EligibilityTables, InstitutionEntry,
    InstitutionTable, InstitutionVerdict, SourceVerdict, StatusBands,
};

/// Evaluators read the same context as rules.
pub type TrackInput<'a> = EvaluationContext<'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackStatus {
    Approved,
    Conditional,
    Rejected,
}

impl TrackStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TrackStatus::Approved => "APPROVED",
            TrackStatus::Conditional => "CONDITIONAL",
            TrackStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structural check contributing one weighted component to a track score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackFactor {
    Institution,
    Employer,
    Qualification,
    ActivityPlan,
    Documentation,
    EmploymentContinuity,
    StayCompliance,
    SourceVisa,
    Nationality,
    Contract,
    ImmigrationStatus,
    Absence,
    Employment,
}

impl TrackFactor {
    pub const fn label(self) -> &'static str {
        match self {
            TrackFactor::Institution => "institution eligibility",
            TrackFactor::Employer => "employer eligibility",
            TrackFactor::Qualification => "qualification",
            TrackFactor::ActivityPlan => "activity plan",
            TrackFactor::Documentation => "documentation",
            TrackFactor::EmploymentContinuity => "employment continuity",
            TrackFactor::StayCompliance => "stay compliance",
            TrackFactor::SourceVisa => "source visa",
            TrackFactor::Nationality => "nationality",
            TrackFactor::Contract => "contract terms",
            TrackFactor::ImmigrationStatus => "immigration status",
            TrackFactor::Absence => "planned absence",
            TrackFactor::Employment => "employment status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponent {
    pub factor: TrackFactor,
    pub weight: f64,
    pub score: u8,
    pub notes: String,
}

/// Categorical condition that makes an application ineligible outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disqualifier {
    IneligibleInstitution {
        institution_type: String,
        reason: String,
    },
    IneligibleEmployer {
        institution_type: String,
        reason: String,
    },
    VisaExpired {
        expired_on: NaiveDate,
    },
    DisallowedSourceVisa {
        current_visa: String,
    },
    NationalityNotEligible {
        nationality: Option<String>,
    },
    CriminalRecord,
    DegreeBelowMinimum {
        held: DegreeLevel,
        minimum: DegreeLevel,
    },
    SalaryBelowFloor {
        declared: u64,
        floor: u64,
    },
    UnregisteredStay,
    ReturnAfterExpiry {
        planned_return: NaiveDate,
        visa_expiry: NaiveDate,
    },
}

impl Disqualifier {
    pub fn summary(&self) -> String {
        match self {
            Disqualifier::IneligibleInstitution {
                institution_type,
                reason,
            } => format!("institution type '{institution_type}' is ineligible: {reason}"),
            Disqualifier::IneligibleEmployer {
                institution_type,
                reason,
            } => format!("employer type '{institution_type}' is ineligible: {reason}"),
            Disqualifier::VisaExpired { expired_on } => {
                format!("current visa expired on {expired_on}")
            }
            Disqualifier::DisallowedSourceVisa { current_visa } => {
                format!("change of status from {current_visa} is not permitted")
            }
            Disqualifier::NationalityNotEligible { nationality } => match nationality {
                Some(code) => {
                    format!("nationality {code} is outside the eligible nationality table")
                }
                None => "nationality not declared".to_string(),
            },
            Disqualifier::CriminalRecord => "criminal record declared".to_string(),
            Disqualifier::DegreeBelowMinimum { held, minimum } => {
                format!("{} is below the required {}", held.label(), minimum.label())
            }
            Disqualifier::SalaryBelowFloor { declared, floor } => {
                format!("annual salary {declared} is below the floor of {floor}")
            }
            Disqualifier::UnregisteredStay => "stay is not registered".to_string(),
            Disqualifier::ReturnAfterExpiry {
                planned_return,
                visa_expiry,
            } => format!("planned return {planned_return} falls after visa expiry {visa_expiry}"),
        }
    }
}

impl fmt::Display for Disqualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Applicant attributes an evaluator cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    CurrentVisa,
    Nationality,
    Education,
    Experience,
    Institution,
    Position,
    Contract,
    Stay,
    VisaExpiry,
}

impl RequiredField {
    pub const fn id(self) -> &'static str {
        match self {
            RequiredField::CurrentVisa => "evaluation.currentVisa",
            RequiredField::Nationality => "administrative.nationality",
            RequiredField::Education => "evaluation.education",
            RequiredField::Experience => "evaluation.experience",
            RequiredField::Institution => "evaluation.institution",
            RequiredField::Position => "evaluation.position",
            RequiredField::Contract => "evaluation.contract",
            RequiredField::Stay => "evaluation.stay",
            RequiredField::VisaExpiry => "evaluation.stay.visaExpiry",
        }
    }

    pub fn present(self, applicant: &ApplicantData) -> bool {
        let attributes = &applicant.evaluation;
        match self {
            RequiredField::CurrentVisa => attributes
                .current_visa
                .as_deref()
                .map(|code| !code.trim().is_empty())
                .unwrap_or(false),
            RequiredField::Nationality => applicant
                .administrative
                .nationality
                .as_deref()
                .map(|code| !code.trim().is_empty())
                .unwrap_or(false),
            RequiredField::Education => attributes.education.is_some(),
            RequiredField::Experience => attributes.experience.is_some(),
            RequiredField::Institution => attributes.institution.is_some(),
            RequiredField::Position => attributes.position.is_some(),
            RequiredField::Contract => attributes.contract.is_some(),
            RequiredField::Stay => attributes.stay.is_some(),
            RequiredField::VisaExpiry => attributes
                .stay
                .as_ref()
                .and_then(|stay| stay.visa_expiry)
                .is_some(),
        }
    }
}

/// Accumulates weighted components and diagnostics while an evaluator runs.
#[derive(Debug, Default)]
pub struct Scorecard {
    components: Vec<ScoreComponent>,
    issues: Vec<Issue>,
    strengths: Vec<String>,
    recommendations: Vec<String>,
}

impl Scorecard {
    pub fn component(
        &mut self,
        factor: TrackFactor,
        weight: f64,
        score: f64,
        notes: impl Into<String>,
    ) {
        self.components.push(ScoreComponent {
            factor,
            weight,
            score: clamp_score(score),
            notes: notes.into(),
        });
    }

    pub fn issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn strength(&mut self, strength: impl Into<String>) {
        self.strengths.push(strength.into());
    }

    pub fn recommend(&mut self, recommendation: impl Into<String>) {
        self.recommendations.push(recommendation.into());
    }

    fn weighted_score(&self) -> u8 {
        let total_weight: f64 = self.components.iter().map(|c| c.weight).sum();
        if total_weight <= 0.0 {
            return 0;
        }
        let weighted: f64 = self
            .components
            .iter()
            .map(|c| f64::from(c.score) * c.weight)
            .sum();
        clamp_score(weighted / total_weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvaluation {
    pub evaluator: String,
    pub visa_type: VisaType,
    pub application_type: ApplicationType,
    pub score: u8,
    pub status: TrackStatus,
    pub components: Vec<ScoreComponent>,
    pub disqualifiers: Vec<Disqualifier>,
    pub issues: Vec<Issue>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
}

impl TrackEvaluation {
    pub fn is_disqualified(&self) -> bool {
        !self.disqualifiers.is_empty()
    }
}

/// Scoring contract shared by every (visa type, track) evaluator.
pub trait TrackEvaluator: Send + Sync {
    fn name(&self) -> &'static str;
    fn visa_type(&self) -> VisaType;
    fn application_type(&self) -> ApplicationType;
    fn required_fields(&self) -> &'static [RequiredField];

    /// Categorical disqualifiers, checked before any weighted scoring.
    fn disqualifiers(&self, input: &TrackInput<'_>) -> Vec<Disqualifier>;

    /// Weighted components for an application that passed every disqualifier.
    fn score(&self, input: &TrackInput<'_>, card: &mut Scorecard);

    fn evaluate(&self, input: &TrackInput<'_>) -> Result<TrackEvaluation, EligibilityError> {
        let missing_fields: Vec<String> = self
            .required_fields()
            .iter()
            .filter(|field| !field.present(input.applicant))
            .map(|field| field.id().to_string())
            .collect();
        if !missing_fields.is_empty() {
            return Err(EligibilityError::ValidationInput {
                evaluator: self.name().to_string(),
                missing_fields,
            });
        }

        let disqualifiers = self.disqualifiers(input);
        if !disqualifiers.is_empty() {
            debug!(
                evaluator = self.name(),
                disqualifiers = disqualifiers.len(),
                "hard disqualifier, skipping weighted scoring"
            );
            let issues = disqualifiers
                .iter()
                .map(|disqualifier| Issue::critical(disqualifier.summary()))
                .collect();
            return Ok(TrackEvaluation {
                evaluator: self.name().to_string(),
                visa_type: self.visa_type(),
                application_type: self.application_type(),
                score: 0,
                status: TrackStatus::Rejected,
                components: Vec::new(),
                disqualifiers,
                issues,
                strengths: Vec::new(),
                recommendations: Vec::new(),
            });
        }

        let mut card = Scorecard::default();
        self.score(input, &mut card);
        let score = card.weighted_score();
        let status = input.tables.status_bands.status(score);
        debug!(evaluator = self.name(), score, %status, "track evaluated");

        Ok(TrackEvaluation {
            evaluator: self.name().to_string(),
            visa_type: self.visa_type(),
            application_type: self.application_type(),
            score,
            status,
            components: card.components,
            disqualifiers: Vec::new(),
            issues: card.issues,
            strengths: card.strengths,
            recommendations: card.recommendations,
        })
    }
}

/// Lookup table from (visa type, track) to its evaluator.
pub struct EvaluatorRegistry {
    evaluators: BTreeMap<(VisaType, ApplicationType), Box<dyn TrackEvaluator>>,
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("tracks", &self.evaluators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EvaluatorRegistry {
    pub fn empty() -> Self {
        Self {
            evaluators: BTreeMap::new(),
        }
    }

    /// Every supported track. E-7 has no change-of-status evaluator.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(professor::NewProfessor);
        registry.register(professor::ProfessorExtension);
        registry.register(professor::ProfessorChange);
        registry.register(instructor::NewInstructor);
        registry.register(instructor::InstructorExtension);
        registry.register(instructor::InstructorChange);
        registry.register(specialist::NewSpecialist);
        registry.register(specialist::SpecialistExtension);
        for visa_type in VisaType::ALL {
            registry.register(reentry::ReentryPermit::new(visa_type));
        }
        registry
    }

    pub fn register<E: TrackEvaluator + 'static>(&mut self, evaluator: E) {
        self.evaluators.insert(
            (evaluator.visa_type(), evaluator.application_type()),
            Box::new(evaluator),
        );
    }

    pub fn supports(&self, visa_type: VisaType, application_type: ApplicationType) -> bool {
        self.evaluators.contains_key(&(visa_type, application_type))
    }

    pub fn get(
        &self,
        visa_type: VisaType,
        application_type: ApplicationType,
    ) -> Result<&dyn TrackEvaluator, EligibilityError> {
        self.evaluators
            .get(&(visa_type, application_type))
            .map(|evaluator| evaluator.as_ref())
            .ok_or(EligibilityError::UnsupportedApplicationType {
                visa_type,
                application_type,
            })
    }

    pub fn evaluate(&self, input: &TrackInput<'_>) -> Result<TrackEvaluation, EligibilityError> {
        self.get(input.visa_type, input.application_type)?
            .evaluate(input)
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
