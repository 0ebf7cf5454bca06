use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregator::{EligibilityDecision, RecommendationTier};
use super::domain::{ApplicationType, EvaluationRequest, VisaType};
use super::evaluators::TrackStatus;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(pub String);

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored evaluation: the request as received and the decision it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub id: EvaluationId,
    pub evaluated_at: DateTime<Utc>,
    pub request: EvaluationRequest,
    pub decision: EligibilityDecision,
}

impl EvaluationRecord {
    pub fn summary(&self) -> EvaluationSummary {
        EvaluationSummary {
            id: self.id.clone(),
            evaluated_at: self.evaluated_at,
            visa_type: self.decision.visa_type,
            application_type: self.decision.application_type,
            score: self.decision.score,
            status: self.decision.status,
            recommendation: self.decision.recommendation,
        }
    }
}

/// Compact listing row for recent evaluations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub id: EvaluationId,
    pub evaluated_at: DateTime<Utc>,
    pub visa_type: VisaType,
    pub application_type: ApplicationType,
    pub score: u8,
    pub status: TrackStatus,
    pub recommendation: RecommendationTier,
}

/// Storage abstraction so the service can be exercised without a database.
pub trait EvaluationRepository: Send + Sync {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError>;
    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError>;
    /// Most recent records first.
    fn recent(&self, limit: usize) -> Result<Vec<EvaluationRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
