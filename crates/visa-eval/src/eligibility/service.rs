use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use tracing::info;

use super::documents::DocumentRequirementSet;
use super::domain::{ApplicantData, ApplicationType, EvaluationRequest};
use super::engine::EligibilityEngine;
use super::error::EligibilityError;
use super::repository::{EvaluationId, EvaluationRecord, EvaluationRepository, RepositoryError};
use super::rules::{RuleSetConfig, RuleStatistics};

/// Service composing the evaluation engine with a record repository.
pub struct EligibilityService<R> {
    repository: Arc<R>,
    engine: Arc<EligibilityEngine>,
}

static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

impl<R> EligibilityService<R>
where
    R: EvaluationRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: Arc<EligibilityEngine>) -> Self {
        Self { repository, engine }
    }

    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    /// Evaluate against today's local date and persist the decision.
    pub fn submit(
        &self,
        request: EvaluationRequest,
    ) -> Result<EvaluationRecord, EligibilityServiceError> {
        self.submit_on(request, Local::now().date_naive())
    }

    pub fn submit_on(
        &self,
        request: EvaluationRequest,
        today: NaiveDate,
    ) -> Result<EvaluationRecord, EligibilityServiceError> {
        let decision = self.engine.evaluate(&request, today)?;
        let record = EvaluationRecord {
            id: next_evaluation_id(),
            evaluated_at: Utc::now(),
            request,
            decision,
        };
        let stored = self.repository.insert(record)?;
        info!(
            evaluation_id = %stored.id,
            score = stored.decision.score,
            status = %stored.decision.status,
            "evaluation stored"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &EvaluationId) -> Result<EvaluationRecord, EligibilityServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<EvaluationRecord>, EligibilityServiceError> {
        Ok(self.repository.recent(limit)?)
    }

    pub fn requirements(
        &self,
        visa_type: &str,
        application_type: ApplicationType,
        applicant: &ApplicantData,
    ) -> Result<DocumentRequirementSet, EligibilityServiceError> {
        Ok(self
            .engine
            .requirements(visa_type, application_type, applicant)?)
    }

    pub fn rule_statistics(&self) -> Vec<RuleStatistics> {
        self.engine.rule_statistics()
    }

    pub fn replace_rules(&self, config: &RuleSetConfig) -> Result<String, EligibilityServiceError> {
        self.engine
            .replace_rules(config)
            .map_err(|error| EligibilityServiceError::Eligibility(error.into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EligibilityServiceError {
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
