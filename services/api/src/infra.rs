use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use visa_eval::config::EvaluationConfig;
use visa_eval::eligibility::{
    EligibilityEngine, EvaluationId, EvaluationRecord, EvaluationRepository, RepositoryError,
};
use visa_eval::error::AppError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Insertion-ordered store. Records live for the lifetime of the process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEvaluationRepository {
    records: Arc<Mutex<Vec<EvaluationRecord>>>,
}

impl EvaluationRepository for InMemoryEvaluationRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

pub(crate) fn build_engine(config: &EvaluationConfig) -> Result<Arc<EligibilityEngine>, AppError> {
    let bundle = config.bundle()?;
    Ok(Arc::new(EligibilityEngine::from_bundle(bundle)?))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use visa_eval::eligibility::EvaluationRequest;

    fn record(id: &str) -> EvaluationRecord {
        let engine = EligibilityEngine::with_defaults().expect("engine builds");
        let request: EvaluationRequest = serde_json::from_value(serde_json::json!({
            "visaType": "E-1",
            "applicationType": "REENTRY",
            "applicantData": {
                "evaluation": {
                    "institution": { "name": "Hanbit University", "institutionType": "university" },
                    "stay": { "visaExpiry": "2026-01-31", "registered": true }
                }
            }
        }))
        .expect("request parses");
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
        let decision = engine.evaluate(&request, today).expect("evaluates");
        EvaluationRecord {
            id: EvaluationId(id.to_string()),
            evaluated_at: Utc::now(),
            request,
            decision,
        }
    }

    #[test]
    fn repository_rejects_duplicate_ids_and_lists_newest_first() {
        let repository = InMemoryEvaluationRepository::default();
        repository.insert(record("eval-1")).expect("first insert");
        repository.insert(record("eval-2")).expect("second insert");

        match repository.insert(record("eval-1")) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
        let recent: Vec<String> = repository
            .recent(5)
            .expect("listed")
            .into_iter()
            .map(|record| record.id.0)
            .collect();
        assert_eq!(recent, vec!["eval-2".to_string(), "eval-1".to_string()]);
        assert!(repository
            .fetch(&EvaluationId("eval-3".to_string()))
            .expect("fetch succeeds")
            .is_none());
    }

    #[test]
    fn dates_must_be_iso_formatted() {
        assert_eq!(
            parse_date(" 2025-03-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"))
        );
        assert!(parse_date("03/01/2025").is_err());
    }
}
