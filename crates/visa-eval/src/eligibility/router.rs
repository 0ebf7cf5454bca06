use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicantData, ApplicationType, EvaluationRequest};
use super::error::EligibilityError;
use super::repository::{EvaluationId, EvaluationRepository, RepositoryError};
use super::rules::RuleSetConfig;
use super::service::{EligibilityService, EligibilityServiceError};

/// Body of a document requirement lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsQuery {
    pub visa_type: String,
    pub application_type: ApplicationType,
    #[serde(default)]
    pub applicant_data: ApplicantData,
}

/// Router builder exposing the evaluation core over HTTP.
pub fn eligibility_router<R>(service: Arc<EligibilityService<R>>) -> Router
where
    R: EvaluationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/eligibility/evaluations",
            post(evaluate_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/evaluations/:evaluation_id",
            get(fetch_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/requirements",
            post(requirements_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/rules/statistics",
            get(rule_statistics_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/rules",
            put(replace_rules_handler::<R>),
        )
        .with_state(service)
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

/// Caller mistakes map to 422; configuration faults are the deployment's problem.
fn eligibility_status(error: &EligibilityError) -> StatusCode {
    if error.is_caller_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub(crate) async fn evaluate_handler<R>(
    State(service): State<Arc<EligibilityService<R>>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.submit(request) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(EligibilityServiceError::Eligibility(EligibilityError::ValidationInput {
            evaluator,
            missing_fields,
        })) => {
            let payload = json!({
                "error": "applicant data is missing required fields",
                "evaluator": evaluator,
                "missingFields": missing_fields,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(EligibilityServiceError::Eligibility(error)) => {
            error_response(eligibility_status(&error), error)
        }
        Err(EligibilityServiceError::Repository(RepositoryError::Conflict)) => {
            error_response(StatusCode::CONFLICT, "evaluation already exists")
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other),
    }
}

pub(crate) async fn fetch_handler<R>(
    State(service): State<Arc<EligibilityService<R>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    let id = EvaluationId(evaluation_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(EligibilityServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "error": "evaluation not found",
                "id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other),
    }
}

pub(crate) async fn requirements_handler<R>(
    State(service): State<Arc<EligibilityService<R>>>,
    axum::Json(query): axum::Json<RequirementsQuery>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.requirements(
        &query.visa_type,
        query.application_type,
        &query.applicant_data,
    ) {
        Ok(requirements) => (StatusCode::OK, axum::Json(requirements)).into_response(),
        Err(EligibilityServiceError::Eligibility(error)) => {
            error_response(eligibility_status(&error), error)
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other),
    }
}

pub(crate) async fn rule_statistics_handler<R>(
    State(service): State<Arc<EligibilityService<R>>>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    let payload = json!({
        "ruleSetVersion": service.engine().config_versions().rules,
        "rules": service.rule_statistics(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn replace_rules_handler<R>(
    State(service): State<Arc<EligibilityService<R>>>,
    axum::Json(config): axum::Json<RuleSetConfig>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.replace_rules(&config) {
        Ok(version) => {
            let payload = json!({
                "version": version,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(EligibilityServiceError::Eligibility(EligibilityError::Configuration(error))) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error)
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other),
    }
}
