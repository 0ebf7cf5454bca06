use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use visa_eval::eligibility::{
    eligibility_router, EligibilityService, EvaluationRepository, EvaluationSummary,
};

const RECENT_LIMIT: usize = 20;

pub(crate) fn with_eligibility_routes<R>(service: Arc<EligibilityService<R>>) -> axum::Router
where
    R: EvaluationRepository + 'static,
{
    let recent_service = service.clone();
    eligibility_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/eligibility/recent",
            axum::routing::get(move || recent_evaluations_endpoint(recent_service.clone())),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn recent_evaluations_endpoint<R>(service: Arc<EligibilityService<R>>) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.recent(RECENT_LIMIT) {
        Ok(records) => {
            let evaluations: Vec<EvaluationSummary> =
                records.iter().map(|record| record.summary()).collect();
            (StatusCode::OK, Json(json!({ "evaluations": evaluations })))
                .into_response()
        }
        Err(err) => {
            warn!(error = %err, "failed to list recent evaluations");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
