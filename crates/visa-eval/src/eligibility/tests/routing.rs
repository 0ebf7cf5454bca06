use super::common::*;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::eligibility::EligibilityService;

fn json_request(method: &str, uri: &str, body: &Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn evaluate_route_stores_and_returns_the_record() {
    let (service, repository) = build_service();
    let router = router_with_service(service);
    let body = serde_json::to_value(professor_request()).unwrap();

    let response = router
        .oneshot(json_request("POST", "/api/v1/eligibility/evaluations", &body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| id.starts_with("eval-")));
    assert_eq!(
        payload
            .pointer("/decision/visaType")
            .and_then(Value::as_str),
        Some("E-1")
    );
    assert_eq!(repository.len(), 1);
}

#[tokio::test]
async fn evaluate_handler_returns_conflict_on_duplicate() {
    let service = Arc::new(EligibilityService::new(
        Arc::new(ConflictRepository),
        Arc::new(engine()),
    ));

    let response = crate::eligibility::router::evaluate_handler::<ConflictRepository>(
        State(service),
        axum::Json(professor_request()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("error").and_then(Value::as_str),
        Some("evaluation already exists")
    );
}

#[tokio::test]
async fn evaluate_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(EligibilityService::new(
        Arc::new(UnavailableRepository),
        Arc::new(engine()),
    ));

    let response = crate::eligibility::router::evaluate_handler::<UnavailableRepository>(
        State(service),
        axum::Json(professor_request()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn evaluate_handler_lists_missing_fields() {
    let (service, repository) = build_service();
    let mut request = professor_request();
    request.applicant_data.evaluation.institution = None;

    let response = crate::eligibility::router::evaluate_handler::<MemoryRepository>(
        State(Arc::new(service)),
        axum::Json(request),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("evaluator").and_then(Value::as_str),
        Some("e1_new")
    );
    assert_eq!(
        payload.get("missingFields"),
        Some(&json!(["evaluation.institution"]))
    );
    assert_eq!(repository.len(), 0);
}

#[tokio::test]
async fn evaluate_handler_rejects_uncataloged_visa_types() {
    let (service, _) = build_service();
    let mut request = professor_request();
    request.visa_type = "D-2".to_string();

    let response = crate::eligibility::router::evaluate_handler::<MemoryRepository>(
        State(Arc::new(service)),
        axum::Json(request),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .is_some_and(|error| error.contains("D-2")));
}

#[tokio::test]
async fn fetch_handler_returns_stored_records() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let record = service
        .submit_on(professor_request(), today())
        .expect("evaluation stored");

    let response = crate::eligibility::router::fetch_handler::<MemoryRepository>(
        State(service.clone()),
        axum::extract::Path(record.id.0.clone()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("id").and_then(Value::as_str),
        Some(record.id.0.as_str())
    );
    assert_eq!(
        payload.pointer("/decision/score").and_then(Value::as_u64),
        Some(100)
    );
    assert_eq!(
        payload
            .pointer("/decision/recommendation")
            .and_then(Value::as_str),
        Some("HIGHLY_RECOMMENDED")
    );
}

#[tokio::test]
async fn fetch_route_reports_unknown_ids() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/eligibility/evaluations/eval-404404")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("error").and_then(Value::as_str),
        Some("evaluation not found")
    );
    assert_eq!(
        payload.get("id").and_then(Value::as_str),
        Some("eval-404404")
    );
}

#[tokio::test]
async fn requirements_route_lists_documents() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let body = json!({
        "visaType": "E-1",
        "applicationType": "NEW",
        "applicantData": serde_json::to_value(professor_applicant()).unwrap(),
    });

    let response = router
        .oneshot(json_request("POST", "/api/v1/eligibility/requirements", &body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let required = payload
        .get("required")
        .and_then(Value::as_array)
        .expect("required list");
    assert!(required.contains(&json!("employment_contract")));
}

#[tokio::test]
async fn requirements_route_rejects_uncataloged_tracks() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let body = json!({
        "visaType": "E-7",
        "applicationType": "CHANGE",
    });

    let response = router
        .oneshot(json_request("POST", "/api/v1/eligibility/requirements", &body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn rule_statistics_route_reports_the_active_version() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/eligibility/rules/statistics")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("ruleSetVersion").and_then(Value::as_str),
        Some("rules-2025.3")
    );
    assert!(payload
        .get("rules")
        .and_then(Value::as_array)
        .is_some_and(|rules| !rules.is_empty()));
}

#[tokio::test]
async fn replace_rules_route_swaps_the_snapshot() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let router = crate::eligibility::eligibility_router(service.clone());
    let body = json!({
        "version": "rules-2025.4",
        "rules": [
            { "id": "criminal_record", "category": "riskAssessment",
              "check": { "kind": "immigration_history" } }
        ]
    });

    let response = router
        .oneshot(json_request("PUT", "/api/v1/eligibility/rules", &body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("version").and_then(Value::as_str),
        Some("rules-2025.4")
    );
    assert_eq!(service.engine().config_versions().rules, "rules-2025.4");
}

#[tokio::test]
async fn replace_rules_route_rejects_invalid_parameters() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let body = json!({
        "version": "rules-broken",
        "rules": [
            { "id": "late_filing", "category": "eligibility",
              "check": { "kind": "stay_window", "warning_days": -5 } }
        ]
    });

    let response = router
        .oneshot(json_request("PUT", "/api/v1/eligibility/rules", &body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .is_some_and(|error| error.contains("late_filing")));
}
