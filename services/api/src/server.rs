use crate::cli::ServeArgs;
use crate::infra::{build_engine, AppState, InMemoryEvaluationRepository};
use crate::routes::with_eligibility_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use visa_eval::config::AppConfig;
use visa_eval::eligibility::EligibilityService;
use visa_eval::error::AppError;
use visa_eval::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = build_engine(&config.evaluation)?;
    let versions = engine.config_versions();
    info!(
        documents = %versions.documents,
        eligibility = %versions.eligibility,
        rules = %versions.rules,
        scoring = %versions.scoring,
        config_dir = ?config.evaluation.config_dir,
        "eligibility configuration loaded"
    );

    let repository = Arc::new(InMemoryEvaluationRepository::default());
    let service = Arc::new(EligibilityService::new(repository, engine));

    let app = with_eligibility_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "visa eligibility evaluator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
