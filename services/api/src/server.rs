use crate::cli::ServeArgs;
use crate::infra::{outcome_catalog, AppState, ConfiguredStore};
use crate::routes::with_prequal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rental_prequal::config::AppConfig;
use rental_prequal::error::AppError;
use rental_prequal::telemetry;
use rental_prequal::workflows::prequal::{BracketPartition, PrequalEngine, PrequalService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(ConfiguredStore::from_config(&config.store)?);
    let snapshots = store.describe();
    // Table defects stop the service here rather than on the first request.
    let outcomes = outcome_catalog(&config.tables)?;
    let engine = PrequalEngine::with_tables(store, outcomes, BracketPartition::standard())?;
    let service = Arc::new(PrequalService::new(engine));

    let app = with_prequal_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %snapshots, "prequalification service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
