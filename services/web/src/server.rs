use crate::cli::ServeArgs;
use crate::infra::{AppState, DisclosureContext, SessionRegistry};
use crate::routes::disclosure_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use disclosure_reports::config::AppConfig;
use disclosure_reports::error::AppError;
use disclosure_reports::telemetry;
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
    if let Some(data) = args.data.take() {
        config.disclosure.data_path = Some(data);
    }

    telemetry::init(&config.telemetry)?;

    let disclosure = DisclosureContext::from_config(&config.disclosure)?;
    info!(
        reports = disclosure.catalog.len(),
        supported_years = ?config.disclosure.supported_years,
        "disclosure catalog loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        sessions: SessionRegistry::from_config(&config.disclosure),
        disclosure,
    };

    let app = disclosure_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "disclosure reports service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
