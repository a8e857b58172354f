use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCircuitRepository};
use crate::routes::with_circuit_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use circuit::competition::CircuitService;
use circuit::config::AppConfig;
use circuit::error::AppError;
use circuit::telemetry;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryCircuitRepository::default());
    let circuit_service = Arc::new(CircuitService::new(repository));

    let app = with_circuit_routes(circuit_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        season = %config.circuit.default_season,
        "circuit standings service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
