use crate::cli::ServeArgs;
use crate::infra::{load_registry, AppState, InMemoryDiagnosticRepository, LoggingNotifier};
use crate::routes::with_diagnostic_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use nexus_diagnostics::config::AppConfig;
use nexus_diagnostics::error::AppError;
use nexus_diagnostics::telemetry;
use nexus_diagnostics::workflows::diagnostic::DiagnosticService;
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

    let registry = Arc::new(load_registry(&config.definitions)?);
    let definitions: Vec<String> = registry.keys().map(str::to_string).collect();
    let repository = Arc::new(InMemoryDiagnosticRepository::default());
    let notifier = Arc::new(LoggingNotifier::default());
    let diagnostic_service = Arc::new(DiagnosticService::new(registry, repository, notifier));

    let app = with_diagnostic_routes(diagnostic_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, ?definitions, "diagnostics service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
