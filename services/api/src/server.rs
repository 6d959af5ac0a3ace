use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicationRepository, SendGridMailer};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rental_intake::config::AppConfig;
use rental_intake::error::AppError;
use rental_intake::intake::service::IntakeService;
use rental_intake::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    if !config.mail.is_configured() {
        info!("mail transport unconfigured; lifecycle notifications will be skipped");
    }

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let mailer = Arc::new(SendGridMailer::from_config(&config.mail));
    let service = Arc::new(IntakeService::new(
        repository,
        mailer,
        config.mail.clone(),
    ));

    let app = with_intake_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rental intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
