use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{seed_catalog, AppState, InMemoryAdoptionStore, LogEmailSender, LogPushChannel};
use crate::routes::with_adoption_routes;
use homeward::config::AppConfig;
use homeward::error::AppError;
use homeward::telemetry;
use homeward::workflows::adoption::{AdoptionService, ExpirationSweeper};

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

    let store = Arc::new(InMemoryAdoptionStore::default());
    seed_catalog(&store);
    let mailer = Arc::new(LogEmailSender);
    let push = Arc::new(LogPushChannel);
    let service = Arc::new(AdoptionService::new(
        store,
        mailer,
        push,
        config.scheduling,
    ));

    tokio::spawn(ExpirationSweeper::new(service.clone()).run());

    let app = with_adoption_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "adoption lifecycle service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
