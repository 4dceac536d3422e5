use crate::cli::ServeArgs;
use crate::infra::{seed_demo_dataset, AppState};
use crate::routes::with_lending_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use vestlend::config::AppConfig;
use vestlend::error::AppError;
use vestlend::telemetry;
use vestlend::workflows::lending::{
    LoanOriginationService, MemoryAuditLog, MemoryLedger, OriginationError,
};
use vestlend::workflows::policy::LendingPolicy;

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

    let ledger = Arc::new(MemoryLedger::new(LendingPolicy::standard()));
    let audit = Arc::new(MemoryAuditLog::new());
    if config.seed_demo_data {
        let seeded = seed_demo_dataset(&ledger, Local::now().date_naive())
            .map_err(OriginationError::from)?;
        info!(
            membership_id = %seeded.membership_id,
            total_shares = seeded.total_shares,
            "seeded demo equity dataset"
        );
    }
    let service = Arc::new(LoanOriginationService::new(ledger, audit));

    let app = with_lending_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan origination service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
