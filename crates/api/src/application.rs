use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use thiserror::Error;
use tracing::info;

use denywatch_domain::config::{ApiConfig, ConfigError};
use denywatch_domain::sources::{FetchError, StateStore, StorageError};
use denywatch_domain::state::MonitorState;
use denywatch_domain::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use denywatch_monitor::{
    load_accounts, AccountsError, MonitorSupervisor, NextDnsClient, StateFlusher, TelegramSink,
    WorkerDeps, STOP_GRACE,
};
use denywatch_storage::SeaOrmStateStore;

use crate::handlers::{
    account_status_handler, metrics_handler, overview_handler, start_monitoring_handler,
    stop_monitoring_handler,
};
use crate::state::AppState;

pub async fn run() -> Result<(), BootstrapError> {
    let config = ApiConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("API");
    let telemetry = init_telemetry(&telemetry_config)?;

    let monitor_config = config.monitor();
    let store = SeaOrmStateStore::connect(monitor_config.database_url()).await?;
    let snapshot = store.load().await?.unwrap_or_default();
    let state = Arc::new(MonitorState::from_snapshot(snapshot));

    let accounts = Arc::new(load_accounts(monitor_config.accounts_file())?);
    let client = Arc::new(NextDnsClient::new(monitor_config.nextdns_api_url())?);
    let alerts = Arc::new(TelegramSink::new(
        monitor_config.telegram_bot_token().map(str::to_string),
        monitor_config.telegram_chat_id().map(str::to_string),
    )?);
    let flusher = Arc::new(StateFlusher::new(Arc::new(store), state.clone()));

    let deps = WorkerDeps {
        state,
        denylists: client.clone(),
        logs: client,
        alerts,
        flusher,
        poll_interval: monitor_config.poll_interval(),
    };
    let supervisor = Arc::new(MonitorSupervisor::new(deps));
    let app_state = AppState::new(supervisor.clone(), accounts, telemetry);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(Logger::default())
            .route(
                "/api/v1/monitor/start",
                web::post().to(start_monitoring_handler),
            )
            .route(
                "/api/v1/monitor/stop",
                web::post().to(stop_monitoring_handler),
            )
            .route("/api/v1/monitor", web::get().to(overview_handler))
            .route(
                "/api/v1/accounts/{profile}/status",
                web::get().to(account_status_handler),
            )
            .route("/metrics", web::get().to(metrics_handler))
    })
    .bind(config.api_bind_address())?
    .run();

    info!(address = config.api_bind_address(), "control api listening");
    server.await?;

    // Make sure a running session flushes its final snapshot on shutdown.
    supervisor.stop_all(STOP_GRACE).await;
    Ok(())
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("accounts error: {0}")]
    Accounts(#[from] AccountsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
