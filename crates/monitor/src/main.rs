//! Standalone monitor binary: loads accounts, restores the persisted
//! snapshot, and polls until ctrl-c.

use std::io;
use std::sync::Arc;

use tracing::info;

use denywatch_domain::config::MonitorConfig;
use denywatch_domain::sources::StateStore;
use denywatch_domain::state::MonitorState;
use denywatch_domain::telemetry::{init_telemetry, TelemetryConfig};
use denywatch_monitor::{
    load_accounts, MonitorError, MonitorSupervisor, NextDnsClient, StateFlusher, TelegramSink,
    WorkerDeps, STOP_GRACE,
};
use denywatch_storage::SeaOrmStateStore;

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[monitor] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), MonitorError> {
    let config = MonitorConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("MONITOR");
    let _telemetry = init_telemetry(&telemetry_config)?;

    let store = SeaOrmStateStore::connect(config.database_url()).await?;
    let snapshot = store.load().await?.unwrap_or_default();
    let state = Arc::new(MonitorState::from_snapshot(snapshot));

    let accounts = load_accounts(config.accounts_file())?;
    let client = Arc::new(NextDnsClient::new(config.nextdns_api_url())?);
    let alerts = Arc::new(TelegramSink::new(
        config.telegram_bot_token().map(str::to_string),
        config.telegram_chat_id().map(str::to_string),
    )?);
    let flusher = Arc::new(StateFlusher::new(Arc::new(store), state.clone()));

    let deps = WorkerDeps {
        state,
        denylists: client.clone(),
        logs: client,
        alerts,
        flusher,
        poll_interval: config.poll_interval(),
    };
    let supervisor = MonitorSupervisor::new(deps);
    let started = supervisor.start_all(&accounts).await?;
    info!(workers = started, "monitoring until ctrl-c");

    tokio::signal::ctrl_c().await?;
    supervisor.stop_all(STOP_GRACE).await;
    Ok(())
}
