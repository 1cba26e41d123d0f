//! The per-account polling worker and its lifecycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use denywatch_domain::config::ConfigError;
use denywatch_domain::model::{Account, LogEntry, ProfileId};
use denywatch_domain::sources::{AlertSink, DenylistSource, FetchError, LogSource, StorageError};
use denywatch_domain::state::MonitorState;
use denywatch_domain::telemetry::TelemetryError;

use crate::accounts::AccountsError;
use crate::flush::StateFlusher;
use crate::pipeline::process_blocked_entry;
use crate::supervisor::SupervisorError;

/// Trailing window of logs fetched per poll.
const LOG_WINDOW: Duration = Duration::from_secs(60);
/// Sleep after a failed iteration before polling again.
const ERROR_BACKOFF: Duration = Duration::from_secs(10);
/// Denylist refresh cadence, in iterations.
const REFRESH_EVERY: u64 = 30;
/// Periodic state-flush cadence, in iterations.
const FLUSH_EVERY: u64 = 6;

#[derive(Debug, Error)]
pub enum MonitorError {
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
    #[error("supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lifecycle of one account monitor. There is no transition out of
/// `Stopped`; a fresh worker must be spawned to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MonitorPhase {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Everything a worker needs besides its account: the shared state, the
/// collaborators, the flush writer, and the polling cadence.
#[derive(Clone)]
pub struct WorkerDeps {
    pub state: Arc<MonitorState>,
    pub denylists: Arc<dyn DenylistSource>,
    pub logs: Arc<dyn LogSource>,
    pub alerts: Arc<dyn AlertSink>,
    pub flusher: Arc<StateFlusher>,
    pub poll_interval: Duration,
}

/// Handle to one spawned worker: its profile, observable phase, and task.
pub struct MonitorHandle {
    profile: ProfileId,
    phase: watch::Receiver<MonitorPhase>,
    pub(crate) task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn profile(&self) -> &ProfileId {
        &self.profile
    }

    pub fn phase(&self) -> MonitorPhase {
        *self.phase.borrow()
    }
}

/// Spawns the polling worker for one account. The worker observes `stop` at
/// the top of each iteration and exits cooperatively.
pub fn spawn_account_monitor(
    account: Account,
    deps: WorkerDeps,
    stop: watch::Receiver<bool>,
) -> MonitorHandle {
    let (phase_tx, phase_rx) = watch::channel(MonitorPhase::Idle);
    let profile = account.profile_id.clone();
    let task = tokio::spawn(run_monitor(account, deps, phase_tx, stop));
    MonitorHandle {
        profile,
        phase: phase_rx,
        task,
    }
}

async fn run_monitor(
    account: Account,
    deps: WorkerDeps,
    phase_tx: watch::Sender<MonitorPhase>,
    mut stop: watch::Receiver<bool>,
) {
    let _ = phase_tx.send(MonitorPhase::Running);
    info!(
        profile = %account.profile_id,
        account = %account.name,
        credential = %account.api_key.fingerprint(),
        "account monitor started"
    );

    // Initial forced refresh; on failure the snapshot-restored set remains.
    let mut patterns = deps
        .state
        .cache()
        .refresh(&account.profile_id, &account.api_key, deps.denylists.as_ref())
        .await;
    info!(profile = %account.profile_id, patterns = patterns.len(), "denylist loaded");

    let mut iteration: u64 = 0;
    loop {
        if *stop.borrow() {
            let _ = phase_tx.send(MonitorPhase::Stopping);
            break;
        }
        iteration += 1;

        let pause = match run_iteration(&account, iteration, &mut patterns, &deps).await {
            Ok(()) => deps.poll_interval,
            Err(err) => {
                counter!("monitor_polls_total", "result" => "error").increment(1);
                warn!(profile = %account.profile_id, %err, "iteration failed, backing off");
                ERROR_BACKOFF
            }
        };

        tokio::select! {
            _ = sleep(pause) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    // The session owning the stop channel is gone.
                    let _ = phase_tx.send(MonitorPhase::Stopping);
                    break;
                }
            }
        }
    }

    let _ = phase_tx.send(MonitorPhase::Stopped);
    info!(profile = %account.profile_id, "account monitor stopped");
}

async fn run_iteration(
    account: &Account,
    iteration: u64,
    patterns: &mut Arc<HashSet<String>>,
    deps: &WorkerDeps,
) -> Result<(), FetchError> {
    if iteration % REFRESH_EVERY == 0 {
        *patterns = deps
            .state
            .cache()
            .refresh(&account.profile_id, &account.api_key, deps.denylists.as_ref())
            .await;
        info!(profile = %account.profile_id, patterns = patterns.len(), "denylist refreshed");
    }

    let batch = deps
        .logs
        .fetch_logs(&account.profile_id, &account.api_key, LOG_WINDOW)
        .await?;
    counter!("monitor_polls_total", "result" => "ok").increment(1);

    let blocked: Vec<&LogEntry> = batch.iter().filter(|entry| entry.is_blocked()).collect();
    if !batch.is_empty() {
        debug!(
            profile = %account.profile_id,
            total = batch.len(),
            blocked = blocked.len(),
            "log batch fetched"
        );
    }
    histogram!("monitor_blocked_entries").record(blocked.len() as f64);

    for entry in blocked {
        process_blocked_entry(
            account,
            entry,
            patterns,
            &deps.state,
            deps.alerts.as_ref(),
            &deps.flusher,
        )
        .await;
    }

    let evicted = deps.state.ledger().prune(&account.profile_id);
    if evicted > 0 {
        debug!(profile = %account.profile_id, evicted, "dedup ledger pruned");
    }

    if iteration % FLUSH_EVERY == 0 {
        deps.flusher.flush().await;
    }

    Ok(())
}
