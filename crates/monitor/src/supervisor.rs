//! Ownership of a monitoring session: one worker per active account,
//! single-flight start, cooperative stop with a bounded grace period.

use std::time::Duration;

use metrics::gauge;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{info, warn};

use denywatch_domain::model::{Account, MonitorStatus, ProfileId};

use crate::worker::{spawn_account_monitor, MonitorHandle, MonitorPhase, WorkerDeps};

/// Default wait for workers to finish their current iteration on stop.
pub const STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("a monitoring session is already running")]
    AlreadyRunning,
    #[error("no active accounts to monitor")]
    NoActiveAccounts,
}

/// Per-worker view for dashboard rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerView {
    pub profile_id: ProfileId,
    pub phase: MonitorPhase,
}

struct Session {
    stop_tx: watch::Sender<bool>,
    handles: Vec<MonitorHandle>,
}

/// Owns the set of running account monitors. Only one session may be active
/// at a time across the whole account set.
pub struct MonitorSupervisor {
    deps: WorkerDeps,
    session: Mutex<Option<Session>>,
}

impl MonitorSupervisor {
    pub fn new(deps: WorkerDeps) -> Self {
        Self {
            deps,
            session: Mutex::new(None),
        }
    }

    /// Spawns one worker per active account. Refuses to start a second
    /// session while one is running.
    pub async fn start_all(&self, accounts: &[Account]) -> Result<usize, SupervisorError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let active: Vec<Account> = accounts
            .iter()
            .filter(|account| account.active)
            .cloned()
            .collect();
        if active.is_empty() {
            return Err(SupervisorError::NoActiveAccounts);
        }

        self.deps.state.reset_session_counters();
        let (stop_tx, stop_rx) = watch::channel(false);
        let handles: Vec<MonitorHandle> = active
            .into_iter()
            .map(|account| spawn_account_monitor(account, self.deps.clone(), stop_rx.clone()))
            .collect();

        let started = handles.len();
        info!(workers = started, "monitoring session started");
        gauge!("monitor_workers").set(started as f64);
        *guard = Some(Session { stop_tx, handles });
        Ok(started)
    }

    /// Signals every worker to stop, waits up to `grace` for them to finish
    /// their current iteration, then forces a final state flush. Workers
    /// still mid-iteration are left to finish cooperatively; in-flight
    /// network calls are never hard-killed.
    pub async fn stop_all(&self, grace: Duration) {
        let session = self.session.lock().await.take();
        let Some(mut session) = session else {
            return;
        };

        info!("stopping monitoring session");
        let _ = session.stop_tx.send(true);

        let deadline = Instant::now() + grace;
        for handle in &mut session.handles {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, &mut handle.task).await.is_err() {
                warn!(profile = %handle.profile(), "worker still finishing, detaching");
            }
        }

        self.deps.flusher.flush().await;
        gauge!("monitor_workers").set(0.0);
        info!("monitoring session stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Per-worker phases of the current session, empty when none is active.
    pub async fn workers(&self) -> Vec<WorkerView> {
        let guard = self.session.lock().await;
        guard
            .as_ref()
            .map(|session| {
                session
                    .handles
                    .iter()
                    .map(|handle| WorkerView {
                        profile_id: handle.profile().clone(),
                        phase: handle.phase(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Dashboard counters for one account.
    pub fn status(&self, profile: &ProfileId) -> MonitorStatus {
        MonitorStatus {
            denylist_size: self.deps.state.cache().len(profile),
            recent_block_count: self.deps.state.recent_blocks(profile),
        }
    }
}
