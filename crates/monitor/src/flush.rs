//! Single-writer persistence of the shared monitor state.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::Mutex;
use tracing::warn;

use denywatch_domain::sources::StateStore;
use denywatch_domain::state::MonitorState;

/// Serializes every flush through one writer lock and always writes the
/// full in-memory snapshot, so concurrent workers can never stale-overwrite
/// each other's ledger entries with an account-scoped diff.
pub struct StateFlusher {
    store: Arc<dyn StateStore>,
    state: Arc<MonitorState>,
    writer: Mutex<()>,
}

impl StateFlusher {
    pub fn new(store: Arc<dyn StateStore>, state: Arc<MonitorState>) -> Self {
        Self {
            store,
            state,
            writer: Mutex::new(()),
        }
    }

    /// Persists the current snapshot. A persistence fault is logged and
    /// counted; the in-memory state remains authoritative until the next
    /// flush succeeds.
    pub async fn flush(&self) -> bool {
        let _writer = self.writer.lock().await;
        let snapshot = self.state.snapshot();
        match self.store.save(&snapshot).await {
            Ok(()) => {
                counter!("monitor_state_flushes_total", "result" => "ok").increment(1);
                true
            }
            Err(err) => {
                warn!(%err, "state flush failed, keeping in-memory state authoritative");
                counter!("monitor_state_flushes_total", "result" => "error").increment(1);
                false
            }
        }
    }
}
