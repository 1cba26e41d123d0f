//! Mock collaborators shared by the engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use denywatch_domain::model::{
    Account, ApiCredential, BlockedAlert, LogEntry, LogStatus, ProfileId,
};
use denywatch_domain::sources::{
    AlertSink, DenylistSource, FetchError, LogSource, StateStore, StorageError, StorageResult,
};
use denywatch_domain::state::MonitorSnapshot;

pub(crate) fn account(profile: &str, name: &str) -> Account {
    Account {
        profile_id: ProfileId::new(profile),
        name: name.to_string(),
        profile_name: String::new(),
        api_key: ApiCredential::new("test-key"),
        active: true,
    }
}

pub(crate) fn blocked_entry(domain: &str, timestamp: i64) -> LogEntry {
    LogEntry {
        domain: domain.to_string(),
        status: LogStatus::Code(2),
        timestamp: Some(timestamp),
        ..Default::default()
    }
}

pub(crate) struct MemoryStateStore {
    saves: Mutex<Vec<MonitorSnapshot>>,
    fail: bool,
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self {
            saves: Mutex::new(Vec::new()),
            fail: false,
        }
    }
}

impl MemoryStateStore {
    pub(crate) fn failing() -> Self {
        Self {
            saves: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub(crate) fn last_saved(&self) -> Option<MonitorSnapshot> {
        self.saves.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> StorageResult<Option<MonitorSnapshot>> {
        Ok(self.last_saved())
    }

    async fn save(&self, snapshot: &MonitorSnapshot) -> StorageResult<()> {
        if self.fail {
            return Err(StorageError::Database("disk full".to_string()));
        }
        self.saves.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

pub(crate) struct CountingAlertSink {
    sent: Mutex<Vec<BlockedAlert>>,
    delivering: bool,
}

impl Default for CountingAlertSink {
    fn default() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            delivering: true,
        }
    }
}

impl CountingAlertSink {
    pub(crate) fn undeliverable() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            delivering: false,
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn alerts(&self) -> Vec<BlockedAlert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for CountingAlertSink {
    async fn send(&self, alert: &BlockedAlert) -> bool {
        self.sent.lock().unwrap().push(alert.clone());
        self.delivering
    }
}

pub(crate) struct StaticDenylistSource {
    result: Result<Vec<String>, FetchError>,
}

impl StaticDenylistSource {
    pub(crate) fn ok(domains: &[&str]) -> Self {
        Self {
            result: Ok(domains.iter().map(|d| d.to_string()).collect()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            result: Err(FetchError::Status(500)),
        }
    }
}

#[async_trait]
impl DenylistSource for StaticDenylistSource {
    async fn fetch_denylist(
        &self,
        _profile: &ProfileId,
        _credential: &ApiCredential,
    ) -> Result<Vec<String>, FetchError> {
        self.result.clone()
    }
}

/// Replays scripted batches in order, then keeps returning the fallback.
pub(crate) struct ScriptedLogSource {
    batches: Mutex<VecDeque<Result<Vec<LogEntry>, FetchError>>>,
    fallback: Result<Vec<LogEntry>, FetchError>,
    calls: AtomicUsize,
}

impl ScriptedLogSource {
    pub(crate) fn new(batches: Vec<Result<Vec<LogEntry>, FetchError>>) -> Self {
        Self {
            batches: Mutex::new(batches.into_iter().collect()),
            fallback: Ok(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn failing() -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            fallback: Err(FetchError::Transport("connection refused".to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for ScriptedLogSource {
    async fn fetch_logs(
        &self,
        _profile: &ProfileId,
        _credential: &ApiCredential,
        _window: Duration,
    ) -> Result<Vec<LogEntry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
