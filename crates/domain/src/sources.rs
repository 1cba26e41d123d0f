//! Collaborator traits the monitoring engine is wired against, plus the
//! shared error types for fetch and storage operations. Concrete adapters
//! live in the monitor crate (HTTP) and the storage crate (SeaORM).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ApiCredential, BlockedAlert, LogEntry, ProfileId};
use crate::state::MonitorSnapshot;

/// Transient failure of an outbound fetch or send. Inside the monitor loop
/// these are logged and answered with a backoff sleep, never propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Fetches the custom denylist for one profile.
///
/// A non-success response or transport failure is an `Err`, never an empty
/// list, so the cache can distinguish "service said the denylist is empty"
/// from "service unreachable" and keep its stale value in the latter case.
#[async_trait]
pub trait DenylistSource: Send + Sync {
    async fn fetch_denylist(
        &self,
        profile: &ProfileId,
        credential: &ApiCredential,
    ) -> Result<Vec<String>, FetchError>;
}

/// Fetches the query log for one profile over a trailing time window.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_logs(
        &self,
        profile: &ProfileId,
        credential: &ApiCredential,
        window: Duration,
    ) -> Result<Vec<LogEntry>, FetchError>;
}

/// Dispatches one alert. Returns `false` (never an error) when the sink is
/// unconfigured or the transport fails; alerting is best-effort by contract.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &BlockedAlert) -> bool;
}

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Durable round-trip for the full monitor snapshot. `save` always writes
/// the complete snapshot; there is no account-scoped partial write.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> StorageResult<Option<MonitorSnapshot>>;
    async fn save(&self, snapshot: &MonitorSnapshot) -> StorageResult<()>;
}
