//! Domain-level building blocks shared by the monitor and API crates:
//! configuration loading, account and log models, denylist matching, the
//! per-account denylist cache and dedup ledger, the persisted snapshot
//! structure, and the collaborator traits the engine is wired against.

pub mod cache;
pub mod config;
pub mod ledger;
pub mod matcher;
pub mod model;
pub mod sources;
pub mod state;
pub mod telemetry;

pub use cache::DenylistCache;
pub use config::{ApiConfig, ConfigError, MonitorConfig};
pub use ledger::DedupLedger;
pub use matcher::{matches_denylist, normalize_domain};
pub use model::{
    Account, ApiCredential, BlockedAlert, DeviceInfo, LogEntry, LogStatus, MonitorStatus,
    ProfileId, RequestId,
};
pub use sources::{
    AlertSink, DenylistSource, FetchError, LogSource, StateStore, StorageError, StorageResult,
};
pub use state::{MonitorSnapshot, MonitorState};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryError, TelemetryGuard};
