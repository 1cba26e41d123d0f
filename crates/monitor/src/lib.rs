//! The monitoring engine: per-account polling workers, the supervisor that
//! owns a monitoring session, the HTTP adapters for the filtering service
//! and the messaging channel, and the single-writer state flusher. The
//! binary in `main.rs` runs the engine standalone; the API crate embeds it
//! behind the control endpoints.

pub mod accounts;
pub mod flush;
pub mod nextdns;
pub mod pipeline;
pub mod supervisor;
pub mod telegram;
pub mod worker;

#[cfg(test)]
mod testing;

pub use accounts::{load_accounts, AccountsError};
pub use flush::StateFlusher;
pub use nextdns::{NextDnsClient, ProfileSummary};
pub use supervisor::{MonitorSupervisor, SupervisorError, WorkerView, STOP_GRACE};
pub use telegram::TelegramSink;
pub use worker::{
    spawn_account_monitor, MonitorError, MonitorHandle, MonitorPhase, WorkerDeps,
};
