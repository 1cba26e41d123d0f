//! Core data types: accounts, credentials, log-entry wire shapes, and the
//! identifiers used for deduplication.

use std::fmt;

use hex::encode as hex_encode;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Number of hex characters of the SHA3-256 digest kept when fingerprinting
/// a credential for log output.
const FINGERPRINT_LEN: usize = 16;

/// Identifier of one filtering-service profile. Profile ids are opaque
/// alphanumeric strings; surrounding whitespace is stripped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// API key for the filtering service. The raw value is only exposed through
/// [`ApiCredential::expose`] for request headers; `Debug` and `Display`
/// render a SHA3-256 fingerprint so keys never leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// Raw key material, for the `X-Api-Key` request header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Deterministic short fingerprint safe to log.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(self.0.as_bytes());
        let digest = hex_encode(hasher.finalize());
        digest[..FINGERPRINT_LEN].to_string()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiCredential({})", self.fingerprint())
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

/// One monitored account. Owned by the external account store; the monitor
/// receives it by value for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub profile_id: ProfileId,
    pub name: String,
    pub profile_name: String,
    pub api_key: ApiCredential,
    pub active: bool,
}

/// Deduplication key for one blocked-query event, derived deterministically
/// from the query domain and the event timestamp in ms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn from_parts(domain: &str, timestamp_ms: i64) -> Self {
        Self(format!("{domain}_{timestamp_ms}"))
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status field of a log entry. The wire format uses either the numeric code
/// `2` or the string `"blocked"` for denied queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogStatus {
    Code(i64),
    Label(String),
}

impl LogStatus {
    pub fn is_blocked(&self) -> bool {
        match self {
            LogStatus::Code(code) => *code == 2,
            LogStatus::Label(label) => label == "blocked",
        }
    }
}

impl Default for LogStatus {
    fn default() -> Self {
        LogStatus::Code(0)
    }
}

/// Device information optionally attached to a log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One entry from the log-query endpoint. Every field is defaulted so an
/// unexpected payload shape degrades to an inert entry instead of a decode
/// failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub status: LogStatus,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, rename = "clientIp")]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub device: Option<DeviceInfo>,
}

impl LogEntry {
    /// The queried domain: `name` with `domain` as the fallback field.
    pub fn query_domain(&self) -> &str {
        if self.name.is_empty() {
            &self.domain
        } else {
            &self.name
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status.is_blocked()
    }
}

/// Payload handed to the alert sink for one newly detected blocked query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedAlert {
    pub account_name: String,
    pub domain: String,
    pub reason: String,
    pub client_ip: Option<String>,
}

/// Per-account monitoring counters exposed for dashboard rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub denylist_size: usize,
    pub recent_block_count: u64,
}
