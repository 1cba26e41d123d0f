//! The persisted snapshot structure and the shared in-memory state all
//! account monitors mutate.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::DenylistCache;
use crate::ledger::DedupLedger;
use crate::model::{ProfileId, RequestId};

/// Durable form of the monitor state. Round-trips exactly through the state
/// store; every field is defaulted so partially written or legacy payloads
/// still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    #[serde(default)]
    pub processed_requests: HashMap<ProfileId, Vec<RequestId>>,
    #[serde(default)]
    pub denylist_cache: HashMap<ProfileId, Vec<String>>,
    #[serde(default)]
    pub last_saved: Option<DateTime<Utc>>,
}

/// Shared in-memory monitor state: dedup ledgers, denylist cache, and the
/// session counters backing the dashboard. Loaded once at startup, mutated
/// by account monitors behind interior locks, flushed whole by the single
/// flush writer.
#[derive(Debug, Default)]
pub struct MonitorState {
    ledger: DedupLedger,
    cache: DenylistCache,
    session_blocks: RwLock<HashMap<ProfileId, u64>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: MonitorSnapshot) -> Self {
        let state = Self::new();
        state.ledger.restore(snapshot.processed_requests);
        state.cache.restore(snapshot.denylist_cache);
        state
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn cache(&self) -> &DenylistCache {
        &self.cache
    }

    /// Full snapshot of the current state, stamped with the current time.
    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            processed_requests: self.ledger.entries(),
            denylist_cache: self.cache.entries(),
            last_saved: Some(Utc::now()),
        }
    }

    /// Bumps the session alert counter for a profile.
    pub fn record_block(&self, profile: &ProfileId) {
        let mut guard = self
            .session_blocks
            .write()
            .expect("session counters lock poisoned");
        *guard.entry(profile.clone()).or_insert(0) += 1;
    }

    /// Alerts dispatched for a profile during the current session.
    pub fn recent_blocks(&self, profile: &ProfileId) -> u64 {
        self.session_blocks
            .read()
            .expect("session counters lock poisoned")
            .get(profile)
            .copied()
            .unwrap_or(0)
    }

    /// Clears session counters; called when a new monitoring session starts.
    pub fn reset_session_counters(&self) {
        self.session_blocks
            .write()
            .expect("session counters lock poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serde_round_trip() {
        let state = MonitorState::new();
        state
            .ledger()
            .record(&ProfileId::new("a"), RequestId::from_parts("evil.com", 1));
        state
            .ledger()
            .record(&ProfileId::new("a"), RequestId::from_parts("evil.com", 2));
        state
            .cache()
            .replace(&ProfileId::new("a"), vec!["evil.com".to_string()]);
        state.cache().replace(
            &ProfileId::new("b"),
            vec!["*.ads.net".to_string(), "tracker.io".to_string()],
        );

        let snapshot = state.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: MonitorSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn empty_snapshot_round_trips() {
        let snapshot = MonitorSnapshot::default();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: MonitorSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn missing_fields_default_on_load() {
        let decoded: MonitorSnapshot = serde_json::from_str("{}").unwrap();
        assert!(decoded.processed_requests.is_empty());
        assert!(decoded.denylist_cache.is_empty());
        assert!(decoded.last_saved.is_none());
    }

    #[test]
    fn from_snapshot_restores_ledger_and_cache() {
        let mut snapshot = MonitorSnapshot::default();
        snapshot.processed_requests.insert(
            ProfileId::new("a"),
            vec![RequestId::from_parts("evil.com", 1000)],
        );
        snapshot
            .denylist_cache
            .insert(ProfileId::new("a"), vec!["evil.com".to_string()]);

        let state = MonitorState::from_snapshot(snapshot);
        assert!(state.ledger().has(
            &ProfileId::new("a"),
            &RequestId::from_parts("evil.com", 1000)
        ));
        assert!(state.cache().get(&ProfileId::new("a")).contains("evil.com"));
    }

    #[test]
    fn session_counters_track_per_profile() {
        let state = MonitorState::new();
        state.record_block(&ProfileId::new("a"));
        state.record_block(&ProfileId::new("a"));
        state.record_block(&ProfileId::new("b"));
        assert_eq!(state.recent_blocks(&ProfileId::new("a")), 2);
        assert_eq!(state.recent_blocks(&ProfileId::new("b")), 1);
        assert_eq!(state.recent_blocks(&ProfileId::new("c")), 0);

        state.reset_session_counters();
        assert_eq!(state.recent_blocks(&ProfileId::new("a")), 0);
    }
}
