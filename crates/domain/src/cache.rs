//! Per-account denylist cache with a stale-but-available refresh policy.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use metrics::counter;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::matcher::normalize_domain;
use crate::model::{ApiCredential, ProfileId};
use crate::sources::DenylistSource;

static EMPTY: Lazy<Arc<HashSet<String>>> = Lazy::new(|| Arc::new(HashSet::new()));

/// Holds, per profile, the last successfully fetched set of denylist
/// patterns. Refresh replaces a profile's set atomically; a failed fetch
/// keeps the previous set (stale-but-available) and is only logged.
#[derive(Debug, Default)]
pub struct DenylistCache {
    inner: RwLock<HashMap<ProfileId, Arc<HashSet<String>>>>,
}

impl DenylistCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pattern set for a profile; empty when nothing is cached yet.
    pub fn get(&self, profile: &ProfileId) -> Arc<HashSet<String>> {
        self.inner
            .read()
            .expect("denylist cache lock poisoned")
            .get(profile)
            .cloned()
            .unwrap_or_else(|| EMPTY.clone())
    }

    pub fn len(&self, profile: &ProfileId) -> usize {
        self.get(profile).len()
    }

    pub fn is_empty(&self, profile: &ProfileId) -> bool {
        self.len(profile) == 0
    }

    /// Normalizes the raw entries and atomically replaces the profile's set.
    pub fn replace(
        &self,
        profile: &ProfileId,
        raw_entries: impl IntoIterator<Item = String>,
    ) -> Arc<HashSet<String>> {
        let normalized: HashSet<String> = raw_entries
            .into_iter()
            .map(|entry| normalize_domain(&entry))
            .filter(|entry| !entry.is_empty())
            .collect();
        let replacement = Arc::new(normalized);
        self.inner
            .write()
            .expect("denylist cache lock poisoned")
            .insert(profile.clone(), replacement.clone());
        replacement
    }

    /// Fetches the denylist through `source` and replaces the cached set.
    /// On failure the previous cached value is returned unchanged and the
    /// error is reported as a warning only.
    pub async fn refresh(
        &self,
        profile: &ProfileId,
        credential: &ApiCredential,
        source: &dyn DenylistSource,
    ) -> Arc<HashSet<String>> {
        match source.fetch_denylist(profile, credential).await {
            Ok(raw) => {
                counter!("denylist_refreshes_total", "result" => "ok").increment(1);
                self.replace(profile, raw)
            }
            Err(err) => {
                counter!("denylist_refreshes_total", "result" => "stale").increment(1);
                warn!(profile = %profile, %err, "denylist refresh failed, keeping cached set");
                self.get(profile)
            }
        }
    }

    /// Snapshot view of all cached sets, values sorted for a deterministic
    /// persisted form.
    pub fn entries(&self) -> HashMap<ProfileId, Vec<String>> {
        let guard = self.inner.read().expect("denylist cache lock poisoned");
        guard
            .iter()
            .map(|(profile, set)| {
                let mut patterns: Vec<String> = set.iter().cloned().collect();
                patterns.sort();
                (profile.clone(), patterns)
            })
            .collect()
    }

    /// Restores cached sets from a persisted snapshot.
    pub fn restore(&self, entries: HashMap<ProfileId, Vec<String>>) {
        for (profile, patterns) in entries {
            self.replace(&profile, patterns);
        }
    }
}
