//! Per-account dedup ledger of already-alerted request ids.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use crate::model::{ProfileId, RequestId};

/// Prune fires once a per-account set grows past this many ids.
pub const LEDGER_CAPACITY: usize = 2000;
/// Ids retained by a prune, counted from the most recently inserted.
pub const LEDGER_RETAIN: usize = 1000;

/// Insertion-ordered id set for one account: the deque carries the order,
/// the hash set answers membership.
#[derive(Debug, Default)]
struct AccountLedger {
    order: VecDeque<RequestId>,
    seen: HashSet<RequestId>,
}

impl AccountLedger {
    fn record(&mut self, id: RequestId) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    fn prune(&mut self) -> usize {
        if self.order.len() <= LEDGER_CAPACITY {
            return 0;
        }
        let mut evicted = 0;
        while self.order.len() > LEDGER_RETAIN {
            if let Some(id) = self.order.pop_front() {
                self.seen.remove(&id);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Bounded, persisted record of request ids that have already produced an
/// alert, keyed by profile.
///
/// Pruning retains the most recently *inserted* ids, not the ids with the
/// most recent event timestamps: an id recorded out of chronological order
/// can be evicted while chronologically newer ids survive. This mirrors the
/// ordered-set semantics of the persisted form and is accepted behavior.
#[derive(Debug, Default)]
pub struct DedupLedger {
    inner: RwLock<HashMap<ProfileId, AccountLedger>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, profile: &ProfileId, id: &RequestId) -> bool {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .get(profile)
            .is_some_and(|ledger| ledger.seen.contains(id))
    }

    /// Records an id; returns `false` when it was already present.
    pub fn record(&self, profile: &ProfileId, id: RequestId) -> bool {
        self.inner
            .write()
            .expect("ledger lock poisoned")
            .entry(profile.clone())
            .or_default()
            .record(id)
    }

    /// Evicts oldest-inserted ids once the account's set exceeds
    /// [`LEDGER_CAPACITY`], keeping the last [`LEDGER_RETAIN`] insertions.
    /// Returns the number of ids evicted.
    pub fn prune(&self, profile: &ProfileId) -> usize {
        self.inner
            .write()
            .expect("ledger lock poisoned")
            .get_mut(profile)
            .map_or(0, AccountLedger::prune)
    }

    pub fn len(&self, profile: &ProfileId) -> usize {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .get(profile)
            .map_or(0, |ledger| ledger.order.len())
    }

    pub fn is_empty(&self, profile: &ProfileId) -> bool {
        self.len(profile) == 0
    }

    /// Snapshot view of every account's ids in insertion order.
    pub fn entries(&self) -> HashMap<ProfileId, Vec<RequestId>> {
        let guard = self.inner.read().expect("ledger lock poisoned");
        guard
            .iter()
            .map(|(profile, ledger)| (profile.clone(), ledger.order.iter().cloned().collect()))
            .collect()
    }

    /// Rebuilds ledgers from a persisted snapshot, preserving order and
    /// dropping duplicate ids.
    pub fn restore(&self, entries: HashMap<ProfileId, Vec<RequestId>>) {
        let mut guard = self.inner.write().expect("ledger lock poisoned");
        for (profile, ids) in entries {
            let ledger = guard.entry(profile).or_default();
            for id in ids {
                ledger.record(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(p: &str) -> ProfileId {
        ProfileId::new(p)
    }

    fn id(n: usize) -> RequestId {
        RequestId::from_parts("evil.com", n as i64)
    }

    #[test]
    fn record_and_has_are_account_scoped() {
        let ledger = DedupLedger::new();
        assert!(ledger.record(&profile("a"), id(1)));
        assert!(ledger.has(&profile("a"), &id(1)));
        assert!(!ledger.has(&profile("b"), &id(1)));
    }

    #[test]
    fn duplicate_record_is_rejected() {
        let ledger = DedupLedger::new();
        assert!(ledger.record(&profile("a"), id(1)));
        assert!(!ledger.record(&profile("a"), id(1)));
        assert_eq!(ledger.len(&profile("a")), 1);
    }

    #[test]
    fn prune_below_capacity_is_a_noop() {
        let ledger = DedupLedger::new();
        for n in 0..LEDGER_CAPACITY {
            ledger.record(&profile("a"), id(n));
        }
        assert_eq!(ledger.prune(&profile("a")), 0);
        assert_eq!(ledger.len(&profile("a")), LEDGER_CAPACITY);
    }

    #[test]
    fn prune_retains_last_inserted_ids() {
        let ledger = DedupLedger::new();
        let total = LEDGER_CAPACITY + 1;
        for n in 0..total {
            ledger.record(&profile("a"), id(n));
        }

        let evicted = ledger.prune(&profile("a"));
        assert_eq!(evicted, total - LEDGER_RETAIN);
        assert_eq!(ledger.len(&profile("a")), LEDGER_RETAIN);

        // Exactly the last LEDGER_RETAIN insertions survive.
        for n in 0..(total - LEDGER_RETAIN) {
            assert!(!ledger.has(&profile("a"), &id(n)));
        }
        for n in (total - LEDGER_RETAIN)..total {
            assert!(ledger.has(&profile("a"), &id(n)));
        }
    }

    #[test]
    fn entries_preserve_insertion_order() {
        let ledger = DedupLedger::new();
        ledger.record(&profile("a"), id(3));
        ledger.record(&profile("a"), id(1));
        ledger.record(&profile("a"), id(2));

        let entries = ledger.entries();
        assert_eq!(entries[&profile("a")], vec![id(3), id(1), id(2)]);

        let restored = DedupLedger::new();
        restored.restore(entries.clone());
        assert_eq!(restored.entries(), entries);
    }
}
