//! Per-entry processing: denylist match, dedup, alert dispatch, and the
//! immediate flush that makes a dispatched alert durable.

use std::collections::HashSet;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info};

use denywatch_domain::matcher::{matches_denylist, normalize_domain};
use denywatch_domain::model::{Account, BlockedAlert, LogEntry, RequestId};
use denywatch_domain::sources::AlertSink;
use denywatch_domain::state::MonitorState;

use crate::flush::StateFlusher;

pub(crate) const ALERT_REASON: &str = "Blocked by custom denylist";

/// Handles one blocked log entry against the account's current pattern set.
/// Returns `true` when a new alert was dispatched.
pub async fn process_blocked_entry(
    account: &Account,
    entry: &LogEntry,
    patterns: &HashSet<String>,
    state: &MonitorState,
    alerts: &dyn AlertSink,
    flusher: &StateFlusher,
) -> bool {
    let domain = normalize_domain(entry.query_domain());
    if domain.is_empty() {
        return false;
    }
    if !matches_denylist(&domain, patterns) {
        return false;
    }

    let timestamp = entry
        .timestamp
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    let request_id = RequestId::from_parts(&domain, timestamp);
    if !state.ledger().record(&account.profile_id, request_id.clone()) {
        counter!("monitor_alerts_total", "result" => "duplicate").increment(1);
        debug!(profile = %account.profile_id, %request_id, "already alerted, skipping");
        return false;
    }

    state.record_block(&account.profile_id);
    let alert = build_alert(account, &domain, entry);
    info!(
        profile = %account.profile_id,
        domain = %domain,
        %request_id,
        "blocked query matched denylist"
    );

    let delivered = alerts.send(&alert).await;
    if delivered {
        counter!("monitor_alerts_total", "result" => "sent").increment(1);
    } else {
        counter!("monitor_alerts_total", "result" => "undelivered").increment(1);
    }

    // The id must be durable before the next alert for this account.
    flusher.flush().await;
    true
}

fn build_alert(account: &Account, domain: &str, entry: &LogEntry) -> BlockedAlert {
    let device = entry.device.as_ref();

    let mut reason = String::from(ALERT_REASON);
    if let Some(name) = device
        .map(|d| d.name.as_str())
        .filter(|name| !name.is_empty())
    {
        reason.push_str(&format!(" (Device: {name})"));
    }

    let client_ip = entry
        .client_ip
        .clone()
        .filter(|ip| !ip.is_empty())
        .or_else(|| device.map(|d| d.id.clone()).filter(|id| !id.is_empty()));

    BlockedAlert {
        account_name: account.name.clone(),
        domain: domain.to_string(),
        reason,
        client_ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::{account, blocked_entry, CountingAlertSink, MemoryStateStore};
    use denywatch_domain::model::DeviceInfo;

    fn patterns(entries: &[&str]) -> HashSet<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    fn fixture() -> (Arc<MonitorState>, Arc<MemoryStateStore>, StateFlusher) {
        let state = Arc::new(MonitorState::new());
        let store = Arc::new(MemoryStateStore::default());
        let flusher = StateFlusher::new(store.clone(), state.clone());
        (state, store, flusher)
    }

    #[tokio::test]
    async fn matching_entry_produces_one_alert() {
        let (state, store, flusher) = fixture();
        let sink = CountingAlertSink::default();
        let account = account("abc123", "Home");
        let set = patterns(&["ads.example.com"]);

        let batch = vec![
            blocked_entry("ads.example.com", 1000),
            blocked_entry("safe.com", 1001),
        ];
        let mut alerted = 0;
        for entry in &batch {
            if process_blocked_entry(&account, entry, &set, &state, &sink, &flusher).await {
                alerted += 1;
            }
        }

        assert_eq!(alerted, 1);
        assert_eq!(sink.count(), 1);
        assert_eq!(sink.alerts()[0].domain, "ads.example.com");
        assert!(state.ledger().has(
            &account.profile_id,
            &RequestId::from_parts("ads.example.com", 1000)
        ));
        // The alert triggered an immediate durable flush.
        assert_eq!(store.save_count(), 1);
        assert_eq!(state.recent_blocks(&account.profile_id), 1);
    }

    #[tokio::test]
    async fn reprocessing_a_batch_is_fully_deduped() {
        let (state, store, flusher) = fixture();
        let sink = CountingAlertSink::default();
        let account = account("abc123", "Home");
        let set = patterns(&["ads.example.com"]);

        let batch = vec![
            blocked_entry("ads.example.com", 1000),
            blocked_entry("ads.example.com", 2000),
        ];
        for _pass in 0..2 {
            for entry in &batch {
                process_blocked_entry(&account, entry, &set, &state, &sink, &flusher).await;
            }
        }

        assert_eq!(sink.count(), 2);
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn empty_domain_is_skipped() {
        let (state, _store, flusher) = fixture();
        let sink = CountingAlertSink::default();
        let account = account("abc123", "Home");

        let entry = blocked_entry("", 1000);
        let handled = process_blocked_entry(
            &account,
            &entry,
            &patterns(&["ads.example.com"]),
            &state,
            &sink,
            &flusher,
        )
        .await;

        assert!(!handled);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn alert_carries_device_label_and_ip_fallback() {
        let (state, _store, flusher) = fixture();
        let sink = CountingAlertSink::default();
        let account = account("abc123", "Home");

        let mut entry = blocked_entry("ads.example.com", 1000);
        entry.device = Some(DeviceInfo {
            id: "dev-1".to_string(),
            name: "laptop".to_string(),
        });

        process_blocked_entry(
            &account,
            &entry,
            &patterns(&["ads.example.com"]),
            &state,
            &sink,
            &flusher,
        )
        .await;

        let alert = &sink.alerts()[0];
        assert_eq!(alert.reason, "Blocked by custom denylist (Device: laptop)");
        // No clientIp on the entry: the device id stands in.
        assert_eq!(alert.client_ip.as_deref(), Some("dev-1"));
    }

    #[tokio::test]
    async fn undelivered_alert_is_still_recorded() {
        let (state, _store, flusher) = fixture();
        let sink = CountingAlertSink::undeliverable();
        let account = account("abc123", "Home");
        let set = patterns(&["ads.example.com"]);

        let entry = blocked_entry("ads.example.com", 1000);
        assert!(process_blocked_entry(&account, &entry, &set, &state, &sink, &flusher).await);
        // At-most-once alerting: the failed send is not retried.
        assert!(!process_blocked_entry(&account, &entry, &set, &state, &sink, &flusher).await);
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn subdomain_matches_bare_pattern() {
        let (state, _store, flusher) = fixture();
        let sink = CountingAlertSink::default();
        let account = account("abc123", "Home");

        let entry = blocked_entry("deep.sub.evil.com", 1000);
        let handled = process_blocked_entry(
            &account,
            &entry,
            &patterns(&["evil.com"]),
            &state,
            &sink,
            &flusher,
        )
        .await;

        assert!(handled);
        assert!(state.ledger().has(
            &account.profile_id,
            &RequestId::from_parts("deep.sub.evil.com", 1000)
        ));
    }
}
