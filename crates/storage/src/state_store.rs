use chrono::Utc;
use sea_orm::{sea_query::OnConflict, EntityTrait, Set};
use tracing::warn;

use denywatch_domain::sources::{StateStore, StorageError, StorageResult};
use denywatch_domain::state::MonitorSnapshot;

use crate::entity::monitor_state;
use crate::SeaOrmStateStore;

const SNAPSHOT_KEY: &str = "snapshot";

#[async_trait::async_trait]
impl StateStore for SeaOrmStateStore {
    async fn load(&self) -> StorageResult<Option<MonitorSnapshot>> {
        let maybe = monitor_state::Entity::find_by_id(SNAPSHOT_KEY.to_string())
            .one(self.connection())
            .await
            .map_err(StorageError::from_source)?;

        let Some(model) = maybe else {
            return Ok(None);
        };

        match serde_json::from_str(&model.snapshot_json) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                // A corrupt row must not take the process down; the monitor
                // restarts from an empty snapshot and overwrites it on the
                // next flush.
                warn!(%err, "stored snapshot is corrupt, starting empty");
                Ok(None)
            }
        }
    }

    async fn save(&self, snapshot: &MonitorSnapshot) -> StorageResult<()> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;

        let active = monitor_state::ActiveModel {
            key: Set(SNAPSHOT_KEY.to_string()),
            snapshot_json: Set(payload),
            saved_at: Set(snapshot.last_saved.unwrap_or_else(Utc::now)),
        };
        monitor_state::Entity::insert(active)
            .on_conflict(
                OnConflict::column(monitor_state::Column::Key)
                    .update_columns([
                        monitor_state::Column::SnapshotJson,
                        monitor_state::Column::SavedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denywatch_domain::model::{ProfileId, RequestId};

    async fn store() -> SeaOrmStateStore {
        SeaOrmStateStore::connect("sqlite::memory:")
            .await
            .expect("storage inits")
    }

    fn sample_snapshot() -> MonitorSnapshot {
        let mut snapshot = MonitorSnapshot {
            last_saved: Some(Utc::now()),
            ..Default::default()
        };
        snapshot.processed_requests.insert(
            ProfileId::new("abc123"),
            vec![
                RequestId::from_parts("ads.example.com", 1000),
                RequestId::from_parts("tracker.net", 1200),
            ],
        );
        snapshot
            .processed_requests
            .insert(ProfileId::new("empty"), Vec::new());
        snapshot.denylist_cache.insert(
            ProfileId::new("abc123"),
            vec!["*.ads.net".to_string(), "tracker.net".to_string()],
        );
        snapshot
            .denylist_cache
            .insert(ProfileId::new("def456"), vec!["evil.org".to_string()]);
        snapshot
    }

    #[tokio::test]
    async fn load_on_fresh_database_is_none() {
        let store = store().await;
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let store = store().await;
        let snapshot = sample_snapshot();
        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn empty_snapshot_round_trips() {
        let store = store().await;
        let snapshot = MonitorSnapshot::default();
        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let store = store().await;
        store.save(&sample_snapshot()).await.unwrap();

        let replacement = MonitorSnapshot {
            last_saved: Some(Utc::now()),
            ..Default::default()
        };
        store.save(&replacement).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(replacement));
    }
}
