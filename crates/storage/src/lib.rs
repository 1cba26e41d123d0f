//! SeaORM-backed implementation of the domain `StateStore` trait, keeping
//! the database backend swappable (SQLite by default, PostgreSQL via
//! feature flag). The whole monitor snapshot persists as one keyed JSON
//! row, so every save is a full-snapshot write by construction.

mod entity;
mod migration;
mod state_store;

use std::sync::Arc;

use denywatch_domain::sources::{StorageError, StorageResult};
use migration::run_migrations;
use sea_orm::{Database, DatabaseConnection};

/// Shared storage handle used by the API and monitor binaries.
#[derive(Clone)]
pub struct SeaOrmStateStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStateStore {
    /// Connects to the provided database URL and ensures the schema is
    /// present.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let db = Database::connect(database_url)
            .await
            .map_err(StorageError::from_source)?;
        run_migrations(&db).await?;
        Ok(Self { db: Arc::new(db) })
    }

    pub(crate) fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }
}
