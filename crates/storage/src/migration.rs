use sea_orm::sea_query::{ColumnDef, Table, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};

use crate::entity::monitor_state;
use denywatch_domain::sources::{StorageError, StorageResult};

pub async fn run_migrations(db: &DatabaseConnection) -> StorageResult<()> {
    let backend = db.get_database_backend();

    let monitor_table = Table::create()
        .if_not_exists()
        .table(monitor_state::Entity)
        .col(
            ColumnDef::new(monitor_state::Column::Key)
                .string_len(64)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(monitor_state::Column::SnapshotJson)
                .text()
                .not_null(),
        )
        .col(
            ColumnDef::new(monitor_state::Column::SavedAt)
                .date_time()
                .not_null(),
        )
        .to_owned();
    create_table(db, backend, monitor_table).await?;

    Ok(())
}

async fn create_table(
    db: &DatabaseConnection,
    backend: DatabaseBackend,
    mut statement: TableCreateStatement,
) -> StorageResult<()> {
    statement.if_not_exists();
    db.execute(backend.build(&statement))
        .await
        .map_err(StorageError::from_source)?;
    Ok(())
}
