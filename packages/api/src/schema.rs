//! Schema bootstrap
//!
//! Tables and indexes are derived from the entity definitions, so a fresh
//! database (or an in-memory sqlite one in tests) matches the models exactly.

use crate::entity::{payment_processor, webhook_destination};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};

/// Create the relay tables and indexes when they do not exist yet
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_entity(db, payment_processor::Entity).await?;
    create_entity(db, webhook_destination::Entity).await?;
    tracing::info!("Relay schema is up to date");
    Ok(())
}

async fn create_entity<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait + Copy,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}
