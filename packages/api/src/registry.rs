//! Destination registry
//!
//! Local persistence of the destinations registered in the routing service,
//! keyed by the CRM's payment processor.

use crate::entity::{payment_processor, webhook_destination};
use chrono::Utc;
use relay_routing::{ProcessorType, SigningSecret};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use utoipa::ToSchema;

/// A destination about to be persisted
#[derive(Debug, Clone)]
pub struct NewDestination {
    pub source_id: String,
    pub destination_id: String,
    pub signing_secret: SigningSecret,
    pub processor_id: i32,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewProcessor {
    pub name: String,
    #[schema(value_type = String, example = "stripe")]
    pub processor_type: ProcessorType,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Storage of destination records and the processors they belong to
#[async_trait::async_trait]
pub trait DestinationRegistry: Send + Sync {
    /// Insert a record; id and creation timestamp are generated
    async fn create(
        &self,
        destination: NewDestination,
    ) -> Result<webhook_destination::Model, DbErr>;

    /// Newest destination whose processor belongs to `processor_type`
    ///
    /// With `active_only`, destinations of inactive processors are skipped.
    async fn get_by_processor_type(
        &self,
        processor_type: ProcessorType,
        active_only: bool,
    ) -> Result<Option<webhook_destination::Model>, DbErr>;

    /// Newest destination of a processor
    async fn get_by_processor_id(
        &self,
        processor_id: i32,
    ) -> Result<Option<webhook_destination::Model>, DbErr>;

    async fn get_by_id(&self, id: i32) -> Result<Option<webhook_destination::Model>, DbErr>;

    async fn get_by_destination_id(
        &self,
        destination_id: &str,
    ) -> Result<Option<webhook_destination::Model>, DbErr>;

    /// Every record, newest first
    async fn list(&self) -> Result<Vec<webhook_destination::Model>, DbErr>;

    async fn list_by_processor_id(
        &self,
        processor_id: i32,
    ) -> Result<Vec<webhook_destination::Model>, DbErr>;

    /// Delete a record; returns whether a row was removed
    async fn delete_by_id(&self, id: i32) -> Result<bool, DbErr>;

    async fn delete_by_destination_id(&self, destination_id: &str) -> Result<bool, DbErr>;

    async fn get_processor(&self, id: i32) -> Result<Option<payment_processor::Model>, DbErr>;

    async fn create_processor(
        &self,
        processor: NewProcessor,
    ) -> Result<payment_processor::Model, DbErr>;

    async fn list_processors(&self) -> Result<Vec<payment_processor::Model>, DbErr>;

    /// Delete a processor together with its destination records
    async fn delete_processor(&self, id: i32) -> Result<bool, DbErr>;
}

/// [`DestinationRegistry`] backed by the application database
#[derive(Clone)]
pub struct SeaOrmDestinationRegistry {
    db: DatabaseConnection,
}

impl SeaOrmDestinationRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl DestinationRegistry for SeaOrmDestinationRegistry {
    async fn create(
        &self,
        destination: NewDestination,
    ) -> Result<webhook_destination::Model, DbErr> {
        let record = webhook_destination::ActiveModel {
            source_id: Set(destination.source_id),
            destination_id: Set(destination.destination_id),
            signing_secret: Set(destination.signing_secret.into_inner()),
            processor_id: Set(destination.processor_id),
            created_by: Set(destination.created_by),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::debug!(
            record_id = record.id,
            destination_id = %record.destination_id,
            processor_id = record.processor_id,
            "Persisted webhook destination"
        );
        Ok(record)
    }

    async fn get_by_processor_type(
        &self,
        processor_type: ProcessorType,
        active_only: bool,
    ) -> Result<Option<webhook_destination::Model>, DbErr> {
        let mut query = webhook_destination::Entity::find()
            .inner_join(payment_processor::Entity)
            .filter(payment_processor::Column::ProcessorType.eq(processor_type.as_str()));

        if active_only {
            query = query.filter(payment_processor::Column::IsActive.eq(true));
        }

        query
            .order_by_desc(webhook_destination::Column::CreatedAt)
            .order_by_desc(webhook_destination::Column::Id)
            .one(&self.db)
            .await
    }

    async fn get_by_processor_id(
        &self,
        processor_id: i32,
    ) -> Result<Option<webhook_destination::Model>, DbErr> {
        webhook_destination::Entity::find()
            .filter(webhook_destination::Column::ProcessorId.eq(processor_id))
            .order_by_desc(webhook_destination::Column::CreatedAt)
            .order_by_desc(webhook_destination::Column::Id)
            .one(&self.db)
            .await
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<webhook_destination::Model>, DbErr> {
        webhook_destination::Entity::find_by_id(id)
            .one(&self.db)
            .await
    }

    async fn get_by_destination_id(
        &self,
        destination_id: &str,
    ) -> Result<Option<webhook_destination::Model>, DbErr> {
        webhook_destination::Entity::find()
            .filter(webhook_destination::Column::DestinationId.eq(destination_id))
            .one(&self.db)
            .await
    }

    async fn list(&self) -> Result<Vec<webhook_destination::Model>, DbErr> {
        webhook_destination::Entity::find()
            .order_by_desc(webhook_destination::Column::CreatedAt)
            .order_by_desc(webhook_destination::Column::Id)
            .all(&self.db)
            .await
    }

    async fn list_by_processor_id(
        &self,
        processor_id: i32,
    ) -> Result<Vec<webhook_destination::Model>, DbErr> {
        webhook_destination::Entity::find()
            .filter(webhook_destination::Column::ProcessorId.eq(processor_id))
            .order_by_desc(webhook_destination::Column::CreatedAt)
            .order_by_desc(webhook_destination::Column::Id)
            .all(&self.db)
            .await
    }

    async fn delete_by_id(&self, id: i32) -> Result<bool, DbErr> {
        let result = webhook_destination::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_by_destination_id(&self, destination_id: &str) -> Result<bool, DbErr> {
        let result = webhook_destination::Entity::delete_many()
            .filter(webhook_destination::Column::DestinationId.eq(destination_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn get_processor(&self, id: i32) -> Result<Option<payment_processor::Model>, DbErr> {
        payment_processor::Entity::find_by_id(id).one(&self.db).await
    }

    async fn create_processor(
        &self,
        processor: NewProcessor,
    ) -> Result<payment_processor::Model, DbErr> {
        payment_processor::ActiveModel {
            name: Set(processor.name),
            processor_type: Set(processor.processor_type.as_str().to_string()),
            is_active: Set(processor.is_active),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    async fn list_processors(&self) -> Result<Vec<payment_processor::Model>, DbErr> {
        payment_processor::Entity::find()
            .order_by_asc(payment_processor::Column::Id)
            .all(&self.db)
            .await
    }

    async fn delete_processor(&self, id: i32) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;

        // rows go explicitly so the cascade holds without foreign key enforcement
        let destinations = webhook_destination::Entity::delete_many()
            .filter(webhook_destination::Column::ProcessorId.eq(id))
            .exec(&txn)
            .await?;
        let processor = payment_processor::Entity::delete_by_id(id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(
            processor_id = id,
            destinations = destinations.rows_affected,
            "Deleted payment processor"
        );
        Ok(processor.rows_affected > 0)
    }
}
