//! `SeaORM` Entity for PaymentProcessor
//!
//! Minimal mirror of the CRM's processor record. Destinations hang off it and
//! are removed with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_processor")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    /// Processor family identifier, e.g. `stripe`
    #[sea_orm(column_type = "Text")]
    pub processor_type: String,
    pub is_active: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::webhook_destination::Entity")]
    WebhookDestination,
}

impl Related<super::webhook_destination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebhookDestination.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
