//! `SeaORM` Entity for WebhookDestination
//!
//! One row per destination registered in the routing service. The signing
//! secret is write-once and never leaves the process: it is skipped when
//! serializing and redacted in `Debug`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_destination")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Shared ingress id of the processor family
    #[sea_orm(column_type = "Text")]
    pub source_id: String,
    /// Id assigned by the routing service
    #[sea_orm(column_type = "Text", unique)]
    pub destination_id: String,
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing, default)]
    pub signing_secret: String,
    #[sea_orm(indexed)]
    pub processor_id: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub created_by: Option<String>,
    pub created_at: DateTime,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("source_id", &self.source_id)
            .field("destination_id", &self.destination_id)
            .field("signing_secret", &"[redacted]")
            .field("processor_id", &self.processor_id)
            .field("created_by", &self.created_by)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payment_processor::Entity",
        from = "Column::ProcessorId",
        to = "super::payment_processor::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    PaymentProcessor,
}

impl Related<super::payment_processor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentProcessor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        Model {
            id: 7,
            source_id: "src_stripe".to_string(),
            destination_id: "ep_1".to_string(),
            signing_secret: "whsec_c2VjcmV0".to_string(),
            processor_id: 3,
            created_by: Some("admin".to_string()),
            created_at: chrono::NaiveDateTime::default(),
        }
    }

    #[test]
    fn debug_redacts_signing_secret() {
        let printed = format!("{:?}", model());
        assert!(printed.contains("ep_1"));
        assert!(!printed.contains("whsec_c2VjcmV0"));
    }

    #[test]
    fn serialization_skips_signing_secret() {
        let json = serde_json::to_value(model()).unwrap();
        assert!(json.get("signing_secret").is_none());
        assert_eq!(json["destination_id"], "ep_1");
    }
}
