use crate::entity::webhook_destination;
use crate::error::RelayError;
use crate::registry::DestinationRegistry;
use relay_routing::RoutingApi;
use std::sync::Arc;

/// Removes destinations from the routing service and the registry
///
/// Remote failures only produce warnings here: the local record may outlive
/// its remote counterpart and must still be deletable.
pub struct DestinationRemover {
    routing: Arc<dyn RoutingApi>,
    registry: Arc<dyn DestinationRegistry>,
}

impl DestinationRemover {
    pub fn new(routing: Arc<dyn RoutingApi>, registry: Arc<dyn DestinationRegistry>) -> Self {
        Self { routing, registry }
    }

    /// Delete a destination record and its remote destination
    ///
    /// Returns `false` when no record with `record_id` exists.
    pub async fn delete_destination(&self, record_id: i32) -> Result<bool, RelayError> {
        let Some(record) = self.registry.get_by_id(record_id).await? else {
            tracing::debug!(record_id, "No destination record to delete");
            return Ok(false);
        };

        self.delete_remote(&record).await;
        self.registry.delete_by_id(record.id).await?;

        tracing::info!(
            record_id,
            destination_id = %record.destination_id,
            "Deleted webhook destination"
        );
        Ok(true)
    }

    /// Delete a payment processor with all of its destinations
    ///
    /// Returns `false` when the processor does not exist.
    pub async fn delete_processor(&self, processor_id: i32) -> Result<bool, RelayError> {
        if self.registry.get_processor(processor_id).await?.is_none() {
            return Ok(false);
        }

        for record in self.registry.list_by_processor_id(processor_id).await? {
            self.delete_remote(&record).await;
        }

        Ok(self.registry.delete_processor(processor_id).await?)
    }

    async fn delete_remote(&self, record: &webhook_destination::Model) {
        match self
            .routing
            .delete_destination(&record.source_id, &record.destination_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                destination_id = %record.destination_id,
                source_id = %record.source_id,
                "Destination was already gone from the routing service"
            ),
            Err(e) => tracing::warn!(
                destination_id = %record.destination_id,
                source_id = %record.source_id,
                error = %e,
                "Failed to delete destination from the routing service"
            ),
        }
    }
}
