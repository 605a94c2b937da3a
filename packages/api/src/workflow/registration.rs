use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::registry::{DestinationRegistry, NewDestination};
use relay_routing::{FilterScript, ProcessorType, RoutingApi, RoutingResult};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterDestination {
    /// Processor family identifier, e.g. `stripe`
    pub processor_type: String,
    pub processor_id: i32,
    /// Value of the family's routing field, e.g. a connected account id
    pub routing_value: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Registers a destination in the routing service and mirrors it locally
///
/// Any previously active destination for the same webhook URL is disabled
/// first, so at most one destination per URL receives events.
pub struct Registrar {
    config: Arc<RelayConfig>,
    routing: Arc<dyn RoutingApi>,
    registry: Arc<dyn DestinationRegistry>,
}

impl Registrar {
    pub fn new(
        config: Arc<RelayConfig>,
        routing: Arc<dyn RoutingApi>,
        registry: Arc<dyn DestinationRegistry>,
    ) -> Self {
        Self {
            config,
            routing,
            registry,
        }
    }

    /// Register a destination and return the routing service's id for it
    ///
    /// Nothing is persisted unless every remote step succeeded. Destinations
    /// disabled along the way stay disabled when a later step fails.
    pub async fn register(
        &self,
        request: &RegisterDestination,
        session_identity: &str,
    ) -> Result<String, RelayError> {
        let processor_type: ProcessorType = request.processor_type.parse()?;

        let routing_value = request.routing_value.trim();
        if routing_value.is_empty() {
            return Err(RelayError::InvalidRequest(
                "routing_value must not be empty".to_string(),
            ));
        }

        let source_id = self
            .config
            .source_id(processor_type)
            .ok_or_else(|| RelayError::missing_source(processor_type))?;

        let processor = self
            .registry
            .get_processor(request.processor_id)
            .await?
            .ok_or_else(|| {
                RelayError::NotFound(format!("Payment processor {}", request.processor_id))
            })?;
        if processor.processor_type != processor_type.as_str() {
            return Err(RelayError::InvalidRequest(format!(
                "Payment processor {} is a {} processor, not {}",
                processor.id, processor.processor_type, processor_type
            )));
        }

        let webhook_url = processor_type.webhook_url(&self.config.public_base_url);

        tracing::info!(
            processor_type = %processor_type,
            processor_id = request.processor_id,
            source_id,
            "Registering webhook destination"
        );

        let disabled = self.disable_existing(source_id, &webhook_url).await?;

        let filter = processor_type.filter_for(routing_value)?;
        let description = processor_type.description(routing_value);

        let destination = remote(
            "create destination",
            source_id,
            self.routing
                .create_destination(source_id, &webhook_url, &description)
                .await,
        )?;

        remote(
            "set transformation",
            source_id,
            self.routing
                .set_transformation(source_id, &destination.id, &filter.build())
                .await,
        )?;

        let signing_secret = remote(
            "fetch signing secret",
            source_id,
            self.routing.get_secret(source_id, &destination.id).await,
        )?;

        let created_by = request
            .created_by
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(session_identity)
            .to_string();

        let record = self
            .registry
            .create(NewDestination {
                source_id: source_id.to_string(),
                destination_id: destination.id.clone(),
                signing_secret,
                processor_id: request.processor_id,
                created_by: Some(created_by),
            })
            .await?;

        self.prune(&disabled).await;

        tracing::info!(
            processor_type = %processor_type,
            destination_id = %destination.id,
            record_id = record.id,
            "Registered webhook destination"
        );

        Ok(destination.id)
    }

    /// Disable every active destination of the source pointing at `webhook_url`
    async fn disable_existing(
        &self,
        source_id: &str,
        webhook_url: &str,
    ) -> Result<Vec<String>, RelayError> {
        let existing = remote(
            "list destinations",
            source_id,
            self.routing.list_destinations(source_id).await,
        )?;

        let mut disabled = Vec::new();
        for destination in existing.iter().filter(|d| d.is_active_for(webhook_url)) {
            let found = remote(
                "disable destination",
                source_id,
                self.routing
                    .disable_destination(source_id, &destination.id)
                    .await,
            )?;

            if found {
                tracing::info!(destination_id = %destination.id, "Disabled previous destination");
            } else {
                tracing::warn!(
                    destination_id = %destination.id,
                    "Destination vanished before it could be disabled"
                );
            }
            disabled.push(destination.id.clone());
        }

        Ok(disabled)
    }

    /// Drop local records of destinations that no longer receive events
    async fn prune(&self, disabled: &[String]) {
        for destination_id in disabled {
            if let Err(e) = self.registry.delete_by_destination_id(destination_id).await {
                tracing::warn!(
                    destination_id = %destination_id,
                    error = %e,
                    "Failed to prune record of disabled destination"
                );
            }
        }
    }
}

fn remote<T>(
    step: &'static str,
    source_id: &str,
    result: RoutingResult<T>,
) -> Result<T, RelayError> {
    result.map_err(|e| {
        tracing::error!(step, source_id, error = %e, "Routing service request failed");
        RelayError::RemoteApiFailure(e)
    })
}
