use crate::config::RelayConfig;
use crate::registry::{DestinationRegistry, SeaOrmDestinationRegistry};
use crate::workflow::{DestinationRemover, Registrar, WebhookVerifier};
use relay_routing::client::create_client;
use relay_routing::{RoutingApi, RoutingResult};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub type AppState = Arc<State>;

pub struct State {
    pub db: DatabaseConnection,
    pub config: Arc<RelayConfig>,
    pub routing: Arc<dyn RoutingApi>,
    pub registry: Arc<dyn DestinationRegistry>,
    pub registrar: Registrar,
    pub verifier: WebhookVerifier,
    pub remover: DestinationRemover,
}

impl State {
    /// Build the state with the routing backend selected by `config`
    pub fn from_config(db: DatabaseConnection, config: RelayConfig) -> RoutingResult<Self> {
        let routing = create_client(config.routing_provider, config.svix_config())?;
        Ok(Self::new(db, config, routing))
    }

    pub fn new(db: DatabaseConnection, config: RelayConfig, routing: Arc<dyn RoutingApi>) -> Self {
        let registry: Arc<dyn DestinationRegistry> =
            Arc::new(SeaOrmDestinationRegistry::new(db.clone()));
        Self::with_registry(db, config, routing, registry)
    }

    pub fn with_registry(
        db: DatabaseConnection,
        config: RelayConfig,
        routing: Arc<dyn RoutingApi>,
        registry: Arc<dyn DestinationRegistry>,
    ) -> Self {
        let config = Arc::new(config);

        Self {
            registrar: Registrar::new(config.clone(), routing.clone(), registry.clone()),
            verifier: WebhookVerifier::new(registry.clone()),
            remover: DestinationRemover::new(routing.clone(), registry.clone()),
            db,
            config,
            routing,
            registry,
        }
    }
}
