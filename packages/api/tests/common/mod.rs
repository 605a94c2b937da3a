#![allow(dead_code)]

use relay_api::config::{PersistedSettings, RelayConfig};
use relay_api::registry::{DestinationRegistry, NewProcessor, SeaOrmDestinationRegistry};
use relay_api::schema::ensure_schema;
use relay_api::state::State;
use relay_api::workflow::RegisterDestination;
use relay_routing::{InMemoryRoutingApi, ProcessorType};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

pub const BASE_URL: &str = "https://crm.test";
pub const STRIPE_SOURCE: &str = "src_stripe";
pub const GOCARDLESS_SOURCE: &str = "src_gocardless";
pub const STRIPE_URL: &str = "https://crm.test/webhook/stripe";
pub const ADMIN_TOKEN: &str = "admin_test_token";
pub const SESSION_IDENTITY: &str = "session-user";

pub struct TestContext {
    pub db: DatabaseConnection,
    pub routing: InMemoryRoutingApi,
    pub registry: Arc<SeaOrmDestinationRegistry>,
    pub state: Arc<State>,
    pub stripe_processor: i32,
    pub gocardless_processor: i32,
}

/// Fresh in-memory sqlite database with the relay schema
///
/// A single connection keeps every query on the same in-memory database.
pub async fn database() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    ensure_schema(&db).await.unwrap();
    db
}

/// Stripe and GoCardless are configured, Square has no source id
pub fn config_with(admin_token: Option<&str>) -> RelayConfig {
    let mut settings = PersistedSettings::default();
    settings.set("stripe_source_id", STRIPE_SOURCE);
    settings.set("gocardless_source_id", GOCARDLESS_SOURCE);

    let admin_token = admin_token.map(str::to_string);
    RelayConfig::from_sources(&settings, move |name| match name {
        "RELAY_PUBLIC_BASE_URL" => Some(BASE_URL.to_string()),
        "ROUTING_PROVIDER" => Some("memory".to_string()),
        "ADMIN_TOKEN" => admin_token.clone(),
        _ => None,
    })
    .unwrap()
}

pub async fn context() -> TestContext {
    context_with(config_with(Some(ADMIN_TOKEN))).await
}

pub async fn context_with(config: RelayConfig) -> TestContext {
    let db = database().await;
    let routing = InMemoryRoutingApi::new();
    let registry = Arc::new(SeaOrmDestinationRegistry::new(db.clone()));

    let stripe_processor = create_processor(&*registry, ProcessorType::Stripe, true).await;
    let gocardless_processor =
        create_processor(&*registry, ProcessorType::GoCardless, true).await;

    let state = Arc::new(State::new(db.clone(), config, Arc::new(routing.clone())));

    TestContext {
        db,
        routing,
        registry,
        state,
        stripe_processor,
        gocardless_processor,
    }
}

pub async fn create_processor(
    registry: &dyn DestinationRegistry,
    processor_type: ProcessorType,
    is_active: bool,
) -> i32 {
    registry
        .create_processor(NewProcessor {
            name: format!("{} processor", processor_type),
            processor_type,
            is_active,
        })
        .await
        .unwrap()
        .id
}

pub fn request(
    processor_type: &str,
    processor_id: i32,
    routing_value: &str,
) -> RegisterDestination {
    RegisterDestination {
        processor_type: processor_type.to_string(),
        processor_id,
        routing_value: routing_value.to_string(),
        created_by: None,
    }
}
