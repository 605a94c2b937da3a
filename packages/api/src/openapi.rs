use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

/// Security scheme modifier for the admin API
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        // Static admin token (Authorization: Bearer <ADMIN_TOKEN>)
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::Http(
                Http::builder()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some(
                        "Admin token from ADMIN_TOKEN. Send `x-operator` to record who made a change",
                    ))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Webhook Relay API",
        version = "1.0.0",
        description = "Registers payment processor webhook destinations in the routing service and verifies the webhooks it forwards.\n\n## Authentication\n\nAdmin endpoints require `Authorization: Bearer <ADMIN_TOKEN>`. Inbound webhooks are authenticated by their signature headers."
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "webhook", description = "Inbound webhooks forwarded by the routing service"),
        (name = "destinations", description = "Webhook destination management"),
        (name = "processors", description = "Payment processor management")
    ),
    paths(
        crate::routes::health::health,
        crate::routes::health::db_health,
        crate::routes::webhook::receive_webhook,
        crate::routes::destination::list_destinations,
        crate::routes::destination::register_destination,
        crate::routes::destination::get_destination,
        crate::routes::destination::delete_destination,
        crate::routes::processor::list_processors,
        crate::routes::processor::create_processor,
        crate::routes::processor::delete_processor,
    ),
    components(schemas(
        crate::routes::health::HealthResponse,
        crate::routes::health::DbHealthResponse,
        crate::workflow::VerificationResult,
        crate::workflow::RegisterDestination,
        crate::registry::NewProcessor,
        crate::routes::destination::DestinationRecord,
        crate::routes::destination::DestinationDetail,
        crate::routes::destination::RemoteStatus,
        crate::routes::destination::RegisteredDestination,
        crate::routes::destination::DeleteResponse,
        crate::routes::processor::ProcessorRecord,
    ))
)]
pub struct ApiDoc;
