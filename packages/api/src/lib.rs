//! Webhook relay service
//!
//! Registers payment processor webhook destinations in the routing service,
//! keeps a local registry of them and verifies the webhooks it forwards.

use std::sync::Arc;

use axum::{Json, Router, middleware::from_fn_with_state, routing::get};
use middleware::admin::admin_middleware;
use openapi::ApiDoc;
use state::State;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

mod middleware;
mod openapi;
mod routes;

pub mod config;
pub mod entity;
pub mod error;
pub mod registry;
pub mod schema;
pub mod state;
pub mod workflow;

pub use axum;
pub use sea_orm;

pub use middleware::admin::{OPERATOR_HEADER, Operator};

pub fn construct_router(state: Arc<State>) -> Router {
    let admin = Router::new()
        .nest("/destinations", routes::destination::routes())
        .nest("/processors", routes::processor::routes())
        .layer(from_fn_with_state(state.clone(), admin_middleware));

    let router = Router::new()
        .nest("/health", routes::health::routes())
        .nest("/webhook", routes::webhook::routes())
        .merge(admin)
        .with_state(state)
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Router::new().nest("/api/v1", router)
}
