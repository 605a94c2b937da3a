//! Relay Routing - primitives for sharing one webhook-routing account across many sites
//!
//! This crate provides the pieces the registration and verification workflows are
//! built from. None of it touches the database.
//!
//! ## Processor Families
//!
//! | Family | Routing field | Source setting | Webhook path |
//! |--------|---------------|----------------|--------------|
//! | Stripe | `account` | `stripe_source_id` | `/webhook/stripe` |
//! | GoCardless | `links.organisation` | `gocardless_source_id` | `/webhook/gocardless` |
//! | Square | `merchant_id` | `square_source_id` | `/webhook/relay` (generic) |
//!
//! ## Routing Backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | Svix Ingest | Production, REST over HTTPS with a bearer API key |
//! | In-memory | Local development and tests |

mod processor;

pub mod client;
pub mod filter;
pub mod signature;

pub use client::{
    Destination, InMemoryRoutingApi, RoutingApi, RoutingError, RoutingProvider, RoutingResult,
    SvixConfig, SvixIngestClient,
};
pub use filter::{AllFieldsMatchFilter, FieldMatchFilter, FilterError, FilterScript};
pub use processor::{ProcessorType, UnsupportedProcessor, GENERIC_WEBHOOK_PATH};
pub use signature::{SignatureError, SignatureHeaders, SignatureVerifier, SigningSecret};
