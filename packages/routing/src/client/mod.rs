//! Routing service clients
//!
//! This module provides a unified abstraction over the webhook-routing service:
//! - Svix Ingest over HTTPS
//! - In-memory backend (for local development and tests)

mod traits;

pub mod memory;
pub mod svix;

pub use memory::InMemoryRoutingApi;
pub use svix::{SvixConfig, SvixIngestClient};
pub use traits::{Destination, RoutingApi, RoutingError, RoutingResult, normalize_url};

use std::sync::Arc;

/// Routing provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingProvider {
    /// Svix Ingest
    Svix,
    /// In-memory backend
    Memory,
}

impl RoutingProvider {
    /// Parse from string, anything unknown selects Svix
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "local" => Self::Memory,
            _ => Self::Svix,
        }
    }
}

/// Create a routing backend for the configured provider
///
/// `svix` is only consulted for [`RoutingProvider::Svix`] and must be present there.
pub fn create_client(
    provider: RoutingProvider,
    svix: Option<SvixConfig>,
) -> RoutingResult<Arc<dyn RoutingApi>> {
    match provider {
        RoutingProvider::Svix => {
            let config = svix.ok_or(RoutingError::MissingApiKey)?;
            tracing::info!(server_url = %config.server_url, "Using Svix routing backend");
            Ok(Arc::new(SvixIngestClient::new(config)?))
        }
        RoutingProvider::Memory => {
            tracing::warn!("Using in-memory routing backend, destinations are not persisted");
            Ok(Arc::new(InMemoryRoutingApi::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parsing_defaults_to_svix() {
        assert_eq!(RoutingProvider::from_str("memory"), RoutingProvider::Memory);
        assert_eq!(RoutingProvider::from_str(" Local "), RoutingProvider::Memory);
        assert_eq!(RoutingProvider::from_str("svix"), RoutingProvider::Svix);
        assert_eq!(RoutingProvider::from_str("anything"), RoutingProvider::Svix);
    }

    #[test]
    fn svix_provider_requires_config() {
        assert!(matches!(
            create_client(RoutingProvider::Svix, None),
            Err(RoutingError::MissingApiKey)
        ));
        assert!(create_client(RoutingProvider::Memory, None).is_ok());
    }
}
