//! Routing API trait definitions

use crate::signature::SigningSecret;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result type for routing API operations
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Error type for routing API operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoutingError {
    #[error("Destination not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Routing API error: {status} - {message}")]
    Response { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Svix API key is not configured")]
    MissingApiKey,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A destination (endpoint) registered on a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Destination {
    pub fn normalized_url(&self) -> &str {
        normalize_url(&self.url)
    }

    /// Whether this destination is an active endpoint for `url`
    pub fn is_active_for(&self, url: &str) -> bool {
        !self.disabled && self.normalized_url() == normalize_url(url)
    }
}

/// Strip trailing `?` and `/` so equivalent webhook URLs compare equal
pub fn normalize_url(url: &str) -> &str {
    url.trim_end_matches(['?', '/'])
}

/// Trait for routing service backends
///
/// Every method is a single remote call (or a short fixed sequence for
/// `disable_destination`). Callers sequence them; implementations never retry.
#[async_trait::async_trait]
pub trait RoutingApi: Send + Sync {
    /// Create a destination on a source
    async fn create_destination(
        &self,
        source_id: &str,
        url: &str,
        description: &str,
    ) -> RoutingResult<Destination>;

    /// List every destination of a source, disabled ones included
    async fn list_destinations(&self, source_id: &str) -> RoutingResult<Vec<Destination>>;

    /// Install the filter script evaluated for each event sent to the destination
    async fn set_transformation(
        &self,
        source_id: &str,
        destination_id: &str,
        script: &str,
    ) -> RoutingResult<()>;

    /// Fetch the destination's signing secret
    async fn get_secret(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<SigningSecret>;

    /// Flip the destination's disabled flag, keeping its URL
    ///
    /// Returns `false` when the destination does not exist.
    async fn disable_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<bool>;

    /// Delete a destination
    ///
    /// Returns `false` when the destination does not exist.
    async fn delete_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<bool>;

    /// Get a destination, `None` when the routing service reports not found
    async fn get_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<Option<Destination>>;
}
