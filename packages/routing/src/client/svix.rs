//! Svix Ingest implementation
//!
//! Destinations are Svix "endpoints" below an ingest source. Every request carries
//! the account API key as a bearer token.

use super::{Destination, RoutingApi, RoutingError, RoutingResult};
use crate::signature::SigningSecret;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "https://api.svix.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: usize = 250;

/// Svix connection settings
#[derive(Clone)]
pub struct SvixConfig {
    pub api_key: String,
    pub server_url: String,
    pub timeout: Duration,
}

impl SvixConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for SvixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvixConfig")
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EndpointIn<'a> {
    url: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct EndpointUpdate<'a> {
    url: &'a str,
    description: &'a str,
    disabled: bool,
}

#[derive(Serialize)]
struct TransformationIn<'a> {
    code: &'a str,
    enabled: bool,
}

#[derive(Deserialize)]
struct SecretOut {
    key: String,
}

#[derive(Deserialize)]
struct EndpointPage {
    data: Vec<Destination>,
    #[serde(default)]
    iterator: Option<String>,
    #[serde(default)]
    done: bool,
}

pub struct SvixIngestClient {
    client: Client,
    config: SvixConfig,
    base_url: Url,
}

impl SvixIngestClient {
    pub fn new(config: SvixConfig) -> RoutingResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RoutingError::MissingApiKey);
        }

        let base_url = Url::parse(&config.server_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                RoutingError::Config(format!("Invalid Svix server URL: {}", config.server_url))
            })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RoutingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Ingest endpoint URL below `source_id`; every id segment is percent-encoded.
    fn endpoint_url(&self, source_id: &str, rest: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["ingest", "api", "v1", "source", source_id, "endpoint"])
                .extend(rest);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "application/json")
    }

    async fn execute(&self, request: RequestBuilder) -> RoutingResult<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| RoutingError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(RoutingError::NotFound(message))
        } else {
            Err(RoutingError::Response {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> RoutingResult<T> {
        self.execute(request)
            .await?
            .json()
            .await
            .map_err(|e| RoutingError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RoutingApi for SvixIngestClient {
    async fn create_destination(
        &self,
        source_id: &str,
        url: &str,
        description: &str,
    ) -> RoutingResult<Destination> {
        let request = self
            .client
            .post(self.endpoint_url(source_id, &[]))
            .json(&EndpointIn { url, description });

        let destination: Destination = self.execute_json(request).await?;

        tracing::info!(
            source_id = %source_id,
            destination_id = %destination.id,
            url = %url,
            "Created Svix endpoint"
        );

        Ok(destination)
    }

    async fn list_destinations(&self, source_id: &str) -> RoutingResult<Vec<Destination>> {
        let mut destinations = Vec::new();
        let mut iterator: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let mut request = self
                .client
                .get(self.endpoint_url(source_id, &[]))
                .query(&[("limit", PAGE_SIZE.to_string())]);
            if let Some(iterator) = &iterator {
                request = request.query(&[("iterator", iterator)]);
            }

            let page: EndpointPage = self.execute_json(request).await?;
            destinations.extend(page.data);

            match page.iterator {
                Some(next) if !page.done => {
                    if !seen.insert(next.clone()) {
                        tracing::warn!(
                            source_id = %source_id,
                            iterator = %next,
                            "Svix returned a repeated page iterator, stopping pagination"
                        );
                        break;
                    }
                    iterator = Some(next);
                }
                _ => break,
            }
        }

        tracing::debug!(
            source_id = %source_id,
            count = destinations.len(),
            "Listed Svix endpoints"
        );

        Ok(destinations)
    }

    async fn set_transformation(
        &self,
        source_id: &str,
        destination_id: &str,
        script: &str,
    ) -> RoutingResult<()> {
        let request = self
            .client
            .patch(self.endpoint_url(source_id, &[destination_id, "transformation"]))
            .json(&TransformationIn {
                code: script,
                enabled: true,
            });

        self.execute(request).await?;

        tracing::debug!(
            source_id = %source_id,
            destination_id = %destination_id,
            "Installed Svix transformation"
        );

        Ok(())
    }

    async fn get_secret(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<SigningSecret> {
        let request = self
            .client
            .get(self.endpoint_url(source_id, &[destination_id, "secret"]));

        let secret: SecretOut = self.execute_json(request).await?;
        Ok(SigningSecret::new(secret.key))
    }

    async fn disable_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<bool> {
        let Some(existing) = self.get_destination(source_id, destination_id).await? else {
            return Ok(false);
        };

        let request = self
            .client
            .put(self.endpoint_url(source_id, &[destination_id]))
            .json(&EndpointUpdate {
                url: &existing.url,
                description: &existing.description,
                disabled: true,
            });

        match self.execute(request).await {
            Ok(_) => {
                tracing::info!(
                    source_id = %source_id,
                    destination_id = %destination_id,
                    "Disabled Svix endpoint"
                );
                Ok(true)
            }
            Err(RoutingError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<bool> {
        let request = self
            .client
            .delete(self.endpoint_url(source_id, &[destination_id]));

        match self.execute(request).await {
            Ok(_) => {
                tracing::info!(
                    source_id = %source_id,
                    destination_id = %destination_id,
                    "Deleted Svix endpoint"
                );
                Ok(true)
            }
            Err(RoutingError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<Option<Destination>> {
        let request = self.client.get(self.endpoint_url(source_id, &[destination_id]));

        match self.execute_json(request).await {
            Ok(destination) => Ok(Some(destination)),
            Err(RoutingError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
