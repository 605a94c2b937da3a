use crate::registry::DestinationRegistry;
use axum::http::HeaderMap;
use relay_routing::{ProcessorType, SignatureHeaders, SignatureVerifier, SigningSecret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Outcome of verifying an inbound webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    fn verified() -> Self {
        Self {
            valid: true,
            message: "Webhook signature verified".to_string(),
            error: None,
        }
    }

    fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

/// Checks inbound webhooks against the signing secret of their processor family
///
/// Verification never fails with an error: misconfiguration, bad signatures
/// and registry faults all come back as an invalid [`VerificationResult`].
pub struct WebhookVerifier {
    registry: Arc<dyn DestinationRegistry>,
    signatures: SignatureVerifier,
}

impl WebhookVerifier {
    pub fn new(registry: Arc<dyn DestinationRegistry>) -> Self {
        Self::with_signature_verifier(registry, SignatureVerifier::new())
    }

    pub fn with_signature_verifier(
        registry: Arc<dyn DestinationRegistry>,
        signatures: SignatureVerifier,
    ) -> Self {
        Self {
            registry,
            signatures,
        }
    }

    /// Verify a raw payload with headers taken from the inbound request
    pub async fn verify_request(
        &self,
        payload: &[u8],
        processor_type: &str,
        headers: &HeaderMap,
    ) -> VerificationResult {
        self.verify(
            payload,
            processor_type,
            &SignatureHeaders::from_header_map(headers),
        )
        .await
    }

    pub async fn verify(
        &self,
        payload: &[u8],
        processor_type: &str,
        headers: &SignatureHeaders,
    ) -> VerificationResult {
        if !headers.is_routed() {
            return VerificationResult::failed(
                "Request was not forwarded by the routing service",
                "Missing signature header",
            );
        }

        let processor: ProcessorType = match processor_type.parse() {
            Ok(processor) => processor,
            Err(e) => {
                tracing::warn!(processor_type, "Webhook for unsupported processor type");
                return VerificationResult::failed("Webhook verification failed", e.to_string());
            }
        };

        let destination = match self.registry.get_by_processor_type(processor, true).await {
            Ok(Some(destination)) => destination,
            Ok(None) => {
                return VerificationResult::failed(
                    "Webhook verification failed",
                    format!(
                        "No webhook destination configured for processor type: {}",
                        processor
                    ),
                );
            }
            Err(e) => {
                tracing::warn!(
                    processor_type = %processor,
                    error = %e,
                    "Failed to look up webhook destination"
                );
                return VerificationResult::failed(
                    "Webhook verification failed",
                    "Destination lookup failed",
                );
            }
        };

        let secret = SigningSecret::new(destination.signing_secret);
        match self.signatures.verify(payload, headers, &secret) {
            Ok(()) => {
                tracing::debug!(
                    processor_type = %processor,
                    message_id = %headers.message_id,
                    destination_id = %destination.destination_id,
                    "Webhook signature verified"
                );
                VerificationResult::verified()
            }
            Err(e) => {
                tracing::warn!(
                    processor_type = %processor,
                    message_id = %headers.message_id,
                    error = %e,
                    "Webhook signature rejected"
                );
                VerificationResult::failed("Webhook signature verification failed", e.to_string())
            }
        }
    }
}
