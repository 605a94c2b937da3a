//! Verification of signed webhooks forwarded by the routing service
//!
//! The signed content is `{message_id}.{timestamp}.{payload}`, authenticated with
//! HMAC-SHA256 under the base64-decoded signing secret. The signature header holds
//! one or more space separated `v1,<base64>` tokens; any match is accepted.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const MESSAGE_ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

const UNBRANDED_MESSAGE_ID_HEADER: &str = "webhook-id";
const UNBRANDED_TIMESTAMP_HEADER: &str = "webhook-timestamp";
const UNBRANDED_SIGNATURE_HEADER: &str = "webhook-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Allowed clock skew between the routing service and us, in seconds
pub const DEFAULT_TOLERANCE_SECS: u64 = 5 * 60;

/// Error type for signature verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid timestamp header: {0}")]
    InvalidTimestamp(String),

    #[error("Message timestamp is outside the allowed tolerance")]
    TimestampOutOfTolerance,

    #[error("Signing secret is not valid base64")]
    InvalidSecret,

    #[error("No matching signature found")]
    NoMatchingSignature,
}

/// Per-destination signing secret
///
/// Never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn key_bytes(&self) -> Result<Vec<u8>, SignatureError> {
        let trimmed = self.0.trim();
        let encoded = trimmed.strip_prefix(SECRET_PREFIX).unwrap_or(trimmed);
        let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(encoded)
            .map_err(|_| SignatureError::InvalidSecret)
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

impl From<String> for SigningSecret {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

/// The three headers the routing service adds to a forwarded request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub message_id: String,
    pub timestamp: String,
    pub signature: String,
}

impl SignatureHeaders {
    pub fn new(
        message_id: impl Into<String>,
        timestamp: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            timestamp: timestamp.into(),
            signature: signature.into(),
        }
    }

    /// Extract the headers from an inbound request, missing ones become empty
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let read = |primary: &str, fallback: &str| {
            headers
                .get(primary)
                .or_else(|| headers.get(fallback))
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            message_id: read(MESSAGE_ID_HEADER, UNBRANDED_MESSAGE_ID_HEADER),
            timestamp: read(TIMESTAMP_HEADER, UNBRANDED_TIMESTAMP_HEADER),
            signature: read(SIGNATURE_HEADER, UNBRANDED_SIGNATURE_HEADER),
        }
    }

    /// A request went through the routing service when it carries a signature
    pub fn is_routed(&self) -> bool {
        !self.signature.trim().is_empty()
    }
}

/// Check whether an inbound request was forwarded by the routing service
pub fn is_routed_request(headers: &HeaderMap) -> bool {
    SignatureHeaders::from_header_map(headers).is_routed()
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    tolerance_secs: u64,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier {
    pub fn new() -> Self {
        Self {
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(tolerance_secs: u64) -> Self {
        Self { tolerance_secs }
    }

    pub fn verify(
        &self,
        payload: &[u8],
        headers: &SignatureHeaders,
        secret: &SigningSecret,
    ) -> Result<(), SignatureError> {
        self.verify_at(payload, headers, secret, Utc::now())
    }

    pub fn verify_at(
        &self,
        payload: &[u8],
        headers: &SignatureHeaders,
        secret: &SigningSecret,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        if headers.message_id.is_empty() {
            return Err(SignatureError::MissingHeader(MESSAGE_ID_HEADER));
        }
        if headers.timestamp.is_empty() {
            return Err(SignatureError::MissingHeader(TIMESTAMP_HEADER));
        }
        if !headers.is_routed() {
            return Err(SignatureError::MissingHeader(SIGNATURE_HEADER));
        }

        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp(headers.timestamp.clone()))?;

        if now.timestamp().abs_diff(timestamp) > self.tolerance_secs {
            return Err(SignatureError::TimestampOutOfTolerance);
        }

        let mac = signed_content_mac(&headers.message_id, &headers.timestamp, payload, secret)?;

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|token| token.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
            .any(|expected| mac.clone().verify_slice(&expected).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureError::NoMatchingSignature)
        }
    }

    /// Produce a `v1,<base64>` signature token, the counterpart of [`Self::verify`]
    pub fn sign(
        &self,
        message_id: &str,
        timestamp: &str,
        payload: &[u8],
        secret: &SigningSecret,
    ) -> Result<String, SignatureError> {
        let mac = signed_content_mac(message_id, timestamp, payload, secret)?;
        Ok(format!(
            "{},{}",
            SIGNATURE_VERSION,
            STANDARD.encode(mac.finalize().into_bytes())
        ))
    }
}

fn signed_content_mac(
    message_id: &str,
    timestamp: &str,
    payload: &[u8],
    secret: &SigningSecret,
) -> Result<HmacSha256, SignatureError> {
    let key = secret.key_bytes()?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(message_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}
