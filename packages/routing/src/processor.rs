//! Supported payment processor families

use crate::filter::{FieldMatchFilter, FilterError, FilterScript};
use serde::{Deserialize, Serialize};

/// Path used by families that do not have a dedicated webhook endpoint
pub const GENERIC_WEBHOOK_PATH: &str = "/webhook/relay";

const ROUTING_VALUE_PLACEHOLDER: &str = "{routing_value}";

/// Returned when a processor type name is not one of the known families
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported payment processor type: {0}")]
pub struct UnsupportedProcessor(pub String);

/// Payment processor family
///
/// The set is closed: adding a family means adding a variant and filling in
/// each of the lookup methods below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorType {
    /// Stripe Connect, routed by connected account id
    Stripe,
    /// GoCardless partner integrations, routed by organisation id
    GoCardless,
    /// Square, routed by merchant id
    Square,
}

impl ProcessorType {
    pub const ALL: [ProcessorType; 3] = [Self::Stripe, Self::GoCardless, Self::Square];

    /// Get the string identifier for this processor type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::GoCardless => "gocardless",
            Self::Square => "square",
        }
    }

    /// Dot-separated path into the inbound payload holding the routing value
    pub fn routing_field(&self) -> &'static str {
        match self {
            Self::Stripe => "account",
            Self::GoCardless => "links.organisation",
            Self::Square => "merchant_id",
        }
    }

    /// Name of the persisted setting holding this family's shared source id
    pub fn source_setting(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe_source_id",
            Self::GoCardless => "gocardless_source_id",
            Self::Square => "square_source_id",
        }
    }

    /// Human readable description template, `{routing_value}` is substituted
    pub fn description_template(&self) -> &'static str {
        match self {
            Self::Stripe => "Stripe Connect account {routing_value}",
            Self::GoCardless => "GoCardless organisation {routing_value}",
            Self::Square => "Square merchant {routing_value}",
        }
    }

    /// Dedicated webhook path, if the family has one
    pub fn webhook_path(&self) -> Option<&'static str> {
        match self {
            Self::Stripe => Some("/webhook/stripe"),
            Self::GoCardless => Some("/webhook/gocardless"),
            Self::Square => None,
        }
    }

    /// Absolute URL the routing service forwards this family's events to
    pub fn webhook_url(&self, public_base_url: &str) -> String {
        format!(
            "{}{}",
            public_base_url.trim_end_matches('/'),
            self.webhook_path().unwrap_or(GENERIC_WEBHOOK_PATH)
        )
    }

    pub fn description(&self, routing_value: &str) -> String {
        self.description_template()
            .replace(ROUTING_VALUE_PLACEHOLDER, routing_value)
    }

    /// Filter that only forwards events whose routing field equals `routing_value`
    pub fn filter_for(&self, routing_value: &str) -> Result<Box<dyn FilterScript>, FilterError> {
        Ok(Box::new(FieldMatchFilter::new(
            self.routing_field(),
            routing_value,
        )?))
    }
}

impl std::fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProcessorType {
    type Err = UnsupportedProcessor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "gocardless" | "go_cardless" => Ok(Self::GoCardless),
            "square" => Ok(Self::Square),
            _ => Err(UnsupportedProcessor(s.to_string())),
        }
    }
}
