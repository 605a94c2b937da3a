//! Relay configuration
//!
//! Two sources feed [`RelayConfig`]:
//! 1. Persisted settings, a flat JSON object of setting name to value
//!    (`RELAY_SETTINGS_PATH`, default `relay.settings.json`)
//! 2. Environment variables
//!
//! The routing API key may come from either; the persisted setting wins. Source ids
//! are persisted settings only. The resolved value is passed explicitly to the
//! workflows, nothing reads the environment after startup.

use relay_routing::{ProcessorType, RoutingProvider, SvixConfig};
use relay_routing::client::svix::{DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SETTINGS_PATH: &str = "relay.settings.json";
pub const API_KEY_SETTING: &str = "svix_api_key";
const DEFAULT_SESSION_IDENTITY: &str = "system";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for: {0}")]
    InvalidValue(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

/// Persisted settings, as stored by the host application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedSettings(HashMap<String, String>);

impl PersistedSettings {
    /// Load settings from a JSON file; a missing file means no settings
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using empty settings");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Settings(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Settings(format!("{}: {}", path.display(), e)))
    }

    /// A setting's value, blank values count as unset
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

#[derive(Clone)]
pub struct RelayConfig {
    pub routing_provider: RoutingProvider,
    pub api_key: Option<String>,
    pub server_url: String,
    pub request_timeout: Duration,
    /// Base URL the routing service forwards webhooks to, e.g. `https://crm.example.org`
    pub public_base_url: String,
    pub source_ids: HashMap<ProcessorType, String>,
    pub admin_token: Option<String>,
    /// Creator recorded when a registration does not name one
    pub default_session_identity: String,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings_path = std::env::var("RELAY_SETTINGS_PATH")
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        let settings = PersistedSettings::load(Path::new(&settings_path))?;
        Self::from_sources(&settings, |name| std::env::var(name).ok())
    }

    /// Resolve configuration from persisted settings and an environment lookup
    pub fn from_sources(
        settings: &PersistedSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |name: &str| {
            env(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = settings
            .get(API_KEY_SETTING)
            .map(str::to_string)
            .or_else(|| lookup("SVIX_API_KEY"));

        let source_ids = ProcessorType::ALL
            .into_iter()
            .filter_map(|processor| {
                settings
                    .get(processor.source_setting())
                    .map(|id| (processor, id.to_string()))
            })
            .collect();

        let request_timeout = match lookup("ROUTING_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                ConfigError::InvalidValue("ROUTING_REQUEST_TIMEOUT_SECS".to_string())
            })?),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            routing_provider: lookup("ROUTING_PROVIDER")
                .map(|p| RoutingProvider::from_str(&p))
                .unwrap_or(RoutingProvider::Svix),
            api_key,
            server_url: lookup("SVIX_SERVER_URL")
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            request_timeout,
            public_base_url: lookup("RELAY_PUBLIC_BASE_URL")
                .ok_or(ConfigError::MissingVar("RELAY_PUBLIC_BASE_URL"))?,
            source_ids,
            admin_token: lookup("ADMIN_TOKEN"),
            default_session_identity: lookup("DEFAULT_SESSION_IDENTITY")
                .unwrap_or_else(|| DEFAULT_SESSION_IDENTITY.to_string()),
        })
    }

    pub fn source_id(&self, processor: ProcessorType) -> Option<&str> {
        self.source_ids.get(&processor).map(String::as_str)
    }

    /// Svix connection settings, `None` without an API key
    pub fn svix_config(&self) -> Option<SvixConfig> {
        self.api_key.as_ref().map(|key| {
            SvixConfig::new(key.clone())
                .with_server_url(self.server_url.clone())
                .with_timeout(self.request_timeout)
        })
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("routing_provider", &self.routing_provider)
            .field("api_key_configured", &self.api_key.is_some())
            .field("server_url", &self.server_url)
            .field("request_timeout", &self.request_timeout)
            .field("public_base_url", &self.public_base_url)
            .field("source_ids", &self.source_ids)
            .field("admin_api_enabled", &self.admin_token.is_some())
            .field("default_session_identity", &self.default_session_identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn persisted_api_key_takes_precedence() {
        let mut settings = PersistedSettings::default();
        settings.set(API_KEY_SETTING, "sk_setting");
        let env = env_from(&[
            ("SVIX_API_KEY", "sk_env"),
            ("RELAY_PUBLIC_BASE_URL", "https://crm.test"),
        ]);

        let config = RelayConfig::from_sources(&settings, env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk_setting"));
    }

    #[test]
    fn env_api_key_is_the_fallback() {
        let mut settings = PersistedSettings::default();
        settings.set(API_KEY_SETTING, "   ");
        let env = env_from(&[
            ("SVIX_API_KEY", "sk_env"),
            ("RELAY_PUBLIC_BASE_URL", "https://crm.test"),
        ]);

        let config = RelayConfig::from_sources(&settings, env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk_env"));
    }

    #[test]
    fn source_ids_only_come_from_settings() {
        let mut settings = PersistedSettings::default();
        settings.set("stripe_source_id", "src_stripe");
        let env = env_from(&[
            ("gocardless_source_id", "src_env"),
            ("RELAY_PUBLIC_BASE_URL", "https://crm.test"),
        ]);

        let config = RelayConfig::from_sources(&settings, env).unwrap();
        assert_eq!(config.source_id(ProcessorType::Stripe), Some("src_stripe"));
        assert_eq!(config.source_id(ProcessorType::GoCardless), None);
    }

    #[test]
    fn public_base_url_is_required() {
        let result = RelayConfig::from_sources(&PersistedSettings::default(), env_from(&[]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingVar("RELAY_PUBLIC_BASE_URL"))
        ));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let env = env_from(&[
            ("RELAY_PUBLIC_BASE_URL", "https://crm.test"),
            ("ROUTING_REQUEST_TIMEOUT_SECS", "soon"),
        ]);
        assert!(matches!(
            RelayConfig::from_sources(&PersistedSettings::default(), env),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let mut settings = PersistedSettings::default();
        settings.set(API_KEY_SETTING, "sk_very_secret");
        let env = env_from(&[
            ("RELAY_PUBLIC_BASE_URL", "https://crm.test"),
            ("ADMIN_TOKEN", "admin_very_secret"),
        ]);

        let config = RelayConfig::from_sources(&settings, env).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk_very_secret"));
        assert!(!printed.contains("admin_very_secret"));
    }

    #[test]
    fn settings_file_is_optional() {
        let settings = PersistedSettings::load(Path::new("/nonexistent/relay.settings.json"));
        assert_eq!(settings.unwrap(), PersistedSettings::default());
    }
}
