//! Client configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::provider::Provider;
use crate::registry::ProviderRegistry;
use cybervault_common::{Error, Result};

/// Client-side configuration: which provider to talk to and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Provider type (e.g., "memory").
    pub provider_type: String,
    /// Provider-specific configuration.
    pub provider_config: Value,
}

impl ClientConfig {
    /// Resolve the configured provider through a registry.
    pub fn resolve(&self, registry: &ProviderRegistry) -> Result<Arc<dyn Provider>> {
        registry.resolve(&self.provider_type, self.provider_config.clone())
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider_type: "memory".to_string(),
            provider_config: serde_json::json!({ "auto_confirm": true }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::create_default_registry;

    #[test]
    fn test_default_config_resolves() {
        let registry = create_default_registry();
        let provider = ClientConfig::default().resolve(&registry).unwrap();
        assert_eq!(provider.name(), "memory");
    }

    #[test]
    fn test_config_round_trip() {
        let config = ClientConfig::default();
        let json = config.to_json().unwrap();
        let restored = ClientConfig::from_json(&json).unwrap();
        assert_eq!(restored.provider_type, config.provider_type);
    }
}
