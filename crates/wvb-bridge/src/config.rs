//! Bridge configuration.

use serde::Deserialize;

use crate::error::{BridgeError, Result};

/// Runtime options for a [`Bridge`](crate::Bridge).
///
/// Missing fields take their defaults; unknown fields are rejected.
///
/// ```rust
/// use wvb_bridge::BridgeConfig;
///
/// let config = BridgeConfig::from_json(r#"{"debug": true}"#).unwrap();
/// assert!(config.debug);
/// assert!(config.strict_names);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Log every inbound and outbound message at debug level
    pub debug: bool,
    /// Reject user method names starting with the reserved `_` prefix
    pub strict_names: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            strict_names: true,
        }
    }
}

impl BridgeConfig {
    /// Load a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Builder-style toggle for debug logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builder-style toggle for reserved-prefix checking.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(!config.debug);
        assert!(config.strict_names);
        assert_eq!(BridgeConfig::from_json("{}").unwrap(), config);
    }

    #[test]
    fn test_from_json() {
        let config = BridgeConfig::from_json(r#"{"debug":true,"strict_names":false}"#).unwrap();
        assert!(config.debug);
        assert!(!config.strict_names);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = BridgeConfig::from_json(r#"{"verbose":true}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(BridgeConfig::from_json("not json").is_err());
    }
}
