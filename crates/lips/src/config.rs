//! Runtime Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::LipsError;

/// Runtime configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipsConfig {
    /// Background state reconciliation interval (ms), below 10
    pub tick_interval_ms: u64,

    /// Maximum nested component depth
    pub max_depth: usize,

    /// Maximum iterations of a numeric `<for>` range
    pub max_range: usize,

    /// Attribute carrying the stylesheet scope id
    pub scope_attribute: String,

    /// Input field receiving a component tag's inner markup
    pub slot_field: String,

    /// Initial language code
    pub language: String,

    /// Keep whitespace-only text nodes that contain a newline
    pub keep_indentation: bool,
}

impl Default for LipsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5,
            max_depth: 32,
            max_range: 100_000,
            scope_attribute: "lips-scope".to_string(),
            slot_field: "slot".to_string(),
            language: "en".to_string(),
            keep_indentation: false,
        }
    }
}

impl LipsConfig {
    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, LipsError> {
        let config: LipsConfig = serde_json::from_str(json)
            .map_err(|e| LipsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), LipsError> {
        if self.tick_interval_ms == 0 || self.tick_interval_ms >= 10 {
            return Err(LipsError::Config(format!(
                "tick_interval_ms must be between 1 and 9, got {}",
                self.tick_interval_ms
            )));
        }
        if self.scope_attribute.is_empty() || self.slot_field.is_empty() {
            return Err(LipsError::Config("scope_attribute and slot_field must not be empty".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LipsConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(5));
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.scope_attribute, "lips-scope");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = LipsConfig::from_json(r#"{ "language": "fr", "max_range": 10 }"#).unwrap();
        assert_eq!(config.language, "fr");
        assert_eq!(config.max_range, 10);
        assert_eq!(config.slot_field, "slot");
    }

    #[test]
    fn test_from_json_rejects_slow_tick() {
        assert!(matches!(
            LipsConfig::from_json(r#"{ "tick_interval_ms": 16 }"#),
            Err(LipsError::Config(_))
        ));
        assert!(LipsConfig::from_json("not json").is_err());
    }
}
