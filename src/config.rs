//! Configuration for the context manager.
//!
//! All fields are optional in serialized form and fall back to the
//! defaults: a 6000-token window, summarization at 75% utilization, and a
//! six-message recent window.

use crate::error::{MemoryError, Result};
use serde::{Deserialize, Serialize};

/// Tunables for [`crate::ContextManager`].
///
/// # Example
/// ```
/// use chatmem::MemoryConfig;
///
/// let config: MemoryConfig = serde_json::from_str(r#"{"max_tokens": 8000}"#).unwrap();
/// assert_eq!(config.max_tokens, 8000);
/// assert_eq!(config.keep_recent_messages, 6); // default
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum allowed tokens for the context window
    pub max_tokens: usize,
    /// Fraction of `max_tokens` at which summarization triggers, in (0, 1]
    pub summary_trigger_ratio: f64,
    /// Number of recent messages preserved verbatim during summarization
    pub keep_recent_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: 6000,
            summary_trigger_ratio: 0.75,
            keep_recent_messages: 6,
        }
    }
}

impl MemoryConfig {
    /// Validate the configuration.
    ///
    /// Fails fast at construction time: a zero token budget or a trigger
    /// ratio outside (0, 1] would make the trimming policy meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(MemoryError::Config(
                "max_tokens must be positive".to_string(),
            ));
        }
        if !(self.summary_trigger_ratio > 0.0 && self.summary_trigger_ratio <= 1.0) {
            return Err(MemoryError::Config(format!(
                "summary_trigger_ratio must be in (0, 1], got {}",
                self.summary_trigger_ratio
            )));
        }
        Ok(())
    }

    /// Token count at which summarization triggers.
    pub fn trigger_tokens(&self) -> usize {
        (self.max_tokens as f64 * self.summary_trigger_ratio) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MemoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_tokens, 6000);
        assert_eq!(config.summary_trigger_ratio, 0.75);
        assert_eq!(config.keep_recent_messages, 6);
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let config = MemoryConfig {
            max_tokens: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trigger_ratio_bounds() {
        for ratio in [0.0, -0.5, 1.5, f64::NAN] {
            let config = MemoryConfig {
                summary_trigger_ratio: ratio,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "ratio {} should fail", ratio);
        }

        // 1.0 is inclusive
        let config = MemoryConfig {
            summary_trigger_ratio: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trigger_tokens() {
        let config = MemoryConfig {
            max_tokens: 100,
            summary_trigger_ratio: 0.75,
            keep_recent_messages: 2,
        };
        assert_eq!(config.trigger_tokens(), 75);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MemoryConfig =
            serde_json::from_str(r#"{"summary_trigger_ratio": 0.5}"#).unwrap();
        assert_eq!(config.summary_trigger_ratio, 0.5);
        assert_eq!(config.max_tokens, 6000);
    }
}
