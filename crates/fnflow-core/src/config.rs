//! Configuration loaded from YAML
//!
//! ```yaml
//! label: checkout
//! retry:
//!   max_retries: 3
//!   base_delay_ms: 500
//!   max_delay_ms: 5000
//! notify_rate_limit: 5
//! ```
use crate::error::ConfigError;
use crate::retry::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Ceiling for a single wait
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub label: Option<String>,
    pub retry: RetryConfig,
    /// Notifications allowed per sender before it starts refusing.
    pub notify_rate_limit: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            label: None,
            retry: RetryConfig::default(),
            notify_rate_limit: 5,
        }
    }
}

impl FlowConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.max_delay_ms ({}) is below retry.base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }
        if self.notify_rate_limit == 0 {
            return Err(ConfigError::Invalid(
                "notify_rate_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
