//! Container configuration.
//!
//! [`ContainerConfig`] starts from opinionated defaults. Individual settings
//! can be overridden from environment variables prefixed with `FERROUS_IOC_`
//! or, with the `config` feature, from a JSON document. Missing values keep
//! their defaults.

use std::env;
use std::time::Duration;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use crate::error::{DiError, DiResult};

const CONFIG_ENV_PREFIX: &str = "FERROUS_IOC";

/// How a scalar dependency is satisfied when several components match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum AmbiguityPolicy {
    /// Pick the most recently registered valid match
    #[default]
    PickLatest,
    /// Fail with `AmbiguousDependency` when more than one valid match exists
    Strict,
}

/// What a pooled lifestyle does when every instance is checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolWait {
    /// Fail immediately with `PoolExhausted`
    FailFast,
    /// Wait until an instance is released
    Block,
    /// Wait up to the given duration, then fail with `PoolExhausted`
    Timeout(Duration),
}

impl Default for PoolWait {
    fn default() -> Self {
        PoolWait::Timeout(Duration::from_secs(30))
    }
}

impl PoolWait {
    /// Parses a millisecond timeout, `0` meaning fail fast and a negative value blocking.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            0 => PoolWait::FailFast,
            ms if ms < 0 => PoolWait::Block,
            ms => PoolWait::Timeout(Duration::from_millis(ms as u64)),
        }
    }
}

/// Container-wide settings.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{AmbiguityPolicy, ContainerConfig, PoolWait};
/// use std::time::Duration;
///
/// let config = ContainerConfig::default()
///     .with_ambiguity(AmbiguityPolicy::Strict)
///     .with_pool_wait(PoolWait::Timeout(Duration::from_millis(50)));
/// assert_eq!(config.ambiguity, AmbiguityPolicy::Strict);
/// assert_eq!(config.max_depth, 128);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Policy for scalar dependencies with several matches
    pub ambiguity: AmbiguityPolicy,
    /// Default wait policy of pooled components
    pub pool_wait: PoolWait,
    /// Maximum nesting of dependency resolution
    pub max_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            ambiguity: AmbiguityPolicy::default(),
            pool_wait: PoolWait::default(),
            max_depth: 128,
        }
    }
}

impl From<OptionalContainerConfig> for ContainerConfig {
    fn from(value: OptionalContainerConfig) -> Self {
        let default = Self::default();
        Self {
            ambiguity: value.ambiguity.unwrap_or(default.ambiguity),
            pool_wait: value
                .pool_wait_ms
                .map(PoolWait::from_millis)
                .unwrap_or(default.pool_wait),
            max_depth: value.max_depth.unwrap_or(default.max_depth),
        }
    }
}

impl ContainerConfig {
    pub fn with_ambiguity(mut self, ambiguity: AmbiguityPolicy) -> Self {
        self.ambiguity = ambiguity;
        self
    }

    pub fn with_pool_wait(mut self, pool_wait: PoolWait) -> Self {
        self.pool_wait = pool_wait;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads `FERROUS_IOC_AMBIGUITY`, `FERROUS_IOC_POOL_WAIT_MS` and
    /// `FERROUS_IOC_MAX_DEPTH`.
    pub fn from_env() -> DiResult<Self> {
        let ambiguity = read_env("AMBIGUITY")
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "strict" => Ok(AmbiguityPolicy::Strict),
                "pick_latest" | "latest" => Ok(AmbiguityPolicy::PickLatest),
                other => Err(config_error("AMBIGUITY", other, "expected 'strict' or 'pick_latest'")),
            })
            .transpose()?;
        let pool_wait_ms = read_env("POOL_WAIT_MS")
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|e| config_error("POOL_WAIT_MS", &value, &e.to_string()))
            })
            .transpose()?;
        let max_depth = read_env("MAX_DEPTH")
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|e| config_error("MAX_DEPTH", &value, &e.to_string()))
            })
            .transpose()?;

        Ok(OptionalContainerConfig {
            ambiguity,
            pool_wait_ms,
            max_depth,
        }
        .into())
    }

    /// Parses a JSON document such as
    /// `{"ambiguity": "strict", "pool_wait_ms": 250, "max_depth": 64}`.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str::<OptionalContainerConfig>(json)
            .map(Into::into)
            .map_err(|e| DiError::Conversion {
                parameter: "container configuration".to_string(),
                target: std::any::type_name::<Self>().to_string(),
                reason: e.to_string(),
            })
    }
}

fn read_env(name: &str) -> Option<String> {
    env::var(format!("{}_{}", CONFIG_ENV_PREFIX, name)).ok()
}

fn config_error(name: &str, value: &str, reason: &str) -> DiError {
    DiError::Conversion {
        parameter: format!("{}_{}={}", CONFIG_ENV_PREFIX, name, value),
        target: std::any::type_name::<ContainerConfig>().to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Default)]
#[cfg_attr(feature = "config", derive(Deserialize))]
struct OptionalContainerConfig {
    ambiguity: Option<AmbiguityPolicy>,
    pool_wait_ms: Option<i64>,
    max_depth: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in ["AMBIGUITY", "POOL_WAIT_MS", "MAX_DEPTH"] {
            env::remove_var(format!("{}_{}", CONFIG_ENV_PREFIX, name));
        }
    }

    #[test]
    fn pool_wait_from_millis() {
        assert_eq!(PoolWait::from_millis(0), PoolWait::FailFast);
        assert_eq!(PoolWait::from_millis(-1), PoolWait::Block);
        assert_eq!(
            PoolWait::from_millis(150),
            PoolWait::Timeout(Duration::from_millis(150))
        );
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        clear_env();
        env::set_var("FERROUS_IOC_AMBIGUITY", "strict");
        env::set_var("FERROUS_IOC_POOL_WAIT_MS", "0");

        let config = ContainerConfig::from_env().unwrap();
        assert_eq!(config.ambiguity, AmbiguityPolicy::Strict);
        assert_eq!(config.pool_wait, PoolWait::FailFast);
        assert_eq!(config.max_depth, ContainerConfig::default().max_depth);
        clear_env();
    }

    #[test]
    #[serial]
    fn env_rejects_garbage() {
        clear_env();
        env::set_var("FERROUS_IOC_MAX_DEPTH", "deep");
        assert!(matches!(
            ContainerConfig::from_env(),
            Err(DiError::Conversion { .. })
        ));
        clear_env();
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_partial_document() {
        let config = ContainerConfig::from_json(r#"{"ambiguity": "strict", "pool_wait_ms": 250}"#).unwrap();
        assert_eq!(config.ambiguity, AmbiguityPolicy::Strict);
        assert_eq!(config.pool_wait, PoolWait::Timeout(Duration::from_millis(250)));
        assert_eq!(config.max_depth, 128);
    }
}
