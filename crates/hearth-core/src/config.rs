//! Runtime Configuration
//!
//! Tunables for a single member's runtime with sensible defaults and
//! environment variable overrides.

use std::time::Duration;

/// Error raised when an override cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Runtime configuration with sensible defaults
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Deadline applied by `GrainRef` calls that do not pass their own
    /// (env: HEARTH_CALL_TIMEOUT_MS)
    pub call_timeout: Duration,

    /// Activations without a dispatch for this long are evicted
    /// (env: HEARTH_IDLE_TIMEOUT_SECS)
    pub idle_timeout: Duration,

    /// How often the idle sweeper scans the directory
    /// (env: HEARTH_IDLE_SWEEP_SECS)
    pub idle_sweep_interval: Duration,

    /// Upper bound on waiting for a newer view after a `NotOwner` reply
    /// (env: HEARTH_NOT_OWNER_WAIT_MS)
    pub not_owner_refresh_wait: Duration,

    /// Deadline for draining an activation's mailbox during eviction
    /// (env: HEARTH_DRAIN_TIMEOUT_MS)
    pub drain_timeout: Duration,

    /// Number of lock shards in the grain directory
    /// (env: HEARTH_DIRECTORY_SHARDS)
    pub directory_shards: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            idle_sweep_interval: Duration::from_secs(30),
            not_owner_refresh_wait: Duration::from_millis(500),
            drain_timeout: Duration::from_secs(10),
            directory_shards: 64,
        }
    }
}

impl RuntimeConfig {
    /// Create configuration from environment variables with defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with variables read from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let u64_var = |name: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(name) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidEnv { name, value }),
                None => Ok(None),
            }
        };

        if let Some(ms) = u64_var("HEARTH_CALL_TIMEOUT_MS")? {
            config.call_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = u64_var("HEARTH_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = u64_var("HEARTH_IDLE_SWEEP_SECS")? {
            config.idle_sweep_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = u64_var("HEARTH_NOT_OWNER_WAIT_MS")? {
            config.not_owner_refresh_wait = Duration::from_millis(ms);
        }
        if let Some(ms) = u64_var("HEARTH_DRAIN_TIMEOUT_MS")? {
            config.drain_timeout = Duration::from_millis(ms);
        }
        if let Some(shards) = u64_var("HEARTH_DIRECTORY_SHARDS")? {
            config.directory_shards = usize::try_from(shards).map_err(|_| ConfigError::InvalidEnv {
                name: "HEARTH_DIRECTORY_SHARDS",
                value: shards.to_string(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory_shards == 0 {
            return Err(ConfigError::Zero {
                field: "directory_shards",
            });
        }
        if self.idle_sweep_interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "idle_sweep_interval",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<RuntimeConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.not_owner_refresh_wait, Duration::from_millis(500));
        assert_eq!(config.drain_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_not_owner_wait_override() {
        let config = from_vars(&[("HEARTH_NOT_OWNER_WAIT_MS", "250")]).unwrap();
        assert_eq!(config.not_owner_refresh_wait, Duration::from_millis(250));
    }

    #[test]
    fn test_directory_shards_override() {
        let config = from_vars(&[("HEARTH_DIRECTORY_SHARDS", "16")]).unwrap();
        assert_eq!(config.directory_shards, 16);

        assert!(matches!(
            from_vars(&[("HEARTH_DIRECTORY_SHARDS", "0")]),
            Err(ConfigError::Zero { field: "directory_shards" })
        ));
    }

    #[test]
    fn test_drain_timeout_override() {
        let config = from_vars(&[("HEARTH_DRAIN_TIMEOUT_MS", "1500")]).unwrap();
        assert_eq!(config.drain_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let err = from_vars(&[("HEARTH_NOT_OWNER_WAIT_MS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { name: "HEARTH_NOT_OWNER_WAIT_MS", ref value } if value == "soon"
        ));
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.directory_shards, 64);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let config = RuntimeConfig {
            directory_shards: 0,
            ..RuntimeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero { field: "directory_shards" })
        ));
    }
}
