//! Engine bounds and limits.
//!
//! Every ceiling the engines enforce lives in [`EngineConfig`].  Values can
//! be loaded from a JSON file, overlaid from `CONJECTURE_*` environment
//! variables, or left at their defaults.

use crate::egyptian::DEFAULT_SEARCH_BUDGET;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default Collatz step ceiling.
pub const DEFAULT_COLLATZ_STEP_LIMIT: u64 = 100_000;
/// Default switch-over point between trial division and Miller-Rabin.
pub const DEFAULT_TRIAL_DIVISION_LIMIT: u64 = 1_000_000;

/// Tunable limits shared by the verifiers and the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of Collatz steps simulated per starting value.
    pub collatz_step_limit: u64,
    /// Values below this use trial division; larger ones use Miller-Rabin.
    pub trial_division_limit: u64,
    /// Random draws attempted before falling back to a sequential scan.
    pub random_prime_attempts: u32,
    /// The batch generator tries at most `factor * count` candidates.
    pub generation_attempt_factor: u32,
    /// Largest number of integers a range task may cover.
    pub max_range_span: u64,
    /// Largest range a counterexample search may sweep.
    pub max_search_span: u64,
    /// `y` candidates each Erdős–Straus search may test.
    pub egyptian_search_budget: u64,
    /// Largest `max_element` accepted for Sidon enumeration.
    pub sidon_max_element: u64,
    /// Largest `set_size` accepted for Sidon enumeration.
    pub sidon_max_set_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collatz_step_limit: DEFAULT_COLLATZ_STEP_LIMIT,
            trial_division_limit: DEFAULT_TRIAL_DIVISION_LIMIT,
            random_prime_attempts: 100,
            generation_attempt_factor: 10,
            max_range_span: 100_000,
            max_search_span: 1_000,
            egyptian_search_budget: DEFAULT_SEARCH_BUDGET,
            sidon_max_element: 50,
            sidon_max_set_size: 8,
        }
    }
}

/// Errors surfaced while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    /// The config file could not be read.
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    /// The config file is not valid JSON for [`EngineConfig`].
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {key}: {value}")]
    /// An environment override could not be parsed.
    InvalidEnv {
        /// Variable name.
        key: String,
        /// Raw value supplied.
        value: String,
    },
    #[error("{0} must be greater than zero")]
    /// A limit was configured as zero.
    ZeroLimit(&'static str),
}

impl EngineConfig {
    /// Loads a config from a JSON file; missing fields take their defaults.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the defaults overlaid with any `CONJECTURE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Overlays `CONJECTURE_*` environment variables onto `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_u64("CONJECTURE_COLLATZ_STEP_LIMIT")? {
            self.collatz_step_limit = v;
        }
        if let Some(v) = env_u64("CONJECTURE_TRIAL_DIVISION_LIMIT")? {
            self.trial_division_limit = v;
        }
        if let Some(v) = env_u64("CONJECTURE_RANDOM_PRIME_ATTEMPTS")? {
            self.random_prime_attempts = narrow("CONJECTURE_RANDOM_PRIME_ATTEMPTS", v)?;
        }
        if let Some(v) = env_u64("CONJECTURE_GENERATION_ATTEMPT_FACTOR")? {
            self.generation_attempt_factor = narrow("CONJECTURE_GENERATION_ATTEMPT_FACTOR", v)?;
        }
        if let Some(v) = env_u64("CONJECTURE_MAX_RANGE_SPAN")? {
            self.max_range_span = v;
        }
        if let Some(v) = env_u64("CONJECTURE_MAX_SEARCH_SPAN")? {
            self.max_search_span = v;
        }
        if let Some(v) = env_u64("CONJECTURE_EGYPTIAN_SEARCH_BUDGET")? {
            self.egyptian_search_budget = v;
        }
        if let Some(v) = env_u64("CONJECTURE_SIDON_MAX_ELEMENT")? {
            self.sidon_max_element = v;
        }
        if let Some(v) = env_u64("CONJECTURE_SIDON_MAX_SET_SIZE")? {
            self.sidon_max_set_size = narrow("CONJECTURE_SIDON_MAX_SET_SIZE", v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Rejects configurations with zero-valued limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collatz_step_limit == 0 {
            return Err(ConfigError::ZeroLimit("collatz_step_limit"));
        }
        if self.random_prime_attempts == 0 {
            return Err(ConfigError::ZeroLimit("random_prime_attempts"));
        }
        if self.generation_attempt_factor == 0 {
            return Err(ConfigError::ZeroLimit("generation_attempt_factor"));
        }
        if self.max_range_span == 0 {
            return Err(ConfigError::ZeroLimit("max_range_span"));
        }
        if self.max_search_span == 0 {
            return Err(ConfigError::ZeroLimit("max_search_span"));
        }
        if self.egyptian_search_budget == 0 {
            return Err(ConfigError::ZeroLimit("egyptian_search_budget"));
        }
        if self.sidon_max_element == 0 {
            return Err(ConfigError::ZeroLimit("sidon_max_element"));
        }
        if self.sidon_max_set_size == 0 {
            return Err(ConfigError::ZeroLimit("sidon_max_set_size"));
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_u64(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .replace('_', "")
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

fn narrow<T: TryFrom<u64>>(key: &str, value: u64) -> Result<T, ConfigError> {
    T::try_from(value).map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.collatz_step_limit, 100_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("conjecture_config_{unique}.json"));
        fs::write(&path, r#"{ "collatz_step_limit": 500 }"#).unwrap();
        let config = EngineConfig::from_json_path(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.collatz_step_limit, 500);
        assert_eq!(config.max_range_span, EngineConfig::default().max_range_span);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let config = EngineConfig {
            max_range_span: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroLimit("max_range_span"))
        ));
    }

    #[test]
    fn test_parse_u64_accepts_underscores() {
        assert_eq!(parse_u64("K", "100_000").unwrap(), 100_000);
        assert!(parse_u64("K", "ten").is_err());
    }
}
