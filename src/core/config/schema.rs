//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$PROCFLOW_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/procflow/config.toml`
//! 3. `~/.procflow/config.toml` (canonical write location)
//!
//! # Project Config
//!
//! Located at `.procflow/config.toml` in the working directory, or the file
//! passed with `--config`.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., the loop exit bias must be
//! a probability).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::process::CacheInvalidation;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// quiet = false
///
/// [generator]
/// max_trace_length = 200
/// loop_exit_bias = 0.5
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Suppress progress output by default
    pub quiet: Option<bool>,

    /// Trace generator defaults
    pub generator: Option<GeneratorDefaults>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(generator) = &self.generator {
            generator.validate()?;
        }
        Ok(())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// [sequences]
/// allow_self_loops = false
/// allow_parallel = true
///
/// [validity]
/// invalidation = "reset"
///
/// [generator]
/// seed = 7
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Sequence legality policy
    pub sequences: Option<SequenceRules>,

    /// Validity cache behavior
    pub validity: Option<ValidityConfig>,

    /// Trace generator overrides
    pub generator: Option<GeneratorDefaults>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(generator) = &self.generator {
            generator.validate()?;
        }
        Ok(())
    }
}

/// Sequence legality rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SequenceRules {
    /// Allow sequences from a node to itself
    pub allow_self_loops: Option<bool>,

    /// Allow several sequences between the same ordered pair
    pub allow_parallel: Option<bool>,
}

/// Validity cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ValidityConfig {
    /// "pessimistic" or "reset"
    pub invalidation: Option<CacheInvalidation>,
}

/// Trace generator defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorDefaults {
    /// RNG seed; random when unset
    pub seed: Option<u64>,

    /// Maximum number of events per trace
    pub max_trace_length: Option<usize>,

    /// Probability of leaving a loop at an exclusive choice that can loop back
    pub loop_exit_bias: Option<f64>,
}

impl GeneratorDefaults {
    /// Validate the generator settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max) = self.max_trace_length {
            if max == 0 {
                return Err(ConfigError::InvalidValue(
                    "generator.max_trace_length must be at least 1".to_string(),
                ));
            }
        }
        if let Some(bias) = self.loop_exit_bias {
            if !(0.0..=1.0).contains(&bias) {
                return Err(ConfigError::InvalidValue(format!(
                    "generator.loop_exit_bias must be between 0 and 1, got {bias}"
                )));
            }
        }
        Ok(())
    }
}
