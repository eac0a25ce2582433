//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! procflow has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Settings for the models in one working directory
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$PROCFLOW_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/procflow/config.toml`
//! 3. `~/.procflow/config.toml` (canonical write location)
//!
//! # Project Config Locations
//!
//! Searched in order:
//! 1. An explicit path (`--config`), which must exist
//! 2. `.procflow/config.toml` (canonical)
//! 3. `procflow.toml` (compatibility, warns)
//!
//! # Example
//!
//! ```no_run
//! use procflow::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/models")), None).unwrap();
//! let config = result.config;
//!
//! let policy = config.model_policy();
//! println!("self-loops allowed: {}", policy.sequences.allow_self_loops);
//! println!("max trace length: {}", config.max_trace_length());
//! ```

pub mod schema;

pub use schema::{GeneratorDefaults, GlobalConfig, ProjectConfig, SequenceRules, ValidityConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::process::{ModelPolicy, SequencePolicy};

/// Default cap on events per generated trace.
pub const DEFAULT_MAX_TRACE_LENGTH: usize = 100;

/// Default probability of leaving a loop at an exclusive choice.
pub const DEFAULT_LOOP_EXIT_BIAS: f64 = 0.5;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence rules automatically. Project config
/// overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if found)
    pub project: Option<ProjectConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file (if loaded)
    project_path: Option<PathBuf>,
}

impl Config {
    /// Build a configuration directly, without touching the filesystem.
    pub fn new(global: GlobalConfig, project: Option<ProjectConfig>) -> Self {
        Self {
            global,
            project,
            global_path: None,
            project_path: None,
        }
    }

    /// Load configuration from default locations.
    ///
    /// `project_dir` is searched for a project config unless `explicit` names
    /// one directly.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or holds
    /// invalid values, or if `explicit` cannot be read. Missing default
    /// config files are not an error (defaults are used).
    pub fn load(
        project_dir: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global()?;

        let (project, project_path) = match explicit {
            Some(path) => (Some(Self::read_toml::<ProjectConfig>(path)?), Some(path.to_path_buf())),
            None => match project_dir {
                Some(dir) => Self::load_project(dir, &mut warnings)?,
                None => (None, None),
            },
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                global_path,
                project_path,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        if let Ok(path) = std::env::var("PROCFLOW_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("procflow/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".procflow/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Load project configuration from standard locations.
    fn load_project(
        project_dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<ProjectConfig>, Option<PathBuf>), ConfigError> {
        let canonical = Self::project_config_path(project_dir);
        if canonical.exists() {
            let config = Self::read_toml(&canonical)?;
            return Ok((Some(config), Some(canonical)));
        }

        let compat = project_dir.join("procflow.toml");
        if compat.exists() {
            warnings.push(ConfigWarning {
                message: format!(
                    "Using deprecated config location. Please move to '{}'",
                    canonical.display()
                ),
                path: compat.clone(),
            });
            let config = Self::read_toml(&compat)?;
            return Ok((Some(config), Some(compat)));
        }

        Ok((None, None))
    }

    /// Read and parse a TOML config file.
    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for project config.
    pub fn project_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".procflow/config.toml")
    }

    /// Write project config atomically.
    ///
    /// Creates parent directories if needed.
    pub fn write_project(project_dir: &Path, config: &ProjectConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::project_config_path(project_dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write a config file atomically (temp file, then rename).
    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Policy for newly created or imported processes.
    pub fn model_policy(&self) -> ModelPolicy {
        let rules = self.project.as_ref().and_then(|p| p.sequences.as_ref());
        let defaults = SequencePolicy::default();
        ModelPolicy {
            sequences: SequencePolicy {
                allow_self_loops: rules
                    .and_then(|r| r.allow_self_loops)
                    .unwrap_or(defaults.allow_self_loops),
                allow_parallel: rules
                    .and_then(|r| r.allow_parallel)
                    .unwrap_or(defaults.allow_parallel),
            },
            invalidation: self
                .project
                .as_ref()
                .and_then(|p| p.validity.as_ref())
                .and_then(|v| v.invalidation)
                .unwrap_or_default(),
        }
    }

    /// Check if progress output is suppressed by default.
    ///
    /// Defaults to `false` if not configured.
    pub fn quiet(&self) -> bool {
        self.global.quiet.unwrap_or(false)
    }

    /// Generator seed, if configured.
    pub fn generator_seed(&self) -> Option<u64> {
        self.generator_value(|g| g.seed)
    }

    /// Maximum events per trace.
    ///
    /// Defaults to [`DEFAULT_MAX_TRACE_LENGTH`].
    pub fn max_trace_length(&self) -> usize {
        self.generator_value(|g| g.max_trace_length)
            .unwrap_or(DEFAULT_MAX_TRACE_LENGTH)
    }

    /// Loop exit bias for the generator.
    ///
    /// Defaults to [`DEFAULT_LOOP_EXIT_BIAS`].
    pub fn loop_exit_bias(&self) -> f64 {
        self.generator_value(|g| g.loop_exit_bias)
            .unwrap_or(DEFAULT_LOOP_EXIT_BIAS)
    }

    fn generator_value<T>(&self, get: impl Fn(&GeneratorDefaults) -> Option<T>) -> Option<T> {
        self.project
            .as_ref()
            .and_then(|p| p.generator.as_ref())
            .and_then(&get)
            .or_else(|| self.global.generator.as_ref().and_then(&get))
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process::CacheInvalidation;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_project() {
        let config = Config::default();
        assert_eq!(config.model_policy(), ModelPolicy::default());
        assert_eq!(config.max_trace_length(), DEFAULT_MAX_TRACE_LENGTH);
        assert_eq!(config.loop_exit_bias(), DEFAULT_LOOP_EXIT_BIAS);
        assert!(config.generator_seed().is_none());
        assert!(!config.quiet());
    }

    #[test]
    fn load_project_config() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".procflow");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
            [sequences]
            allow_parallel = false

            [validity]
            invalidation = "reset"

            [generator]
            seed = 42
            "#,
        )
        .unwrap();

        let result = Config::load(Some(temp.path()), None).unwrap();
        let config = result.config;

        let policy = config.model_policy();
        assert!(policy.sequences.allow_self_loops);
        assert!(!policy.sequences.allow_parallel);
        assert_eq!(policy.invalidation, CacheInvalidation::Reset);
        assert_eq!(config.generator_seed(), Some(42));
        assert!(result.warnings.is_empty());
        assert!(config.project_config_loaded_from().is_some());
    }

    #[test]
    fn load_project_compat_warns() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("procflow.toml"),
            "[generator]\nmax_trace_length = 12\n",
        )
        .unwrap();

        let result = Config::load(Some(temp.path()), None).unwrap();

        assert_eq!(result.config.max_trace_length(), 12);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("deprecated"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");

        let result = Config::load(None, Some(&missing));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn explicit_config_overrides_project_dir() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("custom.toml");
        fs::write(&explicit, "[generator]\nseed = 9\n").unwrap();
        Config::write_project(
            temp.path(),
            &ProjectConfig {
                generator: Some(GeneratorDefaults {
                    seed: Some(1),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .unwrap();

        let result = Config::load(Some(temp.path()), Some(&explicit)).unwrap();
        assert_eq!(result.config.generator_seed(), Some(9));
    }

    #[test]
    fn write_project_config_atomic() {
        let temp = TempDir::new().unwrap();
        let config = ProjectConfig {
            sequences: Some(SequenceRules {
                allow_self_loops: Some(false),
                allow_parallel: None,
            }),
            ..Default::default()
        };

        let path = Config::write_project(temp.path(), &config).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        let loaded = Config::load(Some(temp.path()), None).unwrap();
        assert!(!loaded.config.model_policy().sequences.allow_self_loops);
    }

    #[test]
    fn invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[generator]\nloop_exit_bias = 2.0\n").unwrap();

        let result = Config::load(None, Some(&path));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "trunk = \"main\"\n").unwrap();

        let result = Config::load(None, Some(&path));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn precedence_project_overrides_global() {
        let config = Config {
            global: GlobalConfig {
                generator: Some(GeneratorDefaults {
                    max_trace_length: Some(10),
                    loop_exit_bias: Some(0.9),
                    ..Default::default()
                }),
                ..Default::default()
            },
            project: Some(ProjectConfig {
                generator: Some(GeneratorDefaults {
                    max_trace_length: Some(50),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            global_path: None,
            project_path: None,
        };

        assert_eq!(config.max_trace_length(), 50);
        // Falls through to global when the project leaves it unset.
        assert_eq!(config.loop_exit_bias(), 0.9);
    }
}
