//! cli
//!
//! Command-line interface layer for procflow.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and flags
//! - Load configuration and merge it with the flags
//! - Delegate to the command handler
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and hands a
//! [`Context`] to [`commands::generate`], which drives the library through
//! import, check, generation, and export.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};

/// Execution context shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output verbosity after merging flags and config
    pub verbosity: Verbosity,
    /// Loaded configuration
    pub config: Config,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let loaded =
        Config::load(Some(&cwd), cli.config.as_deref()).context("Failed to load configuration")?;

    // CLI flags take precedence over config.
    let quiet = cli.quiet || loaded.config.quiet();
    let verbosity = Verbosity::from_flags(quiet, cli.debug);

    for warning in &loaded.warnings {
        output::warn(&warning.message, verbosity);
    }
    if let Some(path) = loaded.config.global_config_loaded_from() {
        output::debug(format!("global config: {}", path.display()), verbosity);
    }
    if let Some(path) = loaded.config.project_config_loaded_from() {
        output::debug(format!("project config: {}", path.display()), verbosity);
    }

    let ctx = Context {
        verbosity,
        config: loaded.config,
    };

    commands::generate(&ctx, &cli).map(|_| ())
}
