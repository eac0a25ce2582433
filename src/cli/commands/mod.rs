//! cli::commands
//!
//! Command handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves settings from flags and config
//! 2. Calls the library to do the work
//! 3. Formats and displays output
//!
//! Handlers return `anyhow::Result` so that every library error reaches the
//! user with its context attached.

mod generate;

pub use generate::{generate, simulation_config};
