//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All terminal output goes through this module so that `--quiet` and
//! `--debug` behave the same everywhere. The library modules never print.

pub mod output;
