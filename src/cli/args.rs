//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Positional Arguments
//!
//! - `MODEL`: process document to simulate
//! - `LOG`: event log destination (`.jsonl` selects JSON Lines)
//! - `TRACES`: number of traces to generate
//!
//! # Flags
//!
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--seed <u64>`: Fix the generator seed
//! - `--max-trace-length <n>`: Cap events per trace
//! - `--config <path>`: Use this project config file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//!
//! Missing, extra, or malformed arguments make clap print usage and exit
//! with status 2.

use clap::Parser;
use std::path::PathBuf;

/// procflow - Check a business process model and synthesize an event log
#[derive(Parser, Debug)]
#[command(name = "procflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Process document to import (JSON)
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Where to write the event log (.json, or .jsonl for JSON Lines)
    #[arg(value_name = "LOG")]
    pub log: PathBuf,

    /// Number of traces to generate
    #[arg(value_name = "TRACES")]
    pub traces: usize,

    /// Seed for the trace generator (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum number of events per trace
    #[arg(long, value_name = "N")]
    pub max_trace_length: Option<usize>,

    /// Project config file (default: .procflow/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
