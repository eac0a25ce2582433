//! procflow - Business process graphs, validity checking, and trace synthesis
//!
//! procflow models a business process as a directed graph of start events,
//! end events, tasks, and gateways joined by sequences. It guarantees the
//! graph is structurally well formed before the graph is exported or used to
//! generate synthetic execution traces.
//!
//! # Architecture
//!
//! - [`core`] - Graph model, process registry, reachability, validity, config
//! - [`io`] - Model import and export (JSON process documents)
//! - [`generator`] - Seeded token-based trace generator and event logs
//! - [`cli`] - Command-line interface layer
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! procflow maintains the following invariants:
//!
//! 1. A process owns every entity it creates; foreign handles are rejected
//! 2. No sequence id ever dangles in a node's edge set
//! 3. Validity is reported as exactly one violated rule, deterministically
//! 4. Logs are only generated from processes that passed the check

pub mod cli;
pub mod core;
pub mod generator;
pub mod io;
pub mod ui;
