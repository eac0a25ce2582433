//! core
//!
//! The process graph model and its validity engine.
//!
//! # Modules
//!
//! - [`types`] - Strong types: handles, Role, GatewayKind, Fingerprint
//! - [`model`] - Flow objects, sequences, and data objects
//! - [`process`] - The process aggregate root and its registry
//! - [`graph`] - Cycle-safe reachability over sequences
//! - [`verify`] - Ordered validity check and full diagnostics
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - A process is the only owner of its entities; callers hold handles
//! - Every mutation keeps the edge sets consistent
//! - All verification is deterministic
//! - No I/O outside [`config`]

pub mod config;
pub mod graph;
pub mod model;
pub mod process;
pub mod types;
pub mod verify;
