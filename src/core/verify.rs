//! core::verify
//!
//! Structural validity of a process graph.
//!
//! # Modes
//!
//! - **Check** ([`check_process`]): the ordered, short-circuiting algorithm
//!   behind [`Process::check`](super::process::Process::check). Reports the
//!   first violated rule.
//! - **Diagnose** ([`diagnose`]): runs every rule and collects all violations,
//!   for tools that want to show the full list at once.
//!
//! # Rules
//!
//! In order:
//! 1. At least one start event
//! 2. At least one end event
//! 3. Every start event has an outgoing sequence and can reach an end event
//! 4. Every end event has an incoming sequence
//! 5. Every task has both sides connected and can reach an end event
//! 6. Every gateway has both sides connected and can reach an end event
//!
//! # Invariants
//!
//! - Never mutates the process
//! - Deterministic: nodes are visited in creation order within each role

use thiserror::Error;

use super::graph;
use super::model::FlowObject;
use super::process::Process;
use super::types::Role;

/// A violated validity rule.
///
/// Each error names exactly one rule and, where applicable, the component
/// that breaks it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidProcessError {
    #[error("invalid model: no start event given")]
    NoStartEvent,

    #[error("invalid model: no end event given")]
    NoEndEvent,

    #[error("invalid model: {component} is isolated")]
    Isolated { component: String },

    #[error("invalid model: {component} cannot reach an end event")]
    CannotReachEndEvent { component: String },
}

/// Result of a full diagnostic pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    /// Whether every rule passed
    pub ok: bool,
    /// Violations, in rule order
    pub errors: Vec<InvalidProcessError>,
}

impl VerifyResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    /// Create a failed result with errors.
    pub fn failure(errors: Vec<InvalidProcessError>) -> Self {
        Self { ok: false, errors }
    }
}

/// Run the validity rules, stopping at the first violation.
pub fn check_process(process: &Process) -> Result<(), InvalidProcessError> {
    if process.start_events().next().is_none() {
        return Err(InvalidProcessError::NoStartEvent);
    }
    if process.end_events().next().is_none() {
        return Err(InvalidProcessError::NoEndEvent);
    }

    for role in [Role::StartEvent, Role::EndEvent, Role::Task, Role::Gateway] {
        for node in process.nodes_with_role(role) {
            check_node(process, node)?;
        }
    }

    Ok(())
}

fn check_node(process: &Process, node: &FlowObject) -> Result<(), InvalidProcessError> {
    if node.is_isolated() {
        return Err(InvalidProcessError::Isolated {
            component: node.to_string(),
        });
    }
    // End events trivially reach themselves.
    if node.role() != Role::EndEvent && !graph::can_reach_end_event(process, node.id()) {
        return Err(InvalidProcessError::CannotReachEndEvent {
            component: node.to_string(),
        });
    }
    Ok(())
}

/// Run every validity rule and collect all violations.
///
/// The first entry of a failed result is the error [`check_process`] would
/// return. Reachability is computed once for the whole process.
pub fn diagnose(process: &Process) -> VerifyResult {
    let mut errors = Vec::new();

    if process.start_events().next().is_none() {
        errors.push(InvalidProcessError::NoStartEvent);
    }
    if process.end_events().next().is_none() {
        errors.push(InvalidProcessError::NoEndEvent);
    }

    let stuck = graph::nodes_without_exit(process);
    for role in [Role::StartEvent, Role::EndEvent, Role::Task, Role::Gateway] {
        for node in process.nodes_with_role(role) {
            if node.is_isolated() {
                errors.push(InvalidProcessError::Isolated {
                    component: node.to_string(),
                });
                // An isolated node's reachability adds no information.
                continue;
            }
            if role != Role::EndEvent && stuck.contains(&node.id()) {
                errors.push(InvalidProcessError::CannotReachEndEvent {
                    component: node.to_string(),
                });
            }
        }
    }

    if errors.is_empty() {
        VerifyResult::success()
    } else {
        VerifyResult::failure(errors)
    }
}
