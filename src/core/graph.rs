//! core::graph
//!
//! Reachability over the sequence edges of a process.
//!
//! # Architecture
//!
//! The process graph is a directed graph where:
//! - Nodes are flow objects
//! - Edges are sequences, followed from source to sink
//! - Entry points are start events, exit points are end events
//!
//! Unlike a stack of branches the graph may contain cycles (loops back to an
//! earlier task), so every traversal here is iterative and keeps a visited
//! set. A node is expanded at most once per search, which bounds each call to
//! O(V + E) and guarantees termination.

use std::collections::{BTreeSet, VecDeque};

use super::process::Process;
use super::types::{NodeId, Role};

/// Direct successors of a node, in sequence id order.
///
/// Parallel sequences to the same sink yield that sink once per sequence.
pub fn successors(process: &Process, node: NodeId) -> Vec<NodeId> {
    process
        .node(node)
        .map(|flow_object| {
            flow_object
                .outgoing()
                .iter()
                .filter_map(|sequence| process.sequence(*sequence))
                .map(|sequence| sequence.sink())
                .collect()
        })
        .unwrap_or_default()
}

/// Direct predecessors of a node, in sequence id order.
pub fn predecessors(process: &Process, node: NodeId) -> Vec<NodeId> {
    process
        .node(node)
        .map(|flow_object| {
            flow_object
                .incoming()
                .iter()
                .filter_map(|sequence| process.sequence(*sequence))
                .map(|sequence| sequence.source())
                .collect()
        })
        .unwrap_or_default()
}

/// All nodes reachable from `start` by following outgoing sequences.
///
/// The start node itself is included. Returns an empty set if `start` is not
/// registered in `process`.
///
/// # Example
///
/// ```
/// use procflow::core::graph::reachable_from;
/// use procflow::core::process::Process;
///
/// let mut process = Process::new("order");
/// let start = process.new_start_event();
/// let a = process.new_task("A");
/// let b = process.new_task("B");
/// process.new_sequence(start, a).unwrap();
/// process.new_sequence(a, b).unwrap();
/// process.new_sequence(b, a).unwrap();
///
/// let reached = reachable_from(&process, a);
/// assert!(reached.contains(&a));
/// assert!(reached.contains(&b));
/// assert!(!reached.contains(&start));
/// ```
pub fn reachable_from(process: &Process, start: NodeId) -> BTreeSet<NodeId> {
    let mut visited = BTreeSet::new();
    if process.node(start).is_none() {
        return visited;
    }

    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for next in successors(process, current) {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    visited
}

/// Whether some end event is reachable from `start`.
///
/// An end event reaches itself. The search stops at the first end event it
/// dequeues rather than computing the full reachable set.
pub fn can_reach_end_event(process: &Process, start: NodeId) -> bool {
    let Some(node) = process.node(start) else {
        return false;
    };
    if node.role() == Role::EndEvent {
        return true;
    }

    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for next in successors(process, current) {
            if !visited.insert(next) {
                continue;
            }
            if process.node(next).map(|n| n.role()) == Some(Role::EndEvent) {
                return true;
            }
            queue.push_back(next);
        }
    }

    false
}

/// Nodes from which no end event can be reached.
///
/// Computed with a single backward search from every end event, so the cost
/// is O(V + E) for the whole process rather than per node.
pub fn nodes_without_exit(process: &Process) -> BTreeSet<NodeId> {
    let mut reaches_end = BTreeSet::new();
    let mut queue = VecDeque::new();

    for end in process.end_events() {
        if reaches_end.insert(end.id()) {
            queue.push_back(end.id());
        }
    }

    while let Some(current) = queue.pop_front() {
        for previous in predecessors(process, current) {
            if reaches_end.insert(previous) {
                queue.push_back(previous);
            }
        }
    }

    process
        .flow_objects()
        .map(|node| node.id())
        .filter(|id| !reaches_end.contains(id))
        .collect()
}
