//! Property-based tests for the process model.
//!
//! These tests use proptest to build processes from random operation scripts
//! and verify the registry and validity invariants hold for all of them.

use proptest::prelude::*;

use procflow::core::graph::{can_reach_end_event, nodes_without_exit, reachable_from};
use procflow::core::model::Component;
use procflow::core::process::{CacheInvalidation, ModelPolicy, Process, Validity};
use procflow::core::types::{GatewayKind, NodeId, Role};
use procflow::core::verify::diagnose;

/// One step of a construction script. Node operands are indices into the
/// nodes created so far (taken modulo their count).
#[derive(Debug, Clone)]
enum Op {
    AddNode(Role),
    AddGateway(GatewayKind),
    Connect(usize, usize),
    Remove(usize),
    AttachData(usize),
}

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::StartEvent),
        Just(Role::EndEvent),
        Just(Role::Task),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => role().prop_map(Op::AddNode),
        1 => prop_oneof![Just(GatewayKind::Exclusive), Just(GatewayKind::Parallel)]
            .prop_map(Op::AddGateway),
        6 => (0usize..64, 0usize..64).prop_map(|(a, b)| Op::Connect(a, b)),
        1 => (0usize..64).prop_map(Op::Remove),
        1 => (0usize..64).prop_map(Op::AttachData),
    ]
}

fn script() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(), 0..60)
}

/// Apply a script, ignoring rejected sequences and attachments.
fn build(ops: &[Op], policy: ModelPolicy) -> Process {
    let mut process = Process::with_policy("generated", policy);
    let mut nodes: Vec<NodeId> = Vec::new();

    for op in ops {
        match op {
            Op::AddNode(Role::StartEvent) => nodes.push(process.new_start_event()),
            Op::AddNode(Role::EndEvent) => nodes.push(process.new_end_event()),
            Op::AddNode(_) => nodes.push(process.new_task(format!("T{}", nodes.len()))),
            Op::AddGateway(kind) => nodes.push(process.new_gateway(*kind)),
            Op::Connect(a, b) if !nodes.is_empty() => {
                let _ = process.new_sequence(nodes[a % nodes.len()], nodes[b % nodes.len()]);
            }
            Op::Remove(i) if !nodes.is_empty() => {
                let id = nodes.remove(i % nodes.len());
                process.remove_component(id);
            }
            Op::AttachData(i) if !nodes.is_empty() => {
                let data = process.new_data_object("doc", None);
                let _ = process.attach_data_object(data, nodes[i % nodes.len()]);
            }
            _ => {}
        }
    }

    process
}

fn assert_edges_consistent(process: &Process) -> Result<(), TestCaseError> {
    for node in process.flow_objects() {
        for id in node.outgoing() {
            let sequence = process.sequence(*id);
            prop_assert!(sequence.is_some(), "dangling outgoing {} on {}", id, node);
            prop_assert_eq!(sequence.map(|s| s.source()), Some(node.id()));
        }
        for id in node.incoming() {
            let sequence = process.sequence(*id);
            prop_assert!(sequence.is_some(), "dangling incoming {} on {}", id, node);
            prop_assert_eq!(sequence.map(|s| s.sink()), Some(node.id()));
        }
    }
    for sequence in process.sequences() {
        prop_assert!(process.node(sequence.source()).is_some());
        prop_assert!(process.node(sequence.sink()).is_some());
    }
    for data in process.data_objects() {
        for task in data.attached_to() {
            prop_assert_eq!(process.role_of(*task), Some(Role::Task));
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn edge_sets_never_dangle(ops in script()) {
        let process = build(&ops, ModelPolicy::default());
        assert_edges_consistent(&process)?;
    }

    #[test]
    fn role_table_always_holds(ops in script()) {
        let process = build(&ops, ModelPolicy::default());
        for start in process.start_events() {
            prop_assert!(start.incoming().is_empty());
        }
        for end in process.end_events() {
            prop_assert!(end.outgoing().is_empty());
        }
    }

    #[test]
    fn removing_any_node_keeps_edges_consistent(ops in script(), pick in 0usize..64) {
        let mut process = build(&ops, ModelPolicy::default());
        let ids: Vec<NodeId> = process.flow_objects().map(|n| n.id()).collect();
        prop_assume!(!ids.is_empty());

        let id = ids[pick % ids.len()];
        let removed = process.remove_component(id);
        prop_assert!(matches!(removed, Some(Component::Node(_))));
        prop_assert!(!process.contains(id));
        prop_assert!(process.sequences().all(|s| !s.touches(id)));
        assert_edges_consistent(&process)?;

        // A removed node comes back isolated.
        if let Some(component) = removed {
            process.register_component(component).unwrap();
            prop_assert!(process.node(id).map(|n| n.incoming().is_empty() && n.outgoing().is_empty()).unwrap_or(false));
        }
    }

    #[test]
    fn diagnose_agrees_with_check(ops in script()) {
        let mut process = build(&ops, ModelPolicy::default());
        let report = diagnose(&process);
        let checked = process.check();

        prop_assert_eq!(report.ok, checked.is_ok());
        if let Err(first) = checked {
            prop_assert_eq!(report.errors.first(), Some(&first));
        }
    }

    #[test]
    fn reachability_is_consistent(ops in script()) {
        let process = build(&ops, ModelPolicy::default());
        let stuck = nodes_without_exit(&process);

        for node in process.flow_objects() {
            let reached = reachable_from(&process, node.id());
            let hits_end = reached
                .iter()
                .any(|id| process.role_of(*id) == Some(Role::EndEvent));
            prop_assert_eq!(can_reach_end_event(&process, node.id()), hits_end);
            prop_assert_eq!(stuck.contains(&node.id()), !hits_end);
        }
    }

    #[test]
    fn is_valid_is_stable_after_check(ops in script()) {
        let mut process = build(&ops, ModelPolicy::default());
        let outcome = process.check().is_ok();
        prop_assert_eq!(process.is_valid(), outcome);
        prop_assert_eq!(process.is_valid(), outcome);
        prop_assert_eq!(process.evaluate_validity(), outcome);
    }

    #[test]
    fn reset_policy_recomputes_lazily(ops in script()) {
        let policy = ModelPolicy {
            invalidation: CacheInvalidation::Reset,
            ..Default::default()
        };
        let mut process = build(&ops, policy);
        let expected = diagnose(&process).ok;

        prop_assert_ne!(process.validity(), Validity::Valid);
        prop_assert_eq!(process.is_valid(), expected);
    }

    #[test]
    fn fingerprint_deterministic(ops in script()) {
        let first = build(&ops, ModelPolicy::default());
        let second = build(&ops, ModelPolicy::default());
        prop_assert_ne!(first.id(), second.id());
        prop_assert_eq!(first.fingerprint(), second.fingerprint());
    }
}
