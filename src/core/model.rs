//! core::model
//!
//! Entities owned by a [`Process`](super::process::Process).
//!
//! # Entities
//!
//! - [`FlowObject`] - A node of the flow graph (start/end event, task, gateway)
//! - [`Sequence`] - A directed edge between two flow objects
//! - [`DataObject`] - An artifact attached to tasks, outside the flow graph
//! - [`Component`] / [`ComponentRef`] - Owned and referenced forms of any of
//!   the above, used by the generic registry operations
//!
//! Entities are constructed only by the process; their fields are private and
//! mutated only through the process API, which keeps edge sets consistent.

use std::collections::BTreeSet;
use std::fmt;

use super::types::{DataObjectId, GatewayKind, NodeId, Role, SequenceId};

/// Variant-specific payload of a flow object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowObjectKind {
    StartEvent,
    EndEvent,
    Task { name: String },
    Gateway { kind: GatewayKind },
}

impl FlowObjectKind {
    pub fn role(&self) -> Role {
        match self {
            FlowObjectKind::StartEvent => Role::StartEvent,
            FlowObjectKind::EndEvent => Role::EndEvent,
            FlowObjectKind::Task { .. } => Role::Task,
            FlowObjectKind::Gateway { .. } => Role::Gateway,
        }
    }
}

/// A node of the process graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowObject {
    id: NodeId,
    kind: FlowObjectKind,
    incoming: BTreeSet<SequenceId>,
    outgoing: BTreeSet<SequenceId>,
}

impl FlowObject {
    pub(crate) fn new(id: NodeId, kind: FlowObjectKind) -> Self {
        Self {
            id,
            kind,
            incoming: BTreeSet::new(),
            outgoing: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &FlowObjectKind {
        &self.kind
    }

    pub fn role(&self) -> Role {
        self.kind.role()
    }

    /// Task name, if this node is a task.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            FlowObjectKind::Task { name } => Some(name),
            _ => None,
        }
    }

    /// Gateway kind, if this node is a gateway.
    pub fn gateway_kind(&self) -> Option<GatewayKind> {
        match &self.kind {
            FlowObjectKind::Gateway { kind } => Some(*kind),
            _ => None,
        }
    }

    pub fn incoming(&self) -> &BTreeSet<SequenceId> {
        &self.incoming
    }

    pub fn outgoing(&self) -> &BTreeSet<SequenceId> {
        &self.outgoing
    }

    /// Whether the node lacks an edge its role requires.
    ///
    /// Start events need an outgoing sequence, end events an incoming one,
    /// and tasks and gateways need both.
    pub fn is_isolated(&self) -> bool {
        match self.role() {
            Role::StartEvent => self.outgoing.is_empty(),
            Role::EndEvent => self.incoming.is_empty(),
            Role::Task | Role::Gateway => self.outgoing.is_empty() || self.incoming.is_empty(),
        }
    }

    pub(crate) fn attach_incoming(&mut self, sequence: SequenceId) {
        self.incoming.insert(sequence);
    }

    pub(crate) fn attach_outgoing(&mut self, sequence: SequenceId) {
        self.outgoing.insert(sequence);
    }

    pub(crate) fn detach(&mut self, sequence: SequenceId) {
        self.incoming.remove(&sequence);
        self.outgoing.remove(&sequence);
    }

    pub(crate) fn clear_edges(&mut self) {
        self.incoming.clear();
        self.outgoing.clear();
    }
}

impl fmt::Display for FlowObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FlowObjectKind::StartEvent => write!(f, "start event {}", self.id),
            FlowObjectKind::EndEvent => write!(f, "end event {}", self.id),
            FlowObjectKind::Task { name } => write!(f, "task '{}' {}", name, self.id),
            FlowObjectKind::Gateway { kind } => write!(f, "{} gateway {}", kind, self.id),
        }
    }
}

/// A directed edge between two flow objects of the same process.
///
/// Immutable once created. Identity is the [`SequenceId`], not the endpoint
/// pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    id: SequenceId,
    source: NodeId,
    sink: NodeId,
}

impl Sequence {
    pub(crate) fn new(id: SequenceId, source: NodeId, sink: NodeId) -> Self {
        Self { id, source, sink }
    }

    pub fn id(&self) -> SequenceId {
        self.id
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Whether `node` is either endpoint.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.sink == node
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sequence {} ({} -> {})", self.id, self.source, self.sink)
    }
}

/// An artifact attached to tasks.
///
/// Data objects are not part of the flow graph and take no part in validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    id: DataObjectId,
    name: String,
    value: Option<String>,
    attached_to: BTreeSet<NodeId>,
}

impl DataObject {
    pub(crate) fn new(id: DataObjectId, name: String, value: Option<String>) -> Self {
        Self {
            id,
            name,
            value,
            attached_to: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> DataObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub(crate) fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }

    /// Tasks this data object is attached to.
    pub fn attached_to(&self) -> &BTreeSet<NodeId> {
        &self.attached_to
    }

    pub(crate) fn attach(&mut self, task: NodeId) -> bool {
        self.attached_to.insert(task)
    }

    pub(crate) fn detach(&mut self, task: NodeId) -> bool {
        self.attached_to.remove(&task)
    }

    pub(crate) fn retain_attachments(&mut self, keep: impl FnMut(&NodeId) -> bool) {
        self.attached_to.retain(keep);
    }
}

/// An entity detached from (or about to be registered into) a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Node(FlowObject),
    Sequence(Sequence),
    DataObject(DataObject),
}

impl Component {
    pub fn component_ref(&self) -> ComponentRef {
        match self {
            Component::Node(node) => ComponentRef::Node(node.id()),
            Component::Sequence(sequence) => ComponentRef::Sequence(sequence.id()),
            Component::DataObject(data) => ComponentRef::DataObject(data.id()),
        }
    }

    /// Whether registering or removing this component can change validity.
    pub fn affects_flow(&self) -> bool {
        self.component_ref().affects_flow()
    }
}

/// A reference to any entity of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentRef {
    Node(NodeId),
    Sequence(SequenceId),
    DataObject(DataObjectId),
}

impl ComponentRef {
    pub fn affects_flow(&self) -> bool {
        !matches!(self, ComponentRef::DataObject(_))
    }
}

impl From<NodeId> for ComponentRef {
    fn from(id: NodeId) -> Self {
        ComponentRef::Node(id)
    }
}

impl From<SequenceId> for ComponentRef {
    fn from(id: SequenceId) -> Self {
        ComponentRef::Sequence(id)
    }
}

impl From<DataObjectId> for ComponentRef {
    fn from(id: DataObjectId) -> Self {
        ComponentRef::DataObject(id)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentRef::Node(id) => write!(f, "node {id}"),
            ComponentRef::Sequence(id) => write!(f, "sequence {id}"),
            ComponentRef::DataObject(id) => write!(f, "data object {id}"),
        }
    }
}
