//! core::process
//!
//! The process aggregate root.
//!
//! # Ownership
//!
//! A [`Process`] owns every flow object, sequence, and data object it
//! creates. Callers hold only copyable handles ([`NodeId`], [`SequenceId`],
//! [`DataObjectId`]) and go through the process for every mutation, which
//! keeps the following invariants:
//!
//! - Each entity lives in exactly one role-keyed collection
//! - Both endpoints of a sequence are registered nodes of this process, and
//!   the sequence appears in their edge sets
//! - Removing a node removes every sequence incident to it first
//! - Handles minted by another process are rejected
//!
//! # Validity cache
//!
//! The outcome of [`Process::check`] is cached in a tri-state [`Validity`].
//! Flow-affecting mutations invalidate it according to [`CacheInvalidation`];
//! data object operations never touch it.
//!
//! # Example
//!
//! ```
//! use procflow::core::process::Process;
//!
//! let mut process = Process::new("order");
//! let start = process.new_start_event();
//! let pay = process.new_task("Pay");
//! let end = process.new_end_event();
//! process.new_sequence(start, pay).unwrap();
//! process.new_sequence(pay, end).unwrap();
//!
//! assert!(process.check().is_ok());
//! assert!(process.is_valid());
//!
//! // Ending a sequence at a start event is illegal.
//! assert!(process.new_sequence(pay, start).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{Component, ComponentRef, DataObject, FlowObject, FlowObjectKind, Sequence};
use super::types::{
    DataObjectId, Fingerprint, GatewayKind, Handle, NodeId, ProcessId, Role, SequenceId,
};
use super::verify::{self, InvalidProcessError};

/// Reasons a sequence cannot be created.
///
/// No edge is registered when any of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IllegalSequenceError {
    #[error("{node} cannot be the sink of a sequence")]
    StartEventAsSink { node: String },

    #[error("{node} cannot be the source of a sequence")]
    EndEventAsSource { node: String },

    #[error("node {node:?} belongs to another process (expected {expected})")]
    ForeignComponent { node: NodeId, expected: ProcessId },

    #[error("node {0} is not registered in this process")]
    UnknownNode(NodeId),

    #[error("self-loop on {node} is not allowed")]
    SelfLoop { node: String },

    #[error("a sequence from {from} to {to} already exists")]
    ParallelDuplicate { from: String, to: String },
}

/// Errors from registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    #[error("{component} belongs to process {owner}, not {process}")]
    ForeignComponent {
        component: ComponentRef,
        owner: ProcessId,
        process: ProcessId,
    },

    #[error("{0} is not registered in this process")]
    UnknownComponent(ComponentRef),

    #[error("data objects can only be attached to tasks, not {node}")]
    NotATask { node: String },

    #[error(transparent)]
    IllegalSequence(#[from] IllegalSequenceError),
}

/// Cached outcome of the validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    /// Not computed since creation (or since the last reset).
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// What a flow-affecting mutation does to the validity cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheInvalidation {
    /// Set the cache to [`Validity::Invalid`]. [`Process::is_valid`] then
    /// keeps answering `false` until [`Process::check`] is called again.
    #[default]
    Pessimistic,
    /// Set the cache to [`Validity::Unknown`] so the next
    /// [`Process::is_valid`] recomputes it.
    Reset,
}

/// Legality policy for sequences beyond the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePolicy {
    /// Allow a sequence whose source and sink are the same node.
    pub allow_self_loops: bool,
    /// Allow more than one sequence between the same ordered pair of nodes.
    pub allow_parallel: bool,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        Self {
            allow_self_loops: true,
            allow_parallel: true,
        }
    }
}

/// Per-process policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelPolicy {
    pub sequences: SequencePolicy,
    pub invalidation: CacheInvalidation,
}

/// A business process: the owner of a flow graph and its data objects.
#[derive(Debug)]
pub struct Process {
    id: ProcessId,
    name: String,
    next_index: u32,
    start_events: BTreeMap<NodeId, FlowObject>,
    end_events: BTreeMap<NodeId, FlowObject>,
    tasks: BTreeMap<NodeId, FlowObject>,
    gateways: BTreeMap<NodeId, FlowObject>,
    sequences: BTreeMap<SequenceId, Sequence>,
    data_objects: BTreeMap<DataObjectId, DataObject>,
    policy: ModelPolicy,
    validity: Validity,
}

impl Process {
    /// Create an empty process with the default policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, ModelPolicy::default())
    }

    /// Create an empty process with an explicit policy.
    pub fn with_policy(name: impl Into<String>, policy: ModelPolicy) -> Self {
        Self {
            id: ProcessId::next(),
            name: name.into(),
            next_index: 0,
            start_events: BTreeMap::new(),
            end_events: BTreeMap::new(),
            tasks: BTreeMap::new(),
            gateways: BTreeMap::new(),
            sequences: BTreeMap::new(),
            data_objects: BTreeMap::new(),
            policy,
            validity: Validity::Unknown,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn policy(&self) -> &ModelPolicy {
        &self.policy
    }

    /// The raw cache state, without computing anything.
    pub fn validity(&self) -> Validity {
        self.validity
    }

    // =========================================================================
    // Factories
    // =========================================================================

    /// Create a task and register it.
    pub fn new_task(&mut self, name: impl Into<String>) -> NodeId {
        self.insert_node(FlowObjectKind::Task { name: name.into() })
    }

    /// Create a start event and register it.
    pub fn new_start_event(&mut self) -> NodeId {
        self.insert_node(FlowObjectKind::StartEvent)
    }

    /// Create an end event and register it.
    pub fn new_end_event(&mut self) -> NodeId {
        self.insert_node(FlowObjectKind::EndEvent)
    }

    /// Create a gateway and register it.
    pub fn new_gateway(&mut self, kind: GatewayKind) -> NodeId {
        self.insert_node(FlowObjectKind::Gateway { kind })
    }

    /// Create a sequence from `source` to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalSequenceError`] if the sink is a start event, the
    /// source is an end event, either endpoint is foreign or unregistered, or
    /// the sequence policy rejects a self-loop or a parallel duplicate. The
    /// process is unchanged on error.
    pub fn new_sequence(
        &mut self,
        source: NodeId,
        sink: NodeId,
    ) -> Result<SequenceId, IllegalSequenceError> {
        self.validate_sequence(source, sink)?;
        let id = self.mint();
        self.link(Sequence::new(id, source, sink));
        self.invalidate();
        Ok(id)
    }

    /// Create a data object. Does not affect validity.
    pub fn new_data_object(
        &mut self,
        name: impl Into<String>,
        value: Option<String>,
    ) -> DataObjectId {
        let id = self.mint();
        self.data_objects
            .insert(id, DataObject::new(id, name.into(), value));
        id
    }

    /// Allocate the next handle index.
    ///
    /// # Panics
    ///
    /// Panics once the process has handed out every `u32` index. Reusing an
    /// index would alias a live component.
    fn mint<T>(&mut self) -> Handle<T> {
        let index = self.next_index;
        self.next_index = index
            .checked_add(1)
            .unwrap_or_else(|| panic!("process {} has exhausted its handle space", self.id));
        Handle::new(self.id, index)
    }

    fn insert_node(&mut self, kind: FlowObjectKind) -> NodeId {
        let id = self.mint();
        let node = FlowObject::new(id, kind);
        self.collection_mut(node.role()).insert(id, node);
        self.invalidate();
        id
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Register a detached component (for example one returned by
    /// [`remove_component`](Self::remove_component)).
    ///
    /// Registering a component that is already present leaves the collections
    /// unchanged. Nodes come back without edges; sequences are re-validated;
    /// data objects keep only attachments to tasks that are still registered.
    /// Flow-affecting variants invalidate the validity cache.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::ForeignComponent`] for a component minted by
    /// another process, or [`ProcessError::IllegalSequence`] if a sequence no
    /// longer satisfies the legality rules.
    pub fn register_component(&mut self, component: Component) -> Result<ComponentRef, ProcessError> {
        let reference = component.component_ref();
        self.ensure_owned(reference)?;

        if !self.contains(reference) {
            match component {
                Component::Node(mut node) => {
                    node.clear_edges();
                    self.collection_mut(node.role()).insert(node.id(), node);
                }
                Component::Sequence(sequence) => {
                    self.validate_sequence(sequence.source(), sequence.sink())?;
                    self.link(sequence);
                }
                Component::DataObject(mut data) => {
                    let tasks = &self.tasks;
                    data.retain_attachments(|task| tasks.contains_key(task));
                    self.data_objects.insert(data.id(), data);
                }
            }
        }

        if reference.affects_flow() {
            self.invalidate();
        }
        Ok(reference)
    }

    /// Remove a component and return it detached.
    ///
    /// Removing a node first removes every sequence whose source or sink is
    /// that node, and detaches it from data objects. Returns `None` (and
    /// changes nothing) if the component is not registered here.
    pub fn remove_component(&mut self, component: impl Into<ComponentRef>) -> Option<Component> {
        let reference = component.into();
        if !self.contains(reference) {
            return None;
        }

        let removed = match reference {
            ComponentRef::Node(id) => {
                let incident: Vec<SequenceId> = self
                    .sequences
                    .values()
                    .filter(|sequence| sequence.touches(id))
                    .map(Sequence::id)
                    .collect();
                for sequence in incident {
                    self.unlink(sequence);
                }
                for data in self.data_objects.values_mut() {
                    data.detach(id);
                }
                let role = self.role_of(id)?;
                self.collection_mut(role).remove(&id).map(Component::Node)
            }
            ComponentRef::Sequence(id) => self.unlink(id).map(Component::Sequence),
            ComponentRef::DataObject(id) => self.data_objects.remove(&id).map(Component::DataObject),
        };

        if reference.affects_flow() {
            self.invalidate();
        }
        removed
    }

    /// Whether the component is registered in this process.
    pub fn contains(&self, component: impl Into<ComponentRef>) -> bool {
        match component.into() {
            ComponentRef::Node(id) => self.node(id).is_some(),
            ComponentRef::Sequence(id) => self.sequences.contains_key(&id),
            ComponentRef::DataObject(id) => self.data_objects.contains_key(&id),
        }
    }

    /// Attach a data object to a task.
    ///
    /// Returns `false` if it was already attached.
    pub fn attach_data_object(
        &mut self,
        data: DataObjectId,
        task: NodeId,
    ) -> Result<bool, ProcessError> {
        self.ensure_owned(data.into())?;
        self.ensure_owned(task.into())?;
        let node = self
            .node(task)
            .ok_or(ProcessError::UnknownComponent(task.into()))?;
        if node.role() != Role::Task {
            return Err(ProcessError::NotATask {
                node: node.to_string(),
            });
        }
        let data_object = self
            .data_objects
            .get_mut(&data)
            .ok_or(ProcessError::UnknownComponent(data.into()))?;
        Ok(data_object.attach(task))
    }

    /// Detach a data object from a task.
    ///
    /// Returns `false` if it was not attached.
    pub fn detach_data_object(
        &mut self,
        data: DataObjectId,
        task: NodeId,
    ) -> Result<bool, ProcessError> {
        self.ensure_owned(data.into())?;
        self.ensure_owned(task.into())?;
        let data_object = self
            .data_objects
            .get_mut(&data)
            .ok_or(ProcessError::UnknownComponent(data.into()))?;
        Ok(data_object.detach(task))
    }

    /// Replace the value of a data object.
    pub fn set_data_object_value(
        &mut self,
        data: DataObjectId,
        value: Option<String>,
    ) -> Result<(), ProcessError> {
        self.ensure_owned(data.into())?;
        let data_object = self
            .data_objects
            .get_mut(&data)
            .ok_or(ProcessError::UnknownComponent(data.into()))?;
        data_object.set_value(value);
        Ok(())
    }

    fn ensure_owned(&self, component: ComponentRef) -> Result<(), ProcessError> {
        let owner = match component {
            ComponentRef::Node(id) => id.process(),
            ComponentRef::Sequence(id) => id.process(),
            ComponentRef::DataObject(id) => id.process(),
        };
        if owner != self.id {
            return Err(ProcessError::ForeignComponent {
                component,
                owner,
                process: self.id,
            });
        }
        Ok(())
    }

    fn validate_sequence(&self, source: NodeId, sink: NodeId) -> Result<(), IllegalSequenceError> {
        for endpoint in [source, sink] {
            if endpoint.process() != self.id {
                return Err(IllegalSequenceError::ForeignComponent {
                    node: endpoint,
                    expected: self.id,
                });
            }
        }
        let source_node = self
            .node(source)
            .ok_or(IllegalSequenceError::UnknownNode(source))?;
        let sink_node = self
            .node(sink)
            .ok_or(IllegalSequenceError::UnknownNode(sink))?;

        if !sink_node.role().can_be_sink() {
            return Err(IllegalSequenceError::StartEventAsSink {
                node: sink_node.to_string(),
            });
        }
        if !source_node.role().can_be_source() {
            return Err(IllegalSequenceError::EndEventAsSource {
                node: source_node.to_string(),
            });
        }

        if source == sink && !self.policy.sequences.allow_self_loops {
            return Err(IllegalSequenceError::SelfLoop {
                node: source_node.to_string(),
            });
        }
        if !self.policy.sequences.allow_parallel {
            let duplicate = source_node
                .outgoing()
                .iter()
                .filter_map(|id| self.sequences.get(id))
                .any(|existing| existing.sink() == sink);
            if duplicate {
                return Err(IllegalSequenceError::ParallelDuplicate {
                    from: source_node.to_string(),
                    to: sink_node.to_string(),
                });
            }
        }

        Ok(())
    }

    fn link(&mut self, sequence: Sequence) {
        let id = sequence.id();
        if let Some(source) = self.node_mut(sequence.source()) {
            source.attach_outgoing(id);
        }
        if let Some(sink) = self.node_mut(sequence.sink()) {
            sink.attach_incoming(id);
        }
        self.sequences.insert(id, sequence);
    }

    fn unlink(&mut self, id: SequenceId) -> Option<Sequence> {
        let sequence = self.sequences.remove(&id)?;
        for endpoint in [sequence.source(), sequence.sink()] {
            if let Some(node) = self.node_mut(endpoint) {
                node.detach(id);
            }
        }
        Some(sequence)
    }

    // =========================================================================
    // Validity
    // =========================================================================

    /// Run the full validity check and cache the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as an [`InvalidProcessError`].
    pub fn check(&mut self) -> Result<(), InvalidProcessError> {
        let outcome = verify::check_process(self);
        self.validity = if outcome.is_ok() {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        outcome
    }

    /// Cached validity, computing it with [`check`](Self::check) if unknown.
    ///
    /// Never fails: a violation is reported (and cached) as `false`.
    pub fn is_valid(&mut self) -> bool {
        match self.validity {
            Validity::Valid => true,
            Validity::Invalid => false,
            Validity::Unknown => self.check().is_ok(),
        }
    }

    /// What [`is_valid`](Self::is_valid) would return, without updating the
    /// cache. For readers that only hold a shared borrow.
    pub fn evaluate_validity(&self) -> bool {
        match self.validity {
            Validity::Valid => true,
            Validity::Invalid => false,
            Validity::Unknown => verify::check_process(self).is_ok(),
        }
    }

    fn invalidate(&mut self) {
        self.validity = match self.policy.invalidation {
            CacheInvalidation::Pessimistic => Validity::Invalid,
            CacheInvalidation::Reset => Validity::Unknown,
        };
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    fn collection(&self, role: Role) -> &BTreeMap<NodeId, FlowObject> {
        match role {
            Role::StartEvent => &self.start_events,
            Role::EndEvent => &self.end_events,
            Role::Task => &self.tasks,
            Role::Gateway => &self.gateways,
        }
    }

    fn collection_mut(&mut self, role: Role) -> &mut BTreeMap<NodeId, FlowObject> {
        match role {
            Role::StartEvent => &mut self.start_events,
            Role::EndEvent => &mut self.end_events,
            Role::Task => &mut self.tasks,
            Role::Gateway => &mut self.gateways,
        }
    }

    /// Role of a registered node.
    pub fn role_of(&self, id: NodeId) -> Option<Role> {
        if id.process() != self.id {
            return None;
        }
        Role::ALL
            .into_iter()
            .find(|role| self.collection(*role).contains_key(&id))
    }

    /// Look up a registered node.
    pub fn node(&self, id: NodeId) -> Option<&FlowObject> {
        let role = self.role_of(id)?;
        self.collection(role).get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut FlowObject> {
        let role = self.role_of(id)?;
        self.collection_mut(role).get_mut(&id)
    }

    pub fn sequence(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.get(&id)
    }

    pub fn data_object(&self, id: DataObjectId) -> Option<&DataObject> {
        self.data_objects.get(&id)
    }

    /// Nodes of one role, in creation order.
    pub fn nodes_with_role(&self, role: Role) -> impl Iterator<Item = &FlowObject> {
        self.collection(role).values()
    }

    /// Every node, grouped by role.
    pub fn flow_objects(&self) -> impl Iterator<Item = &FlowObject> {
        self.start_events
            .values()
            .chain(self.end_events.values())
            .chain(self.tasks.values())
            .chain(self.gateways.values())
    }

    pub fn start_events(&self) -> impl Iterator<Item = &FlowObject> {
        self.start_events.values()
    }

    pub fn end_events(&self) -> impl Iterator<Item = &FlowObject> {
        self.end_events.values()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &FlowObject> {
        self.tasks.values()
    }

    pub fn gateways(&self) -> impl Iterator<Item = &FlowObject> {
        self.gateways.values()
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn data_objects(&self) -> impl Iterator<Item = &DataObject> {
        self.data_objects.values()
    }

    /// Short human-readable summary, e.g. `3 activities, 1 gateway`.
    pub fn summary(&self) -> String {
        let tasks = self.tasks.len();
        let gateways = self.gateways.len();
        let activities = if tasks == 1 { "activity" } else { "activities" };
        match gateways {
            0 => format!("{tasks} {activities}, no gateways"),
            1 => format!("{tasks} {activities}, 1 gateway"),
            n => format!("{tasks} {activities}, {n} gateways"),
        }
    }

    /// Structural fingerprint of the graph.
    ///
    /// Nodes are rendered as role and label, edges by the rendering of their
    /// endpoints, and both sets are sorted before hashing. The value depends
    /// on neither the process id nor the order components were created in.
    pub fn fingerprint(&self) -> Fingerprint {
        fn render(node: &FlowObject) -> String {
            let label = match node.kind() {
                FlowObjectKind::Task { name } => name.clone(),
                FlowObjectKind::Gateway { kind } => kind.to_string(),
                FlowObjectKind::StartEvent | FlowObjectKind::EndEvent => String::new(),
            };
            format!("{}:{}", node.role().as_str(), label)
        }

        let mut node_lines: Vec<String> = self
            .flow_objects()
            .map(|node| format!("node {}", render(node)))
            .collect();
        node_lines.sort();

        let endpoint = |id: NodeId| self.node(id).map(render).unwrap_or_default();
        let mut edge_lines: Vec<String> = self
            .sequences
            .values()
            .map(|sequence| {
                format!(
                    "edge {} {}",
                    endpoint(sequence.source()),
                    endpoint(sequence.sink())
                )
            })
            .collect();
        edge_lines.sort();

        Fingerprint::compute(node_lines.into_iter().chain(edge_lines))
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Process '{}' ({})", self.name, self.summary())?;
        for role in Role::ALL {
            for node in self.collection(role).values() {
                writeln!(f, "  {node}")?;
            }
        }
        for sequence in self.sequences.values() {
            writeln!(f, "  {sequence}")?;
        }
        Ok(())
    }
}
