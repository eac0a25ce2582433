//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ProcessId`] - Identity of one [`Process`](super::process::Process) instance
//! - [`Handle`] - Typed, copyable reference into a process's owned collections
//!   ([`NodeId`], [`SequenceId`], [`DataObjectId`])
//! - [`Role`] - The closed set of flow object variants
//! - [`GatewayKind`] - Split/join semantics of a gateway
//! - [`Fingerprint`] - Structural hash of a process graph
//!
//! # Ownership
//!
//! Handles are non-owning. They carry the id of the process that minted them,
//! so a handle presented to a different process is detected and rejected
//! instead of silently aliasing an unrelated entity.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown flow object role: {0}")]
    UnknownRole(String),

    #[error("unknown gateway kind: {0}")]
    UnknownGatewayKind(String),
}

static NEXT_PROCESS_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a process instance.
///
/// Allocated from a global counter; two processes created in the same program
/// run never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl ProcessId {
    pub(crate) fn next() -> Self {
        Self(NEXT_PROCESS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A typed reference to an entity owned by a process.
///
/// The type parameter only distinguishes flow objects, sequences, and data
/// objects at compile time; all three share the per-process index space.
pub struct Handle<T> {
    process: ProcessId,
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(process: ProcessId, index: u32) -> Self {
        Self {
            process,
            index,
            _marker: PhantomData,
        }
    }

    /// The process that owns the referenced entity.
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// Index of the entity, unique within its process.
    pub fn index(&self) -> u32 {
        self.index
    }
}

// Manual impls: derives would add `T: Trait` bounds on the marker type.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.process == other.process && self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.process.hash(state);
        self.index.hash(state);
    }
}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.process
            .cmp(&other.process)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.process)
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeTag {}
pub type NodeId = Handle<NodeTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SequenceTag {}
pub type SequenceId = Handle<SequenceTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataObjectTag {}
pub type DataObjectId = Handle<DataObjectTag>;

/// The closed set of flow object variants.
///
/// Every per-variant decision in the registry goes through a `match` on this
/// enum, so adding a variant is a compile error until each site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    StartEvent,
    EndEvent,
    Task,
    Gateway,
}

impl Role {
    /// All roles, in the order the validity engine visits them.
    pub const ALL: [Role; 4] = [Role::StartEvent, Role::EndEvent, Role::Task, Role::Gateway];

    /// Whether a node of this role may be the source of a sequence.
    pub fn can_be_source(&self) -> bool {
        !matches!(self, Role::EndEvent)
    }

    /// Whether a node of this role may be the sink of a sequence.
    pub fn can_be_sink(&self) -> bool {
        !matches!(self, Role::StartEvent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::StartEvent => "start_event",
            Role::EndEvent => "end_event",
            Role::Task => "task",
            Role::Gateway => "gateway",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::StartEvent => "start event",
            Role::EndEvent => "end event",
            Role::Task => "task",
            Role::Gateway => "gateway",
        };
        f.write_str(label)
    }
}

impl FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| TypeError::UnknownRole(s.to_string()))
    }
}

/// Split/join semantics of a gateway.
///
/// The core treats every gateway alike; the kind only matters to trace
/// generators, which own the branching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Exactly one branch is taken.
    #[default]
    #[serde(alias = "xor")]
    Exclusive,
    /// All branches are taken; a join waits for every incoming branch.
    #[serde(alias = "and")]
    Parallel,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Exclusive => "exclusive",
            GatewayKind::Parallel => "parallel",
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exclusive" | "xor" => Ok(GatewayKind::Exclusive),
            "parallel" | "and" => Ok(GatewayKind::Parallel),
            other => Err(TypeError::UnknownGatewayKind(other.to_string())),
        }
    }
}

/// Structural fingerprint of a process graph.
///
/// Computed over node roles and labels and over edges named by their
/// endpoints, each set sorted. Handle indices and construction order do not
/// contribute, so a model keeps its fingerprint across export and import.
/// Used to tie a generated event log back to the model it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint from pre-rendered structural lines.
    ///
    /// Lines are hashed in the order given; callers are responsible for a
    /// stable ordering.
    pub fn compute<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for line in lines {
            hasher.update(line.as_ref().as_bytes());
            hasher.update(b"\n");
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_ids_are_unique() {
        let a = ProcessId::next();
        let b = ProcessId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn handles_from_different_processes_differ() {
        let a: NodeId = Handle::new(ProcessId::next(), 0);
        let b: NodeId = Handle::new(ProcessId::next(), 0);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
    }

    #[test]
    fn role_capabilities() {
        assert!(Role::StartEvent.can_be_source());
        assert!(!Role::StartEvent.can_be_sink());
        assert!(!Role::EndEvent.can_be_source());
        assert!(Role::EndEvent.can_be_sink());
        assert!(Role::Task.can_be_source() && Role::Task.can_be_sink());
        assert!(Role::Gateway.can_be_source() && Role::Gateway.can_be_sink());
    }

    #[test]
    fn role_parses_its_own_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "activity".parse::<Role>(),
            Err(TypeError::UnknownRole("activity".into()))
        );
    }

    #[test]
    fn gateway_kind_accepts_aliases() {
        assert_eq!("xor".parse::<GatewayKind>(), Ok(GatewayKind::Exclusive));
        assert_eq!("and".parse::<GatewayKind>(), Ok(GatewayKind::Parallel));
        assert!("inclusive".parse::<GatewayKind>().is_err());
    }

    #[test]
    fn fingerprint_deterministic_and_order_sensitive() {
        let a = Fingerprint::compute(["task:a", "task:b"]);
        let b = Fingerprint::compute(["task:a", "task:b"]);
        let c = Fingerprint::compute(["task:b", "task:a"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }
}
