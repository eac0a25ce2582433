//! io::document
//!
//! JSON process documents.
//!
//! # Schema Design
//!
//! A document is:
//! - Self-describing with `kind` and `schema_version`
//! - Keyed by document-local string ids, so sequences and data objects refer
//!   to nodes without exposing process handles
//! - Strictly parsed (unknown fields rejected)
//!
//! # Example
//!
//! ```
//! use procflow::io::document::{parse_document, DOCUMENT_KIND};
//!
//! let json = r#"{
//!     "kind": "procflow.process",
//!     "schema_version": 1,
//!     "name": "order",
//!     "start_events": ["start"],
//!     "end_events": ["end"],
//!     "tasks": [{ "id": "pay", "name": "Pay" }],
//!     "sequences": [
//!         { "source": "start", "sink": "pay" },
//!         { "source": "pay", "sink": "end" }
//!     ]
//! }"#;
//!
//! let document = parse_document(json).unwrap();
//! assert_eq!(document.kind, DOCUMENT_KIND);
//!
//! let mut process = document.build(Default::default()).unwrap();
//! assert!(process.check().is_ok());
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ExportError, ImportError, ModelExporter, ModelImporter};
use crate::core::process::{ModelPolicy, Process};
use crate::core::types::{GatewayKind, NodeId};

/// The kind identifier for process documents.
pub const DOCUMENT_KIND: &str = "procflow.process";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    kind: String,
    schema_version: u32,
}

/// A process document (v1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessDocument {
    /// Always [`DOCUMENT_KIND`]
    pub kind: String,
    /// Always [`SCHEMA_VERSION`]
    pub schema_version: u32,
    pub name: String,
    #[serde(default)]
    pub start_events: Vec<String>,
    #[serde(default)]
    pub end_events: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
    #[serde(default)]
    pub gateways: Vec<GatewayEntry>,
    #[serde(default)]
    pub sequences: Vec<SequenceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_objects: Vec<DataObjectEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayEntry {
    pub id: String,
    #[serde(default)]
    pub kind: GatewayKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceEntry {
    pub source: String,
    pub sink: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataObjectEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Ids of the tasks this data object is attached to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attached_to: Vec<String>,
}

/// Parse a document with version dispatch.
///
/// # Errors
///
/// - [`ImportError::Malformed`] if the JSON does not match the schema
/// - [`ImportError::InvalidKind`] if `kind` is not [`DOCUMENT_KIND`]
/// - [`ImportError::UnsupportedVersion`] for any other schema version
pub fn parse_document(json: &str) -> Result<ProcessDocument, ImportError> {
    let envelope: DocumentEnvelope =
        serde_json::from_str(json).map_err(|e| ImportError::Malformed(e.to_string()))?;

    if envelope.kind != DOCUMENT_KIND {
        return Err(ImportError::InvalidKind {
            found: envelope.kind,
            expected: DOCUMENT_KIND,
        });
    }
    if envelope.schema_version != SCHEMA_VERSION {
        return Err(ImportError::UnsupportedVersion {
            found: envelope.schema_version,
            supported: SCHEMA_VERSION,
        });
    }

    serde_json::from_str(json).map_err(|e| ImportError::Malformed(e.to_string()))
}

impl ProcessDocument {
    /// Describe an existing process.
    ///
    /// Element ids are derived from each node's role and handle index, so
    /// they are unique within the document.
    pub fn from_process(process: &Process) -> Self {
        let label = |id: NodeId| -> String {
            process
                .role_of(id)
                .map(|role| format!("{}_{}", role.as_str(), id.index()))
                .unwrap_or_else(|| format!("node_{}", id.index()))
        };

        Self {
            kind: DOCUMENT_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            name: process.name().to_string(),
            start_events: process.start_events().map(|n| label(n.id())).collect(),
            end_events: process.end_events().map(|n| label(n.id())).collect(),
            tasks: process
                .tasks()
                .map(|n| TaskEntry {
                    id: label(n.id()),
                    name: n.name().unwrap_or_default().to_string(),
                })
                .collect(),
            gateways: process
                .gateways()
                .map(|n| GatewayEntry {
                    id: label(n.id()),
                    kind: n.gateway_kind().unwrap_or_default(),
                })
                .collect(),
            sequences: process
                .sequences()
                .map(|s| SequenceEntry {
                    source: label(s.source()),
                    sink: label(s.sink()),
                })
                .collect(),
            data_objects: process
                .data_objects()
                .map(|d| DataObjectEntry {
                    name: d.name().to_string(),
                    value: d.value().map(str::to_string),
                    attached_to: d.attached_to().iter().map(|id| label(*id)).collect(),
                })
                .collect(),
        }
    }

    /// Build a process from this document.
    ///
    /// Nodes are created in document order: start events, end events, tasks,
    /// gateways. The process is returned only if every element was accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] for duplicate or unknown element ids, illegal
    /// sequences, and data objects attached to anything but a task.
    pub fn build(&self, policy: ModelPolicy) -> Result<Process, ImportError> {
        let mut process = Process::with_policy(self.name.clone(), policy);
        let mut ids: HashMap<&str, NodeId> = HashMap::new();

        for key in &self.start_events {
            let id = process.new_start_event();
            claim(&mut ids, key, id)?;
        }
        for key in &self.end_events {
            let id = process.new_end_event();
            claim(&mut ids, key, id)?;
        }
        for task in &self.tasks {
            let id = process.new_task(task.name.clone());
            claim(&mut ids, &task.id, id)?;
        }
        for gateway in &self.gateways {
            let id = process.new_gateway(gateway.kind);
            claim(&mut ids, &gateway.id, id)?;
        }

        let lookup = |key: &str| {
            ids.get(key)
                .copied()
                .ok_or_else(|| ImportError::UnknownElement(key.to_string()))
        };

        for sequence in &self.sequences {
            let source = lookup(&sequence.source)?;
            let sink = lookup(&sequence.sink)?;
            process
                .new_sequence(source, sink)
                .map_err(|e| ImportError::IllegalSequence {
                    from: sequence.source.clone(),
                    to: sequence.sink.clone(),
                    source: e,
                })?;
        }

        for entry in &self.data_objects {
            let data = process.new_data_object(entry.name.clone(), entry.value.clone());
            for key in &entry.attached_to {
                let task = lookup(key)?;
                process
                    .attach_data_object(data, task)
                    .map_err(|e| ImportError::DataObject {
                        name: entry.name.clone(),
                        source: e,
                    })?;
            }
        }

        Ok(process)
    }
}

fn claim<'a>(
    ids: &mut HashMap<&'a str, NodeId>,
    key: &'a str,
    id: NodeId,
) -> Result<(), ImportError> {
    if ids.insert(key, id).is_some() {
        return Err(ImportError::DuplicateId(key.to_string()));
    }
    Ok(())
}

/// Reads and writes [`ProcessDocument`] files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelFormat {
    /// Policy given to imported processes
    pub policy: ModelPolicy,
}

impl JsonModelFormat {
    pub fn new(policy: ModelPolicy) -> Self {
        Self { policy }
    }
}

impl ModelImporter for JsonModelFormat {
    fn import_model(&self, path: &Path) -> Result<Process, ImportError> {
        let contents = fs::read_to_string(path).map_err(|e| ImportError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        parse_document(&contents)?.build(self.policy)
    }
}

impl ModelExporter for JsonModelFormat {
    fn export_model(&self, process: &Process, path: &Path) -> Result<(), ExportError> {
        let document = ProcessDocument::from_process(process);
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| ExportError::SerializeError(e.to_string()))?;
        fs::write(path, json).map_err(|e| ExportError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process::SequencePolicy;
    use crate::core::verify::InvalidProcessError;
    use tempfile::TempDir;

    fn order_json() -> String {
        serde_json::json!({
            "kind": DOCUMENT_KIND,
            "schema_version": SCHEMA_VERSION,
            "name": "order",
            "start_events": ["start"],
            "end_events": ["end"],
            "tasks": [
                { "id": "check", "name": "Check stock" },
                { "id": "ship", "name": "Ship" }
            ],
            "gateways": [{ "id": "xor", "kind": "exclusive" }],
            "sequences": [
                { "source": "start", "sink": "check" },
                { "source": "check", "sink": "xor" },
                { "source": "xor", "sink": "ship" },
                { "source": "xor", "sink": "end" },
                { "source": "ship", "sink": "end" }
            ],
            "data_objects": [
                { "name": "invoice", "value": "INV-1", "attached_to": ["ship"] }
            ]
        })
        .to_string()
    }

    #[test]
    fn build_valid_document() {
        let mut process = parse_document(&order_json())
            .unwrap()
            .build(ModelPolicy::default())
            .unwrap();

        assert_eq!(process.name(), "order");
        assert_eq!(process.tasks().count(), 2);
        assert_eq!(process.gateways().count(), 1);
        assert_eq!(process.sequences().count(), 5);
        assert_eq!(process.data_objects().count(), 1);
        assert_eq!(process.check(), Ok(()));
    }

    #[test]
    fn wrong_kind_rejected() {
        let json = order_json().replace(DOCUMENT_KIND, "bpmn.definitions");
        assert!(matches!(
            parse_document(&json),
            Err(ImportError::InvalidKind { .. })
        ));
    }

    #[test]
    fn future_version_rejected() {
        let json = serde_json::json!({
            "kind": DOCUMENT_KIND,
            "schema_version": 2,
            "name": "later"
        })
        .to_string();
        assert!(matches!(
            parse_document(&json),
            Err(ImportError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn unknown_fields_rejected() {
        let json = serde_json::json!({
            "kind": DOCUMENT_KIND,
            "schema_version": SCHEMA_VERSION,
            "name": "x",
            "lanes": []
        })
        .to_string();
        assert!(matches!(parse_document(&json), Err(ImportError::Malformed(_))));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let document = ProcessDocument {
            start_events: vec!["a".into()],
            end_events: vec!["a".into()],
            ..parse_document(&order_json()).unwrap()
        };
        assert!(matches!(
            document.build(ModelPolicy::default()),
            Err(ImportError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn unknown_sequence_endpoint_rejected() {
        let mut document = parse_document(&order_json()).unwrap();
        document.sequences.push(SequenceEntry {
            source: "ship".into(),
            sink: "nowhere".into(),
        });
        assert!(matches!(
            document.build(ModelPolicy::default()),
            Err(ImportError::UnknownElement(id)) if id == "nowhere"
        ));
    }

    #[test]
    fn illegal_sequence_rejected() {
        let mut document = parse_document(&order_json()).unwrap();
        document.sequences.push(SequenceEntry {
            source: "end".into(),
            sink: "ship".into(),
        });
        let err = document.build(ModelPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("'end' -> 'ship'"));
    }

    #[test]
    fn policy_applies_to_imported_sequences() {
        let mut document = parse_document(&order_json()).unwrap();
        document.sequences.push(SequenceEntry {
            source: "ship".into(),
            sink: "end".into(),
        });
        assert!(document.build(ModelPolicy::default()).is_ok());

        let strict = ModelPolicy {
            sequences: SequencePolicy {
                allow_self_loops: true,
                allow_parallel: false,
            },
            ..Default::default()
        };
        assert!(matches!(
            document.build(strict),
            Err(ImportError::IllegalSequence { .. })
        ));
    }

    #[test]
    fn data_object_on_gateway_rejected() {
        let mut document = parse_document(&order_json()).unwrap();
        document.data_objects[0].attached_to = vec!["xor".into()];
        assert!(matches!(
            document.build(ModelPolicy::default()),
            Err(ImportError::DataObject { .. })
        ));
    }

    #[test]
    fn invalid_model_still_imports() {
        let json = serde_json::json!({
            "kind": DOCUMENT_KIND,
            "schema_version": SCHEMA_VERSION,
            "name": "half",
            "start_events": ["s"]
        })
        .to_string();
        let mut process = parse_document(&json)
            .unwrap()
            .build(ModelPolicy::default())
            .unwrap();
        assert_eq!(process.check(), Err(InvalidProcessError::NoEndEvent));
    }

    #[test]
    fn export_then_import_preserves_structure() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("order.json");
        let format = JsonModelFormat::default();

        let mut original = format
            .import_model(&{
                let source = temp.path().join("source.json");
                fs::write(&source, order_json()).unwrap();
                source
            })
            .unwrap();
        format.export_model(&original, &path).unwrap();
        let mut reloaded = format.import_model(&path).unwrap();

        assert_eq!(reloaded.name(), original.name());
        assert_eq!(reloaded.tasks().count(), original.tasks().count());
        assert_eq!(reloaded.sequences().count(), original.sequences().count());
        let names: Vec<_> = reloaded.tasks().filter_map(|t| t.name()).collect();
        assert_eq!(names, vec!["Check stock", "Ship"]);
        assert_eq!(reloaded.check().is_ok(), original.check().is_ok());
        assert!(reloaded.is_valid());
        assert_eq!(
            reloaded.data_objects().next().and_then(|d| d.value()),
            Some("INV-1")
        );
    }

    #[test]
    fn gateway_kind_aliases_import() {
        let json = serde_json::json!({
            "kind": DOCUMENT_KIND,
            "schema_version": SCHEMA_VERSION,
            "name": "aliases",
            "gateways": [
                { "id": "split", "kind": "and" },
                { "id": "choice", "kind": "xor" }
            ]
        })
        .to_string();
        let document = parse_document(&json).unwrap();
        assert_eq!(document.gateways[0].kind, GatewayKind::Parallel);
        assert_eq!(document.gateways[1].kind, GatewayKind::Exclusive);

        let process = document.build(ModelPolicy::default()).unwrap();
        let mut kinds: Vec<_> = process
            .gateways()
            .filter_map(|g| g.gateway_kind())
            .collect();
        kinds.sort_by_key(|kind| kind.as_str());
        assert_eq!(kinds, vec![GatewayKind::Exclusive, GatewayKind::Parallel]);

        // Export writes the canonical names.
        let exported = serde_json::to_string(&ProcessDocument::from_process(&process)).unwrap();
        assert!(exported.contains("\"parallel\""));
        assert!(!exported.contains("\"and\""));
    }

    #[test]
    fn fingerprint_survives_export_and_import() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("interleaved.json");
        let format = JsonModelFormat::default();

        // Built in an order the importer does not reproduce.
        let mut original = Process::new("interleaved");
        let ship = original.new_task("Ship");
        let gateway = original.new_gateway(GatewayKind::Exclusive);
        let end = original.new_end_event();
        let check = original.new_task("Check stock");
        let start = original.new_start_event();
        original.new_sequence(gateway, ship).unwrap();
        original.new_sequence(ship, end).unwrap();
        original.new_sequence(start, check).unwrap();
        original.new_sequence(gateway, end).unwrap();
        original.new_sequence(check, gateway).unwrap();

        format.export_model(&original, &path).unwrap();
        let reloaded = format.import_model(&path).unwrap();
        assert_eq!(reloaded.fingerprint(), original.fingerprint());

        original.new_task("Invoice");
        assert_ne!(reloaded.fingerprint(), original.fingerprint());
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let result = JsonModelFormat::default().import_model(&temp.path().join("absent.json"));
        assert!(matches!(result, Err(ImportError::ReadError { .. })));
    }
}
