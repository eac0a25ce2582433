//! io
//!
//! Model import and export.
//!
//! # Contracts
//!
//! - [`ModelImporter`] builds a [`Process`] from a file. A failed import
//!   never yields a partially built process. The result is not guaranteed to
//!   be valid; callers run [`Process::check`] themselves.
//! - [`ModelExporter`] writes a process through its public accessors only.
//!
//! # Formats
//!
//! - [`document`] - JSON process documents ([`JsonModelFormat`])

pub mod document;

pub use document::{JsonModelFormat, ProcessDocument};

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::process::{IllegalSequenceError, Process, ProcessError};

/// Errors from importing a model.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read model file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed process document: {0}")]
    Malformed(String),

    #[error("invalid kind '{found}', expected '{expected}'")]
    InvalidKind { found: String, expected: &'static str },

    #[error("unsupported schema version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("duplicate element id '{0}'")]
    DuplicateId(String),

    #[error("sequence refers to unknown element '{0}'")]
    UnknownElement(String),

    #[error("illegal sequence '{from}' -> '{to}': {source}")]
    IllegalSequence {
        from: String,
        to: String,
        source: IllegalSequenceError,
    },

    #[error("data object '{name}': {source}")]
    DataObject { name: String, source: ProcessError },
}

/// Errors from exporting a model.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write model file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize process: {0}")]
    SerializeError(String),
}

/// Builds a process from a model file.
pub trait ModelImporter {
    /// Import the model stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the file cannot be read or does not describe
    /// a constructible process.
    fn import_model(&self, path: &Path) -> Result<Process, ImportError>;
}

/// Writes a process to a model file.
pub trait ModelExporter {
    /// Export `process` to `path`, replacing any existing file.
    fn export_model(&self, process: &Process, path: &Path) -> Result<(), ExportError>;
}
