//! generator::log
//!
//! Event logs produced by the trace generator.
//!
//! # Formats
//!
//! - **JSON**: the whole [`EventLog`] as one pretty-printed document
//! - **JSON Lines**: chosen when the destination ends in `.jsonl`. The first
//!   line is a [`LogHeader`], followed by one [`Trace`] per line.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::Fingerprint;

/// Errors from writing an event log.
#[derive(Debug, Error)]
pub enum LogWriteError {
    #[error("failed to write log file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize log: {0}")]
    SerializeError(String),
}

/// On-disk format of an event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    JsonLines,
}

impl LogFormat {
    /// Pick the format from a destination path's extension.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") => LogFormat::JsonLines,
            _ => LogFormat::Json,
        }
    }
}

/// How a trace ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// Every token was consumed by an end event.
    Complete,
    /// Stopped at the maximum trace length.
    Truncated,
    /// Tokens remained but no node could fire.
    Deadlocked,
}

/// One executed activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub activity: String,
    pub timestamp: DateTime<Utc>,
}

/// One simulated run of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub id: Uuid,
    pub outcome: TraceOutcome,
    pub events: Vec<Event>,
}

impl Trace {
    /// Activity names in execution order.
    pub fn activities(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.activity.as_str()).collect()
    }
}

/// Log metadata, also the first record of a JSON Lines log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHeader {
    /// Name of the simulated process
    pub process: String,
    /// Structural fingerprint of the simulated process
    pub fingerprint: Fingerprint,
    /// Seed that reproduces this log
    pub seed: u64,
}

/// A generated event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(flatten)]
    pub header: LogHeader,
    pub traces: Vec<Trace>,
}

impl EventLog {
    /// Number of traces with the given outcome.
    pub fn count(&self, outcome: TraceOutcome) -> usize {
        self.traces.iter().filter(|t| t.outcome == outcome).count()
    }

    /// Total number of events across all traces.
    pub fn event_count(&self) -> usize {
        self.traces.iter().map(|t| t.events.len()).sum()
    }

    /// Write the log to `path`, choosing the format from its extension.
    pub fn write(&self, path: &Path) -> Result<(), LogWriteError> {
        self.write_as(path, LogFormat::for_path(path))
    }

    /// Write the log to `path` in an explicit format.
    pub fn write_as(&self, path: &Path, format: LogFormat) -> Result<(), LogWriteError> {
        let write_error = |e| LogWriteError::WriteError {
            path: path.to_path_buf(),
            source: e,
        };

        let file = fs::File::create(path).map_err(write_error)?;
        let mut writer = BufWriter::new(file);

        match format {
            LogFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, self)
                    .map_err(|e| LogWriteError::SerializeError(e.to_string()))?;
                writeln!(writer).map_err(write_error)?;
            }
            LogFormat::JsonLines => {
                let mut lines = Vec::with_capacity(self.traces.len() + 1);
                lines.push(to_line(&self.header)?);
                for trace in &self.traces {
                    lines.push(to_line(trace)?);
                }
                for line in lines {
                    writeln!(writer, "{line}").map_err(write_error)?;
                }
            }
        }

        writer.flush().map_err(write_error)
    }
}

fn to_line<T: Serialize>(record: &T) -> Result<String, LogWriteError> {
    serde_json::to_string(record).map_err(|e| LogWriteError::SerializeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_log() -> EventLog {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        EventLog {
            header: LogHeader {
                process: "order".to_string(),
                fingerprint: Fingerprint::compute(["node task:Pay"]),
                seed: 7,
            },
            traces: vec![
                Trace {
                    id: Uuid::nil(),
                    outcome: TraceOutcome::Complete,
                    events: vec![Event {
                        activity: "Pay".to_string(),
                        timestamp: at,
                    }],
                },
                Trace {
                    id: Uuid::nil(),
                    outcome: TraceOutcome::Truncated,
                    events: vec![],
                },
            ],
        }
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(LogFormat::for_path(Path::new("out.jsonl")), LogFormat::JsonLines);
        assert_eq!(LogFormat::for_path(Path::new("out.json")), LogFormat::Json);
        assert_eq!(LogFormat::for_path(Path::new("out")), LogFormat::Json);
    }

    #[test]
    fn counts() {
        let log = sample_log();
        assert_eq!(log.count(TraceOutcome::Complete), 1);
        assert_eq!(log.count(TraceOutcome::Deadlocked), 0);
        assert_eq!(log.event_count(), 1);
        assert_eq!(log.traces[0].activities(), vec!["Pay"]);
    }

    #[test]
    fn write_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.json");
        sample_log().write(&path).unwrap();

        let parsed: EventLog =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, sample_log());
    }

    #[test]
    fn write_json_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.jsonl");
        sample_log().write(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);

        let header: LogHeader = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header.seed, 7);
        let trace: Trace = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(trace.outcome, TraceOutcome::Truncated);
    }

    #[test]
    fn unwritable_destination() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing-dir").join("log.json");
        assert!(matches!(
            sample_log().write(&path),
            Err(LogWriteError::WriteError { .. })
        ));
    }
}
