/// Audit Logging
///
/// Each successful tool invocation leaves a plain-text record of what was
/// sent and what came back. Recording is best effort: the tool handler only
/// warns when a sink fails.
///
/// The handler holds an [`AuditSink`] rather than touching the filesystem
/// directly, so tests can swap in an in-memory or failing sink.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat};
use serde_json::Value;
use thiserror::Error;

/// One request/response pair, written once and never read back.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub operation: String,
    pub timestamp: DateTime<Local>,
    pub request: Value,
    pub response: Value,
}

impl AuditRecord {
    pub fn new(operation: impl Into<String>, request: Value, response: Value) -> Self {
        Self {
            operation: operation.into(),
            timestamp: Local::now(),
            request,
            response,
        }
    }

    /// `YYYYMMDD-HHMMSS.log`. Records within the same second share a name.
    pub fn file_name(&self) -> String {
        format!("{}.log", self.timestamp.format("%Y%m%d-%H%M%S"))
    }

    /// Header, then the `REQUEST:` and `RESPONSE:` sections as pretty JSON.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== {} OPERATION [{}] ===\n",
            self.operation,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
        );

        out.push_str("REQUEST:\n");
        match serde_json::to_string_pretty(&self.request) {
            Ok(json) => {
                let _ = writeln!(out, "{json}\n");
            }
            Err(e) => {
                let _ = writeln!(out, "Error marshaling request: {e}");
            }
        }

        out.push_str("RESPONSE:\n");
        match serde_json::to_string_pretty(&self.response) {
            Ok(json) => {
                let _ = writeln!(out, "{json}");
            }
            Err(e) => {
                let _ = writeln!(out, "Error marshaling response: {e}");
            }
        }
        out
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to create logs directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to create log file {path}: {source}")]
    CreateFile { path: PathBuf, source: io::Error },

    #[error("failed to write log file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Persist `record`, returning where it was written.
    fn record(&self, record: &AuditRecord) -> Result<PathBuf, AuditError>;
}

/// Writes one file per record under a directory, creating it on demand.
///
/// Same-second collisions overwrite the earlier file.
#[derive(Debug, Clone)]
pub struct FileAuditSink {
    dir: PathBuf,
}

impl FileAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), AuditError> {
        fs::create_dir_all(&self.dir).map_err(|source| AuditError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<PathBuf, AuditError> {
        self.ensure_dir()?;

        let path = self.dir.join(record.file_name());
        let mut file = fs::File::create(&path).map_err(|source| AuditError::CreateFile {
            path: path.clone(),
            source,
        })?;
        file.write_all(record.render().as_bytes())
            .map_err(|source| AuditError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}
