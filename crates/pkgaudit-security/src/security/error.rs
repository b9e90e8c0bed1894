//! Error taxonomy for the audit pipeline.
//!
//! Everything except [`AuditError::LogSink`] is contained at file, package or
//! run scope and turned into a degraded result plus a log line.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Installed packages could not be listed at all.
    #[error("cannot enumerate installed packages: {0}")]
    EnvironmentEnumeration(String),

    /// Location or metadata of one package could not be resolved.
    #[error("lookup failed for '{name}': {reason}")]
    Lookup { name: String, reason: String },

    /// A single file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ScanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command '{command}' timed out after {timeout_secs}s")]
    CommandTimeout { command: String, timeout_secs: u64 },

    #[error("command '{command}' failed to run: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("malformed output from '{command}': {reason}")]
    MalformedOutput { command: String, reason: String },

    #[error("invalid pattern configuration: {0}")]
    Config(String),

    /// The audit log cannot be opened or written. Fatal at startup.
    #[error("cannot write audit log {}: {source}", path.display())]
    LogSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
