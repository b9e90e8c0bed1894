//! Append-only, human-readable audit log.
//!
//! Each appended message becomes one line prefixed with a bracketed local
//! timestamp, `[YYYY-MM-DD HH:MM:SS]`. Multi-line messages are written as
//! one line per message line, all sharing the same timestamp. The file is
//! never read back.

use crate::security::error::{AuditError, AuditResult};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write-only sink shared by every package check in a run.
pub trait AuditLog: Send + Sync {
    fn append(&self, message: &str);
}

/// Prefix every line of `message` with `[timestamp]`.
pub fn format_log_lines(timestamp: &str, message: &str) -> String {
    let mut out = String::new();
    for line in message.split('\n') {
        out.push_str(&format!("[{}] {}\n", timestamp, line));
    }
    out
}

fn now_stamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// File-backed sink. Writes are serialised through a mutex so concurrent
/// package workers never interleave partial lines.
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
    echo: bool,
}

impl FileAuditLog {
    /// Open (or create) the log in append mode. Failure here is the one
    /// fatal startup error of an audit run.
    pub fn open(path: &Path) -> AuditResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::LogSink {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| AuditError::LogSink {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            echo: false,
        })
    }

    /// Also print every line to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, message: &str) {
        let lines = format_log_lines(&now_stamp(), message);
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = file.write_all(lines.as_bytes()) {
            tracing::error!("Failed to write audit log {}: {}", self.path.display(), e);
        }
        if self.echo {
            print!("{}", lines);
        }
    }
}

/// In-memory sink for tests and embedding.
#[derive(Default)]
pub struct MemoryAuditLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured lines, timestamp prefix included.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Captured lines with the `[timestamp] ` prefix stripped.
    pub fn messages(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .map(|l| match l.find("] ") {
                Some(idx) if l.starts_with('[') => l[idx + 2..].to_string(),
                _ => l,
            })
            .collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, message: &str) {
        let stamp = now_stamp();
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for line in format_log_lines(&stamp, message).lines() {
            lines.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_line_prefix_format() {
        let out = format_log_lines("2024-01-02 03:04:05", "hello\nworld");
        assert_eq!(
            out,
            "[2024-01-02 03:04:05] hello\n[2024-01-02 03:04:05] world\n"
        );
    }

    #[test]
    fn test_file_log_appends_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.log");

        FileAuditLog::open(&path).unwrap().append("first");
        FileAuditLog::open(&path).unwrap().append("second");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let re = Regex::new(r"^\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] ").unwrap();
        assert!(re.is_match(lines[0]));
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let err = FileAuditLog::open(&blocker.join("audit.log")).err().unwrap();
        assert!(matches!(err, AuditError::LogSink { .. }));
    }

    #[test]
    fn test_memory_log_concurrent_writers() {
        let log = std::sync::Arc::new(MemoryAuditLog::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        log.append(&format!("worker {} line {}", i, j));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let messages = log.messages();
        assert_eq!(messages.len(), 100);
        assert!(messages.iter().all(|m| m.starts_with("worker ")));
    }
}
