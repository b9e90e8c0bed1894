//! Package-manager queries.
//!
//! The provenance checker asks an external package manager where a package
//! is installed and whether it appears in the manager's own listing. The
//! query side is a trait so tests can substitute canned data; `PipClient`
//! is the production implementation and shells out to `python -m pip`.
//!
//! A non-zero exit status means "not found" and is never an error. Spawn
//! failures, timeouts and unparsable output are errors.

use super::error::{AuditError, AuditResult};
use super::types::PackageVersion;
use crate::common::{describe_command, run_with_timeout};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Fields reported by `pip show`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageShow {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub home_page: String,
    pub author: String,
    pub author_email: String,
    pub location: Option<String>,
}

pub trait PackageManagerClient: Send + Sync {
    /// Installed details for one package; `Ok(None)` when not found.
    fn show(&self, name: &str) -> AuditResult<Option<PackageShow>>;

    /// Every installed `{name, version}` pair; empty when the manager
    /// reports failure.
    fn list(&self) -> AuditResult<Vec<PackageVersion>>;
}

/// `pip` driven through an interpreter, every call bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct PipClient {
    python: PathBuf,
    timeout: Duration,
}

impl PipClient {
    pub fn new(python: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            python: python.into(),
            timeout,
        }
    }

    pub fn python(&self) -> &PathBuf {
        &self.python
    }

    fn pip(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "pip"])
            .args(args)
            .env("PIP_DISABLE_PIP_VERSION_CHECK", "1")
            .env("PYTHONIOENCODING", "utf-8");
        cmd
    }
}

impl PackageManagerClient for PipClient {
    fn show(&self, name: &str) -> AuditResult<Option<PackageShow>> {
        let mut cmd = self.pip(&["show", name]);
        let output = run_with_timeout(&mut cmd, self.timeout)?;
        if !output.success() {
            tracing::debug!(
                "pip show {} exited with {}: {}",
                name,
                output.exit_code,
                output.stderr.trim()
            );
            return Ok(None);
        }
        Ok(parse_pip_show(&output.stdout))
    }

    fn list(&self) -> AuditResult<Vec<PackageVersion>> {
        let mut cmd = self.pip(&["list", "--format=json"]);
        let command = describe_command(&cmd);
        let output = run_with_timeout(&mut cmd, self.timeout)?;
        if !output.success() {
            tracing::warn!(
                "'{}' exited with {}: {}",
                command,
                output.exit_code,
                output.stderr.trim()
            );
            return Ok(Vec::new());
        }
        parse_pip_list_json(&output.stdout).map_err(|reason| AuditError::MalformedOutput {
            command,
            reason,
        })
    }
}

/// Parse `pip show` output. Returns `None` when no `Name:` line is present.
///
/// Only the first record is read; `pip show a b` separates records with
/// `---`.
pub fn parse_pip_show(stdout: &str) -> Option<PackageShow> {
    let mut show = PackageShow::default();
    for line in stdout.lines() {
        if line.trim() == "---" {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "Name" => show.name = value,
            "Version" => show.version = value,
            "Summary" => show.summary = value,
            "Home-page" => show.home_page = value,
            "Author" => show.author = value,
            "Author-email" => show.author_email = value,
            "Location" if !value.is_empty() => show.location = Some(value),
            _ => {}
        }
    }
    if show.name.is_empty() {
        None
    } else {
        Some(show)
    }
}

#[derive(Deserialize)]
struct PipListEntry {
    name: String,
    #[serde(default)]
    version: String,
}

/// Parse `pip list --format=json` output.
pub fn parse_pip_list_json(stdout: &str) -> Result<Vec<PackageVersion>, String> {
    let entries: Vec<PipListEntry> =
        serde_json::from_str(stdout.trim()).map_err(|e| e.to_string())?;
    Ok(entries
        .into_iter()
        .map(|e| PackageVersion {
            name: e.name,
            version: e.version,
        })
        .collect())
}
