//! Audit data model
//!
//! Every value here is created fresh for one audit run and never mutated
//! once the package it describes has been checked.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Installed package and its declared version. Identity is the lowercase name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVersion {
    pub name: String,
    pub version: String,
}

impl PackageVersion {
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Normalised project name: lowercase, each run of `-`, `_` and `.`
/// collapsed to a single `-`. `Python3_Dateutil` and `python3-dateutil`
/// name the same project.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Descriptive fields from the package's own declared metadata.
/// Any field is empty when undeclared or unreadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub author_email: String,
    pub home_page: String,
    pub summary: String,
}

/// Which signature set produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Code,
    Path,
    Network,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::Code => write!(f, "code"),
            PatternKind::Path => write!(f, "path"),
            PatternKind::Network => write!(f, "network"),
        }
    }
}

/// One signature hit inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternMatch {
    pub kind: PatternKind,
    /// The signature that matched
    pub pattern: String,
    /// File-relative path; empty for whole-content scans
    pub location: String,
    /// 1-based; set for code patterns only
    pub line_number: Option<usize>,
    /// Literal matched text; set for network patterns only
    pub matched_text: Option<String>,
}

impl PatternMatch {
    /// Report-entry rendering.
    pub fn describe(&self) -> String {
        match self.kind {
            PatternKind::Code => match self.line_number {
                Some(line) => format!("{} (line {})", self.pattern, line),
                None => self.pattern.clone(),
            },
            PatternKind::Path => format!("Suspicious path pattern: {}", self.pattern),
            PatternKind::Network => format!(
                "Suspicious network: {}",
                self.matched_text.as_deref().unwrap_or(&self.pattern)
            ),
        }
    }
}

/// Provenance verdict. Always present; unsafe unless proven otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCheckResult {
    pub is_safe: bool,
    pub reason: String,
}

impl SourceCheckResult {
    pub fn safe(reason: impl Into<String>) -> Self {
        Self {
            is_safe: true,
            reason: reason.into(),
        }
    }

    pub fn unsafe_because(reason: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            reason: reason.into(),
        }
    }
}

impl Default for SourceCheckResult {
    /// The state of a package whose provenance was never checked.
    fn default() -> Self {
        Self::unsafe_because("")
    }
}

/// Scan findings: file path (root-relative, `/` separated) to match
/// descriptions. Iteration follows insertion order, which is scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuspiciousFiles {
    entries: Vec<(String, Vec<String>)>,
}

impl SuspiciousFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, path: String, matches: Vec<String>) {
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = matches,
            None => self.entries.push((path, matches)),
        }
    }

    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, m)| m.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(p, m)| (p.as_str(), m.as_slice()))
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.as_str()).collect()
    }
}

impl Serialize for SuspiciousFiles {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, matches) in &self.entries {
            map.serialize_entry(path, matches)?;
        }
        map.end()
    }
}

/// Everything learned about one installed package.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageAuditResult {
    pub name: String,
    pub version: String,
    pub is_known_malicious: bool,
    /// Deny-list reason when `is_known_malicious`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<String>,
    pub source_check: SourceCheckResult,
    pub suspicious_files: SuspiciousFiles,
    pub typosquatting_warnings: Vec<String>,
    pub metadata: PackageMetadata,
    /// Set when the per-package boundary caught a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_error: Option<String>,
}

impl PackageAuditResult {
    /// Fresh result with every check at its unchecked default.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    pub fn has_issues(&self) -> bool {
        self.is_known_malicious
            || !self.source_check.is_safe
            || !self.typosquatting_warnings.is_empty()
            || !self.suspicious_files.is_empty()
            || self.internal_error.is_some()
    }

    /// One line per reason this package was flagged.
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.is_known_malicious {
            match &self.deny_reason {
                Some(r) => reasons.push(format!("known malicious package ({})", r)),
                None => reasons.push("known malicious package".to_string()),
            }
            return reasons;
        }
        if let Some(err) = &self.internal_error {
            reasons.push(err.clone());
        }
        if !self.source_check.is_safe && !self.source_check.reason.is_empty() {
            reasons.push(format!("suspicious source: {}", self.source_check.reason));
        }
        reasons.extend(self.typosquatting_warnings.iter().cloned());
        if !self.suspicious_files.is_empty() {
            reasons.push(format!(
                "{} suspicious file(s)",
                self.suspicious_files.len()
            ));
        }
        reasons
    }
}

/// Run-level result.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRunSummary {
    /// Size of the inventory snapshot taken at run start
    pub total_checked: usize,
    /// Packages with at least one issue, in enumeration order
    pub flagged: Vec<PackageAuditResult>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl AuditRunSummary {
    pub fn flagged_names(&self) -> Vec<&str> {
        self.flagged.iter().map(|r| r.name.as_str()).collect()
    }
}
