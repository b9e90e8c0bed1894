//! Audit orchestrator
//!
//! Drives the per-package pipeline (deny-list, provenance, metadata,
//! typosquatting, content scan), writes findings to the audit log and
//! collects the run summary.
//!
//! Every package is checked inside its own failure boundary: a panic in
//! one package's checks flags that package with an internal error and the
//! run moves on.

use super::inventory::EnvironmentInventory;
use super::malicious_packages::DenyList;
use super::package_manager::PackageManagerClient;
use super::provenance::ProvenanceChecker;
use super::report::format_summary;
use super::rules::PatternRegistry;
use super::scanner::ContentScanner;
use super::typosquat::TyposquatDetector;
use super::types::{AuditRunSummary, PackageAuditResult};
use crate::log::AuditLog;
use chrono::Local;
use rayon::prelude::*;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Reason recorded on a package whose checks failed unexpectedly.
pub const INTERNAL_CHECK_ERROR: &str = "internal check error";

/// Descriptions logged per suspicious file; the result keeps all of them.
pub const MAX_LOGGED_MATCHES_PER_FILE: usize = 3;

pub struct Auditor {
    deny_list: DenyList,
    inventory: Arc<EnvironmentInventory>,
    provenance: ProvenanceChecker,
    scanner: ContentScanner,
    typosquat: TyposquatDetector,
    log: Arc<dyn AuditLog>,
    jobs: usize,
    interpreter: Option<String>,
    interpreter_version: Option<String>,
}

impl Auditor {
    pub fn new(
        registry: Arc<PatternRegistry>,
        deny_list: DenyList,
        inventory: Arc<EnvironmentInventory>,
        client: Arc<dyn PackageManagerClient>,
        log: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            deny_list,
            inventory,
            provenance: ProvenanceChecker::new(client),
            scanner: ContentScanner::new(registry.clone()),
            typosquat: TyposquatDetector::new(registry),
            log,
            jobs: 1,
            interpreter: None,
            interpreter_version: None,
        }
    }

    /// Replace the default scanner (custom limits or file access).
    pub fn with_scanner(mut self, scanner: ContentScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Packages checked concurrently. 1 keeps the sequential pipeline.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Interpreter description recorded in the run header.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    /// `sys.version` recorded in the run header.
    pub fn with_interpreter_version(mut self, version: impl Into<String>) -> Self {
        self.interpreter_version = Some(version.into());
        self
    }

    pub fn inventory(&self) -> &EnvironmentInventory {
        &self.inventory
    }

    /// Full pipeline for one package. Never fails: each step degrades on
    /// its own, and a known-malicious name stops before any other check.
    pub fn check_package(&self, name: &str, version: &str) -> PackageAuditResult {
        let mut result = PackageAuditResult::new(name, version);

        if let Some(reason) = self.deny_list.check(name) {
            self.log
                .append(&format!("Known malicious package: {} ({})", name, reason));
            result.is_known_malicious = true;
            result.deny_reason = Some(reason.to_string());
            return result;
        }

        result.source_check = self.provenance.check_source(name);

        result.metadata = match self.inventory.try_get_metadata(name) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.log
                    .append(&format!("Error getting metadata for {}: {}", name, e));
                Default::default()
            }
        };

        result.typosquatting_warnings = self.typosquat.check_typosquatting(name);

        if let Some(footprint) = self.inventory.install_footprint(name) {
            let scan = self.scanner.scan_footprint(&footprint);
            for skipped in &scan.skipped {
                self.log.append(&format!(
                    "Error scanning {}: {}",
                    skipped.path.display(),
                    skipped.reason
                ));
            }
            if scan.budget_exhausted {
                self.log.append(&format!(
                    "Scan budget exhausted for {}; file results are partial",
                    name
                ));
            }
            result.suspicious_files = scan.files;
        }

        result
    }

    /// `check_package` behind the per-package failure boundary.
    pub fn audit_package(&self, name: &str, version: &str) -> PackageAuditResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.check_package(name, version))) {
            Ok(result) => result,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!("Checking {} failed: {}", name, msg);
                self.log
                    .append(&format!("Unexpected error while checking {}: {}", name, msg));
                let mut result = PackageAuditResult::new(name, version);
                result.internal_error = Some(INTERNAL_CHECK_ERROR.to_string());
                result
            }
        }
    }

    /// Audit every installed package and return the run summary.
    pub fn run(&self) -> AuditRunSummary {
        let started_at = Local::now();
        self.log.append("=== Package security audit started ===");
        if let Some(interpreter) = &self.interpreter {
            self.log.append(&format!("Interpreter: {}", interpreter));
        }
        if let Some(version) = &self.interpreter_version {
            self.log.append(&format!("Python version: {}", version));
        }
        self.log.append("Listing installed packages...");

        let packages = match self.inventory.try_list_installed_packages() {
            Ok(packages) => packages,
            Err(e) => {
                tracing::error!("Error getting installed packages: {}", e);
                self.log
                    .append(&format!("Error getting installed packages: {}", e));
                BTreeMap::new()
            }
        };
        self.log
            .append(&format!("Found {} installed package(s)", packages.len()));

        let names: Vec<(&String, &String)> = packages.iter().collect();
        let results = if self.jobs > 1 {
            self.audit_parallel(&names)
        } else {
            self.audit_sequential(&names)
        };

        let mut flagged: Vec<PackageAuditResult> =
            results.into_iter().filter(|r| r.has_issues()).collect();
        flagged.sort_by(|a, b| a.name.cmp(&b.name));

        let summary = AuditRunSummary {
            total_checked: packages.len(),
            flagged,
            started_at,
            finished_at: Local::now(),
        };

        self.log.append(&format_summary(&summary));
        self.log.append("=== Audit complete ===");
        tracing::info!(
            "Audited {} package(s), {} flagged",
            summary.total_checked,
            summary.flagged.len()
        );
        summary
    }

    fn audit_sequential(&self, names: &[(&String, &String)]) -> Vec<PackageAuditResult> {
        names
            .iter()
            .map(|(name, version)| self.audit_and_log(name, version))
            .collect()
    }

    fn audit_parallel(&self, names: &[(&String, &String)]) -> Vec<PackageAuditResult> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("pkgaudit-worker-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("Falling back to sequential audit: {}", e);
                return self.audit_sequential(names);
            }
        };
        pool.install(|| {
            names
                .par_iter()
                .map(|(name, version)| self.audit_and_log(name, version))
                .collect()
        })
    }

    fn audit_and_log(&self, name: &str, version: &str) -> PackageAuditResult {
        tracing::debug!("Checking {} {}", name, version);
        let result = self.audit_package(name, version);
        self.log.append(&render_findings(&result));
        result
    }
}

/// Per-package log block, appended as one message so concurrent workers
/// never interleave it.
pub fn render_findings(result: &PackageAuditResult) -> String {
    let mut lines = vec![format!(
        "Checking package: {} (version: {})",
        result.name, result.version
    )];

    if result.is_known_malicious {
        lines.push("  KNOWN MALICIOUS PACKAGE".to_string());
    }
    if let Some(err) = &result.internal_error {
        lines.push(format!("  {}", err));
    }
    if !result.source_check.is_safe && !result.source_check.reason.is_empty() {
        lines.push(format!("  Suspicious source: {}", result.source_check.reason));
    }
    for warning in &result.typosquatting_warnings {
        lines.push(format!("  {}", warning));
    }
    if !result.suspicious_files.is_empty() {
        lines.push(format!(
            "  Found {} suspicious file(s):",
            result.suspicious_files.len()
        ));
        for (path, matches) in result.suspicious_files.iter() {
            lines.push(format!("    - {}:", path));
            for description in matches.iter().take(MAX_LOGGED_MATCHES_PER_FILE) {
                lines.push(format!("      * {}", description));
            }
        }
    }
    if !result.has_issues() {
        lines.push("  No obvious issues found".to_string());
    }

    lines.join("\n")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
