//! Installed-package security audit.
//!
//! - `rules` / `default_rules`: signature sets and their YAML overrides
//! - `malicious_packages`: embedded deny-list
//! - `inventory`: installed distributions read from site directories
//! - `package_manager` / `provenance`: install-channel checks through pip
//! - `scanner`: package tree content scanning
//! - `typosquat`: near-miss names of well-known packages
//! - `auditor`: the per-package pipeline and the full run
//! - `report`: text and JSON summaries

pub mod auditor;
pub mod default_rules;
pub mod error;
pub mod inventory;
pub mod malicious_packages;
pub mod package_manager;
pub mod provenance;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod types;
pub mod typosquat;

pub use auditor::{Auditor, INTERNAL_CHECK_ERROR};
pub use error::{AuditError, AuditResult};
pub use inventory::{
    discover_site_dirs, interpreter_version, resolve_python, EnvironmentInventory,
    InstallFootprint,
};
pub use malicious_packages::DenyList;
pub use package_manager::{PackageManagerClient, PipClient};
pub use provenance::ProvenanceChecker;
pub use report::{format_summary, format_summary_json};
pub use rules::{PatternConfig, PatternRegistry};
pub use scanner::{ContentScanner, FileReader, FsReader, ScanLimits};
pub use types::{
    canonical_name, AuditRunSummary, PackageAuditResult, PackageMetadata, PackageVersion,
    PatternMatch, SourceCheckResult, SuspiciousFiles,
};
pub use typosquat::TyposquatDetector;
