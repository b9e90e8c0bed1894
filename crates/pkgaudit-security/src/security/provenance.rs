//! Provenance checking: does the package manager agree the package came
//! through the standard distribution channel?
//!
//! Two independent sources are consulted: the manager's per-package record
//! (install location) and its full installed listing. A package passes only
//! when it lives under a standard third-party directory and the listing
//! also knows it.

use super::package_manager::PackageManagerClient;
use super::types::{canonical_name, SourceCheckResult};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Directory names that mark the interpreter's third-party package root.
/// `dist-packages` is the Debian-family system interpreter layout.
pub const STANDARD_PACKAGE_DIRS: &[&str] = &["site-packages", "dist-packages"];

pub const REASON_NO_INFO: &str = "could not retrieve package info";
pub const REASON_STANDARD: &str = "standard install location";

pub struct ProvenanceChecker {
    client: Arc<dyn PackageManagerClient>,
    // Normalised names from the manager's listing, fetched on first use.
    listing: OnceLock<Result<HashSet<String>, String>>,
}

impl ProvenanceChecker {
    pub fn new(client: Arc<dyn PackageManagerClient>) -> Self {
        Self {
            client,
            listing: OnceLock::new(),
        }
    }

    pub fn check_source(&self, name: &str) -> SourceCheckResult {
        let show = match self.client.show(name) {
            Ok(show) => show,
            Err(e) => {
                return SourceCheckResult::unsafe_because(format!("error during check: {}", e))
            }
        };

        let Some(location) = show.and_then(|s| s.location) else {
            return SourceCheckResult::unsafe_because(REASON_NO_INFO);
        };

        if is_standard_location(&location) {
            match self.listing() {
                Ok(names) if names.contains(&canonical_name(name)) => {
                    return SourceCheckResult::safe(REASON_STANDARD);
                }
                Ok(_) => {
                    tracing::debug!("{} not in package manager listing", name);
                }
                Err(e) => {
                    return SourceCheckResult::unsafe_because(format!("error during check: {}", e));
                }
            }
        }

        SourceCheckResult::unsafe_because(format!("suspicious install location: {}", location))
    }

    fn listing(&self) -> Result<&HashSet<String>, &str> {
        self.listing
            .get_or_init(|| {
                self.client
                    .list()
                    .map(|pkgs| pkgs.iter().map(|p| canonical_name(&p.name)).collect())
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| e.as_str())
    }
}

/// True when some component of `location` is a standard package directory.
/// Both separators are accepted so a reported Windows path is judged the
/// same way on any host.
pub fn is_standard_location(location: &str) -> bool {
    location
        .split(['/', '\\'])
        .any(|component| {
            STANDARD_PACKAGE_DIRS
                .iter()
                .any(|std_dir| component.eq_ignore_ascii_case(std_dir))
        })
}

/// Convenience for callers holding a `Path`.
pub fn is_standard_path(location: &Path) -> bool {
    is_standard_location(&location.to_string_lossy())
}
