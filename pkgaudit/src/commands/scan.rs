//! Scan commands: single file, single package, typosquatting lookups.

use super::audit::{scan_limits, Session};
use crate::cli::EnvironmentArgs;
use anyhow::Result;
use pkgaudit_core::config::AuditConfig;
use pkgaudit_security::security::scanner::is_scannable;
use pkgaudit_security::security::{
    ContentScanner, PatternConfig, PatternRegistry, TyposquatDetector,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn registry_from(patterns: Option<&Path>) -> Result<Arc<PatternRegistry>> {
    let config = PatternConfig::load_or_default(patterns)?;
    Ok(Arc::new(PatternRegistry::from_config(&config)))
}

/// Scan one file and print its match descriptions.
pub fn cmd_scan_file(path: &Path, patterns: Option<PathBuf>, json: bool) -> Result<()> {
    let config = AuditConfig::from_env();
    let patterns = patterns.or(config.patterns_file.clone());
    let scanner =
        ContentScanner::new(registry_from(patterns.as_deref())?).with_limits(scan_limits(&config));

    if !is_scannable(path) {
        tracing::warn!(
            "{} has an unscanned extension and was not opened",
            path.display()
        );
    }
    let found = scanner.scan_file(path)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "path": path.display().to_string(),
                "matches": found,
            }))?
        );
    } else if found.is_empty() {
        println!("No suspicious patterns in {}", path.display());
    } else {
        println!("{}:", path.display());
        for description in &found {
            println!("  * {}", description);
        }
    }
    Ok(())
}

/// Scan the installed tree of one package.
pub fn cmd_scan_package(env: &EnvironmentArgs, name: &str, json: bool) -> Result<()> {
    let session = Session::open(env)?;
    let scanner = ContentScanner::new(session.registry.clone()).with_limits(session.scan_limits());

    let Some(footprint) = session.inventory.install_footprint(name) else {
        if json {
            println!("{}", json!({ "name": name, "site_dir": null, "files": {} }));
        } else {
            println!("{} is not installed; nothing to scan", name);
        }
        return Ok(());
    };

    let scan = scanner.scan_footprint(&footprint);
    let site_dir = footprint.site_dir.display().to_string();
    for skipped in &scan.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "name": name,
                "site_dir": site_dir,
                "roots": footprint.roots,
                "files": scan.files,
                "budget_exhausted": scan.budget_exhausted,
            }))?
        );
    } else if scan.files.is_empty() {
        println!("No suspicious files in {} ({})", name, site_dir);
    } else {
        println!(
            "{} suspicious file(s) in {} ({}):",
            scan.files.len(),
            name,
            site_dir
        );
        for (file, descriptions) in scan.files.iter() {
            println!("  - {}:", file);
            for description in descriptions {
                println!("      * {}", description);
            }
        }
    }
    Ok(())
}

/// Print typosquatting warnings for each name.
pub fn cmd_typosquat(names: &[String], patterns: Option<PathBuf>) -> Result<()> {
    let config = AuditConfig::from_env();
    let patterns = patterns.or(config.patterns_file);
    let detector = TyposquatDetector::new(registry_from(patterns.as_deref())?);

    for name in names {
        let warnings = detector.check_typosquatting(name);
        if warnings.is_empty() {
            println!("{}: ok", name);
        }
        for warning in warnings {
            println!("{}", warning);
        }
    }
    Ok(())
}
