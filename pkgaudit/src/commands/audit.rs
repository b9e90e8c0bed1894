//! Audit commands: full run, single-package check, inventory listing.

use crate::cli::EnvironmentArgs;
use anyhow::{anyhow, bail, Context, Result};
use pkgaudit_core::config::AuditConfig;
use pkgaudit_security::log::{AuditLog, FileAuditLog};
use pkgaudit_security::security::auditor::render_findings;
use pkgaudit_security::security::{
    discover_site_dirs, format_summary, format_summary_json, interpreter_version, resolve_python,
    Auditor,
    ContentScanner, DenyList, EnvironmentInventory, PatternConfig, PatternRegistry, PipClient,
    ScanLimits,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Interpreter used for `pip` queries when none is configured or found.
const FALLBACK_PYTHON: &str = "python3";

/// Everything resolved before a command touches the environment.
pub struct Session {
    pub config: AuditConfig,
    pub python: Option<PathBuf>,
    /// `sys.version` of `python`, when it could be queried
    pub python_version: Option<String>,
    pub registry: Arc<PatternRegistry>,
    pub deny_list: DenyList,
    pub inventory: Arc<EnvironmentInventory>,
}

impl Session {
    /// Resolve the interpreter, its site directories and the pattern
    /// configuration. Finding no site directory at all is fatal.
    pub fn open(env: &EnvironmentArgs) -> Result<Self> {
        let config = apply_overrides(AuditConfig::from_env(), env);
        let python = resolve_python(config.python.as_deref());
        let timeout = Duration::from_secs(config.command_timeout_secs);

        let site_dirs = if !config.site_dirs.is_empty() {
            config.site_dirs.clone()
        } else {
            let python = python.as_deref().ok_or_else(|| {
                anyhow!("No Python interpreter found. Set PKGAUDIT_PYTHON or pass --python")
            })?;
            discover_site_dirs(python, timeout)
                .with_context(|| {
                    format!("Failed to discover site directories of {}", python.display())
                })?
        };
        if site_dirs.is_empty() {
            bail!("No site directories to inventory. Pass --site-dir or set PKGAUDIT_SITE_DIRS");
        }
        tracing::debug!("Site directories: {:?}", site_dirs);

        let patterns = PatternConfig::load_or_default(config.patterns_file.as_deref())?;

        let python_version = python.as_deref().and_then(|p| {
            interpreter_version(p, timeout)
                .map_err(|e| {
                    tracing::debug!("Could not query {} for its version: {}", p.display(), e)
                })
                .ok()
        });

        Ok(Self {
            python,
            python_version,
            registry: Arc::new(PatternRegistry::from_config(&patterns)),
            deny_list: DenyList::from_config(&patterns),
            inventory: Arc::new(EnvironmentInventory::new(site_dirs)),
            config,
        })
    }

    pub fn scan_limits(&self) -> ScanLimits {
        scan_limits(&self.config)
    }

    pub fn python_label(&self) -> String {
        self.python
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<not found>".to_string())
    }

    pub fn auditor(&self, log: Arc<dyn AuditLog>) -> Auditor {
        let python = self
            .python
            .clone()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_PYTHON));
        let client = PipClient::new(
            python,
            Duration::from_secs(self.config.command_timeout_secs),
        );
        let auditor = Auditor::new(
            self.registry.clone(),
            self.deny_list.clone(),
            self.inventory.clone(),
            Arc::new(client),
            log,
        )
        .with_scanner(
            ContentScanner::new(self.registry.clone()).with_limits(self.scan_limits()),
        )
        .with_jobs(self.config.jobs)
        .with_interpreter(self.python_label());

        match &self.python_version {
            Some(version) => auditor.with_interpreter_version(version.clone()),
            None => auditor,
        }
    }
}

/// CLI flags take precedence over the environment.
pub fn apply_overrides(mut config: AuditConfig, env: &EnvironmentArgs) -> AuditConfig {
    if let Some(python) = &env.python {
        config.python = Some(python.clone());
    }
    if !env.site_dirs.is_empty() {
        config.site_dirs = env.site_dirs.clone();
    }
    if let Some(patterns) = &env.patterns {
        config.patterns_file = Some(patterns.clone());
    }
    config
}

pub fn scan_limits(config: &AuditConfig) -> ScanLimits {
    ScanLimits {
        max_file_bytes: config.max_file_bytes,
        budget: Duration::from_secs(config.scan_budget_secs),
    }
}

fn open_log(path: &Path, echo: bool) -> Result<FileAuditLog> {
    Ok(FileAuditLog::open(path)?.with_echo(echo))
}

/// Audit every installed package. Flagged packages are a normal outcome and
/// do not change the exit status.
pub fn cmd_audit(
    env: &EnvironmentArgs,
    json: bool,
    log_path: Option<PathBuf>,
    jobs: Option<usize>,
    no_echo: bool,
) -> Result<()> {
    let mut session = Session::open(env)?;
    if let Some(path) = log_path {
        session.config.audit_log = path;
    }
    if let Some(jobs) = jobs {
        session.config.jobs = jobs.max(1);
    }

    let echo = !no_echo && !json;
    let log = Arc::new(open_log(&session.config.audit_log, echo)?);
    let auditor = session.auditor(log.clone());

    let summary = auditor.run();
    log.append(&format!(
        "Detailed log saved to: {}",
        session.config.audit_log.display()
    ));

    if json {
        println!("{}", format_summary_json(&summary)?);
    } else if !echo {
        println!("{}", format_summary(&summary));
    }
    Ok(())
}

/// Audit one package by name.
pub fn cmd_check(env: &EnvironmentArgs, name: &str, json: bool) -> Result<()> {
    let session = Session::open(env)?;
    let log = Arc::new(open_log(&session.config.audit_log, false)?);
    let auditor = session.auditor(log.clone());

    let version = auditor
        .inventory()
        .find(name)
        .map(|dist| dist.version)
        .unwrap_or_else(|| {
            tracing::warn!("{} is not in the inventory", name);
            "unknown".to_string()
        });

    let result = auditor.audit_package(name, &version);
    let rendered = render_findings(&result);
    log.append(&rendered);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

/// Print the inventory snapshot.
pub fn cmd_list(env: &EnvironmentArgs, json: bool) -> Result<()> {
    let session = Session::open(env)?;
    let packages = session.inventory.try_list_installed_packages()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
    } else {
        for (name, version) in &packages {
            println!("{}=={}", name, version);
        }
        eprintln!("{} package(s)", packages.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_dist(site: &Path, name: &str, version: &str) {
        let info = site.join(format!("{}-{}.dist-info", name.replace('-', "_"), version));
        fs::create_dir_all(&info).unwrap();
        fs::write(
            info.join("METADATA"),
            format!("Name: {}\nVersion: {}\n", name, version),
        )
        .unwrap();
    }

    #[test]
    fn test_overrides_take_precedence() {
        let base = AuditConfig {
            python: Some("/env/python".to_string()),
            site_dirs: vec![PathBuf::from("/env/site")],
            ..Default::default()
        };
        let env = EnvironmentArgs {
            python: Some("/cli/python".to_string()),
            site_dirs: vec![],
            patterns: Some(PathBuf::from("p.yaml")),
        };
        let cfg = apply_overrides(base, &env);
        assert_eq!(cfg.python.as_deref(), Some("/cli/python"));
        assert_eq!(cfg.site_dirs, vec![PathBuf::from("/env/site")]);
        assert_eq!(cfg.patterns_file, Some(PathBuf::from("p.yaml")));
    }

    #[test]
    fn test_session_with_explicit_site_dir() {
        let site = tempfile::tempdir().unwrap();
        write_dist(site.path(), "alpha", "1.0");
        let env = EnvironmentArgs {
            python: Some("/nonexistent/python3".to_string()),
            site_dirs: vec![site.path().to_path_buf()],
            patterns: None,
        };
        let session = Session::open(&env).unwrap();
        assert_eq!(session.python_label(), "/nonexistent/python3");
        assert_eq!(session.python_version, None);
        let packages = session.inventory.list_installed_packages();
        assert_eq!(packages.get("alpha").map(String::as_str), Some("1.0"));
    }

    #[test]
    fn test_bad_pattern_file_is_fatal() {
        let site = tempfile::tempdir().unwrap();
        let patterns = site.path().join("patterns.yaml");
        fs::write(&patterns, "deny_list: {broken").unwrap();
        let env = EnvironmentArgs {
            python: None,
            site_dirs: vec![site.path().to_path_buf()],
            patterns: Some(patterns),
        };
        assert!(Session::open(&env).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_python_version_recorded_in_run_header() {
        use std::os::unix::fs::PermissionsExt;
        let site = tempfile::tempdir().unwrap();
        write_dist(site.path(), "alpha", "1.0");
        let python = site.path().join("python3");
        fs::write(&python, "#!/bin/sh\necho '3.12.1 (main, Dec  8 2023)'\n").unwrap();
        fs::set_permissions(&python, fs::Permissions::from_mode(0o755)).unwrap();
        let env = EnvironmentArgs {
            python: Some(python.display().to_string()),
            site_dirs: vec![site.path().to_path_buf()],
            patterns: None,
        };

        let session = Session::open(&env).unwrap();
        assert_eq!(
            session.python_version.as_deref(),
            Some("3.12.1 (main, Dec  8 2023)")
        );
        let log_path = site.path().join("audit.log");
        session
            .auditor(Arc::new(open_log(&log_path, false).unwrap()))
            .run();
        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("] Python version: 3.12.1 (main, Dec  8 2023)"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unopenable_log_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        assert!(open_log(&blocker.join("audit.log"), false).is_err());
    }

    #[test]
    fn test_auditor_from_session_flags_deny_listed_package() {
        let site = tempfile::tempdir().unwrap();
        write_dist(site.path(), "alpha", "1.0");
        write_dist(site.path(), "evil-pkg", "2.0");
        let patterns = site.path().join("patterns.yaml");
        fs::write(&patterns, "deny_list: [evil-pkg]\n").unwrap();
        let env = EnvironmentArgs {
            python: Some("/nonexistent/python3".to_string()),
            site_dirs: vec![site.path().to_path_buf()],
            patterns: Some(patterns),
        };
        let session = Session::open(&env).unwrap();
        let log_path = site.path().join("audit.log");
        let log = Arc::new(open_log(&log_path, false).unwrap());

        let summary = session.auditor(log).run();
        assert_eq!(summary.total_checked, 2);
        let evil = summary
            .flagged
            .iter()
            .find(|r| r.name == "evil-pkg")
            .unwrap();
        assert!(evil.is_known_malicious);
        // pip cannot run against a missing interpreter, so alpha's
        // provenance is unverifiable rather than an aborted run
        let alpha = summary.flagged.iter().find(|r| r.name == "alpha").unwrap();
        assert!(alpha.source_check.reason.starts_with("error during check: "));

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Interpreter: /nonexistent/python3"));
        assert!(content.contains("=== Audit complete ==="));
    }
}
