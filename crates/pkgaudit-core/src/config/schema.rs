//! Typed configuration structs, loaded from the environment.

use super::env_keys::{audit as audit_keys, observability as obv_keys};
use super::loader::{env_flag, env_optional, env_parse};
use std::path::PathBuf;

/// Default bound on any single package-manager subprocess.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Files above this size are skipped by the content scanner.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Wall-clock budget for scanning one package's files.
pub const DEFAULT_SCAN_BUDGET_SECS: u64 = 120;

/// Filter used when `PKGAUDIT_LOG_LEVEL` is unset.
pub const DEFAULT_LOG_FILTER: &str = "pkgaudit=info";

/// Observability: quiet, log_level, log_json
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_flag(obv_keys::PKGAUDIT_QUIET, false),
                log_level: env_optional(obv_keys::PKGAUDIT_LOG_LEVEL, &[])
                    .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                log_json: env_flag(obv_keys::PKGAUDIT_LOG_JSON, false),
            }
        })
    }
}

/// Settings for an audit run. CLI flags are applied on top by the binary.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Append-only audit log path
    pub audit_log: PathBuf,
    /// Interpreter override; `None` means "look up python3/python on PATH"
    pub python: Option<String>,
    /// Site directories to inventory; empty means "ask the interpreter"
    pub site_dirs: Vec<PathBuf>,
    pub command_timeout_secs: u64,
    pub max_file_bytes: u64,
    pub scan_budget_secs: u64,
    /// Worker count; 1 keeps the strictly sequential pipeline
    pub jobs: usize,
    /// Optional YAML pattern configuration
    pub patterns_file: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            audit_log: default_audit_log_path(),
            python: None,
            site_dirs: Vec::new(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            scan_budget_secs: DEFAULT_SCAN_BUDGET_SECS,
            jobs: 1,
            patterns_file: None,
        }
    }
}

impl AuditConfig {
    /// Load from environment variables (also loads `.env`).
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let defaults = Self::default();

        let audit_log = env_optional(audit_keys::PKGAUDIT_AUDIT_LOG, &[])
            .map(PathBuf::from)
            .unwrap_or(defaults.audit_log);

        let site_dirs = env_optional(audit_keys::PKGAUDIT_SITE_DIRS, &[])
            .map(|raw| std::env::split_paths(&raw).collect())
            .unwrap_or_default();

        Self {
            audit_log,
            python: env_optional(audit_keys::PKGAUDIT_PYTHON, audit_keys::PYTHON_ALIASES),
            site_dirs,
            command_timeout_secs: env_parse(
                audit_keys::PKGAUDIT_COMMAND_TIMEOUT_SECS,
                defaults.command_timeout_secs,
            ),
            max_file_bytes: env_parse(audit_keys::PKGAUDIT_MAX_FILE_BYTES, defaults.max_file_bytes),
            scan_budget_secs: env_parse(
                audit_keys::PKGAUDIT_SCAN_BUDGET_SECS,
                defaults.scan_budget_secs,
            ),
            jobs: env_parse(audit_keys::PKGAUDIT_JOBS, defaults.jobs).max(1),
            patterns_file: env_optional(audit_keys::PKGAUDIT_PATTERNS, &[]).map(PathBuf::from),
        }
    }
}

/// `~/.pkgaudit/package_security_check.log`, or the working directory when
/// no home directory is known.
pub fn default_audit_log_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".pkgaudit"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("package_security_check.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AuditConfig::default();
        assert_eq!(cfg.jobs, 1);
        assert_eq!(cfg.command_timeout_secs, DEFAULT_COMMAND_TIMEOUT_SECS);
        assert!(cfg.site_dirs.is_empty());
        assert!(cfg
            .audit_log
            .to_string_lossy()
            .ends_with("package_security_check.log"));
    }
}
