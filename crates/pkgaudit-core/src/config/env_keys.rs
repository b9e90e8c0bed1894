//! Environment variable keys.
//!
//! Primary variables use the `PKGAUDIT_*` prefix.

/// Observability and diagnostics
pub mod observability {
    pub const PKGAUDIT_QUIET: &str = "PKGAUDIT_QUIET";
    pub const PKGAUDIT_LOG_LEVEL: &str = "PKGAUDIT_LOG_LEVEL";
    pub const PKGAUDIT_LOG_JSON: &str = "PKGAUDIT_LOG_JSON";
}

/// Audit run settings
pub mod audit {
    /// Append-only human-readable audit log
    pub const PKGAUDIT_AUDIT_LOG: &str = "PKGAUDIT_AUDIT_LOG";

    /// Interpreter used for `pip` queries and `sys.path` discovery
    pub const PKGAUDIT_PYTHON: &str = "PKGAUDIT_PYTHON";
    pub const PYTHON_ALIASES: &[&str] = &["PYTHON"];

    /// Site directories, separated like `PATH`
    pub const PKGAUDIT_SITE_DIRS: &str = "PKGAUDIT_SITE_DIRS";

    pub const PKGAUDIT_COMMAND_TIMEOUT_SECS: &str = "PKGAUDIT_COMMAND_TIMEOUT_SECS";
    pub const PKGAUDIT_MAX_FILE_BYTES: &str = "PKGAUDIT_MAX_FILE_BYTES";
    pub const PKGAUDIT_SCAN_BUDGET_SECS: &str = "PKGAUDIT_SCAN_BUDGET_SECS";
    pub const PKGAUDIT_JOBS: &str = "PKGAUDIT_JOBS";

    /// YAML pattern configuration file
    pub const PKGAUDIT_PATTERNS: &str = "PKGAUDIT_PATTERNS";
}
