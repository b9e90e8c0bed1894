use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// pkgaudit - audit installed Python packages for supply-chain red flags
#[derive(Parser, Debug)]
#[command(name = "pkgaudit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which interpreter environment to inspect. Flags override `PKGAUDIT_*`.
#[derive(Args, Debug, Clone, Default)]
pub struct EnvironmentArgs {
    /// Python interpreter (default: from env, else python3/python on PATH)
    #[arg(long, value_name = "PYTHON")]
    pub python: Option<String>,

    /// Site directory to inventory; repeatable (default: the interpreter's sys.path)
    #[arg(long = "site-dir", value_name = "DIR")]
    pub site_dirs: Vec<PathBuf>,

    /// YAML file with pattern overrides and extra deny-list names
    #[arg(long, value_name = "FILE")]
    pub patterns: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit every installed package
    Audit {
        #[command(flatten)]
        env: EnvironmentArgs,

        /// Print the run summary as JSON instead of text
        #[arg(long, default_value = "false")]
        json: bool,

        /// Audit log file (default: from env or ~/.pkgaudit/package_security_check.log)
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,

        /// Packages checked concurrently (default: from env or 1)
        #[arg(long)]
        jobs: Option<usize>,

        /// Do not echo audit log lines to stdout
        #[arg(long, default_value = "false")]
        no_echo: bool,
    },

    /// Audit a single installed package
    Check {
        /// Package name
        #[arg(value_name = "NAME")]
        name: String,

        #[command(flatten)]
        env: EnvironmentArgs,

        /// Output the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Scan one file for suspicious patterns
    #[command(name = "scan-file")]
    ScanFile {
        /// File to scan (.py .pyw .txt .json .yaml .yml)
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// YAML file with pattern overrides
        #[arg(long, value_name = "FILE")]
        patterns: Option<PathBuf>,

        /// Output matches as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Scan the installed files of one package
    #[command(name = "scan-package")]
    ScanPackage {
        /// Package name
        #[arg(value_name = "NAME")]
        name: String,

        #[command(flatten)]
        env: EnvironmentArgs,

        /// Output findings as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Check names for typosquatting of well-known packages
    Typosquat {
        /// Names to check
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        /// YAML file with extra legitimate package names
        #[arg(long, value_name = "FILE")]
        patterns: Option<PathBuf>,
    },

    /// List the installed packages that would be audited
    List {
        #[command(flatten)]
        env: EnvironmentArgs,

        /// Output as a JSON object of name to version
        #[arg(long, default_value = "false")]
        json: bool,
    },
}
