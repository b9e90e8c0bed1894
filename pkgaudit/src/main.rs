mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    pkgaudit_core::observability::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Audit {
            env,
            json,
            log,
            jobs,
            no_echo,
        } => {
            commands::audit::cmd_audit(&env, json, log, jobs, no_echo)?;
        }
        Commands::Check { name, env, json } => {
            commands::audit::cmd_check(&env, &name, json)?;
        }
        Commands::ScanFile {
            path,
            patterns,
            json,
        } => {
            commands::scan::cmd_scan_file(&path, patterns, json)?;
        }
        Commands::ScanPackage { name, env, json } => {
            commands::scan::cmd_scan_package(&env, &name, json)?;
        }
        Commands::Typosquat { names, patterns } => {
            commands::scan::cmd_typosquat(&names, patterns)?;
        }
        Commands::List { env, json } => {
            commands::audit::cmd_list(&env, json)?;
        }
    }

    Ok(())
}
