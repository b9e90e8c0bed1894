//! CLI commands.
//!
//! - `audit`: full environment audit, single-package check, inventory listing
//! - `scan`: file and package scans, typosquatting lookups

pub mod audit;
pub mod scan;
