//! Run summary rendering (text for humans and the audit log, JSON for tools).

use super::types::AuditRunSummary;
use anyhow::Result;

/// Static advice printed whenever at least one package is flagged.
pub const REMEDIATION_ADVICE: &[&str] = &[
    "Verify each package against its official source",
    "Review the package's repository or project homepage",
    "Consider removing suspicious packages: pip uninstall <package_name>",
    "Only install packages from trusted indexes (the official PyPI)",
];

pub fn format_summary(summary: &AuditRunSummary) -> String {
    let mut lines = vec![
        "=== Audit summary ===".to_string(),
        format!("Total checked: {} package(s)", summary.total_checked),
        format!("Suspicious: {} package(s)", summary.flagged.len()),
    ];

    if summary.flagged.is_empty() {
        lines.push("No obviously suspicious packages found".to_string());
    } else {
        lines.push(String::new());
        lines.push("The following packages need further review:".to_string());
        for pkg in &summary.flagged {
            lines.push(format!("  - {} (version: {})", pkg.name, pkg.version));
            for reason in pkg.reasons() {
                lines.push(format!("      {}", reason));
            }
        }
        lines.push(String::new());
        lines.push("Recommendations:".to_string());
        for (i, advice) in REMEDIATION_ADVICE.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, advice));
        }
    }

    let elapsed = summary.finished_at - summary.started_at;
    lines.push(format!(
        "Duration: {:.1}s",
        elapsed.num_milliseconds() as f64 / 1000.0
    ));
    lines.join("\n")
}

pub fn format_summary_json(summary: &AuditRunSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
