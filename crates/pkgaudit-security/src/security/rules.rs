//! Pattern registry and its configuration
//!
//! This module provides `PatternConfig` for loading signature overrides from
//! YAML, and `PatternRegistry`, the compiled, immutable signature sets the
//! content scanner and typosquatting detector read from.

use super::default_rules::{
    DEFAULT_CODE_PATTERNS, DEFAULT_LEGITIMATE_PACKAGES, DEFAULT_NETWORK_PATTERNS,
    DEFAULT_PATH_PATTERNS,
};
use super::types::PatternKind;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A compiled signature.
#[derive(Debug, Clone)]
pub struct SuspectPattern {
    pub kind: PatternKind,
    /// Source text of the signature, as reported in findings
    pub pattern: String,
    pub regex: Regex,
}

impl SuspectPattern {
    /// Compile `pattern` case-insensitively.
    pub fn compile(kind: PatternKind, pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Failed to compile {} pattern: {}", kind, pattern))?;
        Ok(Self {
            kind,
            pattern: pattern.to_string(),
            regex,
        })
    }
}

/// Signature overrides
///
/// # Example YAML Configuration
///
/// ```yaml
/// use_default_patterns: true
/// disabled_patterns:
///   - token            # too noisy for our environment
/// code_patterns:
///   - "importlib\\.import_module\\s*\\("
/// network_patterns:
///   - "discord(app)?\\.com/api/webhooks"
/// legitimate_packages:
///   - boto3
/// deny_list:
///   - evil-pkg
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Whether to start from the built-in sets (default: true)
    #[serde(default = "default_use_defaults")]
    pub use_default_patterns: bool,
    /// Built-in signatures to drop, by exact pattern text
    #[serde(default)]
    pub disabled_patterns: Vec<String>,
    #[serde(default)]
    pub code_patterns: Vec<String>,
    #[serde(default)]
    pub path_patterns: Vec<String>,
    #[serde(default)]
    pub network_patterns: Vec<String>,
    /// Extra typosquatting reference names
    #[serde(default)]
    pub legitimate_packages: Vec<String>,
    /// Extra known-malicious names, checked alongside the built-in table
    #[serde(default)]
    pub deny_list: Vec<String>,
}

fn default_use_defaults() -> bool {
    true
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            use_default_patterns: true,
            disabled_patterns: Vec::new(),
            code_patterns: Vec::new(),
            path_patterns: Vec::new(),
            network_patterns: Vec::new(),
            legitimate_packages: Vec::new(),
            deny_list: Vec::new(),
        }
    }
}

impl PatternConfig {
    /// Load a configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern config: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse pattern config: {}", path.display()))
    }

    /// Load `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}

/// Compiled, read-only signature sets. Built once per run and shared.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    code: Vec<SuspectPattern>,
    path: Vec<SuspectPattern>,
    network: Vec<SuspectPattern>,
    legitimate_package_names: Vec<String>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRegistry {
    /// Registry with the built-in sets only
    pub fn new() -> Self {
        Self::from_config(&PatternConfig::default())
    }

    /// Build from a configuration. Signatures that fail to compile are
    /// logged and left out.
    pub fn from_config(config: &PatternConfig) -> Self {
        let pick = |defaults: &[&str], extra: &[String]| -> Vec<String> {
            let mut out: Vec<String> = if config.use_default_patterns {
                defaults
                    .iter()
                    .filter(|p| !config.disabled_patterns.iter().any(|d| d.as_str() == **p))
                    .map(|p| p.to_string())
                    .collect()
            } else {
                Vec::new()
            };
            for p in extra {
                if !out.contains(p) {
                    out.push(p.clone());
                }
            }
            out
        };

        let code = Self::compile_set(
            PatternKind::Code,
            &pick(DEFAULT_CODE_PATTERNS, &config.code_patterns),
        );
        let path = Self::compile_set(
            PatternKind::Path,
            &pick(DEFAULT_PATH_PATTERNS, &config.path_patterns),
        );
        let network = Self::compile_set(
            PatternKind::Network,
            &pick(DEFAULT_NETWORK_PATTERNS, &config.network_patterns),
        );

        let mut legitimate_package_names: Vec<String> = DEFAULT_LEGITIMATE_PACKAGES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for name in &config.legitimate_packages {
            let lower = name.trim().to_lowercase();
            if !lower.is_empty() && !legitimate_package_names.contains(&lower) {
                legitimate_package_names.push(lower);
            }
        }

        Self {
            code,
            path,
            network,
            legitimate_package_names,
        }
    }

    fn compile_set(kind: PatternKind, patterns: &[String]) -> Vec<SuspectPattern> {
        patterns
            .iter()
            .filter_map(|p| match SuspectPattern::compile(kind, p) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!("Skipping {} pattern '{}': {:#}", kind, p, e);
                    None
                }
            })
            .collect()
    }

    pub fn code_patterns(&self) -> &[SuspectPattern] {
        &self.code
    }

    pub fn path_patterns(&self) -> &[SuspectPattern] {
        &self.path
    }

    pub fn network_patterns(&self) -> &[SuspectPattern] {
        &self.network
    }

    pub fn legitimate_package_names(&self) -> &[String] {
        &self.legitimate_package_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_sizes() {
        let reg = PatternRegistry::new();
        assert_eq!(reg.code_patterns().len(), DEFAULT_CODE_PATTERNS.len());
        assert_eq!(reg.path_patterns().len(), DEFAULT_PATH_PATTERNS.len());
        assert_eq!(reg.network_patterns().len(), DEFAULT_NETWORK_PATTERNS.len());
        assert_eq!(
            reg.legitimate_package_names().len(),
            DEFAULT_LEGITIMATE_PACKAGES.len()
        );
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let reg = PatternRegistry::new();
        let eval = &reg.code_patterns()[0];
        assert!(eval.regex.is_match("EVAL (x)"));
        let sys32 = &reg.path_patterns()[0];
        assert!(sys32.regex.is_match(r"c:\windows\system32\drivers"));
    }

    #[test]
    fn test_config_disables_and_extends() {
        let yaml = r#"
disabled_patterns:
  - token
code_patterns:
  - "importlib\\.import_module\\s*\\("
  - "("
legitimate_packages:
  - Boto3
  - numpy
deny_list:
  - evil-pkg
"#;
        let config: PatternConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.use_default_patterns);
        let reg = PatternRegistry::from_config(&config);

        assert!(!reg.path_patterns().iter().any(|p| p.pattern == "token"));
        // the unbalanced "(" is dropped, the valid extra is appended last
        assert_eq!(reg.code_patterns().len(), DEFAULT_CODE_PATTERNS.len() + 1);
        assert_eq!(
            reg.code_patterns().last().unwrap().pattern,
            r"importlib\.import_module\s*\("
        );
        assert_eq!(reg.legitimate_package_names().last().unwrap(), "boto3");
        assert_eq!(
            reg.legitimate_package_names().len(),
            DEFAULT_LEGITIMATE_PACKAGES.len() + 1
        );
    }

    #[test]
    fn test_config_without_defaults() {
        let config = PatternConfig {
            use_default_patterns: false,
            network_patterns: vec![r"evil\.example".to_string()],
            ..Default::default()
        };
        let reg = PatternRegistry::from_config(&config);
        assert!(reg.code_patterns().is_empty());
        assert!(reg.path_patterns().is_empty());
        assert_eq!(reg.network_patterns().len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.yaml");
        fs::write(&path, "deny_list: [evil-pkg]\n").unwrap();
        let config = PatternConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.deny_list, vec!["evil-pkg".to_string()]);

        fs::write(&path, "deny_list: {not: [a list\n").unwrap();
        assert!(PatternConfig::load_from_file(&path).is_err());
        assert!(PatternConfig::load_or_default(None).unwrap().deny_list.is_empty());
    }
}
