//! Content scanner
//!
//! This module provides `ContentScanner`, which matches file contents
//! against the pattern registry and walks installed package trees.

use super::error::{AuditError, AuditResult};
use super::inventory::{EnvironmentInventory, InstallFootprint};
use super::rules::{PatternRegistry, SuspectPattern};
use super::types::{PatternMatch, SuspiciousFiles};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Extensions `scan_file` will open. Everything else is skipped unread.
pub const SCANNABLE_EXTENSIONS: &[&str] = &["py", "pyw", "txt", "json", "yaml", "yml"];

/// Packaging and entry-point files checked at the package root regardless
/// of extension.
pub const HIGH_VALUE_FILES: &[&str] = &["setup.py", "__init__.py", "setup.cfg", "pyproject.toml"];

/// Single-file roots scanned when a package installs a bare module.
/// `.pth` lines starting with `import` run at interpreter startup.
pub const MODULE_EXTENSIONS: &[&str] = &["py", "pyw", "pth"];

/// Filesystem access used by the scanner.
pub trait FileReader: Send + Sync {
    fn size(&self, path: &Path) -> io::Result<u64>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Plain `std::fs` access.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl FileReader for FsReader {
    fn size(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    /// Files larger than this are skipped
    pub max_file_bytes: u64,
    /// Wall-clock budget for one package tree
    pub budget: Duration,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: pkgaudit_core::config::schema::DEFAULT_MAX_FILE_BYTES,
            budget: Duration::from_secs(pkgaudit_core::config::schema::DEFAULT_SCAN_BUDGET_SECS),
        }
    }
}

/// A file that was left out of a tree scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of scanning one package tree.
#[derive(Debug, Clone, Default)]
pub struct TreeScan {
    pub files: SuspiciousFiles,
    pub skipped: Vec<SkippedFile>,
    /// The walk stopped early because the scan budget ran out
    pub budget_exhausted: bool,
}

pub struct ContentScanner {
    registry: Arc<PatternRegistry>,
    reader: Arc<dyn FileReader>,
    limits: ScanLimits,
}

impl ContentScanner {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self {
            registry,
            reader: Arc::new(FsReader),
            limits: ScanLimits::default(),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Match `content` against every signature. Order: all code matches in
    /// registry order, then path presence, then network matches.
    pub fn scan_content(&self, content: &str, location: &str) -> Vec<PatternMatch> {
        let newlines: Vec<usize> = content
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i)
            .collect();
        // newlines strictly before the match start, plus one
        let line_of = |offset: usize| newlines.partition_point(|&nl| nl < offset) + 1;

        let mut matches = Vec::new();

        for sig in self.registry.code_patterns() {
            for m in sig.regex.find_iter(content) {
                matches.push(new_match(sig, location, Some(line_of(m.start())), None));
            }
        }

        for sig in self.registry.path_patterns() {
            if sig.regex.is_match(content) {
                matches.push(new_match(sig, location, None, None));
            }
        }

        for sig in self.registry.network_patterns() {
            for m in sig.regex.find_iter(content) {
                matches.push(new_match(sig, location, None, Some(m.as_str().to_string())));
            }
        }

        matches
    }

    /// Scan one file. Unrecognised extensions yield an empty result without
    /// the file being opened.
    pub fn scan_file(&self, path: &Path) -> AuditResult<Vec<String>> {
        if !is_scannable(path) {
            return Ok(Vec::new());
        }
        self.scan_file_unfiltered(path, &path.to_string_lossy())
    }

    fn scan_file_unfiltered(&self, path: &Path, location: &str) -> AuditResult<Vec<String>> {
        let io_err = |source| AuditError::ScanIo {
            path: path.to_path_buf(),
            source,
        };

        let size = self.reader.size(path).map_err(io_err)?;
        if size > self.limits.max_file_bytes {
            return Err(io_err(io::Error::other(format!(
                "file is {} bytes, limit is {}",
                size, self.limits.max_file_bytes
            ))));
        }

        let bytes = self.reader.read(path).map_err(io_err)?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(self
            .scan_content(&content, location)
            .iter()
            .map(PatternMatch::describe)
            .collect())
    }

    /// Scan every `*.py` file under `root` in sorted order, then the root
    /// high-value files. High-value files are still checked after the
    /// budget runs out. Keys are relative to `root`.
    pub fn scan_tree(&self, root: &Path) -> TreeScan {
        let mut scan = TreeScan::default();
        self.walk_into(&mut scan, root, root, Instant::now());
        scan
    }

    /// Scan every install root of a package under one budget. Directories
    /// are walked like [`Self::scan_tree`]; single-file modules are scanned
    /// directly. Keys are relative to the site directory.
    pub fn scan_footprint(&self, footprint: &InstallFootprint) -> TreeScan {
        let started = Instant::now();
        let mut scan = TreeScan::default();
        let site = footprint.site_dir.as_path();

        for root in &footprint.roots {
            if root.is_dir() {
                self.walk_into(&mut scan, root, site, started);
            } else if MODULE_EXTENSIONS.iter().any(|ext| has_extension(root, ext)) {
                if self.out_of_budget(&mut scan, started, root) {
                    continue;
                }
                self.scan_into(&mut scan, root, relative_key(site, root));
            }
        }
        scan
    }

    fn walk_into(&self, scan: &mut TreeScan, root: &Path, key_base: &Path, started: Instant) {
        let mut visited: HashSet<String> = HashSet::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            if self.out_of_budget(scan, started, root) {
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    scan.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_extension(entry.path(), "py") {
                continue;
            }

            let key = relative_key(key_base, entry.path());
            visited.insert(key.clone());
            self.scan_into(scan, entry.path(), key);
        }

        for name in HIGH_VALUE_FILES {
            let path = root.join(name);
            let key = relative_key(key_base, &path);
            if visited.contains(&key) || !path.is_file() {
                continue;
            }
            self.scan_into(scan, &path, key);
        }
    }

    /// Marks the scan partial once the budget is spent; warns only once.
    fn out_of_budget(&self, scan: &mut TreeScan, started: Instant, root: &Path) -> bool {
        if started.elapsed() < self.limits.budget {
            return false;
        }
        if !scan.budget_exhausted {
            tracing::warn!(
                "Scan budget of {:?} exhausted in {}",
                self.limits.budget,
                root.display()
            );
            scan.budget_exhausted = true;
        }
        true
    }

    fn scan_into(&self, scan: &mut TreeScan, path: &Path, key: String) {
        match self.scan_file_unfiltered(path, &key) {
            Ok(found) if !found.is_empty() => scan.files.insert(key, found),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Error scanning {}: {}", path.display(), e);
                scan.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Findings for an installed package across all of its install roots.
    /// A package that is not installed has nothing to scan.
    pub fn scan_package(&self, inventory: &EnvironmentInventory, name: &str) -> SuspiciousFiles {
        match inventory.install_footprint(name) {
            Some(footprint) => self.scan_footprint(&footprint).files,
            None => SuspiciousFiles::new(),
        }
    }
}

fn new_match(
    sig: &SuspectPattern,
    location: &str,
    line_number: Option<usize>,
    matched_text: Option<String>,
) -> PatternMatch {
    PatternMatch {
        kind: sig.kind,
        pattern: sig.pattern.clone(),
        location: location.to_string(),
        line_number,
        matched_text,
    }
}

pub fn is_scannable(path: &Path) -> bool {
    SCANNABLE_EXTENSIONS
        .iter()
        .any(|ext| has_extension(path, ext))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Root-relative path with `/` separators.
fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
