//! Environment inventory: what is installed in the target interpreter.
//!
//! Reads installed-distribution metadata straight from the site directories
//! (`*.dist-info/METADATA`, `*.egg-info/PKG-INFO`). This is deliberately a
//! different source from the package manager's own listing, which the
//! provenance checker cross-references.
//!
//! Failures degrade: an environment that cannot be enumerated is an empty
//! inventory, and a package that cannot be resolved has no location and
//! empty metadata.

use super::error::{AuditError, AuditResult};
use super::types::{canonical_name, PackageMetadata};
use crate::common::run_with_timeout;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const SYS_PATH_SCRIPT: &str = "import json, sys; print(json.dumps([p for p in sys.path if p]))";
const VERSION_SCRIPT: &str = "import sys; print(sys.version)";

/// One installed distribution found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Declared name, original case
    pub name: String,
    pub version: String,
    /// `*.dist-info` / `*.egg-info` directory, or an `*.egg-info` file
    pub info_path: PathBuf,
    /// Site directory the distribution was found in
    pub site_dir: PathBuf,
}

impl Distribution {
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Top-level entries this distribution owns in its site directory:
    /// package directories and single-file modules that exist on disk,
    /// sorted.
    ///
    /// Taken from the install manifest (`RECORD`, or `installed-files.txt`
    /// for egg-info) together with the `top_level.txt` import names and the
    /// normalised distribution name, each tried as `<name>/` and
    /// `<name>.py`.
    pub fn install_roots(&self) -> Vec<PathBuf> {
        let mut names = self.manifest_top_levels();
        names.extend(top_level_names(self));

        let mut roots = BTreeSet::new();
        for name in names {
            let path = self.site_dir.join(&name);
            if path.exists() {
                roots.insert(path);
            }
            let module = self.site_dir.join(format!("{}.py", name));
            if module.is_file() {
                roots.insert(module);
            }
        }
        roots.into_iter().collect()
    }

    fn manifest_top_levels(&self) -> BTreeSet<String> {
        let mut tops = BTreeSet::new();
        if !self.info_path.is_dir() {
            return tops;
        }
        let Some(info_name) = self.info_path.file_name().and_then(|n| n.to_str()) else {
            return tops;
        };

        if let Ok(record) = fs::read_to_string(self.info_path.join("RECORD")) {
            // RECORD paths are relative to the site directory
            tops.extend(
                record
                    .lines()
                    .filter_map(record_path)
                    .filter_map(|entry| top_component(&[], &entry)),
            );
        } else if let Ok(listing) = fs::read_to_string(self.info_path.join("installed-files.txt")) {
            // installed-files.txt paths are relative to the egg-info directory
            tops.extend(
                listing
                    .lines()
                    .filter_map(|entry| top_component(&[info_name], entry.trim())),
            );
        }

        tops.retain(|top| {
            top != info_name
                && top != "__pycache__"
                && !top.ends_with(".dist-info")
                && !top.ends_with(".egg-info")
                && !top.ends_with(".data")
        });
        tops
    }

    fn metadata_file(&self) -> PathBuf {
        if self.info_path.is_file() {
            return self.info_path.clone();
        }
        let metadata = self.info_path.join("METADATA");
        if metadata.is_file() {
            metadata
        } else {
            self.info_path.join("PKG-INFO")
        }
    }
}

/// Where an installed package's code lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFootprint {
    pub site_dir: PathBuf,
    /// Package directories and single-file modules directly under `site_dir`
    pub roots: Vec<PathBuf>,
}

pub struct EnvironmentInventory {
    site_dirs: Vec<PathBuf>,
    snapshot: RwLock<Option<Arc<Vec<Distribution>>>>,
}

impl EnvironmentInventory {
    pub fn new(site_dirs: Vec<PathBuf>) -> Self {
        Self {
            site_dirs,
            snapshot: RwLock::new(None),
        }
    }

    pub fn site_dirs(&self) -> &[PathBuf] {
        &self.site_dirs
    }

    /// Take a fresh snapshot and return `lowercase name -> version`.
    pub fn try_list_installed_packages(&self) -> AuditResult<BTreeMap<String, String>> {
        let result = self.enumerate();
        let dists = Arc::new(result.as_ref().cloned().unwrap_or_default());
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = Some(dists.clone());
        }
        result?;
        Ok(dists
            .iter()
            .map(|d| (d.key(), d.version.clone()))
            .collect())
    }

    /// Like [`Self::try_list_installed_packages`], but an enumeration
    /// failure is logged and yields an empty inventory.
    pub fn list_installed_packages(&self) -> BTreeMap<String, String> {
        match self.try_list_installed_packages() {
            Ok(packages) => packages,
            Err(e) => {
                tracing::error!("Error getting installed packages: {}", e);
                BTreeMap::new()
            }
        }
    }

    /// Installed distribution for `name`, compared in normalised form.
    pub fn find(&self, name: &str) -> Option<Distribution> {
        let wanted = canonical_name(name);
        self.current_snapshot()
            .iter()
            .find(|d| canonical_name(&d.name) == wanted)
            .cloned()
    }

    /// Primary install location: the first package directory, else the
    /// first single-file module.
    pub fn locate_package(&self, name: &str) -> Option<PathBuf> {
        let roots = self.find(name)?.install_roots();
        roots
            .iter()
            .find(|root| root.is_dir())
            .or_else(|| roots.first())
            .cloned()
    }

    /// Everything the package installed at the top of its site directory.
    /// `None` when the package is not installed.
    pub fn install_footprint(&self, name: &str) -> Option<InstallFootprint> {
        let dist = self.find(name)?;
        Some(InstallFootprint {
            roots: dist.install_roots(),
            site_dir: dist.site_dir,
        })
    }

    pub fn try_get_metadata(&self, name: &str) -> AuditResult<PackageMetadata> {
        let dist = self.find(name).ok_or_else(|| AuditError::Lookup {
            name: name.to_string(),
            reason: "package not found".to_string(),
        })?;
        let path = dist.metadata_file();
        let bytes = fs::read(&path).map_err(|e| AuditError::Lookup {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(parse_metadata(&String::from_utf8_lossy(&bytes)))
    }

    /// Declared metadata; empty fields when the package cannot be resolved.
    pub fn get_metadata(&self, name: &str) -> PackageMetadata {
        match self.try_get_metadata(name) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Error getting metadata for {}: {}", name, e);
                PackageMetadata::default()
            }
        }
    }

    fn current_snapshot(&self) -> Arc<Vec<Distribution>> {
        if let Ok(guard) = self.snapshot.read() {
            if let Some(dists) = guard.as_ref() {
                return dists.clone();
            }
        }
        let _ = self.try_list_installed_packages();
        self.snapshot
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Walk every site directory. Earlier directories shadow later ones,
    /// as they would on the interpreter's import path. Missing site
    /// directories are skipped; unreadable ones fail the enumeration.
    fn enumerate(&self) -> AuditResult<Vec<Distribution>> {
        let mut dists: Vec<Distribution> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for site_dir in &self.site_dirs {
            let entries = match fs::read_dir(site_dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("Site directory {} does not exist", site_dir.display());
                    continue;
                }
                Err(e) => {
                    return Err(AuditError::EnvironmentEnumeration(format!(
                        "{}: {}",
                        site_dir.display(),
                        e
                    )))
                }
            };

            let mut info_paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_info_path(p))
                .collect();
            info_paths.sort();

            for info_path in info_paths {
                let Some(dist) = read_distribution(site_dir, &info_path) else {
                    continue;
                };
                if seen.insert(canonical_name(&dist.name)) {
                    dists.push(dist);
                }
            }
        }

        Ok(dists)
    }
}

fn is_info_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(".dist-info") || n.ends_with(".egg-info"))
        .unwrap_or(false)
}

fn read_distribution(site_dir: &Path, info_path: &Path) -> Option<Distribution> {
    let mut dist = Distribution {
        name: String::new(),
        version: String::new(),
        info_path: info_path.to_path_buf(),
        site_dir: site_dir.to_path_buf(),
    };

    match fs::read(dist.metadata_file()) {
        Ok(bytes) => {
            let meta = parse_metadata(&String::from_utf8_lossy(&bytes));
            dist.name = meta.name;
            dist.version = meta.version;
        }
        Err(e) => {
            tracing::debug!("No readable metadata in {}: {}", info_path.display(), e);
        }
    }

    if dist.name.is_empty() || dist.version.is_empty() {
        let (name, version) = split_info_dir_name(info_path)?;
        if dist.name.is_empty() {
            dist.name = name;
        }
        if dist.version.is_empty() {
            dist.version = version;
        }
    }

    if dist.name.is_empty() {
        None
    } else {
        Some(dist)
    }
}

/// `foo_bar-1.2.dist-info` -> ("foo_bar", "1.2")
fn split_info_dir_name(info_path: &Path) -> Option<(String, String)> {
    let file_name = info_path.file_name()?.to_str()?;
    let stem = file_name
        .strip_suffix(".dist-info")
        .or_else(|| file_name.strip_suffix(".egg-info"))?;
    let mut parts = stem.splitn(3, '-');
    let name = parts.next().unwrap_or_default().to_string();
    let version = parts.next().unwrap_or_default().to_string();
    Some((name, version))
}

/// First CSV field of a `RECORD` line. Paths containing a comma are
/// quoted, with `""` standing for a literal quote.
fn record_path(line: &str) -> Option<String> {
    let line = line.trim_end();
    let Some(quoted) = line.strip_prefix('"') else {
        let path = line.split(',').next().unwrap_or_default();
        return (!path.is_empty()).then(|| path.to_string());
    };
    let mut path = String::new();
    let mut chars = quoted.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                path.push('"');
            } else {
                return Some(path);
            }
        } else {
            path.push(c);
        }
    }
    None
}

/// First component of `entry`, a path relative to `base` inside the site
/// directory, after resolving `.` and `..`. `None` for absolute paths and
/// paths that leave the site directory.
fn top_component(base: &[&str], entry: &str) -> Option<String> {
    if entry.is_empty()
        || entry.starts_with(['/', '\\'])
        || entry.as_bytes().get(1) == Some(&b':')
    {
        return None;
    }
    let mut stack: Vec<&str> = base.to_vec();
    for part in entry.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            part => stack.push(part),
        }
    }
    stack.first().map(|top| top.to_string())
}

/// Candidate top-level import names: `top_level.txt` entries, then the
/// distribution name normalised to an identifier.
fn top_level_names(dist: &Distribution) -> Vec<String> {
    let mut names = Vec::new();
    if dist.info_path.is_dir() {
        if let Ok(content) = fs::read_to_string(dist.info_path.join("top_level.txt")) {
            names.extend(
                content
                    .lines()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty()),
            );
        }
    }
    let normalised = dist.name.replace(['-', '.'], "_");
    for candidate in [normalised.clone(), normalised.to_lowercase()] {
        if !names.contains(&candidate) {
            names.push(candidate);
        }
    }
    names
}

/// Parse the RFC 822 style header block of `METADATA` / `PKG-INFO`.
/// Stops at the first blank line (the long description follows it).
pub fn parse_metadata(content: &str) -> PackageMetadata {
    let mut meta = PackageMetadata::default();
    let mut project_home = String::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "Name" if meta.name.is_empty() => meta.name = value,
            "Version" if meta.version.is_empty() => meta.version = value,
            "Author" if meta.author.is_empty() => meta.author = value,
            "Author-email" if meta.author_email.is_empty() => meta.author_email = value,
            "Home-page" if meta.home_page.is_empty() => meta.home_page = value,
            "Summary" if meta.summary.is_empty() => meta.summary = value,
            "Project-URL" if project_home.is_empty() => {
                if let Some((label, url)) = value.split_once(',') {
                    if label.trim().eq_ignore_ascii_case("homepage") {
                        project_home = url.trim().to_string();
                    }
                }
            }
            _ => {}
        }
    }

    if meta.home_page.is_empty() {
        meta.home_page = project_home;
    }
    meta
}

/// Interpreter to audit: the configured one, else `python3` or `python`
/// found on `PATH`.
pub fn resolve_python(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(p) = configured {
        return Some(PathBuf::from(p));
    }
    ["python3", "python"]
        .iter()
        .find_map(|candidate| which::which(candidate).ok())
}

/// Ask the interpreter for its `sys.path` and keep the existing directories.
pub fn discover_site_dirs(python: &Path, timeout: Duration) -> AuditResult<Vec<PathBuf>> {
    let mut cmd = Command::new(python);
    cmd.args(["-c", SYS_PATH_SCRIPT]);
    let output = run_with_timeout(&mut cmd, timeout)?;
    if !output.success() {
        return Err(AuditError::EnvironmentEnumeration(format!(
            "{} exited with {}: {}",
            python.display(),
            output.exit_code,
            output.stderr.trim()
        )));
    }
    let paths: Vec<String> =
        serde_json::from_str(output.stdout.trim()).map_err(|e| AuditError::MalformedOutput {
            command: format!("{} -c <sys.path>", python.display()),
            reason: e.to_string(),
        })?;
    Ok(paths
        .into_iter()
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
        .collect())
}

/// `sys.version` of the interpreter, first line only.
pub fn interpreter_version(python: &Path, timeout: Duration) -> AuditResult<String> {
    let mut cmd = Command::new(python);
    cmd.args(["-c", VERSION_SCRIPT]);
    let output = run_with_timeout(&mut cmd, timeout)?;
    if !output.success() {
        return Err(AuditError::CommandFailed {
            command: format!("{} -c <sys.version>", python.display()),
            reason: format!("exited with {}: {}", output.exit_code, output.stderr.trim()),
        });
    }
    Ok(output.stdout.lines().next().unwrap_or_default().trim().to_string())
}


#[cfg(test)]
mod tests {
    use super::test_support::install_fake_package;
    use super::*;

    #[test]
    fn test_list_installed_packages_lowercases_and_sorts() {
        let site = tempfile::tempdir().unwrap();
        install_fake_package(site.path(), "Zeta", "0.1");
        install_fake_package(site.path(), "alpha", "1.0");
        install_fake_package(site.path(), "evil-pkg", "2.0");

        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);
        let packages = inv.list_installed_packages();
        let names: Vec<&str> = packages.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["alpha", "evil-pkg", "zeta"]);
        assert_eq!(packages["evil-pkg"], "2.0");
    }

    #[test]
    fn test_earlier_site_dir_shadows_later() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        install_fake_package(first.path(), "alpha", "2.0");
        install_fake_package(second.path(), "alpha", "1.0");
        let inv = EnvironmentInventory::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(inv.list_installed_packages()["alpha"], "2.0");
        assert_eq!(
            inv.locate_package("alpha").unwrap(),
            first.path().join("alpha")
        );
    }

    #[test]
    fn test_missing_site_dir_is_empty_not_error() {
        let inv = EnvironmentInventory::new(vec![PathBuf::from("/nonexistent/site-packages")]);
        assert!(inv.try_list_installed_packages().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_site_dir_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("file");
        fs::write(&not_a_dir, "x").unwrap();
        let inv = EnvironmentInventory::new(vec![not_a_dir]);
        assert!(matches!(
            inv.try_list_installed_packages(),
            Err(AuditError::EnvironmentEnumeration(_))
        ));
        assert!(inv.list_installed_packages().is_empty());
    }

    #[test]
    fn test_locate_and_metadata() {
        let site = tempfile::tempdir().unwrap();
        let pkg_dir = install_fake_package(site.path(), "evil-pkg", "2.0");
        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);

        assert_eq!(inv.locate_package("EVIL-PKG").unwrap(), pkg_dir);
        let meta = inv.get_metadata("evil-pkg");
        assert_eq!(meta.name, "evil-pkg");
        assert_eq!(meta.version, "2.0");
        assert_eq!(meta.summary, "fake evil-pkg");
        assert_eq!(meta.author, "Test Author");

        assert!(inv.locate_package("missing").is_none());
        assert_eq!(inv.get_metadata("missing"), PackageMetadata::default());
        assert!(matches!(
            inv.try_get_metadata("missing"),
            Err(AuditError::Lookup { .. })
        ));
    }

    /// `<name>-<version>.dist-info` with the given extra files.
    fn write_dist_info(site: &Path, name: &str, version: &str, files: &[(&str, &str)]) -> PathBuf {
        let info = site.join(format!("{}-{}.dist-info", name, version));
        fs::create_dir_all(&info).unwrap();
        fs::write(
            info.join("METADATA"),
            format!("Name: {}\nVersion: {}\n", name, version),
        )
        .unwrap();
        for (file, content) in files {
            fs::write(info.join(file), content).unwrap();
        }
        info
    }

    #[test]
    fn test_single_module_distribution_is_an_install_root() {
        let site = tempfile::tempdir().unwrap();
        write_dist_info(
            site.path(),
            "six",
            "1.16.0",
            &[
                ("top_level.txt", "six\n"),
                (
                    "RECORD",
                    "six.py,sha256=abc,34549\n__pycache__/six.cpython-311.pyc,,\nsix-1.16.0.dist-info/RECORD,,\n",
                ),
            ],
        );
        fs::write(site.path().join("six.py"), "").unwrap();

        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);
        assert_eq!(inv.list_installed_packages()["six"], "1.16.0");
        assert_eq!(inv.locate_package("six"), Some(site.path().join("six.py")));
        let footprint = inv.install_footprint("six").unwrap();
        assert_eq!(footprint.site_dir, site.path());
        assert_eq!(footprint.roots, vec![site.path().join("six.py")]);
    }

    #[test]
    fn test_module_found_from_top_level_without_record() {
        let site = tempfile::tempdir().unwrap();
        write_dist_info(site.path(), "reqeustz", "1.0", &[("top_level.txt", "reqeustz\n")]);
        fs::write(site.path().join("reqeustz.py"), "").unwrap();

        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);
        assert_eq!(
            inv.install_footprint("reqeustz").unwrap().roots,
            vec![site.path().join("reqeustz.py")]
        );
    }

    #[test]
    fn test_every_top_level_root_is_listed() {
        let site = tempfile::tempdir().unwrap();
        let root = site.path();
        write_dist_info(
            root,
            "multi",
            "1.0",
            &[
                ("top_level.txt", "aaa_helper\nmulti\n"),
                (
                    "RECORD",
                    "multi/__init__.py,sha256=x,1\n\
                     solo.py,sha256=y,2\n\
                     \"odd,name/x.py\",sha256=z,3\n\
                     ../../../bin/multi-cli,sha256=w,4\n\
                     /usr/share/doc/multi.txt,,\n\
                     multi-1.0.dist-info/METADATA,,\n\
                     missing_dir/gone.py,,\n",
                ),
            ],
        );
        for dir in ["aaa_helper", "multi", "odd,name"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("solo.py"), "").unwrap();

        let inv = EnvironmentInventory::new(vec![root.to_path_buf()]);
        let footprint = inv.install_footprint("multi").unwrap();
        assert_eq!(
            footprint.roots,
            vec![
                root.join("aaa_helper"),
                root.join("multi"),
                root.join("odd,name"),
                root.join("solo.py"),
            ]
        );
        assert_eq!(inv.locate_package("multi"), Some(root.join("aaa_helper")));
        assert!(inv.install_footprint("missing").is_none());
    }

    #[test]
    fn test_import_name_differs_from_distribution_name() {
        let site = tempfile::tempdir().unwrap();
        write_dist_info(site.path(), "beautifulsoup4", "4.12.3", &[("top_level.txt", "bs4\n")]);
        fs::create_dir_all(site.path().join("bs4")).unwrap();
        // no manifest and no top_level.txt: the normalised name is tried
        write_dist_info(site.path(), "my.plugin", "0.1", &[]);
        fs::create_dir_all(site.path().join("my_plugin")).unwrap();

        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);
        assert_eq!(inv.locate_package("beautifulsoup4"), Some(site.path().join("bs4")));
        assert_eq!(inv.locate_package("My.Plugin"), Some(site.path().join("my_plugin")));
    }

    #[test]
    fn test_installed_files_txt_for_egg_info() {
        let site = tempfile::tempdir().unwrap();
        let info = site.path().join("legacy-0.3-py3.11.egg-info");
        fs::create_dir_all(&info).unwrap();
        fs::write(info.join("PKG-INFO"), "Name: legacy\nVersion: 0.3\n").unwrap();
        fs::write(
            info.join("installed-files.txt"),
            "../legacy/__init__.py\n../legacy_mod.py\n./\nPKG-INFO\n../../../../bin/legacy\n",
        )
        .unwrap();
        fs::create_dir_all(site.path().join("legacy")).unwrap();
        fs::write(site.path().join("legacy_mod.py"), "").unwrap();

        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);
        assert_eq!(
            inv.install_footprint("legacy").unwrap().roots,
            vec![site.path().join("legacy"), site.path().join("legacy_mod.py")]
        );
    }

    #[test]
    fn test_find_uses_normalised_names() {
        let site = tempfile::tempdir().unwrap();
        install_fake_package(site.path(), "python3_dateutil", "2.8");
        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);
        assert_eq!(inv.find("Python3-DateUtil").unwrap().version, "2.8");
        assert_eq!(inv.find("python3.dateutil").unwrap().name, "python3_dateutil");
    }

    #[test]
    fn test_record_path_and_top_component() {
        assert_eq!(record_path("a/b.py,sha256=x,1").as_deref(), Some("a/b.py"));
        assert_eq!(record_path(r#""a,""b""/c.py",,"#).as_deref(), Some(r#"a,"b"/c.py"#));
        assert_eq!(record_path("\"unterminated"), None);
        assert_eq!(record_path(""), None);

        assert_eq!(top_component(&[], "pkg/sub/m.py").as_deref(), Some("pkg"));
        assert_eq!(top_component(&[], "./pkg/../mod.py").as_deref(), Some("mod.py"));
        assert_eq!(top_component(&[], "../bin/tool"), None);
        assert_eq!(top_component(&[], "/usr/bin/tool"), None);
        assert_eq!(top_component(&[], r"C:\bin\tool"), None);
        assert_eq!(top_component(&["x.egg-info"], "../mod.py").as_deref(), Some("mod.py"));
        assert_eq!(top_component(&["x.egg-info"], "PKG-INFO").as_deref(), Some("x.egg-info"));
    }

    #[test]
    fn test_egg_info_file_and_dir_name_fallback() {
        let site = tempfile::tempdir().unwrap();
        fs::write(
            site.path().join("legacy-0.3.egg-info"),
            "Metadata-Version: 1.0\nName: legacy\nVersion: 0.3\n",
        )
        .unwrap();
        // no METADATA at all: name and version come from the directory name
        fs::create_dir_all(site.path().join("bare_pkg-4.5.dist-info")).unwrap();

        let inv = EnvironmentInventory::new(vec![site.path().to_path_buf()]);
        let packages = inv.list_installed_packages();
        assert_eq!(packages["legacy"], "0.3");
        assert_eq!(packages["bare_pkg"], "4.5");
    }

    #[test]
    fn test_parse_metadata_project_url_homepage() {
        let meta = parse_metadata(
            "Name: x\nVersion: 1\nSummary: first\n  continued\nProject-URL: Source, https://src\nProject-URL: Homepage, https://home\n",
        );
        assert_eq!(meta.summary, "first");
        assert_eq!(meta.home_page, "https://home");
    }

    #[test]
    fn test_resolve_python_prefers_configured() {
        assert_eq!(
            resolve_python(Some("/opt/py/bin/python3")),
            Some(PathBuf::from("/opt/py/bin/python3"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_interpreter_version_first_line() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let python = dir.path().join("python3");
        fs::write(
            &python,
            "#!/bin/sh\necho '3.11.4 (main, Jun  7 2023, 10:13:09) '\necho '[GCC 12.2.0]'\n",
        )
        .unwrap();
        fs::set_permissions(&python, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(
            interpreter_version(&python, Duration::from_secs(10)).unwrap(),
            "3.11.4 (main, Jun  7 2023, 10:13:09)"
        );

        let broken = dir.path().join("python-broken");
        fs::write(&broken, "#!/bin/sh\nexit 2\n").unwrap();
        fs::set_permissions(&broken, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(
            interpreter_version(&broken, Duration::from_secs(10)),
            Err(AuditError::CommandFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_site_dirs_failure_is_error() {
        let err = discover_site_dirs(Path::new("/nonexistent/python3"), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, AuditError::CommandFailed { .. }));
    }
}
