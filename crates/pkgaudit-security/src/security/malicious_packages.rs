//! Known-malicious PyPI package names.
//!
//! A statically embedded table checked before any other heuristic. A hit
//! short-circuits the whole per-package pipeline. Entries come from public
//! PyPI takedown reports and advisory databases; extra names can be supplied
//! at runtime through `PatternConfig::deny_list`.

use super::rules::PatternConfig;
use super::types::canonical_name;
use std::collections::BTreeSet;

// (lowercase_name, reason). MUST stay sorted ascending by name: lookups use
// binary search and a unit test checks the order.
static MALICIOUS_PYPI: &[(&str, &str)] = &[
    ("acqusition",       "Typosquat of acquisition; 2017 PyPI takedown"),
    ("aiohttp2",         "Fake aiohttp release"),
    ("apidev-coop",      "Typosquat of apidev-coop_cms; 2017 PyPI takedown"),
    ("bota3",            "Typosquat of boto3"),
    ("bto3",             "Typosquat of boto3"),
    ("colourama",        "Typosquat of colorama; clipboard hijacker (2018)"),
    ("crypt",            "Shadows stdlib crypt; 2017 PyPI takedown"),
    ("cryptograpy",      "Typosquat of cryptography"),
    ("ctx",              "Hijacked 2022: exfiltrated environment variables"),
    ("diango",           "Typosquat of django"),
    ("djago",            "Typosquat of django; 2017 PyPI takedown"),
    ("djang",            "Typosquat of django"),
    ("dpp",              "Companion malware to ctx (2022)"),
    ("falsk",            "Typosquat of flask"),
    ("jeIlyfish",        "Typosquat of jellyfish with capital I; stole SSH/GPG keys (2019)"),
    ("libpeshnx",        "Reverse shell payload; 2019 PyPI takedown"),
    ("nmap-python",      "Typosquat of python-nmap; 2017 PyPI takedown"),
    ("numpyl",           "Typosquat of numpy"),
    ("nunpy",            "Typosquat of numpy"),
    ("openvc",           "Typosquat of opencv-python; 2017 PyPI takedown"),
    ("panads",           "Typosquat of pandas"),
    ("pandaz",           "Typosquat of pandas"),
    ("pilow",            "Typosquat of pillow"),
    ("pycrypto2",        "Fake pycryptodome release"),
    ("python-sqlite",    "Typosquat of sqlite; 2017 PyPI takedown"),
    ("python3-dateutil", "Typosquat of python-dateutil; stole SSH/GPG keys (2019)"),
    ("reqeusts",         "Typosquat of requests (transposed letters)"),
    ("requestz",         "Typosquat of requests"),
    ("setup-tools",      "Typosquat of setuptools"),
    ("setuptool",        "Typosquat of setuptools"),
    ("urlib3",           "Typosquat of urllib3"),
    ("urllib",           "Shadows stdlib urllib; 2017 PyPI takedown"),
];

/// Name lookup over the embedded table plus configured extras.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    extra: BTreeSet<String>,
}

impl DenyList {
    /// The embedded table only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extra: names
                .into_iter()
                .map(|n| canonical_name(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &PatternConfig) -> Self {
        Self::with_extra(&config.deny_list)
    }

    /// Reason the package is denied, or `None`. Names are compared in
    /// normalised form, so case and `-`/`_`/`.` spelling do not matter.
    pub fn check(&self, name: &str) -> Option<&'static str> {
        let canonical = canonical_name(name);
        if let Some(reason) = lookup_builtin(&canonical) {
            return Some(reason);
        }
        if self.extra.contains(&canonical) {
            return Some("listed in configured deny-list");
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.check(name).is_some()
    }
}

fn lookup_builtin(canonical: &str) -> Option<&'static str> {
    MALICIOUS_PYPI
        .binary_search_by(|(pkg, _)| cmp_ignore_case(pkg, canonical))
        .ok()
        .map(|idx| MALICIOUS_PYPI[idx].1)
}

// Table keys may carry deliberate capitals (e.g. the "jeIlyfish" homoglyph
// attack), so order and compare on the lowercased form.
fn cmp_ignore_case(a: &str, b: &str) -> std::cmp::Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
