//! Built-in signature sets and the legitimate-name catalogue.
//!
//! Signatures are indicators of capability, not proof of malice. All of
//! them are compiled case-insensitively.

/// Dynamic execution, process spawning, raw sockets, outbound HTTP, opaque
/// data decoding and low-level system API access.
pub const DEFAULT_CODE_PATTERNS: &[&str] = &[
    // dynamic execution / compilation / import
    r"eval\s*\(",
    r"exec\s*\(",
    r"__import__\s*\(",
    r"compile\s*\(",
    // process and OS command execution
    r"subprocess\.",
    r"os\.system\s*\(",
    r"os\.popen\s*\(",
    // outbound network
    r"urllib\.request\.urlopen",
    r"requests\.get\s*\(",
    r"requests\.post\s*\(",
    r"socket\.socket\s*\(",
    // opaque payload decoding
    r"base64\.b64decode",
    r"pickle\.loads",
    r"marshal\.loads",
    // native / registry / input hooking
    r"ctypes\.",
    r"winreg\.",
    r"keyboard\.",
    r"pynput\.",
];

/// OS-sensitive directories and credential-bearing names. Reported once per
/// file.
pub const DEFAULT_PATH_PATTERNS: &[&str] = &[
    r"C:\\Windows\\System32",
    r"C:\\Windows\\SysWOW64",
    r"C:\\ProgramData",
    r"\.ssh",
    r"\.aws",
    r"credentials",
    r"password",
    r"token",
    r"api[_-]?key",
];

/// Raw-IP URLs, free dynamic-DNS style TLDs and paste hosts.
pub const DEFAULT_NETWORK_PATTERNS: &[&str] = &[
    r"http://[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}",
    r"https?://[a-z0-9-]+\.(tk|ml|ga|cf|gq)",
    r"pastebin\.com",
    r"paste\.ee",
    r"hastebin\.com",
];

/// Well-known package names used only as typosquatting reference points.
pub const DEFAULT_LEGITIMATE_PACKAGES: &[&str] = &[
    "requests",
    "numpy",
    "pandas",
    "matplotlib",
    "scikit-learn",
    "tensorflow",
    "pytorch",
    "flask",
    "django",
    "pillow",
    "beautifulsoup4",
    "selenium",
    "scrapy",
];

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    #[test]
    fn test_all_default_patterns_compile() {
        for p in DEFAULT_CODE_PATTERNS
            .iter()
            .chain(DEFAULT_PATH_PATTERNS)
            .chain(DEFAULT_NETWORK_PATTERNS)
        {
            assert!(
                RegexBuilder::new(p).case_insensitive(true).build().is_ok(),
                "pattern failed to compile: {}",
                p
            );
        }
    }

    #[test]
    fn test_legitimate_names_are_lowercase_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for name in DEFAULT_LEGITIMATE_PACKAGES {
            assert_eq!(*name, name.to_lowercase());
            assert!(seen.insert(*name), "duplicate legitimate name {}", name);
        }
    }
}
