//! Environment variable readers used by the typed config in `schema`.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Load `.env` from the working directory, once per process.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        load_dotenv_from_dir(&dir);
    });
}

/// Apply `<dir>/.env`. Variables already present in the environment win.
pub fn load_dotenv_from_dir(dir: &Path) {
    let Ok(content) = std::fs::read_to_string(dir.join(".env")) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// `KEY=value` lines. `#` starts a comment unless the value is quoted;
/// one pair of matching quotes around the value is removed.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), unquote(value.trim())))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    match value.split_once('#') {
        Some((before, _)) => before.trim_end(),
        None => value,
    }
}

/// First non-blank value among `key` and its `aliases`, trimmed.
pub fn env_optional(key: &str, aliases: &[&str]) -> Option<String> {
    std::iter::once(key)
        .chain(aliases.iter().copied())
        .filter_map(|k| env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// On/off switch: `0`, `false`, `no` and `off` disable it, any other
/// non-blank value enables it.
pub fn env_flag(key: &str, default: bool) -> bool {
    match env_optional(key, &[]) {
        Some(v) => !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => default,
    }
}

/// `FromStr` value; an unparsable one is logged and `default` used.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    let Some(raw) = env_optional(key, &[]) else {
        return default;
    };
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_quotes_and_comments() {
        let pairs = parse_dotenv(
            "# comment\n\
             PKGAUDIT_JOBS=4 # inline\n\
             PKGAUDIT_PYTHON=\"/opt/py/bin/python3\"\n\
             BROKEN_LINE\n\
             =novalue\n\
             EMPTY=\n",
        );
        assert_eq!(
            pairs,
            vec![
                ("PKGAUDIT_JOBS".to_string(), "4".to_string()),
                ("PKGAUDIT_PYTHON".to_string(), "/opt/py/bin/python3".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_quoted_value_keeps_hash() {
        let pairs = parse_dotenv("PKGAUDIT_PATTERNS='/tmp/a#b.yaml'\n");
        assert_eq!(pairs[0].1, "/tmp/a#b.yaml");
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        env::set_var("PKGAUDIT_TEST_PARSE_GARBAGE", "not-a-number");
        assert_eq!(env_parse("PKGAUDIT_TEST_PARSE_GARBAGE", 7u64), 7);
        env::set_var("PKGAUDIT_TEST_PARSE_GARBAGE", " 12 ");
        assert_eq!(env_parse("PKGAUDIT_TEST_PARSE_GARBAGE", 7u64), 12);
        env::remove_var("PKGAUDIT_TEST_PARSE_GARBAGE");
    }

    #[test]
    fn test_env_optional_aliases_skip_blank_values() {
        env::set_var("PKGAUDIT_TEST_OPT_PRIMARY", "  ");
        env::set_var("PKGAUDIT_TEST_OPT_ALIAS", " /usr/bin/python3 ");
        assert_eq!(
            env_optional("PKGAUDIT_TEST_OPT_PRIMARY", &["PKGAUDIT_TEST_OPT_ALIAS"]).as_deref(),
            Some("/usr/bin/python3")
        );
        env::remove_var("PKGAUDIT_TEST_OPT_PRIMARY");
        env::remove_var("PKGAUDIT_TEST_OPT_ALIAS");
        assert_eq!(env_optional("PKGAUDIT_TEST_OPT_PRIMARY", &[]), None);
    }

    #[test]
    fn test_env_flag() {
        env::set_var("PKGAUDIT_TEST_FLAG", "off");
        assert!(!env_flag("PKGAUDIT_TEST_FLAG", true));
        env::set_var("PKGAUDIT_TEST_FLAG", "1");
        assert!(env_flag("PKGAUDIT_TEST_FLAG", false));
        env::remove_var("PKGAUDIT_TEST_FLAG");
        assert!(env_flag("PKGAUDIT_TEST_FLAG", true));
    }

    #[test]
    fn test_load_dotenv_from_dir_does_not_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "PKGAUDIT_TEST_DOTENV_NEW=from-file\nPKGAUDIT_TEST_DOTENV_SET=from-file\n",
        )
        .unwrap();
        env::set_var("PKGAUDIT_TEST_DOTENV_SET", "from-env");
        load_dotenv_from_dir(dir.path());
        assert_eq!(env::var("PKGAUDIT_TEST_DOTENV_NEW").unwrap(), "from-file");
        assert_eq!(env::var("PKGAUDIT_TEST_DOTENV_SET").unwrap(), "from-env");
        env::remove_var("PKGAUDIT_TEST_DOTENV_NEW");
        env::remove_var("PKGAUDIT_TEST_DOTENV_SET");
    }
}
