//! Credential resolution from the process environment and an optional
//! `.env` definitions file.

use std::env;
use std::fs;
use std::path::Path;

/// The environment variable holding the model provider API key.
pub const CREDENTIAL_VAR: &str = "GOOGLE_API_KEY";

/// Parses `.env`-style content into key/value pairs.
///
/// Rules: blank lines and `#` comments are skipped, the first `=` splits key
/// from value, both sides are trimmed, and one layer of surrounding double or
/// single quotes is stripped from the value. Lines without `=` are ignored.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        pairs.push((key.to_string(), strip_quotes(value.trim()).to_string()));
    }
    pairs
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Loads definitions from `path` into the process environment. Variables
/// already present in the environment win over the file; a missing file is a
/// normal state, not an error.
pub fn load_env_file(path: &Path) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_env_file(&content) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// Resolves the API credential for a session: the environment first, with a
/// `.env` file beside `base_path` filling in anything missing. Returns `None`
/// when no non-empty credential is available anywhere.
pub fn resolve_credential(base_path: &Path) -> Option<String> {
    load_env_file(&base_path.join(".env"));
    env::var(CREDENTIAL_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let content = "# a comment\n\nKEY_ONE=alpha\n  # indented comment\nKEY_TWO=beta\n";
        let pairs = parse_env_file(content);
        assert_eq!(
            pairs,
            vec![
                ("KEY_ONE".to_string(), "alpha".to_string()),
                ("KEY_TWO".to_string(), "beta".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_strips_quotes_and_whitespace() {
        let pairs = parse_env_file("A = \"double quoted\" \nB='single quoted'\nC=plain\n");
        assert_eq!(pairs[0], ("A".to_string(), "double quoted".to_string()));
        assert_eq!(pairs[1], ("B".to_string(), "single quoted".to_string()));
        assert_eq!(pairs[2], ("C".to_string(), "plain".to_string()));
    }

    #[test]
    fn test_parse_ignores_lines_without_equals() {
        let pairs = parse_env_file("not a definition\nKEY=value\n=no-key\n");
        assert_eq!(pairs, vec![("KEY".to_string(), "value".to_string())]);
    }

    #[test]
    fn test_parse_splits_on_first_equals_only() {
        let pairs = parse_env_file("KEY=abc=def\n");
        assert_eq!(pairs, vec![("KEY".to_string(), "abc=def".to_string())]);
    }

    #[test]
    fn test_load_env_file_does_not_overwrite_existing() {
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(&env_path, "RADSCAN_TEST_PRESET=from-file\nRADSCAN_TEST_FRESH=new\n")
            .unwrap();

        env::set_var("RADSCAN_TEST_PRESET", "from-env");
        load_env_file(&env_path);

        assert_eq!(env::var("RADSCAN_TEST_PRESET").unwrap(), "from-env");
        assert_eq!(env::var("RADSCAN_TEST_FRESH").unwrap(), "new");

        env::remove_var("RADSCAN_TEST_PRESET");
        env::remove_var("RADSCAN_TEST_FRESH");
    }

    #[test]
    fn test_load_env_file_missing_file_is_fine() {
        let dir = tempdir().unwrap();
        // Must not panic or error.
        load_env_file(&dir.path().join("does-not-exist.env"));
    }
}
