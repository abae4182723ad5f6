//! Child process configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variables the child inherits from the server by default.
///
/// Only a minimal set is passed through so server-side secrets do not leak
/// into the browser-driven shell.
pub const DEFAULT_INHERITED_ENV: &[&str] = &[
    "HOME", "USER", "LOGNAME", "SHELL", "PATH", "LANG", "LC_ALL", "LC_CTYPE", "TMPDIR",
];

/// The command spawned under the PTY for each connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Program path. Empty string means `$SHELL`, falling back to `/bin/sh`.
    pub program: String,
    pub args: Vec<String>,
    /// Initial working directory. `None` means inherit from the server.
    pub working_directory: Option<String>,
    /// Extra environment variables injected into the child.
    pub env: HashMap<String, String>,
    /// Names of server environment variables copied into the child.
    pub inherit_env: Vec<String>,
    /// Value of `TERM` in the child.
    pub term: String,
    /// Size of the PTY before the browser sends its first resize.
    pub initial_cols: u16,
    pub initial_rows: u16,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            working_directory: None,
            env: HashMap::new(),
            inherit_env: DEFAULT_INHERITED_ENV.iter().map(|s| s.to_string()).collect(),
            term: "xterm-256color".into(),
            initial_cols: 80,
            initial_rows: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_config_defaults() {
        let config = ProcessConfig::default();
        assert!(config.program.is_empty());
        assert!(config.args.is_empty());
        assert!(config.working_directory.is_none());
        assert_eq!(config.initial_cols, 80);
        assert_eq!(config.initial_rows, 24);
        assert!(config.inherit_env.iter().any(|k| k == "PATH"));
    }

    #[test]
    fn inherited_env_excludes_secrets() {
        for var in DEFAULT_INHERITED_ENV {
            let lower = var.to_lowercase();
            for needle in ["key", "secret", "token", "password"] {
                assert!(
                    !lower.contains(needle),
                    "DEFAULT_INHERITED_ENV should not contain '{var}'"
                );
            }
        }
    }

    #[test]
    fn process_config_partial_toml() {
        let toml_str = r#"
program = "/usr/bin/python3"
args = ["-i"]

[env]
PYTHONUNBUFFERED = "1"
"#;
        let config: ProcessConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.program, "/usr/bin/python3");
        assert_eq!(config.args, vec!["-i"]);
        assert_eq!(config.env.get("PYTHONUNBUFFERED").unwrap(), "1");
        assert_eq!(config.term, "xterm-256color");
    }
}
