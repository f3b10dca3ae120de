//! Boot-time configuration, loaded from a TOML file.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Number of dispatch worker threads.
    #[serde(default = "default_thread")]
    pub thread: usize,
    /// This node's harbor id. `0` for a single-node deployment.
    #[serde(default)]
    pub harbor: u8,
    /// `"module args..."` launched once the kernel is built, e.g.
    /// `"echo"`. Left unset, the runtime starts with no services and
    /// waits to be driven externally.
    #[serde(default)]
    pub bootstrap: Option<String>,
    /// Seeds the `GETENV`/`SETENV` table at boot.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_thread() -> usize {
    4
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_a_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skynet.toml");
        std::fs::write(&path, "").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.thread, 4);
        assert_eq!(config.harbor, 0);
        assert!(config.bootstrap.is_none());
        assert!(config.env.is_empty());
    }

    #[test]
    fn full_config_parses_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skynet.toml");
        std::fs::write(
            &path,
            r#"
            thread = 8
            harbor = 2
            bootstrap = "echo"

            [env]
            root = "/srv/skynet"
            "#,
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.thread, 8);
        assert_eq!(config.harbor, 2);
        assert_eq!(config.bootstrap.as_deref(), Some("echo"));
        assert_eq!(config.env.get("root").map(String::as_str), Some("/srv/skynet"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/skynet.toml");
        assert!(Config::load(path).is_err());
    }
}
