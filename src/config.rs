use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::http::limits::Limits;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "COURIER_CONFIG";
/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "PORT";

pub const DEFAULT_PORT: u16 = 42069;

/// Server configuration.
///
/// ```yaml
/// port: 8080
/// limits:
///   max_header_bytes: 16384
///   max_body_bytes: 1048576
///   read_timeout_secs: 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            limits: Limits::default(),
        }
    }
}

impl Config {
    /// Loads from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Loads using `env` to look up variables: the file named by
    /// `COURIER_CONFIG` if set, defaults otherwise, then `PORT` on top.
    pub fn load_with<F>(env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match env(CONFIG_ENV) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(port) = env(PORT_ENV) {
            cfg.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid {} value {:?}", PORT_ENV, port))?;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("in config {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("parsing config")
    }
}
