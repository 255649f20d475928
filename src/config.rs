use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::responder::UnmatchedPolicy;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "GZHTTPD_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Pending connections queued by the kernel before `accept`.
    pub backlog: u32,
    /// Unset means a read blocks until the peer sends something.
    pub read_timeout_secs: Option<u64>,
    pub write_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9999,
            backlog: 2,
            read_timeout_secs: None,
            write_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Gzip-compressed HTML served for `/`.
    pub asset: PathBuf,
    /// Raw inbound requests, appended.
    pub request_log: PathBuf,
    /// Last outbound response, overwritten.
    pub response_log: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            asset: PathBuf::from("static/html/index.html.gz"),
            request_log: PathBuf::from("log/server.log"),
            response_log: PathBuf::from("log/response.log"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub unmatched: UnmatchedPolicy,
}

impl Config {
    /// Loads the YAML file named by `GZHTTPD_CONFIG` if set, then applies
    /// `PORT` and `BACKLOG` overrides.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading variables through `lookup`.
    pub fn load_with<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("parsing config file {}", path))?
            }
            None => Self::default(),
        };

        cfg.apply_env(lookup)?;
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT {:?}", port))?;
        }
        if let Some(backlog) = lookup("BACKLOG") {
            self.server.backlog = backlog
                .trim()
                .parse()
                .with_context(|| format!("invalid BACKLOG {:?}", backlog))?;
        }
        Ok(())
    }
}
