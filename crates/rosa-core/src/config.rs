//! Shim configuration
//!
//! Loaded once at attach time from a TOML file. Every field has a default so
//! a missing or partial file still yields a usable configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub script: ScriptConfig,
    pub log: LogConfig,
    pub http: HttpConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Entry script loaded into every fresh environment
    pub entry: PathBuf,
    /// Mode string exposed as `server.mode` until a reset picks another one
    pub mode: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("main/init.lua"),
            mode: String::from("default"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: String::from("rosa_core=info,rosa_shim=info"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Sleep between drains of the request queue on the worker thread
    pub poll_interval_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 6,
            poll_interval_ms: 16,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// JSON file describing array offsets and function locations
    pub layout: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            layout: PathBuf::from("layout.json"),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
