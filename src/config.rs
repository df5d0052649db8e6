use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::upstream::{DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/tubekit-env";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_WEB_ROOT: &str = "web";
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/";

/// Values found in the env file. Anything absent falls back to defaults.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub web_root: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cache_ttl_secs: Option<u64>,
    pub upstream_timeout_secs: Option<u64>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub web_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub cache_ttl: Duration,
    pub upstream_timeout: Duration,
    pub api_base: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        EnvConfig::default().into_settings()
    }
}

impl EnvConfig {
    fn into_settings(self) -> RuntimeSettings {
        RuntimeSettings {
            web_root: self
                .web_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WEB_ROOT)),
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            cache_ttl: self
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CACHE_TTL),
            upstream_timeout: self
                .upstream_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            api_base: self
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value_raw)) = trimmed.split_once('=') else {
            continue;
        };
        let value = value_raw.trim().trim_matches('"');
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "WEB_ROOT" => cfg.web_root = Some(PathBuf::from(value)),
            "TUBEKIT_HOST" => cfg.host = Some(value.to_string()),
            "TUBEKIT_PORT" => {
                let port: u16 = value
                    .parse()
                    .with_context(|| format!("Parsing TUBEKIT_PORT from {}", path.display()))?;
                cfg.port = Some(port);
            }
            "CACHE_TTL_SECS" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Parsing CACHE_TTL_SECS from {}", path.display()))?;
                cfg.cache_ttl_secs = Some(secs);
            }
            "UPSTREAM_TIMEOUT_SECS" => {
                let secs: u64 = value.parse().with_context(|| {
                    format!("Parsing UPSTREAM_TIMEOUT_SECS from {}", path.display())
                })?;
                cfg.upstream_timeout_secs = Some(secs);
            }
            "API_BASE" => cfg.api_base = Some(value.to_string()),
            _ => {}
        }
    }
    Ok(Some(cfg))
}

/// A missing file is not an error; every setting has a default.
pub fn load_runtime_settings_from(path: impl AsRef<Path>) -> Result<RuntimeSettings> {
    let cfg = read_env_config(path.as_ref())?.unwrap_or_default();
    Ok(cfg.into_settings())
}
