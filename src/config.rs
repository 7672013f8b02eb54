use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::client::{HttpClient, HttpClientConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Timeout for HTTP requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of retry attempts for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial retry delay in milliseconds
    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,

    /// Maximum retry delay in milliseconds
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,

    /// Enable cookie support
    #[serde(default = "default_true")]
    pub enable_cookies: bool,

    /// Enable gzip/brotli compression
    #[serde(default = "default_true")]
    pub enable_compression: bool,

    /// Delay between successive page downloads in milliseconds
    #[serde(default = "default_rate_limit")]
    pub rate_limit_delay_ms: u64,
}

fn default_download_dir() -> String {
    "downloads".to_string()
}
fn default_true() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> usize {
    4
}
fn default_initial_retry_delay() -> u64 {
    500
}
fn default_max_retry_delay() -> u64 {
    8000
}
fn default_rate_limit() -> u64 {
    300
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 4,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            enable_cookies: true,
            enable_compression: true,
            rate_limit_delay_ms: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    /// Read `config.toml` from the working directory, falling back to
    /// defaults when it is absent or malformed.
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match toml::from_str::<Config>(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("ignoring malformed config.toml: {}", e),
                }
            }
        }
        Self::default()
    }
}

impl NetworkConfig {
    pub fn create_http_client(&self) -> Result<HttpClient, reqwest::Error> {
        HttpClient::with_config(HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            initial_retry_delay_ms: self.initial_retry_delay_ms,
            max_retry_delay_ms: self.max_retry_delay_ms,
            enable_cookies: self.enable_cookies,
            enable_compression: self.enable_compression,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.download_dir, "downloads");
        assert_eq!(cfg.network.max_retries, 4);
        assert!(cfg.network.enable_cookies);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str("download_dir = \"/tmp/manga\"").unwrap();
        assert_eq!(cfg.download_dir, "/tmp/manga");
        assert_eq!(cfg.network.timeout_secs, 30);

        let cfg: Config = toml::from_str("[network]\nmax_retries = 1").unwrap();
        assert_eq!(cfg.network.max_retries, 1);
        assert_eq!(cfg.network.rate_limit_delay_ms, 300);
    }
}
