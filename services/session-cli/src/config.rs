//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Session cookies are loaded from the SESSION_COOKIE env var or cookie_file,
//! never stored in the TOML directly to avoid leaking credentials.

use common::Secret;
use serde::Deserialize;
use session_client::{ClientConfig, DEFAULT_REFRESH_PATH, DefaultHeader};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub client: ClientSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub headers: Vec<HeaderDefault>,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ClientSection {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

/// Session credential settings
#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    /// Cookies to seed the jar with, resolved at load time
    #[serde(skip)]
    pub cookies: Vec<Secret<String>>,
    /// File with one `Set-Cookie` style line per cookie
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
}

/// Header added to every request unless the request sets it
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderDefault {
    pub name: String,
    pub value: String,
}

fn default_timeout() -> u64 {
    10
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Cookie resolution order:
    /// 1. SESSION_COOKIE env var (a single cookie)
    /// 2. cookie_file path from config (one cookie per non-empty line)
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.client.base_url.starts_with("http://")
            && !config.client.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.client.base_url
            )));
        }

        if config.client.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if !config.client.refresh_path.starts_with('/') {
            return Err(common::Error::Config(format!(
                "refresh_path must start with '/', got: {}",
                config.client.refresh_path
            )));
        }

        if let Ok(cookie) = std::env::var("SESSION_COOKIE") {
            config.session.cookies = vec![Secret::new(cookie)];
        } else if let Some(ref cookie_file) = config.session.cookie_file {
            let contents = std::fs::read_to_string(cookie_file).map_err(|e| {
                common::Error::Credential(format!(
                    "failed to read cookie_file {}: {e}",
                    cookie_file.display()
                ))
            })?;
            let cookies: Vec<Secret<String>> = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| Secret::new(line.to_owned()))
                .collect();
            if cookies.is_empty() {
                return Err(common::Error::Credential(format!(
                    "cookie_file {} contains no cookies",
                    cookie_file.display()
                )));
            }
            config.session.cookies = cookies;
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("session-cli.toml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.client.timeout_secs)
    }

    /// Settings for the session client itself.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            refresh_path: self.client.refresh_path.clone(),
            default_headers: self
                .headers
                .iter()
                .map(|h| DefaultHeader {
                    name: h.name.clone(),
                    value: h.value.clone(),
                })
                .collect(),
        }
    }
}
