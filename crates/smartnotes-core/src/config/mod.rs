//! Client configuration and the persisted sign-in session.
//!
//! Both live as small JSON files in the user's config directory. Any value
//! of `ClientConfig` can be overridden from the environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{has_http_scheme, non_blank, now_millis};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const SESSION_FILE_NAME: &str = "session.json";
pub const DATABASE_FILE_NAME: &str = "smartnotes.db";

pub const ENV_API_URL: &str = "SMARTNOTES_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "SMARTNOTES_TIMEOUT_SECS";
pub const ENV_PROBE_INTERVAL_SECS: &str = "SMARTNOTES_PROBE_INTERVAL_SECS";
pub const ENV_DB_PATH: &str = "SMARTNOTES_DB_PATH";
pub const ENV_TOKEN: &str = "SMARTNOTES_TOKEN";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Local database file; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_probe_interval_secs() -> u64 {
    DEFAULT_PROBE_INTERVAL_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            database_path: None,
        }
    }
}

impl ClientConfig {
    /// Read the config file; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::InvalidInput(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.validate()?;
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Apply `SMARTNOTES_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_lookup(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = optional_trimmed(&lookup, ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(secs) = optional_secs(&lookup, ENV_TIMEOUT_SECS)? {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = optional_secs(&lookup, ENV_PROBE_INTERVAL_SECS)? {
            self.probe_interval_secs = secs;
        }
        if let Some(path) = optional_trimmed(&lookup, ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(path));
        }
        self.normalize();
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !has_http_scheme(&self.api_base_url) {
            return Err(Error::InvalidInput(
                "api_base_url must start with http:// or https://".to_string(),
            ));
        }
        if !(1..=300).contains(&self.request_timeout_secs) {
            return Err(Error::InvalidInput(
                "request_timeout_secs must be in [1, 300]".to_string(),
            ));
        }
        if !(1..=3_600).contains(&self.probe_interval_secs) {
            return Err(Error::InvalidInput(
                "probe_interval_secs must be in [1, 3600]".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    fn normalize(&mut self) {
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        self.database_path = self
            .database_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    non_blank(lookup(name))
}

fn optional_secs(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    optional_trimmed(lookup, name)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| Error::InvalidInput(format!("{name} must be a whole number of seconds")))
        })
        .transpose()
}

/// Bearer token obtained at sign-in
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub saved_at: Option<i64>,
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

impl Session {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = non_blank(Some(token.into()))
            .ok_or_else(|| Error::InvalidInput("token must not be empty".to_string()))?;
        Ok(Self {
            token: Some(token),
            saved_at: Some(now_millis()),
        })
    }

    /// Read the session file; a missing file means signed out.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut session: Self = serde_json::from_str(&raw)?;
        session.token = non_blank(session.token);
        Ok(session)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        restrict_permissions(path)?;
        Ok(())
    }

    /// Delete the session file if present
    pub fn clear_at_path(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Token to use: `SMARTNOTES_TOKEN` wins over the stored one
    pub fn resolve_token(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        optional_trimmed(lookup, ENV_TOKEN).or_else(|| self.token.clone())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
