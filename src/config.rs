//! Harness configuration
//!
//! A single YAML document names the target API and the identity service:
//!
//! ```yaml
//! monasca_api_url: http://localhost:8070/v2.0
//! keystone:
//!   username: mini-mon
//!   password: password
//!   auth_url: http://localhost:35357/v3
//!   project_name: mini-mon
//! ```
//!
//! `MONASCA_API_URL` and the usual `OS_*` variables override the file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_CLIENT_ID: &str = "monasca-conformance";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// `{base}/{version}` of the monitoring API
    pub monasca_api_url: String,

    #[serde(alias = "identity")]
    pub keystone: KeystoneConfig,

    /// Sent as `User-Agent` on every request
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Per-request timeout; the transport default applies when unset
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeystoneConfig {
    pub username: String,
    pub password: String,

    #[serde(default)]
    pub auth_url: Option<String>,

    #[serde(default)]
    pub project_name: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default = "default_domain")]
    pub user_domain_name: String,

    #[serde(default = "default_domain")]
    pub project_domain_name: String,

    /// Pre-issued token; skips the identity exchange when present
    #[serde(default)]
    pub token: Option<String>,
}

fn default_domain() -> String {
    "Default".to_string()
}

impl HarnessConfig {
    /// Read `path`, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text, &path.display().to_string())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        debug!(api_url = %config.monasca_api_url, "Loaded harness config");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Apply `MONASCA_API_URL` / `OS_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MONASCA_API_URL") {
            self.monasca_api_url = url;
        }
        if let Some(username) = lookup("OS_USERNAME") {
            self.keystone.username = username;
        }
        if let Some(password) = lookup("OS_PASSWORD") {
            self.keystone.password = password;
        }
        if let Some(auth_url) = lookup("OS_AUTH_URL") {
            self.keystone.auth_url = Some(auth_url);
        }
        if let Some(project) = lookup("OS_PROJECT_NAME") {
            self.keystone.project_name = Some(project);
        }
    }
}
