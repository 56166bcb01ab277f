//! Credential acquisition
//!
//! The identity service is a black box behind [`IdentityProvider`]: it
//! either hands back a [`Credential`] or fails, and the harness never
//! refreshes what it got.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use crate::config::KeystoneConfig;
use crate::error::{ConfigError, IdentityError, SetupError};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Bearer token plus the identity fields echoed in request headers.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    user: String,
    key: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, user: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: user.into(),
            key: key.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self) -> Result<Credential, IdentityError>;
}

/// Uses a token issued out of band.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    credential: Credential,
}

impl StaticTokenProvider {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn authenticate(&self) -> Result<Credential, IdentityError> {
        Ok(self.credential.clone())
    }
}

/// Keystone v3 password authentication.
pub struct KeystoneV3Provider {
    client: Client,
    tokens_url: String,
    config: KeystoneConfig,
}

impl KeystoneV3Provider {
    pub fn new(
        auth_url: &str,
        config: KeystoneConfig,
        timeout: Option<Duration>,
    ) -> Result<Self, SetupError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SetupError::Client)?;
        Ok(Self {
            client,
            tokens_url: tokens_url(auth_url),
            config,
        })
    }
}

#[async_trait]
impl IdentityProvider for KeystoneV3Provider {
    async fn authenticate(&self) -> Result<Credential, IdentityError> {
        let url = self.tokens_url.clone();
        let response = self
            .client
            .post(&url)
            .json(&token_request_body(&self.config))
            .send()
            .await
            .map_err(|source| IdentityError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| IdentityError::MissingToken { url: url.clone() })?;

        info!(user = %self.config.username, "Obtained identity token");
        Ok(Credential::new(
            token,
            self.config.username.clone(),
            self.config.password.clone(),
        ))
    }
}

/// `{root}/v3/auth/tokens`. A trailing version segment on `auth_url`
/// (`/v2.0`, `/v3`) is replaced rather than appended to.
fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    let root = match base.rsplit_once('/') {
        Some((root, last)) if !root.ends_with('/') && is_version_segment(last) => root,
        _ => base,
    };
    format!("{root}/v3/auth/tokens")
}

fn is_version_segment(segment: &str) -> bool {
    segment.strip_prefix('v').is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.')
    })
}

fn token_request_body(config: &KeystoneConfig) -> Value {
    let mut body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": config.username,
                        "domain": { "name": config.user_domain_name },
                        "password": config.password
                    }
                }
            }
        }
    });

    let scope = match (&config.project_id, &config.project_name) {
        (Some(id), _) => Some(json!({ "project": { "id": id } })),
        (None, Some(name)) => Some(json!({
            "project": { "name": name, "domain": { "name": config.project_domain_name } }
        })),
        (None, None) => None,
    };
    if let Some(scope) = scope {
        body["auth"]["scope"] = scope;
    }
    body
}

/// Pick the provider the configuration asks for.
pub fn provider_for(
    config: &KeystoneConfig,
    timeout: Option<Duration>,
) -> Result<Box<dyn IdentityProvider>, SetupError> {
    if let Some(token) = &config.token {
        return Ok(Box::new(StaticTokenProvider::new(Credential::new(
            token.clone(),
            config.username.clone(),
            config.password.clone(),
        ))));
    }

    let auth_url = config
        .auth_url
        .as_deref()
        .ok_or(ConfigError::Missing {
            field: "keystone.auth_url",
        })?;
    Ok(Box::new(KeystoneV3Provider::new(
        auth_url,
        config.clone(),
        timeout,
    )?))
}
