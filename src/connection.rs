//! Authenticated connection to the monitoring API
//!
//! [`ApiTransport`] is the only boundary the scenario runner talks to.
//! [`HttpConnection`] is the real implementation: it authenticates once,
//! bakes the identity headers into the client, and issues every request
//! with them. There is no token refresh and no retry; a 401 mid-run is an
//! ordinary status mismatch.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::HarnessConfig;
use crate::error::{SetupError, TransportError};
use crate::identity::{Credential, IdentityProvider};

const JSON: &str = "application/json";

/// Where a request is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// `{base}`, the version listing
    Root,
    /// `{base}/{version}{path}`
    Versioned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub target: Target,
    /// Path (with query string) relative to the target
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, target: Target, path: impl Into<String>) -> Self {
        Self {
            method,
            target,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub raw_body: String,
}

impl ApiResponse {
    pub fn new(status: u16, raw_body: impl Into<String>) -> Self {
        Self {
            status,
            raw_body: raw_body.into(),
        }
    }

    pub fn has_body(&self) -> bool {
        !self.raw_body.trim().is_empty()
    }

    /// Decoded JSON, or `None` for an empty body.
    pub fn decoded_body(&self) -> Option<Result<Value, serde_json::Error>> {
        self.has_body().then(|| serde_json::from_str(&self.raw_body))
    }
}

/// Issues requests against one API version with one credential.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Version segment of the API URL, e.g. `v2.0`
    fn version(&self) -> &str;

    async fn issue_request(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `{base}/{version}` split out of the configured API URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    base_url: String,
    version: String,
}

impl ApiEndpoint {
    pub fn parse(api_url: &str) -> Result<Self, SetupError> {
        let invalid = |reason: &str| SetupError::InvalidApiUrl {
            url: api_url.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = api_url.trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if parsed.cannot_be_a_base() || parsed.path().trim_matches('/').is_empty() {
            return Err(invalid("expected {base}/{version}"));
        }
        let (base, version) = trimmed
            .rsplit_once('/')
            .ok_or_else(|| invalid("expected {base}/{version}"))?;

        Ok(Self {
            base_url: base.to_string(),
            version: version.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn url_for(&self, target: Target, path: &str) -> String {
        match target {
            Target::Root => format!("{}{}", self.base_url, path),
            Target::Versioned => format!("{}/{}{}", self.base_url, self.version, path),
        }
    }
}

/// The static header set sent on every request.
pub fn identity_headers(credential: &Credential, client_id: &str) -> Result<HeaderMap, SetupError> {
    fn value(header: &'static str, raw: &str, sensitive: bool) -> Result<HeaderValue, SetupError> {
        let mut value =
            HeaderValue::from_str(raw).map_err(|_| SetupError::InvalidHeader { header })?;
        value.set_sensitive(sensitive);
        Ok(value)
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-auth-user"),
        value("X-Auth-User", credential.user(), false)?,
    );
    headers.insert(
        HeaderName::from_static("x-auth-token"),
        value("X-Auth-Token", credential.token(), true)?,
    );
    headers.insert(
        HeaderName::from_static("x-auth-key"),
        value("X-Auth-Key", credential.key(), true)?,
    );
    headers.insert(ACCEPT, value("Accept", JSON, false)?);
    headers.insert(USER_AGENT, value("User-Agent", client_id, false)?);
    headers.insert(CONTENT_TYPE, value("Content-Type", JSON, false)?);
    Ok(headers)
}

pub struct HttpConnection {
    client: Client,
    endpoint: ApiEndpoint,
    credential: Credential,
}

impl HttpConnection {
    /// Authenticate once and build the connection.
    pub async fn connect(
        config: &HarnessConfig,
        identity: &dyn IdentityProvider,
    ) -> Result<Self, SetupError> {
        let endpoint = ApiEndpoint::parse(&config.monasca_api_url)?;
        let credential = identity.authenticate().await?;
        let timeout = config.request_timeout_secs.map(Duration::from_secs);
        let connection = Self::with_credential(endpoint, credential, &config.client_id, timeout)?;
        info!(
            base_url = %connection.endpoint.base_url(),
            version = %connection.endpoint.version(),
            "Connected to monitoring API"
        );
        Ok(connection)
    }

    pub fn with_credential(
        endpoint: ApiEndpoint,
        credential: Credential,
        client_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, SetupError> {
        let mut builder = Client::builder().default_headers(identity_headers(&credential, client_id)?);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SetupError::Client)?;
        Ok(Self {
            client,
            endpoint,
            credential,
        })
    }
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ApiTransport for HttpConnection {
    fn version(&self) -> &str {
        self.endpoint.version()
    }

    async fn issue_request(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint.url_for(request.target, &request.path);
        let failed = |message: String| TransportError {
            method: request.method.to_string(),
            url: url.clone(),
            message,
        };

        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, %url, "Issuing request");
        let response = builder.send().await.map_err(|e| failed(e.to_string()))?;
        let status = response.status().as_u16();
        let raw_body = response.text().await.map_err(|e| failed(e.to_string()))?;
        debug!(method = %request.method, %url, status, "Received response");

        Ok(ApiResponse { status, raw_body })
    }
}
