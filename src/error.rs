//! Error types for the conformance harness
//!
//! Setup, registry and configuration errors are fatal and abort the whole
//! run. A [`ScenarioFailure`] is raised at the scenario boundary and the
//! orchestrator's run policy decides what happens next.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::schema::ResourceKind;
use crate::validator::SchemaViolation;

/// Top-level error for a harness run
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Schema registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown scenario '{name}'. Available: {available}")]
    UnknownScenario { name: String, available: String },

    #[error(transparent)]
    Scenario(#[from] ScenarioFailure),
}

/// Failures while building the authenticated connection
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Authentication failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },

    #[error("Invalid value for header '{header}'")]
    InvalidHeader { header: &'static str },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures reported by an identity provider
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Identity service at {url} rejected the credentials with status {status}: {body}")]
    Rejected { url: String, status: u16, body: String },

    #[error("Identity service at {url} returned no X-Subject-Token header")]
    MissingToken { url: String },
}

/// Programming or configuration errors in the schema registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No schema registered for resource kind '{0}'")]
    UnknownKind(ResourceKind),

    #[error("Resource kind '{0}' registered twice")]
    Duplicate(ResourceKind),

    #[error("Schema '{contract}' failed to compile: {message}")]
    Compile { contract: String, message: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing required setting '{field}'")]
    Missing { field: &'static str },
}

/// A request that could not be completed at all
#[derive(Error, Debug, Clone)]
#[error("{method} {url} failed: {message}")]
pub struct TransportError {
    pub method: String,
    pub url: String,
    pub message: String,
}

/// What went wrong inside a single scenario step
#[derive(Error, Debug)]
pub enum FailureKind {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid response code {actual}, expected {expected}\n{body}")]
    StatusMismatch {
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("Response body is not valid JSON: {message}")]
    UndecodableBody { message: String },

    #[error(transparent)]
    SchemaViolation(#[from] SchemaViolation),

    #[error("Field '{field}' was {actual}, expected {expected}")]
    FieldAssertion {
        field: String,
        expected: Value,
        actual: Value,
    },

    #[error("No value at '{pointer}' to capture as '{key}'{}", precondition_note(.precondition))]
    MissingCapture {
        key: String,
        pointer: String,
        precondition: Option<&'static str>,
    },

    #[error("Template references unbound variable '${{{name}}}'")]
    UnboundVariable { name: String },
}

fn precondition_note(precondition: &Option<&'static str>) -> String {
    precondition
        .map(|p| format!(" (precondition: {p})"))
        .unwrap_or_default()
}

/// A scenario aborted at one of its steps
#[derive(Error, Debug)]
#[error("Scenario '{scenario}' failed at step {step_index} '{step}' ({method} {path}): {kind}")]
pub struct ScenarioFailure {
    pub scenario: String,
    pub step: String,
    /// 1-based position of the failing step
    pub step_index: usize,
    pub method: String,
    pub path: String,
    #[source]
    pub kind: FailureKind,
}
