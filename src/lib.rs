//! Monitoring API conformance harness
//!
//! Authenticates once against the identity service, drives a fixed ordered
//! list of resource-lifecycle scenarios against the monitoring API, and
//! validates every response body against a per-resource structural contract.
//!
//! The pieces, leaf first:
//! - [`schema`]: immutable per-resource schemas and the list envelope
//! - [`validator`]: structural validation with path-level diagnostics
//! - [`identity`] / [`connection`]: credential acquisition and the
//!   authenticated HTTP connection behind [`connection::ApiTransport`]
//! - [`scenario`]: step descriptors, the per-scenario context, the runner
//!   and the built-in catalog
//! - [`orchestrator`]: runs the catalog under a fail-fast policy

pub mod config;
pub mod connection;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod scenario;
pub mod schema;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use config::{HarnessConfig, KeystoneConfig};
pub use connection::{ApiRequest, ApiResponse, ApiTransport, HttpConnection, Target};
pub use error::{FailureKind, HarnessError, ScenarioFailure};
pub use orchestrator::{Orchestrator, RunPolicy, RunReport, ScenarioStatus};
pub use scenario::{catalog, Scenario, ScenarioContext, ScenarioRunner, Step};
pub use schema::{ResourceKind, SchemaRegistry};
pub use validator::{validate, SchemaViolation, ValidationFailure, ValidationResult};
