//! Structural validation of response bodies
//!
//! Validation is open-world: undeclared members never fail. Every failure
//! found is collected so a single run surfaces all contract drift in a body.

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::schema::Contract;

/// One rule broken by a response body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    /// JSON pointer to the offending field; for a missing field, where it should be
    pub path: String,
    /// Schema keyword and its value, e.g. `{"enum": ["OK", "ALARM", "UNDETERMINED"]}`
    pub expected: Value,
    /// The value found, `null` when the field is absent
    pub actual: Value,
    pub reason: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { &self.path };
        write!(f, "{}: {} (expected {})", path, self.reason, self.expected)
    }
}

/// A body that does not satisfy its contract
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Response violates the '{contract}' contract: {}", join_failures(.failures))]
pub struct SchemaViolation {
    pub contract: String,
    /// Never empty
    pub failures: Vec<ValidationFailure>,
}

impl SchemaViolation {
    /// True when some failure points at `path` exactly.
    pub fn has_failure_at(&self, path: &str) -> bool {
        self.failures.iter().any(|f| f.path == path)
    }
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ValidationResult = Result<(), SchemaViolation>;

/// Validate a decoded body against a resource or list contract.
pub fn validate(body: &Value, contract: &dyn Contract) -> ValidationResult {
    let failures: Vec<ValidationFailure> = contract
        .compiled()
        .iter_errors(body)
        .map(|error| failure_from(&error, contract.document()))
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(SchemaViolation {
            contract: contract.label(),
            failures,
        })
    }
}

fn failure_from(error: &ValidationError<'_>, document: &Value) -> ValidationFailure {
    let schema_path = error.schema_path.to_string();
    let keyword = schema_path.rsplit('/').next().unwrap_or_default().to_string();
    let constraint = document.pointer(&schema_path).cloned().unwrap_or(Value::Null);
    let instance_path = error.instance_path.to_string();

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let field = property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string());
            ValidationFailure {
                path: format!("{instance_path}/{field}"),
                expected: json!({ "required": field }),
                actual: Value::Null,
                reason: format!("missing required field '{field}'"),
            }
        }
        _ => ValidationFailure {
            path: instance_path,
            expected: json!({ keyword: constraint }),
            actual: error.instance.clone().into_owned(),
            reason: error.to_string(),
        },
    }
}
