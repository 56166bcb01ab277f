//! Executes scenarios step by step

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Assertion, Contract, Scenario, ScenarioContext, Step};
use crate::connection::{ApiRequest, ApiResponse, ApiTransport};
use crate::error::{FailureKind, HarnessError, RegistryError, ScenarioFailure, TransportError};
use crate::schema::SchemaRegistry;
use crate::validator::{validate, SchemaViolation};

/// A step either fails (scenario failure) or hits a harness defect (fatal).
enum StepError {
    Failed(FailureKind),
    Fatal(RegistryError),
}

impl From<FailureKind> for StepError {
    fn from(kind: FailureKind) -> Self {
        StepError::Failed(kind)
    }
}

impl From<TransportError> for StepError {
    fn from(err: TransportError) -> Self {
        StepError::Failed(err.into())
    }
}

impl From<SchemaViolation> for StepError {
    fn from(violation: SchemaViolation) -> Self {
        StepError::Failed(violation.into())
    }
}

/// Runs scenarios through one transport against one schema registry.
pub struct ScenarioRunner<'a> {
    transport: &'a dyn ApiTransport,
    registry: &'a SchemaRegistry,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(transport: &'a dyn ApiTransport, registry: &'a SchemaRegistry) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// Run `scenario` with a freshly seeded context. Returns the number of
    /// steps executed.
    pub async fn run(&self, scenario: &Scenario) -> Result<usize, HarnessError> {
        let mut context = ScenarioContext::seeded(self.transport.version());
        self.run_with_context(scenario, &mut context).await
    }

    pub async fn run_with_context(
        &self,
        scenario: &Scenario,
        context: &mut ScenarioContext,
    ) -> Result<usize, HarnessError> {
        info!(scenario = scenario.name(), "Running scenario");

        for (index, step) in scenario.steps().iter().enumerate() {
            let failure = |path: &str, kind: FailureKind| ScenarioFailure {
                scenario: scenario.name().to_string(),
                step: step.name.to_string(),
                step_index: index + 1,
                method: step.method.to_string(),
                path: path.to_string(),
                kind,
            };

            let request = match prepare(step, context) {
                Ok(request) => request,
                Err(kind) => return Err(failure(&step.path, kind).into()),
            };

            match self.execute(step, &request, context).await {
                Ok(()) => debug!(scenario = scenario.name(), step = step.name, "Step passed"),
                Err(StepError::Fatal(err)) => return Err(err.into()),
                Err(StepError::Failed(kind)) => {
                    let failure = failure(&request.path, kind);
                    warn!(%failure, "Scenario failed");
                    return Err(failure.into());
                }
            }
        }

        info!(scenario = scenario.name(), "Scenario passed");
        Ok(scenario.steps().len())
    }

    async fn execute(
        &self,
        step: &Step,
        request: &ApiRequest,
        context: &mut ScenarioContext,
    ) -> Result<(), StepError> {
        let response = self.transport.issue_request(request).await?;
        if response.status != step.expect_status {
            return Err(FailureKind::StatusMismatch {
                expected: step.expect_status,
                actual: response.status,
                body: response.raw_body,
            }
            .into());
        }
        if !step.reads_body() {
            return Ok(());
        }

        let body = decode(&response)?;
        self.check_contract(step.contract, body.as_ref())?;

        for capture in &step.captures {
            let value = body
                .as_ref()
                .and_then(|b| b.pointer(&capture.pointer))
                .filter(|v| !v.is_null())
                .cloned()
                .ok_or_else(|| FailureKind::MissingCapture {
                    key: capture.key.clone(),
                    pointer: capture.pointer.clone(),
                    precondition: step.precondition,
                })?;
            debug!(key = %capture.key, %value, "Captured value");
            context.insert(capture.key.clone(), value);
        }

        let body = body.unwrap_or(Value::Null);
        for assertion in &step.assertions {
            check_assertion(assertion, &body, context)?;
        }
        Ok(())
    }

    fn check_contract(&self, contract: Contract, body: Option<&Value>) -> Result<(), StepError> {
        let kind = match contract {
            Contract::None => return Ok(()),
            Contract::Single(kind) | Contract::ListOf(kind) => kind,
        };
        let body = body.ok_or_else(|| FailureKind::UndecodableBody {
            message: format!("expected a {kind} body, response was empty"),
        })?;

        let outcome = match contract {
            Contract::ListOf(_) => {
                let schema = self.registry.list_schema_for(kind).map_err(StepError::Fatal)?;
                validate(body, &schema)
            }
            _ => {
                let schema = self.registry.schema_for(kind).map_err(StepError::Fatal)?;
                validate(body, schema)
            }
        };
        Ok(outcome?)
    }
}

fn prepare(step: &Step, context: &ScenarioContext) -> Result<ApiRequest, FailureKind> {
    let mut path = context.render_str(&step.path)?;
    if !step.query.is_empty() {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &step.query {
            query.append_pair(key, &context.render_str(value)?);
        }
        path.push('?');
        path.push_str(&query.finish());
    }

    let mut request = ApiRequest::new(step.method.clone(), step.target, path);
    if let Some(body) = &step.body {
        request = request.with_body(context.render(body)?);
    }
    Ok(request)
}

fn decode(response: &ApiResponse) -> Result<Option<Value>, FailureKind> {
    response
        .decoded_body()
        .transpose()
        .map_err(|e| FailureKind::UndecodableBody {
            message: e.to_string(),
        })
}

fn check_assertion(
    assertion: &Assertion,
    body: &Value,
    context: &ScenarioContext,
) -> Result<(), FailureKind> {
    match assertion {
        Assertion::FieldEquals { pointer, expected } => {
            let expected = context.render(expected)?;
            let actual = body.pointer(pointer).cloned().unwrap_or(Value::Null);
            if actual != expected {
                return Err(FailureKind::FieldAssertion {
                    field: pointer.trim_start_matches('/').replace('/', "."),
                    expected,
                    actual,
                });
            }
        }
        Assertion::ElementsContain { field, expected } => {
            let expected = context.render(expected)?;
            let found: Vec<Value> = body
                .get("elements")
                .and_then(Value::as_array)
                .map(|elements| elements.iter().filter_map(|e| e.get(field)).cloned().collect())
                .unwrap_or_default();
            if !found.contains(&expected) {
                return Err(FailureKind::FieldAssertion {
                    field: format!("elements[*].{field}"),
                    expected,
                    actual: Value::Array(found),
                });
            }
        }
    }
    Ok(())
}
