//! Runs an ordered list of scenarios and aggregates the outcome

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::connection::ApiTransport;
use crate::error::HarnessError;
use crate::scenario::{Scenario, ScenarioRunner};
use crate::schema::SchemaRegistry;

/// What to do after a scenario fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPolicy {
    /// Halt; later scenarios are reported as skipped
    #[default]
    FailFast,
    ContinueOnError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub status: ScenarioStatus,
    pub steps_run: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub api_version: String,
    pub policy: RunPolicy,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl RunReport {
    /// Every scenario ran and passed.
    pub fn passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == ScenarioStatus::Passed)
    }

    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn first_failure(&self) -> Option<&ScenarioOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.status == ScenarioStatus::Failed)
    }

    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

pub struct Orchestrator<'a> {
    transport: &'a dyn ApiTransport,
    registry: &'a SchemaRegistry,
    policy: RunPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(transport: &'a dyn ApiTransport, registry: &'a SchemaRegistry) -> Self {
        Self {
            transport,
            registry,
            policy: RunPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run `scenarios` in order.
    ///
    /// Scenario failures land in the report. Registry and setup errors are
    /// returned as `Err` regardless of policy.
    pub async fn run(&self, scenarios: &[Scenario]) -> Result<RunReport, HarnessError> {
        let runner = ScenarioRunner::new(self.transport, self.registry);
        let mut outcomes = Vec::with_capacity(scenarios.len());
        let mut halted = false;

        for scenario in scenarios {
            if halted {
                outcomes.push(ScenarioOutcome {
                    name: scenario.name().to_string(),
                    status: ScenarioStatus::Skipped,
                    steps_run: 0,
                    duration_ms: 0,
                    failure: None,
                });
                continue;
            }

            let start = Instant::now();
            let result = runner.run(scenario).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(steps_run) => ScenarioOutcome {
                    name: scenario.name().to_string(),
                    status: ScenarioStatus::Passed,
                    steps_run,
                    duration_ms,
                    failure: None,
                },
                Err(HarnessError::Scenario(failure)) => {
                    if self.policy == RunPolicy::FailFast {
                        warn!(scenario = scenario.name(), "Halting run after failure");
                        halted = true;
                    }
                    ScenarioOutcome {
                        name: scenario.name().to_string(),
                        status: ScenarioStatus::Failed,
                        steps_run: failure.step_index,
                        duration_ms,
                        failure: Some(failure.to_string()),
                    }
                }
                Err(fatal) => return Err(fatal),
            };
            outcomes.push(outcome);
        }

        let report = RunReport {
            api_version: self.transport.version().to_string(),
            policy: self.policy,
            outcomes,
        };
        info!(
            passed = report.count(ScenarioStatus::Passed),
            failed = report.count(ScenarioStatus::Failed),
            skipped = report.count(ScenarioStatus::Skipped),
            "Run finished"
        );
        Ok(report)
    }
}

/// Restrict `catalog` to `names`, keeping catalog order. An empty selection
/// keeps everything.
pub fn select(catalog: Vec<Scenario>, names: &[String]) -> Result<Vec<Scenario>, HarnessError> {
    if names.is_empty() {
        return Ok(catalog);
    }
    if let Some(unknown) = names
        .iter()
        .find(|n| !catalog.iter().any(|s| s.name() == n.as_str()))
    {
        let available = catalog
            .iter()
            .map(Scenario::name)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(HarnessError::UnknownScenario {
            name: unknown.clone(),
            available,
        });
    }
    Ok(catalog
        .into_iter()
        .filter(|s| names.iter().any(|n| n == s.name()))
        .collect())
}
