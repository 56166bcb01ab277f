//! Scenarios: named, ordered request/validation steps
//!
//! A [`Scenario`] is pure data. The [`ScenarioRunner`] executes it step by
//! step, threading values captured from one response into later requests
//! through an explicit [`ScenarioContext`].

pub mod catalog;
mod runner;
mod step;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use regex::Regex;
use serde_json::Value;

use crate::error::FailureKind;

pub use runner::ScenarioRunner;
pub use step::{Assertion, Capture, Contract, Step};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Upper bound of the random name suffix drawn per scenario invocation
pub const SUFFIX_RANGE_MAX: u32 = 1_000_000;

/// A named resource-lifecycle or read-endpoint check
#[derive(Debug, Clone)]
pub struct Scenario {
    name: &'static str,
    description: &'static str,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Values captured during one scenario invocation.
///
/// Owned by the runner for the duration of a single scenario and dropped
/// afterwards; nothing leaks between scenarios.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioContext {
    values: BTreeMap<String, Value>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with the built-in variables every scenario can reference:
    /// `version`, `suffix`, `now_ms`, `one_hour_ago`, `one_minute_ago`.
    pub fn seeded(version: &str) -> Self {
        let suffix = rand::thread_rng().gen_range(1..=SUFFIX_RANGE_MAX);
        Self::seeded_at(version, suffix, Utc::now())
    }

    pub fn seeded_at(version: &str, suffix: u32, now: DateTime<Utc>) -> Self {
        let mut context = Self::new();
        context.insert("version", Value::from(version));
        context.insert("suffix", Value::from(suffix));
        context.insert("now_ms", Value::from(now.timestamp_millis() as f64));
        context.insert("one_hour_ago", Value::from(iso_seconds(now - Duration::hours(1))));
        context.insert("one_minute_ago", Value::from(iso_seconds(now - Duration::minutes(1))));
        context
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn lookup(&self, name: &str) -> Result<&Value, FailureKind> {
        self.values.get(name).ok_or_else(|| FailureKind::UnboundVariable {
            name: name.to_string(),
        })
    }

    /// Interpolate every `${key}` in `template` as text.
    pub fn render_str(&self, template: &str) -> Result<String, FailureKind> {
        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            rendered.push_str(&template[last..whole.start()]);
            rendered.push_str(&as_text(self.lookup(name.as_str())?));
            last = whole.end();
        }
        rendered.push_str(&template[last..]);
        Ok(rendered)
    }

    /// Render a JSON template. A string that is exactly one placeholder is
    /// replaced by the captured value itself, keeping its JSON type.
    pub fn render(&self, template: &Value) -> Result<Value, FailureKind> {
        match template {
            Value::String(s) => match sole_placeholder(s) {
                Some(name) => self.lookup(name).cloned(),
                None => self.render_str(s).map(Value::String),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.render(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(members) => members
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.render(v)?)))
                .collect::<Result<serde_json::Map<String, Value>, FailureKind>>()
                .map(Value::Object),
            other => Ok(other.clone()),
        }
    }
}

fn sole_placeholder(s: &str) -> Option<&str> {
    let caps = PLACEHOLDER.captures(s)?;
    let whole = caps.get(0)?;
    (whole.start() == 0 && whole.end() == s.len())
        .then(|| caps.get(1).map(|m| m.as_str()))
        .flatten()
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn iso_seconds(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
