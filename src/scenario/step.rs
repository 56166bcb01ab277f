//! Step descriptors

use reqwest::Method;
use serde_json::Value;

use crate::connection::Target;
use crate::schema::ResourceKind;

/// What a step's response body must conform to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    /// Body is absent or not checked
    None,
    Single(ResourceKind),
    /// `{links, elements}` envelope of the kind
    ListOf(ResourceKind),
}

/// Copy the value at `pointer` into the context under `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub key: String,
    pub pointer: String,
}

/// Expected field values. `expected` is a template rendered against the
/// scenario context when the step runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    /// Value at a JSON pointer equals `expected`
    FieldEquals { pointer: String, expected: Value },
    /// Some element of `elements` has `field` equal to `expected`
    ElementsContain { field: String, expected: Value },
}

/// One request and everything checked about its response.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: &'static str,
    pub method: Method,
    pub target: Target,
    /// Path template relative to the target
    pub path: String,
    /// Query parameters; values are templates
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub expect_status: u16,
    pub contract: Contract,
    pub captures: Vec<Capture>,
    pub assertions: Vec<Assertion>,
    /// External test-data requirement, quoted when a capture finds nothing
    pub precondition: Option<&'static str>,
}

impl Step {
    pub fn new(name: &'static str, method: Method, path: impl Into<String>) -> Self {
        Self {
            name,
            method,
            target: Target::Versioned,
            path: path.into(),
            query: Vec::new(),
            body: None,
            expect_status: 200,
            contract: Contract::None,
            captures: Vec::new(),
            assertions: Vec::new(),
            precondition: None,
        }
    }

    /// GET against the unversioned root.
    pub fn root(name: &'static str) -> Self {
        let mut step = Self::new(name, Method::GET, "");
        step.target = Target::Root;
        step
    }

    pub fn get(name: &'static str, path: impl Into<String>) -> Self {
        Self::new(name, Method::GET, path)
    }

    pub fn post(name: &'static str, path: impl Into<String>, body: Value) -> Self {
        Self::new(name, Method::POST, path).body(body)
    }

    pub fn put(name: &'static str, path: impl Into<String>, body: Value) -> Self {
        Self::new(name, Method::PUT, path).body(body)
    }

    pub fn patch(name: &'static str, path: impl Into<String>, body: Value) -> Self {
        Self::new(name, Method::PATCH, path).body(body)
    }

    pub fn delete(name: &'static str, path: impl Into<String>) -> Self {
        Self::new(name, Method::DELETE, path).expect(204)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn expect(mut self, status: u16) -> Self {
        self.expect_status = status;
        self
    }

    pub fn single(mut self, kind: ResourceKind) -> Self {
        self.contract = Contract::Single(kind);
        self
    }

    pub fn list_of(mut self, kind: ResourceKind) -> Self {
        self.contract = Contract::ListOf(kind);
        self
    }

    pub fn capture(mut self, key: &str, pointer: &str) -> Self {
        self.captures.push(Capture {
            key: key.to_string(),
            pointer: pointer.to_string(),
        });
        self
    }

    pub fn assert_field(mut self, pointer: &str, expected: impl Into<Value>) -> Self {
        self.assertions.push(Assertion::FieldEquals {
            pointer: pointer.to_string(),
            expected: expected.into(),
        });
        self
    }

    pub fn assert_elements_contain(mut self, field: &str, expected: impl Into<Value>) -> Self {
        self.assertions.push(Assertion::ElementsContain {
            field: field.to_string(),
            expected: expected.into(),
        });
        self
    }

    pub fn precondition(mut self, note: &'static str) -> Self {
        self.precondition = Some(note);
        self
    }

    /// True when the response body has to be decoded.
    pub(crate) fn reads_body(&self) -> bool {
        self.contract != Contract::None || !self.captures.is_empty() || !self.assertions.is_empty()
    }
}
