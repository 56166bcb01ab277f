//! Structural response contracts
//!
//! A [`ResourceSchema`] declares the fields of one API resource kind. It is
//! lowered once into a JSON Schema document and compiled with `jsonschema`;
//! after that it is read-only. List endpoints wrap resources in the
//! `{links, elements}` envelope, built per call by [`ListSchema::of`].

mod registry;
mod resources;

use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::RegistryError;

pub use registry::SchemaRegistry;
pub use resources::{builtin_definitions, ALARM_STATES, NOTIFICATION_TYPES};

/// Unanchored: matches anywhere in the string, so full four-digit years pass.
pub const TIMESTAMP_PATTERN: &str =
    "[0-9]{2}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(.[0-9]{0,3})?Z";

/// Resource kinds served by the monitoring API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Version,
    Metric,
    MetricName,
    Measurement,
    Statistics,
    Notification,
    AlarmDefinition,
    Alarm,
    AlarmHistory,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Version,
        ResourceKind::Metric,
        ResourceKind::MetricName,
        ResourceKind::Measurement,
        ResourceKind::Statistics,
        ResourceKind::Notification,
        ResourceKind::AlarmDefinition,
        ResourceKind::Alarm,
        ResourceKind::AlarmHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Version => "version",
            ResourceKind::Metric => "metric",
            ResourceKind::MetricName => "metric-name",
            ResourceKind::Measurement => "measurement",
            ResourceKind::Statistics => "statistics",
            ResourceKind::Notification => "notification",
            ResourceKind::AlarmDefinition => "alarm-definition",
            ResourceKind::Alarm => "alarm",
            ResourceKind::AlarmHistory => "alarm-history",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected JSON type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// Either a JSON number or a string (history entry ids)
    StringOrNumber,
    /// String matching [`TIMESTAMP_PATTERN`]
    Timestamp,
    /// String restricted to the listed literals
    Enum(&'static [&'static str]),
    Array(Box<FieldType>),
    /// Array with unconstrained items
    AnyArray,
    Object(ObjectSchema),
    /// Object with unconstrained members (dimensions, value_meta)
    AnyObject,
}

impl FieldType {
    pub fn array_of(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    pub fn object(fields: Vec<FieldSpec>) -> Self {
        FieldType::Object(ObjectSchema::new(fields))
    }

    /// Lower to a JSON Schema fragment.
    pub fn to_json_schema(&self, nullable: bool) -> Value {
        let mut schema = match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::StringOrNumber => json!({ "type": ["number", "string"] }),
            FieldType::Timestamp => json!({ "type": "string", "pattern": TIMESTAMP_PATTERN }),
            FieldType::Enum(values) => json!({ "type": "string", "enum": values }),
            FieldType::Array(item) => json!({ "type": "array", "items": item.to_json_schema(false) }),
            FieldType::AnyArray => json!({ "type": "array" }),
            FieldType::Object(object) => object.to_json_schema(),
            FieldType::AnyObject => json!({ "type": "object" }),
        };
        if nullable {
            allow_null(&mut schema);
        }
        schema
    }
}

fn allow_null(schema: &mut Value) {
    let Some(object) = schema.as_object_mut() else {
        return;
    };
    match object.get_mut("type") {
        Some(Value::String(single)) => {
            let single = std::mem::take(single);
            object.insert("type".into(), json!([single, "null"]));
        }
        Some(Value::Array(types)) => types.push(json!("null")),
        _ => {}
    }
    if let Some(Value::Array(values)) = object.get_mut("enum") {
        values.push(Value::Null);
    }
}

/// One declared field of an object
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub nullable: bool,
}

impl FieldSpec {
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
            nullable: false,
        }
    }

    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Ordered field declarations for a JSON object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    fields: Vec<FieldSpec>,
}

impl ObjectSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.ty.to_json_schema(f.nullable)))
            .collect();
        let required: Vec<&str> = self.required_fields().collect();

        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

/// `{rel, href}` link list shared by resources and list envelopes
pub fn links_type() -> FieldType {
    FieldType::array_of(FieldType::object(vec![
        FieldSpec::required("rel", FieldType::String),
        FieldSpec::required("href", FieldType::String),
    ]))
}

/// Anything a response body can be validated against
pub trait Contract {
    /// Name used in diagnostics, e.g. `alarm` or `list<alarm>`
    fn label(&self) -> String;

    /// The JSON Schema document the contract was compiled from
    fn document(&self) -> &Value;

    fn compiled(&self) -> &jsonschema::Validator;
}

fn compile(contract: &str, document: &Value) -> Result<jsonschema::Validator, RegistryError> {
    jsonschema::validator_for(document).map_err(|e| RegistryError::Compile {
        contract: contract.to_string(),
        message: e.to_string(),
    })
}

/// Compiled structural schema for one resource kind
pub struct ResourceSchema {
    kind: ResourceKind,
    body: ObjectSchema,
    document: Value,
    compiled: jsonschema::Validator,
}

impl ResourceSchema {
    pub fn compile(kind: ResourceKind, body: ObjectSchema) -> Result<Self, RegistryError> {
        let document = body.to_json_schema();
        let compiled = compile(kind.as_str(), &document)?;
        Ok(Self {
            kind,
            body,
            document,
            compiled,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn body(&self) -> &ObjectSchema {
        &self.body
    }
}

impl fmt::Debug for ResourceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSchema")
            .field("kind", &self.kind)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Contract for ResourceSchema {
    fn label(&self) -> String {
        self.kind.to_string()
    }

    fn document(&self) -> &Value {
        &self.document
    }

    fn compiled(&self) -> &jsonschema::Validator {
        &self.compiled
    }
}

/// `{links, elements}` envelope with its item schema bound at construction
pub struct ListSchema {
    item_kind: ResourceKind,
    document: Value,
    compiled: jsonschema::Validator,
}

impl ListSchema {
    /// Build a fresh envelope around `item`. Nothing shared is modified.
    pub fn of(item: &ResourceSchema) -> Result<Self, RegistryError> {
        let document = json!({
            "type": "object",
            "properties": {
                "links": links_type().to_json_schema(false),
                "elements": { "type": "array", "items": item.document().clone() }
            },
            "required": ["links", "elements"]
        });
        let compiled = compile(&format!("list<{}>", item.kind()), &document)?;
        Ok(Self {
            item_kind: item.kind(),
            document,
            compiled,
        })
    }

    pub fn item_kind(&self) -> ResourceKind {
        self.item_kind
    }
}

impl fmt::Debug for ListSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSchema")
            .field("item_kind", &self.item_kind)
            .finish_non_exhaustive()
    }
}

impl Contract for ListSchema {
    fn label(&self) -> String {
        format!("list<{}>", self.item_kind)
    }

    fn document(&self) -> &Value {
        &self.document
    }

    fn compiled(&self) -> &jsonschema::Validator {
        &self.compiled
    }
}
