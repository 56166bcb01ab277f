//! Declarations for every resource kind the monitoring API returns.

use super::{links_type, ObjectSchema, ResourceKind};
use super::{FieldSpec as F, FieldType as T};

pub const ALARM_STATES: &[&str] = &["OK", "ALARM", "UNDETERMINED"];
pub const NOTIFICATION_TYPES: &[&str] = &["WEBHOOK", "EMAIL", "PAGERDUTY"];

/// All built-in resource declarations, in [`ResourceKind::ALL`] order.
pub fn builtin_definitions() -> Vec<(ResourceKind, ObjectSchema)> {
    vec![
        (ResourceKind::Version, version()),
        (ResourceKind::Metric, metric()),
        (ResourceKind::MetricName, metric_name()),
        (ResourceKind::Measurement, measurement()),
        (ResourceKind::Statistics, statistics()),
        (ResourceKind::Notification, notification()),
        (ResourceKind::AlarmDefinition, alarm_definition()),
        (ResourceKind::Alarm, alarm()),
        (ResourceKind::AlarmHistory, alarm_history()),
    ]
}

fn version() -> ObjectSchema {
    ObjectSchema::new(vec![
        F::required("id", T::String),
        F::required("links", links_type()),
        F::required("status", T::String),
        F::required("updated", T::Timestamp),
    ])
}

fn metric() -> ObjectSchema {
    ObjectSchema::new(vec![
        F::required("id", T::String),
        F::required("name", T::String),
        F::optional("dimensions", T::AnyObject),
    ])
}

fn metric_name() -> ObjectSchema {
    ObjectSchema::new(vec![
        F::optional("id", T::String),
        F::required("name", T::String),
    ])
}

fn measurement() -> ObjectSchema {
    ObjectSchema::new(vec![
        F::required("id", T::String),
        F::required("name", T::String),
        F::optional("dimensions", T::AnyObject),
        F::optional("columns", T::array_of(T::String)),
        F::required("measurements", T::array_of(T::AnyArray)),
    ])
}

fn statistics() -> ObjectSchema {
    ObjectSchema::new(vec![
        F::optional("id", T::String),
        F::required("name", T::String),
        F::optional("dimensions", T::AnyObject),
        F::required("columns", T::array_of(T::String)),
        F::required("statistics", T::array_of(T::AnyArray)),
    ])
}

fn notification() -> ObjectSchema {
    ObjectSchema::new(vec![
        F::required("id", T::String),
        F::required("links", links_type()),
        F::required("name", T::String),
        F::required("type", T::Enum(NOTIFICATION_TYPES)),
        F::required("address", T::String),
    ])
}

fn alarm_definition() -> ObjectSchema {
    ObjectSchema::new(vec![
        F::required("id", T::String),
        F::required("links", links_type()),
        F::required("name", T::String),
        F::required("description", T::String).nullable(),
        F::required("expression", T::String),
        F::required("match_by", T::array_of(T::String)),
        F::required("severity", T::String),
        F::required("ok_actions", T::array_of(T::String)).nullable(),
        F::required("alarm_actions", T::array_of(T::String)).nullable(),
        F::required("undetermined_actions", T::array_of(T::String)).nullable(),
    ])
}

fn alarm() -> ObjectSchema {
    let definition_summary = T::object(vec![
        F::required("severity", T::String),
        F::required("id", T::String),
        F::required("links", links_type()),
        F::required("name", T::String),
    ]);
    let metric = T::object(vec![
        F::required("name", T::String),
        F::optional("dimensions", T::AnyObject),
    ]);

    ObjectSchema::new(vec![
        F::required("id", T::String),
        F::required("links", links_type()),
        F::required("alarm_definition", definition_summary),
        F::required("metrics", T::array_of(metric)),
        F::required("state", T::Enum(ALARM_STATES)),
        F::required("lifecycle_state", T::String).nullable(),
        F::required("link", T::String).nullable(),
        F::required("state_updated_timestamp", T::Timestamp),
        F::required("updated_timestamp", T::Timestamp),
        F::required("created_timestamp", T::Timestamp),
    ])
}

fn alarm_history() -> ObjectSchema {
    let metric = T::object(vec![
        F::optional("id", T::String).nullable(),
        F::optional("name", T::String),
        F::optional("dimensions", T::AnyObject),
    ]);
    let sub_alarm_expression = T::object(vec![
        F::required("function", T::String),
        F::required("metric_name", T::String),
        F::required("dimensions", T::AnyObject),
        F::required("operator", T::String),
        F::required("threshold", T::Number),
        F::required("period", T::Number),
        F::required("periods", T::Number),
    ]);
    let sub_alarm = T::object(vec![
        F::optional("sub_alarm_expression", sub_alarm_expression),
        F::optional("sub_alarm_state", T::Enum(ALARM_STATES)),
        F::optional("current_values", T::array_of(T::Number)).nullable(),
    ]);

    ObjectSchema::new(vec![
        F::required("id", T::StringOrNumber),
        F::required("alarm_id", T::String),
        F::optional("metrics", T::array_of(metric)),
        F::required("old_state", T::Enum(ALARM_STATES)),
        F::required("new_state", T::Enum(ALARM_STATES)),
        F::optional("reason", T::String),
        F::optional("reason_data", T::String),
        F::required("timestamp", T::Timestamp),
        F::optional("sub_alarms", T::array_of(sub_alarm)).nullable(),
    ])
}
