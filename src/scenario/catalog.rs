//! The built-in conformance suite
//!
//! Order matters: the metric read scenarios assume the metrics posted just
//! before them have been ingested. Nothing waits for that; a slow pipeline
//! shows up as an empty list, which is still structurally valid.
//!
//! Test-data preconditions the suite does not create itself:
//! - at least one alarm exists before `alarm-list-get-update-delete` runs

use serde_json::json;

use super::{Scenario, Step};
use crate::schema::ResourceKind;

const TEST_NAME: &str = "Test_api_func_${suffix}";
const WEBHOOK_ADDRESS: &str = "http://somesite.com";
const EMAIL_ADDRESS: &str = "someone@somewhere.com";
const TEST_METRIC: &str = "name1";

/// Every scenario, in execution order.
pub fn default_suite() -> Vec<Scenario> {
    vec![
        version_list(),
        version_get(),
        notification_crud(),
        metric_post(),
        metric_post_array(),
        metric_post_value_meta(),
        metric_list(),
        metric_name_list(),
        measurement_list(),
        statistics_get(),
        alarm_definition_crud(),
        alarm_state_history_list(),
        alarm_list_get_update_delete(),
    ]
}

pub fn version_list() -> Scenario {
    Scenario::new("version-list", "Root lists the configured API version").step(
        Step::root("list versions")
            .list_of(ResourceKind::Version)
            .assert_elements_contain("id", "${version}"),
    )
}

pub fn version_get() -> Scenario {
    Scenario::new("version-get", "Versioned root describes itself").step(
        Step::get("get version", "")
            .single(ResourceKind::Version)
            .assert_field("/id", "${version}"),
    )
}

pub fn notification_crud() -> Scenario {
    let path = "/notification-methods/${notification_id}";
    Scenario::new(
        "notification-crud",
        "Create, list, read, update and delete a notification method",
    )
    .step(
        Step::post(
            "create notification",
            "/notification-methods",
            json!({ "name": TEST_NAME, "type": "WEBHOOK", "address": WEBHOOK_ADDRESS }),
        )
        .expect(201)
        .single(ResourceKind::Notification)
        .assert_field("/name", TEST_NAME)
        .capture("notification_id", "/id"),
    )
    .step(Step::get("list notifications", "/notification-methods").list_of(ResourceKind::Notification))
    .step(
        Step::get("get notification", path)
            .single(ResourceKind::Notification)
            .assert_field("/id", "${notification_id}")
            .assert_field("/address", WEBHOOK_ADDRESS),
    )
    .step(
        Step::put(
            "update notification",
            path,
            json!({ "name": TEST_NAME, "type": "EMAIL", "address": EMAIL_ADDRESS }),
        )
        .single(ResourceKind::Notification)
        .assert_field("/type", "EMAIL"),
    )
    .step(
        Step::get("get updated notification", path)
            .single(ResourceKind::Notification)
            .assert_field("/address", EMAIL_ADDRESS),
    )
    .step(Step::delete("delete notification", path))
    .step(Step::get("get deleted notification", path).expect(404))
}

fn metric_body(name: &str, value: f64) -> serde_json::Value {
    json!({
        "name": name,
        "dimensions": { "key1": "value1", "key2": "value2" },
        "timestamp": "${now_ms}",
        "value": value
    })
}

fn value_meta() -> serde_json::Value {
    json!({ "key1": "value1", "key2": "value2" })
}

pub fn metric_post() -> Scenario {
    Scenario::new("metric-post", "Post a single measurement")
        .step(Step::post("post metric", "/metrics", metric_body(TEST_METRIC, 1.0)).expect(204))
}

pub fn metric_post_array() -> Scenario {
    let mut with_meta = metric_body("name2", 2.0);
    with_meta["value_meta"] = value_meta();
    Scenario::new("metric-post-array", "Post several measurements in one request").step(
        Step::post(
            "post metric array",
            "/metrics",
            json!([metric_body(TEST_METRIC, 1.0), with_meta]),
        )
        .expect(204),
    )
}

pub fn metric_post_value_meta() -> Scenario {
    let mut body = metric_body(TEST_METRIC, 1.0);
    body["value_meta"] = value_meta();
    Scenario::new("metric-post-value-meta", "Post a measurement carrying value_meta")
        .step(Step::post("post metric with value_meta", "/metrics", body).expect(204))
}

pub fn metric_list() -> Scenario {
    Scenario::new("metric-list", "List metric definitions")
        .step(Step::get("list metrics", "/metrics").list_of(ResourceKind::Metric))
}

pub fn metric_name_list() -> Scenario {
    Scenario::new("metric-name-list", "List metric names")
        .step(Step::get("list metric names", "/metrics/names").list_of(ResourceKind::MetricName))
}

pub fn measurement_list() -> Scenario {
    Scenario::new("measurement-list", "List measurements from the last hour").step(
        Step::get("list measurements", "/metrics/measurements")
            .query("name", TEST_METRIC)
            .query("start_time", "${one_hour_ago}")
            .list_of(ResourceKind::Measurement),
    )
}

pub fn statistics_get() -> Scenario {
    Scenario::new("statistics-get", "Aggregate statistics over the last minute").step(
        Step::get("get statistics", "/metrics/statistics")
            .query("name", TEST_METRIC)
            .query("start_time", "${one_minute_ago}")
            .query("statistics", "count,max,min,avg")
            .list_of(ResourceKind::Statistics),
    )
}

pub fn alarm_definition_crud() -> Scenario {
    let path = "/alarm-definitions/${definition_id}";
    let expression = "test_api_function > 0";
    Scenario::new(
        "alarm-definition-crud",
        "Create, list, read, update, patch and delete an alarm definition",
    )
    .step(
        Step::post(
            "create alarm definition",
            "/alarm-definitions",
            json!({ "name": TEST_NAME, "expression": expression, "match_by": ["test-dim"] }),
        )
        .expect(201)
        .single(ResourceKind::AlarmDefinition)
        .assert_field("/name", TEST_NAME)
        .capture("definition_id", "/id"),
    )
    .step(
        Step::get("list alarm definitions", "/alarm-definitions")
            .list_of(ResourceKind::AlarmDefinition),
    )
    .step(
        Step::get("get alarm definition", path)
            .single(ResourceKind::AlarmDefinition)
            .assert_field("/id", "${definition_id}")
            .assert_field("/expression", expression),
    )
    .step(
        Step::put(
            "update alarm definition",
            path,
            json!({
                "name": TEST_NAME,
                "expression": expression,
                "match_by": ["test-dim"],
                "actions_enabled": true
            }),
        )
        .single(ResourceKind::AlarmDefinition)
        .assert_field("/id", "${definition_id}"),
    )
    .step(
        Step::patch(
            "patch alarm definition",
            path,
            json!({ "name": TEST_NAME, "severity": "HIGH" }),
        )
        .single(ResourceKind::AlarmDefinition)
        .assert_field("/severity", "HIGH")
        .assert_field("/expression", expression),
    )
    .step(Step::delete("delete alarm definition", path))
    .step(Step::get("get deleted alarm definition", path).expect(404))
}

pub fn alarm_state_history_list() -> Scenario {
    Scenario::new("alarm-state-history-list", "List alarm state transitions").step(
        Step::get("list alarm state history", "/alarms/state-history")
            .list_of(ResourceKind::AlarmHistory),
    )
}

pub fn alarm_list_get_update_delete() -> Scenario {
    let path = "/alarms/${alarm_id}";
    Scenario::new(
        "alarm-list-get-update-delete",
        "Update, patch and delete the first listed alarm",
    )
    .step(
        Step::get("list alarms", "/alarms")
            .list_of(ResourceKind::Alarm)
            .capture("alarm_id", "/elements/0/id")
            .precondition("at least one alarm must already exist"),
    )
    .step(Step::put(
        "update alarm",
        path,
        json!({ "state": "ALARM", "lifecycle_state": "open", "link": WEBHOOK_ADDRESS }),
    ))
    .step(
        Step::get("get updated alarm", path)
            .single(ResourceKind::Alarm)
            .assert_field("/state", "ALARM")
            .assert_field("/lifecycle_state", "open")
            .assert_field("/link", WEBHOOK_ADDRESS),
    )
    .step(
        Step::patch(
            "patch alarm",
            path,
            json!({ "state": "OK", "lifecycle_state": "closed" }),
        )
        .single(ResourceKind::Alarm)
        .assert_field("/lifecycle_state", "closed")
        .assert_field("/link", WEBHOOK_ADDRESS),
    )
    .step(
        Step::get("get patched alarm", path)
            .single(ResourceKind::Alarm)
            .assert_field("/state", "OK")
            .assert_field("/lifecycle_state", "closed")
            .assert_field("/link", WEBHOOK_ADDRESS),
    )
    .step(Step::delete("delete alarm", path))
    .step(Step::get("get deleted alarm", path).expect(404))
}

/// Scenario names in execution order.
pub fn names() -> Vec<&'static str> {
    default_suite().iter().map(Scenario::name).collect()
}
