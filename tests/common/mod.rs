//! In-memory monitoring API used by the integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use monasca_conformance::error::TransportError;
use monasca_conformance::{ApiRequest, ApiResponse, ApiTransport, Target};

pub const VERSION: &str = "v2.0";
pub const BASE: &str = "http://fake-monasca:8070";
pub const TIMESTAMP: &str = "2026-10-15T09:30:00.000Z";
pub const SEED_ALARM_ID: &str = "alarm-seed";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub target: Target,
    pub path: String,
    pub body: Option<Value>,
}

/// Ways the fake can misbehave
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub patch_clears_alarm_link: bool,
    pub notification_type: Option<String>,
    pub definition_drops_field: Option<&'static str>,
    pub metric_post_status: Option<u16>,
    pub no_alarms: bool,
    pub delete_ignored: bool,
    pub unreachable_prefix: Option<String>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    notifications: BTreeMap<String, Value>,
    definitions: BTreeMap<String, Value>,
    alarms: BTreeMap<String, Value>,
    history: Vec<Value>,
    metrics: Vec<Value>,
    issued: Vec<(String, String)>,
    requests: Vec<RecordedRequest>,
}

pub struct FakeMonitoringApi {
    faults: Faults,
    state: Mutex<State>,
}

impl FakeMonitoringApi {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        let mut state = State::default();
        if !faults.no_alarms {
            state.alarms.insert(SEED_ALARM_ID.to_string(), seed_alarm());
        }
        state.history.push(seed_history());
        Self {
            faults,
            state: Mutex::new(state),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Ids handed out for `collection`, in creation order.
    pub fn issued_ids(&self, collection: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .issued
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn alarm(&self, id: &str) -> Option<Value> {
        self.state.lock().unwrap().alarms.get(id).cloned()
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: request.method.clone(),
            target: request.target,
            path: request.path.clone(),
            body: request.body.clone(),
        });

        if request.target == Target::Root {
            return match (&request.method, request.path.as_str()) {
                (&Method::GET, "") => ok(envelope(BASE, vec![version_object()])),
                _ => not_found(),
            };
        }

        let (path, query) = match request.path.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (request.path.as_str(), BTreeMap::new()),
        };
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let body = request.body.clone().unwrap_or(Value::Null);
        let method = &request.method;

        match segments.as_slice() {
            [""] if method == Method::GET => ok(version_object()),

            ["metrics"] if method == Method::POST => {
                if let Some(status) = self.faults.metric_post_status {
                    return ApiResponse::new(status, r#"{"title":"Internal Server Error"}"#);
                }
                match body {
                    Value::Array(items) => state.metrics.extend(items),
                    other => state.metrics.push(other),
                }
                no_content()
            }
            ["metrics"] if method == Method::GET => {
                let elements = state
                    .metrics
                    .iter()
                    .enumerate()
                    .map(|(i, m)| {
                        json!({ "id": i.to_string(), "name": m["name"], "dimensions": m["dimensions"] })
                    })
                    .collect();
                ok(envelope(&collection_url("metrics"), elements))
            }
            ["metrics", "names"] if method == Method::GET => {
                let mut names: Vec<&str> =
                    state.metrics.iter().filter_map(|m| m["name"].as_str()).collect();
                names.sort_unstable();
                names.dedup();
                let elements = names.into_iter().map(|n| json!({ "name": n })).collect();
                ok(envelope(&collection_url("metrics/names"), elements))
            }
            ["metrics", "measurements"] if method == Method::GET => {
                let name = query.get("name").cloned().unwrap_or_default();
                let points: Vec<Value> = state
                    .metrics
                    .iter()
                    .filter(|m| m["name"] == name.as_str())
                    .map(|m| json!([TIMESTAMP, m["value"], m.get("value_meta").cloned().unwrap_or(json!({}))]))
                    .collect();
                let elements = if points.is_empty() {
                    vec![]
                } else {
                    vec![json!({
                        "id": "1",
                        "name": name,
                        "dimensions": { "key1": "value1", "key2": "value2" },
                        "columns": ["timestamp", "value", "value_meta"],
                        "measurements": points
                    })]
                };
                ok(envelope(&collection_url("metrics/measurements"), elements))
            }
            ["metrics", "statistics"] if method == Method::GET => {
                let name = query.get("name").cloned().unwrap_or_default();
                let count = state.metrics.iter().filter(|m| m["name"] == name.as_str()).count();
                let mut columns = vec!["timestamp".to_string()];
                columns.extend(
                    query
                        .get("statistics")
                        .map(|s| s.split(',').map(str::to_string).collect::<Vec<_>>())
                        .unwrap_or_default(),
                );
                ok(envelope(
                    &collection_url("metrics/statistics"),
                    vec![json!({
                        "id": "1",
                        "name": name,
                        "dimensions": {},
                        "columns": columns,
                        "statistics": [[TIMESTAMP, count, 1.0, 1.0, 1.0]]
                    })],
                ))
            }

            ["notification-methods"] if method == Method::POST => {
                let id = issue_id(&mut state, "notification-methods");
                let notification = self.notification(&id, &body);
                state.notifications.insert(id, notification.clone());
                created(notification)
            }
            ["notification-methods"] if method == Method::GET => {
                let elements = state.notifications.values().cloned().collect();
                ok(envelope(&collection_url("notification-methods"), elements))
            }
            ["notification-methods", id] => {
                let id = id.to_string();
                if !state.notifications.contains_key(&id) {
                    return not_found();
                }
                match method.as_str() {
                    "GET" => ok(state.notifications[&id].clone()),
                    "PUT" => {
                        let notification = self.notification(&id, &body);
                        state.notifications.insert(id, notification.clone());
                        ok(notification)
                    }
                    "DELETE" => {
                        if !self.faults.delete_ignored {
                            state.notifications.remove(&id);
                        }
                        no_content()
                    }
                    _ => method_not_allowed(),
                }
            }

            ["alarm-definitions"] if method == Method::POST => {
                let id = issue_id(&mut state, "alarm-definitions");
                let mut definition = json!({
                    "id": id,
                    "links": self_links(&format!("alarm-definitions/{id}")),
                    "name": "",
                    "description": "",
                    "expression": "",
                    "match_by": [],
                    "severity": "LOW",
                    "ok_actions": [],
                    "alarm_actions": [],
                    "undetermined_actions": [],
                    "actions_enabled": true
                });
                merge(&mut definition, &body);
                state.definitions.insert(id, definition.clone());
                created(self.render_definition(definition))
            }
            ["alarm-definitions"] if method == Method::GET => {
                let elements = state
                    .definitions
                    .values()
                    .cloned()
                    .map(|d| self.render_definition(d))
                    .collect();
                ok(envelope(&collection_url("alarm-definitions"), elements))
            }
            ["alarm-definitions", id] => {
                let id = id.to_string();
                let Some(current) = state.definitions.get(&id).cloned() else {
                    return not_found();
                };
                match method.as_str() {
                    "GET" => ok(self.render_definition(current)),
                    "PUT" | "PATCH" => {
                        let mut updated = current;
                        merge(&mut updated, &body);
                        state.definitions.insert(id, updated.clone());
                        ok(self.render_definition(updated))
                    }
                    "DELETE" => {
                        if !self.faults.delete_ignored {
                            state.definitions.remove(&id);
                        }
                        no_content()
                    }
                    _ => method_not_allowed(),
                }
            }

            ["alarms"] if method == Method::GET => {
                let elements = state.alarms.values().cloned().collect();
                ok(envelope(&collection_url("alarms"), elements))
            }
            ["alarms", "state-history"] if method == Method::GET => {
                ok(envelope(&collection_url("alarms/state-history"), state.history.clone()))
            }
            ["alarms", id] => {
                let id = id.to_string();
                let Some(mut alarm) = state.alarms.get(&id).cloned() else {
                    return not_found();
                };
                match method.as_str() {
                    "GET" => ok(alarm),
                    "PUT" => {
                        alarm["state"] = body["state"].clone();
                        alarm["lifecycle_state"] = body["lifecycle_state"].clone();
                        alarm["link"] = body["link"].clone();
                        alarm["updated_timestamp"] = json!(TIMESTAMP);
                        state.alarms.insert(id, alarm.clone());
                        ok(alarm)
                    }
                    "PATCH" => {
                        merge(&mut alarm, &body);
                        if self.faults.patch_clears_alarm_link {
                            alarm["link"] = Value::Null;
                        }
                        state.alarms.insert(id, alarm.clone());
                        ok(alarm)
                    }
                    "DELETE" => {
                        if !self.faults.delete_ignored {
                            state.alarms.remove(&id);
                        }
                        no_content()
                    }
                    _ => method_not_allowed(),
                }
            }

            _ => not_found(),
        }
    }

    fn notification(&self, id: &str, body: &Value) -> Value {
        let kind = match &self.faults.notification_type {
            Some(kind) => json!(kind),
            None => body["type"].clone(),
        };
        json!({
            "id": id,
            "links": self_links(&format!("notification-methods/{id}")),
            "name": body["name"],
            "type": kind,
            "address": body["address"]
        })
    }

    fn render_definition(&self, mut definition: Value) -> Value {
        if let (Some(field), Some(members)) =
            (self.faults.definition_drops_field, definition.as_object_mut())
        {
            members.remove(field);
        }
        definition
    }
}

#[async_trait]
impl ApiTransport for FakeMonitoringApi {
    fn version(&self) -> &str {
        VERSION
    }

    async fn issue_request(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        if let Some(prefix) = &self.faults.unreachable_prefix {
            if request.target == Target::Versioned && request.path.starts_with(prefix.as_str()) {
                return Err(TransportError {
                    method: request.method.to_string(),
                    url: format!("{BASE}/{VERSION}{}", request.path),
                    message: "connection refused".into(),
                });
            }
        }
        Ok(self.handle(request))
    }
}

fn issue_id(state: &mut State, collection: &str) -> String {
    state.next_id += 1;
    let id = format!("{}-{}", collection.trim_end_matches('s'), state.next_id);
    state.issued.push((collection.to_string(), id.clone()));
    id
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn collection_url(path: &str) -> String {
    format!("{BASE}/{VERSION}/{path}")
}

fn self_links(path: &str) -> Value {
    json!([{ "rel": "self", "href": collection_url(path) }])
}

fn envelope(href: &str, elements: Vec<Value>) -> Value {
    json!({ "links": [{ "rel": "self", "href": href }], "elements": elements })
}

fn version_object() -> Value {
    json!({
        "id": VERSION,
        "links": [{ "rel": "self", "href": format!("{BASE}/{VERSION}") }],
        "status": "CURRENT",
        "updated": TIMESTAMP
    })
}

fn seed_alarm() -> Value {
    json!({
        "id": SEED_ALARM_ID,
        "links": self_links(&format!("alarms/{SEED_ALARM_ID}")),
        "alarm_definition": {
            "severity": "LOW",
            "id": "alarm-definition-seed",
            "links": self_links("alarm-definitions/alarm-definition-seed"),
            "name": "cpu idle"
        },
        "metrics": [{ "name": "cpu.idle_perc", "dimensions": { "hostname": "devstack" } }],
        "state": "OK",
        "lifecycle_state": null,
        "link": null,
        "state_updated_timestamp": TIMESTAMP,
        "updated_timestamp": TIMESTAMP,
        "created_timestamp": TIMESTAMP
    })
}

fn seed_history() -> Value {
    json!({
        "id": 1_476_523_800_000_u64,
        "alarm_id": SEED_ALARM_ID,
        "metrics": [{ "id": null, "name": "cpu.idle_perc", "dimensions": { "hostname": "devstack" } }],
        "old_state": "UNDETERMINED",
        "new_state": "OK",
        "reason": "The alarm threshold(s) have not been exceeded.",
        "reason_data": "{}",
        "timestamp": TIMESTAMP,
        "sub_alarms": [{
            "sub_alarm_expression": {
                "function": "AVG",
                "metric_name": "cpu.idle_perc",
                "dimensions": {},
                "operator": "LT",
                "threshold": 10.0,
                "period": 60,
                "periods": 1
            },
            "sub_alarm_state": "OK",
            "current_values": [97.5]
        }]
    })
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(200, body.to_string())
}

fn created(body: Value) -> ApiResponse {
    ApiResponse::new(201, body.to_string())
}

fn no_content() -> ApiResponse {
    ApiResponse::new(204, "")
}

fn not_found() -> ApiResponse {
    ApiResponse::new(404, r#"{"title":"Not Found"}"#)
}

fn method_not_allowed() -> ApiResponse {
    ApiResponse::new(405, r#"{"title":"Method Not Allowed"}"#)
}

