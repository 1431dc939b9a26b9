// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider-shaped resource records, label write requests and log events.
//!
//! Resources are kept as raw JSON: every resource type returns a different shape,
//! and the labeling engine only ever needs a handful of fields from it.

use crate::labels::LabelMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// One cloud resource exactly as returned by a list or get call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord(Value);

impl ResourceRecord {
    /// Wrap a JSON value returned by a provider API.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The underlying JSON.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Top-level string field, if present.
    #[must_use]
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// String at a JSON pointer (e.g. `/datasetReference/datasetId`), if present.
    #[must_use]
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.0.pointer(pointer).and_then(Value::as_str)
    }

    /// The resource's `name` field.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    /// The `name` field after its last `/`.
    #[must_use]
    pub fn short_name(&self) -> Option<&str> {
        self.name().map(last_segment)
    }

    /// Labels already attached to the resource, read from `pointer`.
    ///
    /// Non-string values are ignored; a missing object yields an empty map.
    #[must_use]
    pub fn labels_at(&self, pointer: &str) -> LabelMap {
        self.0
            .pointer(pointer)
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `labelFingerprint`, when the resource type supports one.
    #[must_use]
    pub fn label_fingerprint(&self) -> Option<&str> {
        self.str_field("labelFingerprint").filter(|f| !f.is_empty())
    }

    /// Set a top-level field. Used to carry context a list call omits
    /// (e.g. a table's location, inherited from its dataset).
    pub fn set_field(&mut self, field: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(field.to_string(), value);
        }
    }
}

impl From<Value> for ResourceRecord {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// The text after the last `/` (the whole string if there is none).
#[must_use]
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Labels to write to one resource, plus the fingerprint read with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelWriteRequest {
    /// Complete label set: pre-existing, project-inherited and generated labels
    pub labels: LabelMap,
    /// Echoed unchanged to guard against concurrent modification
    pub fingerprint: Option<String>,
}

impl LabelWriteRequest {
    /// `{"labels": {...}, "labelFingerprint": "..."}`, the body of compute `setLabels`
    /// and of label patches on most APIs.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("labels".to_string(), json!(self.labels));
        if let Some(fingerprint) = &self.fingerprint {
            body.insert("labelFingerprint".to_string(), json!(fingerprint));
        }
        Value::Object(body)
    }
}

/// Audit-log entry delivered for a single API call.
///
/// Only `protoPayload.methodName` and `resource.labels.project_id` are needed for
/// dispatch. Plugins read whatever else they need from the raw payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Details of the API call
    pub proto_payload: ProtoPayload,
    /// Monitored resource the call applied to
    #[serde(default)]
    pub resource: MonitoredResource,
}

/// The `protoPayload` of an audit-log entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoPayload {
    /// API method, e.g. `v1.compute.instances.insert`
    pub method_name: String,
    /// Full resource path, when the API reports one
    #[serde(default)]
    pub resource_name: Option<String>,
    /// Request body of the call
    #[serde(default)]
    pub request: Option<Value>,
    /// Response body; absent while a long-running operation is still in progress
    #[serde(default)]
    pub response: Option<Value>,
    /// Legacy service-specific payload (BigQuery)
    #[serde(default)]
    pub service_data: Option<Value>,
}

/// The `resource` of an audit-log entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitoredResource {
    /// Resource labels such as `project_id`, `zone`, `bucket_name`
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl LogEvent {
    /// Parse an event from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if `protoPayload.methodName` is missing.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// `resource.labels.project_id`
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.resource_label("project_id")
    }

    /// Any `resource.labels` entry.
    #[must_use]
    pub fn resource_label(&self, key: &str) -> Option<&str> {
        self.resource.labels.get(key).map(String::as_str)
    }

    /// String at a JSON pointer inside `protoPayload.request`.
    #[must_use]
    pub fn request_str(&self, pointer: &str) -> Option<&str> {
        self.proto_payload
            .request
            .as_ref()
            .and_then(|r| r.pointer(pointer))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
