// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud SQL instances.
//!
//! Cloud SQL keeps labels under `settings.userLabels`, guarded by the instance's
//! `settings.settingsVersion`. Instance creation takes minutes and the creation
//! event fires before the instance accepts patches, so instances are labeled on
//! scheduled passes only.

use crate::batch::{BatchSink, HttpVerb, WriteOperation};
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{last_segment, LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

fn name(resource: &ResourceRecord) -> Option<String> {
    resource.name().map(str::to_string)
}

fn region(resource: &ResourceRecord) -> Option<String> {
    resource.str_field("region").map(str::to_lowercase)
}

const CAPABILITIES: &[Capability] = &[
    Capability {
        attribute: "name",
        extract: name,
    },
    Capability {
        attribute: "region",
        extract: region,
    },
];

fn instances_path(project_id: &str) -> String {
    format!("/sql/v1beta4/projects/{project_id}/instances")
}

/// Instance id an event refers to: the last segment of `resourceName`, else the
/// part of `resource.labels.database_id` after `project:`.
pub(crate) fn instance_from_event(event: &LogEvent) -> Option<&str> {
    event
        .proto_payload
        .resource_name
        .as_deref()
        .map(last_segment)
        .filter(|name| !name.is_empty())
        .or_else(|| {
            event
                .resource_label("database_id")
                .map(|id| id.rsplit(':').next().unwrap_or(id))
        })
}

/// Cloud SQL plugin.
pub struct Cloudsql {
    core: PluginCore,
}

impl Cloudsql {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Cloudsql",
        service: Service::SqlAdmin,
        method_names: &["cloudsql.instances.create"],
        on_creation: false,
        relabel_on_cron: true,
        zonal: false,
        labels_pointer: "/settings/userLabels",
        batch_size: None,
        rate_limit: None,
    };

    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            core: PluginCore::new(Self::DESCRIPTOR, ctx),
        }
    }

    #[must_use]
    pub fn with_sink(ctx: Arc<Context>, sink: Arc<dyn BatchSink>) -> Self {
        Self {
            core: PluginCore::with_sink(Self::DESCRIPTOR, ctx, sink),
        }
    }
}

#[async_trait]
impl ResourcePlugin for Cloudsql {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn enumerate(
        &self,
        project_id: &str,
        _zone: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        let items = self
            .core
            .ctx()
            .gcp
            .list_all(Service::SqlAdmin, &instances_path(project_id), "items", &[])
            .await?;
        Ok(items.into_iter().map(ResourceRecord::new).collect())
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        let project_id = event.project_id()?;
        let instance = instance_from_event(event)?;
        let path = format!("{}/{instance}", instances_path(project_id));
        match self.core.ctx().gcp.get(Service::SqlAdmin, &path).await {
            Ok(value) => Some(ResourceRecord::new(value)),
            Err(e) => {
                info!(instance = instance, error = %e, "Could not fetch Cloud SQL instance");
                None
            }
        }
    }

    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        project_id: &str,
    ) -> Result<(), ProviderError> {
        let name = resource
            .name()
            .ok_or(ProviderError::MissingField("name"))?;
        let mut settings = Map::new();
        settings.insert("userLabels".to_string(), json!(request.labels));
        if let Some(version) = resource.as_value().pointer("/settings/settingsVersion") {
            settings.insert("settingsVersion".to_string(), version.clone());
        }
        let operation = WriteOperation::new(
            HttpVerb::Patch,
            format!("{}/{name}", instances_path(project_id)),
            json!({ "settings": Value::Object(settings) }),
            name,
        );
        self.core.submit(operation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(value: Value) -> LogEvent {
        LogEvent::from_value(value).unwrap()
    }

    #[test]
    fn test_instance_from_resource_name() {
        let e = event(json!({
            "protoPayload": {"methodName": "cloudsql.instances.create", "resourceName": "instances/orders-db"},
            "resource": {"labels": {"project_id": "p", "database_id": "p:other"}}
        }));
        assert_eq!(instance_from_event(&e), Some("orders-db"));
    }

    #[test]
    fn test_instance_from_database_id() {
        let e = event(json!({
            "protoPayload": {"methodName": "cloudsql.instances.create"},
            "resource": {"labels": {"project_id": "p", "database_id": "p:orders-db"}}
        }));
        assert_eq!(instance_from_event(&e), Some("orders-db"));
    }

    #[test]
    fn test_labels_live_under_settings() {
        let instance = ResourceRecord::new(json!({
            "name": "orders-db",
            "region": "us-central1",
            "settings": {"userLabels": {"team": "data"}}
        }));
        assert_eq!(
            instance.labels_at(Cloudsql::DESCRIPTOR.labels_pointer)["team"],
            "data"
        );
        assert_eq!(region(&instance).as_deref(), Some("us-central1"));
    }

    #[test]
    fn test_cron_only() {
        let d = Cloudsql::DESCRIPTOR;
        assert!(!d.on_creation);
        assert!(d.is_scheduled(false));
    }
}
