// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bigtable instances, updated with `partialUpdateInstance` masked to `labels`.

use crate::batch::{BatchSink, HttpVerb, WriteOperation};
use crate::constants::DEFAULT_LABELS_POINTER;
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

fn name(resource: &ResourceRecord) -> Option<String> {
    resource.short_name().map(str::to_string)
}

const CAPABILITIES: &[Capability] = &[Capability {
    attribute: "name",
    extract: name,
}];

/// Full instance name from a `CreateInstance` request: `{parent}/instances/{instanceId}`.
pub(crate) fn instance_name_from_event(event: &LogEvent) -> Option<String> {
    let parent = event.request_str("/parent")?;
    let instance_id = event.request_str("/instanceId")?;
    Some(format!("{parent}/instances/{instance_id}"))
}

/// Bigtable plugin.
pub struct Bigtable {
    core: PluginCore,
}

impl Bigtable {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Bigtable",
        service: Service::BigtableAdmin,
        method_names: &["BigtableInstanceAdmin.CreateInstance"],
        on_creation: true,
        relabel_on_cron: false,
        zonal: false,
        labels_pointer: DEFAULT_LABELS_POINTER,
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
impl ResourcePlugin for Bigtable {
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
            .list_all(
                Service::BigtableAdmin,
                &format!("/v2/projects/{project_id}/instances"),
                "instances",
                &[],
            )
            .await?;
        Ok(items.into_iter().map(ResourceRecord::new).collect())
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        let name = instance_name_from_event(event)?;
        match self
            .core
            .ctx()
            .gcp
            .get(Service::BigtableAdmin, &format!("/v2/{name}"))
            .await
        {
            Ok(value) => Some(ResourceRecord::new(value)),
            Err(e) => {
                info!(instance = %name, error = %e, "Could not fetch Bigtable instance");
                None
            }
        }
    }

    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        _project_id: &str,
    ) -> Result<(), ProviderError> {
        let name = resource
            .name()
            .ok_or(ProviderError::MissingField("name"))?;
        let operation = WriteOperation::new(
            HttpVerb::Patch,
            format!("/v2/{name}?updateMask=labels"),
            json!({ "labels": request.labels }),
            name,
        );
        self.core.submit(operation).await
    }
}
