// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Disk snapshots.
//!
//! Snapshots are global. A creation event only resolves once its operation has
//! finished, i.e. when the entry carries a `response`; the first "started" entry
//! is ignored.

use crate::batch::BatchSink;
use crate::constants::{BATCH_SIZE, DEFAULT_LABELS_POINTER};
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::compute::{self, NAME};
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const CAPABILITIES: &[Capability] = &[NAME];

fn snapshots_path(project_id: &str) -> String {
    format!("/compute/v1/projects/{project_id}/global/snapshots")
}

/// Snapshots plugin.
pub struct Snapshots {
    core: PluginCore,
}

impl Snapshots {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Snapshots",
        service: Service::Compute,
        method_names: &["compute.disks.createSnapshot", "compute.snapshots.insert"],
        on_creation: true,
        relabel_on_cron: false,
        zonal: false,
        labels_pointer: DEFAULT_LABELS_POINTER,
        batch_size: Some(BATCH_SIZE),
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
impl ResourcePlugin for Snapshots {
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
            .list_all(Service::Compute, &snapshots_path(project_id), "items", &[])
            .await?;
        Ok(items.into_iter().map(ResourceRecord::new).collect())
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        if matches!(event.proto_payload.response, None | Some(Value::Null)) {
            return None;
        }
        let project_id = event.project_id()?;
        let name = event.request_str("/name")?;
        compute::get_resource(&self.core, &format!("{}/{name}", snapshots_path(project_id))).await
    }

    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        project_id: &str,
    ) -> Result<(), ProviderError> {
        let operation =
            compute::set_labels_operation(&snapshots_path(project_id), resource, &request)?;
        self.core.submit(operation).await
    }
}
