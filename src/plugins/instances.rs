// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Compute Engine VM instances.
//!
//! Labeled when created or started, and on scheduled passes only when
//! `label_all_on_cron` is set.

use crate::batch::BatchSink;
use crate::constants::{BATCH_SIZE, DEFAULT_LABELS_POINTER};
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::compute::{self, NAME, REGION, ZONE};
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{last_segment, LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use std::sync::Arc;

const COLLECTION: &str = "instances";

fn instance_type(resource: &ResourceRecord) -> Option<String> {
    resource
        .str_field("machineType")
        .map(last_segment)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

const CAPABILITIES: &[Capability] = &[
    NAME,
    ZONE,
    REGION,
    Capability {
        attribute: "instance_type",
        extract: instance_type,
    },
];

/// VM instances plugin.
pub struct Instances {
    core: PluginCore,
}

impl Instances {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Instances",
        service: Service::Compute,
        method_names: &["compute.instances.insert", "compute.instances.start"],
        on_creation: true,
        relabel_on_cron: false,
        zonal: true,
        labels_pointer: DEFAULT_LABELS_POINTER,
        batch_size: Some(BATCH_SIZE),
        rate_limit: None,
    };

    /// Plugin sending its batches to the Compute API.
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            core: PluginCore::new(Self::DESCRIPTOR, ctx),
        }
    }

    /// Plugin sending its batches to `sink`.
    #[must_use]
    pub fn with_sink(ctx: Arc<Context>, sink: Arc<dyn BatchSink>) -> Self {
        Self {
            core: PluginCore::with_sink(Self::DESCRIPTOR, ctx, sink),
        }
    }
}

#[async_trait]
impl ResourcePlugin for Instances {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn enumerate(
        &self,
        project_id: &str,
        zone: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        compute::list_zonal(&self.core, project_id, zone, COLLECTION).await
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        compute::get_zonal_from_event(&self.core, event, COLLECTION).await
    }

    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        project_id: &str,
    ) -> Result<(), ProviderError> {
        compute::set_zonal_labels(&self.core, resource, request, project_id, COLLECTION).await
    }
}

#[cfg(test)]
#[path = "instances_tests.rs"]
mod instances_tests;
