// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud Storage buckets.
//!
//! Labels are written with a batched `PATCH` of the bucket's `labels`. The Storage
//! batch endpoint accepts at most 100 calls per request, hence the smaller batch.

use crate::batch::{BatchSink, HttpVerb, WriteOperation};
use crate::constants::{DEFAULT_LABELS_POINTER, STORAGE_BATCH_SIZE};
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
    resource.name().map(str::to_string)
}

fn location(resource: &ResourceRecord) -> Option<String> {
    resource.str_field("location").map(str::to_lowercase)
}

const CAPABILITIES: &[Capability] = &[
    Capability {
        attribute: "name",
        extract: name,
    },
    Capability {
        attribute: "location",
        extract: location,
    },
];

/// Cloud Storage buckets plugin.
pub struct Buckets {
    core: PluginCore,
}

impl Buckets {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Buckets",
        service: Service::Storage,
        method_names: &["storage.buckets.create"],
        on_creation: true,
        relabel_on_cron: false,
        zonal: false,
        labels_pointer: DEFAULT_LABELS_POINTER,
        batch_size: Some(STORAGE_BATCH_SIZE),
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
impl ResourcePlugin for Buckets {
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
                Service::Storage,
                "/storage/v1/b",
                "items",
                &[("project", project_id)],
            )
            .await?;
        Ok(items.into_iter().map(ResourceRecord::new).collect())
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        let bucket = event.resource_label("bucket_name")?;
        match self
            .core
            .ctx()
            .gcp
            .get(Service::Storage, &format!("/storage/v1/b/{bucket}"))
            .await
        {
            Ok(value) => Some(ResourceRecord::new(value)),
            Err(e) => {
                info!(bucket = bucket, error = %e, "Could not fetch bucket from event");
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
            format!("/storage/v1/b/{name}"),
            json!({ "labels": request.labels }),
            name,
        );
        self.core.submit(operation).await
    }
}
