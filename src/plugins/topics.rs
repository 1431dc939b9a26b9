// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pub/Sub topics.

use crate::batch::BatchSink;
use crate::constants::DEFAULT_LABELS_POINTER;
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::pubsub::{self, SHORT_NAME};
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use std::sync::Arc;

const CAPABILITIES: &[Capability] = &[SHORT_NAME];

/// Topics plugin. Writes are sent one by one.
pub struct Topics {
    core: PluginCore,
}

impl Topics {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Topics",
        service: Service::Pubsub,
        method_names: &["Publisher.CreateTopic"],
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
impl ResourcePlugin for Topics {
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
        pubsub::list(&self.core, project_id, "topics").await
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        pubsub::get_from_event(&self.core, event).await
    }

    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        _project_id: &str,
    ) -> Result<(), ProviderError> {
        let operation = pubsub::patch_labels_operation(resource, &request, "topic")?;
        self.core.submit(operation).await
    }
}
