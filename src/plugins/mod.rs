// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource plugins: one adapter per labelable resource type.
//!
//! Every plugin implements [`ResourcePlugin`]. The generic engine in
//! [`crate::engine`] does everything else (synthesis, throttling, batching and
//! zone fan-out), so a plugin only knows how its resource type is listed, fetched
//! and labeled.
//!
//! # Plugins
//!
//! | Plugin | Resource | Zonal | Write path |
//! |--------|----------|-------|------------|
//! | [`instances::Instances`] | Compute Engine VMs | yes | batched `setLabels` |
//! | [`disks::Disks`] | Persistent disks | yes | batched `setLabels` |
//! | [`snapshots::Snapshots`] | Disk snapshots | no | batched `setLabels` |
//! | [`buckets::Buckets`] | Cloud Storage buckets | no | batched `PATCH` |
//! | [`bigquery::Bigquery`] | BigQuery datasets and tables | no | direct / batched `PATCH` |
//! | [`topics::Topics`] | Pub/Sub topics | no | direct `PATCH` |
//! | [`subscriptions::Subscriptions`] | Pub/Sub subscriptions | no | direct `PATCH` |
//! | [`cloudsql::Cloudsql`] | Cloud SQL instances | no | direct `PATCH` |
//! | [`bigtable::Bigtable`] | Bigtable instances | no | direct `PATCH` |

pub mod bigquery;
pub mod bigtable;
pub mod buckets;
pub mod cloudsql;
pub mod compute;
pub mod disks;
pub mod instances;
pub mod pubsub;
pub mod snapshots;
pub mod subscriptions;
pub mod topics;

use crate::batch::{BatchDispatcher, BatchSink, FlushReport, WriteOperation};
use crate::config::PluginSettings;
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::batch::GcpBatchSink;
use crate::gcp::Service;
use crate::metrics;
use crate::rate_limit::RateLimiter;
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Static metadata of a resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Registry name, e.g. `Instances`
    pub name: &'static str,
    /// API family
    pub service: Service,
    /// Audit-log method-name fragments identifying a creation event
    pub method_names: &'static [&'static str],
    /// Label as soon as a creation event arrives
    pub on_creation: bool,
    /// Relabel on every scheduled pass as well
    pub relabel_on_cron: bool,
    /// Resources live in zones and are enumerated zone by zone
    pub zonal: bool,
    /// JSON pointer to the resource's labels
    pub labels_pointer: &'static str,
    /// Batch capacity; `None` when every write is sent directly
    pub batch_size: Option<usize>,
    /// At most this many writes per period
    pub rate_limit: Option<(u32, Duration)>,
}

impl PluginDescriptor {
    /// Apply configured overrides.
    ///
    /// A batch size override only applies to plugins that batch at all.
    #[must_use]
    pub fn with_settings(mut self, settings: Option<&PluginSettings>) -> Self {
        let Some(settings) = settings else {
            return self;
        };
        if let Some(on_creation) = settings.on_creation {
            self.on_creation = on_creation;
        }
        if let Some(relabel) = settings.relabel_on_cron {
            self.relabel_on_cron = relabel;
        }
        if let (Some(size), Some(_)) = (settings.batch_size, self.batch_size) {
            self.batch_size = Some(size);
        }
        if let Some(limit) = settings.rate_limit {
            self.rate_limit = Some((limit.calls, limit.period()));
        }
        self
    }

    /// Whether scheduled passes should enumerate this resource type.
    ///
    /// Types that cannot be labeled on creation, or whose labels go stale after it,
    /// always are; `label_all_on_cron` forces every type.
    #[must_use]
    pub fn is_scheduled(&self, label_all_on_cron: bool) -> bool {
        label_all_on_cron || !self.on_creation || self.relabel_on_cron
    }

    /// Whether an audit-log method name is a creation event for this type.
    ///
    /// Case-insensitive substring match: `v1.compute.instances.insert` matches
    /// `compute.instances.insert`.
    #[must_use]
    pub fn matches_method(&self, method_name: &str) -> bool {
        let method_name = method_name.to_lowercase();
        self.method_names
            .iter()
            .any(|m| method_name.contains(&m.to_lowercase()))
    }
}

/// State every plugin instance owns: its descriptor, shared context, batch queue
/// and rate limiter.
pub struct PluginCore {
    descriptor: PluginDescriptor,
    ctx: Arc<Context>,
    dispatcher: Option<BatchDispatcher>,
    limiter: Option<RateLimiter>,
}

impl PluginCore {
    /// Build the core for a descriptor, applying configured overrides and sending
    /// batches to the descriptor's service.
    #[must_use]
    pub fn new(descriptor: PluginDescriptor, ctx: Arc<Context>) -> Self {
        let sink: Arc<dyn BatchSink> =
            Arc::new(GcpBatchSink::new(ctx.gcp.clone(), descriptor.service));
        Self::with_sink(descriptor, ctx, sink)
    }

    /// Like [`PluginCore::new`], with batches going to `sink`.
    #[must_use]
    pub fn with_sink(
        descriptor: PluginDescriptor,
        ctx: Arc<Context>,
        sink: Arc<dyn BatchSink>,
    ) -> Self {
        let settings = ctx.config.plugin_settings(descriptor.name);
        let descriptor = descriptor.with_settings(settings);
        let dispatcher = descriptor
            .batch_size
            .map(|size| BatchDispatcher::new(descriptor.name, size, sink));
        let limiter = descriptor
            .rate_limit
            .map(|(calls, period)| RateLimiter::new(calls, period));
        Self {
            descriptor,
            ctx,
            dispatcher,
            limiter,
        }
    }

    /// Effective descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Shared context.
    #[must_use]
    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Write throttle, if the plugin has one.
    #[must_use]
    pub fn limiter(&self) -> Option<&RateLimiter> {
        self.limiter.as_ref()
    }

    /// Queue a write for the next batch, or send it now if the plugin does not batch.
    ///
    /// # Errors
    ///
    /// Only direct writes can fail here; batched failures are reported at flush.
    pub async fn submit(&self, operation: WriteOperation) -> Result<(), ProviderError> {
        match &self.dispatcher {
            Some(dispatcher) => {
                dispatcher.add(operation).await;
                Ok(())
            }
            None => self.send_now(operation).await,
        }
    }

    /// Send a write immediately, bypassing the batch queue.
    ///
    /// # Errors
    ///
    /// Returns the provider error once retries are exhausted.
    pub async fn send_now(&self, operation: WriteOperation) -> Result<(), ProviderError> {
        let result = self
            .ctx
            .gcp
            .send(
                operation.verb,
                self.descriptor.service,
                &operation.path,
                &operation.body,
            )
            .await;
        match result {
            Ok(_) => {
                metrics::record_label_writes(self.descriptor.name, "committed", 1);
                Ok(())
            }
            Err(e) => {
                error!(
                    plugin = self.descriptor.name,
                    resource = %operation.resource,
                    error = %e,
                    "Label write failed"
                );
                metrics::record_label_writes(self.descriptor.name, "failed", 1);
                Err(e)
            }
        }
    }

    /// Send whatever is still queued.
    pub async fn flush(&self) -> FlushReport {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.flush().await,
            None => FlushReport::default(),
        }
    }

    /// Number of writes waiting in the batch queue.
    pub async fn pending(&self) -> usize {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.pending().await,
            None => 0,
        }
    }
}

/// The per-resource-type contract.
///
/// Implementations must be cheap to share: one instance serves every project and
/// every concurrent zone worker.
#[async_trait]
pub trait ResourcePlugin: Send + Sync {
    /// Descriptor, context, batch queue and limiter.
    fn core(&self) -> &PluginCore;

    /// Attribute extractors this type supports.
    fn capabilities(&self) -> &'static [Capability];

    /// Every resource of this type in a project, or in one zone of it for zonal types.
    ///
    /// # Errors
    ///
    /// Returns the provider error of a failed list call.
    async fn enumerate(
        &self,
        project_id: &str,
        zone: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, ProviderError>;

    /// The current state of the resource a creation event refers to.
    ///
    /// `None` when the event lacks the needed fields, the resource is not ready yet,
    /// or it cannot be fetched.
    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord>;

    /// Write a label set to a resource, normally by queueing it in the batch.
    ///
    /// # Errors
    ///
    /// Returns the provider error of a direct write.
    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        project_id: &str,
    ) -> Result<(), ProviderError>;

    /// Effective descriptor.
    fn descriptor(&self) -> &PluginDescriptor {
        self.core().descriptor()
    }

    /// Registry name.
    fn name(&self) -> &'static str {
        self.descriptor().name
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
