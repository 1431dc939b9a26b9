// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Persistent disks.
//!
//! `pd_attached` changes over a disk's life, so disks are relabeled on every
//! scheduled pass as well as on creation.

use crate::batch::BatchSink;
use crate::constants::{BATCH_SIZE, DEFAULT_LABELS_POINTER};
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::compute::{self, NAME, REGION, ZONE};
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const COLLECTION: &str = "disks";

/// `"true"` when any instance uses the disk.
fn pd_attached(resource: &ResourceRecord) -> Option<String> {
    let attached = resource
        .as_value()
        .get("users")
        .and_then(Value::as_array)
        .is_some_and(|users| !users.is_empty());
    Some(attached.to_string())
}

const CAPABILITIES: &[Capability] = &[
    NAME,
    ZONE,
    REGION,
    Capability {
        attribute: "pd_attached",
        extract: pd_attached,
    },
];

/// Persistent disks plugin.
pub struct Disks {
    core: PluginCore,
}

impl Disks {
    /// Built-in descriptor.
    pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "Disks",
        service: Service::Compute,
        method_names: &["compute.disks.insert"],
        on_creation: true,
        relabel_on_cron: true,
        zonal: true,
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
impl ResourcePlugin for Disks {
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
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pd_attached() {
        let attached = ResourceRecord::new(json!({"name": "d", "users": ["projects/p/zones/z/instances/vm"]}));
        let detached = ResourceRecord::new(json!({"name": "d", "users": []}));
        let never = ResourceRecord::new(json!({"name": "d"}));

        assert_eq!(pd_attached(&attached).as_deref(), Some("true"));
        assert_eq!(pd_attached(&detached).as_deref(), Some("false"));
        assert_eq!(pd_attached(&never).as_deref(), Some("false"));
    }

    #[test]
    fn test_disks_are_relabeled_on_cron() {
        assert!(Disks::DESCRIPTOR.is_scheduled(false));
        assert!(Disks::DESCRIPTOR.matches_method("v1.compute.disks.insert"));
        assert!(!Disks::DESCRIPTOR.matches_method("v1.compute.disks.createSnapshot"));
    }
}
