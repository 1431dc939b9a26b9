// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes shared by unit tests.

use crate::batch::{BatchSink, HttpVerb, OperationOutcome, WriteOperation};
use crate::config::Config;
use crate::context::Context;
use crate::errors::ProviderError;
use crate::gcp::{GcpClient, Service};
use crate::labels::LabelMap;
use crate::plugins::{PluginCore, PluginDescriptor, ResourcePlugin};
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::retry::RetryPolicy;
use crate::synthesizer::Capability;
use crate::zones::ZoneCache;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// Nothing listens here; tests that reach the network fail fast.
pub const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9";

/// Context that never calls Google: project labels off, zones pre-seeded.
pub fn test_context(mut config: Config, zones: &[&str]) -> Arc<Context> {
    config.from_project = false;
    if config.endpoint_override.is_none() {
        config.endpoint_override = Some(UNREACHABLE_ENDPOINT.to_string());
    }
    config.access_token = Some("test-token".to_string());
    let gcp = GcpClient::new(&config)
        .unwrap()
        .with_retry_policy(RetryPolicy::none());
    let zones = ZoneCache::with_zones(zones.iter().map(|z| (*z).to_string()).collect());
    Arc::new(Context::with_client(config, gcp).with_zones(zones))
}

/// Commits every operation and remembers which resources each batch held.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingSink {
    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl BatchSink for RecordingSink {
    async fn execute(
        &self,
        operations: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, ProviderError> {
        self.batches
            .lock()
            .unwrap()
            .push(operations.iter().map(|op| op.resource.clone()).collect());
        Ok(vec![OperationOutcome::Committed; operations.len()])
    }
}

/// Sink that rejects the writes of chosen resources and commits the rest.
#[derive(Debug, Default)]
pub struct RejectingSink {
    pub rejected: HashSet<String>,
}

impl RejectingSink {
    pub fn rejecting(resources: &[&str]) -> Self {
        Self {
            rejected: resources.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

#[async_trait]
impl BatchSink for RejectingSink {
    async fn execute(
        &self,
        operations: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, ProviderError> {
        Ok(operations
            .iter()
            .map(|op| {
                if self.rejected.contains(&op.resource) {
                    OperationOutcome::Failed {
                        status: Some(403),
                        message: "permission denied".to_string(),
                    }
                } else {
                    OperationOutcome::Committed
                }
            })
            .collect())
    }
}

fn name(resource: &ResourceRecord) -> Option<String> {
    resource.name().map(str::to_string)
}

fn zone(resource: &ResourceRecord) -> Option<String> {
    resource.str_field("zone").map(str::to_string)
}

const CAPABILITIES: &[Capability] = &[
    Capability {
        attribute: "name",
        extract: name,
    },
    Capability {
        attribute: "zone",
        extract: zone,
    },
];

/// A resource type backed by a map of zone to resources.
///
/// Writes are applied to the store as soon as they are queued, so a second pass
/// sees the labels of the first.
pub struct FakePlugin {
    core: PluginCore,
    store: Mutex<BTreeMap<String, Vec<ResourceRecord>>>,
    failing_zones: HashSet<String>,
    pub writes: Mutex<Vec<String>>,
}

impl FakePlugin {
    pub fn fake_descriptor(name: &'static str, zonal: bool) -> PluginDescriptor {
        PluginDescriptor {
            name,
            service: Service::Compute,
            method_names: &["fake.widgets.insert"],
            on_creation: true,
            relabel_on_cron: false,
            zonal,
            labels_pointer: "/labels",
            batch_size: Some(10),
            rate_limit: None,
        }
    }

    pub fn new(
        descriptor: PluginDescriptor,
        ctx: Arc<Context>,
        sink: Arc<dyn BatchSink>,
    ) -> Self {
        Self {
            core: PluginCore::with_sink(descriptor, ctx, sink),
            store: Mutex::new(BTreeMap::new()),
            failing_zones: HashSet::new(),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Add a resource to a zone (`"global"` for non-zonal plugins).
    pub fn with_resource(self, zone: &str, name: &str, labels: &[(&str, &str)]) -> Self {
        let labels: LabelMap = labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let resource = ResourceRecord::new(json!({
            "name": name,
            "zone": zone,
            "labels": labels,
        }));
        self.store
            .lock()
            .unwrap()
            .entry(zone.to_string())
            .or_default()
            .push(resource);
        self
    }

    pub fn failing_zone(mut self, zone: &str) -> Self {
        self.failing_zones.insert(zone.to_string());
        self
    }

    pub fn labels_of(&self, name: &str) -> LabelMap {
        self.store
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|r| r.name() == Some(name))
            .map(|r| r.labels_at("/labels"))
            .unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl ResourcePlugin for FakePlugin {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn enumerate(
        &self,
        _project_id: &str,
        zone: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        let store = self.store.lock().unwrap();
        match zone {
            Some(zone) if self.failing_zones.contains(zone) => Err(ProviderError::Http {
                status: 403,
                url: format!("fake://zones/{zone}"),
                message: "Compute Engine API has not been used in this zone".to_string(),
            }),
            Some(zone) => Ok(store.get(zone).cloned().unwrap_or_default()),
            None => Ok(store.values().flatten().cloned().collect()),
        }
    }

    async fn resolve_from_event(&self, event: &LogEvent) -> Option<ResourceRecord> {
        let name = event.request_str("/name")?;
        self.store
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|r| r.name() == Some(name))
            .cloned()
    }

    async fn write_labels(
        &self,
        resource: &ResourceRecord,
        request: LabelWriteRequest,
        _project_id: &str,
    ) -> Result<(), ProviderError> {
        let name = resource
            .name()
            .ok_or(ProviderError::MissingField("name"))?
            .to_string();
        {
            let mut store = self.store.lock().unwrap();
            if let Some(stored) = store
                .values_mut()
                .flatten()
                .find(|r| r.name() == Some(name.as_str()))
            {
                stored.set_field("labels", json!(request.labels));
            }
        }
        self.writes.lock().unwrap().push(name.clone());
        let operation = WriteOperation::new(
            HttpVerb::Post,
            format!("/fake/{name}/setLabels"),
            request.to_body(),
            name,
        );
        self.core.submit(operation).await
    }
}
