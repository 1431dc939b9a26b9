// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Helpers shared by the Compute Engine plugins.

use crate::batch::{HttpVerb, WriteOperation};
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::PluginCore;
use crate::record::{last_segment, LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use serde_json::Value;
use tracing::info;

/// Region of a zone: the zone without its trailing `-<letter>` (`us-east1-b` is in `us-east1`).
#[must_use]
pub fn region_from_zone(zone: &str) -> Option<&str> {
    zone.rsplit_once('-')
        .map(|(region, _)| region)
        .filter(|region| !region.is_empty())
}

fn name(resource: &ResourceRecord) -> Option<String> {
    resource.name().map(str::to_string)
}

/// Zone of a resource, from the last segment of its `zone` URL.
#[must_use]
pub fn zone(resource: &ResourceRecord) -> Option<String> {
    resource
        .str_field("zone")
        .map(last_segment)
        .filter(|z| !z.is_empty())
        .map(str::to_lowercase)
}

fn region(resource: &ResourceRecord) -> Option<String> {
    let zone = zone(resource)?;
    region_from_zone(&zone).map(str::to_string)
}

/// `name` label
pub const NAME: Capability = Capability {
    attribute: "name",
    extract: name,
};

/// `zone` label
pub const ZONE: Capability = Capability {
    attribute: "zone",
    extract: zone,
};

/// `region` label
pub const REGION: Capability = Capability {
    attribute: "region",
    extract: region,
};

fn records(items: Vec<Value>) -> Vec<ResourceRecord> {
    items.into_iter().map(ResourceRecord::new).collect()
}

/// List a zonal collection (`instances`, `disks`) in one zone, or in every cached
/// zone when `zone` is `None`.
///
/// # Errors
///
/// Returns the first failed list call.
pub async fn list_zonal(
    core: &PluginCore,
    project_id: &str,
    zone: Option<&str>,
    collection: &str,
) -> Result<Vec<ResourceRecord>, ProviderError> {
    let ctx = core.ctx();
    let zones: Vec<String> = match zone {
        Some(zone) => vec![zone.to_string()],
        None => ctx.zones.get(&ctx.gcp, project_id).await?.to_vec(),
    };

    let mut resources = Vec::new();
    for zone in &zones {
        let items = ctx
            .gcp
            .list_all(
                Service::Compute,
                &format!("/compute/v1/projects/{project_id}/zones/{zone}/{collection}"),
                "items",
                &[],
            )
            .await?;
        resources.extend(records(items));
    }
    Ok(resources)
}

/// Fetch the zonal resource a creation event names: the last segment of
/// `protoPayload.resourceName`, in the zone from `resource.labels.zone`.
pub async fn get_zonal_from_event(
    core: &PluginCore,
    event: &LogEvent,
    collection: &str,
) -> Option<ResourceRecord> {
    let project_id = event.project_id()?;
    let zone = event.resource_label("zone")?;
    let name = last_segment(event.proto_payload.resource_name.as_deref()?);
    let path = format!("/compute/v1/projects/{project_id}/zones/{zone}/{collection}/{name}");
    get_resource(core, &path).await
}

/// GET a compute resource, logging (not failing) when it is not available.
pub async fn get_resource(core: &PluginCore, path: &str) -> Option<ResourceRecord> {
    match core.ctx().gcp.get(Service::Compute, path).await {
        Ok(value) => Some(ResourceRecord::new(value)),
        Err(e) => {
            info!(
                plugin = core.descriptor().name,
                path = path,
                error = %e,
                "Could not fetch resource from event"
            );
            None
        }
    }
}

/// `setLabels` for a resource under `scope_path`
/// (e.g. `/compute/v1/projects/p/zones/z/disks`).
///
/// # Errors
///
/// Returns an error if the resource has no `name`.
pub fn set_labels_operation(
    scope_path: &str,
    resource: &ResourceRecord,
    request: &LabelWriteRequest,
) -> Result<WriteOperation, ProviderError> {
    let name = resource
        .name()
        .ok_or_else(|| ProviderError::MissingField("name"))?;
    Ok(WriteOperation::new(
        HttpVerb::Post,
        format!("{scope_path}/{name}/setLabels"),
        request.to_body(),
        name,
    ))
}

/// Queue `setLabels` for a zonal resource; the zone comes from the resource itself.
///
/// # Errors
///
/// Returns an error if the resource has no `name` or `zone`.
pub async fn set_zonal_labels(
    core: &PluginCore,
    resource: &ResourceRecord,
    request: LabelWriteRequest,
    project_id: &str,
    collection: &str,
) -> Result<(), ProviderError> {
    let zone = zone(resource).ok_or_else(|| ProviderError::MissingField("zone"))?;
    let operation = set_labels_operation(
        &format!("/compute/v1/projects/{project_id}/zones/{zone}/{collection}"),
        resource,
        &request,
    )?;
    core.submit(operation).await
}

#[cfg(test)]
#[path = "compute_tests.rs"]
mod compute_tests;
