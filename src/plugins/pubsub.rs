// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Helpers shared by the Pub/Sub plugins.
//!
//! Topics and subscriptions are addressed by their full name
//! (`projects/p/topics/t`) and updated with a field-masked `PATCH`. Neither
//! accepts a label fingerprint.

use crate::batch::{HttpVerb, WriteOperation};
use crate::errors::ProviderError;
use crate::gcp::Service;
use crate::plugins::PluginCore;
use crate::record::{LabelWriteRequest, LogEvent, ResourceRecord};
use crate::synthesizer::Capability;
use serde_json::json;
use tracing::info;

fn short_name(resource: &ResourceRecord) -> Option<String> {
    resource.short_name().map(str::to_string)
}

/// `name` label, from the text after the last `/` of the full name
pub const SHORT_NAME: Capability = Capability {
    attribute: "name",
    extract: short_name,
};

/// Every item of `projects/{project_id}/{collection}`.
///
/// # Errors
///
/// Returns the provider error of a failed list call.
pub async fn list(
    core: &PluginCore,
    project_id: &str,
    collection: &str,
) -> Result<Vec<ResourceRecord>, ProviderError> {
    let items = core
        .ctx()
        .gcp
        .list_all(
            Service::Pubsub,
            &format!("/v1/projects/{project_id}/{collection}"),
            collection,
            &[],
        )
        .await?;
    Ok(items.into_iter().map(ResourceRecord::new).collect())
}

/// Fetch the resource named by `protoPayload.request.name`.
pub async fn get_from_event(core: &PluginCore, event: &LogEvent) -> Option<ResourceRecord> {
    let name = event.request_str("/name")?;
    match core
        .ctx()
        .gcp
        .get(Service::Pubsub, &format!("/v1/{name}"))
        .await
    {
        Ok(value) => Some(ResourceRecord::new(value)),
        Err(e) => {
            info!(
                plugin = core.descriptor().name,
                resource = name,
                error = %e,
                "Could not fetch resource from event"
            );
            None
        }
    }
}

/// `PATCH /v1/{name}` replacing only the labels. `field` is the body's wrapper
/// key, `topic` or `subscription`.
///
/// # Errors
///
/// Returns an error if the resource has no `name`.
pub fn patch_labels_operation(
    resource: &ResourceRecord,
    request: &LabelWriteRequest,
    field: &str,
) -> Result<WriteOperation, ProviderError> {
    let name = resource
        .name()
        .ok_or(ProviderError::MissingField("name"))?;
    let body = json!({
        field: { "name": name, "labels": request.labels },
        "updateMask": "labels",
    });
    Ok(WriteOperation::new(
        HttpVerb::Patch,
        format!("/v1/{name}"),
        body,
        name,
    ))
}
