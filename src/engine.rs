// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The generic labeling engine shared by every plugin.
//!
//! One resource goes `Discovered → Unchanged` or `Discovered → Written`, where a
//! written label set is either sent directly or queued in the plugin's batch and
//! committed or failed at flush. A failure is terminal for the pass; the next pass
//! heals it.

use crate::errors::ProviderError;
use crate::metrics;
use crate::plugins::ResourcePlugin;
use crate::record::{LabelWriteRequest, ResourceRecord};
use crate::synthesizer::{synthesize, LabelPolicy};
use crate::zones::label_zones;
use std::time::Instant;
use tracing::{debug, error, info};

/// What happened to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOutcome {
    /// It already carried every label; nothing was written
    Unchanged,
    /// A label write was sent or queued
    Written,
}

/// Counts for one `label_all` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Resources looked at
    pub scanned: usize,
    /// Resources already up to date
    pub unchanged: usize,
    /// Label writes sent or queued
    pub written: usize,
    /// Resources whose write failed outright
    pub failed: usize,
    /// List calls that failed (a zone, or the whole project for non-zonal types)
    pub failed_listings: usize,
    /// Queued writes the provider accepted at the final flush
    pub committed: usize,
    /// Queued writes the provider rejected at the final flush
    pub rejected: usize,
}

impl PassSummary {
    /// Add another summary's counts to this one.
    pub fn merge(&mut self, other: &Self) {
        self.scanned += other.scanned;
        self.unchanged += other.unchanged;
        self.written += other.written;
        self.failed += other.failed;
        self.failed_listings += other.failed_listings;
        self.committed += other.committed;
        self.rejected += other.rejected;
    }

    pub(crate) fn record(&mut self, result: Result<LabelOutcome, ProviderError>) {
        self.scanned += 1;
        match result {
            Ok(LabelOutcome::Unchanged) => self.unchanged += 1,
            Ok(LabelOutcome::Written) => self.written += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// The label write a resource needs, if any, under the plugin's configuration.
///
/// Project labels are looked up (and cached) only when `from_project` is enabled.
pub async fn build_labels(
    plugin: &dyn ResourcePlugin,
    resource: &ResourceRecord,
    project_id: &str,
) -> Option<LabelWriteRequest> {
    let ctx = plugin.core().ctx();
    let config = &ctx.config;
    let project_labels = if config.from_project {
        ctx.project_labels.get(&ctx.gcp, project_id).await
    } else {
        Default::default()
    };
    let policy = LabelPolicy {
        prefix: config.prefix_for(plugin.name()),
        vocabulary: &config.labels,
        precedence: config.project_label_precedence,
        labels_pointer: plugin.descriptor().labels_pointer,
    };
    synthesize(resource, plugin.capabilities(), &policy, &project_labels)
}

/// Bring one resource's labels up to date.
///
/// # Errors
///
/// Returns the provider error of a direct write. The error has already been logged.
pub async fn label_resource(
    plugin: &dyn ResourcePlugin,
    resource: &ResourceRecord,
    project_id: &str,
) -> Result<LabelOutcome, ProviderError> {
    let Some(request) = build_labels(plugin, resource, project_id).await else {
        debug!(
            plugin = plugin.name(),
            project = project_id,
            resource = resource.name().unwrap_or_default(),
            "Labels already up to date"
        );
        metrics::record_unchanged(plugin.name());
        return Ok(LabelOutcome::Unchanged);
    };

    if let Some(limiter) = plugin.core().limiter() {
        limiter.acquire().await;
    }
    plugin
        .write_labels(resource, request, project_id)
        .await
        .map_err(|e| {
            error!(
                plugin = plugin.name(),
                project = project_id,
                resource = resource.name().unwrap_or_default(),
                error = %e,
                "Failed to label resource"
            );
            e
        })?;
    Ok(LabelOutcome::Written)
}

/// Label every resource of a plugin's type in a project, then flush.
///
/// Zonal types are enumerated zone by zone in parallel. Failures of single
/// resources, zones or list calls are logged and counted, never returned.
pub async fn label_all(plugin: &dyn ResourcePlugin, project_id: &str) -> PassSummary {
    let started = Instant::now();
    info!(plugin = plugin.name(), project = project_id, "Labeling all resources");

    let mut summary = if plugin.descriptor().zonal {
        label_zones(plugin, project_id).await
    } else {
        label_flat(plugin, project_id).await
    };

    let report = plugin.core().flush().await;
    summary.committed += report.committed;
    summary.rejected += report.failed;

    metrics::record_label_all_duration(plugin.name(), started.elapsed());
    info!(
        plugin = plugin.name(),
        project = project_id,
        scanned = summary.scanned,
        unchanged = summary.unchanged,
        written = summary.written,
        failed = summary.failed,
        failed_listings = summary.failed_listings,
        elapsed = ?started.elapsed(),
        "Finished labeling"
    );
    summary
}

async fn label_flat(plugin: &dyn ResourcePlugin, project_id: &str) -> PassSummary {
    let mut summary = PassSummary::default();
    let resources = match plugin.enumerate(project_id, None).await {
        Ok(resources) => resources,
        Err(e) => {
            error!(
                plugin = plugin.name(),
                project = project_id,
                error = %e,
                "Failed to list resources"
            );
            summary.failed_listings += 1;
            return summary;
        }
    };

    for resource in &resources {
        summary.record(label_resource(plugin, resource, project_id).await);
    }
    summary
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
