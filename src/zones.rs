// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone-parallel enumeration for zonal resource types.
//!
//! The zone list is fetched once per process, through whichever project first asks,
//! and reused for every project. Projects are assumed to see the same zones.
//!
//! A pass lists and labels each zone in its own worker, at most `zone_workers` at a
//! time. A failing zone is logged and counted; its siblings carry on.

use crate::engine::{label_resource, PassSummary};
use crate::errors::ProviderError;
use crate::gcp::GcpClient;
use crate::metrics;
use crate::plugins::ResourcePlugin;
use futures::StreamExt;
use std::sync::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Process-wide zone list, populated at most once.
#[derive(Debug, Default)]
pub struct ZoneCache {
    zones: OnceCell<Vec<String>>,
}

impl ZoneCache {
    /// Empty cache; the first [`ZoneCache::get`] populates it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that already holds `zones`.
    #[must_use]
    pub fn with_zones(zones: Vec<String>) -> Self {
        Self {
            zones: OnceCell::new_with(Some(zones)),
        }
    }

    /// The zone list, fetching it through `project_id` on first use.
    ///
    /// Concurrent first callers wait for a single fetch. A failed fetch leaves the
    /// cache empty so a later call can try again.
    ///
    /// # Errors
    ///
    /// Returns the provider error of a failed fetch.
    pub async fn get(&self, gcp: &GcpClient, project_id: &str) -> Result<&[String], ProviderError> {
        let zones = self
            .zones
            .get_or_try_init(|| async {
                let zones = gcp.list_zones(project_id).await?;
                info!(project = project_id, zones = zones.len(), "Cached zone list");
                Ok::<_, ProviderError>(zones)
            })
            .await?;
        Ok(zones.as_slice())
    }
}

/// Label every resource of a zonal plugin in a project, zone by zone.
///
/// Does not flush; the caller flushes once after every zone is done.
pub async fn label_zones(plugin: &dyn ResourcePlugin, project_id: &str) -> PassSummary {
    let ctx = plugin.core().ctx().clone();
    let zones = match ctx.zones.get(&ctx.gcp, project_id).await {
        Ok(zones) => zones,
        Err(e) => {
            error!(
                plugin = plugin.name(),
                project = project_id,
                error = %e,
                "Failed to list zones"
            );
            return PassSummary {
                failed_listings: 1,
                ..PassSummary::default()
            };
        }
    };
    let workers = ctx.config.zone_workers.max(1);
    let summary = Mutex::new(PassSummary::default());

    futures::stream::iter(zones)
        .for_each_concurrent(workers, |zone| {
            let summary = &summary;
            async move {
                let zone_summary = label_zone(plugin, project_id, zone).await;
                if let Ok(mut total) = summary.lock() {
                    total.merge(&zone_summary);
                }
            }
        })
        .await;

    summary.into_inner().unwrap_or_default()
}

async fn label_zone(plugin: &dyn ResourcePlugin, project_id: &str, zone: &str) -> PassSummary {
    let mut summary = PassSummary::default();
    let resources = match plugin.enumerate(project_id, Some(zone)).await {
        Ok(resources) => resources,
        Err(e) => {
            error!(
                plugin = plugin.name(),
                project = project_id,
                zone = zone,
                error = %e,
                "Failed to list zone; skipping it"
            );
            metrics::record_zone_failure(plugin.name());
            summary.failed_listings += 1;
            return summary;
        }
    };
    debug!(
        plugin = plugin.name(),
        project = project_id,
        zone = zone,
        resources = resources.len(),
        "Listed zone"
    );

    for resource in &resources {
        summary.record(label_resource(plugin, resource, project_id).await);
    }
    summary
}

#[cfg(test)]
#[path = "zones_tests.rs"]
mod zones_tests;
