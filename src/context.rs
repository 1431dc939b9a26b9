// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all plugins.
//!
//! Every plugin receives an `Arc<Context>` holding:
//! - Configuration
//! - The Google API client
//! - The process-wide zone list
//! - The project-label cache
//!
//! Built once at startup and passed by reference; nothing in it is global.

use crate::cache::ProjectLabelCache;
use crate::config::Config;
use crate::errors::ProviderError;
use crate::gcp::GcpClient;
use crate::zones::ZoneCache;
use std::sync::Arc;

/// Shared context passed to all plugins.
pub struct Context {
    /// Configuration
    pub config: Arc<Config>,

    /// Google API client
    pub gcp: Arc<GcpClient>,

    /// Zone list, fetched once
    pub zones: ZoneCache,

    /// Project labels, cached for `project_label_ttl_secs`
    pub project_labels: ProjectLabelCache,
}

impl Context {
    /// Build a context, creating the Google API client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, ProviderError> {
        let gcp = GcpClient::new(&config)?;
        Ok(Self::with_client(config, gcp))
    }

    /// Build a context around an existing client.
    #[must_use]
    pub fn with_client(config: Config, gcp: GcpClient) -> Self {
        let project_labels = ProjectLabelCache::new(config.project_label_ttl());
        Self {
            config: Arc::new(config),
            gcp: Arc::new(gcp),
            zones: ZoneCache::new(),
            project_labels,
        }
    }

    /// Replace the zone cache, e.g. with a pre-populated one.
    #[must_use]
    pub fn with_zones(mut self, zones: ZoneCache) -> Self {
        self.zones = zones;
        self
    }
}
