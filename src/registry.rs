// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Plugin registry.
//!
//! Plugins are registered from a static table of name and constructor, built
//! once at startup. Only plugins enabled in configuration are constructed.

use crate::context::Context;
use crate::errors::LabelerError;
use crate::plugins::bigquery::Bigquery;
use crate::plugins::bigtable::Bigtable;
use crate::plugins::buckets::Buckets;
use crate::plugins::cloudsql::Cloudsql;
use crate::plugins::disks::Disks;
use crate::plugins::instances::Instances;
use crate::plugins::snapshots::Snapshots;
use crate::plugins::subscriptions::Subscriptions;
use crate::plugins::topics::Topics;
use crate::plugins::ResourcePlugin;
use std::sync::Arc;
use tracing::info;

type PluginFactory = fn(Arc<Context>) -> Arc<dyn ResourcePlugin>;

/// Every built-in plugin, by name.
pub const BUILTIN_PLUGINS: &[(&str, PluginFactory)] = &[
    (Instances::DESCRIPTOR.name, |ctx| Arc::new(Instances::new(ctx))),
    (Disks::DESCRIPTOR.name, |ctx| Arc::new(Disks::new(ctx))),
    (Snapshots::DESCRIPTOR.name, |ctx| Arc::new(Snapshots::new(ctx))),
    (Buckets::DESCRIPTOR.name, |ctx| Arc::new(Buckets::new(ctx))),
    (Bigquery::DESCRIPTOR.name, |ctx| Arc::new(Bigquery::new(ctx))),
    (Topics::DESCRIPTOR.name, |ctx| Arc::new(Topics::new(ctx))),
    (Subscriptions::DESCRIPTOR.name, |ctx| {
        Arc::new(Subscriptions::new(ctx))
    }),
    (Cloudsql::DESCRIPTOR.name, |ctx| Arc::new(Cloudsql::new(ctx))),
    (Bigtable::DESCRIPTOR.name, |ctx| Arc::new(Bigtable::new(ctx))),
];

/// The plugins this process serves.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn ResourcePlugin>>,
}

impl PluginRegistry {
    /// Construct every built-in plugin enabled in `ctx.config`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelerError::NoPluginsEnabled`] if configuration disables all of them.
    pub fn load(ctx: &Arc<Context>) -> Result<Self, LabelerError> {
        let plugins: Vec<_> = BUILTIN_PLUGINS
            .iter()
            .filter(|(name, _)| ctx.config.is_plugin_enabled(name))
            .map(|(_, factory)| factory(ctx.clone()))
            .collect();
        if plugins.is_empty() {
            return Err(LabelerError::NoPluginsEnabled);
        }
        info!(
            plugins = ?plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Registered plugins"
        );
        Ok(Self { plugins })
    }

    /// A registry over an explicit plugin list.
    #[must_use]
    pub fn from_plugins(plugins: Vec<Arc<dyn ResourcePlugin>>) -> Self {
        Self { plugins }
    }

    /// Plugin by name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`LabelerError::UnknownPlugin`] for a name that is unknown or disabled.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn ResourcePlugin>, LabelerError> {
        self.plugins
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| LabelerError::UnknownPlugin {
                name: name.to_string(),
            })
    }

    /// Every registered plugin.
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn ResourcePlugin>] {
        &self.plugins
    }

    /// Plugins whose creation-event method names match `method_name`.
    #[must_use]
    pub fn matching(&self, method_name: &str) -> Vec<&Arc<dyn ResourcePlugin>> {
        self.plugins
            .iter()
            .filter(|p| p.descriptor().matches_method(method_name))
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
