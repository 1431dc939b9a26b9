// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The driver: the operations external triggers invoke.
//!
//! - [`Labeler::label_all`] labels every resource of one type in one project
//! - [`Labeler::label_one`] labels the resource a creation event names
//! - [`Labeler::schedule`] fans one `label_all` request per project and plugin
//!   out over Pub/Sub
//!
//! Only setup failures are returned. Anything that goes wrong with a single
//! resource or zone has already been logged and counted when these return.

use crate::config::ConfigError;
use crate::context::Context;
use crate::engine::{self, label_resource, LabelOutcome, PassSummary};
use crate::errors::LabelerError;
use crate::metrics;
use crate::plugins::ResourcePlugin;
use crate::record::LogEvent;
use crate::registry::PluginRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A `label_all` request, as published by [`Labeler::schedule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledLabeling {
    /// Project to label
    pub project_id: String,
    /// Plugin name
    pub plugin: String,
}

/// How a creation event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// No plugin recognizes the event's method
    Ignored,
    /// The event's project is not enabled
    ProjectSkipped,
    /// The matching plugin labels on scheduled passes only
    NotReactive,
    /// The resource could not be fetched yet
    Unresolved,
    /// The resource was labeled, or already was
    Labeled(LabelOutcome),
    /// The label write failed; the next scheduled pass retries it
    Failed,
}

impl EventOutcome {
    fn metric_label(self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::ProjectSkipped => "skipped",
            Self::NotReactive => "not_reactive",
            Self::Unresolved => "unresolved",
            Self::Labeled(_) => "labeled",
            Self::Failed => "failed",
        }
    }
}

/// Registry plus shared context; one per process.
pub struct Labeler {
    ctx: Arc<Context>,
    registry: PluginRegistry,
}

impl Labeler {
    /// Driver over an existing registry.
    #[must_use]
    pub fn new(ctx: Arc<Context>, registry: PluginRegistry) -> Self {
        Self { ctx, registry }
    }

    /// Driver over every plugin enabled in `ctx.config`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelerError::NoPluginsEnabled`] if every plugin is disabled.
    pub fn load(ctx: Arc<Context>) -> Result<Self, LabelerError> {
        let registry = PluginRegistry::load(&ctx)?;
        Ok(Self::new(ctx, registry))
    }

    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Label every resource of `plugin_name`'s type in `project_id`.
    ///
    /// Excluded projects are skipped with an empty summary.
    ///
    /// # Errors
    ///
    /// Returns [`LabelerError::UnknownPlugin`] for an unknown or disabled plugin.
    pub async fn label_all(
        &self,
        plugin_name: &str,
        project_id: &str,
    ) -> Result<PassSummary, LabelerError> {
        let plugin = self.registry.get(plugin_name)?;
        if !self.ctx.config.is_project_enabled(project_id) {
            info!(
                plugin = plugin.name(),
                project = project_id,
                "Project is not enabled; skipping"
            );
            return Ok(PassSummary::default());
        }
        Ok(engine::label_all(plugin.as_ref(), project_id).await)
    }

    /// Label the resource a creation event refers to.
    ///
    /// The event's method name is matched against every plugin. No match is normal
    /// and ignored. Every matching plugin that labels on creation handles the event,
    /// then more than one match is reported as an error.
    ///
    /// # Errors
    ///
    /// - [`LabelerError::MalformedEvent`] if the event has no method name, or a
    ///   matched event has no project id
    /// - [`LabelerError::AmbiguousDispatch`] if several plugins match
    pub async fn label_one(&self, event: Value) -> Result<EventOutcome, LabelerError> {
        let event =
            LogEvent::from_value(event).map_err(|e| LabelerError::MalformedEvent(e.to_string()))?;
        let method = event.proto_payload.method_name.as_str();

        let matched = self.registry.matching(method);
        if matched.is_empty() {
            info!(
                method = method,
                "No enabled plugin handles this method (OK if the plugin is disabled)"
            );
            metrics::record_event(EventOutcome::Ignored.metric_label());
            return Ok(EventOutcome::Ignored);
        }

        let project_id = event.project_id().ok_or_else(|| {
            LabelerError::MalformedEvent("missing resource.labels.project_id".to_string())
        })?;

        let mut outcome = EventOutcome::ProjectSkipped;
        if self.ctx.config.is_project_enabled(project_id) {
            for plugin in matched.iter().copied() {
                outcome = self.handle_event(plugin.as_ref(), &event, project_id).await;
                metrics::record_event(outcome.metric_label());
            }
        } else {
            info!(
                method = method,
                project = project_id,
                "Event from a project that is not enabled; skipping"
            );
            metrics::record_event(outcome.metric_label());
        }

        if matched.len() > 1 {
            let plugins: Vec<String> = matched.iter().map(|p| p.name().to_string()).collect();
            error!(
                method = method,
                plugins = ?plugins,
                "Several plugins match one method; check their method names"
            );
            metrics::record_event("ambiguous");
            return Err(LabelerError::AmbiguousDispatch {
                method: method.to_string(),
                plugins,
            });
        }
        Ok(outcome)
    }

    async fn handle_event(
        &self,
        plugin: &dyn ResourcePlugin,
        event: &LogEvent,
        project_id: &str,
    ) -> EventOutcome {
        if !plugin.descriptor().on_creation {
            info!(
                plugin = plugin.name(),
                project = project_id,
                "Plugin labels on scheduled passes only; ignoring creation event"
            );
            return EventOutcome::NotReactive;
        }

        let Some(resource) = plugin.resolve_from_event(event).await else {
            info!(
                plugin = plugin.name(),
                project = project_id,
                method = %event.proto_payload.method_name,
                "Could not resolve resource from event; a scheduled pass will label it"
            );
            return EventOutcome::Unresolved;
        };

        info!(
            plugin = plugin.name(),
            project = project_id,
            resource = resource.name().unwrap_or_default(),
            "Labeling resource from event"
        );
        let result = label_resource(plugin, &resource, project_id).await;
        // The queue is shared with concurrent passes, so the flush may carry their
        // writes too; its failures are logged by the dispatcher and do not judge
        // this event.
        plugin.core().flush().await;
        match result {
            Ok(label_outcome) => EventOutcome::Labeled(label_outcome),
            Err(_) => EventOutcome::Failed,
        }
    }

    /// Projects to label: the configured list, or every accessible project, minus
    /// exclusions. Sorted.
    ///
    /// # Errors
    ///
    /// - [`LabelerError::Provider`] if projects must be listed and listing fails
    /// - [`LabelerError::NoProjectsEnabled`] if nothing is left
    pub async fn enabled_projects(&self) -> Result<Vec<String>, LabelerError> {
        let config = &self.ctx.config;
        let candidates = if config.projects.is_empty() {
            self.ctx.gcp.list_projects().await?
        } else {
            config.projects.clone()
        };
        let mut projects: Vec<String> = candidates
            .into_iter()
            .filter(|p| config.is_project_enabled(p))
            .collect();
        projects.sort();
        projects.dedup();
        if projects.is_empty() {
            return Err(LabelerError::NoProjectsEnabled);
        }
        Ok(projects)
    }

    /// Publish one [`ScheduledLabeling`] per enabled project and scheduled plugin
    /// to `schedule_topic`.
    ///
    /// Returns the number of messages sent.
    ///
    /// # Errors
    ///
    /// - [`LabelerError::Config`] if `pubsub_project` is not configured
    /// - [`LabelerError::NoProjectsEnabled`] if there is nothing to label
    /// - [`LabelerError::Provider`] if listing projects or publishing fails
    pub async fn schedule(&self) -> Result<usize, LabelerError> {
        let config = &self.ctx.config;
        let pubsub_project = config.pubsub_project.as_deref().ok_or_else(|| {
            ConfigError::Invalid("pubsub_project is required to schedule labeling".to_string())
        })?;
        let projects = self.enabled_projects().await?;

        let scheduled: Vec<&'static str> = self
            .registry
            .all()
            .iter()
            .filter(|p| p.descriptor().is_scheduled(config.label_all_on_cron))
            .map(|p| p.name())
            .collect();
        if scheduled.is_empty() {
            warn!("No enabled plugin labels on scheduled passes");
        }

        let mut sent = 0;
        for project_id in &projects {
            for plugin in &scheduled {
                let message = ScheduledLabeling {
                    project_id: project_id.clone(),
                    plugin: (*plugin).to_string(),
                };
                let data = serde_json::to_value(&message)
                    .map_err(|e| LabelerError::MalformedMessage(e.to_string()))?;
                self.ctx
                    .gcp
                    .publish(pubsub_project, &config.schedule_topic, &data)
                    .await?;
                info!(project = %project_id, plugin = plugin, "Scheduled labeling");
                sent += 1;
            }
        }
        info!(
            messages = sent,
            projects = projects.len(),
            "Finished scheduling"
        );
        Ok(sent)
    }

    /// Check the `token` query parameter of a push request.
    ///
    /// # Errors
    ///
    /// - [`LabelerError::MissingVerificationToken`] if no token is configured
    /// - [`LabelerError::InvalidVerificationToken`] if `provided` differs from it
    pub fn verify_token(&self, provided: Option<&str>) -> Result<(), LabelerError> {
        let expected = self
            .ctx
            .config
            .pubsub_verification_token
            .as_deref()
            .ok_or(LabelerError::MissingVerificationToken)?;
        if provided != Some(expected) {
            warn!("Push request with an invalid verification token");
            metrics::record_event("rejected");
            return Err(LabelerError::InvalidVerificationToken);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "labeler_tests.rs"]
mod labeler_tests;
