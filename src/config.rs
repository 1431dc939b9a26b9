// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Iris configuration.
//!
//! Configuration is a YAML file; every key is optional. See `config.yaml.example`
//! for a commented template.

use crate::constants::{
    BATCH_SIZE, DEFAULT_IRIS_PREFIX, DEFAULT_LISTEN_ADDR, DEFAULT_PROJECT_LABEL_TTL_SECS,
    DEFAULT_SCHEDULE_TOPIC, DEFAULT_ZONE_WORKERS,
};
use crate::labels::legalize;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File path
        path: String,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`Config`]
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which of project-inherited and generated labels wins when both set a key.
///
/// Pre-existing resource labels always win over both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPrecedence {
    /// Generated labels override project labels
    #[default]
    Generated,
    /// Project labels override generated labels
    Project,
}

/// Per-plugin rate limit: at most `calls` writes per `period_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitSettings {
    /// Calls allowed per window
    pub calls: u32,
    /// Window length in seconds
    pub period_secs: u64,
}

impl RateLimitSettings {
    /// The window as a `Duration`.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// Per-plugin overrides. Unset fields keep the plugin's built-in behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginSettings {
    /// Disabled plugins are not registered at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Label resources as soon as their creation event arrives
    #[serde(default)]
    pub on_creation: Option<bool>,
    /// Also label on every scheduled pass
    #[serde(default)]
    pub relabel_on_cron: Option<bool>,
    /// Replaces `iris_prefix` for this plugin's label keys
    #[serde(default)]
    pub prefix: Option<String>,
    /// Throttle for label writes
    #[serde(default)]
    pub rate_limit: Option<RateLimitSettings>,
    /// Batch capacity
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            on_creation: None,
            relabel_on_cron: None,
            prefix: None,
            rate_limit: None,
            batch_size: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    DEFAULT_IRIS_PREFIX.to_string()
}

fn default_schedule_topic() -> String {
    DEFAULT_SCHEDULE_TOPIC.to_string()
}

fn default_zone_workers() -> usize {
    DEFAULT_ZONE_WORKERS
}

fn default_project_label_ttl_secs() -> u64 {
    DEFAULT_PROJECT_LABEL_TTL_SECS
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Prefix for generated label keys
    #[serde(default = "default_prefix")]
    pub iris_prefix: String,
    /// Attribute vocabulary (`name`, `zone`, ...). Empty means every attribute a plugin supports
    #[serde(default)]
    pub labels: Vec<String>,
    /// Copy the owning project's labels onto its resources
    #[serde(default = "default_true")]
    pub from_project: bool,
    /// Precedence between project-inherited and generated labels
    #[serde(default)]
    pub project_label_precedence: LabelPrecedence,
    /// Schedule every plugin on every pass, not just those that need it
    #[serde(default)]
    pub label_all_on_cron: bool,
    /// Plugin name to overrides. Empty enables every plugin with built-in settings
    #[serde(default)]
    pub plugins: HashMap<String, PluginSettings>,
    /// Explicitly enabled projects. Empty means every accessible project
    #[serde(default)]
    pub projects: Vec<String>,
    /// Projects never labeled
    #[serde(default)]
    pub excluded_projects: Vec<String>,
    /// Token Pub/Sub push subscriptions must present
    #[serde(default)]
    pub pubsub_verification_token: Option<String>,
    /// Project hosting the schedule topic
    #[serde(default)]
    pub pubsub_project: Option<String>,
    /// Topic receiving one message per project and plugin on each schedule
    #[serde(default = "default_schedule_topic")]
    pub schedule_topic: String,
    /// Zones enumerated concurrently
    #[serde(default = "default_zone_workers")]
    pub zone_workers: usize,
    /// Project-label cache lifetime
    #[serde(default = "default_project_label_ttl_secs")]
    pub project_label_ttl_secs: u64,
    /// Base URL replacing every Google API root (emulators, tests)
    #[serde(default)]
    pub endpoint_override: Option<String>,
    /// Static bearer token; otherwise `IRIS_ACCESS_TOKEN`, otherwise the metadata server
    #[serde(default)]
    pub access_token: Option<String>,
    /// Front-end bind address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iris_prefix: default_prefix(),
            labels: Vec::new(),
            from_project: true,
            project_label_precedence: LabelPrecedence::default(),
            label_all_on_cron: false,
            plugins: HashMap::new(),
            projects: Vec::new(),
            excluded_projects: Vec::new(),
            pubsub_verification_token: None,
            pubsub_project: None,
            schedule_topic: default_schedule_topic(),
            zone_workers: default_zone_workers(),
            project_label_ttl_secs: default_project_label_ttl_secs(),
            endpoint_override: None,
            access_token: None,
            listen_addr: default_listen_addr(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if legalize(&self.iris_prefix) != self.iris_prefix {
            return Err(ConfigError::Invalid(format!(
                "iris_prefix '{}' is not a legal label key",
                self.iris_prefix
            )));
        }
        if self.zone_workers == 0 {
            return Err(ConfigError::Invalid("zone_workers must be at least 1".into()));
        }
        for (name, settings) in &self.plugins {
            if let Some(size) = settings.batch_size {
                if size == 0 || size > BATCH_SIZE {
                    return Err(ConfigError::Invalid(format!(
                        "plugins.{name}.batch_size must be between 1 and {BATCH_SIZE}"
                    )));
                }
            }
            if let Some(limit) = settings.rate_limit {
                if limit.calls == 0 || limit.period_secs == 0 {
                    return Err(ConfigError::Invalid(format!(
                        "plugins.{name}.rate_limit needs at least 1 call per at least 1 second"
                    )));
                }
            }
            if let Some(prefix) = &settings.prefix {
                if &legalize(prefix) != prefix {
                    return Err(ConfigError::Invalid(format!(
                        "plugins.{name}.prefix '{prefix}' is not a legal label key"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Settings for a plugin, matched case-insensitively. `None` when the plugin
    /// is not listed.
    #[must_use]
    pub fn plugin_settings(&self, plugin: &str) -> Option<&PluginSettings> {
        self.plugins
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(plugin))
            .map(|(_, settings)| settings)
    }

    /// Whether a plugin should be registered.
    #[must_use]
    pub fn is_plugin_enabled(&self, plugin: &str) -> bool {
        if self.plugins.is_empty() {
            return true;
        }
        self.plugin_settings(plugin).is_some_and(|s| s.enabled)
    }

    /// Label-key prefix for a plugin: its own override, else `iris_prefix`.
    #[must_use]
    pub fn prefix_for(&self, plugin: &str) -> &str {
        self.plugin_settings(plugin)
            .and_then(|s| s.prefix.as_deref())
            .unwrap_or(&self.iris_prefix)
    }

    /// Whether resources of a project may be labeled.
    #[must_use]
    pub fn is_project_enabled(&self, project_id: &str) -> bool {
        if self.excluded_projects.iter().any(|p| p == project_id) {
            return false;
        }
        self.projects.is_empty() || self.projects.iter().any(|p| p == project_id)
    }

    /// Project-label cache lifetime.
    #[must_use]
    pub fn project_label_ttl(&self) -> Duration {
        Duration::from_secs(self.project_label_ttl_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
