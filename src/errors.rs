// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for Iris.
//!
//! This module provides specialized error types for:
//! - Google Cloud API calls (HTTP failures, transport failures, batch parsing)
//! - Driver-level setup failures (unknown plugins, missing tokens, malformed events)
//!
//! Only [`LabelerError`] ever reaches the external trigger. Provider failures for a
//! single resource or zone are logged and contained where they happen.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors returned by calls to Google Cloud APIs.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The API answered with a non-success HTTP status
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Request URL
        url: String,
        /// Response body, as returned by the API
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset, timeout)
    #[error("Failed to send request to {url}: {source}")]
    Request {
        /// Request URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the JSON we expected
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        /// Request URL
        url: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A batch response could not be parsed
    #[error("Malformed batch response: {0}")]
    Batch(String),

    /// No access token could be obtained
    #[error("Failed to obtain access token: {0}")]
    Token(String),

    /// A resource lacks a field needed to address it (name, zone, reference)
    #[error("Resource is missing '{0}'")]
    MissingField(&'static str),
}

impl ProviderError {
    /// HTTP status code, if the API answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure is transient (429, 5xx gateway errors, or no response at all).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Request { .. } => true,
            Self::Decode { .. } | Self::Batch(_) | Self::Token(_) | Self::MissingField(_) => false,
        }
    }
}

/// Errors surfaced to the external trigger by the driver.
///
/// Everything in this enum is a setup or configuration failure; per-resource
/// failures never get this far.
#[derive(Error, Debug)]
pub enum LabelerError {
    /// No plugin with this name is registered, or it is disabled in configuration
    #[error("No enabled plugin named '{name}'")]
    UnknownPlugin {
        /// The requested plugin name
        name: String,
    },

    /// Configuration disables every plugin
    #[error("No plugins are enabled")]
    NoPluginsEnabled,

    /// Neither configuration nor the Resource Manager yielded a project to label
    #[error("No projects are enabled")]
    NoProjectsEnabled,

    /// Push endpoints require `pubsub_verification_token` in configuration
    #[error("pubsub_verification_token must be configured")]
    MissingVerificationToken,

    /// The push request carried the wrong token
    #[error("Invalid verification token")]
    InvalidVerificationToken,

    /// The log event is missing fields required for dispatch
    #[error("Malformed log event: {0}")]
    MalformedEvent(String),

    /// The Pub/Sub push envelope could not be decoded
    #[error("Malformed push message: {0}")]
    MalformedMessage(String),

    /// More than one plugin claims the event's method name
    #[error("Multiple plugins {plugins:?} match method '{method}'")]
    AmbiguousDispatch {
        /// Method name from the log event
        method: String,
        /// Names of every matching plugin
        plugins: Vec<String>,
    },

    /// A provider call needed for setup failed (project listing, publishing)
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
