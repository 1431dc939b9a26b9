// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mapping driver errors to HTTP status codes for the push and cron endpoints.
//!
//! Pub/Sub redelivers a push message until it gets a 2xx, and Cloud Scheduler
//! records a non-2xx as a failed run, so only setup failures produce one.
//!
//! # Usage
//!
//! ```rust
//! use axum::http::StatusCode;
//! use iris::errors::LabelerError;
//! use iris::http_errors::status_for;
//!
//! assert_eq!(status_for(&LabelerError::InvalidVerificationToken), StatusCode::FORBIDDEN);
//! assert_eq!(status_for(&LabelerError::NoPluginsEnabled), StatusCode::INTERNAL_SERVER_ERROR);
//! ```

use crate::errors::LabelerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Map a driver error to the status returned to the trigger.
///
/// # HTTP Code Mapping
///
/// | Error | HTTP Code | Meaning |
/// |-------|-----------|---------|
/// | `InvalidVerificationToken` | 403 | Caller is not our push subscription |
/// | `MissingVerificationToken` | 400 | Push endpoints are not configured |
/// | `MalformedEvent` | 400 | Event lacks fields needed for dispatch |
/// | `MalformedMessage` | 400 | Push envelope could not be decoded |
/// | Other | 500 | Setup failure (unknown plugin, provider error, ...) |
#[must_use]
pub fn status_for(err: &LabelerError) -> StatusCode {
    match err {
        LabelerError::InvalidVerificationToken => StatusCode::FORBIDDEN,
        LabelerError::MissingVerificationToken
        | LabelerError::MalformedEvent(_)
        | LabelerError::MalformedMessage(_) => StatusCode::BAD_REQUEST,
        LabelerError::UnknownPlugin { .. }
        | LabelerError::NoPluginsEnabled
        | LabelerError::NoProjectsEnabled
        | LabelerError::AmbiguousDispatch { .. }
        | LabelerError::Provider(_)
        | LabelerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for LabelerError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        error!(status = status.as_u16(), error = %self, "Request failed");
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
#[path = "http_errors_tests.rs"]
mod http_errors_tests;
