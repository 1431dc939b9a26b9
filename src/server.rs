// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP front end.
//!
//! | Route | Trigger | Action |
//! |-------|---------|--------|
//! | `GET /` | anyone | banner |
//! | `GET /schedule` | Cloud Scheduler / App Engine cron | [`Labeler::schedule`] |
//! | `POST /do_label?token=` | Pub/Sub push from `schedule` | [`Labeler::label_all`] |
//! | `POST /label_one?token=` | Pub/Sub push from the audit-log sink | [`Labeler::label_one`] |
//! | `GET /metrics` | Prometheus | metrics in text format |

use crate::constants::{APPENGINE_CRON_HEADER, CLOUD_SCHEDULER_HEADER};
use crate::errors::LabelerError;
use crate::labeler::{Labeler, ScheduledLabeling};
use crate::metrics;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Query string of the push endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    /// Must equal `pubsub_verification_token`
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushEnvelope {
    message: PushMessage,
    #[serde(default)]
    delivery_attempt: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    data: String,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    publish_time: Option<String>,
}

/// Decode the JSON payload carried, base64-encoded, in a Pub/Sub push envelope.
///
/// # Errors
///
/// Returns [`LabelerError::MalformedMessage`] if the envelope, the base64 or the
/// JSON inside it is invalid.
pub fn decode_push_payload(body: &[u8]) -> Result<Value, LabelerError> {
    let envelope: PushEnvelope = serde_json::from_slice(body)
        .map_err(|e| LabelerError::MalformedMessage(format!("envelope: {e}")))?;
    debug!(
        message_id = envelope.message.message_id.as_deref().unwrap_or("N/A"),
        publish_time = envelope.message.publish_time.as_deref().unwrap_or("N/A"),
        delivery_attempt = ?envelope.delivery_attempt,
        "Received push message"
    );
    let data = base64::engine::general_purpose::STANDARD
        .decode(envelope.message.data.trim())
        .map_err(|e| LabelerError::MalformedMessage(format!("data: {e}")))?;
    serde_json::from_slice(&data)
        .map_err(|e| LabelerError::MalformedMessage(format!("data is not JSON: {e}")))
}

/// Build the router over a shared driver.
pub fn router(labeler: Arc<Labeler>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/schedule", get(schedule))
        .route("/do_label", post(do_label))
        .route("/label_one", post(label_one))
        .route("/metrics", get(metrics_text))
        .with_state(labeler)
}

/// Serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(labeler: Arc<Labeler>, listen_addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(labeler))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

async fn index() -> &'static str {
    concat!("Iris ", env!("CARGO_PKG_VERSION"), ": automatic labeling for Google Cloud\n")
}

async fn schedule(State(labeler): State<Arc<Labeler>>, headers: HeaderMap) -> Response {
    if !headers.contains_key(APPENGINE_CRON_HEADER) && !headers.contains_key(CLOUD_SCHEDULER_HEADER)
    {
        warn!("Rejected /schedule call without a scheduler header");
        return (StatusCode::FORBIDDEN, "Access denied: cron or scheduler only").into_response();
    }
    match labeler.schedule().await {
        Ok(sent) => format!("OK, sent {sent} messages").into_response(),
        Err(e) => e.into_response(),
    }
}

async fn do_label(
    State(labeler): State<Arc<Labeler>>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Result<&'static str, LabelerError> {
    labeler.verify_token(query.token.as_deref())?;
    let request: ScheduledLabeling = serde_json::from_value(decode_push_payload(&body)?)
        .map_err(|e| LabelerError::MalformedMessage(e.to_string()))?;
    labeler
        .label_all(&request.plugin, &request.project_id)
        .await?;
    Ok("OK")
}

async fn label_one(
    State(labeler): State<Arc<Labeler>>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Result<&'static str, LabelerError> {
    labeler.verify_token(query.token.as_deref())?;
    let event = decode_push_payload(&body)?;
    labeler.label_one(event).await?;
    Ok("OK")
}

async fn metrics_text() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to gather metrics: {e}"),
        ),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
