// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The Google API batch protocol.
//!
//! A batch is one `multipart/mixed` POST whose parts are complete HTTP requests
//! (`application/http`). Each part carries a `Content-ID`; the response part for it
//! echoes the id as `response-<id>` and contains a complete HTTP response whose
//! status tells whether that single call succeeded.

use crate::batch::{BatchSink, OperationOutcome, WriteOperation};
use crate::constants::BATCH_BOUNDARY_PREFIX;
use crate::errors::ProviderError;
use crate::gcp::{GcpClient, Service};
use crate::retry::retry_provider_call;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Any absolute base works; only the path and query of the joined URL are used.
const BATCH_TARGET_BASE: &str = "https://batch.invalid";

/// Request target of a batch part, percent-encoded like a URL path and query.
///
/// Resource ids may contain spaces and other non-ASCII text (BigQuery table ids);
/// left raw they would split the part's request line. Already-encoded text is kept.
#[must_use]
pub fn request_target(path: &str) -> String {
    match Url::parse(BATCH_TARGET_BASE).and_then(|base| base.join(path)) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        },
        Err(_) => path.to_string(),
    }
}

/// Encode operations as a `multipart/mixed` body delimited by `boundary`.
#[must_use]
pub fn encode_batch(boundary: &str, operations: &[WriteOperation]) -> String {
    let mut body = String::new();
    for operation in operations {
        let payload = operation.body.to_string();
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str("Content-Transfer-Encoding: binary\r\n");
        body.push_str(&format!("Content-ID: <{}>\r\n\r\n", operation.request_id));
        body.push_str(&format!(
            "{} {} HTTP/1.1\r\n",
            operation.verb.as_str(),
            request_target(&operation.path)
        ));
        body.push_str("Content-Type: application/json; charset=UTF-8\r\n");
        body.push_str(&format!("Content-Length: {}\r\n\r\n", payload.len()));
        body.push_str(&payload);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

/// The `boundary` parameter of a `multipart/mixed` content type.
#[must_use]
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Split a header block from what follows the first blank line.
fn split_head(text: &str) -> (&str, &str) {
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let lf = text.find("\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((index, len)) => (&text[..index], &text[index + len..]),
        None => (text, ""),
    }
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

/// Readable message for a failed part: the API's `error.message` when present.
fn error_message(body: &str) -> String {
    let body = body.trim();
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// One decoded response part.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResponsePart {
    content_id: Option<String>,
    outcome: OperationOutcome,
}

fn parse_part(part: &str) -> Result<ResponsePart, ProviderError> {
    let (outer_head, inner) = split_head(part);
    let content_id = header(outer_head, "Content-ID").map(|id| {
        let id = id.trim_start_matches('<').trim_end_matches('>');
        id.strip_prefix("response-").unwrap_or(id).to_string()
    });

    let (inner_head, body) = split_head(inner);
    let status_line = inner_head.lines().next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ProviderError::Batch(format!("bad status line '{status_line}'")))?;

    let outcome = if (200..300).contains(&status) {
        OperationOutcome::Committed
    } else {
        OperationOutcome::Failed {
            status: Some(status),
            message: error_message(body),
        }
    };
    Ok(ResponsePart {
        content_id,
        outcome,
    })
}

/// Decode a batch response into one outcome per operation, in operation order.
///
/// Parts are matched to operations by `Content-ID`; parts without a usable id are
/// matched by position. An operation with no response part is reported as failed.
///
/// # Errors
///
/// Returns [`ProviderError::Batch`] if the body is not a multipart response.
pub fn parse_batch_response(
    content_type: &str,
    body: &str,
    operations: &[WriteOperation],
) -> Result<Vec<OperationOutcome>, ProviderError> {
    let boundary = boundary_from_content_type(content_type).ok_or_else(|| {
        ProviderError::Batch(format!("no boundary in content type '{content_type}'"))
    })?;
    let delimiter = format!("--{boundary}");

    let mut parts = Vec::new();
    for chunk in body.split(delimiter.as_str()).skip(1) {
        if chunk.starts_with("--") {
            break;
        }
        let chunk = chunk.trim_start_matches(&['\r', '\n'][..]);
        if chunk.trim().is_empty() {
            continue;
        }
        parts.push(parse_part(chunk)?);
    }

    let mut by_id: HashMap<&str, &OperationOutcome> = parts
        .iter()
        .filter_map(|p| p.content_id.as_deref().map(|id| (id, &p.outcome)))
        .collect();

    Ok(operations
        .iter()
        .enumerate()
        .map(|(index, operation)| {
            by_id
                .remove(operation.request_id.as_str())
                .or_else(|| {
                    parts
                        .get(index)
                        .filter(|p| p.content_id.is_none())
                        .map(|p| &p.outcome)
                })
                .cloned()
                .unwrap_or_else(|| OperationOutcome::Failed {
                    status: None,
                    message: "No response part for operation".to_string(),
                })
        })
        .collect())
}

/// Sends batches to one Google API's batch endpoint.
pub struct GcpBatchSink {
    client: Arc<GcpClient>,
    service: Service,
}

impl GcpBatchSink {
    /// Sink for `service`, which must have a batch endpoint.
    #[must_use]
    pub fn new(client: Arc<GcpClient>, service: Service) -> Self {
        Self { client, service }
    }

    async fn execute_once(
        &self,
        url: &str,
        operations: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, ProviderError> {
        let boundary = format!("{BATCH_BOUNDARY_PREFIX}{}", uuid::Uuid::new_v4().simple());
        let payload = encode_batch(&boundary, operations);

        let response = self
            .client
            .http()
            .post(url)
            .bearer_auth(self.client.bearer().await?)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/mixed; boundary={boundary}"),
            )
            .body(payload)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response
            .text()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                message: text,
            });
        }
        parse_batch_response(&content_type, &text, operations)
    }
}

#[async_trait]
impl BatchSink for GcpBatchSink {
    async fn execute(
        &self,
        operations: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, ProviderError> {
        let path = self.service.batch_path().ok_or_else(|| {
            ProviderError::Batch(format!("{:?} has no batch endpoint", self.service))
        })?;
        let url = self.client.url(self.service, path, &[]);
        debug!(url = %url, operations = operations.len(), "Sending batch request");

        retry_provider_call(
            self.client.retry_policy(),
            || self.execute_once(&url, operations),
            "batch",
        )
        .await
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod batch_tests;
