// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded batching of label writes.
//!
//! A plugin queues write operations in its [`BatchDispatcher`]; the queue is sent as
//! a single batch request when it reaches capacity, and the remainder is sent when
//! the caller flushes at the end of a pass.
//!
//! # Failure isolation
//!
//! Each operation in a batch succeeds or fails on its own. A failed operation is
//! logged with its resource and request id, and the other operations in the batch are
//! unaffected. Neither [`BatchDispatcher::add`] nor [`BatchDispatcher::flush`] ever
//! returns an error: the next scheduled pass re-labels whatever failed.

use crate::errors::ProviderError;
use crate::metrics;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// HTTP verb of a queued write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    /// `POST`, e.g. compute `setLabels`
    Post,
    /// `PATCH`, e.g. storage and BigQuery label updates
    Patch,
}

impl HttpVerb {
    /// Verb as it appears on an HTTP request line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Patch => "PATCH",
        }
    }
}

/// One pending label write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOperation {
    /// Unique id, used to correlate a batch response part with its request
    pub request_id: String,
    /// HTTP verb
    pub verb: HttpVerb,
    /// Absolute request path, e.g. `/compute/v1/projects/p/zones/z/instances/vm/setLabels`
    pub path: String,
    /// JSON request body
    pub body: Value,
    /// Human-readable resource name for logs
    pub resource: String,
}

impl WriteOperation {
    /// Create an operation with a fresh request id.
    #[must_use]
    pub fn new(verb: HttpVerb, path: String, body: Value, resource: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            verb,
            path,
            body,
            resource: resource.into(),
        }
    }
}

/// Result of one operation inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The provider accepted the write
    Committed,
    /// The provider rejected the write
    Failed {
        /// HTTP status of the part, if one was reported
        status: Option<u16>,
        /// Error text
        message: String,
    },
}

/// Something that can send a batch of writes in a single request.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Send `operations` as one batch.
    ///
    /// On success the result has one outcome per operation, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch request as a whole fails.
    async fn execute(
        &self,
        operations: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, ProviderError>;
}

/// What one flush achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Operations sent
    pub sent: usize,
    /// Operations the provider accepted
    pub committed: usize,
    /// Operations that failed
    pub failed: usize,
}

/// Queue of pending writes for one plugin instance.
///
/// All queue mutations (enqueue, threshold check, taking the queue for a flush) happen
/// under one lock, so concurrent zone workers cannot both cross the threshold or
/// lose a reset. The network request itself is made after the lock is released.
pub struct BatchDispatcher {
    plugin: &'static str,
    capacity: usize,
    sink: Arc<dyn BatchSink>,
    queue: Mutex<Vec<WriteOperation>>,
}

impl BatchDispatcher {
    /// Create a dispatcher flushing at `capacity` queued operations (at least one).
    #[must_use]
    pub fn new(plugin: &'static str, capacity: usize, sink: Arc<dyn BatchSink>) -> Self {
        let capacity = capacity.max(1);
        Self {
            plugin,
            capacity,
            sink,
            queue: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued operations.
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Queue an operation, flushing if the queue is now full.
    ///
    /// Returns the report of the flush this call triggered, if any.
    pub async fn add(&self, operation: WriteOperation) -> Option<FlushReport> {
        let full = {
            let mut queue = self.queue.lock().await;
            debug!(
                plugin = self.plugin,
                resource = %operation.resource,
                request_id = %operation.request_id,
                "Queued label write"
            );
            queue.push(operation);
            if queue.len() >= self.capacity {
                Some(std::mem::replace(
                    &mut *queue,
                    Vec::with_capacity(self.capacity),
                ))
            } else {
                None
            }
        };

        match full {
            Some(operations) => Some(self.send(operations).await),
            None => None,
        }
    }

    /// Send whatever is queued. A no-op on an empty queue.
    pub async fn flush(&self) -> FlushReport {
        let operations = std::mem::take(&mut *self.queue.lock().await);
        if operations.is_empty() {
            return FlushReport::default();
        }
        self.send(operations).await
    }

    async fn send(&self, operations: Vec<WriteOperation>) -> FlushReport {
        let mut report = FlushReport {
            sent: operations.len(),
            ..FlushReport::default()
        };
        metrics::record_batch_flush(self.plugin);

        match self.sink.execute(&operations).await {
            Ok(outcomes) => {
                for (index, operation) in operations.iter().enumerate() {
                    let outcome = outcomes.get(index).cloned().unwrap_or_else(|| {
                        OperationOutcome::Failed {
                            status: None,
                            message: "No response part for operation".to_string(),
                        }
                    });
                    if self.on_result(operation, &outcome) {
                        report.committed += 1;
                    } else {
                        report.failed += 1;
                    }
                }
            }
            Err(e) => {
                error!(
                    plugin = self.plugin,
                    operations = operations.len(),
                    error = %e,
                    "Batch request failed; resources will be retried on the next pass"
                );
                report.failed = operations.len();
                metrics::record_label_writes(self.plugin, "failed", operations.len());
            }
        }

        info!(
            plugin = self.plugin,
            sent = report.sent,
            committed = report.committed,
            failed = report.failed,
            "Flushed label batch"
        );
        report
    }

    /// Per-operation callback. Logs failures; returns whether the write committed.
    fn on_result(&self, operation: &WriteOperation, outcome: &OperationOutcome) -> bool {
        match outcome {
            OperationOutcome::Committed => {
                metrics::record_label_writes(self.plugin, "committed", 1);
                true
            }
            OperationOutcome::Failed { status, message } => {
                error!(
                    plugin = self.plugin,
                    resource = %operation.resource,
                    request_id = %operation.request_id,
                    status = ?status,
                    error = %message,
                    "Label write failed"
                );
                metrics::record_label_writes(self.plugin, "failed", 1);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod batch_tests;
