// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for Iris.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

use std::time::Duration;

// ============================================================================
// Label Constants
// ============================================================================

/// Default prefix for every generated label key (`iris_name`, `iris_zone`, ...)
pub const DEFAULT_IRIS_PREFIX: &str = "iris";

/// Maximum length of a label value accepted by Google Cloud APIs (63), minus one
pub const MAX_LABEL_VALUE_LEN: usize = 62;

/// Default JSON pointer to a resource's labels
pub const DEFAULT_LABELS_POINTER: &str = "/labels";

// ============================================================================
// Batch Constants
// ============================================================================

/// Maximum number of queued write operations per batch request.
///
/// The Google API hard limit is 1000 calls per batch; staying just under it
/// avoids off-by-one rejections.
pub const BATCH_SIZE: usize = 990;

/// The Cloud Storage JSON API accepts at most 100 calls per batch
pub const STORAGE_BATCH_SIZE: usize = 99;

/// Multipart boundary prefix used for outgoing batch requests
pub const BATCH_BOUNDARY_PREFIX: &str = "iris_batch_";

// ============================================================================
// Concurrency Constants
// ============================================================================

/// Default number of zones enumerated concurrently
pub const DEFAULT_ZONE_WORKERS: usize = 8;

/// Default time-to-live of cached project labels (10 minutes)
pub const DEFAULT_PROJECT_LABEL_TTL_SECS: u64 = 600;

/// Most projects whose labels are cached at once
pub const PROJECT_LABEL_CACHE_CAPACITY: usize = 512;

/// BigQuery tolerates roughly this many metadata updates per period
pub const BIGQUERY_RATE_LIMIT_CALLS: u32 = 35;

/// Rate-limit window for BigQuery metadata updates
pub const BIGQUERY_RATE_LIMIT_PERIOD: Duration = Duration::from_secs(60);

// ============================================================================
// Google API Endpoints
// ============================================================================

/// Compute Engine API root
pub const COMPUTE_API_ROOT: &str = "https://compute.googleapis.com";

/// Cloud Storage JSON API root
pub const STORAGE_API_ROOT: &str = "https://storage.googleapis.com";

/// BigQuery API root
pub const BIGQUERY_API_ROOT: &str = "https://bigquery.googleapis.com";

/// Pub/Sub API root
pub const PUBSUB_API_ROOT: &str = "https://pubsub.googleapis.com";

/// Cloud SQL Admin API root
pub const SQLADMIN_API_ROOT: &str = "https://sqladmin.googleapis.com";

/// Bigtable Admin API root
pub const BIGTABLE_ADMIN_API_ROOT: &str = "https://bigtableadmin.googleapis.com";

/// Resource Manager API root
pub const RESOURCE_MANAGER_API_ROOT: &str = "https://cloudresourcemanager.googleapis.com";

/// GCE metadata server endpoint for the default service account's access token
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh a metadata-server token this long before it expires
pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ============================================================================
// Front End Constants
// ============================================================================

/// Default topic that receives one message per project and plugin on each schedule
pub const DEFAULT_SCHEDULE_TOPIC: &str = "iris_schedulelabeling_topic";

/// Default address the HTTP front end listens on
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Header set by App Engine cron on scheduled requests
pub const APPENGINE_CRON_HEADER: &str = "X-Appengine-Cron";

/// Header set by Cloud Scheduler on scheduled requests
pub const CLOUD_SCHEDULER_HEADER: &str = "X-CloudScheduler";
