// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Iris - Automatic Labeling for Google Cloud Resources
//!
//! Iris keeps Google Cloud resources labeled with attributes derived from the
//! resources themselves (name, zone, region, instance type, ...) and, optionally,
//! with the labels of their owning project.
//!
//! ## Overview
//!
//! Iris labels resources two ways:
//!
//! - **On creation** - a push endpoint receives audit-log events for newly created
//!   resources and labels each one right away
//! - **On schedule** - a cron endpoint publishes one request per project and resource
//!   type; each request re-labels every resource of that type in that project
//!
//! Existing labels are never overwritten, and resources already carrying every
//! label are left alone.
//!
//! ## Modules
//!
//! - [`labels`] - Label values and the legalizer
//! - [`synthesizer`] - Computing the label set a resource should carry
//! - [`engine`] - Labeling one resource, or every resource of a type
//! - [`zones`] - Zone-parallel enumeration for zonal types
//! - [`batch`] - Bounded batching of label writes
//! - [`rate_limit`] - Rolling-window write throttle
//! - [`plugins`] - One plugin per supported resource type
//! - [`registry`] - The set of enabled plugins
//! - [`labeler`] - The driver: `label_all`, `label_one` and scheduling
//! - [`server`] - The HTTP front end
//! - [`gcp`] - Google Cloud REST client
//!
//! ## Example
//!
//! ```rust,no_run
//! use iris::config::Config;
//! use iris::context::Context;
//! use iris::labeler::Labeler;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_yaml("labels: [name, zone, region]")?;
//! let ctx = Arc::new(Context::new(config)?);
//! let labeler = Labeler::load(ctx)?;
//!
//! let summary = labeler.label_all("Disks", "my-project").await?;
//! println!("{} disks labeled", summary.written);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod gcp;
pub mod http_errors;
pub mod labeler;
pub mod labels;
pub mod metrics;
pub mod plugins;
pub mod rate_limit;
pub mod record;
pub mod registry;
pub mod retry;
pub mod server;
pub mod synthesizer;
pub mod zones;

#[cfg(test)]
mod test_support;
