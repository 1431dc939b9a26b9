// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Time-bounded cache of project labels.
//!
//! Concurrent refreshes of the same project may race; both fetch the same labels,
//! so the last write wins harmlessly.

use crate::constants::PROJECT_LABEL_CACHE_CAPACITY;
use crate::gcp::GcpClient;
use crate::labels::LabelMap;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Values keyed by string, each valid for a fixed time after insertion.
///
/// Expired entries are dropped when read and swept on every insert. When the cache
/// is full, an insert evicts the oldest entry.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: DashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    /// Empty, unbounded cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            capacity: usize::MAX,
            entries: DashMap::new(),
        }
    }

    /// Bound the cache to `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// The value for `key`, if present and not expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            let (stored_at, value) = entry.value();
            if stored_at.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        // The read guard is released above; removing under it would deadlock
        self.entries
            .remove_if(key, |_, (stored_at, _)| stored_at.elapsed() >= self.ttl);
        None
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, value: V) {
        self.entries
            .retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        if !self.entries.contains_key(key) {
            while self.entries.len() >= self.capacity {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|entry| entry.value().0)
                    .map(|entry| entry.key().clone());
                match oldest {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
        self.entries
            .insert(key.to_string(), (Instant::now(), value));
    }

    /// Number of stored entries. Expired entries not yet swept are counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Project id to that project's own labels.
#[derive(Debug)]
pub struct ProjectLabelCache {
    cache: TtlCache<LabelMap>,
}

impl ProjectLabelCache {
    /// Empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl).with_capacity(PROJECT_LABEL_CACHE_CAPACITY),
        }
    }

    /// Seed the cache, e.g. with labels already known from another call.
    pub fn insert(&self, project_id: &str, labels: LabelMap) {
        self.cache.insert(project_id, labels);
    }

    /// Labels of `project_id`, fetched if missing or expired.
    ///
    /// A failed fetch is logged and yields no labels; it is not cached, so the next
    /// resource retries it.
    pub async fn get(&self, gcp: &GcpClient, project_id: &str) -> LabelMap {
        if let Some(labels) = self.cache.get(project_id) {
            return labels;
        }
        match gcp.project_labels(project_id).await {
            Ok(labels) => {
                debug!(project = project_id, labels = labels.len(), "Cached project labels");
                self.cache.insert(project_id, labels.clone());
                labels
            }
            Err(e) => {
                warn!(
                    project = project_id,
                    error = %e,
                    "Failed to read project labels; labeling without them"
                );
                LabelMap::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
