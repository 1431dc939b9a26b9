// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label synthesis: computing the complete label set a resource should carry.
//!
//! Three sources feed the label set:
//!
//! 1. **Project labels**, inherited from the owning project (optional)
//! 2. **Generated labels**, one per attribute extractor the plugin declares, keyed
//!    `{prefix}_{attribute}` and legalized
//! 3. **Existing labels** already on the resource
//!
//! Existing labels always win, so manual tags are never clobbered. Whether project
//! or generated labels win over each other is [`LabelPrecedence`].
//!
//! When the merged set equals the existing labels nothing is written: re-running a
//! pass over already-labeled resources issues no writes and leaves fingerprints alone.

use crate::config::LabelPrecedence;
use crate::labels::{label_key, legalize, LabelMap};
use crate::record::{LabelWriteRequest, ResourceRecord};
use tracing::debug;

/// One attribute a plugin can derive from its resources.
#[derive(Clone, Copy)]
pub struct Capability {
    /// Attribute name, the suffix of the generated label key (`name`, `zone`, ...)
    pub attribute: &'static str,
    /// Reads the attribute's raw value; `None` when the resource lacks it
    pub extract: fn(&ResourceRecord) -> Option<String>,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("attribute", &self.attribute)
            .finish_non_exhaustive()
    }
}

/// How to turn extracted attributes into labels for one plugin.
#[derive(Debug, Clone, Copy)]
pub struct LabelPolicy<'a> {
    /// Label-key prefix
    pub prefix: &'a str,
    /// Attributes to generate; empty means all the plugin supports
    pub vocabulary: &'a [String],
    /// Project versus generated labels
    pub precedence: LabelPrecedence,
    /// JSON pointer to the resource's existing labels
    pub labels_pointer: &'a str,
}

impl LabelPolicy<'_> {
    fn allows(&self, attribute: &str) -> bool {
        self.vocabulary.is_empty() || self.vocabulary.iter().any(|a| a == attribute)
    }
}

/// Labels generated from a resource's own attributes.
///
/// Extractors returning `None` are skipped; the rest of the labels are still produced.
#[must_use]
pub fn generate_labels(
    resource: &ResourceRecord,
    capabilities: &[Capability],
    policy: &LabelPolicy<'_>,
) -> LabelMap {
    let mut labels = LabelMap::new();
    for capability in capabilities {
        if !policy.allows(capability.attribute) {
            continue;
        }
        match (capability.extract)(resource) {
            Some(raw) => {
                labels.insert(
                    label_key(policy.prefix, capability.attribute),
                    legalize(&raw),
                );
            }
            None => debug!(
                resource = resource.name().unwrap_or_default(),
                attribute = capability.attribute,
                "Attribute missing on resource; label omitted"
            ),
        }
    }
    labels
}

/// Compute the write needed to bring a resource's labels up to date.
///
/// Returns `None` when the resource already carries every label.
///
/// # Example
///
/// ```rust
/// use iris::config::LabelPrecedence;
/// use iris::labels::LabelMap;
/// use iris::record::ResourceRecord;
/// use iris::synthesizer::{synthesize, Capability, LabelPolicy};
/// use serde_json::json;
///
/// let capabilities = [Capability {
///     attribute: "name",
///     extract: |r| r.name().map(str::to_string),
/// }];
/// let policy = LabelPolicy {
///     prefix: "iris",
///     vocabulary: &[],
///     precedence: LabelPrecedence::Generated,
///     labels_pointer: "/labels",
/// };
/// let resource = ResourceRecord::new(json!({"name": "My-VM", "labels": {"team": "ops"}}));
///
/// let request = synthesize(&resource, &capabilities, &policy, &LabelMap::new()).unwrap();
/// assert_eq!(request.labels["iris_name"], "my-vm");
/// assert_eq!(request.labels["team"], "ops");
/// ```
#[must_use]
pub fn synthesize(
    resource: &ResourceRecord,
    capabilities: &[Capability],
    policy: &LabelPolicy<'_>,
    project_labels: &LabelMap,
) -> Option<LabelWriteRequest> {
    let generated = generate_labels(resource, capabilities, policy);
    let existing = resource.labels_at(policy.labels_pointer);

    let (lower, higher) = match policy.precedence {
        LabelPrecedence::Generated => (project_labels, &generated),
        LabelPrecedence::Project => (&generated, project_labels),
    };
    let mut merged = lower.clone();
    merged.extend(higher.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(existing.iter().map(|(k, v)| (k.clone(), v.clone())));

    if merged == existing {
        return None;
    }
    Some(LabelWriteRequest {
        labels: merged,
        fingerprint: resource.label_fingerprint().map(str::to_string),
    })
}

#[cfg(test)]
#[path = "synthesizer_tests.rs"]
mod synthesizer_tests;
