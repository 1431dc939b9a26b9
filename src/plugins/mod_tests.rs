// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `plugins/mod.rs`

#[cfg(test)]
mod tests {
    use crate::config::{Config, PluginSettings, RateLimitSettings};
    use crate::plugins::bigquery::Bigquery;
    use crate::plugins::bigtable::Bigtable;
    use crate::plugins::buckets::Buckets;
    use crate::plugins::cloudsql::Cloudsql;
    use crate::plugins::disks::Disks;
    use crate::plugins::instances::Instances;
    use crate::plugins::snapshots::Snapshots;
    use crate::plugins::subscriptions::Subscriptions;
    use crate::plugins::topics::Topics;
    use crate::plugins::{PluginCore, PluginDescriptor};
    use crate::test_support::{test_context, RecordingSink};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    const ALL: [PluginDescriptor; 9] = [
        Instances::DESCRIPTOR,
        Disks::DESCRIPTOR,
        Snapshots::DESCRIPTOR,
        Buckets::DESCRIPTOR,
        Bigquery::DESCRIPTOR,
        Topics::DESCRIPTOR,
        Subscriptions::DESCRIPTOR,
        Cloudsql::DESCRIPTOR,
        Bigtable::DESCRIPTOR,
    ];

    fn matching(method: &str) -> Vec<&'static str> {
        ALL.iter()
            .filter(|d| d.matches_method(method))
            .map(|d| d.name)
            .collect()
    }

    #[test]
    fn test_each_creation_method_matches_exactly_one_plugin() {
        assert_eq!(matching("v1.compute.instances.insert"), ["Instances"]);
        assert_eq!(matching("v1.compute.disks.insert"), ["Disks"]);
        assert_eq!(matching("v1.compute.disks.createSnapshot"), ["Snapshots"]);
        assert_eq!(matching("storage.buckets.create"), ["Buckets"]);
        assert_eq!(matching("datasetservice.insert"), ["Bigquery"]);
        assert_eq!(matching("google.pubsub.v1.Publisher.CreateTopic"), ["Topics"]);
        assert_eq!(
            matching("google.pubsub.v1.Subscriber.CreateSubscription"),
            ["Subscriptions"]
        );
        assert_eq!(matching("cloudsql.instances.create"), ["Cloudsql"]);
    }

    #[test]
    fn test_unrelated_method_matches_nothing() {
        assert!(matching("unrelated.api.call").is_empty());
        assert!(matching("v1.compute.instances.delete").is_empty());
    }

    #[test]
    fn test_method_match_is_case_insensitive() {
        assert!(Topics::DESCRIPTOR.matches_method("GOOGLE.PUBSUB.V1.PUBLISHER.CREATETOPIC"));
    }

    #[test]
    fn test_with_settings_overrides() {
        let settings = PluginSettings {
            on_creation: Some(false),
            relabel_on_cron: Some(true),
            batch_size: Some(50),
            rate_limit: Some(RateLimitSettings {
                calls: 5,
                period_secs: 10,
            }),
            ..PluginSettings::default()
        };

        let d = Instances::DESCRIPTOR.with_settings(Some(&settings));
        assert!(!d.on_creation);
        assert!(d.relabel_on_cron);
        assert_eq!(d.batch_size, Some(50));
        assert_eq!(d.rate_limit, Some((5, Duration::from_secs(10))));
    }

    #[test]
    fn test_batch_size_override_ignored_for_direct_writers() {
        let settings = PluginSettings {
            batch_size: Some(50),
            ..PluginSettings::default()
        };
        assert_eq!(Topics::DESCRIPTOR.with_settings(Some(&settings)).batch_size, None);
        assert_eq!(Topics::DESCRIPTOR.with_settings(None), Topics::DESCRIPTOR);
    }

    #[test]
    fn test_is_scheduled() {
        assert!(!Instances::DESCRIPTOR.is_scheduled(false));
        assert!(Disks::DESCRIPTOR.is_scheduled(false));
        assert!(Cloudsql::DESCRIPTOR.is_scheduled(false));
        assert!(ALL.iter().all(|d| d.is_scheduled(true)));
    }

    #[tokio::test]
    async fn test_core_applies_configured_batch_size() {
        let mut plugins = HashMap::new();
        plugins.insert(
            "instances".to_string(),
            PluginSettings {
                batch_size: Some(2),
                ..PluginSettings::default()
            },
        );
        let ctx = test_context(
            Config {
                plugins,
                ..Config::default()
            },
            &[],
        );
        let sink = Arc::new(RecordingSink::default());
        let core = PluginCore::with_sink(Instances::DESCRIPTOR, ctx, sink.clone());

        assert_eq!(core.descriptor().batch_size, Some(2));
        for name in ["a", "b", "c"] {
            core.submit(crate::batch::WriteOperation::new(
                crate::batch::HttpVerb::Post,
                format!("/compute/v1/projects/p/zones/z/instances/{name}/setLabels"),
                serde_json::json!({}),
                name,
            ))
            .await
            .unwrap();
        }

        assert_eq!(sink.batch_count(), 1);
        assert_eq!(core.pending().await, 1);
        assert_eq!(core.flush().await.committed, 1);
    }
}
