// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `synthesizer.rs`

#[cfg(test)]
mod tests {
    use crate::config::LabelPrecedence;
    use crate::labels::LabelMap;
    use crate::plugins::compute::{NAME, REGION, ZONE};
    use crate::record::ResourceRecord;
    use crate::synthesizer::{generate_labels, synthesize, Capability, LabelPolicy};
    use serde_json::json;

    const DISK_CAPABILITIES: &[Capability] = &[NAME, ZONE, REGION];

    fn policy(precedence: LabelPrecedence, vocabulary: &[String]) -> LabelPolicy<'_> {
        LabelPolicy {
            prefix: "iris",
            vocabulary,
            precedence,
            labels_pointer: "/labels",
        }
    }

    fn map(pairs: &[(&str, &str)]) -> LabelMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn disk(labels: serde_json::Value) -> ResourceRecord {
        ResourceRecord::new(json!({
            "name": "my-disk",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-east1-b",
            "labelFingerprint": "42WmSpB8rSM=",
            "labels": labels
        }))
    }

    #[test]
    fn test_disk_gets_name_zone_and_region() {
        let request = synthesize(
            &disk(json!({})),
            DISK_CAPABILITIES,
            &policy(LabelPrecedence::Generated, &[]),
            &LabelMap::new(),
        )
        .unwrap();

        assert_eq!(
            request.labels,
            map(&[
                ("iris_name", "my-disk"),
                ("iris_zone", "us-east1-b"),
                ("iris_region", "us-east1"),
            ])
        );
        assert_eq!(request.fingerprint.as_deref(), Some("42WmSpB8rSM="));
    }

    #[test]
    fn test_existing_labels_are_never_overwritten() {
        let request = synthesize(
            &disk(json!({"iris_name": "hand-picked", "owner": "alice"})),
            DISK_CAPABILITIES,
            &policy(LabelPrecedence::Generated, &[]),
            &map(&[("owner", "bob")]),
        )
        .unwrap();

        assert_eq!(request.labels["iris_name"], "hand-picked");
        assert_eq!(request.labels["owner"], "alice");
        assert_eq!(request.labels["iris_zone"], "us-east1-b");
    }

    #[test]
    fn test_generated_beats_project_by_default() {
        let project = map(&[("iris_region", "from-project"), ("cost_center", "42")]);
        let request = synthesize(
            &disk(json!({})),
            DISK_CAPABILITIES,
            &policy(LabelPrecedence::Generated, &[]),
            &project,
        )
        .unwrap();

        assert_eq!(request.labels["iris_region"], "us-east1");
        assert_eq!(request.labels["cost_center"], "42");
    }

    #[test]
    fn test_project_precedence() {
        let project = map(&[("iris_region", "from-project")]);
        let request = synthesize(
            &disk(json!({})),
            DISK_CAPABILITIES,
            &policy(LabelPrecedence::Project, &[]),
            &project,
        )
        .unwrap();

        assert_eq!(request.labels["iris_region"], "from-project");
        assert_eq!(request.labels["iris_name"], "my-disk");
    }

    #[test]
    fn test_up_to_date_resource_needs_no_write() {
        let resource = disk(json!({
            "iris_name": "my-disk",
            "iris_zone": "us-east1-b",
            "iris_region": "us-east1",
            "team": "storage"
        }));
        assert!(synthesize(
            &resource,
            DISK_CAPABILITIES,
            &policy(LabelPrecedence::Generated, &[]),
            &LabelMap::new()
        )
        .is_none());
    }

    #[test]
    fn test_vocabulary_filters_attributes() {
        let vocabulary = vec!["zone".to_string()];
        let labels = generate_labels(
            &disk(json!({})),
            DISK_CAPABILITIES,
            &policy(LabelPrecedence::Generated, &vocabulary),
        );
        assert_eq!(labels, map(&[("iris_zone", "us-east1-b")]));
    }

    #[test]
    fn test_missing_attribute_is_omitted() {
        let resource = ResourceRecord::new(json!({"name": "Zoneless"}));
        let labels = generate_labels(
            &resource,
            DISK_CAPABILITIES,
            &policy(LabelPrecedence::Generated, &[]),
        );
        assert_eq!(labels, map(&[("iris_name", "zoneless")]));
    }

    #[test]
    fn test_values_are_legalized() {
        let resource = ResourceRecord::new(json!({"name": "My.Big Disk"}));
        let labels = generate_labels(
            &resource,
            &[NAME],
            &policy(LabelPrecedence::Generated, &[]),
        );
        assert_eq!(labels["iris_name"], "my_big_disk");
    }

    #[test]
    fn test_labels_read_from_custom_pointer() {
        let instance = ResourceRecord::new(json!({
            "name": "db",
            "settings": {"userLabels": {"iris_name": "db"}}
        }));
        let policy = LabelPolicy {
            labels_pointer: "/settings/userLabels",
            ..policy(LabelPrecedence::Generated, &[])
        };
        assert!(synthesize(&instance, &[NAME], &policy, &LabelMap::new()).is_none());
    }
}
