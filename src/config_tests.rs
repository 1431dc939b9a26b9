// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::{Config, ConfigError, LabelPrecedence};
    use crate::constants::{DEFAULT_IRIS_PREFIX, DEFAULT_ZONE_WORKERS};
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.iris_prefix, DEFAULT_IRIS_PREFIX);
        assert_eq!(config.zone_workers, DEFAULT_ZONE_WORKERS);
        assert!(config.from_project);
        assert_eq!(config.project_label_precedence, LabelPrecedence::Generated);
        assert!(config.is_plugin_enabled("Instances"));
    }

    #[test]
    fn test_full_document() {
        let config = Config::from_yaml(
            r"
iris_prefix: acme
labels: [name, zone, region]
from_project: false
project_label_precedence: project
plugins:
  Instances: {}
  buckets:
    prefix: gcs
    batch_size: 50
  Disks:
    enabled: false
projects: [p1, p2]
excluded_projects: [p2]
pubsub_verification_token: s3cret
zone_workers: 4
",
        )
        .unwrap();

        assert_eq!(config.iris_prefix, "acme");
        assert!(!config.from_project);
        assert_eq!(config.project_label_precedence, LabelPrecedence::Project);
        assert!(config.is_plugin_enabled("instances"));
        assert!(config.is_plugin_enabled("Buckets"));
        assert!(!config.is_plugin_enabled("Disks"));
        assert!(!config.is_plugin_enabled("Topics"));
        assert_eq!(config.prefix_for("Buckets"), "gcs");
        assert_eq!(config.prefix_for("Instances"), "acme");
        assert_eq!(config.labels, vec!["name", "zone", "region"]);
        assert!(config.is_project_enabled("p1"));
        assert!(!config.is_project_enabled("p2"));
        assert!(!config.is_project_enabled("p3"));
    }

    #[test]
    fn test_empty_project_list_enables_everything_not_excluded() {
        let config = Config::from_yaml("excluded_projects: [secret]").unwrap();
        assert!(config.is_project_enabled("anything"));
        assert!(!config.is_project_enabled("secret"));
    }

    #[test]
    fn test_illegal_prefix_is_rejected() {
        let err = Config::from_yaml("iris_prefix: Iris.Labels").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_zone_workers_is_rejected() {
        assert!(matches!(
            Config::from_yaml("zone_workers: 0").unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn test_oversized_batch_is_rejected() {
        let err = Config::from_yaml("plugins: {Instances: {batch_size: 5000}}").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_zero_rate_limit_is_rejected() {
        let err = Config::from_yaml("plugins: {Bigquery: {rate_limit: {calls: 0, period_secs: 60}}}")
            .unwrap_err();
        assert!(err.to_string().contains("rate_limit"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(matches!(
            Config::from_yaml("iris_prefx: typo").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "iris_prefix: fromfile").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.iris_prefix, "fromfile");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(std::path::Path::new("/nonexistent/iris.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
