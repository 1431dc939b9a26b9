// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `registry.rs`

#[cfg(test)]
mod tests {
    use crate::config::{Config, PluginSettings};
    use crate::errors::LabelerError;
    use crate::registry::{PluginRegistry, BUILTIN_PLUGINS};
    use crate::test_support::test_context;
    use std::collections::HashMap;

    fn config_enabling(names: &[(&str, bool)]) -> Config {
        let plugins: HashMap<String, PluginSettings> = names
            .iter()
            .map(|(name, enabled)| {
                (
                    (*name).to_string(),
                    PluginSettings {
                        enabled: *enabled,
                        ..PluginSettings::default()
                    },
                )
            })
            .collect();
        Config {
            plugins,
            ..Config::default()
        }
    }

    #[test]
    fn test_empty_plugin_map_enables_everything() {
        let registry = PluginRegistry::load(&test_context(Config::default(), &[])).unwrap();
        assert_eq!(registry.all().len(), BUILTIN_PLUGINS.len());
    }

    #[test]
    fn test_only_enabled_plugins_are_registered() {
        let ctx = test_context(
            config_enabling(&[("instances", true), ("Disks", true), ("Topics", false)]),
            &[],
        );
        let registry = PluginRegistry::load(&ctx).unwrap();

        let names: Vec<_> = registry.all().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["Instances", "Disks"]);
        assert!(matches!(
            registry.get("Topics"),
            Err(LabelerError::UnknownPlugin { .. })
        ));
    }

    #[test]
    fn test_all_disabled_is_an_error() {
        let ctx = test_context(config_enabling(&[("Instances", false)]), &[]);
        assert!(matches!(
            PluginRegistry::load(&ctx),
            Err(LabelerError::NoPluginsEnabled)
        ));
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let registry = PluginRegistry::load(&test_context(Config::default(), &[])).unwrap();
        assert_eq!(registry.get("bigquery").unwrap().name(), "Bigquery");
        assert_eq!(registry.get("CLOUDSQL").unwrap().name(), "Cloudsql");
    }

    #[test]
    fn test_unknown_plugin() {
        let registry = PluginRegistry::load(&test_context(Config::default(), &[])).unwrap();
        let err = registry.get("Spanner").err().unwrap();
        assert_eq!(err.to_string(), "No enabled plugin named 'Spanner'");
    }

    #[test]
    fn test_matching_routes_instances_insert_to_instances_only() {
        let registry = PluginRegistry::load(&test_context(Config::default(), &[])).unwrap();

        let matched: Vec<_> = registry
            .matching("v1.compute.instances.insert")
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(matched, ["Instances"]);
        assert!(registry.matching("unrelated.api.call").is_empty());
    }
}
