// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for error types.

#[cfg(test)]
mod tests {
    use crate::errors::*;

    fn http(status: u16) -> ProviderError {
        ProviderError::Http {
            status,
            url: "https://compute.googleapis.com/compute/v1/projects/p/zones".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_http_error_display() {
        assert_eq!(
            http(403).to_string(),
            "HTTP 403 from https://compute.googleapis.com/compute/v1/projects/p/zones: boom"
        );
    }

    #[test]
    fn test_transient_statuses_are_retryable() {
        for status in [429, 500, 502, 503, 504] {
            assert!(http(status).is_retryable(), "{status} should be retryable");
        }
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        for status in [400, 401, 403, 404, 409, 412, 501] {
            assert!(!http(status).is_retryable(), "{status} should not be retryable");
        }
        assert!(!ProviderError::Batch("no boundary".into()).is_retryable());
        assert!(!ProviderError::Token("metadata server down".into()).is_retryable());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(http(404).status(), Some(404));
        assert_eq!(ProviderError::Batch("x".into()).status(), None);
    }

    #[test]
    fn test_unknown_plugin_display() {
        let err = LabelerError::UnknownPlugin {
            name: "Spanner".to_string(),
        };
        assert_eq!(err.to_string(), "No enabled plugin named 'Spanner'");
    }

    #[test]
    fn test_ambiguous_dispatch_display() {
        let err = LabelerError::AmbiguousDispatch {
            method: "compute.disks.insert".to_string(),
            plugins: vec!["Disks".to_string(), "OtherDisks".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Multiple plugins [\"Disks\", \"OtherDisks\"] match method 'compute.disks.insert'"
        );
    }

    #[test]
    fn test_provider_error_converts_transparently() {
        let err: LabelerError = http(500).into();
        assert!(err.to_string().starts_with("HTTP 500"));
    }
}
