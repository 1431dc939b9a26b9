// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end labeling passes against a mock Google API.
//!
//! Every Google API root is pointed at a local wiremock server through
//! `endpoint_override`, so these run without credentials or network access.
//!
//! Run with: cargo test --test labeling_integration

use iris::config::Config;
use iris::context::Context;
use iris::engine::LabelOutcome;
use iris::gcp::GcpClient;
use iris::labeler::{EventOutcome, Labeler};
use iris::retry::RetryPolicy;
use iris::zones::ZoneCache;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

/// A labeler whose every API call goes to `server`, seeded with `zones`.
fn labeler_for(server: &MockServer, zones: &[&str]) -> Labeler {
    let config = Config {
        endpoint_override: Some(server.uri()),
        access_token: Some("test-token".into()),
        from_project: false,
        ..Config::default()
    };
    let gcp = GcpClient::new(&config)
        .expect("client")
        .with_retry_policy(RetryPolicy::none());
    let ctx = Context::with_client(config, gcp).with_zones(ZoneCache::with_zones(
        zones.iter().map(|z| (*z).to_string()).collect(),
    ));
    Labeler::load(Arc::new(ctx)).expect("built-in plugins")
}

/// A `multipart/mixed` batch response with one part per status, in order.
fn batch_response(statuses: &[u16]) -> ResponseTemplate {
    let mut body = String::new();
    for status in statuses {
        body.push_str("--batch_resp\r\nContent-Type: application/http\r\n\r\n");
        body.push_str(&format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\r\n"
        ));
        if *status < 300 {
            body.push_str("{\"kind\": \"compute#operation\"}\r\n");
        } else {
            body.push_str("{\"error\": {\"message\": \"Labels fingerprint either invalid or resource labels have changed\"}}\r\n");
        }
    }
    body.push_str("--batch_resp--\r\n");
    ResponseTemplate::new(200).set_body_raw(body, "multipart/mixed; boundary=batch_resp")
}

fn instance(name: &str, zone: &str) -> serde_json::Value {
    json!({
        "name": name,
        "zone": format!("https://www.googleapis.com/compute/v1/projects/p/zones/{zone}"),
        "machineType": format!("https://www.googleapis.com/compute/v1/projects/p/zones/{zone}/machineTypes/e2-small"),
        "labelFingerprint": "42WmSpB8rSM="
    })
}

// ============================================================================
// Scheduled Passes
// ============================================================================

#[tokio::test]
async fn test_instances_pass_survives_a_failing_zone() {
    let server = MockServer::start().await;
    for (zone, name) in [("us-east1-b", "web-1"), ("us-east1-d", "web-2")] {
        Mock::given(method("GET"))
            .and(path(format!("/compute/v1/projects/p/zones/{zone}/instances")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [instance(name, zone)]})),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/compute/v1/projects/p/zones/us-east1-c/instances"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Compute Engine API has not been used"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/batch/compute/v1"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_string_contains("/setLabels HTTP/1.1"))
        .and(body_string_contains(r#""iris_instance_type":"e2-small""#))
        .respond_with(batch_response(&[200, 200]))
        .expect(1)
        .mount(&server)
        .await;

    let labeler = labeler_for(&server, &["us-east1-b", "us-east1-c", "us-east1-d"]);
    let summary = labeler.label_all("Instances", "p").await.unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.failed_listings, 1);
    assert_eq!(summary.committed, 2);
    assert_eq!(summary.rejected, 0);
}

#[tokio::test]
async fn test_rejected_batch_part_does_not_fail_its_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/compute/v1/projects/p/zones/europe-west1-b/disks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
            {"name": "data-1", "zone": "zones/europe-west1-b", "labelFingerprint": "a"},
            {"name": "data-2", "zone": "zones/europe-west1-b", "labelFingerprint": "b"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/batch/compute/v1"))
        .respond_with(batch_response(&[200, 412]))
        .expect(1)
        .mount(&server)
        .await;

    let labeler = labeler_for(&server, &["europe-west1-b"]);
    let summary = labeler.label_all("Disks", "p").await.unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(summary.committed, 1);
    assert_eq!(summary.rejected, 1);
}

#[tokio::test]
async fn test_up_to_date_resources_send_no_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/compute/v1/projects/p/zones/us-central1-a/disks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{
            "name": "boot",
            "zone": "zones/us-central1-a",
            "labels": {
                "iris_name": "boot",
                "iris_zone": "us-central1-a",
                "iris_region": "us-central1",
                "iris_pd_attached": "false"
            }
        }]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/batch/compute/v1"))
        .respond_with(batch_response(&[200]))
        .expect(0)
        .mount(&server)
        .await;

    let labeler = labeler_for(&server, &["us-central1-a"]);
    let summary = labeler.label_all("Disks", "p").await.unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.written, 0);
}

// ============================================================================
// Creation Events
// ============================================================================

#[tokio::test]
async fn test_topic_creation_event_is_patched_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects/p/topics/Orders.Created"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "projects/p/topics/Orders.Created"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/projects/p/topics/Orders.Created"))
        .and(body_json(json!({
            "topic": {
                "name": "projects/p/topics/Orders.Created",
                "labels": {"iris_name": "orders_created"}
            },
            "updateMask": "labels"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let labeler = labeler_for(&server, &[]);
    let outcome = labeler
        .label_one(json!({
            "protoPayload": {
                "methodName": "google.pubsub.v1.Publisher.CreateTopic",
                "request": {"name": "projects/p/topics/Orders.Created"}
            },
            "resource": {"labels": {"project_id": "p"}}
        }))
        .await
        .unwrap();

    assert_eq!(outcome, EventOutcome::Labeled(LabelOutcome::Written));
}

#[tokio::test]
async fn test_unknown_method_is_ignored_without_api_calls() {
    let server = MockServer::start().await;
    let labeler = labeler_for(&server, &[]);

    let outcome = labeler
        .label_one(json!({
            "protoPayload": {"methodName": "compute.networks.insert"},
            "resource": {"labels": {"project_id": "p"}}
        }))
        .await
        .unwrap();

    assert_eq!(outcome, EventOutcome::Ignored);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
