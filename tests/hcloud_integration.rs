// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end tests for the reconciliation loops against a mock Hetzner API.
//!
//! The Hetzner Cloud API is served by `wiremock`; cluster nodes come from a
//! static node source. The last test needs a real cluster and is ignored.
//!
//! Run the cluster test with: cargo test --test hcloud_integration -- --ignored

mod common;

use common::{
    get_kube_client_or_skip, hcloud_client, mount_missing_server, mount_resource, mount_server,
    StaticNodes,
};
use hcloud_aux_operator::cluster::{KubeNodeSource, NodeSource};
use hcloud_aux_operator::config::OperatorConfig;
use hcloud_aux_operator::context::Context;
use hcloud_aux_operator::reconcilers::{
    check_extra_hosts_exist, check_firewalls_exist, process_node_events, resync_firewalls,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(env: &[(&str, &str)]) -> OperatorConfig {
    let env: HashMap<&str, &str> = env.iter().copied().collect();
    OperatorConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string())).unwrap()
}

#[tokio::test]
async fn test_added_node_is_attached_to_required_network() {
    let server = MockServer::start().await;
    mount_server(&server, 1001, "web-1", &[20], &[]).await;
    mount_resource(&server, "networks", 20, "frontend").await;
    mount_resource(&server, "networks", 10, "backend").await;
    Mock::given(method("POST"))
        .and(path("/v1/servers/1001/actions/attach_to_network"))
        .and(body_json(json!({ "network": 10 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "action": { "id": 1 } })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&[("HCLOUD_TOKEN", "t"), ("required_network_ids", "10")]);
    let nodes = Arc::new(StaticNodes::added(&["web-1"]));
    let ctx = Context::new(config.desired, Arc::new(hcloud_client(&server)), nodes.clone());

    process_node_events(&ctx, nodes.node_events()).await;
}

#[tokio::test]
async fn test_satisfied_node_by_name_and_id_makes_no_calls() {
    let server = MockServer::start().await;
    mount_server(&server, 1001, "web-1", &[42], &[]).await;
    mount_resource(&server, "networks", 42, "prod-net").await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&[
        ("HCLOUD_TOKEN", "t"),
        ("required_network_ids", "42"),
        ("required_network_names", "prod-net"),
    ]);
    let nodes = Arc::new(StaticNodes::added(&["web-1"]));
    let ctx = Context::new(config.desired, Arc::new(hcloud_client(&server)), nodes.clone());

    process_node_events(&ctx, nodes.node_events()).await;
}

#[tokio::test]
async fn test_absent_extra_host_gets_no_remediation() {
    let server = MockServer::start().await;
    mount_missing_server(&server, "bastion-1").await;
    mount_resource(&server, "firewalls", 5, "edge").await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&[
        ("HCLOUD_TOKEN", "t"),
        ("enforce_firewall_ids", "5"),
        ("enforce_firewall_extra_hosts", "bastion-1"),
    ]);
    let ctx = Context::new(
        config.desired,
        Arc::new(hcloud_client(&server)),
        Arc::new(StaticNodes::new(&[])),
    );

    assert!(!check_extra_hosts_exist(ctx.inventory.as_ref(), &ctx.desired.extra_hosts).await);
    let summary = resync_firewalls(&ctx, true).await;
    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.servers_evaluated, 0);
}

#[tokio::test]
async fn test_firewall_resync_applies_missing_firewall() {
    let server = MockServer::start().await;
    mount_server(&server, 1002, "web-2", &[], &[]).await;
    mount_resource(&server, "firewalls", 5, "edge").await;
    Mock::given(method("POST"))
        .and(path("/v1/firewalls/5/actions/apply_to_resources"))
        .and(body_json(json!({
            "apply_to": [{ "type": "server", "server": { "id": 1002 } }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "actions": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&[("HCLOUD_TOKEN", "t"), ("enforce_firewall_ids", "5")]);
    let ctx = Context::new(
        config.desired,
        Arc::new(hcloud_client(&server)),
        Arc::new(StaticNodes::new(&["web-2"])),
    );

    let summary = resync_firewalls(&ctx, true).await;
    assert_eq!(summary.attached, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_unavailable_network_does_not_block_firewall_enforcement() {
    let server = MockServer::start().await;
    mount_server(&server, 1002, "web-2", &[20], &[]).await;
    mount_resource(&server, "firewalls", 5, "edge").await;
    Mock::given(method("GET"))
        .and(path("/v1/networks/20"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "code": "unavailable", "message": "maintenance" }
        })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/firewalls/5/actions/apply_to_resources"))
        .and(body_json(json!({
            "apply_to": [{ "type": "server", "server": { "id": 1002 } }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "actions": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&[("HCLOUD_TOKEN", "t"), ("enforce_firewall_ids", "5")]);
    let ctx = Context::new(
        config.desired,
        Arc::new(hcloud_client(&server)),
        Arc::new(StaticNodes::new(&["web-2"])),
    );

    let summary = resync_firewalls(&ctx, true).await;
    assert_eq!(summary.servers_evaluated, 1);
    assert_eq!(summary.unresolved, 0);
    assert_eq!(summary.attached, 1);
}

#[tokio::test]
async fn test_invalid_firewall_id_is_skipped_without_requests() {
    let server = MockServer::start().await;
    mount_server(&server, 1002, "web-2", &[], &[]).await;
    Mock::given(method("GET"))
        .and(path("/v1/firewalls/abc"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&[("HCLOUD_TOKEN", "t"), ("enforce_firewall_ids", "abc")]);
    let ctx = Context::new(
        config.desired,
        Arc::new(hcloud_client(&server)),
        Arc::new(StaticNodes::new(&["web-2"])),
    );

    assert!(!check_firewalls_exist(ctx.inventory.as_ref(), &ctx.desired.enforced_firewalls).await);
    let summary = resync_firewalls(&ctx, false).await;
    assert_eq!(summary.servers_evaluated, 1);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn test_missing_firewall_fails_validation_and_is_skipped() {
    let server = MockServer::start().await;
    mount_server(&server, 1002, "web-2", &[], &[]).await;
    Mock::given(method("GET"))
        .and(path("/v1/firewalls/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "not_found", "message": "firewall not found" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&[("HCLOUD_TOKEN", "t"), ("enforce_firewall_ids", "999")]);
    let ctx = Context::new(
        config.desired,
        Arc::new(hcloud_client(&server)),
        Arc::new(StaticNodes::new(&["web-2"])),
    );

    assert!(!check_firewalls_exist(ctx.inventory.as_ref(), &ctx.desired.enforced_firewalls).await);
    let summary = resync_firewalls(&ctx, false).await;
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_list_cluster_nodes() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };

    let nodes = KubeNodeSource::new(client)
        .list_nodes()
        .await
        .expect("listing nodes should succeed");
    assert!(!nodes.is_empty(), "a running cluster has at least one node");
    assert!(nodes.iter().all(|node| !node.hostname.is_empty()));
}
