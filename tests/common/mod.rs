// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use hcloud_aux_operator::cluster::{ClusterNode, NodeEvent, NodeSource};
use hcloud_aux_operator::config::ApiToken;
use hcloud_aux_operator::errors::ClusterError;
use hcloud_aux_operator::hcloud::HcloudClient;
use kube::client::Client;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Hetzner client pointed at a mock server
pub fn hcloud_client(server: &MockServer) -> HcloudClient {
    let endpoint = url::Url::parse(&format!("{}/v1", server.uri())).unwrap();
    HcloudClient::new(ApiToken::new("integration-token"), endpoint).unwrap()
}

/// Answer `GET /servers?name=<name>` with a single server
pub async fn mount_server(
    server: &MockServer,
    id: u64,
    name: &str,
    network_ids: &[u64],
    firewall_ids: &[u64],
) {
    let private_net: Vec<_> = network_ids.iter().map(|id| json!({ "network": id })).collect();
    let firewalls: Vec<_> = firewall_ids
        .iter()
        .map(|id| json!({ "id": id, "status": "applied" }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v1/servers"))
        .and(query_param("name", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": [{
                "id": id,
                "name": name,
                "private_net": private_net,
                "public_net": { "firewalls": firewalls }
            }]
        })))
        .mount(server)
        .await;
}

/// Answer `GET /servers?name=<name>` with no match
pub async fn mount_missing_server(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/servers"))
        .and(query_param("name", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "servers": [] })))
        .mount(server)
        .await;
}

/// Answer `GET /<collection>/<id>` with a named resource
pub async fn mount_resource(server: &MockServer, collection: &str, id: u64, name: &str) {
    let mut body = serde_json::Map::new();
    body.insert(
        collection.trim_end_matches('s').to_string(),
        json!({ "id": id, "name": name }),
    );
    Mock::given(method("GET"))
        .and(path(format!("/v1/{collection}/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Node source with a fixed list and a one-shot event stream
pub struct StaticNodes {
    pub hostnames: Vec<String>,
    pub events: Vec<NodeEvent>,
}

impl StaticNodes {
    pub fn new(hostnames: &[&str]) -> Self {
        Self {
            hostnames: hostnames.iter().map(|h| (*h).to_string()).collect(),
            events: Vec::new(),
        }
    }

    pub fn added(hostnames: &[&str]) -> Self {
        let mut nodes = Self::new(hostnames);
        nodes.events = nodes
            .hostnames
            .iter()
            .map(|hostname| {
                NodeEvent::Added(ClusterNode {
                    hostname: hostname.clone(),
                    provided_ip: None,
                })
            })
            .collect();
        nodes
    }
}

#[async_trait]
impl NodeSource for StaticNodes {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, ClusterError> {
        Ok(self
            .hostnames
            .iter()
            .map(|hostname| ClusterNode {
                hostname: hostname.clone(),
                provided_ip: None,
            })
            .collect())
    }

    fn node_events(&self) -> BoxStream<'static, Result<NodeEvent, ClusterError>> {
        stream::iter(self.events.clone().into_iter().map(Ok)).boxed()
    }
}
