// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types for the Hetzner Cloud REST API.
//!
//! Only the fields the operator reads are modelled; everything else in the
//! responses is ignored by serde.

use crate::constants::HCLOUD_RESOURCE_TYPE_SERVER;
use serde::{Deserialize, Serialize};

/// `GET /servers?name=...`
#[derive(Debug, Deserialize)]
pub(crate) struct ServersResponse {
    pub servers: Vec<ServerPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerPayload {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub private_net: Vec<PrivateNetPayload>,
    #[serde(default)]
    pub public_net: PublicNetPayload,
}

/// One private network attachment; the API only returns the network id.
#[derive(Debug, Deserialize)]
pub(crate) struct PrivateNetPayload {
    pub network: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PublicNetPayload {
    #[serde(default)]
    pub firewalls: Vec<AppliedFirewallPayload>,
}

/// A firewall on the public interface, counted whether `applied` or `pending`.
#[derive(Debug, Deserialize)]
pub(crate) struct AppliedFirewallPayload {
    pub id: u64,
}

/// Id and name, the common shape of networks and firewalls.
#[derive(Debug, Deserialize)]
pub(crate) struct NamedResourcePayload {
    pub id: u64,
    pub name: String,
}

/// `GET /networks/{id}`
#[derive(Debug, Deserialize)]
pub(crate) struct NetworkResponse {
    pub network: NamedResourcePayload,
}

/// `GET /networks?name=...`
#[derive(Debug, Deserialize)]
pub(crate) struct NetworksResponse {
    pub networks: Vec<NamedResourcePayload>,
}

/// `GET /firewalls/{id}`
#[derive(Debug, Deserialize)]
pub(crate) struct FirewallResponse {
    pub firewall: NamedResourcePayload,
}

/// `GET /firewalls?name=...`
#[derive(Debug, Deserialize)]
pub(crate) struct FirewallsResponse {
    pub firewalls: Vec<NamedResourcePayload>,
}

/// Error envelope returned with every non-2xx response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// `POST /servers/{id}/actions/attach_to_network`
#[derive(Debug, Serialize)]
pub(crate) struct AttachToNetworkRequest {
    pub network: u64,
}

/// `POST /firewalls/{id}/actions/apply_to_resources`
#[derive(Debug, Serialize)]
pub(crate) struct ApplyToResourcesRequest {
    pub apply_to: Vec<FirewallResourcePayload>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FirewallResourcePayload {
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub server: ResourceIdPayload,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResourceIdPayload {
    pub id: u64,
}

impl ApplyToResourcesRequest {
    /// Request body scoped to exactly one server.
    pub(crate) fn single_server(server_id: u64) -> Self {
        Self {
            apply_to: vec![FirewallResourcePayload {
                resource_type: HCLOUD_RESOURCE_TYPE_SERVER,
                server: ResourceIdPayload { id: server_id },
            }],
        }
    }
}
