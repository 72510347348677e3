// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hetzner Cloud API client.
//!
//! [`HcloudClient`] implements [`CloudInventory`] on top of the Hetzner Cloud
//! REST API. It handles:
//!
//! - Server lookup by name, including the names of its networks or of its firewalls
//! - Network and firewall lookup by id or by name
//! - Attaching a server to a network
//! - Applying a firewall to a single server
//!
//! # Example
//!
//! ```rust,no_run
//! use hcloud_aux_operator::config::ApiToken;
//! use hcloud_aux_operator::hcloud::HcloudClient;
//! use hcloud_aux_operator::inventory::{AttachmentKind, CloudInventory};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let endpoint = url::Url::parse("https://api.hetzner.cloud/v1")?;
//! let client = HcloudClient::new(ApiToken::new("token"), endpoint)?;
//!
//! let server = client.server_by_name("web-1", AttachmentKind::Network).await?;
//! println!("{} is on networks {:?}", server.name, server.attached_networks);
//! # Ok(())
//! # }
//! ```

pub mod http;
pub mod types;

use self::http::{build_api_url, hcloud_request};
use self::types::{
    ApplyToResourcesRequest, AttachToNetworkRequest, FirewallResponse, FirewallsResponse,
    NamedResourcePayload, NetworkResponse, NetworksResponse, ServerPayload, ServersResponse,
};
use crate::config::ApiToken;
use crate::constants::{HCLOUD_REQUEST_TIMEOUT_SECS, HCLOUD_USER_AGENT};
use crate::errors::HcloudError;
use crate::inventory::{AttachmentKind, CloudInventory, CloudServer, Firewall, Network, TargetRef};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::de::IgnoredAny;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const KIND_SERVER: &str = "server";
const KIND_NETWORK: &str = "network";
const KIND_FIREWALL: &str = "firewall";

/// Client for the Hetzner Cloud API.
///
/// Cheap to clone; `reqwest::Client` pools connections and is safe to share
/// between the network and firewall loops without extra locking.
#[derive(Debug, Clone)]
pub struct HcloudClient {
    /// HTTP client for API requests
    client: HttpClient,
    /// Bearer token
    token: Arc<ApiToken>,
    /// API base URL, e.g. `https://api.hetzner.cloud/v1`
    endpoint: Url,
}

impl HcloudClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot carry a path or the HTTP client
    /// cannot be built.
    pub fn new(token: ApiToken, endpoint: Url) -> Result<Self, HcloudError> {
        if endpoint.cannot_be_a_base() {
            return Err(HcloudError::Decode(format!(
                "endpoint {endpoint} cannot be used as an API base URL"
            )));
        }

        let client = HttpClient::builder()
            .timeout(Duration::from_secs(HCLOUD_REQUEST_TIMEOUT_SECS))
            .user_agent(HCLOUD_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            token: Arc::new(token),
            endpoint,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, HcloudError> {
        hcloud_request::<T, ()>(&self.client, self.token.expose(), Method::GET, url, None).await
    }

    fn url(&self, segments: &[&str]) -> Url {
        build_api_url(&self.endpoint, segments)
    }

    fn url_with_name(&self, collection: &str, name: &str) -> Url {
        let mut url = self.url(&[collection]);
        url.query_pairs_mut().append_pair("name", name);
        url
    }

    /// Resolve the names of the server's attachments of `kind`.
    ///
    /// The server payload only carries ids; names need one lookup each.
    async fn attachment_names(
        &self,
        server: &ServerPayload,
        kind: AttachmentKind,
    ) -> Result<BTreeMap<u64, String>, HcloudError> {
        let mut attached = BTreeMap::new();
        match kind {
            AttachmentKind::Network => {
                for private_net in &server.private_net {
                    let network = self.network_by_id(private_net.network).await?;
                    attached.insert(network.id, network.name);
                }
            }
            AttachmentKind::Firewall => {
                for applied in &server.public_net.firewalls {
                    let firewall = self.firewall_by_id(applied.id).await?;
                    attached.insert(firewall.id, firewall.name);
                }
            }
        }
        Ok(attached)
    }

    async fn network_by_id(&self, id: u64) -> Result<NamedResourcePayload, HcloudError> {
        let url = self.url(&["networks", &id.to_string()]);
        self.get::<NetworkResponse>(url)
            .await
            .map(|r| r.network)
            .map_err(|e| not_found_on_404(e, KIND_NETWORK, &id.to_string()))
    }

    async fn network_by_name(&self, name: &str) -> Result<NamedResourcePayload, HcloudError> {
        let url = self.url_with_name("networks", name);
        first_exact(self.get::<NetworksResponse>(url).await?.networks, name)
            .ok_or_else(|| HcloudError::NotFound {
                kind: KIND_NETWORK,
                target: name.to_string(),
            })
    }

    async fn firewall_by_id(&self, id: u64) -> Result<NamedResourcePayload, HcloudError> {
        let url = self.url(&["firewalls", &id.to_string()]);
        self.get::<FirewallResponse>(url)
            .await
            .map(|r| r.firewall)
            .map_err(|e| not_found_on_404(e, KIND_FIREWALL, &id.to_string()))
    }

    async fn firewall_by_name(&self, name: &str) -> Result<NamedResourcePayload, HcloudError> {
        let url = self.url_with_name("firewalls", name);
        first_exact(self.get::<FirewallsResponse>(url).await?.firewalls, name)
            .ok_or_else(|| HcloudError::NotFound {
                kind: KIND_FIREWALL,
                target: name.to_string(),
            })
    }
}

#[async_trait]
impl CloudInventory for HcloudClient {
    async fn server_by_name(
        &self,
        name: &str,
        kind: AttachmentKind,
    ) -> Result<CloudServer, HcloudError> {
        let url = self.url_with_name("servers", name);
        let server = self
            .get::<ServersResponse>(url)
            .await?
            .servers
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| HcloudError::NotFound {
                kind: KIND_SERVER,
                target: name.to_string(),
            })?;

        let attached = self.attachment_names(&server, kind).await?;
        debug!(
            server_id = server.id,
            server_name = %server.name,
            attachment = kind.label(),
            attached = ?attached,
            "Resolved Hetzner server"
        );

        let (attached_networks, attached_firewalls) = match kind {
            AttachmentKind::Network => (attached, BTreeMap::new()),
            AttachmentKind::Firewall => (BTreeMap::new(), attached),
        };
        Ok(CloudServer {
            id: server.id,
            name: server.name,
            attached_networks,
            attached_firewalls,
        })
    }

    async fn network(&self, target: &TargetRef) -> Result<Network, HcloudError> {
        let payload = match target {
            TargetRef::Id(id) => self.network_by_id(*id).await?,
            TargetRef::Name(name) => self.network_by_name(name).await?,
            TargetRef::InvalidId(raw) => return Err(invalid_id(KIND_NETWORK, raw)),
        };
        Ok(Network {
            id: payload.id,
            name: payload.name,
        })
    }

    async fn firewall(&self, target: &TargetRef) -> Result<Firewall, HcloudError> {
        let payload = match target {
            TargetRef::Id(id) => self.firewall_by_id(*id).await?,
            TargetRef::Name(name) => self.firewall_by_name(name).await?,
            TargetRef::InvalidId(raw) => return Err(invalid_id(KIND_FIREWALL, raw)),
        };
        Ok(Firewall {
            id: payload.id,
            name: payload.name,
        })
    }

    async fn attach_network(&self, server_id: u64, network_id: u64) -> Result<(), HcloudError> {
        let url = self.url(&[
            "servers",
            &server_id.to_string(),
            "actions",
            "attach_to_network",
        ]);
        let body = AttachToNetworkRequest {
            network: network_id,
        };
        hcloud_request::<IgnoredAny, _>(
            &self.client,
            self.token.expose(),
            Method::POST,
            url,
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn apply_firewall(&self, firewall_id: u64, server_id: u64) -> Result<(), HcloudError> {
        let url = self.url(&[
            "firewalls",
            &firewall_id.to_string(),
            "actions",
            "apply_to_resources",
        ]);
        let body = ApplyToResourcesRequest::single_server(server_id);
        hcloud_request::<IgnoredAny, _>(
            &self.client,
            self.token.expose(),
            Method::POST,
            url,
            Some(&body),
        )
        .await?;
        Ok(())
    }
}

/// Name filters on the API are exact, but guard against a loose match anyway.
fn first_exact(items: Vec<NamedResourcePayload>, name: &str) -> Option<NamedResourcePayload> {
    items.into_iter().find(|item| item.name == name)
}

/// A malformed id cannot exist, so it is reported without calling the API.
fn invalid_id(kind: &'static str, raw: &str) -> HcloudError {
    HcloudError::NotFound {
        kind,
        target: raw.to_string(),
    }
}

fn not_found_on_404(err: HcloudError, kind: &'static str, target: &str) -> HcloudError {
    match err {
        HcloudError::Api { status: 404, .. } => HcloudError::NotFound {
            kind,
            target: target.to_string(),
        },
        other => other,
    }
}
