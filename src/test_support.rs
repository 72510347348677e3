// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes for the reconciliation loop tests.
//!
//! [`FakeInventory`] keeps servers, networks and firewalls in a mutex and
//! applies attach actions to its own state, so a second pass sees the result
//! of the first. Every action call is recorded for assertions.

use crate::cluster::{ClusterNode, NodeEvent, NodeSource};
use crate::errors::{ClusterError, HcloudError};
use crate::inventory::{AttachmentKind, CloudInventory, CloudServer, Firewall, Network, TargetRef};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;

/// A provider action issued by a reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCall {
    AttachNetwork { server_id: u64, network_id: u64 },
    ApplyFirewall { firewall_id: u64, server_id: u64 },
}

#[derive(Default)]
struct FakeState {
    servers: BTreeMap<String, CloudServer>,
    networks: Vec<Network>,
    firewalls: Vec<Firewall>,
    calls: Vec<ActionCall>,
    action_error: Option<(u16, String)>,
    lookup_error: Option<u16>,
    server_errors: BTreeMap<String, u16>,
}

#[derive(Default)]
pub struct FakeInventory {
    state: Mutex<FakeState>,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(self, id: u64, name: &str) -> Self {
        self.state.lock().unwrap().networks.push(Network {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn with_firewall(self, id: u64, name: &str) -> Self {
        self.state.lock().unwrap().firewalls.push(Firewall {
            id,
            name: name.to_string(),
        });
        self
    }

    /// Add a server with the given network and firewall attachments.
    pub fn with_server(
        self,
        id: u64,
        name: &str,
        networks: &[(u64, &str)],
        firewalls: &[(u64, &str)],
    ) -> Self {
        let server = CloudServer {
            id,
            name: name.to_string(),
            attached_networks: to_map(networks),
            attached_firewalls: to_map(firewalls),
        };
        self.state
            .lock()
            .unwrap()
            .servers
            .insert(name.to_string(), server);
        self
    }

    /// Make every attach action fail with the given API error.
    pub fn with_action_error(self, status: u16, code: &str) -> Self {
        self.state.lock().unwrap().action_error = Some((status, code.to_string()));
        self
    }

    /// Make every network and firewall lookup fail with the given HTTP status.
    pub fn with_lookup_error(self, status: u16) -> Self {
        self.state.lock().unwrap().lookup_error = Some(status);
        self
    }

    /// Make resolving the named server fail with the given HTTP status.
    pub fn with_server_error(self, name: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .server_errors
            .insert(name.to_string(), status);
        self
    }

    /// Stop failing attach actions.
    pub fn recover(&self) {
        self.state.lock().unwrap().action_error = None;
    }

    pub fn calls(&self) -> Vec<ActionCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn server(&self, name: &str) -> CloudServer {
        self.state.lock().unwrap().servers[name].clone()
    }

    fn lookup_failure(state: &FakeState) -> Option<HcloudError> {
        state.lookup_error.map(|status| HcloudError::Api {
            status,
            code: "unavailable".to_string(),
            message: "lookup failed".to_string(),
        })
    }

    fn action_failure(state: &FakeState) -> Option<HcloudError> {
        state
            .action_error
            .as_ref()
            .map(|(status, code)| HcloudError::Api {
                status: *status,
                code: code.clone(),
                message: "action rejected".to_string(),
            })
    }
}

fn to_map(entries: &[(u64, &str)]) -> BTreeMap<u64, String> {
    entries
        .iter()
        .map(|(id, name)| (*id, (*name).to_string()))
        .collect()
}

fn find<'a>(
    entries: impl Iterator<Item = (u64, &'a str)>,
    target: &TargetRef,
) -> Option<(u64, String)> {
    entries
        .filter(|(id, name)| match target {
            TargetRef::Id(wanted) => id == wanted,
            TargetRef::Name(wanted) => *name == wanted.as_str(),
            TargetRef::InvalidId(_) => false,
        })
        .map(|(id, name)| (id, name.to_string()))
        .next()
}

#[async_trait]
impl CloudInventory for FakeInventory {
    async fn server_by_name(
        &self,
        name: &str,
        kind: AttachmentKind,
    ) -> Result<CloudServer, HcloudError> {
        let state = self.state.lock().unwrap();
        if let Some(status) = state.server_errors.get(name) {
            return Err(HcloudError::Api {
                status: *status,
                code: "unavailable".to_string(),
                message: "server lookup failed".to_string(),
            });
        }
        let mut server = state
            .servers
            .get(name)
            .cloned()
            .ok_or_else(|| HcloudError::NotFound {
                kind: "server",
                target: name.to_string(),
            })?;
        match kind {
            AttachmentKind::Network => server.attached_firewalls.clear(),
            AttachmentKind::Firewall => server.attached_networks.clear(),
        }
        Ok(server)
    }

    async fn network(&self, target: &TargetRef) -> Result<Network, HcloudError> {
        let state = self.state.lock().unwrap();
        if let Some(err) = Self::lookup_failure(&state) {
            return Err(err);
        }
        find(
            state.networks.iter().map(|n| (n.id, n.name.as_str())),
            target,
        )
        .map(|(id, name)| Network { id, name })
        .ok_or_else(|| HcloudError::NotFound {
            kind: "network",
            target: target.to_string(),
        })
    }

    async fn firewall(&self, target: &TargetRef) -> Result<Firewall, HcloudError> {
        let state = self.state.lock().unwrap();
        if let Some(err) = Self::lookup_failure(&state) {
            return Err(err);
        }
        find(
            state.firewalls.iter().map(|f| (f.id, f.name.as_str())),
            target,
        )
        .map(|(id, name)| Firewall { id, name })
        .ok_or_else(|| HcloudError::NotFound {
            kind: "firewall",
            target: target.to_string(),
        })
    }

    async fn attach_network(&self, server_id: u64, network_id: u64) -> Result<(), HcloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ActionCall::AttachNetwork {
            server_id,
            network_id,
        });
        if let Some(err) = Self::action_failure(&state) {
            return Err(err);
        }
        let name = state
            .networks
            .iter()
            .find(|n| n.id == network_id)
            .map(|n| n.name.clone())
            .unwrap_or_default();
        if let Some(server) = state.servers.values_mut().find(|s| s.id == server_id) {
            server.attached_networks.insert(network_id, name);
        }
        Ok(())
    }

    async fn apply_firewall(&self, firewall_id: u64, server_id: u64) -> Result<(), HcloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ActionCall::ApplyFirewall {
            firewall_id,
            server_id,
        });
        if let Some(err) = Self::action_failure(&state) {
            return Err(err);
        }
        let name = state
            .firewalls
            .iter()
            .find(|f| f.id == firewall_id)
            .map(|f| f.name.clone())
            .unwrap_or_default();
        if let Some(server) = state.servers.values_mut().find(|s| s.id == server_id) {
            server.attached_firewalls.insert(firewall_id, name);
        }
        Ok(())
    }
}

/// Node source returning a fixed node list and a finite event stream.
#[derive(Default)]
pub struct FakeNodeSource {
    nodes: Vec<ClusterNode>,
    events: Vec<NodeEvent>,
    list_fails: bool,
}

impl FakeNodeSource {
    pub fn with_nodes(hostnames: &[&str]) -> Self {
        Self {
            nodes: hostnames.iter().map(|h| node(h)).collect(),
            ..Self::default()
        }
    }

    pub fn with_events(events: Vec<NodeEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            list_fails: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl NodeSource for FakeNodeSource {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, ClusterError> {
        if self.list_fails {
            let cause: Box<dyn std::error::Error + Send + Sync> = Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Connection failed",
            ));
            return Err(ClusterError::Kube(kube::Error::Service(cause)));
        }
        Ok(self.nodes.clone())
    }

    fn node_events(&self) -> BoxStream<'static, Result<NodeEvent, ClusterError>> {
        stream::iter(self.events.clone().into_iter().map(Ok)).boxed()
    }
}

pub fn node(hostname: &str) -> ClusterNode {
    ClusterNode {
        hostname: hostname.to_string(),
        provided_ip: None,
    }
}

/// Formatted log output captured by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture every log line emitted on this thread until the guard is dropped.
pub fn capture_logs() -> (DefaultGuard, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (tracing::subscriber::set_default(subscriber), buffer)
}
