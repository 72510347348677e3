// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud inventory model and accessor trait.
//!
//! The reconciliation loops only see Hetzner Cloud through [`CloudInventory`].
//! The production implementation is [`crate::hcloud::HcloudClient`]; tests use
//! in-memory fakes.

use crate::errors::HcloudError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// A network or firewall reference as declared by the operator.
///
/// Entries configured by id match on the attachment id; entries configured by
/// name match any attachment carrying that name, whatever its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRef {
    /// Numeric Hetzner Cloud id
    Id(u64),
    /// Resource name
    Name(String),
    /// Entry of an id list that is not an unsigned integer
    ///
    /// Never exists in Hetzner Cloud and never matches an attachment, so it is
    /// reported missing and skipped like any unknown id.
    InvalidId(String),
}

impl TargetRef {
    /// Label used in log lines (`ID` or `NAME`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Id(_) | Self::InvalidId(_) => "ID",
            Self::Name(_) => "NAME",
        }
    }

    /// Whether an attachment map (id → name) already satisfies this reference.
    #[must_use]
    pub fn is_satisfied_by(&self, attached: &BTreeMap<u64, String>) -> bool {
        match self {
            Self::Id(id) => attached.contains_key(id),
            Self::Name(name) => attached.values().any(|attached_name| attached_name == name),
            Self::InvalidId(_) => false,
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) | Self::InvalidId(name) => f.write_str(name),
        }
    }
}

/// The kind of resource a loop attaches to servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Private network, reconciled by the network loop
    Network,
    /// Firewall, reconciled by the firewall loop
    Firewall,
}

impl AttachmentKind {
    /// Lowercase label used in log lines and metric labels.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Firewall => "firewall",
        }
    }

    /// The server's attachments of this kind.
    #[must_use]
    pub fn attached(self, server: &CloudServer) -> &BTreeMap<u64, String> {
        match self {
            Self::Network => &server.attached_networks,
            Self::Firewall => &server.attached_firewalls,
        }
    }
}

/// A Hetzner Cloud server snapshot.
///
/// Resolved fresh for every reconciliation pass and dropped at its end. Only the
/// attachment map of the [`AttachmentKind`] requested from
/// [`CloudInventory::server_by_name`] is filled; the other one is left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudServer {
    pub id: u64,
    pub name: String,
    /// Private networks, network id → network name
    pub attached_networks: BTreeMap<u64, String>,
    /// Firewalls applied to the public interface, firewall id → firewall name
    pub attached_firewalls: BTreeMap<u64, String>,
}

/// A Hetzner Cloud network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub id: u64,
    pub name: String,
}

/// A Hetzner Cloud firewall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firewall {
    pub id: u64,
    pub name: String,
}

/// Read and write access to the Hetzner Cloud resources the operator reconciles.
///
/// Implementations must be safe to share between the network and firewall loops.
#[async_trait]
pub trait CloudInventory: Send + Sync {
    /// Look up a server by exact name, with its attachments of `kind`.
    ///
    /// Attachments of the other kind are not resolved, so a failing network
    /// lookup never hides a server from the firewall loop and vice versa.
    ///
    /// # Errors
    ///
    /// Returns [`HcloudError::NotFound`] if no server has that name, or any
    /// provider error raised while resolving the server and its `kind` attachments.
    async fn server_by_name(
        &self,
        name: &str,
        kind: AttachmentKind,
    ) -> Result<CloudServer, HcloudError>;

    /// Look up a network by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`HcloudError::NotFound`] if the network does not exist.
    async fn network(&self, target: &TargetRef) -> Result<Network, HcloudError>;

    /// Look up a firewall by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`HcloudError::NotFound`] if the firewall does not exist.
    async fn firewall(&self, target: &TargetRef) -> Result<Firewall, HcloudError>;

    /// Attach a server to a network.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the action is rejected.
    async fn attach_network(&self, server_id: u64, network_id: u64) -> Result<(), HcloudError>;

    /// Apply a firewall to a single server resource.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the action is rejected.
    async fn apply_firewall(&self, firewall_id: u64, server_id: u64) -> Result<(), HcloudError>;
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod inventory_tests;
