// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for both reconciliation loops.
//!
//! The network and firewall loops each receive an `Arc<Context>` holding:
//! - The immutable desired state loaded at startup
//! - The Hetzner Cloud inventory accessor
//! - The Kubernetes node source
//!
//! Nothing in the context is mutated after startup. Both loops may act on the
//! same server concurrently (a node added while a firewall resync covers it);
//! they touch disjoint attachment kinds, and this race is accepted.

use crate::cluster::NodeSource;
use crate::config::DesiredState;
use crate::inventory::CloudInventory;
use std::sync::Arc;

/// Shared context passed to both loops.
#[derive(Clone)]
pub struct Context {
    /// Attachments every tracked server must have
    pub desired: DesiredState,

    /// Hetzner Cloud lookups and attach actions
    pub inventory: Arc<dyn CloudInventory>,

    /// Kubernetes node list and watch
    pub nodes: Arc<dyn NodeSource>,
}

impl Context {
    #[must_use]
    pub fn new(
        desired: DesiredState,
        inventory: Arc<dyn CloudInventory>,
        nodes: Arc<dyn NodeSource>,
    ) -> Self {
        Self {
            desired,
            inventory,
            nodes,
        }
    }
}
