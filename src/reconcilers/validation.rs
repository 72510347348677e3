// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Existence checks for configured networks, firewalls and extra hosts.
//!
//! The checks never fail. A missing resource and a failed lookup both count
//! as "does not exist" for the aggregate result, but are logged differently.

use crate::errors::HcloudError;
use crate::inventory::{AttachmentKind, CloudInventory, TargetRef};
use crate::metrics::set_missing_targets;
use tracing::{debug, warn};

/// Result of looking up one configured resource.
#[derive(Debug)]
pub enum Existence {
    /// The resource exists
    Present,
    /// The provider reported the resource as absent
    Missing,
    /// The lookup itself failed
    LookupFailed(HcloudError),
}

impl Existence {
    fn from_lookup<T>(result: Result<T, HcloudError>) -> Self {
        match result {
            Ok(_) => Self::Present,
            Err(e) if e.is_not_found() => Self::Missing,
            Err(e) => Self::LookupFailed(e),
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self, Self::Present)
    }
}

/// Look up one network reference.
pub async fn network_existence(inventory: &dyn CloudInventory, target: &TargetRef) -> Existence {
    Existence::from_lookup(inventory.network(target).await)
}

/// Look up one firewall reference.
pub async fn firewall_existence(inventory: &dyn CloudInventory, target: &TargetRef) -> Existence {
    Existence::from_lookup(inventory.firewall(target).await)
}

/// Check that every required network exists, warning once per missing entry.
///
/// Every entry is looked up even after the first miss.
pub async fn check_networks_exist(inventory: &dyn CloudInventory, targets: &[TargetRef]) -> bool {
    let mut missing = 0;
    for target in targets {
        let existence = network_existence(inventory, target).await;
        if !existence.exists() {
            missing += 1;
            report_missing("Network", target, &existence);
        }
    }
    set_missing_targets("network", missing);
    missing == 0
}

/// Check that every enforced firewall exists, warning once per missing entry.
pub async fn check_firewalls_exist(inventory: &dyn CloudInventory, targets: &[TargetRef]) -> bool {
    let mut missing = 0;
    for target in targets {
        let existence = firewall_existence(inventory, target).await;
        if !existence.exists() {
            missing += 1;
            report_missing("Firewall", target, &existence);
        }
    }
    set_missing_targets("firewall", missing);
    missing == 0
}

/// Check that every extra host has a matching server.
pub async fn check_extra_hosts_exist(inventory: &dyn CloudInventory, hosts: &[String]) -> bool {
    let mut all_exist = true;
    for host in hosts {
        let lookup = inventory
            .server_by_name(host, AttachmentKind::Firewall)
            .await;
        match Existence::from_lookup(lookup) {
            Existence::Present => debug!(host = %host, "Extra host found in Hetzner Cloud"),
            Existence::Missing => {
                all_exist = false;
                warn!(host = %host, "WARNING: Firewall Enforcing Extra Host {host} not found");
            }
            Existence::LookupFailed(e) => {
                all_exist = false;
                warn!(
                    host = %host,
                    error = %e,
                    transient = e.is_transient(),
                    "WARNING: Could not look up Firewall Enforcing Extra Host {host}"
                );
            }
        }
    }
    all_exist
}

fn report_missing(resource: &str, target: &TargetRef, existence: &Existence) {
    let kind = target.kind();
    match existence {
        Existence::LookupFailed(e) => warn!(
            kind,
            target_value = %target,
            error = %e,
            transient = e.is_transient(),
            "WARNING: {resource} {kind} {target} could not be looked up in Hetzner Cloud"
        ),
        _ => warn!(
            kind,
            target_value = %target,
            "WARNING: {resource} {kind} {target} not found in Hetzner Cloud"
        ),
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
