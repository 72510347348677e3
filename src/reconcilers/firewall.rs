// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic firewall resync.
//!
//! Every pass re-evaluates all cluster nodes plus the configured extra hosts
//! and applies each enforced firewall a server is missing. Anything that
//! fails in one pass is tried again on the next, one poll interval later.

use crate::cluster::ClusterNode;
use crate::context::Context;
use crate::inventory::{AttachmentKind, CloudServer};
use crate::metrics::{record_resolution_failure, record_resync};
use crate::reconcilers::drift::missing_targets;
use crate::reconcilers::remediation::{ensure_firewall_attached, RemediationOutcome};
use crate::reconcilers::validation::check_firewalls_exist;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Counters for one resync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResyncSummary {
    /// Servers resolved and compared against the enforced firewalls
    pub servers_evaluated: usize,
    /// Nodes or extra hosts without a matching server
    pub unresolved: usize,
    pub attached: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ResyncSummary {
    fn record(&mut self, outcome: RemediationOutcome) {
        match outcome {
            RemediationOutcome::Attached => self.attached += 1,
            RemediationOutcome::Skipped => self.skipped += 1,
            RemediationOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostSource {
    ClusterNode,
    ExtraHost,
}

impl HostSource {
    fn label(self) -> &'static str {
        match self {
            Self::ClusterNode => "node",
            Self::ExtraHost => "extra_host",
        }
    }
}

/// Run one firewall resync pass.
///
/// On the first pass the firewall map of every resolved server is logged.
/// Per-host failures never abort the pass.
pub async fn resync_firewalls(ctx: &Context, first_run: bool) -> ResyncSummary {
    let mut summary = ResyncSummary::default();
    let enforced = &ctx.desired.enforced_firewalls;
    if enforced.is_empty() {
        debug!("No enforced firewalls configured, skipping resync");
        return summary;
    }

    let start = Instant::now();
    let inventory = ctx.inventory.as_ref();
    check_firewalls_exist(inventory, enforced).await;

    let (servers, unresolved) = collect_servers(ctx).await;
    summary.unresolved = unresolved;

    for server in &servers {
        summary.servers_evaluated += 1;
        if first_run {
            info!(
                hostname = %server.name,
                server_id = server.id,
                firewalls = ?server.attached_firewalls,
                "Server {} firewalls: {:?}",
                server.name,
                server.attached_firewalls
            );
        }
        for target in missing_targets(enforced, &server.attached_firewalls) {
            summary.record(ensure_firewall_attached(inventory, server, target).await);
        }
    }

    record_resync(start.elapsed());
    info!(
        servers_evaluated = summary.servers_evaluated,
        unresolved = summary.unresolved,
        attached = summary.attached,
        skipped = summary.skipped,
        failed = summary.failed,
        duration_ms = start.elapsed().as_millis(),
        "Firewall resync pass complete"
    );
    summary
}

/// Resolve cluster nodes then extra hosts, each hostname at most once.
///
/// Returns the resolved servers in list order and the number of hosts that
/// could not be resolved.
async fn collect_servers(ctx: &Context) -> (Vec<CloudServer>, usize) {
    let mut hosts: Vec<(String, HostSource)> = Vec::new();
    match ctx.nodes.list_nodes().await {
        Ok(nodes) => hosts.extend(
            nodes
                .into_iter()
                .map(|ClusterNode { hostname, .. }| (hostname, HostSource::ClusterNode)),
        ),
        Err(e) => error!(
            error = %e,
            "Failed to list cluster nodes, continuing with extra hosts only"
        ),
    }
    hosts.extend(
        ctx.desired
            .extra_hosts
            .iter()
            .map(|host| (host.clone(), HostSource::ExtraHost)),
    );

    let mut seen = HashSet::new();
    let mut servers = Vec::with_capacity(hosts.len());
    let mut unresolved = 0;
    for (hostname, source) in hosts {
        if !seen.insert(hostname.clone()) {
            debug!(hostname = %hostname, "Host already evaluated in this pass");
            continue;
        }
        let lookup = ctx
            .inventory
            .server_by_name(&hostname, AttachmentKind::Firewall)
            .await;
        match lookup {
            Ok(server) => servers.push(server),
            Err(e) => {
                unresolved += 1;
                record_resolution_failure(source.label());
                match source {
                    _ if !e.is_not_found() => error!(
                        hostname = %hostname,
                        host_source = source.label(),
                        error = %e,
                        transient = e.is_transient(),
                        "ERROR: Hetzner Server {hostname} lookup failed"
                    ),
                    HostSource::ClusterNode => error!(
                        hostname = %hostname,
                        error = %e,
                        "ERROR: Hetzner Server {hostname} not found via API. Maybe Deleted ?"
                    ),
                    HostSource::ExtraHost => warn!(
                        hostname = %hostname,
                        error = %e,
                        "WARNING: Firewall Enforcing Extra Host {hostname} not found"
                    ),
                }
            }
        }
    }
    (servers, unresolved)
}

/// Run the firewall loop for the life of the process.
pub async fn run_firewall_loop(ctx: Arc<Context>) {
    info!(
        enforced_firewalls = ctx.desired.enforced_firewalls.len(),
        extra_hosts = ctx.desired.extra_hosts.len(),
        interval_secs = ctx.desired.poll_interval.as_secs(),
        "Starting firewall reconciliation loop"
    );
    let mut first_run = true;
    loop {
        resync_firewalls(&ctx, first_run).await;
        first_run = false;
        tokio::time::sleep(ctx.desired.poll_interval).await;
    }
}

#[cfg(test)]
#[path = "firewall_tests.rs"]
mod firewall_tests;
