// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Event-driven network reconciliation.
//!
//! The loop waits on the node watch stream. Each newly added node is resolved
//! to its Hetzner server and attached to every required network it is
//! missing. Modifications and deletions are ignored, and a node whose server
//! cannot be resolved is not retried until it is added again.

use crate::cluster::{ClusterNode, NodeEvent};
use crate::constants::WATCH_RESTART_DELAY_SECS;
use crate::context::Context;
use crate::errors::{ClusterError, ReconcileError};
use crate::inventory::AttachmentKind;
use crate::metrics::{record_node_event, record_resolution_failure};
use crate::reconcilers::drift::missing_targets;
use crate::reconcilers::remediation::{ensure_network_attached, RemediationOutcome};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Attach a node's server to every required network it is missing.
///
/// Makes at most one attach attempt per missing network.
///
/// # Errors
///
/// Returns [`ReconcileError::NodeResolution`] if no Hetzner server matches the
/// node hostname or the lookup fails.
pub async fn reconcile_node_networks(
    ctx: &Context,
    node: &ClusterNode,
) -> Result<Vec<RemediationOutcome>, ReconcileError> {
    let required = &ctx.desired.required_networks;
    if required.is_empty() {
        return Ok(Vec::new());
    }

    let server = ctx
        .inventory
        .server_by_name(&node.hostname, AttachmentKind::Network)
        .await
        .map_err(|source| ReconcileError::NodeResolution {
            hostname: node.hostname.clone(),
            source,
        })?;

    let networks: Vec<&str> = server.attached_networks.values().map(String::as_str).collect();
    info!(
        hostname = %node.hostname,
        server_id = server.id,
        networks = ?server.attached_networks,
        "Network Enforcer Found Server {} Private Networks {:?}",
        node.hostname,
        networks
    );

    let missing = missing_targets(required, &server.attached_networks);
    if missing.is_empty() {
        debug!(hostname = %node.hostname, "All required networks already attached");
        return Ok(Vec::new());
    }

    let mut outcomes = Vec::with_capacity(missing.len());
    for target in missing {
        outcomes.push(ensure_network_attached(ctx.inventory.as_ref(), &server, target).await);
    }
    Ok(outcomes)
}

/// Consume node events until the stream ends.
///
/// Only [`NodeEvent::Added`] triggers reconciliation. Stream errors are
/// logged; the kube watcher recovers from them by itself.
pub async fn process_node_events<S>(ctx: &Context, mut events: S)
where
    S: Stream<Item = Result<NodeEvent, ClusterError>> + Unpin,
{
    while let Some(event) = events.next().await {
        match event {
            Ok(NodeEvent::Added(node)) => {
                record_node_event("added");
                info!(
                    hostname = %node.hostname,
                    provided_ip = ?node.provided_ip,
                    "Node added: {}",
                    node.hostname
                );
                if let Err(e) = reconcile_node_networks(ctx, &node).await {
                    record_resolution_failure("node");
                    if e.is_not_found() {
                        error!(
                            hostname = %node.hostname,
                            error = %e,
                            "ERROR: Hetzner Server {} not found via API. Maybe Deleted ?",
                            node.hostname
                        );
                    } else {
                        error!(
                            hostname = %node.hostname,
                            error = %e,
                            transient = e.is_transient(),
                            "ERROR: Hetzner Server {} lookup failed",
                            node.hostname
                        );
                    }
                }
            }
            Ok(NodeEvent::Modified(node)) => {
                record_node_event("modified");
                debug!(hostname = %node.hostname, "Node modified, ignoring");
            }
            Ok(NodeEvent::Deleted(node)) => {
                record_node_event("deleted");
                debug!(hostname = %node.hostname, "Node deleted, ignoring");
            }
            Err(e) => {
                warn!(error = %e, "Node watch error, waiting for the watcher to recover");
            }
        }
    }
}

/// Run the network loop for the life of the process.
///
/// Re-opens the node watch one second after it ends.
pub async fn run_network_loop(ctx: Arc<Context>) {
    info!(
        required_networks = ctx.desired.required_networks.len(),
        "Starting network reconciliation loop"
    );
    loop {
        process_node_events(&ctx, ctx.nodes.node_events()).await;
        warn!(
            delay_secs = WATCH_RESTART_DELAY_SECS,
            "Node watch stream ended, restarting"
        );
        tokio::time::sleep(Duration::from_secs(WATCH_RESTART_DELAY_SECS)).await;
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod network_tests;
