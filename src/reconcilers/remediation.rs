// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Remediation executor shared by the network and firewall loops.
//!
//! Each call makes at most one provider action and never retries. Missed or
//! failed attachments are picked up again by the next firewall resync or the
//! next time the node is added.

use crate::errors::HcloudError;
use crate::inventory::{AttachmentKind, CloudInventory, CloudServer, TargetRef};
use crate::metrics::record_remediation;
use tracing::{debug, error, info, warn};

/// Result of one "ensure attached" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// The target does not exist (or could not be looked up); nothing was sent
    Skipped,
    /// The target is attached, either already or after the action
    Attached,
    /// The provider rejected the action
    Failed,
}

impl RemediationOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Attached => "attached",
            Self::Failed => "failed",
        }
    }
}

async fn resolve(
    inventory: &dyn CloudInventory,
    attachment: AttachmentKind,
    target: &TargetRef,
) -> Result<u64, HcloudError> {
    match attachment {
        AttachmentKind::Network => inventory.network(target).await.map(|n| n.id),
        AttachmentKind::Firewall => inventory.firewall(target).await.map(|f| f.id),
    }
}

async fn attach(
    inventory: &dyn CloudInventory,
    attachment: AttachmentKind,
    server_id: u64,
    target_id: u64,
) -> Result<(), HcloudError> {
    match attachment {
        AttachmentKind::Network => inventory.attach_network(server_id, target_id).await,
        AttachmentKind::Firewall => inventory.apply_firewall(target_id, server_id).await,
    }
}

/// Ensure `server` is attached to the network referenced by `target`.
pub async fn ensure_network_attached(
    inventory: &dyn CloudInventory,
    server: &CloudServer,
    target: &TargetRef,
) -> RemediationOutcome {
    let outcome = ensure_attached(inventory, server, target, AttachmentKind::Network).await;
    record_remediation(AttachmentKind::Network.label(), outcome.as_str());
    outcome
}

/// Ensure the firewall referenced by `target` is applied to `server`.
pub async fn ensure_firewall_attached(
    inventory: &dyn CloudInventory,
    server: &CloudServer,
    target: &TargetRef,
) -> RemediationOutcome {
    let outcome = ensure_attached(inventory, server, target, AttachmentKind::Firewall).await;
    record_remediation(AttachmentKind::Firewall.label(), outcome.as_str());
    outcome
}

async fn ensure_attached(
    inventory: &dyn CloudInventory,
    server: &CloudServer,
    target: &TargetRef,
    attachment: AttachmentKind,
) -> RemediationOutcome {
    let hostname = server.name.as_str();
    let kind = target.kind();
    let label = attachment.label();

    if target.is_satisfied_by(attachment.attached(server)) {
        debug!(
            hostname,
            attachment = label,
            kind,
            target_value = %target,
            "Target already attached, nothing to do"
        );
        return RemediationOutcome::Attached;
    }

    let target_id = match resolve(inventory, attachment, target).await {
        Ok(id) => id,
        Err(e) if e.is_not_found() => {
            warn!(
                hostname,
                attachment = label,
                kind,
                target_value = %target,
                "SKIPPING {label} {kind} {target} as not found in Hetzner Cloud"
            );
            return RemediationOutcome::Skipped;
        }
        Err(e) => {
            warn!(
                hostname,
                attachment = label,
                kind,
                target_value = %target,
                error = %e,
                transient = e.is_transient(),
                "SKIPPING {label} {kind} {target} as lookup failed"
            );
            return RemediationOutcome::Skipped;
        }
    };

    info!(
        hostname,
        attachment = label,
        kind,
        target_value = %target,
        "REMEDIATION: Node {hostname} Required {label} {kind} {target} is not attached. Attaching .."
    );

    match attach(inventory, attachment, server.id, target_id).await {
        Ok(()) => {
            info!(
                hostname,
                attachment = label,
                kind,
                target_value = %target,
                "REMEDIATION: Node {hostname} {label} {kind} {target} ATTACHED SUCCESSFULLY"
            );
            RemediationOutcome::Attached
        }
        Err(e) if e.is_already_attached() => {
            info!(
                hostname,
                attachment = label,
                kind,
                target_value = %target,
                "REMEDIATION: Node {hostname} {label} {kind} {target} was already attached"
            );
            RemediationOutcome::Attached
        }
        Err(e) => {
            error!(
                hostname,
                attachment = label,
                kind,
                target_value = %target,
                error = %e,
                transient = e.is_transient(),
                "REMEDIATION: Node {hostname} {label} {kind} {target} ATTACHMENT FAILED"
            );
            RemediationOutcome::Failed
        }
    }
}

#[cfg(test)]
#[path = "remediation_tests.rs"]
mod remediation_tests;
