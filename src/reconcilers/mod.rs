// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation loops for Hetzner Cloud server attachments.
//!
//! The operator keeps every cluster node's Hetzner server attached to the
//! required private networks, and every tracked server covered by the
//! enforced firewalls.
//!
//! # Reconciliation Architecture
//!
//! 1. **Validate** - Confirm the configured networks and firewalls exist
//! 2. **Observe** - Resolve each server and read its current attachments
//! 3. **Diff** - Compute the desired targets the server is missing
//! 4. **Remediate** - Attach each missing target once, without retry
//!
//! # Available Loops
//!
//! - [`run_network_loop`] - Event-driven; reacts to newly added nodes
//! - [`run_firewall_loop`] - Poll-driven; resyncs all nodes and extra hosts
//!
//! # Example: Running One Firewall Pass
//!
//! ```rust,no_run
//! use hcloud_aux_operator::context::Context;
//! use hcloud_aux_operator::reconcilers::resync_firewalls;
//!
//! async fn one_pass(ctx: &Context) {
//!     let summary = resync_firewalls(ctx, true).await;
//!     println!("applied {} firewalls", summary.attached);
//! }
//! ```

pub mod drift;
pub mod firewall;
pub mod network;
pub mod remediation;
pub mod validation;

pub use firewall::{resync_firewalls, run_firewall_loop, ResyncSummary};
pub use network::{process_node_events, reconcile_node_networks, run_network_loop};
pub use remediation::{ensure_firewall_attached, ensure_network_attached, RemediationOutcome};
pub use validation::{
    check_extra_hosts_exist, check_firewalls_exist, check_networks_exist, Existence,
};
