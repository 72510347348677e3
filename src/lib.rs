// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # hcloud-aux-operator - Hetzner Cloud attachment operator for Kubernetes
//!
//! A small operator that keeps the Hetzner Cloud servers behind a Kubernetes
//! cluster attached to a fixed set of private networks and firewalls.
//!
//! ## Overview
//!
//! - Newly added cluster nodes are attached to every required network
//! - All cluster nodes, plus optional extra hosts, are periodically checked
//!   for the enforced firewalls
//! - Configured networks and firewalls are validated before acting
//!
//! ## Modules
//!
//! - [`config`] - Startup configuration from the process environment
//! - [`inventory`] - Cloud model and the [`inventory::CloudInventory`] trait
//! - [`hcloud`] - Hetzner Cloud REST client
//! - [`cluster`] - Kubernetes node list and watch
//! - [`reconcilers`] - Network and firewall loops, validation and remediation
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust
//! use hcloud_aux_operator::inventory::TargetRef;
//! use std::collections::BTreeMap;
//!
//! let attached = BTreeMap::from([(42, "prod-net".to_string())]);
//!
//! assert!(TargetRef::Id(42).is_satisfied_by(&attached));
//! assert!(TargetRef::Name("prod-net".to_string()).is_satisfied_by(&attached));
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod errors;
pub mod hcloud;
pub mod inventory;
pub mod metrics;
pub mod reconcilers;

#[cfg(test)]
mod test_support;
