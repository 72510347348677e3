// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Hetzner Cloud auxiliary operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Environment Keys
// ============================================================================

/// Environment variable holding the Hetzner Cloud API token (required)
pub const ENV_HCLOUD_TOKEN: &str = "HCLOUD_TOKEN";

/// Environment variable overriding the Hetzner Cloud API base URL
pub const ENV_HCLOUD_ENDPOINT: &str = "HCLOUD_ENDPOINT";

/// Interval in seconds between firewall resync passes
pub const ENV_FIREWALL_CHECK_INTERVAL: &str = "firewall_check_interval";

/// Comma-separated network ids every node server must be attached to
pub const ENV_REQUIRED_NETWORK_IDS: &str = "required_network_ids";

/// Comma-separated network names every node server must be attached to
pub const ENV_REQUIRED_NETWORK_NAMES: &str = "required_network_names";

/// Comma-separated firewall ids every tracked server must have applied
pub const ENV_ENFORCE_FIREWALL_IDS: &str = "enforce_firewall_ids";

/// Comma-separated firewall names every tracked server must have applied
pub const ENV_ENFORCE_FIREWALL_NAMES: &str = "enforce_firewall_names";

/// Comma-separated hostnames outside the cluster that are also subject to firewall enforcement
pub const ENV_ENFORCE_FIREWALL_EXTRA_HOSTS: &str = "enforce_firewall_extra_hosts";

/// Socket address for the optional Prometheus `/metrics` endpoint
pub const ENV_METRICS_BIND_ADDRESS: &str = "METRICS_BIND_ADDRESS";

/// Log output format (`text` or `json`)
pub const ENV_LOG_FORMAT: &str = "RUST_LOG_FORMAT";

// ============================================================================
// Hetzner Cloud API
// ============================================================================

/// Default Hetzner Cloud API base URL
pub const DEFAULT_HCLOUD_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Timeout applied to every Hetzner Cloud HTTP request
pub const HCLOUD_REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent sent to the Hetzner Cloud API
pub const HCLOUD_USER_AGENT: &str = concat!("hcloud-aux-operator/", env!("CARGO_PKG_VERSION"));

/// Firewall resource type for `apply_to_resources`
pub const HCLOUD_RESOURCE_TYPE_SERVER: &str = "server";

/// Error code returned when a server is already attached to the requested network
pub const HCLOUD_ERROR_SERVER_ALREADY_ATTACHED: &str = "server_already_attached";

/// Error code returned when a firewall is already applied to the requested resource
pub const HCLOUD_ERROR_FIREWALL_ALREADY_APPLIED: &str = "firewall_already_applied";

// ============================================================================
// Reconciliation Timing
// ============================================================================

/// Default interval between firewall resync passes (10 seconds)
///
/// The Hetzner Cloud API allows 3600 requests per hour. Each pass costs roughly
/// one server lookup per node and extra host, plus one lookup per attached
/// network or firewall to resolve its name.
pub const DEFAULT_FIREWALL_CHECK_INTERVAL_SECS: u64 = 10;

/// Delay before re-establishing the node watch after the stream ends
pub const WATCH_RESTART_DELAY_SECS: u64 = 1;

// ============================================================================
// Kubernetes
// ============================================================================

/// Annotation carrying the IP address the kubelet was started with
pub const ANNOTATION_PROVIDED_NODE_IP: &str = "alpha.kubernetes.io/provided-node-ip";

/// Page size for paginated Kubernetes list operations
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Runtime
// ============================================================================

/// Number of Tokio worker threads
pub const TOKIO_WORKER_THREADS: usize = 2;

/// Thread name prefix for Tokio workers
pub const TOKIO_THREAD_NAME: &str = "hcloud-aux-operator";
