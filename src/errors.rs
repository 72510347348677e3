// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the Hetzner Cloud auxiliary operator.
//!
//! This module provides specialized error types for:
//! - Startup configuration parsing (fatal)
//! - Hetzner Cloud API operations (lookups and attach actions)
//! - Kubernetes node listing and watching
//! - Per-node reconciliation failures
//!
//! Only [`ConfigError`] is fatal. Everything else is logged by the reconciliation
//! loops and the affected step is skipped for the current pass.

use crate::constants::{
    HCLOUD_ERROR_FIREWALL_ALREADY_APPLIED, HCLOUD_ERROR_SERVER_ALREADY_ATTACHED,
};
use thiserror::Error;

/// Errors raised while building the operator configuration at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The API token environment variable is absent or empty
    #[error("Please export your API token in the {key} environment variable")]
    MissingToken {
        /// Environment key that was expected
        key: &'static str,
    },

    /// A scalar setting could not be parsed
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Environment key holding the value
        key: &'static str,
        /// The offending value
        value: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors that can occur when talking to the Hetzner Cloud API.
#[derive(Error, Debug)]
pub enum HcloudError {
    /// The requested server, network or firewall does not exist
    ///
    /// Returned for an empty name lookup as well as for HTTP 404.
    #[error("{kind} {target} not found in Hetzner Cloud")]
    NotFound {
        /// Resource kind (`server`, `network`, `firewall`)
        kind: &'static str,
        /// Id or name that was looked up
        target: String,
    },

    /// The API answered with a non-success status
    #[error("Hetzner Cloud API error (HTTP {status}) {code}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Machine readable error code from the response body
        code: String,
        /// Human readable message from the response body
        message: String,
    },

    /// The request never produced a response (connect, TLS, timeout)
    #[error("HTTP request to Hetzner Cloud failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("Unexpected response from Hetzner Cloud: {0}")]
    Decode(String),
}

impl HcloudError {
    /// Whether the error means the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure is expected to clear up on its own.
    ///
    /// Rate limiting, gateway errors and transport failures are transient.
    /// The operator never retries inline; this only shapes log output.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api { status, .. } => is_transient_status(*status),
            Self::Transport(_) => true,
            Self::NotFound { .. } | Self::Decode(_) => false,
        }
    }

    /// Whether the API rejected an attach because it is already in place.
    #[must_use]
    pub fn is_already_attached(&self) -> bool {
        match self {
            Self::Api { code, .. } => {
                code == HCLOUD_ERROR_SERVER_ALREADY_ATTACHED
                    || code == HCLOUD_ERROR_FIREWALL_ALREADY_APPLIED
            }
            _ => false,
        }
    }
}

/// Determine if an HTTP status code indicates a transient provider failure.
///
/// # Transient Status Codes
///
/// - **429** (Too Many Requests) - Rate limiting
/// - **500** (Internal Server Error) - Server error
/// - **502** (Bad Gateway) - Proxy/gateway error
/// - **503** (Service Unavailable) - Temporary unavailability
/// - **504** (Gateway Timeout) - Gateway timeout
#[must_use]
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Errors from the Kubernetes node list and watch operations.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Kubernetes API request failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The node watch stream reported an error
    #[error("Node watch error: {0}")]
    Watch(#[from] kube::runtime::watcher::Error),
}

/// Errors from reconciling a single node or host.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A cluster node or extra host has no matching Hetzner Cloud server
    #[error("Hetzner server {hostname} could not be resolved: {source}")]
    NodeResolution {
        /// Node hostname used for the lookup
        hostname: String,
        /// Underlying lookup failure
        #[source]
        source: HcloudError,
    },
}

impl ReconcileError {
    /// The server does not exist, as opposed to a failed lookup.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NodeResolution { source, .. } => source.is_not_found(),
        }
    }

    /// Whether the underlying provider failure may succeed if tried again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NodeResolution { source, .. } => source.is_transient(),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
