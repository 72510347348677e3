// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration loaded once from the process environment.
//!
//! Nothing outside this module reads the environment. [`OperatorConfig::from_env`]
//! builds an immutable value that `main` hands to both reconciliation loops.
//!
//! # Example
//!
//! ```rust
//! use hcloud_aux_operator::config::OperatorConfig;
//! use hcloud_aux_operator::inventory::TargetRef;
//! use std::collections::HashMap;
//!
//! let env = HashMap::from([
//!     ("HCLOUD_TOKEN", "secret"),
//!     ("required_network_ids", "10,20"),
//!     ("enforce_firewall_names", "edge"),
//! ]);
//! let config = OperatorConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string()))
//!     .expect("valid configuration");
//!
//! assert_eq!(
//!     config.desired.required_networks,
//!     vec![TargetRef::Id(10), TargetRef::Id(20)]
//! );
//! ```

use crate::constants::{
    DEFAULT_FIREWALL_CHECK_INTERVAL_SECS, DEFAULT_HCLOUD_ENDPOINT, ENV_ENFORCE_FIREWALL_EXTRA_HOSTS,
    ENV_ENFORCE_FIREWALL_IDS, ENV_ENFORCE_FIREWALL_NAMES, ENV_FIREWALL_CHECK_INTERVAL,
    ENV_HCLOUD_ENDPOINT, ENV_HCLOUD_TOKEN, ENV_METRICS_BIND_ADDRESS, ENV_REQUIRED_NETWORK_IDS,
    ENV_REQUIRED_NETWORK_NAMES,
};
use crate::errors::ConfigError;
use crate::inventory::TargetRef;
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

/// The attachments every tracked server must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    /// Networks a node's server must be attached to (ids first, then names)
    pub required_networks: Vec<TargetRef>,
    /// Firewalls every tracked server must have applied (ids first, then names)
    pub enforced_firewalls: Vec<TargetRef>,
    /// Servers outside the cluster node list that get firewall enforcement too
    pub extra_hosts: Vec<String>,
    /// Delay between firewall resync passes, always non-zero
    pub poll_interval: Duration,
}

impl Default for DesiredState {
    fn default() -> Self {
        Self {
            required_networks: Vec::new(),
            enforced_firewalls: Vec::new(),
            extra_hosts: Vec::new(),
            poll_interval: Duration::from_secs(DEFAULT_FIREWALL_CHECK_INTERVAL_SECS),
        }
    }
}

/// Hetzner Cloud API token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// Complete startup configuration.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    pub token: ApiToken,
    pub endpoint: url::Url,
    pub metrics_bind_address: Option<SocketAddr>,
    pub desired: DesiredState,
}

impl OperatorConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the token is missing or a value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the token is missing or a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(ENV_HCLOUD_TOKEN)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken {
                key: ENV_HCLOUD_TOKEN,
            })?;

        let raw_endpoint = lookup(ENV_HCLOUD_ENDPOINT)
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_HCLOUD_ENDPOINT.to_string());
        let endpoint =
            url::Url::parse(&raw_endpoint).map_err(|e| ConfigError::InvalidValue {
                key: ENV_HCLOUD_ENDPOINT,
                value: raw_endpoint.clone(),
                reason: e.to_string(),
            })?;

        let metrics_bind_address = match lookup(ENV_METRICS_BIND_ADDRESS)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
        {
            Some(addr) => Some(addr.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: ENV_METRICS_BIND_ADDRESS,
                    value: addr.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let mut required_networks =
            parse_ids(ENV_REQUIRED_NETWORK_IDS, lookup(ENV_REQUIRED_NETWORK_IDS));
        required_networks.extend(
            parse_list(lookup(ENV_REQUIRED_NETWORK_NAMES).as_deref())
                .into_iter()
                .map(TargetRef::Name),
        );

        let mut enforced_firewalls =
            parse_ids(ENV_ENFORCE_FIREWALL_IDS, lookup(ENV_ENFORCE_FIREWALL_IDS));
        enforced_firewalls.extend(
            parse_list(lookup(ENV_ENFORCE_FIREWALL_NAMES).as_deref())
                .into_iter()
                .map(TargetRef::Name),
        );

        let desired = DesiredState {
            required_networks,
            enforced_firewalls,
            extra_hosts: parse_list(lookup(ENV_ENFORCE_FIREWALL_EXTRA_HOSTS).as_deref()),
            poll_interval: parse_interval(lookup(ENV_FIREWALL_CHECK_INTERVAL).as_deref()),
        };

        Ok(Self {
            token: ApiToken::new(token),
            endpoint,
            metrics_bind_address,
            desired,
        })
    }

    /// Log the effective configuration, one line per setting.
    pub fn log_startup_config(&self) {
        let desired = &self.desired;
        info!(
            firewall_check_interval = desired.poll_interval.as_secs(),
            "STARTUP CONFIG: firewall_check_interval"
        );
        info!(
            required_networks = ?display_targets(&desired.required_networks),
            "STARTUP CONFIG: required networks"
        );
        info!(
            enforced_firewalls = ?display_targets(&desired.enforced_firewalls),
            "STARTUP CONFIG: enforced firewalls"
        );
        info!(
            extra_hosts = ?desired.extra_hosts,
            "STARTUP CONFIG: enforce_firewall_extra_hosts"
        );
        info!(endpoint = %self.endpoint, "STARTUP CONFIG: Hetzner Cloud endpoint");
        if let Some(addr) = self.metrics_bind_address {
            info!(metrics_bind_address = %addr, "STARTUP CONFIG: metrics endpoint");
        }
    }
}

fn display_targets(targets: &[TargetRef]) -> Vec<String> {
    targets
        .iter()
        .map(|t| format!("{} {t}", t.kind()))
        .collect()
}

/// Split a comma-separated value into trimmed, non-empty, de-duplicated entries.
///
/// Order of first occurrence is preserved.
#[must_use]
pub fn parse_list(raw: Option<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| seen.insert((*entry).to_string()))
        .map(ToString::to_string)
        .collect()
}

/// Parse an id list. Entries that are not unsigned integers are kept as
/// [`TargetRef::InvalidId`] so the loops report them missing and skip them.
fn parse_ids(key: &'static str, raw: Option<String>) -> Vec<TargetRef> {
    let mut ids = Vec::new();
    for entry in parse_list(raw.as_deref()) {
        let target = match entry.parse::<u64>() {
            Ok(id) => TargetRef::Id(id),
            Err(_) => {
                warn!(
                    key,
                    value = %entry,
                    "Invalid id '{entry}' in {key}: ids must be unsigned integers, it will be skipped"
                );
                TargetRef::InvalidId(entry)
            }
        };
        // "010" and "10" normalize to the same id
        if !ids.contains(&target) {
            ids.push(target);
        }
    }
    ids
}

/// Parse the firewall poll interval, falling back to the default.
///
/// Unparsable and zero values fall back to the default with a warning.
#[must_use]
pub fn parse_interval(raw: Option<&str>) -> Duration {
    let default = Duration::from_secs(DEFAULT_FIREWALL_CHECK_INTERVAL_SECS);
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return default;
    };

    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(
                value = raw,
                default_secs = DEFAULT_FIREWALL_CHECK_INTERVAL_SECS,
                "Invalid {ENV_FIREWALL_CHECK_INTERVAL}, using default"
            );
            default
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
