// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Attachment drift detection.
//!
//! Compares the desired network or firewall references against the
//! attachments recorded on a server snapshot.

use crate::inventory::TargetRef;
use std::collections::BTreeMap;

/// Returns the desired targets not satisfied by the attachment map.
///
/// Order follows `desired`, so id entries come before name entries. A target
/// matching an attachment by id or by name is considered present.
///
/// # Arguments
///
/// * `desired` - Required networks or enforced firewalls
/// * `attached` - Attachment map of the server (id → name)
#[must_use]
pub fn missing_targets<'a>(
    desired: &'a [TargetRef],
    attached: &BTreeMap<u64, String>,
) -> Vec<&'a TargetRef> {
    desired
        .iter()
        .filter(|target| !target.is_satisfied_by(attached))
        .collect()
}

#[cfg(test)]
#[path = "drift_tests.rs"]
mod drift_tests;
