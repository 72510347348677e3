// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes node watching and listing.
//!
//! The network loop consumes [`NodeEvent`]s and only acts on
//! [`NodeEvent::Added`]. The kube watcher reports additions and modifications
//! alike as `Apply`, so [`NodeEventTracker`] remembers which node names have
//! been seen to tell them apart.

use crate::constants::{ANNOTATION_PROVIDED_NODE_IP, KUBE_LIST_PAGE_SIZE};
use crate::errors::ClusterError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{future, Stream, StreamExt};
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Client, ResourceExt};
use std::collections::HashSet;
use tracing::debug;

/// A cluster member as seen by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNode {
    /// Node name, expected to equal the Hetzner server name
    pub hostname: String,
    /// Kubelet provided IP annotation; informational only
    pub provided_ip: Option<String>,
}

impl ClusterNode {
    /// Build from a Kubernetes `Node`; `None` if the node has no name.
    #[must_use]
    pub fn from_node(node: &Node) -> Option<Self> {
        let hostname = node.metadata.name.clone()?;
        let provided_ip = node.annotations().get(ANNOTATION_PROVIDED_NODE_IP).cloned();
        Some(Self {
            hostname,
            provided_ip,
        })
    }
}

/// Node lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Added(ClusterNode),
    Modified(ClusterNode),
    Deleted(ClusterNode),
}

/// Source of cluster nodes for the reconciliation loops.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List every node currently in the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes API call fails.
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, ClusterError>;

    /// Open a new node event stream.
    ///
    /// The first events after opening report every existing node as added.
    fn node_events(&self) -> BoxStream<'static, Result<NodeEvent, ClusterError>>;
}

/// Turns raw watcher events into add/modify/delete notifications.
#[derive(Debug, Default)]
pub struct NodeEventTracker {
    seen: HashSet<String>,
    /// Names listed since the last `Init`, swapped into `seen` on `InitDone`
    relisted: Option<HashSet<String>>,
}

impl NodeEventTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one watcher event.
    pub fn observe(&mut self, event: Event<Node>) -> Option<NodeEvent> {
        match event {
            Event::Init => {
                self.relisted = Some(HashSet::new());
                None
            }
            Event::InitApply(node) => {
                let node = ClusterNode::from_node(&node)?;
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(node.hostname.clone());
                }
                Some(self.apply(node))
            }
            Event::InitDone => {
                // Nodes missing from the relist were deleted while disconnected
                if let Some(relisted) = self.relisted.take() {
                    self.seen = relisted;
                }
                None
            }
            Event::Apply(node) => {
                let node = ClusterNode::from_node(&node)?;
                Some(self.apply(node))
            }
            Event::Delete(node) => {
                let node = ClusterNode::from_node(&node)?;
                self.seen.remove(&node.hostname);
                Some(NodeEvent::Deleted(node))
            }
        }
    }

    fn apply(&mut self, node: ClusterNode) -> NodeEvent {
        if self.seen.insert(node.hostname.clone()) {
            NodeEvent::Added(node)
        } else {
            NodeEvent::Modified(node)
        }
    }
}

/// [`NodeSource`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeNodeSource {
    api: Api<Node>,
}

impl KubeNodeSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl NodeSource for KubeNodeSource {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>, ClusterError> {
        let nodes = list_nodes_paginated(&self.api).await?;
        Ok(nodes.iter().filter_map(ClusterNode::from_node).collect())
    }

    fn node_events(&self) -> BoxStream<'static, Result<NodeEvent, ClusterError>> {
        node_event_stream(watcher::watcher(
            self.api.clone(),
            watcher::Config::default(),
        ))
    }
}

/// Classify raw watcher events, backing off after every watch error.
///
/// After an error the underlying stream is not polled again until kube's
/// default watcher backoff has elapsed.
pub fn node_event_stream<S>(events: S) -> BoxStream<'static, Result<NodeEvent, ClusterError>>
where
    S: Stream<Item = Result<Event<Node>, watcher::Error>> + Send + 'static,
{
    let mut tracker = NodeEventTracker::new();
    events
        .default_backoff()
        .filter_map(move |result| {
            future::ready(match result {
                Ok(event) => tracker.observe(event).map(Ok),
                Err(e) => Some(Err(ClusterError::from(e))),
            })
        })
        .boxed()
}

/// List all nodes, fetching them in pages.
///
/// # Errors
///
/// Returns an error if Kubernetes API operations fail.
pub async fn list_nodes_paginated(api: &Api<Node>) -> Result<Vec<Node>, ClusterError> {
    let mut list_params = ListParams::default().limit(KUBE_LIST_PAGE_SIZE);
    let mut all_nodes = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = api.list(&list_params).await?;
        all_nodes.extend(result.items);

        debug!(
            page = page_count,
            total_items = all_nodes.len(),
            "Fetched page of nodes from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(token) if !token.is_empty() => {
                list_params = list_params.continue_token(&token);
            }
            _ => break,
        }
    }

    Ok(all_nodes)
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
