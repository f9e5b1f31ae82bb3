//! Cluster membership view: which nodes exist and how to reach them.
//!
//! [`ClusterView`] is the shared, read-mostly structure that other
//! components (object directory, connection resolver) consult to find out
//! who is in the cluster. The control-plane client feeds it node
//! announcements and removals; everything else only reads it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use reef_types::{NodeId, NodeInfo};
use tracing::{debug, info};

/// Shared view of cluster node membership.
///
/// Removal is terminal for a node id: node ids are unique per incarnation,
/// so a later announcement for a removed id is ignored. A removal may also
/// be announced for a node this view has never seen.
pub struct ClusterView {
    /// This node's identifier.
    local_node_id: NodeId,
    /// Nodes currently part of the cluster, keyed by node id.
    members: RwLock<HashMap<NodeId, NodeInfo>>,
    /// Nodes declared removed from the cluster.
    removed: RwLock<HashSet<NodeId>>,
}

impl ClusterView {
    /// Create a new view for the given local node.
    pub fn new(local_node_id: NodeId) -> Arc<Self> {
        Arc::new(Self {
            local_node_id,
            members: RwLock::new(HashMap::new()),
            removed: RwLock::new(HashSet::new()),
        })
    }

    /// Return this node's ID.
    pub fn local_node_id(&self) -> NodeId {
        self.local_node_id
    }

    /// Add or update a node announcement.
    ///
    /// Announcements for an already-removed node id are ignored.
    pub fn upsert_node(&self, info: NodeInfo) {
        let node_id = info.node_id;
        if self.is_removed(&node_id) {
            debug!(%node_id, "ignoring announcement for removed node");
            return;
        }

        let mut members = self.members.write().expect("cluster view lock poisoned");
        members.insert(node_id, info);
        info!(%node_id, "node announced");
    }

    /// Mark a node as removed from the cluster.
    ///
    /// The node needs no prior sighting; its id is recorded as removed
    /// either way.
    pub fn mark_removed(&self, node_id: NodeId) {
        {
            let mut members = self.members.write().expect("cluster view lock poisoned");
            members.remove(&node_id);
        }
        let mut removed = self.removed.write().expect("cluster view lock poisoned");
        if removed.insert(node_id) {
            info!(%node_id, "node removed from cluster");
        }
    }

    /// Whether the node has been declared removed from the cluster.
    pub fn is_removed(&self, node_id: &NodeId) -> bool {
        self.removed
            .read()
            .expect("cluster view lock poisoned")
            .contains(node_id)
    }

    /// Return a node's metadata, or `None` if unknown or removed.
    pub fn get(&self, node_id: &NodeId) -> Option<NodeInfo> {
        self.members
            .read()
            .expect("cluster view lock poisoned")
            .get(node_id)
            .cloned()
    }

    /// Return a snapshot of every known node.
    pub fn all_nodes(&self) -> Vec<NodeInfo> {
        self.members
            .read()
            .expect("cluster view lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Return the number of known nodes.
    pub fn node_count(&self) -> usize {
        self.members
            .read()
            .expect("cluster view lock poisoned")
            .len()
    }
}

impl std::fmt::Debug for ClusterView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterView")
            .field("local_node_id", &self.local_node_id)
            .field("node_count", &self.node_count())
            .finish_non_exhaustive()
    }
}
