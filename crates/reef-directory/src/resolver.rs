//! Peer connection resolution for the data plane.
//!
//! [`ConnectionResolver`] derives reachable-peer connection info from the
//! cluster view. It is a pure read path: no dependency on the object
//! directory, no state of its own.

use std::sync::Arc;

use reef_cluster::ClusterView;
use reef_types::NodeId;

/// Connection info for a remote peer, produced transiently per query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConnectionInfo {
    /// The peer's node id.
    pub node_id: NodeId,
    /// Object transfer address; empty when the node is unknown.
    pub address: String,
    /// Object transfer port; zero when the node is unknown.
    pub port: u16,
}

impl RemoteConnectionInfo {
    /// Whether the peer's endpoint is known.
    pub fn is_connected(&self) -> bool {
        !self.address.is_empty() && self.port != 0
    }
}

/// Resolves node identities to data-plane endpoints.
pub struct ConnectionResolver {
    nodes: Arc<ClusterView>,
}

impl ConnectionResolver {
    /// Create a resolver over the given cluster view.
    pub fn new(nodes: Arc<ClusterView>) -> Self {
        Self { nodes }
    }

    /// Resolve connection info for a single node.
    ///
    /// Unknown or removed nodes yield an unconnected result; the caller
    /// checks [`RemoteConnectionInfo::is_connected`].
    pub fn resolve(&self, node_id: NodeId) -> RemoteConnectionInfo {
        match self.nodes.get(&node_id) {
            Some(info) => RemoteConnectionInfo {
                node_id,
                address: info.address,
                port: info.object_port,
            },
            None => RemoteConnectionInfo {
                node_id,
                address: String::new(),
                port: 0,
            },
        }
    }

    /// Resolve every known remote peer.
    ///
    /// Excludes the local node and any node without a known endpoint.
    /// Order follows the view's enumeration and is not stable across
    /// calls, since membership changes underneath.
    pub fn resolve_all(&self) -> Vec<RemoteConnectionInfo> {
        let local = self.nodes.local_node_id();
        self.nodes
            .all_nodes()
            .into_iter()
            .filter(|info| info.node_id != local)
            .map(|info| RemoteConnectionInfo {
                node_id: info.node_id,
                address: info.address,
                port: info.object_port,
            })
            .filter(RemoteConnectionInfo::is_connected)
            .collect()
    }
}
