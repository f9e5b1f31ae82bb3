//! Shared types and identifiers for Reef.
//!
//! This crate defines the core types used across the Reef workspace:
//! identifiers ([`NodeId`], [`ObjectId`], [`SubscriberId`]), per-node
//! connection metadata ([`NodeInfo`]), and the control-plane location
//! stream ([`LocationUpdate`]).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Create an ID by hashing arbitrary data with BLAKE3.
            pub fn from_data(data: &[u8]) -> Self {
                Self(blake3::hash(data).into())
            }

            /// Return the raw 32-byte representation.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

define_id!(
    /// Cluster-unique identifier for a node. Node ids are unique per
    /// incarnation: a removed node never returns under the same id.
    NodeId
);

define_id!(
    /// Content-addressed identifier for a stored object.
    ObjectId
);

define_id!(
    /// Identifier for a location subscriber, unique per consumer.
    SubscriberId
);

// ---------------------------------------------------------------------------
// Cluster types
// ---------------------------------------------------------------------------

/// Connection metadata for a cluster node, as announced by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Unique identifier for this node.
    pub node_id: NodeId,
    /// Address the node's object transfer endpoint listens on.
    pub address: String,
    /// Port of the node's object transfer endpoint.
    pub object_port: u16,
}

/// One unit of the control plane's per-object location stream.
///
/// A batch is an ordered `Vec<LocationUpdate>` and is applied strictly in
/// delivery order, never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationUpdate {
    /// `node_id` now holds a replica of the object.
    Added {
        /// The node that gained a replica.
        node_id: NodeId,
        /// Object size in bytes; always positive for a genuine add.
        object_size: u64,
    },
    /// `node_id` no longer holds a replica.
    Removed {
        /// The node that lost its replica.
        node_id: NodeId,
    },
    /// The object has been written to external storage.
    Spilled {
        /// Location of the spilled copy. Never empty in a well-formed stream.
        url: String,
        /// Node that owns the spilled copy.
        node_id: NodeId,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
