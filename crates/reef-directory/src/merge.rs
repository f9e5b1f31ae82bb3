//! Location merge: folds a control-plane batch into an object's state.
//!
//! This is the only code path that mutates an object's replica set. After
//! folding the batch it sweeps the set against the cluster view, dropping
//! nodes already declared removed — a location add can race a node's
//! removal on the independent membership stream, and sweeping here gives
//! every call site eventual convergence regardless of delivery order.

use reef_cluster::ClusterView;
use reef_types::LocationUpdate;
use tracing::debug;

use crate::directory::{ObjectEntry, SpillLocation};

/// Apply a batch of updates in order, then sweep removed nodes.
///
/// Returns whether any mutation occurred. An empty batch still performs
/// the sweep; node-removal propagation relies on this.
///
/// # Panics
///
/// A `Spilled` update with an empty URL means the control-plane stream is
/// corrupted; the merge aborts rather than continue with an inconsistent
/// replica set.
pub(crate) fn apply_location_updates(
    updates: &[LocationUpdate],
    entry: &mut ObjectEntry,
    nodes: &ClusterView,
) -> bool {
    let mut changed = false;

    for update in updates {
        match update {
            LocationUpdate::Added {
                node_id,
                object_size,
            } => {
                // A zero size never overwrites a previously learned one.
                if *object_size > 0 {
                    entry.object_size = *object_size;
                }
                if entry.locations.insert(*node_id) {
                    changed = true;
                }
            }
            LocationUpdate::Removed { node_id } => {
                if entry.locations.remove(node_id) {
                    changed = true;
                }
            }
            LocationUpdate::Spilled { url, node_id } => {
                assert!(
                    !url.is_empty(),
                    "control plane delivered a spill event with an empty URL"
                );
                if entry.spill.as_ref().map(|s| s.url.as_str()) != Some(url) {
                    debug!(%node_id, url, "object spilled to external storage");
                    entry.spill = Some(SpillLocation {
                        url: url.clone(),
                        node_id: *node_id,
                    });
                    changed = true;
                }
            }
        }
    }

    // Drop nodes the cluster has already removed. Their removal counts as
    // new information even when the batch itself said nothing about them.
    let before = entry.locations.len();
    entry.locations.retain(|node_id| !nodes.is_removed(node_id));
    if entry.locations.len() != before {
        changed = true;
    }

    changed
}
