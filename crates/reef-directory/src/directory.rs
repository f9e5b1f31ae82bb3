//! The object directory: per-object replica state with subscriber fan-out.
//!
//! [`ObjectDirectory`] owns the mapping from [`ObjectId`] to per-object
//! state and drives the location merge on every incoming batch. Subscriber
//! callbacks run synchronously after each observed change, with the
//! directory already in its post-update state — a callback may call back
//! into the directory (subscribe, unsubscribe, look up, apply) without
//! corrupting iteration, because per-object state is addressed by stable
//! key and the internal lock is never held across a callback invocation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use reef_cluster::ClusterView;
use reef_types::{LocationUpdate, NodeId, ObjectId, SubscriberId};
use tracing::{debug, info};

use crate::merge;

/// Where a spilled copy of an object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpillLocation {
    /// External storage URL of the spilled copy.
    pub url: String,
    /// Node that owns the spilled copy.
    pub node_id: NodeId,
}

/// Immutable view of an object's location state, handed to callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSnapshot {
    /// The object this snapshot describes.
    pub object_id: ObjectId,
    /// Nodes currently believed to hold a replica.
    pub locations: HashSet<NodeId>,
    /// Spill location, if the object has been written to external storage.
    pub spill: Option<SpillLocation>,
    /// Last known size in bytes; zero until the first sized add arrives.
    pub object_size: u64,
}

/// Callback invoked after every observed change to an object's locations.
///
/// A callback firing is a change signal: it is never invoked for a batch
/// that left the state untouched.
pub type LocationCallback = Arc<dyn Fn(&LocationSnapshot) + Send + Sync>;

/// Per-object state: replica set, spill location, size, and callbacks.
#[derive(Default)]
pub(crate) struct ObjectEntry {
    pub(crate) locations: HashSet<NodeId>,
    pub(crate) spill: Option<SpillLocation>,
    pub(crate) object_size: u64,
    pub(crate) callbacks: HashMap<SubscriberId, LocationCallback>,
}

impl ObjectEntry {
    fn snapshot(&self, object_id: ObjectId) -> LocationSnapshot {
        LocationSnapshot {
            object_id,
            locations: self.locations.clone(),
            spill: self.spill.clone(),
            object_size: self.object_size,
        }
    }
}

/// Directory of object locations, one entry per tracked object.
///
/// The directory exclusively owns all per-object state; the [`ClusterView`]
/// is shared and only ever read. All operations are synchronous and
/// non-blocking — the host integrates the directory with exactly one
/// event-dispatch context (see [`crate::service`]), and the internal lock
/// only guards the short sections between callback invocations.
pub struct ObjectDirectory {
    nodes: Arc<ClusterView>,
    /// Tracked objects by stable key.
    objects: Mutex<HashMap<ObjectId, ObjectEntry>>,
}

impl ObjectDirectory {
    /// Create an empty directory backed by the given cluster view.
    pub fn new(nodes: Arc<ClusterView>) -> Self {
        Self {
            nodes,
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Return the shared cluster view.
    pub fn nodes(&self) -> &Arc<ClusterView> {
        &self.nodes
    }

    /// Register `callback` for changes to `object_id`.
    ///
    /// Re-registering an existing subscriber id replaces its callback.
    pub fn subscribe(
        &self,
        object_id: ObjectId,
        subscriber: SubscriberId,
        callback: LocationCallback,
    ) {
        let mut objects = self.objects.lock().expect("object directory lock poisoned");
        let entry = objects.entry(object_id).or_default();
        entry.callbacks.insert(subscriber, callback);
        debug!(%object_id, %subscriber, "subscriber registered");
    }

    /// Remove a subscriber's callback for `object_id`.
    ///
    /// When the last subscriber goes, the whole entry is torn down; a
    /// fresh subscription rebuilds it from the control-plane stream.
    /// Returns whether a callback was actually removed — removing an
    /// unknown subscriber or object is a non-error.
    pub fn unsubscribe(&self, object_id: ObjectId, subscriber: SubscriberId) -> bool {
        let mut objects = self.objects.lock().expect("object directory lock poisoned");
        let Some(entry) = objects.get_mut(&object_id) else {
            return false;
        };
        let removed = entry.callbacks.remove(&subscriber).is_some();
        if entry.callbacks.is_empty() {
            objects.remove(&object_id);
            debug!(%object_id, "last subscriber gone, entry dropped");
        }
        removed
    }

    /// Current state of a tracked object, or `None` if untracked.
    pub fn lookup(&self, object_id: ObjectId) -> Option<LocationSnapshot> {
        self.objects
            .lock()
            .expect("object directory lock poisoned")
            .get(&object_id)
            .map(|entry| entry.snapshot(object_id))
    }

    /// Number of objects currently tracked.
    pub fn object_count(&self) -> usize {
        self.objects
            .lock()
            .expect("object directory lock poisoned")
            .len()
    }

    /// Fold a control-plane batch into the object's state.
    ///
    /// The entry is created lazily on first sight of the object. When the
    /// merge reports a change, every registered callback is invoked with
    /// the post-update snapshot; an unchanged state invokes nothing.
    pub fn apply_location_update(&self, object_id: ObjectId, updates: &[LocationUpdate]) {
        let (changed, snapshot) = {
            let mut objects = self.objects.lock().expect("object directory lock poisoned");
            let entry = objects.entry(object_id).or_default();
            let changed = merge::apply_location_updates(updates, entry, &self.nodes);
            let snapshot = entry.snapshot(object_id);
            let vacant = !changed
                && entry.callbacks.is_empty()
                && entry.locations.is_empty()
                && entry.spill.is_none()
                && entry.object_size == 0;
            if vacant {
                // Don't retain an entry a no-op batch just created.
                objects.remove(&object_id);
            }
            (changed, snapshot)
        };

        if changed {
            debug!(
                %object_id,
                replicas = snapshot.locations.len(),
                spilled = snapshot.spill.is_some(),
                "object locations changed"
            );
            self.notify(&snapshot);
        }
    }

    /// Propagate a cluster-level node removal into every affected object.
    ///
    /// Each object whose locations contain the node gets an empty-batch
    /// merge — the sweep inside the merge performs the removal under the
    /// same invariants as an organic update — followed by an unconditional
    /// fan-out, since the node was confirmed present beforehand. Objects
    /// that never listed the node are untouched and notify nobody.
    ///
    /// The cluster view must already report the node removed when this is
    /// called; the service loop applies the two in that order.
    pub fn handle_node_removed(&self, node_id: NodeId) {
        let affected: Vec<ObjectId> = {
            let objects = self.objects.lock().expect("object directory lock poisoned");
            objects
                .iter()
                .filter(|(_, entry)| entry.locations.contains(&node_id))
                .map(|(object_id, _)| *object_id)
                .collect()
        };

        if affected.is_empty() {
            return;
        }
        info!(
            %node_id,
            objects = affected.len(),
            "dropping removed node from object locations"
        );

        for object_id in affected {
            // Re-looked-up by key: a callback fired for an earlier object
            // may have torn this entry down in the meantime.
            let snapshot = {
                let mut objects = self.objects.lock().expect("object directory lock poisoned");
                let Some(entry) = objects.get_mut(&object_id) else {
                    continue;
                };
                merge::apply_location_updates(&[], entry, &self.nodes);
                entry.snapshot(object_id)
            };
            self.notify(&snapshot);
        }
    }

    /// Invoke every callback registered for the snapshot's object.
    ///
    /// Fan-out iterates a sorted snapshot of the subscriber ids taken
    /// before the first invocation, and re-checks each id right before
    /// invoking it — a callback may subscribe or unsubscribe anyone,
    /// itself included, without tripping over invalidated entries.
    fn notify(&self, snapshot: &LocationSnapshot) {
        let mut subscribers: Vec<SubscriberId> = {
            let objects = self.objects.lock().expect("object directory lock poisoned");
            match objects.get(&snapshot.object_id) {
                Some(entry) => entry.callbacks.keys().copied().collect(),
                None => return,
            }
        };
        subscribers.sort_unstable();

        for subscriber in subscribers {
            let callback = {
                let objects = self.objects.lock().expect("object directory lock poisoned");
                objects
                    .get(&snapshot.object_id)
                    .and_then(|entry| entry.callbacks.get(&subscriber))
                    .cloned()
            };
            if let Some(callback) = callback {
                callback(snapshot);
            }
        }
    }
}

impl fmt::Debug for ObjectDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDirectory")
            .field("object_count", &self.object_count())
            .finish_non_exhaustive()
    }
}
