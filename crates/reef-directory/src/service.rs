//! Directory service: single event-loop host for the [`ObjectDirectory`].
//!
//! All directory mutations happen on one tokio task that drains a command
//! mailbox, so control-plane notifications, node removals, and
//! subscription changes apply strictly in delivery order — the directory
//! itself never locks and never blocks.
//!
//! [`DirectoryHandle`] is the public surface: the control-plane client
//! posts node and location events, consumers manage subscriptions and look
//! up tracked objects, and the data plane resolves peers through the
//! shared [`ClusterView`].

use std::sync::Arc;

use reef_cluster::ClusterView;
use reef_types::{LocationUpdate, NodeId, NodeInfo, ObjectId, SubscriberId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

use crate::directory::{LocationCallback, LocationSnapshot, ObjectDirectory};
use crate::error::DirectoryError;

/// Commands drained by the service loop, in delivery order.
enum Command {
    LocationEvents {
        object_id: ObjectId,
        updates: Vec<LocationUpdate>,
    },
    NodeAdded(NodeInfo),
    NodeRemoved(NodeId),
    Subscribe {
        object_id: ObjectId,
        subscriber: SubscriberId,
        callback: LocationCallback,
    },
    Unsubscribe {
        object_id: ObjectId,
        subscriber: SubscriberId,
    },
    Lookup {
        object_id: ObjectId,
        reply: oneshot::Sender<Option<LocationSnapshot>>,
    },
}

/// Handle to a running directory service.
///
/// Methods post commands to the service loop and fail with
/// [`DirectoryError::ServiceStopped`] once the loop has exited. Share the
/// handle across components via `Arc`.
pub struct DirectoryHandle {
    tx: mpsc::UnboundedSender<Command>,
    nodes: Arc<ClusterView>,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl DirectoryHandle {
    /// Deliver a per-object batch from the control plane.
    pub fn deliver_location_events(
        &self,
        object_id: ObjectId,
        updates: Vec<LocationUpdate>,
    ) -> Result<(), DirectoryError> {
        self.send(Command::LocationEvents { object_id, updates })
    }

    /// Deliver a node announcement from the control plane.
    pub fn deliver_node_added(&self, info: NodeInfo) -> Result<(), DirectoryError> {
        self.send(Command::NodeAdded(info))
    }

    /// Deliver an updated announcement for an already-known node.
    pub fn deliver_node_updated(&self, info: NodeInfo) -> Result<(), DirectoryError> {
        self.send(Command::NodeAdded(info))
    }

    /// Deliver a node-removal notification from the control plane.
    pub fn deliver_node_removed(&self, node_id: NodeId) -> Result<(), DirectoryError> {
        self.send(Command::NodeRemoved(node_id))
    }

    /// Register a callback for changes to an object's locations.
    pub fn add_subscriber(
        &self,
        object_id: ObjectId,
        subscriber: SubscriberId,
        callback: LocationCallback,
    ) -> Result<(), DirectoryError> {
        self.send(Command::Subscribe {
            object_id,
            subscriber,
            callback,
        })
    }

    /// Remove a subscriber's callback for an object.
    pub fn remove_subscriber(
        &self,
        object_id: ObjectId,
        subscriber: SubscriberId,
    ) -> Result<(), DirectoryError> {
        self.send(Command::Unsubscribe {
            object_id,
            subscriber,
        })
    }

    /// One-shot read of a tracked object's current state.
    ///
    /// Resolves after every previously delivered command has been applied.
    pub async fn lookup(
        &self,
        object_id: ObjectId,
    ) -> Result<Option<LocationSnapshot>, DirectoryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Lookup { object_id, reply })?;
        rx.await.map_err(|_| DirectoryError::ServiceStopped)
    }

    /// Return the shared cluster view (the resolver's read path).
    pub fn nodes(&self) -> &Arc<ClusterView> {
        &self.nodes
    }

    /// Ask the service loop to stop after the current command.
    pub fn shutdown(&self) {
        info!("directory service shutdown requested");
        let _ = self.shutdown_tx.send(true);
    }

    /// Abort the background task.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Whether the background task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    fn send(&self, command: Command) -> Result<(), DirectoryError> {
        if self.task.is_finished() {
            return Err(DirectoryError::ServiceStopped);
        }
        self.tx
            .send(command)
            .map_err(|_| DirectoryError::ServiceStopped)
    }
}

/// Start the directory service and return a handle.
///
/// Spawns one background task owning the [`ObjectDirectory`]; the loop
/// runs until [`DirectoryHandle::shutdown`] is called or the handle is
/// dropped.
pub fn start(nodes: Arc<ClusterView>) -> DirectoryHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let directory = ObjectDirectory::new(nodes.clone());

    let task = tokio::spawn(async move {
        info!("object directory service started");

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => handle_command(&directory, command),
                    None => break,
                },
                _ = shutdown_rx.changed() => break,
            }
        }

        info!("object directory service stopped");
    });

    DirectoryHandle {
        tx,
        nodes,
        shutdown_tx,
        task,
    }
}

/// Apply a single command to the directory.
fn handle_command(directory: &ObjectDirectory, command: Command) {
    match command {
        Command::LocationEvents { object_id, updates } => {
            directory.apply_location_update(object_id, &updates);
        }
        Command::NodeAdded(info) => {
            directory.nodes().upsert_node(info);
        }
        Command::NodeRemoved(node_id) => {
            // Mark the removal first so the merge sweep sees it, then
            // correct every object that still lists the node.
            directory.nodes().mark_removed(node_id);
            directory.handle_node_removed(node_id);
        }
        Command::Subscribe {
            object_id,
            subscriber,
            callback,
        } => {
            directory.subscribe(object_id, subscriber, callback);
        }
        Command::Unsubscribe {
            object_id,
            subscriber,
        } => {
            directory.unsubscribe(object_id, subscriber);
        }
        Command::Lookup { object_id, reply } => {
            let _ = reply.send(directory.lookup(object_id));
        }
    }
}
