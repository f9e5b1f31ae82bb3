//! In-memory object location directory for the Reef object store.
//!
//! The directory tracks, for every content-addressed object, the set of
//! nodes currently believed to hold a replica, plus at most one
//! spilled-to-external-storage location. It reconciles the control plane's
//! incremental add/remove stream, keeps its view consistent when a node is
//! declared dead (even if that node's removal stream is delayed, reordered,
//! or absent), and fans out to per-object subscriber callbacks
//! synchronously after every observed change.
//!
//! This crate provides:
//!
//! - [`ObjectDirectory`] — per-object replica state with subscriber fan-out.
//! - [`ConnectionResolver`] — reachable-peer lookup for the data plane.
//! - [`service`] — the single event-loop host realizing the control-plane
//!   delivery surface.
//!
//! The directory is pure in-memory and is rebuilt from the control plane
//! on restart; it is not a source of truth for object existence.

mod directory;
mod error;
mod merge;
mod resolver;
pub mod service;


pub use directory::{LocationCallback, LocationSnapshot, ObjectDirectory, SpillLocation};
pub use error::DirectoryError;
pub use resolver::{ConnectionResolver, RemoteConnectionInfo};
pub use service::DirectoryHandle;
