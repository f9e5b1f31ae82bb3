//! Error types for the directory crate.

/// Errors produced by the object directory service.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The directory service loop has stopped; deliveries are no longer
    /// accepted.
    #[error("directory service stopped")]
    ServiceStopped,
}
