//! Reconciler errors.
//!
//! The reconciler either produces a complete script or fails with one
//! of these; it never emits a partial script.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The difference cannot be expressed in the API's request
    /// vocabulary. The message names the unsupported change precisely.
    #[error("cannot reconcile: {0}")]
    Unreconcilable(String),

    /// The post-emission self-check found index drift, overlap, or an
    /// out-of-bounds reference. This is an internal bug; the payload
    /// carries the full script dump for debugging.
    #[error("index self-check failed: {message}")]
    IndexCheck { message: String, script: String },
}

impl ReconcileError {
    pub fn unsupported(what: impl Into<String>) -> ReconcileError {
        ReconcileError::Unreconcilable(what.into())
    }
}
