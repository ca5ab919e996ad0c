//! Mock engine errors.
//!
//! Every error aborts the batch; the caller's document is untouched
//! because handlers run against a clone that is committed only on full
//! success, matching the real API's atomicity.

use extrasuite_docs_types::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MockError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    #[error("{kind}: {reason}")]
    InvalidRequest { kind: &'static str, reason: String },

    #[error("unknown tab {0:?}")]
    UnknownTab(String),

    #[error("unknown segment {0:?}")]
    UnknownSegment(String),

    #[error("index {index} out of bounds for {segment} (segment ends at {end})")]
    IndexOutOfBounds {
        segment: String,
        index: usize,
        end: usize,
    },

    #[error("index {index} splits a surrogate pair")]
    SurrogateSplit { index: usize },

    /// A request left the document violating a structural invariant.
    /// This is an internal bug in a handler, not a caller mistake.
    #[error("invariant violated after {kind}: {source}")]
    InvariantViolated {
        kind: &'static str,
        source: ModelError,
    },
}

impl MockError {
    pub fn invalid(kind: &'static str, reason: impl Into<String>) -> MockError {
        MockError::InvalidRequest {
            kind,
            reason: reason.into(),
        }
    }
}
