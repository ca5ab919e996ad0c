//! Model-level errors: violations of the structural invariants that
//! must hold after any mutation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("segment {segment}: segment must end in a paragraph")]
    SegmentMustEndInParagraph { segment: String },

    #[error("segment {segment}: paragraph at index {index} must end in a newline run")]
    ParagraphMustEndInNewline { segment: String, index: usize },

    #[error("segment {segment}: text run at index {index} contains an interior newline")]
    InteriorNewline { segment: String, index: usize },

    #[error("segment {segment}: expected element at index {expected}, found {found}")]
    NonContiguousIndex {
        segment: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "segment {segment}: run at index {index} spans {span} units but contains {actual}"
    )]
    RunLengthMismatch {
        segment: String,
        index: usize,
        span: usize,
        actual: usize,
    },

    #[error("segment {segment}: table cell at index {index} must end in a paragraph")]
    CellMustEndInParagraph { segment: String, index: usize },

    #[error("segment {segment}: table at index {index} has ragged rows")]
    RaggedTable { segment: String, index: usize },
}
