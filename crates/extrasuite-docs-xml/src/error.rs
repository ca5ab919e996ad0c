//! Errors for the XML tab-folder layer.
//!
//! All of these are fatal for a push: the tool surfaces the file name
//! and location and the document is never partially applied.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, XmlError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("{file}:{line}: malformed XML: {message}")]
    XmlMalformed {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: literal newline inside <{element}>; newlines are only allowed between container children")]
    ContentNewline {
        file: String,
        line: usize,
        element: String,
    },

    #[error("{file}:{line}: {message}")]
    TableShape {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}: {element} count changed from {pristine} to {desired}; the API cannot add or remove them")]
    ImmutableElementCountChanged {
        file: String,
        element: String,
        pristine: usize,
        desired: usize,
    },

    #[error("{file}:{line}: unknown style class {class:?}")]
    UnresolvedClass {
        file: String,
        line: usize,
        class: String,
    },

    #[error("{file}:{line}: unexpected element <{element}>")]
    UnexpectedElement {
        file: String,
        line: usize,
        element: String,
    },

    #[error("{file}:{line}: bad attribute {attribute}: {message}")]
    BadAttribute {
        file: String,
        line: usize,
        attribute: String,
        message: String,
    },

    #[error("{file}: missing required file")]
    MissingFile { file: String },

    #[error("{file}: invalid sidecar JSON: {message}")]
    BadSidecar { file: String, message: String },
}
