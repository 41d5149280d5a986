//! Error types for BIBFRAME-to-MARC conversion and record diffing.
//!
//! This module provides the [`BibmuxError`] type for all library operations
//! and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all bibmux operations.
///
/// Conversion link failures ([`NotFound`](BibmuxError::NotFound),
/// [`TypeMismatch`](BibmuxError::TypeMismatch),
/// [`MissingRequiredLink`](BibmuxError::MissingRequiredLink)) are deliberately
/// distinct variants: callers decide per kind whether a bad record aborts the
/// run or is skipped.
#[derive(Error, Debug)]
pub enum BibmuxError {
    /// A referenced object id does not exist in the graph.
    #[error("no object with id {id} in graph")]
    NotFound {
        /// The id that failed to resolve.
        id: String,
    },

    /// A referenced object id resolved, but to an object of the wrong type.
    #[error("object {id} has type {found:?}, expected {expected}")]
    TypeMismatch {
        /// The id that resolved to the wrong object.
        id: String,
        /// The type the reference required.
        expected: String,
        /// The types actually present on the resolved object.
        found: Vec<String>,
    },

    /// A mapping candidate lacks its mandatory cross-reference property.
    #[error("object {id} has no {property} link")]
    MissingRequiredLink {
        /// Id of the candidate missing the link.
        id: String,
        /// Name of the absent link property.
        property: String,
    },

    /// A field tag could not be normalized to a numeric key.
    #[error("malformed field tag: {0:?}")]
    MalformedTag(String),

    /// A record source held no records at all.
    #[error("no records found in {0}")]
    NoRecords(String),

    /// The input graph does not have the expected framed/compacted shape.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Error during parsing of MARCXML data.
    #[error("parse error: {0}")]
    ParseError(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`BibmuxError`].
pub type Result<T> = std::result::Result<T, BibmuxError>;
