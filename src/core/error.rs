//! Error types for GenIAL
//!
//! Defines the error taxonomy shared by the parsers, the annotation model
//! and the output writers.

use crate::formats::attributes::AttributeParseError;
use thiserror::Error;

/// Main error type for GenIAL operations
#[derive(Debug, Error)]
pub enum GenialError {
    /// A data line does not have the expected column layout
    #[error("Malformed line {line}: {message}")]
    MalformedLine { line: usize, message: String },

    /// Requested or detected format is not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An attribute token does not match its format's key/value pattern
    #[error("Attribute parse error at line {line}: {source}")]
    AttributeParse {
        line: usize,
        #[source]
        source: AttributeParseError,
    },

    /// Strand must be '+' or '-'
    #[error("Invalid strand value: '{0}'")]
    InvalidStrand(String),

    /// A parent/gene reference could not be resolved
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// Block coordinates violate the annotation invariants
    #[error("Invalid blocks: {0}")]
    InvalidBlocks(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenialError {
    /// Create a malformed line error
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        GenialError::MalformedLine {
            line,
            message: message.into(),
        }
    }

    /// Check if this error is a closed output pipe
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, GenialError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

/// Result type alias for GenIAL operations
pub type Result<T> = std::result::Result<T, GenialError>;
