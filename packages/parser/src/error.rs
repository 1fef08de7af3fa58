//! Error types for the parser.
//!
//! Uses the dual-error pattern: `ParserError` for library consumers with
//! detailed per-record context, and `SanitizeError` for the recoverable
//! per-category failures raised while cleaning annotations.

use thiserror::Error;

/// Main error type for the parser library.
#[derive(Debug, Error)]
pub enum ParserError {
    /// A raw input line could not be decoded into a record.
    #[error("Failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A structural invariant of the document model was violated.
    ///
    /// This signals a defect in the transformation rather than malformed
    /// input, and is reported separately from ordinary decode failures.
    #[error("Invariant violation in record {corpusid}: {message}")]
    InvariantViolation { corpusid: i64, message: String },

    /// The embedded document schema could not be compiled.
    #[error("Schema load error: {0}")]
    SchemaLoad(String),

    /// A built document did not match the document schema.
    #[error("Schema validation failed: {}", errors.join(", "))]
    SchemaValidation { errors: Vec<String> },

    /// A raw input line is not valid UTF-8.
    #[error("Record is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Building a record panicked; the panic was contained to that record.
    #[error("Record processing panicked: {0}")]
    Panicked(String),

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Failure of a single sanitization step for one annotation category.
///
/// These never abort a record: the category falls back to the best result
/// available before the failing step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// The encoded annotation list is not a valid JSON list of annotations.
    #[error("encoded annotations are not a valid annotation list: {0}")]
    Decode(String),

    /// The collection is neither a list nor an encoded list.
    #[error("annotations are {0}, not a list")]
    NotAList(&'static str),

    /// Some list entries are not annotation objects.
    #[error("{dropped} list entries are not annotation objects: {first}")]
    Entries { dropped: usize, first: String },

    /// Some annotations carried offsets that are not integers.
    #[error("{dropped} annotation(s) had non-integer offsets: {first}")]
    Offsets { dropped: usize, first: String },
}
