//! Error types for the form toolkit.
//!
//! One enum covers both the document engine (parsing, cross-reference
//! handling, serialization) and the form operations built on top of it.
//! [`Error::severity`] separates failures that end the work on a whole
//! document from anomalies that only cost a single field.

use crate::object::ObjectRef;

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How far an error reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Only the current field is skipped; the document is still processed.
    Field,
    /// Processing of the document (or the merge call) stops.
    Document,
}

/// Error types that can occur while reading, validating, scraping,
/// merging or writing documents.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Unsupported PDF version
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// The document has no resolvable catalog
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// An indirect reference has no entry in the document's table
    #[error("Failed to dereference {0}")]
    DereferenceFailed(ObjectRef),

    /// A field reference points at nothing
    #[error("Dangling field reference {0}")]
    DanglingReference(ObjectRef),

    /// A field dictionary has no /T entry
    #[error("Field {0} has no name (/T)")]
    MissingFieldName(ObjectRef),

    /// A field reference resolved to something other than a dictionary
    #[error("Field {reference} is not a dictionary (found {found})")]
    NotADictionary {
        /// The field reference
        reference: ObjectRef,
        /// Type name of the resolved object
        found: String,
    },

    /// A `/Fields` element is not an indirect reference
    #[error("Field entry {index} is {found}, not a reference")]
    NotAReference {
        /// Position in the `/Fields` array
        index: usize,
        /// Type name of the element
        found: String,
    },

    /// The input failed structural validation
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// A handle issued by one document was used against another
    #[error("Reference {reference} belongs to document #{owner}, not document #{used_with}")]
    ForeignReference {
        /// The object reference carried by the handle
        reference: ObjectRef,
        /// Document that issued the handle
        owner: u64,
        /// Document the handle was resolved against
        used_with: u64,
    },

    /// Absorbing a document would overwrite existing objects
    #[error("Object number collision on {0}")]
    ObjectNumberCollision(ObjectRef),

    /// Field values supplied for filling could not be used
    #[error("Invalid fill context: {0}")]
    InvalidContext(String),

    /// The operation was cancelled before it started on this input
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Classify this error as field-level or document-level.
    pub fn severity(&self) -> Severity {
        match self {
            Error::DanglingReference(_)
            | Error::MissingFieldName(_)
            | Error::NotADictionary { .. }
            | Error::NotAReference { .. } => Severity::Field,
            _ => Severity::Document,
        }
    }

    /// Build an [`Error::InvalidObjectType`] from a type name.
    pub(crate) fn wrong_type(expected: &str, found: &str) -> Self {
        Error::InvalidObjectType {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
