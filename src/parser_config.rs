//! Parser options controlling how forgiving document loading is.
//!
//! # Example
//!
//! ```
//! use pdf_formkit::parser_config::ParserOptions;
//!
//! // Reject damaged cross-reference data and malformed streams
//! let strict = ParserOptions::strict();
//! assert!(!strict.reconstruct_xref);
//!
//! // Recover what can be recovered (default)
//! let lenient = ParserOptions::default();
//! assert!(lenient.reconstruct_xref);
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;

/// Options for [`crate::document::Document::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Fail on the first malformed object instead of skipping it.
    pub strict: bool,

    /// Maximum object nesting depth for arrays and dictionaries.
    ///
    /// PDF Spec: ISO 32000-1:2008, Section H.1 - Implementation Limits
    pub max_nesting: usize,

    /// Maximum length of a `/Prev` chain in the cross-reference section.
    pub max_recursion_depth: u32,

    /// Maximum input size in bytes (0 = unlimited).
    pub max_file_size: usize,

    /// Maximum decompressed stream size in bytes (0 = unlimited).
    pub max_decompressed_size: usize,

    /// Maximum decompressed:compressed ratio (0 = unlimited).
    pub max_decompression_ratio: u32,

    /// Accept streams whose `/Length` is missing or wrong by scanning for `endstream`.
    pub allow_malformed_streams: bool,

    /// Rebuild the cross-reference table by scanning for `N G obj` when it is unusable.
    pub reconstruct_xref: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: any structural damage is an error.
    pub fn strict() -> Self {
        Self {
            strict: true,
            max_nesting: 100,
            max_recursion_depth: 100,
            max_file_size: 500 * 1024 * 1024,
            max_decompressed_size: 100 * 1024 * 1024,
            max_decompression_ratio: 100,
            allow_malformed_streams: false,
            reconstruct_xref: false,
        }
    }

    /// Lenient mode: skip malformed objects and repair broken xref data.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            allow_malformed_streams: true,
            reconstruct_xref: true,
            ..Self::strict()
        }
    }

    /// Reject inputs larger than `max_file_size`.
    pub fn check_file_size(&self, len: usize) -> Result<()> {
        if self.max_file_size > 0 && len > self.max_file_size {
            return Err(Error::InvalidPdf(format!(
                "file size {} exceeds limit of {} bytes",
                len, self.max_file_size
            )));
        }
        Ok(())
    }
}
