//! Configuration for reading, validating and writing documents.

use crate::parser_config::ParserOptions;
use serde::Deserialize;
use std::path::Path;

/// How hard [`crate::validation::validate`] looks at a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Catalog shape, object loading and AcroForm shape are errors.
    Strict,
    /// Only header, trailer and root problems are errors; the rest are warnings.
    #[default]
    Relaxed,
}

/// Document processing configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Options passed to the parser.
    pub parser: ParserOptions,

    /// Validation strictness for inputs.
    pub validation: ValidationMode,

    /// Write output without line breaks between dictionary entries.
    pub compact_output: bool,
}

impl PdfConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Set the parser options.
    pub fn with_parser(mut self, parser: ParserOptions) -> Self {
        self.parser = parser;
        self
    }

    /// Set the validation mode.
    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Enable compact output.
    pub fn with_compact_output(mut self, enable: bool) -> Self {
        self.compact_output = enable;
        self
    }
}
