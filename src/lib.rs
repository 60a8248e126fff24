// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::match_like_matches_macro)]

//! # pdf_formkit
//!
//! AcroForm field scraping, filling and form merging over parsed PDF
//! object graphs.
//!
//! ## Features
//!
//! - **Scraping**: list the fields of a document's interactive form in
//!   `/Fields` order, optionally stamping a value into every field
//! - **Merging**: fold one document's AcroForm into another's, combining
//!   `NeedAppearances`, `SigFlags`, `CO`, `DR`, `DA` and `Q` and dropping `XFA`
//! - **Combining**: merge any number of documents into one, moving the
//!   referenced field objects along
//! - **Filling**: set field values by name
//! - **Engine**: a small reader (classic and stream cross-references,
//!   object streams, damaged-file reconstruction), structural validation
//!   and a full-rewrite writer
//!
//! Object references are only meaningful inside the document that issued
//! them; every [`Document`] carries a process-unique id and the crate hands
//! out [`document::Handle`]s that fail loudly when used with another document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_formkit::config::PdfConfig;
//! use pdf_formkit::forms::{combine_forms, scrape_fields};
//! use pdf_formkit::validation::validate_and_parse;
//! use pdf_formkit::writer::write_document;
//!
//! # fn main() -> pdf_formkit::Result<()> {
//! let config = PdfConfig::default();
//! let (mut dest, _) = validate_and_parse(&std::fs::read("a.pdf")?, &config)?;
//! let (source, _) = validate_and_parse(&std::fs::read("b.pdf")?, &config)?;
//!
//! combine_forms(&mut dest, vec![source])?;
//! println!("{:?}", scrape_fields(&dest)?.names());
//! write_document(&dest, "out", "combined.pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
/// Parser configuration options
pub mod parser_config;
pub mod xref;
pub mod xref_reconstruction;

// Stream decoders
pub mod decoders;

// Configuration
pub mod config;

// Validation
pub mod validation;

// Writing
pub mod writer;

// Interactive forms
pub mod forms;

pub use document::{Document, DocumentId, Handle};
pub use error::{Error, Result, Severity};
pub use object::{Dictionary, Object, ObjectRef};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // VERSION is populated from CARGO_PKG_VERSION at compile time
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_formkit");
    }
}
