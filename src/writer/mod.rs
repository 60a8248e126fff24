//! PDF writing.
//!
//! ```text
//! Document
//!     ↓
//! [DocumentWriter] (header, body, xref table, trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```

mod document_writer;
mod object_serializer;

pub use document_writer::{write_document, write_document_with_config, DocumentWriter};
pub use object_serializer::ObjectSerializer;
