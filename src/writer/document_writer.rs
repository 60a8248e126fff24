//! Full rewrite of a [`Document`] to bytes.
//!
//! Every object is written once, in object-number order, followed by a
//! single classic cross-reference table and trailer. No incremental
//! update is produced; the output replaces the input entirely.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.5 - File Structure

use super::object_serializer::ObjectSerializer;
use crate::config::PdfConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Serializes a whole document.
pub struct DocumentWriter<'a> {
    doc: &'a Document,
    serializer: ObjectSerializer,
}

impl<'a> DocumentWriter<'a> {
    /// Create a writer with one dictionary entry per line.
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            serializer: ObjectSerializer::new(),
        }
    }

    /// Create a writer honouring `config.compact_output`.
    pub fn with_config(doc: &'a Document, config: &PdfConfig) -> Self {
        let serializer = if config.compact_output {
            ObjectSerializer::compact()
        } else {
            ObjectSerializer::new()
        };
        Self { doc, serializer }
    }

    /// Produce the complete file.
    ///
    /// Fails with [`Error::CatalogUnavailable`] when the trailer has no
    /// `/Root`, since the output would not be readable.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.doc.root()?;

        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", self.doc.version())?;
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        // Only the newest generation of each object number is kept.
        let mut latest: BTreeMap<u32, (ObjectRef, &Object)> = BTreeMap::new();
        for (reference, object) in self.doc.objects() {
            latest.insert(reference.id, (reference, object));
        }

        let mut offsets: BTreeMap<u32, (usize, u16)> = BTreeMap::new();
        for (id, (reference, object)) in &latest {
            offsets.insert(*id, (output.len(), reference.gen));
            output.extend_from_slice(&self.serializer.serialize_indirect(*reference, object));
        }

        let size = latest.keys().next_back().map_or(1, |max| max + 1);
        let free: Vec<u32> = (1..size).filter(|id| !offsets.contains_key(id)).collect();

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", size)?;
        // Free entries form a linked list through their offset fields.
        let mut next_free = free.iter().copied();
        writeln!(output, "{:010} 65535 f ", next_free.next().unwrap_or(0))?;
        for id in 1..size {
            match offsets.get(&id) {
                Some((offset, gen)) => writeln!(output, "{:010} {:05} n ", offset, gen)?,
                None => writeln!(output, "{:010} 00000 f ", next_free.next().unwrap_or(0))?,
            }
        }

        let mut trailer = self.doc.trailer().clone();
        for key in ["Prev", "XRefStm", "Encrypt"] {
            trailer.remove(key);
        }
        trailer.insert("Size", Object::Integer(i64::from(size)));

        writeln!(output, "trailer")?;
        output.extend_from_slice(&self.serializer.serialize(&Object::Dictionary(trailer)));
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        log::debug!(
            "Serialized document {} ({} objects, {} bytes)",
            self.doc.id(),
            latest.len(),
            output.len()
        );
        Ok(output)
    }

    /// Write the file to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Write `doc` as `dir/file_name` and return the full path.
///
/// `file_name` must be a single plain path component. The directory is
/// created when missing.
pub fn write_document(doc: &Document, dir: impl AsRef<Path>, file_name: &str) -> Result<PathBuf> {
    write_document_with_config(doc, dir, file_name, &PdfConfig::default())
}

/// [`write_document`] with explicit output settings.
pub fn write_document_with_config(
    doc: &Document,
    dir: impl AsRef<Path>,
    file_name: &str,
    config: &PdfConfig,
) -> Result<PathBuf> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {},
        _ => {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("output name '{}' is not a plain file name", file_name),
            )))
        },
    }

    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    DocumentWriter::with_config(doc, config).save(&path)?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}
