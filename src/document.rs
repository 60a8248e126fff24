//! In-memory PDF documents.
//!
//! A [`Document`] owns every indirect object of one file in an arena keyed
//! by [`ObjectRef`], together with the trailer and header version. Object
//! references are only meaningful against the table they came from, so
//! each document gets a process-unique [`DocumentId`] and the crate hands
//! out [`Handle`]s that carry it. Resolving a handle against the wrong
//! document is an error, never a silent lookup in the wrong table.
//!
//! Loading reads the whole file into memory, walks the cross-reference
//! sections, parses every in-use object and unpacks object streams.
//! Cross-reference streams and object streams themselves are dropped
//! afterwards: their contents now live in the arena and the writer emits
//! a classic table.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::objstm::ObjectStream;
use crate::parser::parse_indirect_object;
use crate::parser_config::ParserOptions;
use crate::xref::{load_xref, CrossRefTable, XRefEntry};
use crate::xref_reconstruction::reconstruct_xref;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for diagnostics.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An object reference bound to the document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Handle {
    doc: DocumentId,
    obj: ObjectRef,
}

impl Handle {
    /// Document that issued this handle.
    pub fn document(&self) -> DocumentId {
        self.doc
    }

    /// The underlying object reference.
    pub fn reference(&self) -> ObjectRef {
        self.obj
    }
}

/// A parsed PDF object graph.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    version: String,
    objects: BTreeMap<ObjectRef, Object>,
    trailer: Dictionary,
    load_issues: Vec<String>,
}

impl Clone for Document {
    /// Clones get a fresh identity; handles from the original do not resolve against them.
    fn clone(&self) -> Self {
        Self {
            id: DocumentId::next(),
            version: self.version.clone(),
            objects: self.objects.clone(),
            trailer: self.trailer.clone(),
            load_issues: self.load_issues.clone(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            id: DocumentId::next(),
            version: "1.7".to_string(),
            objects: BTreeMap::new(),
            trailer: Dictionary::new(),
            load_issues: Vec::new(),
        }
    }

    /// Read and parse a file.
    ///
    /// ```no_run
    /// use pdf_formkit::document::Document;
    /// use pdf_formkit::parser_config::ParserOptions;
    ///
    /// let doc = Document::open("form.pdf", &ParserOptions::default())?;
    /// println!("{} objects", doc.object_count());
    /// # Ok::<(), pdf_formkit::error::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>, options: &ParserOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data, options)
    }

    /// Parse a complete file held in memory.
    pub fn parse(data: &[u8], options: &ParserOptions) -> Result<Self> {
        options.check_file_size(data.len())?;
        let (major, minor) = parse_header(data, options)?;

        let mut reconstructed = false;
        let table = match load_xref(data, options) {
            Ok(table) => table,
            Err(e) if options.reconstruct_xref => {
                log::warn!("Cross-reference data unusable ({}), scanning file instead", e);
                reconstructed = true;
                reconstruct_xref(data, options)?
            },
            Err(e) => return Err(e),
        };

        if table.trailer().contains_key("Encrypt") {
            return Err(Error::Unsupported("encrypted documents".to_string()));
        }

        let mut loader = Loader {
            data,
            options,
            table,
            fallback: None,
            issues: Vec::new(),
        };
        if reconstructed {
            loader.fallback = Some(loader.table.clone());
        }

        let objects = loader.load_all()?;
        let mut trailer = loader.table.into_trailer();
        for key in ["Prev", "XRefStm"] {
            trailer.remove(key);
        }

        log::debug!(
            "Loaded PDF {}.{} with {} objects ({} load issues)",
            major,
            minor,
            objects.len(),
            loader.issues.len()
        );

        Ok(Self {
            id: DocumentId::next(),
            version: format!("{}.{}", major, minor),
            objects,
            trailer,
            load_issues: loader.issues,
        })
    }

    /// This document's identity.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Header version, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Set the header version written on output.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// The trailer dictionary, mutably.
    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    /// Objects that were listed in the cross-reference data but could not be loaded.
    pub fn load_issues(&self) -> &[String] {
        &self.load_issues
    }

    /// Iterate objects in object-number order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectRef, &Object)> + '_ {
        self.objects.iter().map(|(&r, obj)| (r, obj))
    }

    /// Number of indirect objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Highest object number in use (0 for an empty document).
    pub fn max_object_number(&self) -> u32 {
        self.objects.keys().next_back().map(|r| r.id).unwrap_or(0)
    }

    /// Store an object under the next free object number.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectRef {
        let reference = ObjectRef::new(self.max_object_number() + 1, 0);
        self.objects.insert(reference, object.into());
        reference
    }

    /// Store an object under an explicit reference, returning what was there.
    pub fn insert_object(&mut self, reference: ObjectRef, object: impl Into<Object>) -> Option<Object> {
        self.objects.insert(reference, object.into())
    }

    /// Point the trailer's `/Root` at a catalog object.
    pub fn set_root(&mut self, catalog: ObjectRef) {
        self.trailer.insert("Root", Object::Reference(catalog));
    }

    /// Table entry for an indirect reference.
    pub fn find_entry(&self, reference: ObjectRef) -> Option<&Object> {
        self.objects.get(&reference)
    }

    /// Table entry for an indirect reference, mutably.
    pub fn find_entry_mut(&mut self, reference: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(&reference)
    }

    /// Follow one level of indirection.
    ///
    /// Concrete objects are returned unchanged; a reference is replaced by
    /// its table entry, or fails with [`Error::DereferenceFailed`] when the
    /// table has none.
    pub fn dereference<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        match object {
            Object::Reference(r) => self.find_entry(*r).ok_or(Error::DereferenceFailed(*r)),
            other => Ok(other),
        }
    }

    /// Bind a reference to this document.
    pub fn handle(&self, reference: ObjectRef) -> Handle {
        Handle {
            doc: self.id,
            obj: reference,
        }
    }

    /// Check that `handle` was issued by this document.
    pub fn check_handle(&self, handle: Handle) -> Result<ObjectRef> {
        if handle.doc != self.id {
            return Err(Error::ForeignReference {
                reference: handle.obj,
                owner: handle.doc.0,
                used_with: self.id.0,
            });
        }
        Ok(handle.obj)
    }

    /// Look up the object behind a handle.
    pub fn resolve(&self, handle: Handle) -> Result<&Object> {
        let reference = self.check_handle(handle)?;
        self.find_entry(reference).ok_or(Error::DereferenceFailed(reference))
    }

    /// Look up the object behind a handle, mutably.
    pub fn resolve_mut(&mut self, handle: Handle) -> Result<&mut Object> {
        let reference = self.check_handle(handle)?;
        self.find_entry_mut(reference).ok_or(Error::DereferenceFailed(reference))
    }

    /// Reference to the catalog named by the trailer's `/Root`.
    pub fn root(&self) -> Result<ObjectRef> {
        match self.trailer.get("Root") {
            Some(Object::Reference(r)) => Ok(*r),
            Some(other) => Err(Error::CatalogUnavailable(format!(
                "trailer /Root is {}, not a reference",
                other.type_name()
            ))),
            None => Err(Error::CatalogUnavailable("trailer has no /Root".to_string())),
        }
    }

    /// The document catalog.
    ///
    /// PDF Spec: ISO 32000-1:2008, Section 7.7.2 - Document Catalog
    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self.root()?;
        match self.find_entry(root) {
            Some(Object::Dictionary(dict)) => Ok(dict),
            Some(other) => Err(Error::CatalogUnavailable(format!(
                "{} is {}, not a dictionary",
                root,
                other.type_name()
            ))),
            None => Err(Error::CatalogUnavailable(format!("{} is not in the object table", root))),
        }
    }

    /// The document catalog, mutably.
    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        let root = self.root()?;
        match self.objects.get_mut(&root) {
            Some(Object::Dictionary(dict)) => Ok(dict),
            Some(other) => Err(Error::CatalogUnavailable(format!(
                "{} is {}, not a dictionary",
                root,
                other.type_name()
            ))),
            None => Err(Error::CatalogUnavailable(format!("{} is not in the object table", root))),
        }
    }

    /// Shift every object number by `offset`, rewriting all references.
    ///
    /// The document gets a new identity, so handles issued before the shift
    /// no longer resolve against it.
    pub fn renumber(&mut self, offset: u32) -> Result<()> {
        if offset == 0 {
            return Ok(());
        }
        if self.max_object_number().checked_add(offset).is_none() {
            return Err(Error::InvalidPdf(format!(
                "renumbering by {} overflows object numbers",
                offset
            )));
        }

        let mut shift = |r: &mut ObjectRef| r.id = r.id.saturating_add(offset);
        let objects = std::mem::take(&mut self.objects);
        self.objects = objects
            .into_iter()
            .map(|(mut reference, mut object)| {
                shift(&mut reference);
                object.for_each_reference_mut(&mut shift);
                (reference, object)
            })
            .collect();
        for (_, value) in self.trailer.iter_mut() {
            value.for_each_reference_mut(&mut shift);
        }

        self.id = DocumentId::next();
        log::debug!("Renumbered document by {} (now {})", offset, self.id);
        Ok(())
    }

    /// Move every object of `other` into this document's table.
    ///
    /// Nothing is moved if any object number is already taken here.
    /// `other`'s trailer is discarded.
    pub fn absorb(&mut self, other: Document) -> Result<()> {
        if let Some(collision) = other.objects.keys().find(|r| self.objects.contains_key(r)) {
            return Err(Error::ObjectNumberCollision(*collision));
        }
        log::debug!("Absorbing {} objects from document {}", other.objects.len(), other.id);
        self.objects.extend(other.objects);
        Ok(())
    }
}

/// Parse the `%PDF-M.m` header.
///
/// Strict mode requires the header at byte 0; lenient mode accepts junk
/// before it within the first kilobyte.
///
/// ```
/// use pdf_formkit::document::parse_header;
/// use pdf_formkit::parser_config::ParserOptions;
///
/// assert_eq!(parse_header(b"%PDF-1.7\n", &ParserOptions::strict()).unwrap(), (1, 7));
/// ```
pub fn parse_header(data: &[u8], options: &ParserOptions) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(1024)];
    let start = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| {
            Error::InvalidHeader(String::from_utf8_lossy(&data[..data.len().min(8)]).into_owned())
        })?;

    if start > 0 {
        if options.strict {
            return Err(Error::InvalidHeader(
                String::from_utf8_lossy(&data[..start.min(8)]).into_owned(),
            ));
        }
        log::warn!("{} bytes of junk before the PDF header", start);
    }

    let version = &data[start + 5..data.len().min(start + 8)];
    match version {
        [major @ b'0'..=b'9', b'.', minor @ b'0'..=b'9'] => {
            let (major, minor) = (major - b'0', minor - b'0');
            if major == 0 || major > 2 || (major == 2 && minor > 0) {
                return Err(Error::UnsupportedVersion(format!("{}.{}", major, minor)));
            }
            Ok((major, minor))
        },
        _ => Err(Error::InvalidHeader(String::from_utf8_lossy(version).into_owned())),
    }
}

struct Loader<'a> {
    data: &'a [u8],
    options: &'a ParserOptions,
    table: CrossRefTable,
    fallback: Option<CrossRefTable>,
    issues: Vec<String>,
}

impl Loader<'_> {
    fn load_all(&mut self) -> Result<BTreeMap<ObjectRef, Object>> {
        let mut objects = BTreeMap::new();
        let mut compressed: Vec<(u32, u32, u32)> = Vec::new();

        let entries: Vec<(u32, XRefEntry)> = self.table.iter().map(|(n, e)| (n, *e)).collect();
        for (number, entry) in entries {
            match entry {
                XRefEntry::Free { .. } => {},
                XRefEntry::InUse { offset, gen } => {
                    if let Some((reference, object)) = self.load_at(number, gen, offset)? {
                        objects.insert(reference, object);
                    }
                },
                XRefEntry::Compressed { stream, index } => compressed.push((number, stream, index)),
            }
        }

        let mut streams: HashMap<u32, Option<ObjectStream>> = HashMap::new();
        for (number, stream, index) in compressed {
            let unpacked = streams.entry(stream).or_insert_with(|| {
                let container = objects
                    .iter()
                    .find(|(r, _)| r.id == stream)
                    .map(|(_, obj)| obj);
                match container.map(|obj| ObjectStream::parse(obj, self.options)) {
                    Some(Ok(objstm)) => Some(objstm),
                    Some(Err(e)) => {
                        log::warn!("Object stream {} is unreadable: {}", stream, e);
                        None
                    },
                    None => None,
                }
            });

            match unpacked.as_ref().and_then(|s| s.get(index as usize, number)) {
                Some(object) => {
                    objects.insert(ObjectRef::new(number, 0), object.clone());
                },
                None => self.record(format!(
                    "object {} (index {} of object stream {}) could not be loaded",
                    number, index, stream
                ))?,
            }
        }

        // Their contents are in the arena now
        objects.retain(|_, obj| {
            !matches!(
                obj,
                Object::Stream { dict, .. } if matches!(dict.type_name(), Some("XRef") | Some("ObjStm"))
            )
        });

        Ok(objects)
    }

    /// Parse the object an in-use entry points at, falling back to a scanned table.
    fn load_at(&mut self, number: u32, gen: u16, offset: usize) -> Result<Option<(ObjectRef, Object)>> {
        let expected = ObjectRef::new(number, gen);
        match parse_indirect_object(self.data, offset, self.options) {
            Ok((found, object)) if found == expected => return Ok(Some((found, object))),
            Ok((found, _)) => {
                log::debug!("xref entry for {} points at {}", expected, found);
            },
            Err(e) => {
                log::debug!("Failed to load {} at offset {}: {}", expected, offset, e);
            },
        }

        if self.options.reconstruct_xref {
            if self.fallback.is_none() {
                log::warn!("Cross-reference offsets are wrong, scanning file for objects");
                self.fallback = Some(reconstruct_xref(self.data, self.options)?);
            }
            if let Some(XRefEntry::InUse { offset, gen }) = self.fallback.as_ref().and_then(|t| t.get(number)) {
                let (offset, gen) = (*offset, *gen);
                if let Ok((found, object)) = parse_indirect_object(self.data, offset, self.options) {
                    if found.id == number {
                        return Ok(Some((ObjectRef::new(number, gen), object)));
                    }
                }
            }
        }

        self.record(format!("object {} at offset {} could not be loaded", expected, offset))?;
        Ok(None)
    }

    fn record(&mut self, issue: String) -> Result<()> {
        if self.options.strict {
            return Err(Error::InvalidPdf(issue));
        }
        log::warn!("{}", issue);
        self.issues.push(issue);
        Ok(())
    }
}
