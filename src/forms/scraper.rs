//! AcroForm field scraping.
//!
//! Walks the top-level `/Fields` array of a document's AcroForm and reports
//! each field's partial name (`/T`) in array order. Malformed entries are
//! skipped and reported as [`FieldAnomaly`] values instead of failing the
//! whole document; only a missing catalog or an unreadable AcroForm is
//! fatal.
//!
//! See ISO 32000-1:2008, Section 12.7.3 - Field Dictionaries.

use super::acroform;
use crate::document::{Document, Handle};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use serde::Serialize;

/// Field type from the `/FT` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Button field (/Btn): checkbox, radio button, push button
    Button,
    /// Text field (/Tx)
    Text,
    /// Choice field (/Ch): list box or combo box
    Choice,
    /// Signature field (/Sig)
    Signature,
    /// Unrecognized field type
    Other(String),
}

impl FieldType {
    /// Parse from a PDF name.
    pub fn from_pdf_name(name: &str) -> Self {
        match name {
            "Btn" => FieldType::Button,
            "Tx" => FieldType::Text,
            "Ch" => FieldType::Choice,
            "Sig" => FieldType::Signature,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Read `/FT` from a field dictionary.
    pub fn of(field: &Dictionary) -> Option<Self> {
        field.name_entry("FT").map(Self::from_pdf_name)
    }
}

/// A named field found in `/Fields`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapedField {
    /// Decoded `/T` value
    pub name: String,
    /// `/FT`, when the field carries one itself
    pub field_type: Option<FieldType>,
    /// The field dictionary in the scraped document
    pub handle: Handle,
}

/// A `/Fields` entry that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldAnomaly {
    /// The element is not an indirect reference
    NotAReference {
        /// Position in `/Fields`
        index: usize,
        /// Type of the element
        found: &'static str,
    },
    /// The reference has no table entry
    DanglingReference {
        /// Position in `/Fields`
        index: usize,
        /// The reference
        reference: ObjectRef,
    },
    /// The reference resolves to something other than a dictionary
    NotADictionary {
        /// Position in `/Fields`
        index: usize,
        /// The reference
        reference: ObjectRef,
        /// Type of the resolved object
        found: &'static str,
    },
    /// The field dictionary has no `/T` string
    MissingFieldName {
        /// Position in `/Fields`
        index: usize,
        /// The reference
        reference: ObjectRef,
    },
}

impl FieldAnomaly {
    /// Position of the skipped element in `/Fields`.
    pub fn index(&self) -> usize {
        match self {
            FieldAnomaly::NotAReference { index, .. }
            | FieldAnomaly::DanglingReference { index, .. }
            | FieldAnomaly::NotADictionary { index, .. }
            | FieldAnomaly::MissingFieldName { index, .. } => *index,
        }
    }

    /// The field-level error this anomaly stands for.
    pub fn to_error(&self) -> Error {
        match self {
            FieldAnomaly::NotAReference { index, found } => Error::NotAReference {
                index: *index,
                found: found.to_string(),
            },
            FieldAnomaly::DanglingReference { reference, .. } => Error::DanglingReference(*reference),
            FieldAnomaly::NotADictionary { reference, found, .. } => Error::NotADictionary {
                reference: *reference,
                found: found.to_string(),
            },
            FieldAnomaly::MissingFieldName { reference, .. } => Error::MissingFieldName(*reference),
        }
    }
}

/// Result of scraping one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeOutcome {
    /// Named fields in `/Fields` order
    pub fields: Vec<ScrapedField>,
    /// Skipped entries
    pub anomalies: Vec<FieldAnomaly>,
    /// Number of `/V` entries written
    pub stamped: usize,
}

impl ScrapeOutcome {
    /// Field names in `/Fields` order, duplicates included.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// No entry was skipped.
    pub fn is_complete(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// List the fields of a document without modifying it.
///
/// ```
/// use pdf_formkit::document::Document;
/// use pdf_formkit::forms::scrape_fields;
///
/// let doc = Document::new();
/// // No catalog at all is a document-level failure.
/// assert!(scrape_fields(&doc).is_err());
/// ```
pub fn scrape_fields(doc: &Document) -> Result<ScrapeOutcome> {
    let acroform = match acroform(doc)? {
        Some(acroform) => acroform,
        None => {
            log::debug!("Document {} has no AcroForm", doc.id());
            return Ok(ScrapeOutcome::default());
        },
    };
    let fields = match acroform.get("Fields") {
        Some(fields) => doc.dereference(fields)?,
        None => return Ok(ScrapeOutcome::default()),
    };
    let fields = match fields {
        Object::Array(fields) => fields,
        other => {
            log::warn!(
                "Document {}: /AcroForm /Fields is {}, not an array",
                doc.id(),
                other.type_name()
            );
            return Ok(ScrapeOutcome::default());
        },
    };

    let mut outcome = ScrapeOutcome::default();
    for (index, entry) in fields.iter().enumerate() {
        match scrape_entry(doc, index, entry) {
            Ok(field) => outcome.fields.push(field),
            Err(anomaly) => {
                log::warn!("Document {}: skipping field: {}", doc.id(), anomaly.to_error());
                outcome.anomalies.push(anomaly);
            },
        }
    }
    Ok(outcome)
}

/// Scrape a document and set `/V` to `value` on every named field.
///
/// Skipped entries are not written. The caller decides whether to write
/// the document back out; `stamped` says whether anything changed.
pub fn stamp_fields(doc: &mut Document, value: &Object) -> Result<ScrapeOutcome> {
    let mut outcome = scrape_fields(doc)?;
    for field in &outcome.fields {
        if let Object::Dictionary(dict) = doc.resolve_mut(field.handle)? {
            dict.insert("V", value.clone());
            outcome.stamped += 1;
        }
    }
    log::debug!("Document {}: stamped {} fields", doc.id(), outcome.stamped);
    Ok(outcome)
}

fn scrape_entry(doc: &Document, index: usize, entry: &Object) -> std::result::Result<ScrapedField, FieldAnomaly> {
    let reference = match entry {
        Object::Reference(r) => *r,
        other => {
            return Err(FieldAnomaly::NotAReference {
                index,
                found: other.type_name(),
            })
        },
    };
    let dict = match doc.find_entry(reference) {
        Some(Object::Dictionary(dict)) => dict,
        Some(other) => {
            return Err(FieldAnomaly::NotADictionary {
                index,
                reference,
                found: other.type_name(),
            })
        },
        None => return Err(FieldAnomaly::DanglingReference { index, reference }),
    };
    let name = dict
        .text_entry("T")
        .ok_or(FieldAnomaly::MissingFieldName { index, reference })?;

    Ok(ScrapedField {
        name,
        field_type: FieldType::of(dict),
        handle: doc.handle(reference),
    })
}
