//! Interactive form (AcroForm) processing.
//!
//! See ISO 32000-1:2008, Section 12.7 - Interactive Forms.
//!
//! - [`scraper`]: list field names, optionally stamping a value into each
//! - [`merger`]: merge one document's AcroForm into another's
//! - [`combine`]: fold several documents' forms into one document
//! - [`fill`]: set field values by name
//! - [`batch`]: validate, scrape and write a list of files

pub mod batch;
pub mod combine;
pub mod fill;
pub mod merger;
pub mod scraper;

pub use batch::{scrape_files, FileReport, FileScrape, ScrapeOptions, ScrapeReport};
pub use combine::{combine_forms, CombineOutcome};
pub use fill::{fill_fields, value_from_json, values_from_json, FillOutcome};
pub use merger::{merge_forms, MergeOutcome, NoOpReason, SigFlags};
pub use scraper::{scrape_fields, stamp_fields, FieldAnomaly, FieldType, ScrapeOutcome, ScrapedField};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};

/// The document's AcroForm dictionary, read-only.
///
/// `Ok(None)` when the catalog has no `/AcroForm` or it is null.
pub(crate) fn acroform(doc: &Document) -> Result<Option<&Dictionary>> {
    let entry = match doc.catalog()?.get("AcroForm") {
        Some(entry) => entry,
        None => return Ok(None),
    };
    match doc.dereference(entry)? {
        Object::Null => Ok(None),
        Object::Dictionary(dict) => Ok(Some(dict)),
        other => Err(Error::wrong_type("Dictionary", other.type_name())),
    }
}

/// The document's AcroForm dictionary, mutably, wherever it is stored.
pub(crate) fn acroform_mut(doc: &mut Document) -> Result<Option<&mut Dictionary>> {
    let indirect = match doc.catalog()?.get("AcroForm") {
        None | Some(Object::Null) => return Ok(None),
        Some(Object::Reference(r)) => Some(*r),
        Some(_) => None,
    };
    let object = match indirect {
        Some(r) => doc.find_entry_mut(r).ok_or(Error::DereferenceFailed(r))?,
        None => match doc.catalog_mut()?.get_mut("AcroForm") {
            Some(object) => object,
            None => return Ok(None),
        },
    };
    match object {
        Object::Null => Ok(None),
        Object::Dictionary(dict) => Ok(Some(dict)),
        other => Err(Error::wrong_type("Dictionary", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;

    fn with_catalog(acroform: Option<Object>) -> Document {
        let mut doc = Document::new();
        let mut catalog = Dictionary::new();
        catalog.insert("Type", Object::name("Catalog"));
        if let Some(acroform) = acroform {
            catalog.insert("AcroForm", acroform);
        }
        let root = doc.add_object(catalog);
        doc.set_root(root);
        doc
    }

    #[test]
    fn test_acroform_absent_or_null() {
        assert!(acroform(&with_catalog(None)).unwrap().is_none());
        assert!(acroform(&with_catalog(Some(Object::Null))).unwrap().is_none());
        assert!(acroform_mut(&mut with_catalog(Some(Object::Null))).unwrap().is_none());
    }

    #[test]
    fn test_acroform_indirect_is_edited_in_place() {
        let mut doc = with_catalog(Some(Object::Reference(ObjectRef::new(9, 0))));
        doc.insert_object(ObjectRef::new(9, 0), Dictionary::new());

        acroform_mut(&mut doc)
            .unwrap()
            .unwrap()
            .insert("NeedAppearances", Object::Boolean(true));
        let stored = doc.find_entry(ObjectRef::new(9, 0)).unwrap().as_dict().unwrap();
        assert_eq!(stored.bool_entry("NeedAppearances"), Some(true));
        assert!(acroform(&doc).unwrap().is_some());
    }

    #[test]
    fn test_acroform_wrong_type() {
        let doc = with_catalog(Some(Object::Integer(4)));
        assert!(matches!(acroform(&doc), Err(Error::InvalidObjectType { .. })));
    }

    #[test]
    fn test_acroform_dangling_reference() {
        let mut doc = with_catalog(Some(Object::Reference(ObjectRef::new(40, 0))));
        assert!(matches!(acroform(&doc), Err(Error::DereferenceFailed(_))));
        assert!(matches!(acroform_mut(&mut doc), Err(Error::DereferenceFailed(_))));
    }
}
