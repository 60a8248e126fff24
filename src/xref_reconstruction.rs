//! Cross-reference reconstruction for damaged files.
//!
//! When `startxref` is missing or points at garbage, the file is scanned
//! for `N G obj` headers and a table is rebuilt from what is found. Later
//! definitions of the same object number win, as they would after an
//! incremental update. The trailer is taken from the last `trailer`
//! dictionary in the file, or rebuilt around the first `/Type /Catalog`
//! object.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::parser::{parse_indirect_object, parse_object_with_options};
use crate::parser_config::ParserOptions;
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref RE_OBJ_HEADER: Regex =
        Regex::new(r"(?m)(?:^|\r)[ \t\x0C\x00]*(\d{1,10})[ \t\r\n\x0C\x00]+(\d{1,5})[ \t\r\n\x0C\x00]+obj\b")
            .expect("object header pattern");
    static ref RE_TRAILER: Regex = Regex::new(r"trailer[\s]*<<").expect("trailer pattern");
}

/// Rebuild a cross-reference table by scanning the whole file.
pub fn reconstruct_xref(data: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    log::info!("Reconstructing cross-reference table from {} bytes", data.len());

    let mut table = CrossRefTable::new();
    for caps in RE_OBJ_HEADER.captures_iter(data) {
        let (Some(num), Some(gen)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let number = std::str::from_utf8(num.as_bytes()).ok().and_then(|s| s.parse::<u32>().ok());
        let gen = std::str::from_utf8(gen.as_bytes()).ok().and_then(|s| s.parse::<u16>().ok());
        if let (Some(number), Some(gen)) = (number, gen) {
            table.insert(
                number,
                XRefEntry::InUse {
                    offset: num.start(),
                    gen,
                },
            );
        }
    }

    if table.is_empty() {
        return Err(Error::InvalidPdf("no objects found while reconstructing xref".to_string()));
    }
    log::info!("Found {} objects by scanning", table.len());

    let trailer = match find_trailer(data, options) {
        Some(trailer) if trailer.get("Root").and_then(Object::as_reference).is_some() => trailer,
        _ => minimal_trailer(data, &table, options)?,
    };
    table.set_trailer(trailer);
    Ok(table)
}

/// The last parseable `trailer << ... >>` in the file.
fn find_trailer(data: &[u8], options: &ParserOptions) -> Option<Dictionary> {
    RE_TRAILER
        .find_iter(data)
        .filter_map(|m| {
            let dict_start = m.end() - 2;
            match parse_object_with_options(&data[dict_start..], options) {
                Ok((_, Object::Dictionary(dict))) => Some(dict),
                _ => None,
            }
        })
        .last()
}

fn minimal_trailer(data: &[u8], table: &CrossRefTable, options: &ParserOptions) -> Result<Dictionary> {
    let catalog = table
        .iter()
        .filter_map(|(number, entry)| match entry {
            XRefEntry::InUse { offset, gen } => Some((number, *offset, *gen)),
            _ => None,
        })
        .find(|&(_, offset, _)| {
            parse_indirect_object(data, offset, options)
                .map(|(_, obj)| obj.as_dict().and_then(Dictionary::type_name) == Some("Catalog"))
                .unwrap_or(false)
        })
        .map(|(number, _, gen)| ObjectRef::new(number, gen))
        .ok_or_else(|| Error::InvalidPdf("no catalog found while reconstructing xref".to_string()))?;

    log::info!("Rebuilt trailer around catalog {}", catalog);
    let size = table.iter().map(|(n, _)| n).max().unwrap_or(0) as i64 + 1;
    Ok([("Root", Object::Reference(catalog)), ("Size", Object::Integer(size))]
        .into_iter()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_with_trailer() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n2 0 obj\n[1 0 R]\nendobj\ntrailer\n<< /Root 1 0 R /Size 3 >>\n%%EOF";
        let table = reconstruct_xref(data, &ParserOptions::default()).unwrap();
        assert_eq!(table.get(1), Some(&XRefEntry::InUse { offset: 9, gen: 0 }));
        assert!(table.get(2).is_some());
        assert_eq!(table.trailer().int_entry("Size"), Some(3));
    }

    #[test]
    fn test_reconstruct_without_trailer_finds_catalog() {
        let data = b"%PDF-1.4\n3 0 obj\n(x)\nendobj\n7 0 obj\n<< /Type /Catalog /Pages 3 0 R >>\nendobj\n";
        let table = reconstruct_xref(data, &ParserOptions::default()).unwrap();
        assert_eq!(
            table.trailer().get("Root").and_then(Object::as_reference),
            Some(ObjectRef::new(7, 0))
        );
        assert_eq!(table.trailer().int_entry("Size"), Some(8));
    }

    #[test]
    fn test_later_definition_wins() {
        let data = b"%PDF-1.4\n1 0 obj\n(old)\nendobj\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let table = reconstruct_xref(data, &ParserOptions::default()).unwrap();
        match table.get(1) {
            Some(XRefEntry::InUse { offset, .. }) => assert!(*offset > 20),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_header_inside_text_is_ignored() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n(see 12 0 obj)";
        let table = reconstruct_xref(data, &ParserOptions::default()).unwrap();
        assert!(table.get(12).is_none());
        assert!(table.get(1).is_some());
    }

    #[test]
    fn test_nothing_to_reconstruct() {
        assert!(reconstruct_xref(b"%PDF-1.4\nno objects", &ParserOptions::default()).is_err());
    }
}
