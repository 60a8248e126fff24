//! Cross-reference table parser.
//!
//! Maps object numbers to where their objects live: a byte offset for
//! uncompressed objects, or an (object stream, index) pair for objects
//! packed into an object stream. Both classic `xref` tables and
//! cross-reference streams (PDF 1.5+) are read, and `/Prev` chains from
//! incremental updates are followed with newer sections taking precedence.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.5.4 - Cross-Reference Table
//! and Section 7.5.8 - Cross-Reference Streams

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Dictionary, Object};
use crate::parser::{parse_indirect_object, parse_object_with_options};
use crate::parser_config::ParserOptions;
use std::collections::{BTreeMap, HashSet};

/// Where an object is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free slot
    Free {
        /// Generation to use if the number is reused
        gen: u16,
    },
    /// Uncompressed object at a byte offset
    InUse {
        /// Byte offset of `N G obj`
        offset: usize,
        /// Generation number
        gen: u16,
    },
    /// Object packed in an object stream (generation is always 0)
    Compressed {
        /// Object number of the containing `/Type /ObjStm` stream
        stream: u32,
        /// Index within the stream
        index: u32,
    },
}

impl XRefEntry {
    /// Generation number of the object this entry describes.
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { gen } | XRefEntry::InUse { gen, .. } => *gen,
            XRefEntry::Compressed { .. } => 0,
        }
    }

    /// Whether the entry describes a live object.
    pub fn is_in_use(&self) -> bool {
        !matches!(self, XRefEntry::Free { .. })
    }
}

/// Cross-reference table merged across all update sections.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
}

impl CrossRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Entries in object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> + '_ {
        self.entries.iter().map(|(&num, entry)| (num, entry))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The trailer of the newest section.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Replace the trailer.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = trailer;
    }

    /// Take the trailer out of the table.
    pub fn into_trailer(self) -> Dictionary {
        self.trailer
    }

    /// Fill in entries from an older section; entries already present win.
    fn merge_older(&mut self, older: CrossRefTable) {
        for (num, entry) in older.entries {
            self.entries.entry(num).or_insert(entry);
        }
        for (key, value) in older.trailer {
            if !self.trailer.contains_key(&key) {
                self.trailer.insert(key, value);
            }
        }
    }
}

/// Find the offset named by the last `startxref` in the file.
pub fn find_startxref(data: &[u8]) -> Result<usize> {
    let tail_start = data.len().saturating_sub(2048);
    let tail = &data[tail_start..];
    let keyword = b"startxref";

    let pos = tail
        .windows(keyword.len())
        .rposition(|window| window == keyword)
        .ok_or(Error::InvalidXref)?;

    match token(&tail[pos + keyword.len()..]) {
        Ok((_, Token::Integer(offset))) if offset >= 0 && (offset as usize) < data.len() => {
            Ok(offset as usize)
        },
        _ => Err(Error::InvalidXref),
    }
}

/// Load the complete cross-reference table, following `/Prev` links.
pub fn load_xref(data: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    let start = find_startxref(data)?;
    let mut table = parse_section(data, start, options)?;
    let mut visited = HashSet::from([start]);
    let mut next = prev_offset(table.trailer());
    let mut depth = 0u32;

    // The newest trailer's /Prev is consumed by the walk itself
    table.trailer.remove("Prev");

    while let Some(offset) = next {
        if !visited.insert(offset) {
            log::warn!("Circular /Prev chain at offset {}, stopping", offset);
            break;
        }
        depth += 1;
        if depth > options.max_recursion_depth {
            return Err(Error::RecursionLimitExceeded(options.max_recursion_depth));
        }

        log::debug!("Following /Prev to xref section at {}", offset);
        let older = match parse_section(data, offset, options) {
            Ok(older) => older,
            Err(e) if !options.strict => {
                log::warn!("Ignoring unreadable /Prev section at {}: {}", offset, e);
                break;
            },
            Err(e) => return Err(e),
        };
        next = prev_offset(older.trailer());
        table.merge_older(older);
        table.trailer.remove("Prev");
    }

    Ok(table)
}

fn prev_offset(trailer: &Dictionary) -> Option<usize> {
    trailer
        .int_entry("Prev")
        .filter(|&offset| offset >= 0)
        .map(|offset| offset as usize)
}

/// Parse one section: a classic table (with a possible hybrid `/XRefStm`)
/// or a cross-reference stream.
fn parse_section(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let input = data.get(offset..).ok_or(Error::InvalidXref)?;

    if skip_ws(input).starts_with(b"xref") {
        let mut table = parse_traditional_xref(data, offset, options)?;

        if let Some(stream_offset) = table.trailer().int_entry("XRefStm") {
            match parse_xref_stream(data, stream_offset as usize, options) {
                Ok(stream_table) => {
                    for (num, entry) in stream_table.entries {
                        table.entries.entry(num).or_insert(entry);
                    }
                },
                Err(e) => log::warn!("Ignoring unreadable /XRefStm at {}: {}", stream_offset, e),
            }
        }
        Ok(table)
    } else {
        parse_xref_stream(data, offset, options)
    }
}

/// Parse a classic table:
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000015 00000 n
/// 0000000074 00000 n
/// trailer
/// << /Size 3 /Root 1 0 R >>
/// ```
fn parse_traditional_xref(
    data: &[u8],
    offset: usize,
    options: &ParserOptions,
) -> Result<CrossRefTable> {
    let mut table = CrossRefTable::new();
    let mut rest = match token(&data[offset..]) {
        Ok((rest, Token::Keyword(b"xref"))) => rest,
        _ => return Err(Error::InvalidXref),
    };

    loop {
        match token(rest) {
            Ok((after, Token::Keyword(b"trailer"))) => {
                let (_, trailer) =
                    parse_object_with_options(after, options).map_err(|_| Error::InvalidXref)?;
                match trailer {
                    Object::Dictionary(dict) => table.set_trailer(dict),
                    _ => return Err(Error::InvalidXref),
                }
                return Ok(table);
            },
            Ok((after, Token::Integer(first))) => {
                let (after, count) = match token(after) {
                    Ok((after, Token::Integer(count))) => (after, count),
                    _ => return Err(Error::InvalidXref),
                };
                if !(0..=10_000_000).contains(&count) {
                    return Err(Error::InvalidPdf(format!(
                        "bad xref subsection header {} {}",
                        first, count
                    )));
                }
                let (first, count) = subsection_range(first, count)?;
                rest = parse_subsection(after, first, count, &mut table, options)?;
            },
            _ => return Err(Error::InvalidXref),
        }
    }
}

fn parse_subsection<'a>(
    mut rest: &'a [u8],
    first: u32,
    count: u32,
    table: &mut CrossRefTable,
    options: &ParserOptions,
) -> Result<&'a [u8]> {
    for i in 0..count {
        let number = first.checked_add(i).ok_or(Error::InvalidXref)?;
        let entry = match (token(rest), options.strict) {
            (Ok((after, Token::Integer(offset))), _) => {
                let (after, gen) = match token(after) {
                    Ok((after, Token::Integer(gen))) => (after, gen),
                    _ => return Err(Error::InvalidXref),
                };
                let (after, kind) = match token(after) {
                    Ok((after, Token::Keyword(kind))) => (after, kind),
                    _ => return Err(Error::InvalidXref),
                };
                rest = after;

                let gen = gen.clamp(0, u16::MAX as i64) as u16;
                match kind {
                    b"n" if offset > 0 => XRefEntry::InUse {
                        offset: offset as usize,
                        gen,
                    },
                    b"n" | b"f" => XRefEntry::Free { gen },
                    other => {
                        if options.strict {
                            return Err(Error::InvalidXref);
                        }
                        log::warn!(
                            "Unknown xref entry type {:?} for object {}, treating as free",
                            String::from_utf8_lossy(other),
                            number
                        );
                        XRefEntry::Free { gen }
                    },
                }
            },
            (Ok((_, Token::Keyword(b"trailer"))), false) => {
                log::warn!("xref subsection {} {} ends early after {} entries", first, count, i);
                return Ok(rest);
            },
            _ => return Err(Error::InvalidXref),
        };
        table.insert(number, entry);
    }
    Ok(rest)
}

/// Check a subsection's `start count` pair; every object number it covers must fit in a `u32`.
fn subsection_range(start: i64, count: i64) -> Result<(u32, u32)> {
    match start.checked_add(count) {
        Some(end) if start >= 0 && count >= 0 && end <= i64::from(u32::MAX) => Ok((start as u32, count as u32)),
        _ => {
            log::debug!("xref subsection {} {} is out of range", start, count);
            Err(Error::InvalidXref)
        },
    }
}

/// Parse a `/Type /XRef` stream.
///
/// Each row holds three big-endian fields of the widths given by `/W`:
/// type (0 free, 1 offset, 2 compressed; defaults to 1 when its width is 0),
/// then two type-specific values.
fn parse_xref_stream(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let (_, object) = parse_indirect_object(data, offset, options)?;
    let dict = object.as_dict().ok_or(Error::InvalidXref)?;

    if dict.type_name() != Some("XRef") {
        return Err(Error::InvalidPdf(format!(
            "expected /Type /XRef at offset {}, found {:?}",
            offset,
            dict.type_name()
        )));
    }

    let widths: Vec<usize> = dict
        .array_entry("W")
        .ok_or_else(|| Error::InvalidPdf("xref stream without /W".to_string()))?
        .iter()
        .map(|w| w.as_integer().filter(|&w| (0..=8).contains(&w)).map(|w| w as usize))
        .collect::<Option<_>>()
        .filter(|w: &Vec<usize>| w.len() == 3)
        .ok_or_else(|| Error::InvalidPdf("invalid /W in xref stream".to_string()))?;

    let size = dict
        .int_entry("Size")
        .ok_or_else(|| Error::InvalidPdf("xref stream without /Size".to_string()))?;

    let ranges: Vec<(u32, u32)> = match dict.array_entry("Index") {
        Some(index) => index
            .chunks(2)
            .map(|pair| match pair {
                [start, count] => match (start.as_integer(), count.as_integer()) {
                    (Some(start), Some(count)) => subsection_range(start, count),
                    _ => Err(Error::InvalidXref),
                },
                _ => Err(Error::InvalidXref),
            })
            .collect::<Result<_>>()?,
        None => vec![subsection_range(0, size.max(0))?],
    };

    let rows = object.decode_stream_data_with_options(options)?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(Error::InvalidPdf("xref stream /W sums to zero".to_string()));
    }

    let mut table = CrossRefTable::new();
    let mut chunks = rows.chunks_exact(row_len);

    'ranges: for (start, count) in ranges {
        for i in 0..count {
            let Some(row) = chunks.next() else {
                log::warn!("xref stream data ends before all /Index ranges are filled");
                break 'ranges;
            };
            let (f1, rest) = row.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { read_int(f1) };

            let entry = match kind {
                0 => XRefEntry::Free {
                    gen: read_int(f3) as u16,
                },
                1 => XRefEntry::InUse {
                    offset: read_int(f2) as usize,
                    gen: read_int(f3) as u16,
                },
                2 => XRefEntry::Compressed {
                    stream: read_int(f2) as u32,
                    index: read_int(f3) as u32,
                },
                // Unknown types are references to the null object
                _ => continue,
            };
            let number = start.checked_add(i).ok_or(Error::InvalidXref)?;
            table.insert(number, entry);
        }
    }

    let mut trailer = dict.clone();
    for key in ["Type", "W", "Index", "Length", "Filter", "DecodeParms"] {
        trailer.remove(key);
    }
    table.set_trailer(trailer);
    Ok(table)
}

fn read_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;

    fn classic_pdf() -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let obj1 = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n0 2\n0000000000 65535 f \n{:010} 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                obj1, xref
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_find_startxref() {
        let pdf = classic_pdf();
        let offset = find_startxref(&pdf).unwrap();
        assert!(pdf[offset..].starts_with(b"xref"));
    }

    #[test]
    fn test_find_startxref_missing() {
        assert!(matches!(find_startxref(b"%PDF-1.4\n"), Err(Error::InvalidXref)));
    }

    #[test]
    fn test_load_classic_table() {
        let pdf = classic_pdf();
        let table = load_xref(&pdf, &ParserOptions::strict()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Some(&XRefEntry::Free { gen: 65535 }));
        assert_eq!(table.get(1), Some(&XRefEntry::InUse { offset: 9, gen: 0 }));
        assert_eq!(
            table.trailer().get("Root").and_then(Object::as_reference),
            Some(ObjectRef::new(1, 0))
        );
    }

    #[test]
    fn test_prev_chain_newer_entries_win() {
        let mut pdf = classic_pdf();
        let first_xref = find_startxref(&pdf).unwrap();
        let obj1 = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Version /1.5 >>\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n1 1\n{:010} 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
                obj1, first_xref, xref
            )
            .as_bytes(),
        );

        let table = load_xref(&pdf, &ParserOptions::default()).unwrap();
        assert_eq!(table.get(1), Some(&XRefEntry::InUse { offset: obj1, gen: 0 }));
        assert_eq!(table.get(0), Some(&XRefEntry::Free { gen: 65535 }));
        assert!(!table.trailer().contains_key("Prev"));
    }

    #[test]
    fn test_xref_stream() {
        // Rows with W [1 2 1]: free 0, object 1 at offset 9, object 3 in stream 2
        let rows: Vec<u8> = vec![0, 0, 0, 255, 1, 0, 9, 0, 2, 0, 2, 0];
        let mut pdf = b"%PDF-1.5\n".to_vec();
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /XRef /W [1 2 1] /Index [0 1 1 1 3 1] /Size 6 /Root 1 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        pdf.extend_from_slice(&rows);
        pdf.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref).as_bytes());

        let table = load_xref(&pdf, &ParserOptions::strict()).unwrap();
        assert_eq!(table.get(0), Some(&XRefEntry::Free { gen: 255 }));
        assert_eq!(table.get(1), Some(&XRefEntry::InUse { offset: 9, gen: 0 }));
        assert_eq!(table.get(3), Some(&XRefEntry::Compressed { stream: 2, index: 0 }));
        assert!(table.trailer().contains_key("Root"));
        assert!(!table.trailer().contains_key("W"));
    }

    #[test]
    fn test_subsection_range_bounds() {
        assert_eq!(subsection_range(0, 3).unwrap(), (0, 3));
        assert_eq!(subsection_range(u32::MAX as i64 - 1, 1).unwrap(), (u32::MAX - 1, 1));
        assert!(subsection_range(u32::MAX as i64, 2).is_err());
        assert!(subsection_range(-1, 2).is_err());
        assert!(subsection_range(3, -1).is_err());
        assert!(subsection_range(i64::MAX, 1).is_err());
    }

    #[test]
    fn test_classic_subsection_past_u32_is_rejected() {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n4294967295 2\n0000000000 65535 f \n0000000000 65535 f \ntrailer\n<< /Size 2 >>\nstartxref\n{}\n%%EOF\n",
                xref
            )
            .as_bytes(),
        );
        for options in [ParserOptions::strict(), ParserOptions::lenient()] {
            assert!(matches!(load_xref(&pdf, &options), Err(Error::InvalidXref)));
        }
    }

    #[test]
    fn test_xref_stream_negative_index_is_rejected() {
        let rows: Vec<u8> = vec![1, 0, 9, 0];
        let mut pdf = b"%PDF-1.5\n".to_vec();
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /XRef /W [1 2 1] /Index [-1 1] /Size 6 /Root 1 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        pdf.extend_from_slice(&rows);
        pdf.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref).as_bytes());
        assert!(matches!(load_xref(&pdf, &ParserOptions::strict()), Err(Error::InvalidXref)));
    }

    #[test]
    fn test_garbage_at_startxref_offset() {
        let mut pdf = b"%PDF-1.4\nnonsense\n".to_vec();
        pdf.extend_from_slice(b"startxref\n9\n%%EOF\n");
        assert!(load_xref(&pdf, &ParserOptions::default()).is_err());
    }
}
