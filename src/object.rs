//! PDF object types.
//!
//! [`Object`] is the closed set of values that flow through a document's
//! object graph. Dictionaries keep their keys in insertion order so a
//! parsed-then-written document comes out in the order it went in.

use crate::error::{Error, Result};
use indexmap::IndexMap;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data, still encoded with the filters named in `dict`
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl serde::Serialize for ObjectRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An ordered PDF dictionary.
///
/// Keys are names without the leading `/`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<String, Object>);

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.0.get(key)
    }

    /// Look up an entry for modification.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.0.get_mut(key)
    }

    /// Insert or replace an entry, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: Object) -> Option<Object> {
        self.0.insert(key.into(), value)
    }

    /// Remove an entry, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.0.shift_remove(key)
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Object> {
        self.0.iter()
    }

    /// Iterate entries mutably in insertion order.
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Object> {
        self.0.iter_mut()
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Object> {
        self.0.keys()
    }

    /// Value of a `/Type` entry, if it is a name.
    pub fn type_name(&self) -> Option<&str> {
        self.name_entry("Type")
    }

    /// Name entry (e.g. `/FT /Tx`).
    pub fn name_entry(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Object::as_name)
    }

    /// String entry as raw bytes.
    pub fn string_entry(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_string)
    }

    /// String entry decoded as a PDF text string.
    pub fn text_entry(&self, key: &str) -> Option<String> {
        self.string_entry(key).map(decode_text_string)
    }

    /// Integer entry.
    pub fn int_entry(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    /// Boolean entry.
    pub fn bool_entry(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Object::as_bool)
    }

    /// Array entry, only when stored directly.
    pub fn array_entry(&self, key: &str) -> Option<&Vec<Object>> {
        self.get(key).and_then(Object::as_array)
    }
}

impl FromIterator<(String, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, Object)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (&'a str, Object)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl IntoIterator for Dictionary {
    type Item = (String, Object);
    type IntoIter = indexmap::map::IntoIter<String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Build a name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Build a string object from text.
    ///
    /// Text outside PDFDocEncoding's Latin range is written as UTF-16BE with a BOM.
    pub fn text(s: &str) -> Object {
        Object::String(encode_text_string(s))
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable dictionary access. Works for both Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number. Integers widen.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            Object::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Borrow as a dictionary or fail with a typed error.
    pub fn expect_dict(&self) -> Result<&Dictionary> {
        self.as_dict()
            .ok_or_else(|| Error::wrong_type("Dictionary", self.type_name()))
    }

    /// Borrow as an array or fail with a typed error.
    pub fn expect_array(&self) -> Result<&Vec<Object>> {
        self.as_array()
            .ok_or_else(|| Error::wrong_type("Array", self.type_name()))
    }

    /// Visit every reference contained in this object, depth first.
    pub fn for_each_reference_mut(&mut self, f: &mut impl FnMut(&mut ObjectRef)) {
        match self {
            Object::Reference(r) => f(r),
            Object::Array(items) => {
                for item in items {
                    item.for_each_reference_mut(f);
                }
            },
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                for (_, value) in dict.iter_mut() {
                    value.for_each_reference_mut(f);
                }
            },
            Object::Null
            | Object::Boolean(_)
            | Object::Integer(_)
            | Object::Real(_)
            | Object::String(_)
            | Object::Name(_) => {},
        }
    }

    /// Decode stream data using the filters named in the stream dictionary.
    ///
    /// Only the filters in [`crate::decoders`] are supported; anything else
    /// is reported as [`Error::UnsupportedFilter`].
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        self.decode_stream_data_with_options(&crate::parser_config::ParserOptions::default())
    }

    /// Decode stream data under the decompression limits of `options`.
    pub fn decode_stream_data_with_options(
        &self,
        options: &crate::parser_config::ParserOptions,
    ) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let filters = dict
                    .get("Filter")
                    .map(extract_filter_names)
                    .unwrap_or_default();

                if filters.is_empty() {
                    return Ok(data.to_vec());
                }

                let decode_params = extract_decode_params(dict.get("DecodeParms"))?;
                crate::decoders::decode_stream_with_options(
                    data,
                    &filters,
                    decode_params.as_ref(),
                    options,
                )
            },
            _ => Err(Error::wrong_type("Stream", self.type_name())),
        }
    }
}

impl From<Dictionary> for Object {
    fn from(dict: Dictionary) -> Self {
        Object::Dictionary(dict)
    }
}

impl From<ObjectRef> for Object {
    fn from(r: ObjectRef) -> Self {
        Object::Reference(r)
    }
}

/// Extract filter names from a Filter object.
///
/// The Filter entry can be either a single Name or an Array of Names.
fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

/// Extract predictor parameters from a DecodeParms object.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.4.4.4 - LZW and Flate Predictor Functions
pub(crate) fn extract_decode_params(
    params_obj: Option<&Object>,
) -> Result<Option<crate::decoders::DecodeParams>> {
    let dict = match params_obj {
        Some(Object::Dictionary(d)) => d,
        Some(Object::Array(arr)) => match arr.iter().find_map(|obj| obj.as_dict()) {
            Some(d) => d,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };

    let positive = |key: &str| -> Result<usize> {
        match dict.int_entry(key) {
            None => Ok(1),
            Some(n) if n > 0 => usize::try_from(n)
                .map_err(|_| Error::Decode(format!("/{} {} is out of range", key, n))),
            Some(n) => Err(Error::Decode(format!("/{} must be positive, found {}", key, n))),
        }
    };

    let bits_per_component = match dict.int_entry("BitsPerComponent").unwrap_or(8) {
        bits @ (1 | 2 | 4 | 8 | 16) => bits as usize,
        other => return Err(Error::Decode(format!("Invalid /BitsPerComponent {}", other))),
    };

    Ok(Some(crate::decoders::DecodeParams {
        predictor: dict.int_entry("Predictor").unwrap_or(1),
        columns: positive("Columns")?,
        colors: positive("Colors")?,
        bits_per_component,
    }))
}

/// Decode a PDF text string (ISO 32000-1:2008, Section 7.9.2.2).
///
/// Strings starting with the UTF-16BE byte order mark are decoded as UTF-16;
/// a UTF-8 BOM (PDF 2.0) selects UTF-8; everything else is PDFDocEncoding.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .map(|pair| {
                let hi = pair[0] as u16;
                let lo = pair.get(1).copied().unwrap_or(0) as u16;
                (hi << 8) | lo
            })
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }

    bytes.iter().map(|&b| pdfdoc_decode(b)).collect()
}

/// Encode text as a PDF text string.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32))) {
        return text.chars().map(|c| c as u32 as u8).collect();
    }

    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Map one PDFDocEncoding code to its Unicode character.
///
/// Codes 0-127 are ASCII, 160-255 are Latin-1, 128-159 are the PDF-specific block.
fn pdfdoc_decode(code: u8) -> char {
    match code {
        0..=127 => code as char,
        128 => '\u{2022}',
        129 => '\u{2020}',
        130 => '\u{2021}',
        131 => '\u{2026}',
        132 => '\u{2014}',
        133 => '\u{2013}',
        134 => '\u{0192}',
        135 => '\u{2044}',
        136 => '\u{2039}',
        137 => '\u{203A}',
        138 => '\u{2212}',
        139 => '\u{2030}',
        140 => '\u{201E}',
        141 => '\u{201C}',
        142 => '\u{201D}',
        143 => '\u{2018}',
        144 => '\u{2019}',
        145 => '\u{201A}',
        146 => '\u{2122}',
        147 => '\u{FB01}',
        148 => '\u{FB02}',
        149 => '\u{0141}',
        150 => '\u{0152}',
        151 => '\u{0160}',
        152 => '\u{0178}',
        153 => '\u{017D}',
        154 => '\u{0131}',
        155 => '\u{0142}',
        156 => '\u{0153}',
        157 => '\u{0161}',
        158 => '\u{017E}',
        159 => '\u{FFFD}',
        160..=255 => code as char,
    }
}
