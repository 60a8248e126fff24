//! PDF object serialization.
//!
//! Serializes objects to their byte representation according to
//! ISO 32000-1:2008, Section 7.3. Dictionary entries are written in
//! their stored order.

use crate::lexer::is_delimiter;
use crate::object::{Dictionary, Object, ObjectRef};

/// Serializer for PDF objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Put dictionary entries on one line
    compact: bool,
}

impl ObjectSerializer {
    /// Create a serializer that writes one dictionary entry per line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, reference: ObjectRef, obj: &Object) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", reference.id, reference.gen).into_bytes();
        self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    fn write_object(&self, out: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => out.extend_from_slice(b"null"),
            Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => write_real(out, *r),
            Object::String(s) => write_string(out, s),
            Object::Name(n) => write_name(out, n),
            Object::Array(arr) => self.write_array(out, arr),
            Object::Dictionary(dict) => self.write_dictionary(out, dict),
            Object::Stream { dict, data } => self.write_stream(out, dict, data),
            Object::Reference(r) => out.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes()),
        }
    }

    fn write_array(&self, out: &mut Vec<u8>, arr: &[Object]) {
        out.push(b'[');
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                out.push(b' ');
            }
            self.write_object(out, obj);
        }
        out.push(b']');
    }

    fn write_dictionary(&self, out: &mut Vec<u8>, dict: &Dictionary) {
        out.extend_from_slice(b"<<");
        for (key, value) in dict {
            out.extend_from_slice(if self.compact { b" " } else { b"\n  " });
            write_name(out, key);
            out.push(b' ');
            self.write_object(out, value);
        }
        if !dict.is_empty() {
            out.extend_from_slice(if self.compact { b" " } else { b"\n" });
        }
        out.extend_from_slice(b">>");
    }

    /// `/Length` always reflects the bytes actually written.
    fn write_stream(&self, out: &mut Vec<u8>, dict: &Dictionary, data: &[u8]) {
        let mut dict = dict.clone();
        dict.insert("Length", Object::Integer(data.len() as i64));
        self.write_dictionary(out, &dict);
        out.extend_from_slice(b"\nstream\n");
        out.extend_from_slice(data);
        out.extend_from_slice(b"\nendstream");
    }
}

/// Reals are written without exponent and with at most five decimals.
fn write_real(out: &mut Vec<u8>, value: f64) {
    if !value.is_finite() {
        out.push(b'0');
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        out.extend_from_slice((value as i64).to_string().as_bytes());
    } else {
        let formatted = format!("{:.5}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        out.extend_from_slice(trimmed.as_bytes());
    }
}

/// Printable text goes out as a literal string, anything else as hex.
fn write_string(out: &mut Vec<u8>, data: &[u8]) {
    let printable = data
        .iter()
        .all(|&b| matches!(b, b'\n' | b'\r' | b'\t') || (0x20..=0x7E).contains(&b));

    if printable {
        out.push(b'(');
        for &byte in data {
            match byte {
                b'(' | b')' | b'\\' => out.extend_from_slice(&[b'\\', byte]),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                _ => out.push(byte),
            }
        }
        out.push(b')');
    } else {
        out.push(b'<');
        for byte in data {
            out.extend_from_slice(format!("{:02X}", byte).as_bytes());
        }
        out.push(b'>');
    }
}

/// Names escape `#`, delimiters and anything outside `!`..`~` as `#XX`.
fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for byte in name.bytes() {
        if (0x21..=0x7E).contains(&byte) && byte != b'#' && !is_delimiter(byte) {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_object;

    fn compact(obj: &Object) -> String {
        ObjectSerializer::compact().serialize_to_string(obj)
    }

    #[test]
    fn test_primitives() {
        assert_eq!(compact(&Object::Null), "null");
        assert_eq!(compact(&Object::Boolean(false)), "false");
        assert_eq!(compact(&Object::Integer(-3)), "-3");
        assert_eq!(compact(&Object::Real(2.0)), "2");
        assert_eq!(compact(&Object::Real(0.125)), "0.125");
        assert_eq!(compact(&Object::Reference(ObjectRef::new(7, 1))), "7 1 R");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(compact(&Object::String(b"a(b)\\c\n".to_vec())), "(a\\(b\\)\\\\c\\n)");
        assert_eq!(compact(&Object::String(vec![0xFE, 0xFF, 0x00, 0x41])), "<FEFF0041>");
    }

    #[test]
    fn test_name_escaping() {
        assert_eq!(compact(&Object::name("Helv")), "/Helv");
        assert_eq!(compact(&Object::name("A B#(x)")), "/A#20B#23#28x#29");
    }

    #[test]
    fn test_dictionary_keeps_order() {
        let dict: Dictionary = [("Z", Object::Integer(1)), ("A", Object::Integer(2))]
            .into_iter()
            .collect();
        assert_eq!(compact(&Object::Dictionary(dict.clone())), "<< /Z 1 /A 2 >>");
        assert_eq!(
            ObjectSerializer::new().serialize_to_string(&Object::Dictionary(dict)),
            "<<\n  /Z 1\n  /A 2\n>>"
        );
        assert_eq!(compact(&Object::Dictionary(Dictionary::new())), "<<>>");
    }

    #[test]
    fn test_stream_length_is_rewritten() {
        let dict: Dictionary = [("Length", Object::Reference(ObjectRef::new(9, 0)))]
            .into_iter()
            .collect();
        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"abc"),
        };
        assert_eq!(compact(&stream), "<< /Length 3 >>\nstream\nabc\nendstream");
    }

    #[test]
    fn test_output_parses_back() {
        let (_, original) =
            parse_object(b"<< /T (f\\)1) /Kids [1 0 R] /Q 2 /Rect [0 0.5 10 20] /N#20x null >>").unwrap();
        let bytes = ObjectSerializer::new().serialize(&original);
        let (_, reparsed) = parse_object(&bytes).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_serialize_indirect() {
        let bytes = ObjectSerializer::compact().serialize_indirect(ObjectRef::new(3, 0), &Object::Integer(5));
        assert_eq!(bytes, b"3 0 obj\n5\nendobj\n");
    }
}
