//! Object streams (PDF 1.5+).
//!
//! An object stream packs several objects into one compressed stream:
//!
//! ```text
//! 7 0 obj
//! << /Type /ObjStm /N 2 /First 10 /Filter /FlateDecode >>
//! stream
//! 10 0 11 27          % (object number, offset relative to /First) pairs
//! << /T (name) >>     % object 10
//! [ 10 0 R ]          % object 11
//! endstream
//! ```
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.5.7 - Object Streams

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object_with_options;
use crate::parser_config::ParserOptions;

/// Objects unpacked from one object stream, in stream order.
#[derive(Debug, Default)]
pub struct ObjectStream {
    objects: Vec<(u32, Option<Object>)>,
}

impl ObjectStream {
    /// Decode and split an object stream.
    ///
    /// Objects that fail to parse are kept as `None` so indices still line up
    /// with the cross-reference stream.
    pub fn parse(stream: &Object, options: &ParserOptions) -> Result<Self> {
        let dict = match stream {
            Object::Stream { dict, .. } => dict,
            other => return Err(Error::wrong_type("Stream", other.type_name())),
        };

        if dict.type_name() != Some("ObjStm") {
            return Err(Error::InvalidPdf(format!(
                "expected /Type /ObjStm, found {:?}",
                dict.type_name()
            )));
        }

        let count = dict
            .int_entry("N")
            .filter(|n| (0..=1_000_000).contains(n))
            .ok_or_else(|| Error::InvalidPdf("object stream /N missing or invalid".to_string()))?
            as usize;
        let first = dict
            .int_entry("First")
            .filter(|f| *f >= 0)
            .ok_or_else(|| Error::InvalidPdf("object stream /First missing or invalid".to_string()))?
            as usize;

        let data = stream.decode_stream_data_with_options(options)?;
        if data.len() < first {
            return Err(Error::InvalidPdf(format!(
                "object stream is {} bytes but /First is {}",
                data.len(),
                first
            )));
        }

        let (header, body) = data.split_at(first);
        let pairs = read_pairs(header, count)?;

        let objects = pairs
            .into_iter()
            .map(|(number, offset)| {
                let parsed = body
                    .get(offset..)
                    .and_then(|input| parse_object_with_options(input, options).ok())
                    .map(|(_, obj)| obj);
                if parsed.is_none() {
                    log::warn!("Object {} at offset {} in object stream is unreadable", number, offset);
                }
                (number, parsed)
            })
            .collect();

        Ok(Self { objects })
    }

    /// The object at `index`, if it exists, parsed, and carries the expected number.
    pub fn get(&self, index: usize, number: u32) -> Option<&Object> {
        match self.objects.get(index) {
            Some((n, Some(obj))) if *n == number => Some(obj),
            _ => self
                .objects
                .iter()
                .find(|(n, _)| *n == number)
                .and_then(|(_, obj)| obj.as_ref()),
        }
    }

    /// Number of objects declared by the stream.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the stream declared no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn read_pairs(mut input: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count);
    for i in 0..count {
        let (rest, number) = read_uint(input, i)?;
        let (rest, offset) = read_uint(rest, i)?;
        pairs.push((number as u32, offset as usize));
        input = rest;
    }
    Ok(pairs)
}

fn read_uint(input: &[u8], pair: usize) -> Result<(&[u8], u64)> {
    match token(input) {
        Ok((rest, Token::Integer(n))) if n >= 0 => Ok((rest, n as u64)),
        _ => Err(Error::ParseError {
            offset: 0,
            reason: format!("object stream header is malformed at pair {}", pair),
        }),
    }
}
