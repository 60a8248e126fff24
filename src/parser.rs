//! PDF object parser.
//!
//! Recursive descent over the lexer's tokens. Composite objects are
//! parsed with an explicit depth counter so hostile nesting fails with an
//! error instead of overflowing the stack.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::parser_config::ParserOptions;
use nom::IResult;

/// Decode escape sequences in a literal string.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.4.2 - Literal Strings
///
/// ```
/// # use pdf_formkit::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"Section \\247 1"), b"Section \xa7 1");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let c = raw[i];
        if c != b'\\' || i + 1 >= raw.len() {
            // A bare end-of-line inside a string is always read as LF
            if c == b'\r' {
                out.push(b'\n');
                if raw.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            } else {
                out.push(c);
            }
            i += 1;
            continue;
        }

        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(next),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut code = (next - b'0') as u32;
                let mut digits = 1;
                while digits < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            code = code * 8 + (d - b'0') as u32;
                            i += 1;
                            digits += 1;
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            // Unknown escapes drop the backslash
            other => out.push(other),
        }
    }

    out
}

/// Decode the body of a hexadecimal string; an odd final digit is padded with 0.
///
/// ```
/// # use pdf_formkit::parser::decode_hex;
/// assert_eq!(decode_hex(b"48 65 6C 6C 6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"901FA").unwrap(), vec![0x90, 0x1F, 0xA0]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes
        .iter()
        .copied()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_digit(pair[0])?;
            let lo = match pair.get(1) {
                Some(&c) => hex_digit(c)?,
                None => 0,
            };
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn hex_digit(c: u8) -> Result<u8> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("invalid hex digit {:?}", c as char),
        })
}

type NomError<'a> = nom::Err<nom::error::Error<&'a [u8]>>;

fn fail(input: &[u8], kind: nom::error::ErrorKind) -> NomError<'_> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Parse one direct object with default (lenient) options.
///
/// ```
/// use pdf_formkit::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /Fields [1 0 R 2 0 R] >>").unwrap();
/// assert_eq!(obj.as_dict().unwrap().array_entry("Fields").unwrap().len(), 2);
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_object_with_options(input, &ParserOptions::default())
}

/// Parse one direct object, honouring the nesting and stream options.
pub fn parse_object_with_options<'a>(
    input: &'a [u8],
    options: &ParserOptions,
) -> IResult<&'a [u8], Object> {
    parse_value(input, options, 0)
}

fn parse_value<'a>(input: &'a [u8], options: &ParserOptions, depth: usize) -> IResult<&'a [u8], Object> {
    let (rest, tok) = token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(raw) => match decode_hex(raw) {
            Ok(bytes) => Ok((rest, Object::String(bytes))),
            Err(_) => Err(fail(input, nom::error::ErrorKind::HexDigit)),
        },
        Token::Integer(i) => {
            // "N G R" is a reference; anything else leaves the integer alone
            if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if (0..=u32::MAX as i64).contains(&i) && (0..=u16::MAX as i64).contains(&gen) {
                        return Ok((after_r, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                    }
                }
            }
            Ok((rest, Object::Integer(i)))
        },
        Token::ArrayStart => {
            check_depth(input, options, depth)?;
            parse_array(rest, options, depth + 1)
        },
        Token::DictStart => {
            check_depth(input, options, depth)?;
            let (after_dict, dict) = parse_dictionary_body(rest, options, depth + 1)?;
            match token(after_dict) {
                Ok((after_kw, Token::StreamStart)) => {
                    let (after_stream, data) = parse_stream_data(after_kw, &dict, options)?;
                    Ok((
                        after_stream,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::from(data),
                        },
                    ))
                },
                _ => Ok((after_dict, Object::Dictionary(dict))),
            }
        },
        _ => Err(fail(input, nom::error::ErrorKind::Tag)),
    }
}

fn check_depth<'a>(
    input: &'a [u8],
    options: &ParserOptions,
    depth: usize,
) -> std::result::Result<(), NomError<'a>> {
    if depth >= options.max_nesting {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }
    Ok(())
}

fn parse_array<'a>(input: &'a [u8], options: &ParserOptions, depth: usize) -> IResult<&'a [u8], Object> {
    let mut items = Vec::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::ArrayEnd)) => return Ok((rest, Object::Array(items))),
            Ok(_) => {
                let (rest, item) = parse_value(remaining, options, depth)?;
                items.push(item);
                remaining = rest;
            },
            Err(nom::Err::Failure(e)) => return Err(nom::Err::Failure(e)),
            Err(_) if !options.strict && crate::lexer::skip_ws(remaining).is_empty() => {
                log::warn!("Unterminated array at end of input, keeping {} items", items.len());
                return Ok((remaining, Object::Array(items)));
            },
            Err(e) => return Err(e),
        }
    }
}

/// Parse dictionary entries up to and including `>>`.
fn parse_dictionary_body<'a>(
    input: &'a [u8],
    options: &ParserOptions,
    depth: usize,
) -> IResult<&'a [u8], Dictionary> {
    let mut dict = Dictionary::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::DictEnd)) => return Ok((rest, dict)),
            Ok((rest, Token::Name(key))) => match parse_value(rest, options, depth) {
                Ok((after_value, value)) => {
                    dict.insert(key, value);
                    remaining = after_value;
                },
                // "/Key >>" with the value missing
                Err(nom::Err::Error(_)) if !options.strict => {
                    log::warn!("Dictionary key /{} has no value, ignoring it", key);
                    remaining = rest;
                },
                Err(e) => return Err(e),
            },
            Ok(_) => return Err(fail(remaining, nom::error::ErrorKind::Tag)),
            Err(nom::Err::Failure(e)) => return Err(nom::Err::Failure(e)),
            Err(_) if !options.strict && crate::lexer::skip_ws(remaining).is_empty() => {
                log::warn!("Unterminated dictionary at end of input, keeping {} entries", dict.len());
                return Ok((remaining, dict));
            },
            Err(e) => return Err(e),
        }
    }
}

/// Read stream bytes following the `stream` keyword.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.8.1 - Stream Objects
///
/// A direct `/Length` is trusted when `endstream` follows it. An indirect
/// `/Length` cannot be resolved at this level, so the data is delimited by
/// scanning for `endstream`; a wrong direct `/Length` falls back to the
/// same scan in lenient mode.
fn parse_stream_data<'a>(
    input: &'a [u8],
    dict: &Dictionary,
    options: &ParserOptions,
) -> IResult<&'a [u8], Vec<u8>> {
    let input = if let Some(rest) = input.strip_prefix(b"\r\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\r") {
        log::warn!("Stream keyword followed by CR alone (ISO 32000-1:2008, Section 7.3.8.1)");
        rest
    } else {
        input
    };

    let direct_length = dict.int_entry("Length").filter(|&len| len >= 0).map(|len| len as usize);

    if let Some(length) = direct_length {
        if length <= input.len() {
            if let Ok((rest, Token::StreamEnd)) = token(&input[length..]) {
                return Ok((rest, input[..length].to_vec()));
            }
        }
        if options.strict && !options.allow_malformed_streams {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )));
        }
        log::warn!("Stream /Length {} does not end at endstream, scanning instead", length);
    } else if dict.get("Length").and_then(Object::as_reference).is_none() {
        if options.strict && !options.allow_malformed_streams {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )));
        }
        log::warn!("Stream without a usable /Length, scanning for endstream");
    }

    let keyword = b"endstream";
    let pos = input
        .windows(keyword.len())
        .position(|window| window == keyword)
        .ok_or_else(|| fail(input, nom::error::ErrorKind::Eof))?;

    let mut data = &input[..pos];
    if let Some(trimmed) = data.strip_suffix(b"\r\n") {
        data = trimmed;
    } else if let Some(trimmed) = data.strip_suffix(b"\n").or_else(|| data.strip_suffix(b"\r")) {
        data = trimmed;
    }

    Ok((&input[pos + keyword.len()..], data.to_vec()))
}

fn parse_error(data: &[u8], remaining: &[u8], reason: impl Into<String>) -> Error {
    Error::ParseError {
        offset: data.len() - remaining.len(),
        reason: reason.into(),
    }
}

fn parse_object_header(input: &[u8]) -> IResult<&[u8], (i64, i64)> {
    let (input, id) = token(input)?;
    let (input, gen) = token(input)?;
    let (input, kw) = token(input)?;
    match (id, gen, kw) {
        (Token::Integer(id), Token::Integer(gen), Token::ObjStart) => Ok((input, (id, gen))),
        _ => Err(fail(input, nom::error::ErrorKind::Tag)),
    }
}

/// Parse `N G obj ... endobj` starting at `offset`.
///
/// A missing `endobj` is tolerated in lenient mode.
pub fn parse_indirect_object(
    data: &[u8],
    offset: usize,
    options: &ParserOptions,
) -> Result<(ObjectRef, Object)> {
    let input = data.get(offset..).ok_or_else(|| Error::ParseError {
        offset,
        reason: "offset beyond end of file".to_string(),
    })?;

    let (rest, (id, gen)) = parse_object_header(input).map_err(|_| Error::ParseError {
        offset,
        reason: "expected 'N G obj'".to_string(),
    })?;

    if !(0..=u32::MAX as i64).contains(&id) || !(0..=u16::MAX as i64).contains(&gen) {
        return Err(parse_error(data, rest, format!("object number {} {} out of range", id, gen)));
    }
    let reference = ObjectRef::new(id as u32, gen as u16);

    let (rest, object) = match parse_object_with_options(rest, options) {
        Ok(parsed) => parsed,
        // "N G obj endobj" is an empty object
        Err(_) if matches!(token(rest), Ok((_, Token::ObjEnd))) => (rest, Object::Null),
        Err(nom::Err::Failure(e)) if e.code == nom::error::ErrorKind::TooLarge => {
            return Err(Error::RecursionLimitExceeded(options.max_nesting as u32));
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(parse_error(data, e.input, format!("malformed body of {}", reference)));
        },
        Err(nom::Err::Incomplete(_)) => {
            return Err(parse_error(data, &[], format!("truncated body of {}", reference)));
        },
    };

    match token(rest) {
        Ok((_, Token::ObjEnd)) => {},
        _ if options.strict => {
            return Err(parse_error(data, rest, format!("missing endobj after {}", reference)));
        },
        _ => log::debug!("Object {} has no endobj", reference),
    }

    Ok((reference, object))
}
