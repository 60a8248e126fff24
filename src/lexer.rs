//! PDF lexer (tokenizer).
//!
//! Splits a byte slice into PDF tokens: numbers, literal and hexadecimal
//! strings, names, delimiters and bare keywords. Whitespace and `%` comments
//! between tokens are skipped.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.2 - Lexical Conventions

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, opt, recognize, value},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// Token types recognized by the lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g. 42, -123)
    Integer(i64),

    /// Real number (e.g. 3.14, -.5, 7.)
    Real(f64),

    /// Raw bytes between `(` and `)`, escapes not yet decoded
    LiteralString(&'a [u8]),

    /// Raw bytes between `<` and `>`, whitespace preserved
    HexString(&'a [u8]),

    /// Name with `#XX` escapes decoded, without the leading `/`
    Name(String),

    /// `true`
    True,

    /// `false`
    False,

    /// `null`
    Null,

    /// `[`
    ArrayStart,

    /// `]`
    ArrayEnd,

    /// `<<`
    DictStart,

    /// `>>`
    DictEnd,

    /// `obj`
    ObjStart,

    /// `endobj`
    ObjEnd,

    /// `stream`
    StreamStart,

    /// `endstream`
    StreamEnd,

    /// `R`
    R,

    /// Any other bare word (`xref`, `trailer`, `startxref`, `n`, `f`, ...)
    Keyword(&'a [u8]),
}

/// PDF whitespace characters (Table 1).
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter characters (Table 2).
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Anything that is neither whitespace nor a delimiter.
pub fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip any run of whitespace and comments.
pub fn skip_ws(input: &[u8]) -> &[u8] {
    let mut remaining = input;
    loop {
        let start = remaining
            .iter()
            .position(|&c| !is_whitespace(c))
            .unwrap_or(remaining.len());
        remaining = &remaining[start..];
        match comment(remaining) {
            Ok((rest, _)) => remaining = rest,
            Err(_) => return remaining,
        }
    }
}

fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)?;

    let fail = || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit));

    // "12abc" is a bare word, not a number followed by garbage
    if rest.first().is_some_and(|&c| is_regular(c)) {
        return Err(fail());
    }

    let text = std::str::from_utf8(text).map_err(|_| fail())?;
    if text.contains('.') {
        let normalized = if text.ends_with('.') {
            format!("{}0", text)
        } else {
            text.to_string()
        };
        let num: f64 = normalized.parse().map_err(|_| fail())?;
        Ok((rest, Token::Real(num)))
    } else {
        match text.parse::<i64>() {
            Ok(num) => Ok((rest, Token::Integer(num))),
            // Out-of-range integers are demoted to reals, as Acrobat does
            Err(_) => text.parse::<f64>().map(|r| (rest, Token::Real(r))).map_err(|_| fail()),
        }
    }
}

/// Literal string with balanced parentheses; escapes are skipped, not decoded.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0;

    while pos < body.len() {
        match body[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[pos + 1..], Token::LiteralString(&body[..pos])));
                }
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)))
}

fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    delimited(
        char('<'),
        map(take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)), Token::HexString),
        char('>'),
    )(input)
}

/// Decode `#XX` escape sequences in a raw name.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.5 - Name Objects
///
/// Malformed escapes are kept literally. The decoded bytes are read as
/// UTF-8 where possible.
///
/// ```
/// # use pdf_formkit::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes(b"A#ZZ"), "A#ZZ");
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hex = &raw[i + 1..i + 3];
            if hex.iter().all(u8::is_ascii_hexdigit) {
                out.push((hex_value(hex[0]) << 4) | hex_value(hex[1]));
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(take_while(is_regular), |raw: &[u8]| Token::Name(decode_name_escapes(raw))),
    )(input)
}

fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
    ))(input)
}

fn parse_word(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(take_while1(is_regular), |word: &[u8]| match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        other => Token::Keyword(other),
    })(input)
}

/// Parse a single token after skipping whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((
        parse_delimiter,
        parse_name,
        parse_literal_string,
        parse_hex_string,
        parse_number,
        parse_word,
    ))(input)
}
