//! ASCIIHexDecode (ISO 32000-1:2008, Section 7.4.2).

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCIIHexDecode filter.
///
/// Whitespace is skipped, `>` ends the data, and a trailing odd digit is
/// treated as if followed by `0`.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let digits: Vec<u8> = input
            .iter()
            .copied()
            .take_while(|&c| c != b'>')
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        digits
            .chunks(2)
            .map(|pair| {
                let high = nibble(pair[0])?;
                let low = match pair.get(1) {
                    Some(&c) => nibble(c)?,
                    None => 0,
                };
                Ok((high << 4) | low)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

fn nibble(digit: u8) -> Result<u8> {
    (digit as char)
        .to_digit(16)
        .map(|v| v as u8)
        .ok_or_else(|| Error::Decode(format!("ASCIIHexDecode: invalid hex digit '{}'", digit as char)))
}
