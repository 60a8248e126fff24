//! FlateDecode (zlib/deflate) via the flate2 crate.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

/// FlateDecode filter implementation.
///
/// Falls back to raw deflate when the zlib wrapper is damaged, and keeps
/// whatever prefix was recovered before a mid-stream error.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => return Ok(output),
            Err(e) => e,
        };

        if !output.is_empty() {
            log::warn!(
                "FlateDecode partial recovery: extracted {} bytes before corruption: {}",
                output.len(),
                zlib_err
            );
            return Ok(output);
        }

        log::debug!("Zlib decode failed ({}), trying raw deflate", zlib_err);
        output.clear();
        match DeflateDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => Ok(output),
            Err(_) if !output.is_empty() => {
                log::warn!("Raw deflate partial recovery: {} bytes", output.len());
                Ok(output)
            },
            Err(e) => Err(Error::Decode(format!(
                "FlateDecode failed: {}; raw deflate: {}",
                zlib_err, e
            ))),
        }
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}
