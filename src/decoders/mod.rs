//! Stream decoder implementations for PDF filters.
//!
//! Form processing only has to look inside two kinds of streams:
//! cross-reference streams and object streams. Both are FlateDecode
//! (optionally with a PNG predictor) in practice, so that is what
//! this module carries, plus ASCIIHexDecode for hand-written files.
//! Every other stream is passed through the object graph untouched.

use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;

mod ascii_hex;
mod flate;
mod predictor;

pub use ascii_hex::AsciiHexDecoder;
pub use flate::FlateDecoder;
pub use predictor::{decode_predictor, DecodeParams};

/// Trait for PDF stream decoders.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this decoder (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

fn decoder_for(filter_name: &str) -> Result<Box<dyn StreamDecoder>> {
    match filter_name {
        "FlateDecode" | "Fl" => Ok(Box::new(FlateDecoder)),
        "ASCIIHexDecode" | "AHx" => Ok(Box::new(AsciiHexDecoder)),
        _ => Err(Error::UnsupportedFilter(filter_name.to_string())),
    }
}

/// Decode stream data using a filter pipeline with optional decode parameters.
///
/// Filters are applied in order, then the predictor (if any).
pub fn decode_stream_with_params(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
) -> Result<Vec<u8>> {
    decode_stream_with_options(data, filters, params, &ParserOptions::default())
}

/// Decode stream data, enforcing the decompression limits in `options`.
///
/// # Security
///
/// A ratio above `max_decompression_ratio` or an output larger than
/// `max_decompressed_size` is rejected as a decompression bomb. A limit
/// of zero disables that check.
pub fn decode_stream_with_options(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
    options: &ParserOptions,
) -> Result<Vec<u8>> {
    let compressed_size = data.len();
    let mut current = data.to_vec();

    for filter_name in filters {
        let decoder = decoder_for(filter_name)?;
        current = decoder.decode(&current)?;

        if options.max_decompression_ratio > 0 && compressed_size > 0 {
            let ratio = current.len() as u64 / compressed_size as u64;
            if ratio > options.max_decompression_ratio as u64 {
                return Err(Error::Decode(format!(
                    "Decompression bomb detected: ratio {}:1 exceeds limit {}:1",
                    ratio, options.max_decompression_ratio
                )));
            }
        }

        if options.max_decompressed_size > 0 && current.len() > options.max_decompressed_size {
            return Err(Error::Decode(format!(
                "Decompression bomb detected: decompressed size {} bytes exceeds limit {} bytes",
                current.len(),
                options.max_decompressed_size
            )));
        }
    }

    if let Some(params) = params {
        if params.predictor != 1 {
            current = decode_predictor(&current, params)?;
        }
    }

    Ok(current)
}
