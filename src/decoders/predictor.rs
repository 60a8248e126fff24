//! Predictor functions for FlateDecode streams.
//!
//! Cross-reference streams are almost always written with PNG Up (12),
//! so the PNG family is implemented in full; TIFF predictor 2 is handled
//! for byte-sized components.

use crate::error::{Error, Result};

/// Decode parameters for stream decoders (`/DecodeParms`).
#[derive(Debug, Clone)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Number of columns (samples per row)
    pub columns: usize,
    /// Number of color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Bytes of sample data per row, excluding any PNG tag byte.
    ///
    /// Fails when the row would be empty or its size overflows.
    pub fn pixel_bytes_per_row(&self) -> Result<usize> {
        self.columns
            .checked_mul(self.colors)
            .and_then(|samples| samples.checked_mul(self.bits_per_component))
            .map(|bits| bits.div_ceil(8))
            .filter(|&bytes| bytes > 0)
            .ok_or_else(|| {
                Error::Decode(format!(
                    "Invalid predictor row: {} columns, {} colors, {} bits per component",
                    self.columns, self.colors, self.bits_per_component
                ))
            })
    }

    fn bytes_per_pixel(&self) -> usize {
        self.colors.saturating_mul(self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Reverse the predictor named in `params`.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => decode_tiff(data, params),
        10..=15 => decode_png(data, params),
        other => Err(Error::Decode(format!("Unsupported predictor: {}", other))),
    }
}

fn decode_tiff(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }

    let row_len = params.pixel_bytes_per_row()?;
    let bpp = params.bytes_per_pixel();
    let mut output = Vec::with_capacity(data.len());

    for row in data.chunks(row_len) {
        let start = output.len();
        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= bpp { output[start + i - bpp] } else { 0 };
            output.push(byte.wrapping_add(left));
        }
    }

    Ok(output)
}

fn decode_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let pixel_bytes = params.pixel_bytes_per_row()?;
    let row_len = pixel_bytes + 1;
    let bpp = params.bytes_per_pixel();

    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() % row_len != 0 {
        return Err(Error::Decode(format!(
            "Data length {} is not a multiple of row size {}",
            data.len(),
            row_len
        )));
    }

    let mut output: Vec<u8> = Vec::with_capacity(data.len() / row_len * pixel_bytes);
    let mut previous = vec![0u8; pixel_bytes];

    for row in data.chunks(row_len) {
        let tag = row[0];
        let encoded = &row[1..];
        let mut current = vec![0u8; pixel_bytes];

        for i in 0..pixel_bytes {
            let left = if i >= bpp { current[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };

            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => return Err(Error::Decode(format!("Invalid PNG predictor tag: {}", tag))),
            };
            current[i] = encoded[i].wrapping_add(predicted);
        }

        output.extend_from_slice(&current);
        previous = current;
    }

    Ok(output)
}

/// Paeth predictor function from the PNG specification.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_params(columns: usize) -> DecodeParams {
        DecodeParams {
            predictor: 12,
            columns,
            ..DecodeParams::default()
        }
    }

    #[test]
    fn test_png_up_rows() {
        // Two rows of 3 bytes, both tagged Up (2).
        let data = [2, 1, 2, 3, 2, 1, 1, 1];
        let out = decode_predictor(&data, &png_params(3)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_png_sub_row() {
        let data = [1, 5, 1, 1];
        let out = decode_predictor(&data, &png_params(3)).unwrap();
        assert_eq!(out, vec![5, 6, 7]);
    }

    #[test]
    fn test_png_rejects_ragged_rows() {
        assert!(decode_predictor(&[2, 0, 0], &png_params(3)).is_err());
    }

    #[test]
    fn test_tiff_predictor() {
        let params = DecodeParams {
            predictor: 2,
            columns: 3,
            ..DecodeParams::default()
        };
        assert_eq!(decode_predictor(&[1, 1, 1], &params).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_rows_are_rejected() {
        for predictor in [2, 12] {
            let params = DecodeParams {
                predictor,
                columns: 0,
                ..DecodeParams::default()
            };
            assert!(matches!(decode_predictor(&[1, 2, 3], &params), Err(Error::Decode(_))));
        }
    }

    #[test]
    fn test_row_size_overflow_is_rejected() {
        let params = DecodeParams {
            predictor: 2,
            columns: usize::MAX,
            colors: 3,
            ..DecodeParams::default()
        };
        assert!(params.pixel_bytes_per_row().is_err());
        assert!(decode_predictor(&[1, 2, 3], &params).is_err());
    }

    #[test]
    fn test_huge_png_row_with_no_data() {
        let params = png_params(usize::MAX / 16);
        assert_eq!(decode_predictor(&[], &params).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_no_predictor_is_identity() {
        assert_eq!(decode_predictor(&[9, 8], &DecodeParams::default()).unwrap(), vec![9, 8]);
    }
}
