//! Stream filters needed to read cross-reference and object streams

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::{trace, warn};

use crate::error::{PdfGuardError, PdfGuardResult};
use crate::pdf::Dictionary;

/// PDF stream filters the container reader can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    ASCIIHexDecode,
    FlateDecode,
}

/// Predictor parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: u8,
    pub columns: usize,
    pub colors: usize,
    pub bits_per_component: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl PredictorParams {
    pub fn from_dict(params: &Dictionary) -> Self {
        let defaults = Self::default();
        Self {
            predictor: params
                .get_integer("Predictor")
                .map_or(defaults.predictor, |p| u8::try_from(p).unwrap_or(u8::MAX)),
            columns: params
                .get_integer("Columns")
                .map_or(defaults.columns, |c| c.max(1) as usize),
            colors: params
                .get_integer("Colors")
                .map_or(defaults.colors, |c| c.max(1) as usize),
            bits_per_component: params
                .get_integer("BitsPerComponent")
                .map_or(defaults.bits_per_component, |b| b.max(1) as usize),
        }
    }
}

impl Filter {
    /// Create filter from name
    pub fn from_name(name: &[u8]) -> PdfGuardResult<Self> {
        match name {
            b"ASCIIHexDecode" | b"AHx" => Ok(Filter::ASCIIHexDecode),
            b"FlateDecode" | b"Fl" => Ok(Filter::FlateDecode),
            other => Err(PdfGuardError::malformed(format!(
                "unsupported stream filter: {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Decode data using this filter
    pub fn decode(&self, data: &[u8], params: Option<&PredictorParams>) -> PdfGuardResult<Vec<u8>> {
        let result = match self {
            Filter::ASCIIHexDecode => decode_ascii_hex(data)?,
            Filter::FlateDecode => decode_flate(data)?,
        };

        match params {
            Some(p) if p.predictor > 1 => apply_predictor(&result, p),
            _ => Ok(result),
        }
    }
}

fn decode_ascii_hex(data: &[u8]) -> PdfGuardResult<Vec<u8>> {
    let mut digits = Vec::with_capacity(data.len());
    for &b in data {
        match b {
            b'>' => break,
            b if b.is_ascii_hexdigit() => digits.push(b),
            b if b.is_ascii_whitespace() || b == 0 => continue,
            other => {
                return Err(PdfGuardError::malformed(format!(
                    "invalid byte 0x{:02X} in ASCIIHex stream",
                    other
                )))
            }
        }
    }
    if digits.len() % 2 != 0 {
        digits.push(b'0');
    }
    hex::decode(&digits).map_err(|e| PdfGuardError::malformed(format!("ASCIIHex stream: {}", e)))
}

fn decode_flate(data: &[u8]) -> PdfGuardResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut output = Vec::with_capacity(data.len() * 2);

    match decoder.read_to_end(&mut output) {
        Ok(_) => Ok(output),
        // Truncated deflate data is common; keep what inflated cleanly.
        Err(e) if !output.is_empty() => {
            warn!("Flate stream ended early ({}), using {} decoded bytes", e, output.len());
            Ok(output)
        }
        Err(e) => Err(PdfGuardError::malformed(format!("FlateDecode failed: {}", e))),
    }
}

// Predictor Implementation
fn apply_predictor(data: &[u8], params: &PredictorParams) -> PdfGuardResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let too_large = || PdfGuardError::malformed("predictor /DecodeParms describe rows larger than the stream");
    let bits_per_pixel = params
        .colors
        .checked_mul(params.bits_per_component)
        .ok_or_else(too_large)?;
    let bits_per_row = params.columns.checked_mul(bits_per_pixel).ok_or_else(too_large)?;
    let bytes_per_pixel = bits_per_pixel / 8 + usize::from(bits_per_pixel % 8 != 0);
    let bytes_per_row = bits_per_row / 8 + usize::from(bits_per_row % 8 != 0);
    if bytes_per_row > data.len() {
        return Err(too_large());
    }
    trace!(
        "Applying predictor {} ({} bytes per row)",
        params.predictor,
        bytes_per_row
    );

    let mut output = Vec::with_capacity(data.len());

    match params.predictor {
        2 => {
            // TIFF Predictor
            for row in data.chunks(bytes_per_row) {
                let start = output.len();
                for (i, &byte) in row.iter().enumerate() {
                    let left = if i >= bytes_per_pixel {
                        output[start + i - bytes_per_pixel]
                    } else {
                        0
                    };
                    output.push(byte.wrapping_add(left));
                }
            }
            Ok(output)
        }
        10..=15 => {
            // PNG Predictors, one filter-type byte per row
            let mut prev_row = vec![0u8; bytes_per_row];
            let mut row_out = vec![0u8; bytes_per_row];

            for row in data.chunks(bytes_per_row + 1) {
                if row.len() < 2 {
                    break;
                }
                let filter_type = row[0];
                let row_data = &row[1..];

                for i in 0..row_data.len() {
                    let left = if i >= bytes_per_pixel {
                        row_out[i - bytes_per_pixel]
                    } else {
                        0
                    };
                    let up = prev_row[i];
                    let up_left = if i >= bytes_per_pixel {
                        prev_row[i - bytes_per_pixel]
                    } else {
                        0
                    };

                    let predicted = match filter_type {
                        0 => 0,
                        1 => left,
                        2 => up,
                        3 => ((left as u16 + up as u16) / 2) as u8,
                        4 => paeth(left, up, up_left),
                        other => {
                            return Err(PdfGuardError::malformed(format!(
                                "invalid PNG filter type {}",
                                other
                            )))
                        }
                    };
                    row_out[i] = row_data[i].wrapping_add(predicted);
                }

                output.extend_from_slice(&row_out[..row_data.len()]);
                prev_row[..row_data.len()].copy_from_slice(&row_out[..row_data.len()]);
            }
            Ok(output)
        }
        other => Err(PdfGuardError::malformed(format!("invalid predictor {}", other))),
    }
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i16 + up as i16 - up_left as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - up as i16).abs();
    let pc = (p - up_left as i16).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}
