//! Predictor functions for FlateDecode and LZWDecode (ISO 32000-1 Section 7.4.4.4)

use crate::parser::objects::PdfDictionary;
use crate::parser::{ParseError, ParseResult};

/// Predictor parameters from a `/DecodeParms` dictionary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub fn from_dict(params: &PdfDictionary) -> Self {
        let get = |key: &str, default: i64| {
            params
                .get(key)
                .and_then(|obj| obj.as_integer())
                .unwrap_or(default)
        };
        let defaults = Self::default();
        Self {
            predictor: get("Predictor", defaults.predictor),
            colors: get("Colors", 1).clamp(1, 32) as usize,
            bits_per_component: get("BitsPerComponent", 8).clamp(1, 16) as usize,
            columns: get("Columns", 1).clamp(1, 1 << 20) as usize,
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        ((self.colors * self.bits_per_component).div_ceil(8)).max(1)
    }

    fn row_length(&self) -> usize {
        (self.colors * self.bits_per_component * self.columns).div_ceil(8)
    }
}

/// Undo the predictor declared in `params`, if any
pub fn apply_predictor(data: Vec<u8>, params: &PdfDictionary) -> ParseResult<Vec<u8>> {
    let params = PredictorParams::from_dict(params);
    match params.predictor {
        1 => Ok(data),
        2 => decode_tiff(data, &params),
        10..=15 => decode_png(&data, &params),
        other => Err(ParseError::StreamDecodeError(format!(
            "Unknown predictor {other}"
        ))),
    }
}

fn decode_tiff(mut data: Vec<u8>, params: &PredictorParams) -> ParseResult<Vec<u8>> {
    if params.bits_per_component != 8 {
        tracing::debug!(
            "TIFF predictor with {} bits per component left undecoded",
            params.bits_per_component
        );
        return Ok(data);
    }
    let bpp = params.bytes_per_pixel();
    let row_len = params.row_length();
    for row in data.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(data)
}

fn decode_png(data: &[u8], params: &PredictorParams) -> ParseResult<Vec<u8>> {
    let bpp = params.bytes_per_pixel();
    let row_len = params.row_length();
    let mut output = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&filter_type, encoded) = match chunk.split_first() {
            Some(split) => split,
            None => break,
        };
        let mut row = vec![0u8; encoded.len()];

        for i in 0..encoded.len() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            let predicted = match filter_type {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(ParseError::StreamDecodeError(format!(
                        "Invalid PNG filter type {other}"
                    )))
                }
            };
            row[i] = encoded[i].wrapping_add(predicted);
        }

        output.extend_from_slice(&row);
        previous[..row.len()].copy_from_slice(&row);
    }

    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
