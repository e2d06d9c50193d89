//! LZWDecode filter (ISO 32000-1 Section 7.4.4)

use crate::parser::{ParseError, ParseResult};

const CLEAR_TABLE: usize = 256;
const END_OF_DATA: usize = 257;
const MAX_TABLE: usize = 4096;

struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    buffer: u32,
    bits: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            buffer: 0,
            bits: 0,
        }
    }

    fn read(&mut self, width: u32) -> Option<usize> {
        while self.bits < width {
            let byte = *self.data.get(self.position)?;
            self.position += 1;
            self.buffer = (self.buffer << 8) | u32::from(byte);
            self.bits += 8;
        }
        self.bits -= width;
        let code = (self.buffer >> self.bits) & ((1 << width) - 1);
        Some(code as usize)
    }
}

fn reset_table(table: &mut Vec<Vec<u8>>) {
    table.clear();
    table.extend((0..=255u8).map(|b| vec![b]));
    // Placeholders for the clear and end-of-data codes
    table.push(Vec::new());
    table.push(Vec::new());
}

fn code_width(next_code: usize) -> u32 {
    match next_code {
        n if n >= 2048 => 12,
        n if n >= 1024 => 11,
        n if n >= 512 => 10,
        _ => 9,
    }
}

/// Decode LZW data. `early_change` follows the `/EarlyChange` parameter
/// (default true): code widths grow one code early.
///
/// Data cut short or a corrupt code ends decoding; what was decoded so far is
/// returned as long as anything was decoded.
pub fn decode_lzw(data: &[u8], early_change: bool) -> ParseResult<Vec<u8>> {
    let early = usize::from(early_change);
    let mut table: Vec<Vec<u8>> = Vec::with_capacity(MAX_TABLE);
    reset_table(&mut table);

    let mut reader = BitReader::new(data);
    let mut output = Vec::with_capacity(data.len() * 2);
    let mut width = 9;
    let mut previous: Option<usize> = None;

    while let Some(code) = reader.read(width) {
        if code == CLEAR_TABLE {
            reset_table(&mut table);
            width = 9;
            previous = None;
            continue;
        }
        if code == END_OF_DATA {
            break;
        }

        let entry = if code < table.len() {
            let entry = table[code].clone();
            if let Some(prev) = previous {
                if table.len() < MAX_TABLE {
                    let mut next = table[prev].clone();
                    next.push(entry[0]);
                    table.push(next);
                }
            }
            entry
        } else if code == table.len() {
            let prev = match previous {
                Some(prev) => prev,
                None => break,
            };
            let mut entry = table[prev].clone();
            entry.push(table[prev][0]);
            if table.len() < MAX_TABLE {
                table.push(entry.clone());
            }
            entry
        } else {
            if output.is_empty() {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid LZW code {code}"
                )));
            }
            tracing::debug!("LZW stream ends with invalid code {}", code);
            break;
        };

        output.extend_from_slice(&entry);
        previous = Some(code);
        width = code_width(table.len() + early).min(12);
    }

    Ok(output)
}
