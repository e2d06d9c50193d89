//! PDF Stream Filters
//!
//! Handles decompression and decoding of PDF streams according to ISO 32000-1 Section 7.4

use super::filter_impls::{apply_predictor, decode_lzw};
use super::objects::{PdfDictionary, PdfObject};
use super::{ParseError, ParseResult};

#[cfg(feature = "compression")]
use flate2::read::{DeflateDecoder, ZlibDecoder};
#[cfg(feature = "compression")]
use std::io::Read;

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// ASCII 85 decode
    ASCII85Decode,

    /// LZW decode
    LZWDecode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,

    /// Run length decode
    RunLengthDecode,

    /// CCITT fax decode
    CCITTFaxDecode,

    /// JBIG2 decode
    JBIG2Decode,

    /// DCT decode (JPEG)
    DCTDecode,

    /// JPX decode (JPEG 2000)
    JPXDecode,

    /// Crypt filter
    Crypt,
}

impl Filter {
    /// Parse filter from name, including the abbreviations allowed in inline images
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "JPXDecode" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    /// Image compression filters; their output is never text
    pub fn is_image_filter(&self) -> bool {
        matches!(
            self,
            Filter::CCITTFaxDecode | Filter::JBIG2Decode | Filter::DCTDecode | Filter::JPXDecode
        )
    }
}

/// The filter chain of a stream dictionary, each filter paired with its
/// `/DecodeParms` entry
pub fn filter_chain(dict: &PdfDictionary) -> ParseResult<Vec<(Filter, Option<&PdfDictionary>)>> {
    let names: Vec<&str> = match dict.get("Filter") {
        None | Some(PdfObject::Null) => return Ok(Vec::new()),
        Some(PdfObject::Name(name)) => vec![name.as_str()],
        Some(PdfObject::Array(array)) => array
            .iter()
            .map(|obj| {
                obj.as_name()
                    .map(|n| n.as_str())
                    .ok_or_else(|| ParseError::StreamDecodeError("Invalid filter in array".to_string()))
            })
            .collect::<ParseResult<_>>()?,
        Some(other) => {
            return Err(ParseError::StreamDecodeError(format!(
                "Invalid Filter type: {}",
                other.type_name()
            )))
        }
    };

    let params = dict.get("DecodeParms").or_else(|| dict.get("DP"));
    let param_at = |index: usize| -> Option<&PdfDictionary> {
        match params {
            Some(PdfObject::Dictionary(d)) if index == 0 => Some(d),
            Some(PdfObject::Array(array)) => array.get(index).and_then(|obj| obj.as_dict()),
            _ => None,
        }
    };

    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            Filter::from_name(name)
                .map(|filter| (filter, param_at(index)))
                .ok_or_else(|| ParseError::UnsupportedFilter(name.to_string()))
        })
        .collect()
}

/// Decode stream data according to specified filters
pub fn decode_stream(data: &[u8], dict: &PdfDictionary) -> ParseResult<Vec<u8>> {
    let chain = filter_chain(dict)?;
    if chain.is_empty() {
        return Ok(data.to_vec());
    }

    let mut result = data.to_vec();
    for (filter, params) in chain {
        result = apply_filter(&result, filter, params)?;
    }
    Ok(result)
}

/// Apply a single filter to data
pub fn apply_filter(
    data: &[u8],
    filter: Filter,
    params: Option<&PdfDictionary>,
) -> ParseResult<Vec<u8>> {
    let decoded = match filter {
        Filter::FlateDecode => decode_flate(data)?,
        Filter::LZWDecode => {
            let early_change = params
                .and_then(|p| p.get("EarlyChange"))
                .and_then(|obj| obj.as_integer())
                .unwrap_or(1)
                != 0;
            decode_lzw(data, early_change)?
        }
        Filter::ASCIIHexDecode => return decode_ascii_hex(data),
        Filter::ASCII85Decode => return decode_ascii85(data),
        Filter::RunLengthDecode => return Ok(decode_run_length(data)),
        // Decryption happens when the object is loaded
        Filter::Crypt => return Ok(data.to_vec()),
        image => return Err(ParseError::UnsupportedFilter(format!("{image:?}"))),
    };

    match params {
        Some(params) => apply_predictor(decoded, params),
        None => Ok(decoded),
    }
}

/// Decode FlateDecode (zlib/deflate) compressed data.
///
/// Corrupt or truncated streams yield the prefix that could be inflated.
#[cfg(feature = "compression")]
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut result) {
        Ok(_) => return Ok(result),
        Err(e) if !result.is_empty() => {
            tracing::debug!("flate stream truncated after {} bytes: {}", result.len(), e);
            return Ok(result);
        }
        Err(_) => {}
    }

    // Some producers omit the zlib header
    let mut raw = Vec::new();
    match DeflateDecoder::new(data).read_to_end(&mut raw) {
        Ok(_) => Ok(raw),
        Err(_) if !raw.is_empty() => Ok(raw),
        Err(e) => Err(ParseError::StreamDecodeError(format!(
            "Flate decode error: {e}"
        ))),
    }
}

#[cfg(not(feature = "compression"))]
fn decode_flate(_data: &[u8]) -> ParseResult<Vec<u8>> {
    Err(ParseError::UnsupportedFilter(
        "FlateDecode requires the 'compression' feature".to_string(),
    ))
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;

    for &ch in data {
        if ch == b'>' {
            break;
        }
        if ch.is_ascii_whitespace() || ch == 0 {
            continue;
        }
        let value = hex_digit_value(ch).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", ch as char))
        })?;
        match pending.take() {
            Some(high) => result.push((high << 4) | value),
            None => pending = Some(value),
        }
    }

    // Odd number of digits: pad with 0
    if let Some(high) = pending {
        result.push(high << 4);
    }
    Ok(result)
}

/// Get value of hex digit
fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

fn ascii85_group_value(group: &[u8]) -> u64 {
    group
        .iter()
        .fold(0u64, |acc, &ch| acc * 85 + u64::from(ch - b'!'))
}

/// Decode ASCII85Decode data
fn decode_ascii85(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = Vec::with_capacity(5);

    let body = data
        .iter()
        .position(|&b| !b.is_ascii_whitespace())
        .map(|start| &data[start..])
        .unwrap_or(&[]);
    let body = body.strip_prefix(b"<~").unwrap_or(body);

    let mut iter = body.iter().copied().filter(|b| !b.is_ascii_whitespace());
    while let Some(c) = iter.next() {
        match c {
            b'~' => break,
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    let value = ascii85_group_value(&group) as u32;
                    result.extend_from_slice(&value.to_be_bytes());
                    group.clear();
                }
            }
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )));
            }
        }
    }

    // Handle incomplete final group
    if group.len() > 1 {
        let emitted = group.len() - 1;
        group.resize(5, b'u');
        let value = ascii85_group_value(&group) as u32;
        result.extend_from_slice(&value.to_be_bytes()[..emitted]);
    }

    Ok(result)
}

/// Decode RunLengthDecode data
fn decode_run_length(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let count = usize::from(length) + 1;
                let end = (i + count).min(data.len());
                result.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                if let Some(&byte) = data.get(i) {
                    result.extend(std::iter::repeat(byte).take(257 - usize::from(length)));
                }
                i += 1;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::objects::{PdfArray, PdfName};

    fn dict_with_filter(filter: PdfObject) -> PdfDictionary {
        let mut dict = PdfDictionary::new();
        dict.insert("Filter", filter);
        dict
    }

    #[test]
    fn test_ascii_hex_decode() {
        assert_eq!(decode_ascii_hex(b"48656C6C6F>").unwrap(), b"Hello");
        assert_eq!(decode_ascii_hex(b"48 65 6C 6C 6F>").unwrap(), b"Hello");
        assert_eq!(decode_ascii_hex(b"48656C6C6>").unwrap(), b"Hell`");
        assert!(decode_ascii_hex(b"4G>").is_err());
    }

    #[test]
    fn test_ascii85_decode() {
        assert_eq!(decode_ascii85(b"87cURD]j7BEbo80~>").unwrap(), b"Hello world!");
        assert_eq!(decode_ascii85(b"<~87cURD]j7BEbo80~>").unwrap(), b"Hello world!");
        assert_eq!(decode_ascii85(b"z~>").unwrap(), &[0, 0, 0, 0]);
        // Partial final group: "Hello" is "87cURDZ"
        assert_eq!(decode_ascii85(b"87cURDZ~>").unwrap(), b"Hello");
    }

    #[test]
    fn test_run_length_decode() {
        let data = [2, b'a', b'b', b'c', 254, b'x', 128, b'z'];
        assert_eq!(decode_run_length(&data), b"abcxxx");
    }

    #[test]
    fn test_filter_from_name() {
        assert_eq!(Filter::from_name("FlateDecode"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name("Fl"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name("AHx"), Some(Filter::ASCIIHexDecode));
        assert_eq!(Filter::from_name("Bogus"), None);
        assert!(Filter::DCTDecode.is_image_filter());
        assert!(!Filter::LZWDecode.is_image_filter());
    }

    #[test]
    fn test_decode_chain() {
        let dict = dict_with_filter(PdfObject::Array(PdfArray(vec![
            PdfObject::Name(PdfName::new("ASCIIHexDecode")),
            PdfObject::Name(PdfName::new("RunLengthDecode")),
        ])));
        // RunLength [1, 'h', 'i'] hex encoded
        let decoded = decode_stream(b"016869>", &dict).unwrap();
        assert_eq!(decoded, b"hi");
    }

    #[test]
    fn test_no_filter_passthrough() {
        assert_eq!(decode_stream(b"raw", &PdfDictionary::new()).unwrap(), b"raw");
    }

    #[test]
    fn test_unsupported_filters() {
        let dict = dict_with_filter(PdfObject::Name(PdfName::new("DCTDecode")));
        assert!(matches!(
            decode_stream(b"..", &dict),
            Err(ParseError::UnsupportedFilter(_))
        ));
        let dict = dict_with_filter(PdfObject::Name(PdfName::new("MadeUpDecode")));
        assert!(matches!(
            decode_stream(b"..", &dict),
            Err(ParseError::UnsupportedFilter(name)) if name == "MadeUpDecode"
        ));
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_flate_roundtrip_and_truncation() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let text = b"BT /F1 12 Tf (Compressed text) Tj ET ".repeat(20);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&text).unwrap();
        let compressed = encoder.finish().unwrap();

        let dict = dict_with_filter(PdfObject::Name(PdfName::new("FlateDecode")));
        assert_eq!(decode_stream(&compressed, &dict).unwrap(), text);

        assert!(decode_stream(b"not zlib at all", &dict).is_err());
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_flate_with_png_predictor() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let rows = [2u8, 1, 2, 2, 1, 1];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&rows).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut params = PdfDictionary::new();
        params.insert("Predictor", PdfObject::Integer(12));
        params.insert("Columns", PdfObject::Integer(2));
        let mut dict = dict_with_filter(PdfObject::Name(PdfName::new("FlateDecode")));
        dict.insert("DecodeParms", PdfObject::Dictionary(params));

        assert_eq!(decode_stream(&compressed, &dict).unwrap(), vec![1, 2, 2, 3]);
    }
}
