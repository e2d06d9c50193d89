//! Cross-reference stream support for PDF 1.5+
//!
//! This module implements cross-reference streams according to
//! ISO 32000-1:2008 Section 7.5.8 (Cross-Reference Streams).
//!
//! Cross-reference streams are an alternative to traditional xref tables,
//! providing more compact representation and supporting compressed object streams.

use crate::parser::filters::decode_stream;
use crate::parser::objects::{PdfDictionary, PdfStream};
use crate::parser::{ParseError, ParseResult};

/// Cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free object entry
    Free {
        /// Next free object number
        next_free_object: u32,
        /// Generation number
        generation: u16,
    },
    /// In-use object entry
    InUse {
        /// Byte offset in the file
        offset: u64,
        /// Generation number
        generation: u16,
    },
    /// Compressed object entry (PDF 1.5+)
    Compressed {
        /// Object number of the object stream containing this object
        stream_object_number: u32,
        /// Index of this object within the object stream
        index_within_stream: u32,
    },
}

impl XRefEntry {
    /// Generation the entry expects; compressed objects always have generation 0
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } | XRefEntry::InUse { generation, .. } => *generation,
            XRefEntry::Compressed { .. } => 0,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, XRefEntry::Free { .. })
    }
}

/// Decoded cross-reference stream
pub struct XRefStream {
    /// Stream dictionary, which doubles as the trailer of this section
    pub dict: PdfDictionary,
    /// Decoded stream data
    pub data: Vec<u8>,
    /// Field widths from W array
    pub widths: [usize; 3],
    /// Index array (pairs of [first_object_number, count])
    pub index: Vec<(u32, u32)>,
}

impl XRefStream {
    /// Parse a cross-reference stream object
    pub fn parse(stream: &PdfStream) -> ParseResult<Self> {
        let dict = &stream.dict;
        if dict.get_type() != Some("XRef") {
            return Err(ParseError::InvalidXRef);
        }

        let widths: Vec<usize> = dict
            .get("W")
            .and_then(|obj| obj.as_array())
            .ok_or_else(|| ParseError::MissingKey("W array in xref stream".to_string()))?
            .iter()
            .map(|obj| {
                obj.as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|n| *n <= 8)
                    .ok_or_else(|| ParseError::syntax(0, "Invalid width in W array"))
            })
            .collect::<ParseResult<_>>()?;

        let widths: [usize; 3] = widths.as_slice().try_into().map_err(|_| {
            ParseError::syntax(
                0,
                format!("W array must have 3 elements, found {}", widths.len()),
            )
        })?;

        let index = match dict.get("Index").and_then(|obj| obj.as_array()) {
            Some(index_array) => {
                let numbers = index_array
                    .iter()
                    .map(|obj| {
                        obj.as_integer()
                            .and_then(|n| u32::try_from(n).ok())
                            .ok_or_else(|| ParseError::syntax(0, "Invalid entry in Index array"))
                    })
                    .collect::<ParseResult<Vec<u32>>>()?;
                numbers.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect()
            }
            None => {
                // Default: start at 0, count is Size
                let size = dict
                    .get("Size")
                    .and_then(|obj| obj.as_integer())
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| ParseError::MissingKey("Size in xref stream".to_string()))?;
                vec![(0, size)]
            }
        };

        let data = decode_stream(&stream.data, dict)?;

        Ok(XRefStream {
            dict: dict.clone(),
            data,
            widths,
            index,
        })
    }

    /// Convert the cross-reference stream to entries keyed by object number.
    ///
    /// Truncated data yields the entries read so far. Entries of unknown type
    /// denote the null object and are skipped.
    pub fn to_xref_entries(&self) -> ParseResult<Vec<(u32, XRefEntry)>> {
        let entry_size = self.widths.iter().sum::<usize>();
        if entry_size == 0 {
            return Err(ParseError::syntax(0, "Invalid entry size (0) in xref stream"));
        }

        let mut entries = Vec::new();
        let mut records = self.data.chunks_exact(entry_size);

        'sections: for &(first_obj, count) in &self.index {
            for i in 0..count {
                let Some(record) = records.next() else {
                    tracing::debug!(
                        "xref stream data truncated after {} entries",
                        entries.len()
                    );
                    break 'sections;
                };

                let mut fields = [0u64; 3];
                let mut field_offset = 0;
                for (field, &width) in fields.iter_mut().zip(&self.widths) {
                    *field = read_field(&record[field_offset..field_offset + width]);
                    field_offset += width;
                }

                // A zero-width type field means every entry is type 1
                let entry_type = if self.widths[0] == 0 { 1 } else { fields[0] };
                let obj_num = first_obj.saturating_add(i);

                let entry = match entry_type {
                    0 => XRefEntry::Free {
                        next_free_object: fields[1] as u32,
                        generation: fields[2] as u16,
                    },
                    1 => XRefEntry::InUse {
                        offset: fields[1],
                        generation: fields[2] as u16,
                    },
                    2 => XRefEntry::Compressed {
                        stream_object_number: fields[1] as u32,
                        index_within_stream: fields[2] as u32,
                    },
                    other => {
                        tracing::trace!("ignoring xref stream entry of type {}", other);
                        continue;
                    }
                };

                entries.push((obj_num, entry));
            }
        }

        Ok(entries)
    }

    /// Get the trailer dictionary from the xref stream
    pub fn trailer_dict(&self) -> &PdfDictionary {
        &self.dict
    }
}

/// Read a field from bytes (big-endian)
fn read_field(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |value, &byte| (value << 8) | u64::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::objects::{PdfArray, PdfName, PdfObject};

    fn xref_stream(widths: [i64; 3], index: Option<Vec<i64>>, size: i64, data: Vec<u8>) -> PdfStream {
        let mut dict = PdfDictionary::new();
        dict.insert("Type", PdfObject::Name(PdfName::new("XRef")));
        dict.insert(
            "W",
            PdfObject::Array(PdfArray(widths.iter().map(|w| PdfObject::Integer(*w)).collect())),
        );
        dict.insert("Size", PdfObject::Integer(size));
        if let Some(index) = index {
            dict.insert(
                "Index",
                PdfObject::Array(PdfArray(index.into_iter().map(PdfObject::Integer).collect())),
            );
        }
        PdfStream::new(dict, data)
    }

    #[test]
    fn test_read_field() {
        assert_eq!(read_field(&[]), 0);
        assert_eq!(read_field(&[0x01, 0x02]), 0x0102);
        assert_eq!(read_field(&[0xFF, 0x00, 0x10]), 0xFF0010);
    }

    #[test]
    fn test_decode_entries() {
        let data = vec![
            0, 0, 0, 0xFF, // 0: free
            1, 0, 0x0F, 0, // 1: offset 15
            2, 0, 0x05, 3, // 2: in stream 5, index 3
        ];
        let xref = XRefStream::parse(&xref_stream([1, 2, 1], None, 3, data)).unwrap();
        let entries = xref.to_xref_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].1.is_free());
        assert_eq!(
            entries[1],
            (1, XRefEntry::InUse { offset: 15, generation: 0 })
        );
        assert_eq!(
            entries[2],
            (
                2,
                XRefEntry::Compressed {
                    stream_object_number: 5,
                    index_within_stream: 3
                }
            )
        );
    }

    #[test]
    fn test_index_subsections_and_default_type() {
        let data = vec![0, 10, 0, 20, 0, 30];
        let stream = xref_stream([0, 2, 0], Some(vec![4, 1, 10, 2]), 12, data);
        let entries = XRefStream::parse(&stream).unwrap().to_xref_entries().unwrap();
        let numbers: Vec<u32> = entries.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![4, 10, 11]);
        assert_eq!(entries[2].1, XRefEntry::InUse { offset: 30, generation: 0 });
    }

    #[test]
    fn test_truncated_data_keeps_complete_entries() {
        let data = vec![1, 0, 9, 0, 1, 0];
        let entries = XRefStream::parse(&xref_stream([1, 2, 1], None, 2, data))
            .unwrap()
            .to_xref_entries()
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_invalid_w_array() {
        assert!(XRefStream::parse(&xref_stream([1, 2, 1], None, 1, vec![])).is_ok());
        let mut stream = xref_stream([1, 2, 1], None, 1, vec![]);
        stream.dict.insert("W", PdfObject::Array(PdfArray(vec![PdfObject::Integer(1)])));
        assert!(XRefStream::parse(&stream).is_err());
    }

    #[test]
    fn test_not_an_xref_stream() {
        let mut stream = xref_stream([1, 2, 1], None, 1, vec![]);
        stream.dict.insert("Type", PdfObject::Name(PdfName::new("ObjStm")));
        assert!(matches!(XRefStream::parse(&stream), Err(ParseError::InvalidXRef)));
    }
}
