//! PDF Cross-Reference Table Parser
//!
//! Parses xref tables according to ISO 32000-1 Section 7.5.4 and follows the
//! `/Prev` chain of incrementally updated files. Sections are read newest
//! first, so the first definition seen for an object number is the one kept.

use super::lexer::{rfind_bytes, Lexer, Token};
use super::objects::{ObjectParser, PdfDictionary};
use super::trailer::PdfTrailer;
use super::xref_stream::XRefStream;
use super::{ParseError, ParseOptions, ParseResult};
use std::collections::{HashMap, HashSet};

pub use super::xref_stream::XRefEntry;

/// One cross-reference section: a classic table or an xref stream
#[derive(Debug, Default)]
struct XRefSection {
    entries: Vec<(u32, XRefEntry)>,
    trailer: PdfDictionary,
}

/// Cross-reference table
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    /// Map of object number to xref entry
    entries: HashMap<u32, XRefEntry>,
    /// Effective trailer dictionary
    trailer: PdfTrailer,
    /// Number of sections merged into this table
    sections: usize,
}

impl XRefTable {
    /// Create a new empty xref table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from the `startxref` section and every section chained
    /// from it. `header_offset` is the position of `%PDF-`; offsets that miss
    /// are retried relative to it.
    pub fn parse(data: &[u8], header_offset: usize, options: &ParseOptions) -> ParseResult<Self> {
        let start = find_startxref(data).ok_or(ParseError::InvalidXRef)?;
        let mut table = Self::new();
        let mut visited = HashSet::new();
        let mut next = Some(start);

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                tracing::warn!("xref /Prev chain loops back to offset {}", offset);
                break;
            }

            let section = match read_section(data, offset, header_offset, options) {
                Ok(section) => section,
                Err(e) if table.sections == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!("ignoring unreadable older xref section at {}: {}", offset, e);
                    break;
                }
            };

            table.merge_section(&section);

            // Hybrid files: the stream's entries rank after the table's own
            if let Some(stm_offset) = offset_entry(&section.trailer, "XRefStm") {
                if visited.insert(stm_offset) {
                    match read_section(data, stm_offset, header_offset, options) {
                        Ok(stream_section) => table.merge_entries(&stream_section.entries),
                        Err(e) => tracing::debug!("ignoring /XRefStm at {}: {}", stm_offset, e),
                    }
                }
            }

            next = offset_entry(&section.trailer, "Prev");
        }

        tracing::debug!(
            "xref: {} entries from {} section(s)",
            table.entries.len(),
            table.sections
        );
        Ok(table)
    }

    fn merge_section(&mut self, section: &XRefSection) {
        self.merge_entries(&section.entries);
        if self.sections == 0 {
            self.trailer = PdfTrailer::new(section.trailer.clone());
        } else {
            self.trailer.merge_older(&section.trailer);
        }
        self.sections += 1;
    }

    fn merge_entries(&mut self, entries: &[(u32, XRefEntry)]) {
        for (num, entry) in entries {
            self.entries.entry(*num).or_insert(*entry);
        }
    }

    /// Add an entry, keeping an existing one for the same object number
    pub fn insert_if_absent(&mut self, obj_num: u32, entry: XRefEntry) {
        self.entries.entry(obj_num).or_insert(entry);
    }

    /// Add an entry, replacing any existing one
    pub fn insert(&mut self, obj_num: u32, entry: XRefEntry) {
        self.entries.insert(obj_num, entry);
    }

    /// Get an xref entry by object number
    pub fn get_entry(&self, obj_num: u32) -> Option<&XRefEntry> {
        self.entries.get(&obj_num)
    }

    /// Get the effective trailer
    pub fn trailer(&self) -> &PdfTrailer {
        &self.trailer
    }

    pub fn set_trailer(&mut self, trailer: PdfTrailer) {
        self.trailer = trailer;
    }

    /// Number of sections read (1 for a file without incremental updates)
    pub fn section_count(&self) -> usize {
        self.sections
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XRefEntry)> {
        self.entries.iter()
    }
}

/// Find the xref offset recorded after the last `startxref` keyword
pub fn find_startxref(data: &[u8]) -> Option<usize> {
    let keyword = rfind_bytes(data, b"startxref")?;
    let mut lexer = Lexer::at(data, keyword + b"startxref".len());
    match lexer.next_token() {
        Ok(Token::Integer(offset)) => usize::try_from(offset).ok(),
        _ => None,
    }
}

fn offset_entry(dict: &PdfDictionary, key: &str) -> Option<usize> {
    dict.get(key)
        .and_then(|obj| obj.as_integer())
        .and_then(|n| usize::try_from(n).ok())
}

/// Read the section at `offset`, retrying relative to the header position
fn read_section(
    data: &[u8],
    offset: usize,
    header_offset: usize,
    options: &ParseOptions,
) -> ParseResult<XRefSection> {
    match parse_section_at(data, offset, options) {
        Ok(section) => Ok(section),
        Err(e) if header_offset > 0 => {
            tracing::debug!(
                "xref at {} unreadable ({}), retrying at {}",
                offset,
                e,
                offset + header_offset
            );
            parse_section_at(data, offset + header_offset, options)
        }
        Err(e) => Err(e),
    }
}

fn parse_section_at(data: &[u8], offset: usize, options: &ParseOptions) -> ParseResult<XRefSection> {
    if offset >= data.len() {
        return Err(ParseError::InvalidXRef);
    }
    let mut lexer = Lexer::at(data, offset);
    match lexer.peek_token()? {
        Token::Keyword(ref k) if k == "xref" => {
            lexer.next_token()?;
            parse_classic_table(lexer, options)
        }
        Token::Integer(_) => parse_stream_section(data, offset, options),
        _ => Err(ParseError::InvalidXRef),
    }
}

/// Parse the subsections of a classic table followed by its trailer.
///
/// Entries are read as tokens, so records that are not exactly 20 bytes
/// long are accepted.
fn parse_classic_table(mut lexer: Lexer<'_>, options: &ParseOptions) -> ParseResult<XRefSection> {
    let mut section = XRefSection::default();

    loop {
        match lexer.next_token()? {
            Token::Keyword(ref k) if k == "trailer" => break,
            Token::Integer(first) => {
                let first = u32::try_from(first).map_err(|_| ParseError::InvalidXRef)?;
                let count = match lexer.next_token()? {
                    Token::Integer(n) if n >= 0 => n as u32,
                    _ => return Err(ParseError::InvalidXRef),
                };
                let entries = parse_subsection(&mut lexer, first, count)?;
                section.entries.extend(entries);
            }
            other => {
                tracing::debug!("unexpected {:?} in xref table", other);
                return Err(ParseError::InvalidXRef);
            }
        }
    }

    let mut parser = ObjectParser::new(lexer.data(), lexer.position()).with_options(options);
    section.trailer = match parser.parse_object()? {
        super::objects::PdfObject::Dictionary(dict) => dict,
        _ => return Err(ParseError::InvalidTrailer),
    };
    Ok(section)
}

fn parse_subsection(lexer: &mut Lexer<'_>, first: u32, count: u32) -> ParseResult<Vec<(u32, XRefEntry)>> {
    let mut entries = Vec::new();
    for i in 0..count {
        let offset = match lexer.next_token()? {
            Token::Integer(n) if n >= 0 => n as u64,
            _ => return Err(ParseError::InvalidXRef),
        };
        let generation = match lexer.next_token()? {
            Token::Integer(n) if (0..=i64::from(u16::MAX)).contains(&n) => n as u16,
            _ => return Err(ParseError::InvalidXRef),
        };
        let entry = match lexer.next_token()? {
            Token::Keyword(ref k) if k == "n" => XRefEntry::InUse { offset, generation },
            Token::Keyword(ref k) if k == "f" => XRefEntry::Free {
                next_free_object: offset as u32,
                generation,
            },
            _ => return Err(ParseError::InvalidXRef),
        };
        entries.push((first.saturating_add(i), entry));
    }

    // Broken writers number the first subsection from 1 while still listing
    // the free head entry of object 0
    if first == 1 {
        if let Some((_, XRefEntry::Free { generation: 65535, .. })) = entries.first() {
            tracing::debug!("xref subsection starts at 1 with object 0's entry, renumbering");
            for (num, _) in entries.iter_mut() {
                *num -= 1;
            }
        }
    }

    Ok(entries)
}

fn parse_stream_section(data: &[u8], offset: usize, options: &ParseOptions) -> ParseResult<XRefSection> {
    let (_, object) = ObjectParser::new(data, offset)
        .with_options(options)
        .parse_indirect_object()?;
    let stream = object.as_stream().ok_or(ParseError::InvalidXRef)?;
    let xref_stream = XRefStream::parse(stream)?;
    Ok(XRefSection {
        entries: xref_stream.to_xref_entries()?,
        trailer: xref_stream.trailer_dict().clone(),
    })
}
