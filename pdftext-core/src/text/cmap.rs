//! CMap and ToUnicode support for text extraction
//!
//! Implements the subset of ISO 32000-1 Section 9.7.5 (CMaps) and 9.10.3
//! (ToUnicode CMaps) needed to turn composite-font byte strings into text:
//! codespace ranges for splitting bytes into codes, `cidchar`/`cidrange` for
//! code to CID, and `bfchar`/`bfrange` for code to Unicode.

use super::encoding::glyph_to_unicode;
use crate::parser::lexer::{Lexer, Token};
use crate::parser::{ParseError, ParseResult};
use std::collections::HashMap;

/// CMap type enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CMapType {
    /// Embedded CMap stream (ToUnicode or CID mapping)
    Embedded,
    /// Predefined `Identity-H` / `Identity-V`: two-byte codes, CID = code
    Identity,
    /// Predefined `Uni*-UCS2-*` / `Uni*-UTF16-*`: codes are UTF-16BE text
    Utf16,
}

/// Codespace range. A code is inside when every byte lies between the
/// corresponding bytes of `start` and `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRange {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl CodeRange {
    pub fn new(start: Vec<u8>, end: Vec<u8>) -> Self {
        Self { start, end }
    }

    /// Check if a code is within this range
    pub fn contains(&self, code: &[u8]) -> bool {
        code.len() == self.start.len()
            && code.len() == self.end.len()
            && code
                .iter()
                .zip(self.start.iter().zip(&self.end))
                .all(|(b, (lo, hi))| lo <= b && b <= hi)
    }

    fn len(&self) -> usize {
        self.start.len()
    }
}

#[derive(Debug, Clone)]
enum BfTarget {
    /// UTF-16 units of the first code; the last unit advances with the code
    Offset(Vec<u16>),
    /// One destination per code
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct BfRange {
    start: Vec<u8>,
    end: Vec<u8>,
    target: BfTarget,
}

#[derive(Debug, Clone)]
struct CidRange {
    start: Vec<u8>,
    end: Vec<u8>,
    cid: u32,
}

/// CMap structure for character code mappings
#[derive(Debug, Clone)]
pub struct CMap {
    /// CMap name
    pub name: Option<String>,
    pub cmap_type: CMapType,
    /// Writing mode (0 = horizontal, 1 = vertical)
    pub wmode: u8,
    pub codespace_ranges: Vec<CodeRange>,
    bf_chars: HashMap<Vec<u8>, String>,
    bf_ranges: Vec<BfRange>,
    cid_chars: HashMap<Vec<u8>, u32>,
    cid_ranges: Vec<CidRange>,
    /// CMap named by `usecmap`; consulted after this one
    parent: Option<Box<CMap>>,
}

impl CMap {
    fn empty(cmap_type: CMapType) -> Self {
        Self {
            name: None,
            cmap_type,
            wmode: 0,
            codespace_ranges: Vec::new(),
            bf_chars: HashMap::new(),
            bf_ranges: Vec::new(),
            cid_chars: HashMap::new(),
            cid_ranges: Vec::new(),
            parent: None,
        }
    }

    /// Create a predefined Identity-H CMap
    pub fn identity_h() -> Self {
        Self::identity("Identity-H", 0)
    }

    /// Create a predefined Identity-V CMap
    pub fn identity_v() -> Self {
        Self::identity("Identity-V", 1)
    }

    fn identity(name: &str, wmode: u8) -> Self {
        Self {
            name: Some(name.to_string()),
            wmode,
            codespace_ranges: vec![CodeRange::new(vec![0x00, 0x00], vec![0xFF, 0xFF])],
            ..Self::empty(CMapType::Identity)
        }
    }

    /// Look up a predefined CMap by name.
    ///
    /// Only the Identity and Unicode-based CMaps are built in; the
    /// registry-specific ones (e.g. `90ms-RKSJ-H`) return `None`.
    pub fn predefined(name: &str) -> Option<Self> {
        match name {
            "Identity-H" => return Some(Self::identity_h()),
            "Identity-V" => return Some(Self::identity_v()),
            _ => {}
        }
        if !name.starts_with("Uni") {
            return None;
        }
        let wmode = u8::from(name.ends_with("-V"));
        let codespace_ranges = if name.contains("UTF16") {
            vec![
                CodeRange::new(vec![0x00, 0x00], vec![0xD7, 0xFF]),
                CodeRange::new(vec![0xE0, 0x00], vec![0xFF, 0xFF]),
                CodeRange::new(vec![0xD8, 0x00, 0xDC, 0x00], vec![0xDB, 0xFF, 0xDF, 0xFF]),
            ]
        } else if name.contains("UCS2") {
            vec![CodeRange::new(vec![0x00, 0x00], vec![0xFF, 0xFF])]
        } else {
            return None;
        };
        Some(Self {
            name: Some(name.to_string()),
            wmode,
            codespace_ranges,
            ..Self::empty(CMapType::Utf16)
        })
    }

    /// Parse an embedded CMap stream
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let mut cmap = Self::empty(CMapType::Embedded);
        let mut lexer = Lexer::new(data);
        let mut operands: Vec<Token> = Vec::new();

        loop {
            let token = match lexer.next_token() {
                Ok(Token::Eof) => break,
                Ok(token) => token,
                Err(e) => {
                    tracing::trace!("cmap: skipping malformed token: {}", e);
                    lexer.resync();
                    continue;
                }
            };
            let Token::Keyword(keyword) = token else {
                operands.push(token);
                continue;
            };
            match keyword.as_str() {
                "endcodespacerange" => cmap.read_codespace(&operands),
                "endbfchar" => cmap.read_bf_chars(&operands),
                "endbfrange" => cmap.read_bf_ranges(&operands),
                "endcidchar" => cmap.read_cid_chars(&operands),
                "endcidrange" => cmap.read_cid_ranges(&operands),
                "def" => match operands.as_slice() {
                    [.., Token::Name(key), Token::Name(value)] if key == "CMapName" => {
                        cmap.name = Some(value.clone());
                    }
                    [.., Token::Name(key), Token::Integer(mode)] if key == "WMode" => {
                        cmap.wmode = u8::from(*mode == 1);
                    }
                    _ => {}
                },
                "usecmap" => {
                    if let Some(Token::Name(parent)) = operands.last() {
                        match Self::predefined(parent) {
                            Some(parent) => cmap.parent = Some(Box::new(parent)),
                            None => tracing::debug!("cmap: usecmap of unknown CMap {}", parent),
                        }
                    }
                }
                _ => {}
            }
            operands.clear();
        }

        if cmap.codespace_ranges.is_empty()
            && cmap.bf_chars.is_empty()
            && cmap.bf_ranges.is_empty()
            && cmap.cid_chars.is_empty()
            && cmap.cid_ranges.is_empty()
            && cmap.parent.is_none()
        {
            return Err(ParseError::UnsupportedEncoding(
                "CMap stream has no mappings".to_string(),
            ));
        }
        Ok(cmap)
    }

    /// Whether glyphs advance vertically
    pub fn is_vertical(&self) -> bool {
        self.wmode == 1
    }

    /// Length in bytes of the code starting at `bytes[0]`.
    ///
    /// Uses the codespace ranges; bytes matching no range consume the
    /// shortest codespace length so decoding always makes progress.
    pub fn code_length(&self, bytes: &[u8]) -> usize {
        let ranges = self.all_codespace_ranges();
        for len in 1..=bytes.len().min(4) {
            if ranges.iter().any(|r| r.len() == len && r.contains(&bytes[..len])) {
                return len;
            }
        }
        ranges
            .iter()
            .map(|r| r.len())
            .min()
            .unwrap_or(1)
            .clamp(1, bytes.len().max(1))
    }

    /// Split a byte string into character codes
    pub fn codes<'b>(&'b self, bytes: &'b [u8]) -> impl Iterator<Item = &'b [u8]> + 'b {
        let mut rest = bytes;
        std::iter::from_fn(move || {
            if rest.is_empty() {
                return None;
            }
            let len = self.code_length(rest).min(rest.len());
            let (code, tail) = rest.split_at(len);
            rest = tail;
            Some(code)
        })
    }

    /// Map a character code to Unicode text
    pub fn unicode(&self, code: &[u8]) -> Option<String> {
        if self.cmap_type == CMapType::Utf16 {
            return utf16_be_to_string(code);
        }
        if let Some(text) = self.bf_chars.get(code) {
            return Some(text.clone());
        }
        let value = code_value(code);
        for range in self.bf_ranges.iter().rev() {
            if !in_numeric_range(code, &range.start, &range.end) {
                continue;
            }
            let offset = value - code_value(&range.start);
            return match &range.target {
                BfTarget::Offset(units) => {
                    let mut units = units.clone();
                    if let Some(last) = units.last_mut() {
                        *last = last.wrapping_add(offset as u16);
                    }
                    decode_utf16_units(&units)
                }
                BfTarget::List(targets) => targets.get(offset as usize).cloned(),
            };
        }
        self.parent.as_ref().and_then(|p| p.unicode(code))
    }

    /// Map a character code to a CID
    pub fn cid(&self, code: &[u8]) -> Option<u32> {
        match self.cmap_type {
            CMapType::Identity => return Some(code_value(code)),
            CMapType::Utf16 => return None,
            CMapType::Embedded => {}
        }
        if let Some(&cid) = self.cid_chars.get(code) {
            return Some(cid);
        }
        for range in self.cid_ranges.iter().rev() {
            if in_numeric_range(code, &range.start, &range.end) {
                return code_value(code)
                    .checked_sub(code_value(&range.start))
                    .and_then(|offset| range.cid.checked_add(offset));
            }
        }
        self.parent.as_ref().and_then(|p| p.cid(code))
    }

    fn all_codespace_ranges(&self) -> Vec<&CodeRange> {
        let mut ranges: Vec<&CodeRange> = self.codespace_ranges.iter().collect();
        if let Some(parent) = &self.parent {
            ranges.extend(parent.all_codespace_ranges());
        }
        ranges
    }

    fn read_codespace(&mut self, operands: &[Token]) {
        for pair in operands.chunks_exact(2) {
            if let (Some(start), Some(end)) = (code_bytes(&pair[0]), code_bytes(&pair[1])) {
                if start.len() == end.len() && !start.is_empty() && start.len() <= 4 {
                    self.codespace_ranges.push(CodeRange::new(start, end));
                }
            }
        }
    }

    fn read_bf_chars(&mut self, operands: &[Token]) {
        for pair in operands.chunks_exact(2) {
            let Some(src) = code_bytes(&pair[0]) else {
                continue;
            };
            let dst = match &pair[1] {
                Token::HexString(bytes) | Token::String(bytes) => utf16_be_to_string(bytes),
                Token::Name(glyph) => glyph_to_unicode(glyph),
                _ => None,
            };
            if let Some(dst) = dst {
                self.bf_chars.insert(src, dst);
            }
        }
    }

    fn read_bf_ranges(&mut self, operands: &[Token]) {
        let mut i = 0;
        while i + 2 < operands.len() {
            let (Some(start), Some(end)) = (code_bytes(&operands[i]), code_bytes(&operands[i + 1]))
            else {
                i += 1;
                continue;
            };
            i += 2;
            let target = match &operands[i] {
                Token::HexString(bytes) | Token::String(bytes) => {
                    i += 1;
                    BfTarget::Offset(utf16_units(bytes))
                }
                Token::ArrayStart => {
                    let mut targets = Vec::new();
                    i += 1;
                    while i < operands.len() && operands[i] != Token::ArrayEnd {
                        let text = match &operands[i] {
                            Token::HexString(bytes) | Token::String(bytes) => {
                                utf16_be_to_string(bytes)
                            }
                            Token::Name(glyph) => glyph_to_unicode(glyph),
                            _ => None,
                        };
                        targets.push(text.unwrap_or_default());
                        i += 1;
                    }
                    i += 1;
                    BfTarget::List(targets)
                }
                _ => {
                    i += 1;
                    continue;
                }
            };
            if start.len() == end.len() && !start.is_empty() {
                self.bf_ranges.push(BfRange { start, end, target });
            }
        }
    }

    fn read_cid_chars(&mut self, operands: &[Token]) {
        for pair in operands.chunks_exact(2) {
            if let (Some(src), Token::Integer(cid)) = (code_bytes(&pair[0]), &pair[1]) {
                if let Ok(cid) = u32::try_from(*cid) {
                    self.cid_chars.insert(src, cid);
                }
            }
        }
    }

    fn read_cid_ranges(&mut self, operands: &[Token]) {
        for triple in operands.chunks_exact(3) {
            if let (Some(start), Some(end), Token::Integer(cid)) =
                (code_bytes(&triple[0]), code_bytes(&triple[1]), &triple[2])
            {
                if let Ok(cid) = u32::try_from(*cid) {
                    if start.len() == end.len() && !start.is_empty() {
                        self.cid_ranges.push(CidRange { start, end, cid });
                    }
                }
            }
        }
    }
}

fn code_bytes(token: &Token) -> Option<Vec<u8>> {
    match token {
        Token::HexString(bytes) | Token::String(bytes) if bytes.len() <= 4 => Some(bytes.clone()),
        _ => None,
    }
}

/// Big-endian numeric value of a code of up to four bytes
fn code_value(code: &[u8]) -> u32 {
    code.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn in_numeric_range(code: &[u8], start: &[u8], end: &[u8]) -> bool {
    code.len() == start.len() && code >= start && code <= end
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() % 2 == 1 {
        // Single-byte destinations show up in the wild; treat them as Latin-1
        return bytes.iter().map(|&b| b as u16).collect();
    }
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Decode UTF-16 units, dropping unpaired surrogates
fn decode_utf16_units(units: &[u16]) -> Option<String> {
    let text: String = char::decode_utf16(units.iter().copied())
        .filter_map(Result::ok)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn utf16_be_to_string(bytes: &[u8]) -> Option<String> {
    decode_utf16_units(&utf16_units(bytes))
}
