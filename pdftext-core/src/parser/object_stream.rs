//! PDF Object Stream Parser
//!
//! Handles compressed objects stored in object streams (PDF 1.5+)

use super::lexer::{Lexer, Token};
use super::objects::{ObjectParser, PdfDictionary, PdfObject};
use super::{ParseError, ParseOptions, ParseResult};
use std::collections::HashMap;

/// The objects of one decoded `/Type /ObjStm` stream
#[derive(Debug, Default)]
pub struct ObjectStream {
    /// Object numbers in stream order
    order: Vec<u32>,
    /// Parsed objects
    objects: HashMap<u32, PdfObject>,
}

impl ObjectStream {
    /// Parse the decoded data of an object stream
    pub fn parse(data: &[u8], dict: &PdfDictionary, options: &ParseOptions) -> ParseResult<Self> {
        let n = dict
            .get("N")
            .and_then(|obj| obj.as_integer())
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))?;

        let first = dict
            .get("First")
            .and_then(|obj| obj.as_integer())
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))?;

        if first > data.len() {
            return Err(ParseError::syntax(first, "Object stream /First beyond data"));
        }

        // Header: N pairs of object number and relative offset
        let mut lexer = Lexer::new(&data[..first]);
        let mut offsets = Vec::with_capacity(n.min(data.len()));
        for _ in 0..n {
            let obj_num = match lexer.next_token()? {
                Token::Integer(num) if num >= 0 => num as u32,
                Token::Eof if options.lenient_syntax => break,
                _ => {
                    return Err(ParseError::syntax(
                        lexer.position(),
                        "Expected object number in object stream",
                    ))
                }
            };
            let offset = match lexer.next_token()? {
                Token::Integer(off) if off >= 0 => off as usize,
                _ => {
                    return Err(ParseError::syntax(
                        lexer.position(),
                        "Expected offset in object stream",
                    ))
                }
            };
            offsets.push((obj_num, offset));
        }

        let mut stream = ObjectStream::default();
        for (obj_num, offset) in offsets {
            stream.order.push(obj_num);
            let mut parser = ObjectParser::new(data, first.saturating_add(offset)).with_options(options);
            match parser.parse_object() {
                Ok(obj) => {
                    stream.objects.entry(obj_num).or_insert(obj);
                }
                Err(e) if options.lenient_syntax => {
                    tracing::debug!("skipping object {} in object stream: {}", obj_num, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stream)
    }

    /// Get an object by its object number
    pub fn get_object(&self, obj_num: u32) -> Option<&PdfObject> {
        self.objects.get(&obj_num)
    }

    /// Object at `index` in stream order, if its number matches `obj_num`.
    /// Falls back to a lookup by number when the index is stale.
    pub fn get(&self, obj_num: u32, index: u32) -> Option<&PdfObject> {
        match self.order.get(index as usize) {
            Some(num) if *num == obj_num => self.objects.get(num),
            _ => self.get_object(obj_num),
        }
    }

    /// Object numbers in stream order
    pub fn object_numbers(&self) -> &[u32] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
