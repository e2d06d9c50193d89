//! PDF Object Parser
//!
//! Parses PDF objects from tokens according to ISO 32000-1 Section 7.3.
//! Indirect references are kept as [`PdfObject::Reference`] values; they are
//! only followed when a caller dereferences them through the document.

use super::lexer::{find_bytes, is_whitespace, Lexer, Token};
use super::{ParseError, ParseOptions, ParseResult};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of an indirect object: object number and generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    number: u32,
    generation: u16,
}

impl ObjectId {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// PDF Name object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PdfName(pub String);

/// PDF String object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfString(pub Vec<u8>);

/// PDF Array object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfArray(pub Vec<PdfObject>);

/// PDF Dictionary object. Keys are kept ordered so iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfDictionary(pub BTreeMap<PdfName, PdfObject>);

/// PDF Stream object: dictionary plus raw (still encoded) data
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: PdfDictionary,
    pub data: Vec<u8>,
}

impl PdfStream {
    pub fn new(dict: PdfDictionary, data: Vec<u8>) -> Self {
        Self { dict, data }
    }

    /// Get the decoded stream data. Filter parameters must be direct objects;
    /// use [`PdfDocument::decode_stream`](super::PdfDocument::decode_stream) when
    /// they may be indirect.
    pub fn decode(&self) -> ParseResult<Vec<u8>> {
        super::filters::decode_stream(&self.data, &self.dict)
    }

    /// Get the raw (possibly compressed) stream data
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }
}

/// PDF Object types
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(PdfString),
    Name(PdfName),
    Array(PdfArray),
    Dictionary(PdfDictionary),
    Stream(PdfStream),
    Reference(ObjectId),
}

impl PdfObject {
    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            // Producers occasionally write integral values as reals
            PdfObject::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            _ => None,
        }
    }

    /// Numeric value of an integer or real
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfObject::Integer(i) => Some(*i as f64),
            PdfObject::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_real().map(|v| v as f32)
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&PdfName> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Dictionary of a dictionary or of a stream
    pub fn as_dict(&self) -> Option<&PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&PdfStream> {
        match self {
            PdfObject::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            PdfObject::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Short type label used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PdfObject::Null => "null",
            PdfObject::Boolean(_) => "boolean",
            PdfObject::Integer(_) => "integer",
            PdfObject::Real(_) => "real",
            PdfObject::String(_) => "string",
            PdfObject::Name(_) => "name",
            PdfObject::Array(_) => "array",
            PdfObject::Dictionary(_) => "dictionary",
            PdfObject::Stream(_) => "stream",
            PdfObject::Reference(_) => "reference",
        }
    }
}

impl PdfDictionary {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PdfObject) {
        self.0.insert(PdfName(key.into()), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PdfName, &PdfObject)> {
        self.0.iter()
    }

    /// Value of `/Type`, if it is a name
    pub fn get_type(&self) -> Option<&str> {
        self.get("Type")
            .and_then(|obj| obj.as_name())
            .map(|n| n.as_str())
    }

    /// Copy every entry of `older` whose key is not already present
    pub fn merge_missing(&mut self, older: &PdfDictionary) {
        for (key, value) in older.iter() {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }
}

impl PdfArray {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PdfObject> {
        self.0.get(index)
    }

    pub fn push(&mut self, obj: PdfObject) {
        self.0.push(obj);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PdfObject> {
        self.0.iter()
    }

    /// All elements as `f32`, or `None` if any is not a number
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        self.0.iter().map(|obj| obj.as_f32()).collect()
    }
}

impl PdfString {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode as a PDF text string (UTF-16BE or UTF-8 with BOM, else PDFDocEncoding)
    pub fn to_text(&self) -> String {
        crate::text::encoding::decode_text_string(&self.0)
    }
}

impl PdfName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PdfName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Resolves the value of an indirect `/Length` entry while a stream is parsed.
pub type LengthResolver<'r> = dyn Fn(ObjectId) -> Option<i64> + 'r;

/// Builds [`PdfObject`] values from the token stream of a [`Lexer`].
pub struct ObjectParser<'a, 'r> {
    lexer: Lexer<'a>,
    lenient: bool,
    max_depth: usize,
    depth_exceeded: bool,
    length_resolver: Option<&'r LengthResolver<'r>>,
}

impl<'a, 'r> ObjectParser<'a, 'r> {
    /// Parser starting at `position` in `data`, lenient by default
    pub fn new(data: &'a [u8], position: usize) -> Self {
        let defaults = ParseOptions::lenient();
        Self {
            lexer: Lexer::at(data, position),
            lenient: defaults.lenient_syntax,
            max_depth: defaults.max_nesting_depth,
            depth_exceeded: false,
            length_resolver: None,
        }
    }

    pub fn with_options(mut self, options: &ParseOptions) -> Self {
        self.lenient = options.lenient_syntax;
        self.max_depth = options.max_nesting_depth;
        self
    }

    pub fn with_length_resolver(mut self, resolver: &'r LengthResolver<'r>) -> Self {
        self.length_resolver = Some(resolver);
        self
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Parse the next complete object
    pub fn parse_object(&mut self) -> ParseResult<PdfObject> {
        let (token, start) = self.lexer.next_token_with_start()?;
        self.parse_value(token, start, 0)
    }

    /// Parse `num gen obj <object> endobj` at the cursor
    pub fn parse_indirect_object(&mut self) -> ParseResult<(ObjectId, PdfObject)> {
        let (token, start) = self.lexer.next_token_with_start()?;
        let number = match token {
            Token::Integer(n) if (0..=i64::from(u32::MAX)).contains(&n) => n as u32,
            other => return Err(unexpected("object number", &other)),
        };
        let generation = match self.lexer.next_token()? {
            Token::Integer(g) if (0..=i64::from(u16::MAX)).contains(&g) => g as u16,
            other => return Err(unexpected("generation number", &other)),
        };
        match self.lexer.next_token()? {
            Token::Obj => {}
            other => return Err(unexpected("obj", &other)),
        }

        let (token, value_start) = self.lexer.next_token_with_start()?;
        let object = match token {
            Token::EndObj if self.lenient => return Ok((ObjectId::new(number, generation), PdfObject::Null)),
            token => self.parse_value(token, value_start, 0)?,
        };

        match self.lexer.peek_token() {
            Ok(Token::EndObj) => {
                self.lexer.next_token()?;
            }
            _ if self.lenient => {}
            Ok(other) => return Err(unexpected("endobj", &other)),
            Err(e) => return Err(e),
        }

        tracing::trace!("parsed object {} {} at offset {}", number, generation, start);
        Ok((ObjectId::new(number, generation), object))
    }

    fn parse_value(&mut self, token: Token, start: usize, depth: usize) -> ParseResult<PdfObject> {
        if depth > self.max_depth {
            self.depth_exceeded = true;
            return Err(ParseError::syntax(start, "Maximum nesting depth exceeded"));
        }
        match token {
            Token::Null => Ok(PdfObject::Null),
            Token::Boolean(b) => Ok(PdfObject::Boolean(b)),
            Token::Integer(n) => self.parse_integer_or_reference(n),
            Token::Real(r) => Ok(PdfObject::Real(r)),
            Token::String(s) | Token::HexString(s) => Ok(PdfObject::String(PdfString(s))),
            Token::Name(n) => Ok(PdfObject::Name(PdfName(n))),
            Token::ArrayStart => self.parse_array(depth + 1),
            Token::DictStart => self.parse_dictionary_or_stream(depth + 1),
            Token::EndObj if self.lenient => {
                self.lexer.push_token(Token::EndObj, start);
                Ok(PdfObject::Null)
            }
            other => Err(ParseError::syntax(
                start,
                format!("Unexpected token {other:?} where an object was expected"),
            )),
        }
    }

    /// An integer, or the start of an `num gen R` reference
    fn parse_integer_or_reference(&mut self, n: i64) -> ParseResult<PdfObject> {
        if !(0..=i64::from(u32::MAX)).contains(&n) {
            return Ok(PdfObject::Integer(n));
        }
        let (second, second_start) = match self.lexer.next_token_with_start() {
            Ok(entry) => entry,
            Err(_) => return Ok(PdfObject::Integer(n)),
        };
        if let Token::Integer(g) = second {
            if (0..=i64::from(u16::MAX)).contains(&g) {
                let (third, third_start) = match self.lexer.next_token_with_start() {
                    Ok(entry) => entry,
                    Err(_) => {
                        self.lexer.push_token(second, second_start);
                        return Ok(PdfObject::Integer(n));
                    }
                };
                if third == Token::Ref {
                    return Ok(PdfObject::Reference(ObjectId::new(n as u32, g as u16)));
                }
                self.lexer.push_token(third, third_start);
            }
        }
        self.lexer.push_token(second, second_start);
        Ok(PdfObject::Integer(n))
    }

    fn parse_array(&mut self, depth: usize) -> ParseResult<PdfObject> {
        let mut elements = Vec::new();

        loop {
            let (token, start) = match self.lexer.next_token_with_start() {
                Ok(entry) => entry,
                Err(e) if self.lenient => {
                    tracing::debug!("skipping malformed array element: {}", e);
                    self.lexer.resync();
                    continue;
                }
                Err(e) => return Err(e),
            };
            match token {
                Token::ArrayEnd => break,
                Token::Eof | Token::EndObj | Token::DictEnd if self.lenient => {
                    self.lexer.push_token(token, start);
                    break;
                }
                Token::Eof => return Err(ParseError::syntax(start, "Unterminated array")),
                token => match self.parse_value(token, start, depth) {
                    Ok(obj) => elements.push(obj),
                    Err(e) if self.lenient && !self.depth_exceeded => {
                        tracing::debug!("skipping malformed array element: {}", e);
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        Ok(PdfObject::Array(PdfArray(elements)))
    }

    fn parse_dictionary_or_stream(&mut self, depth: usize) -> ParseResult<PdfObject> {
        let dict = self.parse_dictionary_body(depth)?;

        // A stream keyword immediately after the dictionary makes it a stream
        match self.lexer.peek_token() {
            Ok(Token::Stream) => {
                self.lexer.next_token()?;
                let data = self.parse_stream_data(&dict)?;
                Ok(PdfObject::Stream(PdfStream { dict, data }))
            }
            _ => Ok(PdfObject::Dictionary(dict)),
        }
    }

    fn parse_dictionary_body(&mut self, depth: usize) -> ParseResult<PdfDictionary> {
        let mut dict = PdfDictionary::new();

        loop {
            let (token, start) = match self.lexer.next_token_with_start() {
                Ok(entry) => entry,
                Err(e) if self.lenient => {
                    tracing::debug!("skipping malformed dictionary token: {}", e);
                    self.lexer.resync();
                    continue;
                }
                Err(e) => return Err(e),
            };
            let key = match token {
                Token::DictEnd => break,
                Token::Name(name) => name,
                Token::Eof | Token::EndObj | Token::Stream | Token::ArrayEnd if self.lenient => {
                    self.lexer.push_token(token, start);
                    break;
                }
                Token::Eof => return Err(ParseError::syntax(start, "Unterminated dictionary")),
                other if self.lenient => {
                    tracing::debug!("ignoring non-name dictionary key {:?}", other);
                    continue;
                }
                other => return Err(unexpected("dictionary key", &other)),
            };

            let (token, value_start) = match self.lexer.next_token_with_start() {
                Ok(entry) => entry,
                Err(e) if self.lenient => {
                    tracing::debug!("dropping malformed value for /{}: {}", key, e);
                    self.lexer.resync();
                    continue;
                }
                Err(e) => return Err(e),
            };
            match token {
                // `/Key >>`: a key without value reads as null
                Token::DictEnd if self.lenient => {
                    dict.insert(key, PdfObject::Null);
                    break;
                }
                token => match self.parse_value(token, value_start, depth) {
                    Ok(value) => dict.insert(key, value),
                    Err(e) if self.lenient && !self.depth_exceeded => {
                        tracing::debug!("dropping malformed value for /{}: {}", key, e);
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        Ok(dict)
    }

    /// Read stream bytes after the `stream` keyword.
    ///
    /// The declared `/Length` is trusted only if `endstream` follows it;
    /// otherwise the data ends at the next `endstream` marker.
    fn parse_stream_data(&mut self, dict: &PdfDictionary) -> ParseResult<Vec<u8>> {
        self.lexer.skip_stream_eol();
        let data = self.lexer.data();
        let start = self.lexer.position();

        let declared = match dict.get("Length") {
            Some(PdfObject::Integer(n)) => Some(*n),
            Some(PdfObject::Reference(id)) => self.length_resolver.and_then(|resolve| resolve(*id)),
            _ => None,
        };

        if let Some(length) = declared.and_then(|n| usize::try_from(n).ok()) {
            if let Some(end) = start.checked_add(length).filter(|end| *end <= data.len()) {
                let mut after = end;
                while after < data.len() && is_whitespace(data[after]) {
                    after += 1;
                }
                if data[after..].starts_with(b"endstream") {
                    self.lexer.seek(after + b"endstream".len());
                    return Ok(data[start..end].to_vec());
                }
            }
            if !self.lenient {
                return Err(ParseError::syntax(start, "Stream length does not match endstream"));
            }
            tracing::debug!("stream /Length {} is wrong, scanning for endstream", length);
        } else if !self.lenient {
            return Err(ParseError::MissingKey("Length".to_string()));
        }

        match find_bytes(&data[start..], b"endstream") {
            Some(rel) => {
                let mut end = start + rel;
                // The EOL before endstream is not part of the data
                if end > start && data[end - 1] == b'\n' {
                    end -= 1;
                }
                if end > start && data[end - 1] == b'\r' {
                    end -= 1;
                }
                self.lexer.seek(start + rel + b"endstream".len());
                Ok(data[start..end].to_vec())
            }
            None => {
                let end = find_bytes(&data[start..], b"endobj")
                    .map(|rel| start + rel)
                    .unwrap_or(data.len());
                self.lexer.seek(end);
                Ok(data[start..end].to_vec())
            }
        }
    }
}

fn unexpected(expected: &str, found: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        expected: expected.to_string(),
        found: format!("{found:?}"),
    }
}
