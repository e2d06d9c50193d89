//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer is a
//! cursor over an in-memory byte slice: callers may read its position, seek,
//! push tokens back and resynchronize after malformed input.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// Literal string `(...)`
    String(Vec<u8>),

    /// Hexadecimal string `<...>`
    HexString(Vec<u8>),

    /// Name object (e.g., /Type)
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// StartXRef keyword
    StartXRef,

    /// Reference marker `R`
    Ref,

    /// Null object
    Null,

    /// Any other regular-character run: content operators, `xref`, `trailer`, ...
    Keyword(String),

    /// End of input
    Eof,
}

impl Token {
    /// Numeric value of an integer or real token.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Token::Integer(i) => Some(*i as f64),
            Token::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Whether this token is the given keyword.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == keyword)
    }
}

/// PDF whitespace characters (Table 1)
#[inline]
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

/// PDF delimiter characters (Table 2)
#[inline]
pub fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline]
fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// PDF Lexer over a byte slice
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    token_buffer: Vec<(Token, usize)>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Create a new lexer positioned at `position`
    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position: position.min(data.len()),
            token_buffer: Vec::new(),
        }
    }

    /// The underlying buffer
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current byte offset. Pushed-back tokens are accounted for, so this is
    /// always the offset at which the next token returned by [`next_token`](Self::next_token) starts
    /// (or a whitespace run preceding it).
    pub fn position(&self) -> usize {
        match self.token_buffer.last() {
            Some((_, start)) => *start,
            None => self.position,
        }
    }

    /// Move the cursor, discarding any pushed-back tokens
    pub fn seek(&mut self, position: usize) {
        self.token_buffer.clear();
        self.position = position.min(self.data.len());
    }

    /// Whether the cursor reached the end of input
    pub fn is_eof(&self) -> bool {
        self.token_buffer.is_empty() && self.position >= self.data.len()
    }

    /// Push a token back; it will be returned by the next call to `next_token`
    pub fn push_token(&mut self, token: Token, start: usize) {
        self.token_buffer.push((token, start));
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.next_token_with_start().map(|(token, _)| token)
    }

    /// Get the next token together with the offset where it starts
    pub fn next_token_with_start(&mut self) -> ParseResult<(Token, usize)> {
        if let Some(entry) = self.token_buffer.pop() {
            return Ok(entry);
        }

        self.skip_whitespace_and_comments();
        let start = self.position;

        let ch = match self.peek_byte() {
            Some(ch) => ch,
            None => return Ok((Token::Eof, start)),
        };

        let token = match ch {
            b'/' => self.read_name(),
            b'(' => self.read_literal_string()?,
            b'<' => self.read_angle_bracket()?,
            b'>' => {
                self.position += 1;
                if self.peek_byte() == Some(b'>') {
                    self.position += 1;
                    Token::DictEnd
                } else {
                    return Err(ParseError::syntax(start, "Expected '>' after '>'"));
                }
            }
            b'[' => {
                self.position += 1;
                Token::ArrayStart
            }
            b']' => {
                self.position += 1;
                Token::ArrayEnd
            }
            b'{' | b'}' => {
                self.position += 1;
                Token::Keyword((ch as char).to_string())
            }
            b')' => {
                self.position += 1;
                return Err(ParseError::syntax(start, "Unbalanced ')'"));
            }
            _ => self.read_regular(),
        };

        Ok((token, start))
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let (token, start) = self.next_token_with_start()?;
        self.push_token(token.clone(), start);
        Ok(token)
    }

    /// Skip forward past the current malformed region: at least one byte,
    /// then up to the next whitespace or delimiter.
    pub fn resync(&mut self) {
        self.token_buffer.clear();
        if self.position < self.data.len() {
            self.position += 1;
        }
        while let Some(ch) = self.peek_byte() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    /// Skip whitespace only
    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_byte() {
            if !is_whitespace(ch) {
                break;
            }
            self.position += 1;
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if self.peek_byte() != Some(b'%') {
                break;
            }
            while let Some(ch) = self.peek_byte() {
                if ch == b'\n' || ch == b'\r' {
                    break;
                }
                self.position += 1;
            }
        }
    }

    /// Consume the end-of-line marker following the `stream` keyword.
    /// Accepts CRLF, LF and (leniently) a lone CR.
    pub fn skip_stream_eol(&mut self) {
        self.token_buffer.clear();
        // Some producers put spaces between the keyword and the EOL
        while self.peek_byte() == Some(b' ') {
            self.position += 1;
        }
        match self.peek_byte() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    /// Read `n` raw bytes starting at the cursor
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        self.token_buffer.clear();
        let end = self
            .position
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| ParseError::syntax(self.position, "Unexpected end of data"))?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Offset of the next occurrence of `needle` at or after the cursor
    pub fn find_forward(&self, needle: &[u8]) -> Option<usize> {
        find_bytes(&self.data[self.position..], needle).map(|i| i + self.position)
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> Token {
        self.position += 1; // consume '/'
        let mut name = Vec::new();

        while let Some(ch) = self.peek_byte() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;

            // Handle hex codes in names (e.g., /A#20B means /A B)
            if ch == b'#' {
                let hi = self.data.get(self.position).copied().and_then(hex_value);
                let lo = self
                    .data
                    .get(self.position + 1)
                    .copied()
                    .and_then(hex_value);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    self.position += 2;
                    name.push(hi << 4 | lo);
                    continue;
                }
            }
            name.push(ch);
        }

        Token::Name(decode_name_bytes(name))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1; // consume '('
        let mut string = Vec::new();
        let mut depth = 1usize;

        loop {
            let ch = match self.peek_byte() {
                Some(ch) => ch,
                None => return Err(ParseError::syntax(start, "Unterminated string")),
            };
            self.position += 1;

            match ch {
                b'\\' => {
                    let esc = match self.peek_byte() {
                        Some(esc) => esc,
                        None => return Err(ParseError::syntax(start, "Unterminated string")),
                    };
                    self.position += 1;
                    match esc {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = u32::from(esc - b'0');
                            for _ in 0..2 {
                                match self.peek_byte() {
                                    Some(d @ b'0'..=b'7') => {
                                        self.position += 1;
                                        value = value * 8 + u32::from(d - b'0');
                                    }
                                    _ => break,
                                }
                            }
                            // High-order overflow is ignored
                            string.push((value & 0xFF) as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek_byte() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        // \( \) \\ and unknown escapes: the backslash is dropped
                        other => string.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    string.push(ch);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    string.push(ch);
                }
                b'\r' => {
                    // EOL inside a string is normalized to LF
                    if self.peek_byte() == Some(b'\n') {
                        self.position += 1;
                    }
                    string.push(b'\n');
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1; // consume '<'

        if self.peek_byte() == Some(b'<') {
            self.position += 1;
            return Ok(Token::DictStart);
        }

        let mut bytes = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            let ch = match self.peek_byte() {
                Some(ch) => ch,
                None => return Err(ParseError::syntax(start, "Unterminated hex string")),
            };
            self.position += 1;

            if ch == b'>' {
                break;
            }
            if is_whitespace(ch) {
                continue;
            }
            let nibble = hex_value(ch).ok_or_else(|| {
                ParseError::syntax(self.position - 1, "Invalid character in hex string")
            })?;
            match pending.take() {
                Some(hi) => bytes.push(hi << 4 | nibble),
                None => pending = Some(nibble),
            }
        }

        // Pad with 0 if odd number of digits
        if let Some(hi) = pending {
            bytes.push(hi << 4);
        }

        Ok(Token::HexString(bytes))
    }

    /// Read a run of regular characters: a number or a keyword
    fn read_regular(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.peek_byte() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;
        }
        let word = &self.data[start..self.position];

        if let Some(number) = parse_number(word) {
            return number;
        }

        match word {
            b"true" => Token::Boolean(true),
            b"false" => Token::Boolean(false),
            b"null" => Token::Null,
            b"obj" => Token::Obj,
            b"endobj" => Token::EndObj,
            b"stream" => Token::Stream,
            b"endstream" => Token::EndStream,
            b"startxref" => Token::StartXRef,
            b"R" => Token::Ref,
            _ => Token::Keyword(String::from_utf8_lossy(word).into_owned()),
        }
    }
}

/// Interpret a byte run as a PDF number.
///
/// Accepts the forms real-world producers emit: `+5`, `-.5`, `4.`, and tolerates
/// a doubled sign (`--5`). Integers that do not fit an `i64` become reals.
fn parse_number(word: &[u8]) -> Option<Token> {
    let mut i = 0;
    let mut negative = false;
    while i < word.len() && matches!(word[i], b'+' | b'-') {
        negative ^= word[i] == b'-';
        i += 1;
    }
    let digits = &word[i..];
    if digits.is_empty() {
        return None;
    }

    let mut seen_dot = false;
    let mut seen_digit = false;
    for &b in digits {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }

    let text = std::str::from_utf8(digits).ok()?;
    if !seen_dot {
        if let Ok(value) = text.parse::<i64>() {
            return Some(Token::Integer(if negative { -value } else { value }));
        }
    }
    let value: f64 = if text.starts_with('.') {
        format!("0{text}").parse().ok()?
    } else {
        text.trim_end_matches('.').parse().ok()?
    };
    Some(Token::Real(if negative { -value } else { value }))
}

fn decode_name_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(name) => name,
        // Non-UTF-8 names are kept byte-for-byte as Latin-1 characters
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Offset of the first occurrence of `needle` in `haystack`
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Offset of the last occurrence of `needle` in `haystack`
pub fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn test_lexer_basic_tokens() {
        assert_eq!(
            tokens(b"true false null 123 -456 3.14 /Name"),
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
                Token::Integer(123),
                Token::Integer(-456),
                Token::Real(3.14),
                Token::Name("Name".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_number_forms() {
        assert_eq!(
            tokens(b"+17 .5 -.002 4. --3 0.0"),
            vec![
                Token::Integer(17),
                Token::Real(0.5),
                Token::Real(-0.002),
                Token::Real(4.0),
                Token::Integer(3),
                Token::Real(0.0),
            ]
        );
    }

    #[test]
    fn test_lexer_integer_overflow_becomes_real() {
        let toks = tokens(b"99999999999999999999");
        assert!(matches!(toks[0], Token::Real(v) if v > 9.9e18));
    }

    #[test]
    fn test_lexer_keywords() {
        assert_eq!(
            tokens(b"obj endobj stream endstream startxref R xref trailer BT Tj T*"),
            vec![
                Token::Obj,
                Token::EndObj,
                Token::Stream,
                Token::EndStream,
                Token::StartXRef,
                Token::Ref,
                Token::Keyword("xref".into()),
                Token::Keyword("trailer".into()),
                Token::Keyword("BT".into()),
                Token::Keyword("Tj".into()),
                Token::Keyword("T*".into()),
            ]
        );
    }

    #[test]
    fn test_lexer_string_escapes() {
        assert_eq!(
            tokens(br"(a\nb\t\(c\)\\ \101\7)"),
            vec![Token::String(b"a\nb\t(c)\\ A\x07".to_vec())]
        );
    }

    #[test]
    fn test_lexer_string_nested_parens_and_continuation() {
        assert_eq!(
            tokens(b"(outer (inner) done) (split \\\nline)"),
            vec![
                Token::String(b"outer (inner) done".to_vec()),
                Token::String(b"split line".to_vec()),
            ]
        );
    }

    #[test]
    fn test_lexer_string_eol_normalized() {
        assert_eq!(
            tokens(b"(a\r\nb\rc)"),
            vec![Token::String(b"a\nb\nc".to_vec())]
        );
    }

    #[test]
    fn test_lexer_hex_strings() {
        assert_eq!(
            tokens(b"<48656C6C6F> <48 65 6c> <ABC> <>"),
            vec![
                Token::HexString(b"Hello".to_vec()),
                Token::HexString(b"Hel".to_vec()),
                Token::HexString(vec![0xAB, 0xC0]),
                Token::HexString(vec![]),
            ]
        );
    }

    #[test]
    fn test_lexer_names_with_escapes() {
        assert_eq!(
            tokens(b"/A#20B /Type/Page /#41"),
            vec![
                Token::Name("A B".into()),
                Token::Name("Type".into()),
                Token::Name("Page".into()),
                Token::Name("A".into()),
            ]
        );
        assert_eq!(tokens(b"/"), vec![Token::Name(String::new())]);
    }

    #[test]
    fn test_lexer_dict_and_array_markers() {
        assert_eq!(
            tokens(b"<< /Kids [1 0 R] >>"),
            vec![
                Token::DictStart,
                Token::Name("Kids".into()),
                Token::ArrayStart,
                Token::Integer(1),
                Token::Integer(0),
                Token::Ref,
                Token::ArrayEnd,
                Token::DictEnd,
            ]
        );
    }

    #[test]
    fn test_lexer_comments_are_skipped() {
        assert_eq!(
            tokens(b"% header\n1 % trailing\n2%x\r3"),
            vec![Token::Integer(1), Token::Integer(2), Token::Integer(3)]
        );
    }

    #[test]
    fn test_lexer_malformed_and_resync() {
        let mut lexer = Lexer::new(b") 42");
        assert!(lexer.next_token().is_err());
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(42));

        let mut lexer = Lexer::new(b"<zz> /Ok");
        let err = lexer.next_token().unwrap_err();
        assert!(matches!(err, ParseError::SyntaxError { .. }));
        lexer.resync();
        let found = loop {
            match lexer.next_token() {
                Ok(Token::Name(name)) => break name,
                Ok(Token::Eof) => break String::new(),
                Ok(_) => {}
                Err(_) => lexer.resync(),
            }
        };
        assert_eq!(found, "Ok");
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let mut lexer = Lexer::new(b"(never closed");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_lexer_push_and_peek() {
        let mut lexer = Lexer::new(b"1 2 R");
        assert_eq!(lexer.peek_token().unwrap(), Token::Integer(1));
        assert_eq!(lexer.position(), 0);
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(1));
        let (tok, start) = lexer.next_token_with_start().unwrap();
        assert_eq!(start, 2);
        lexer.push_token(tok, start);
        assert_eq!(lexer.position(), 2);
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(2));
        assert_eq!(lexer.next_token().unwrap(), Token::Ref);
        assert!(lexer.next_token().unwrap() == Token::Eof);
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_stream_eol_and_raw_reads() {
        let data = b"stream\r\nABCDendstream";
        let mut lexer = Lexer::new(data);
        assert_eq!(lexer.next_token().unwrap(), Token::Stream);
        lexer.skip_stream_eol();
        assert_eq!(lexer.read_bytes(4).unwrap(), b"ABCD");
        assert_eq!(lexer.find_forward(b"endstream"), Some(12));
        assert!(lexer.read_bytes(100).is_err());
    }

    #[test]
    fn test_find_helpers() {
        assert_eq!(find_bytes(b"abcabc", b"bc"), Some(1));
        assert_eq!(rfind_bytes(b"abcabc", b"bc"), Some(4));
        assert_eq!(find_bytes(b"ab", b"abc"), None);
    }
}
