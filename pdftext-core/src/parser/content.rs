//! PDF Content Stream Parser
//!
//! Turns a decoded content stream into the operations the text pipeline acts
//! on. Operands are collected on a stack until an operator arrives; the stack
//! is cleared after every operator, whether the operator was understood or
//! not, so one malformed operation never leaks operands into the next.
//!
//! Operators outside the text, graphics-state and XObject families (paths,
//! colours, shading, marked content) are skipped. Inline images (`BI ... ID
//! <binary> EI`) are stepped over without interpreting their data.

use super::lexer::{is_whitespace, Lexer, Token};
use super::objects::{PdfArray, PdfDictionary, PdfName, PdfObject, PdfString};

/// Operand nesting limit inside content streams
const MAX_OPERAND_DEPTH: usize = 32;

/// A text-relevant operator in a content stream
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOperation {
    // Text object operators
    BeginText, // BT
    EndText,   // ET

    // Text state operators
    SetCharSpacing(f32),       // Tc
    SetWordSpacing(f32),       // Tw
    SetHorizontalScaling(f32), // Tz
    SetLeading(f32),           // TL
    SetFont(String, f32),      // Tf
    SetTextRenderMode(i32),    // Tr
    SetTextRise(f32),          // Ts

    // Text positioning operators
    MoveText(f32, f32),                          // Td
    MoveTextSetLeading(f32, f32),                // TD
    SetTextMatrix(f32, f32, f32, f32, f32, f32), // Tm
    NextLine,                                    // T*

    // Text showing operators
    ShowText(Vec<u8>),                             // Tj
    ShowTextArray(Vec<TextElement>),               // TJ
    NextLineShowText(Vec<u8>),                     // '
    SetSpacingNextLineShowText(f32, f32, Vec<u8>), // aw ac string "

    // Graphics state operators
    SaveGraphicsState,                                // q
    RestoreGraphicsState,                             // Q
    SetTransformMatrix(f32, f32, f32, f32, f32, f32), // cm

    // XObjects
    PaintXObject(String), // Do
}

/// Element of a `TJ` array
#[derive(Debug, Clone, PartialEq)]
pub enum TextElement {
    Text(Vec<u8>),
    /// Adjustment in thousandths of text space; positive values move left
    Spacing(f32),
}

/// Content stream parser
pub struct ContentParser<'a> {
    lexer: Lexer<'a>,
    operands: Vec<PdfObject>,
    skipped: usize,
}

impl<'a> ContentParser<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(content),
            operands: Vec::new(),
            skipped: 0,
        }
    }

    /// Parse a whole content stream
    pub fn parse(content: &[u8]) -> Vec<ContentOperation> {
        ContentParser::new(content).collect()
    }

    /// Operators skipped so far: unknown, non-text, or with unusable operands
    pub fn skipped_operators(&self) -> usize {
        self.skipped
    }

    fn next_operation(&mut self) -> Option<ContentOperation> {
        loop {
            let before = self.lexer.position();
            let token = match self.lexer.next_token() {
                Ok(Token::Eof) => return None,
                Ok(token) => token,
                Err(e) => {
                    tracing::trace!("content stream: {}", e);
                    self.recover_from(before);
                    continue;
                }
            };

            let operator = match token {
                Token::Keyword(op) => op,
                Token::Ref => "R".to_string(),
                Token::Obj | Token::EndObj | Token::Stream | Token::EndStream | Token::StartXRef => {
                    format!("{token:?}")
                }
                Token::ArrayEnd | Token::DictEnd => {
                    tracing::trace!("content stream: stray {:?} at {}", token, before);
                    continue;
                }
                operand => {
                    if let Some(value) = self.read_operand(operand, 0) {
                        self.operands.push(value);
                    }
                    continue;
                }
            };

            if operator == "ID" {
                self.skip_inline_image();
            }

            let operation = self.build_operation(&operator);
            self.operands.clear();
            match operation {
                Some(operation) => return Some(operation),
                None => self.skipped += 1,
            }
        }
    }

    fn read_operand(&mut self, token: Token, depth: usize) -> Option<PdfObject> {
        match token {
            Token::Integer(i) => Some(PdfObject::Integer(i)),
            Token::Real(r) => Some(PdfObject::Real(r)),
            Token::Boolean(b) => Some(PdfObject::Boolean(b)),
            Token::Null => Some(PdfObject::Null),
            Token::String(s) | Token::HexString(s) => Some(PdfObject::String(PdfString(s))),
            Token::Name(n) => Some(PdfObject::Name(PdfName(n))),
            Token::ArrayStart if depth < MAX_OPERAND_DEPTH => {
                let mut array = PdfArray::new();
                loop {
                    let before = self.lexer.position();
                    match self.lexer.next_token() {
                        Ok(Token::ArrayEnd) | Ok(Token::Eof) => break,
                        Ok(token) => {
                            if let Some(value) = self.read_operand(token, depth + 1) {
                                array.push(value);
                            }
                        }
                        Err(_) => self.recover_from(before),
                    }
                }
                Some(PdfObject::Array(array))
            }
            Token::DictStart if depth < MAX_OPERAND_DEPTH => {
                let mut dict = PdfDictionary::new();
                loop {
                    let before = self.lexer.position();
                    match self.lexer.next_token() {
                        Ok(Token::DictEnd) | Ok(Token::Eof) => break,
                        Ok(Token::Name(key)) => match self.lexer.next_token() {
                            Ok(Token::DictEnd) | Ok(Token::Eof) => break,
                            Ok(token) => {
                                let value = self.read_operand(token, depth + 1);
                                dict.insert(key, value.unwrap_or(PdfObject::Null));
                            }
                            Err(_) => self.recover_from(before),
                        },
                        Ok(_) => {}
                        Err(_) => self.recover_from(before),
                    }
                }
                Some(PdfObject::Dictionary(dict))
            }
            other => {
                tracing::trace!("content stream: unexpected operand {:?}", other);
                None
            }
        }
    }

    /// Guarantee progress after a lexer error that consumed nothing
    fn recover_from(&mut self, before: usize) {
        if self.lexer.position() == before {
            self.lexer.resync();
        }
    }

    /// Skip binary inline image data up to and including the `EI` operator
    fn skip_inline_image(&mut self) {
        let data = self.lexer.data();
        let mut pos = self.lexer.position();
        // A single whitespace byte separates ID from the data
        if data.get(pos).is_some_and(|b| is_whitespace(*b)) {
            pos += 1;
        }
        while pos + 1 < data.len() {
            let at_ei = data[pos] == b'E' && data[pos + 1] == b'I';
            let before_ok = pos == 0 || is_whitespace(data[pos - 1]);
            let after_ok = data.get(pos + 2).map_or(true, |b| is_whitespace(*b));
            if at_ei && before_ok && after_ok {
                self.lexer.seek(pos + 2);
                return;
            }
            pos += 1;
        }
        tracing::debug!("inline image without EI, skipping to end of stream");
        self.lexer.seek(data.len());
    }

    fn build_operation(&mut self, operator: &str) -> Option<ContentOperation> {
        use ContentOperation::*;

        let operation = match operator {
            "BT" => BeginText,
            "ET" => EndText,

            "Tc" => SetCharSpacing(self.number()?),
            "Tw" => SetWordSpacing(self.number()?),
            "Tz" => SetHorizontalScaling(self.number()?),
            "TL" => SetLeading(self.number()?),
            "Ts" => SetTextRise(self.number()?),
            "Tr" => SetTextRenderMode(self.operands.last()?.as_integer()? as i32),
            "Tf" => {
                let [size] = self.numbers::<1>()?;
                let name = match self.operands.len().checked_sub(2).and_then(|i| self.operands.get(i)) {
                    Some(PdfObject::Name(name)) => name.0.clone(),
                    _ => return None,
                };
                SetFont(name, size)
            }

            "Td" => {
                let [tx, ty] = self.numbers::<2>()?;
                MoveText(tx, ty)
            }
            "TD" => {
                let [tx, ty] = self.numbers::<2>()?;
                MoveTextSetLeading(tx, ty)
            }
            "Tm" => {
                let [a, b, c, d, e, f] = self.numbers::<6>()?;
                SetTextMatrix(a, b, c, d, e, f)
            }
            "T*" => NextLine,

            "Tj" => ShowText(self.string()?),
            "'" => NextLineShowText(self.string()?),
            "\"" => {
                let text = self.string()?;
                let len = self.operands.len();
                let word_spacing = self.operands.get(len.checked_sub(3)?)?.as_f32()?;
                let char_spacing = self.operands.get(len - 2)?.as_f32()?;
                SetSpacingNextLineShowText(word_spacing, char_spacing, text)
            }
            "TJ" => {
                let array = self.operands.last()?.as_array()?;
                let elements = array
                    .iter()
                    .filter_map(|element| match element {
                        PdfObject::String(s) => Some(TextElement::Text(s.0.clone())),
                        other => other.as_f32().map(TextElement::Spacing),
                    })
                    .collect();
                ShowTextArray(elements)
            }

            "q" => SaveGraphicsState,
            "Q" => RestoreGraphicsState,
            "cm" => {
                let [a, b, c, d, e, f] = self.numbers::<6>()?;
                SetTransformMatrix(a, b, c, d, e, f)
            }

            "Do" => PaintXObject(self.operands.last()?.as_name()?.0.clone()),

            other => {
                tracing::trace!("content stream: skipping operator {}", other);
                return None;
            }
        };
        Some(operation)
    }

    fn number(&self) -> Option<f32> {
        self.operands.last()?.as_f32()
    }

    /// The last `N` operands as numbers, in stream order
    fn numbers<const N: usize>(&self) -> Option<[f32; N]> {
        let start = self.operands.len().checked_sub(N)?;
        let mut out = [0.0; N];
        for (slot, operand) in out.iter_mut().zip(&self.operands[start..]) {
            *slot = operand.as_f32()?;
        }
        Some(out)
    }

    fn string(&self) -> Option<Vec<u8>> {
        self.operands.last()?.as_string().map(|s| s.0.clone())
    }
}

impl Iterator for ContentParser<'_> {
    type Item = ContentOperation;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_operation()
    }
}
