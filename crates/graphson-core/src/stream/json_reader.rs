//! Streaming JSON tokenizer.
//!
//! Reads one byte at a time from a buffered reader and validates the structure as it goes, so
//! an arbitrarily large document is never held in memory. Scalars are decoded with serde_json:
//! strings for escape handling, numbers through [`serde_json::Number`] which keeps the literal
//! text intact.

use std::io::{BufReader, ErrorKind, Read};
use std::str::FromStr;

use crate::error::{GraphsonError, GraphsonResult};
use crate::traits::{RawScalar, Token, TokenSource};

/// Maximum container nesting accepted from the input.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Just after the opening bracket.
    Start,
    /// After a comma inside an object.
    ExpectKey,
    /// After `"key":`.
    AfterKey,
    /// After a comma inside an array.
    ExpectValue,
    /// After a complete member or element.
    AfterValue,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    container: Container,
    position: Position,
}

/// A [`TokenSource`] over any byte stream.
pub struct JsonTokenReader<R> {
    input: BufReader<R>,
    peeked: Option<u8>,
    offset: u64,
    stack: Vec<Frame>,
    current: Option<Token>,
    field_name: Option<String>,
    scalar: Option<RawScalar>,
    root_done: bool,
}

impl<R: Read> JsonTokenReader<R> {
    /// Create a tokenizer reading from `input`.
    pub fn new(input: R) -> Self {
        Self {
            input: BufReader::new(input),
            peeked: None,
            offset: 0,
            stack: Vec::new(),
            current: None,
            field_name: None,
            scalar: None,
            root_done: false,
        }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current container depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn peek(&mut self) -> GraphsonResult<Option<u8>> {
        if let Some(b) = self.peeked {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.peeked = Some(buf[0]);
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn bump(&mut self) -> GraphsonResult<Option<u8>> {
        let b = self.peek()?;
        if b.is_some() {
            self.peeked = None;
            self.offset += 1;
        }
        Ok(b)
    }

    fn peek_non_ws(&mut self) -> GraphsonResult<Option<u8>> {
        while let Some(b) = self.peek()? {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.bump()?;
            } else {
                return Ok(Some(b));
            }
        }
        Ok(None)
    }

    fn require_non_ws(&mut self) -> GraphsonResult<u8> {
        self.peek_non_ws()?
            .ok_or_else(|| GraphsonError::unexpected_eof(self.offset))
    }

    fn unexpected(&self, b: u8, expected: &str) -> GraphsonError {
        GraphsonError::malformed_at(
            format!("unexpected character '{}', expected {}", b.escape_ascii(), expected),
            self.offset,
        )
    }

    fn value_completed(&mut self) {
        match self.stack.last_mut() {
            Some(frame) => frame.position = Position::AfterValue,
            None => self.root_done = true,
        }
    }

    fn open(&mut self, container: Container) -> GraphsonResult<Token> {
        if self.stack.len() >= MAX_NESTING {
            return Err(GraphsonError::malformed_at(
                format!("nesting deeper than {} levels", MAX_NESTING),
                self.offset,
            ));
        }
        self.bump()?;
        self.stack.push(Frame {
            container,
            position: Position::Start,
        });
        Ok(match container {
            Container::Object => Token::StartObject,
            Container::Array => Token::StartArray,
        })
    }

    fn close(&mut self) -> GraphsonResult<Token> {
        self.bump()?;
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| GraphsonError::malformed_at("unbalanced closing bracket", self.offset))?;
        self.value_completed();
        Ok(match frame.container {
            Container::Object => Token::EndObject,
            Container::Array => Token::EndArray,
        })
    }

    fn lex_value(&mut self, b: u8) -> GraphsonResult<Token> {
        match b {
            b'{' => self.open(Container::Object),
            b'[' => self.open(Container::Array),
            b'"' => {
                let s = self.lex_string()?;
                self.scalar = Some(RawScalar::String(s));
                self.value_completed();
                Ok(Token::String)
            }
            b'-' | b'0'..=b'9' => {
                let n = self.lex_number()?;
                self.scalar = Some(RawScalar::Number(n));
                self.value_completed();
                Ok(Token::Number)
            }
            b't' => {
                self.lex_literal(b"true")?;
                self.scalar = Some(RawScalar::Boolean(true));
                self.value_completed();
                Ok(Token::True)
            }
            b'f' => {
                self.lex_literal(b"false")?;
                self.scalar = Some(RawScalar::Boolean(false));
                self.value_completed();
                Ok(Token::False)
            }
            b'n' => {
                self.lex_literal(b"null")?;
                self.scalar = Some(RawScalar::Null);
                self.value_completed();
                Ok(Token::Null)
            }
            other => Err(self.unexpected(other, "a value")),
        }
    }

    fn lex_key(&mut self) -> GraphsonResult<Token> {
        let name = self.lex_string()?;
        match self.require_non_ws()? {
            b':' => {
                self.bump()?;
            }
            other => return Err(self.unexpected(other, "':'")),
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.position = Position::AfterKey;
        }
        self.field_name = Some(name);
        Ok(Token::FieldName)
    }

    fn lex_string(&mut self) -> GraphsonResult<String> {
        let start = self.offset;
        self.bump()?;
        let mut raw = vec![b'"'];
        loop {
            let b = self
                .bump()?
                .ok_or_else(|| GraphsonError::unexpected_eof(self.offset))?;
            match b {
                b'"' => break,
                b'\\' => {
                    raw.push(b);
                    let escaped = self
                        .bump()?
                        .ok_or_else(|| GraphsonError::unexpected_eof(self.offset))?;
                    raw.push(escaped);
                }
                0x00..=0x1f => {
                    return Err(GraphsonError::malformed_at(
                        "control character in string",
                        self.offset,
                    ))
                }
                _ => raw.push(b),
            }
        }
        raw.push(b'"');
        serde_json::from_slice::<String>(&raw)
            .map_err(|e| GraphsonError::malformed_at(format!("invalid string: {}", e), start))
    }

    fn lex_number(&mut self) -> GraphsonResult<serde_json::Number> {
        let start = self.offset;
        let mut text = String::new();
        while let Some(b) = self.peek()? {
            if matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                text.push(b as char);
                self.bump()?;
            } else {
                break;
            }
        }
        serde_json::Number::from_str(&text).map_err(|_| {
            GraphsonError::malformed_at(format!("invalid number literal '{}'", text), start)
        })
    }

    fn lex_literal(&mut self, literal: &'static [u8]) -> GraphsonResult<()> {
        let start = self.offset;
        for expected in literal {
            match self.bump()? {
                Some(b) if b == *expected => {}
                Some(_) | None => {
                    return Err(GraphsonError::malformed_at(
                        format!(
                            "invalid literal, expected '{}'",
                            String::from_utf8_lossy(literal)
                        ),
                        start,
                    ))
                }
            }
        }
        Ok(())
    }

    fn advance(&mut self) -> GraphsonResult<Option<Token>> {
        let frame = match self.stack.last().copied() {
            Some(frame) => frame,
            None => {
                return match self.peek_non_ws()? {
                    None if self.root_done => Ok(None),
                    None => Err(GraphsonError::unexpected_eof(self.offset)),
                    Some(b) if self.root_done => Err(self.unexpected(b, "end of input")),
                    Some(b) => self.lex_value(b).map(Some),
                };
            }
        };

        let b = self.require_non_ws()?;
        let token = match (frame.container, frame.position, b) {
            (Container::Object, Position::Start | Position::AfterValue, b'}') => self.close()?,
            (Container::Array, Position::Start | Position::AfterValue, b']') => self.close()?,
            (Container::Object, Position::AfterValue, b',') => {
                self.bump()?;
                self.set_position(Position::ExpectKey);
                match self.require_non_ws()? {
                    b'"' => self.lex_key()?,
                    other => return Err(self.unexpected(other, "a field name")),
                }
            }
            (Container::Array, Position::AfterValue, b',') => {
                self.bump()?;
                self.set_position(Position::ExpectValue);
                let next = self.require_non_ws()?;
                self.lex_value(next)?
            }
            (Container::Object, Position::Start | Position::ExpectKey, b'"') => self.lex_key()?,
            (Container::Object, Position::AfterKey, _) => self.lex_value(b)?,
            (Container::Array, Position::Start | Position::ExpectValue, _) => self.lex_value(b)?,
            (Container::Object, _, other) => return Err(self.unexpected(other, "',' or '}'")),
            (Container::Array, _, other) => return Err(self.unexpected(other, "',' or ']'")),
        };
        Ok(Some(token))
    }

    fn set_position(&mut self, position: Position) {
        if let Some(frame) = self.stack.last_mut() {
            frame.position = position;
        }
    }
}

impl<R: Read> TokenSource for JsonTokenReader<R> {
    fn next_token(&mut self) -> GraphsonResult<Option<Token>> {
        // The field name stays visible on the value token right after it.
        if self.current != Some(Token::FieldName) {
            self.field_name = None;
        }
        self.scalar = None;
        let token = self.advance()?;
        self.current = token;
        Ok(token)
    }

    fn current_token(&self) -> Option<Token> {
        self.current
    }

    fn current_field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    fn read_scalar(&mut self) -> GraphsonResult<RawScalar> {
        self.scalar.clone().ok_or_else(|| {
            GraphsonError::malformed_at(
                format!("expected a scalar, found {:?}", self.current),
                self.offset,
            )
        })
    }
}
