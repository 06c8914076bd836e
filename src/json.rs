//! Streaming JSON Decoder
//!
//! A token-at-a-time JSON reader that tracks how deeply it is nested, so
//! callers can walk an object field by field and decode only the fields they
//! care about. Individual values are handed to `serde_json` once their extent
//! is known.

use std::fmt;
use std::io::Read;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::stack::Stack;

// == Token ==
/// One lexical JSON token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BeginObject => f.write_str("'{'"),
            Token::EndObject => f.write_str("'}'"),
            Token::BeginArray => f.write_str("'['"),
            Token::EndArray => f.write_str("']'"),
            Token::String(s) => write!(f, "string {:?}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Bool(b) => write!(f, "bool {}", b),
            Token::Null => f.write_str("null"),
        }
    }
}

/// What the decoder last stepped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Top level, or after the outermost container closed
    None,
    Array,
    Object,
    /// A scalar (string, number, bool or null)
    Value,
}

/// Returned by a field callback of [`JsonDecoder::decode_object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The callback consumed the field's value
    Decoded,
    /// The decoder should skip the field's value
    Skip,
}

/// Types that decode themselves field by field.
pub trait JsonObject {
    fn decode_json(&mut self, decoder: &mut JsonDecoder) -> Result<()>;
}

// == Decoder ==
pub struct JsonDecoder {
    buf: Vec<u8>,
    pos: usize,
    nesting: Stack<Scope>,
    current: Scope,
    object_key: bool,
    object_closed: bool,
}

impl fmt::Debug for JsonDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("pos", &self.pos)
            .field("len", &self.buf.len())
            .field("depth", &self.depth())
            .field("current", &self.current)
            .finish()
    }
}

impl JsonDecoder {
    pub fn from_slice(src: &[u8]) -> Self {
        Self::from_vec(src.to_vec())
    }

    pub fn from_vec(buf: Vec<u8>) -> Self {
        Self {
            buf,
            pos: 0,
            nesting: Stack::new(),
            current: Scope::None,
            object_key: false,
            object_closed: false,
        }
    }

    /// Reads the whole of `reader` up front.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(Error::Read)?;
        Ok(Self::from_vec(buf))
    }

    // == State ==
    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.nesting.len()
    }

    pub fn current(&self) -> Scope {
        self.current
    }

    /// Whether the last string token was an object key.
    pub fn is_object_key(&self) -> bool {
        self.object_key
    }

    /// Whether the last token closed an object or array.
    pub fn is_object_closed(&self) -> bool {
        self.object_closed
    }

    /// Whether another element follows at the current level.
    pub fn more(&mut self) -> bool {
        self.skip_separators();
        !matches!(self.buf.get(self.pos), None | Some(b']') | Some(b'}'))
    }

    // == Token ==
    /// Reads the next token and updates the nesting state.
    pub fn token(&mut self) -> Result<Token> {
        self.object_closed = false;
        let token = self.read_token()?;

        match &token {
            Token::BeginObject => self.open(Scope::Object),
            Token::BeginArray => self.open(Scope::Array),
            Token::EndObject => self.close(Scope::Object, &token)?,
            Token::EndArray => self.close(Scope::Array, &token)?,
            _ => {
                // Strings and scalars alternate between key and value inside objects
                self.object_key = self.nesting.peek() == Some(&Scope::Object) && !self.object_key;
                self.current = Scope::Value;
            }
        }
        Ok(token)
    }

    fn open(&mut self, scope: Scope) {
        self.nesting.push(scope);
        self.current = scope;
        self.object_key = false;
    }

    fn close(&mut self, scope: Scope, token: &Token) -> Result<()> {
        if self.nesting.pop() != Some(scope) {
            return Err(unexpected("matching close delimiter", token));
        }
        self.object_closed = true;
        self.object_key = false;
        self.current = self.nesting.peek().copied().unwrap_or(Scope::None);
        Ok(())
    }

    // == Skip ==
    /// Consumes the next complete value, scalar or container.
    pub fn skip(&mut self) -> Result<()> {
        match self.token()? {
            Token::BeginObject | Token::BeginArray => {
                let depth = self.depth();
                while self.depth() >= depth {
                    self.token()?;
                }
                Ok(())
            }
            token @ (Token::EndObject | Token::EndArray) => Err(unexpected("value", &token)),
            _ => Ok(()),
        }
    }

    // == Decode ==
    /// Consumes the next complete value and deserializes it into `T`.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.skip_separators();
        let start = self.pos;
        self.skip()?;
        Ok(serde_json::from_slice(&self.buf[start..self.pos])?)
    }

    /// Lets `target` decode itself from the current position.
    pub fn decode_into<O: JsonObject + ?Sized>(&mut self, target: &mut O) -> Result<()> {
        target.decode_json(self)
    }

    /// Walks the next value, which must be an object, calling `field` with each
    /// key. The callback either consumes the value (typically through
    /// [`JsonDecoder::decode`]) and returns [`Field::Decoded`], or returns
    /// [`Field::Skip`] and the value is skipped.
    pub fn decode_object<F>(&mut self, mut field: F) -> Result<()>
    where
        F: FnMut(&mut JsonDecoder, &str) -> Result<Field>,
    {
        match self.token()? {
            Token::BeginObject => {}
            token => return Err(unexpected("object", &token)),
        }

        let depth = self.depth();
        loop {
            match self.token()? {
                Token::EndObject if self.depth() < depth => return Ok(()),
                Token::String(name) if self.object_key && self.depth() == depth => {
                    if field(self, &name)? == Field::Skip {
                        self.skip()?;
                    }
                }
                token => return Err(unexpected("object key", &token)),
            }
        }
    }

    // == Lexer ==
    fn skip_separators(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r' | b',' | b':') = self.buf.get(self.pos) {
            self.pos += 1;
        }
    }

    fn read_token(&mut self) -> Result<Token> {
        self.skip_separators();
        let start = self.pos;
        let byte = *self.buf.get(start).ok_or(Error::UnexpectedEof)?;

        let token = match byte {
            b'{' => Token::BeginObject,
            b'}' => Token::EndObject,
            b'[' => Token::BeginArray,
            b']' => Token::EndArray,
            b'"' => {
                let end = self.scan_string(start)?;
                let value = serde_json::from_slice(&self.buf[start..end])?;
                self.pos = end;
                return Ok(Token::String(value));
            }
            b'-' | b'0'..=b'9' => {
                let end = self.scan_number(start);
                let value = serde_json::from_slice(&self.buf[start..end])?;
                self.pos = end;
                return Ok(Token::Number(value));
            }
            b't' => return self.literal(b"true", Token::Bool(true)),
            b'f' => return self.literal(b"false", Token::Bool(false)),
            b'n' => return self.literal(b"null", Token::Null),
            other => {
                return Err(Error::Syntax {
                    offset: start,
                    found: other as char,
                })
            }
        };
        self.pos += 1;
        Ok(token)
    }

    /// Returns the offset just past the closing quote.
    fn scan_string(&self, start: usize) -> Result<usize> {
        let mut i = start + 1;
        loop {
            match self.buf.get(i) {
                None => return Err(Error::UnexpectedEof),
                Some(b'\\') => i += 2,
                Some(b'"') => return Ok(i + 1),
                Some(_) => i += 1,
            }
        }
    }

    fn scan_number(&self, start: usize) -> usize {
        let mut i = start;
        while let Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') = self.buf.get(i) {
            i += 1;
        }
        i
    }

    fn literal(&mut self, word: &'static [u8], token: Token) -> Result<Token> {
        let rest = &self.buf[self.pos..];
        if rest.starts_with(word) {
            self.pos += word.len();
            return Ok(token);
        }
        if word.starts_with(rest) {
            return Err(Error::UnexpectedEof);
        }

        let offset = rest
            .iter()
            .zip(word)
            .position(|(a, b)| a != b)
            .unwrap_or(0);
        Err(Error::Syntax {
            offset: self.pos + offset,
            found: rest[offset] as char,
        })
    }
}

fn unexpected(expected: &'static str, found: &Token) -> Error {
    Error::UnexpectedToken {
        expected,
        found: found.to_string(),
    }
}
