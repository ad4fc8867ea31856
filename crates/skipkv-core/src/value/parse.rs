//! Text decoder for `Value`.
//!
//! Accepts everything `Value::encode` produces plus plain JSON: objects may
//! separate keys from values with `.` or `:`, and strings accept `\/` and
//! `\uXXXX` escapes (surrogate pairs included).

use std::error::Error;
use std::fmt;

use super::{Number, Object, Value};

/// Arrays and objects nested deeper than this are rejected.
const MAX_DEPTH: usize = 200;

/// Syntax error with the byte offset where decoding stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl Error for ParseError {}

pub(super) fn parse(text: &str) -> Result<Value, ParseError> {
    let mut parser = Parser { text, bytes: text.as_bytes(), pos: 0 };
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(parser.unexpected("end of input"));
    }
    Ok(value)
}

/// Outcome of decoding a run of concatenated values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValues {
    /// Values decoded before the input ended or an error occurred
    pub values: Vec<Value>,
    /// Byte offset just past the last decoded value and its trailing whitespace
    pub stop: usize,
    /// Set when decoding stopped on a malformed value
    pub error: Option<ParseError>,
}

pub(super) fn parse_multi(text: &str) -> ParsedValues {
    let mut parser = Parser { text, bytes: text.as_bytes(), pos: 0 };
    let mut values = Vec::new();
    parser.skip_whitespace();
    let mut stop = parser.pos;

    while parser.pos < parser.bytes.len() {
        match parser.parse_value(0) {
            Ok(value) => values.push(value),
            Err(error) => return ParsedValues { values, stop, error: Some(error) },
        }
        parser.skip_whitespace();
        stop = parser.pos;
    }

    ParsedValues { values, stop, error: None }
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error_at(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError { offset, message: message.into() }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.text[self.pos..].chars().next() {
            Some(c) => format!("{:?}", c),
            None => "end of input".to_string(),
        };
        self.error_at(self.pos, format!("expected {}, found {}", expected, found))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error_at(self.pos, "exceeded maximum nesting depth"));
        }
        self.skip_whitespace();
        match self.peek() {
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(b't') => self.parse_literal("true", Value::Boolean(true)),
            Some(b'f') => self.parse_literal("false", Value::Boolean(false)),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b'[') => self.parse_array(depth),
            Some(b'{') => self.parse_object(depth),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Value, ParseError> {
        if self.text[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(value)
        } else {
            Err(self.unexpected(word))
        }
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }

        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                if matches!(self.peek(), Some(b'0'..=b'9')) {
                    return Err(self.error_at(self.pos, "leading zeros not permitted in numbers"));
                }
            }
            Some(b'1'..=b'9') => {
                self.skip_digits();
            }
            _ => return Err(self.unexpected("a digit")),
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if self.skip_digits() == 0 {
                return Err(self.unexpected("a digit after the decimal point"));
            }
            is_float = true;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.skip_digits() == 0 {
                return Err(self.unexpected("a digit in the exponent"));
            }
            is_float = true;
        }

        let literal = &self.text[start..self.pos];
        if !is_float {
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Value::Number(Number::Int(i)));
            }
        }
        literal
            .parse::<f64>()
            .map(|f| Value::Number(Number::Float(f)))
            .map_err(|_| self.error_at(start, format!("invalid number {}", literal)))
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        // opening quote
        self.pos += 1;
        let mut out = String::new();
        loop {
            let ch = match self.text[self.pos..].chars().next() {
                Some(ch) => ch,
                None => return Err(self.error_at(self.pos, "unterminated string")),
            };
            let at = self.pos;
            self.pos += ch.len_utf8();
            match ch {
                '"' => return Ok(out),
                '\\' => self.parse_escape(&mut out)?,
                c if (c as u32) < 0x20 => {
                    return Err(self.error_at(at, format!("unescaped {:?} in string", c)));
                }
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let at = self.pos;
        let code = match self.peek() {
            Some(code) => code,
            None => return Err(self.error_at(at, "unterminated escape")),
        };
        self.pos += 1;
        match code {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{08}'),
            b'f' => out.push('\u{0c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let unit = self.parse_hex4()?;
                let scalar = match unit {
                    0xD800..=0xDBFF => {
                        if !self.text[self.pos..].starts_with("\\u") {
                            return Err(self.error_at(at, "unpaired high surrogate"));
                        }
                        self.pos += 2;
                        let low = self.parse_hex4()?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return Err(self.error_at(at, "invalid low surrogate"));
                        }
                        0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                    }
                    0xDC00..=0xDFFF => return Err(self.error_at(at, "unpaired low surrogate")),
                    _ => unit,
                };
                match char::from_u32(scalar) {
                    Some(c) => out.push(c),
                    None => return Err(self.error_at(at, "invalid unicode escape")),
                }
            }
            _ => return Err(self.error_at(at, format!("invalid escape \\{}", code as char))),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u32, ParseError> {
        let digits = match self.bytes.get(self.pos..self.pos + 4) {
            Some(d) if d.iter().all(u8::is_ascii_hexdigit) => d,
            _ => return Err(self.error_at(self.pos, "expected four hex digits after \\u")),
        };
        let value = digits.iter().fold(0u32, |acc, &b| {
            // is_ascii_hexdigit checked above
            acc * 16 + (b as char).to_digit(16).unwrap_or(0)
        });
        self.pos += 4;
        Ok(value)
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }
        loop {
            items.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => return Err(self.unexpected("',' or ']' in array")),
            }
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.pos += 1;
        let mut fields = Object::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(fields));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.unexpected("a string key"));
            }
            let key = self.parse_string()?;

            self.skip_whitespace();
            match self.peek() {
                Some(b'.' | b':') => self.pos += 1,
                _ => return Err(self.unexpected("'.' after object key")),
            }

            let value = self.parse_value(depth + 1)?;
            fields.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(fields));
                }
                _ => return Err(self.unexpected("',' or '}' in object")),
            }
        }
    }
}
