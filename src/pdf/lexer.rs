//! Byte-level tokenizer and object parser

use log::{trace, warn};

use super::{Dictionary, Object, ObjectId, Stream};
use crate::error::{PdfGuardError, PdfGuardResult};

const MAX_NESTING: usize = 256;

/// Resolves an indirect `/Length` to its integer value
pub(crate) type LengthResolver<'r> = &'r dyn Fn(ObjectId) -> Option<i64>;

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Cursor over a PDF byte buffer
#[derive(Debug, Clone)]
pub(crate) struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn error(&self, msg: impl AsRef<str>) -> PdfGuardError {
        PdfGuardError::malformed(format!("{} at offset {}", msg.as_ref(), self.pos))
    }

    /// Skip whitespace and `%` comments
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Read a run of regular characters (keyword or number)
    pub fn read_token(&mut self) -> &'a [u8] {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().map_or(false, is_regular) {
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Peek the next regular token without consuming it
    pub fn peek_token(&self) -> &'a [u8] {
        self.clone().read_token()
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> PdfGuardResult<()> {
        let token = self.read_token();
        if token == keyword.as_bytes() {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found '{}'",
                keyword,
                String::from_utf8_lossy(token)
            )))
        }
    }

    /// Read a non-negative integer token
    pub fn read_unsigned(&mut self) -> Option<u64> {
        let save = self.pos;
        let token = self.read_token();
        match parse_unsigned(token) {
            Some(v) => Some(v),
            None => {
                self.pos = save;
                None
            }
        }
    }

    /// Parse `N G obj`
    pub fn read_object_header(&mut self) -> PdfGuardResult<ObjectId> {
        let number = self
            .read_unsigned()
            .ok_or_else(|| self.error("expected object number"))?;
        let generation = self
            .read_unsigned()
            .ok_or_else(|| self.error("expected generation number"))?;
        self.expect_keyword("obj")?;
        Ok(ObjectId::new(
            u32::try_from(number).map_err(|_| self.error("object number out of range"))?,
            u16::try_from(generation).map_err(|_| self.error("generation out of range"))?,
        ))
    }

    /// Parse a complete indirect object, including stream data
    pub fn parse_indirect_object(
        &mut self,
        resolve_length: Option<LengthResolver<'_>>,
    ) -> PdfGuardResult<(ObjectId, Object)> {
        let id = self.read_object_header()?;
        trace!("Parsing object {}", id);
        let object = self.parse_object()?;

        let object = match object {
            Object::Dictionary(dict) if self.peek_token() == b"stream" => {
                self.read_token();
                let content = self.read_stream_content(&dict, resolve_length)?;
                Object::Stream(Stream::new(dict, content))
            }
            other => other,
        };

        if self.peek_token() == b"endobj" {
            self.read_token();
        } else {
            trace!("Object {} has no endobj keyword", id);
        }
        Ok((id, object))
    }

    fn read_stream_content(
        &mut self,
        dict: &Dictionary,
        resolve_length: Option<LengthResolver<'_>>,
    ) -> PdfGuardResult<Vec<u8>> {
        // The keyword is followed by CRLF or LF; tolerate a lone CR.
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
        let start = self.pos;

        let declared = match dict.get("Length") {
            Some(Object::Reference(id)) => resolve_length.and_then(|resolve| resolve(*id)),
            Some(other) => other.as_integer(),
            None => None,
        };

        if let Some(length) = declared.and_then(|l| usize::try_from(l).ok()) {
            let end = start.saturating_add(length);
            if end <= self.data.len() {
                let mut lookahead = Lexer::at(self.data, end);
                if lookahead.read_token() == b"endstream" {
                    self.pos = lookahead.position();
                    return Ok(self.data[start..end].to_vec());
                }
            }
            warn!(
                "Stream at offset {} has wrong /Length {}, scanning for endstream",
                start, length
            );
        }

        let found = find_subsequence(&self.data[start..], b"endstream")
            .ok_or_else(|| self.error("stream without endstream"))?;
        let mut end = start + found;
        if end > start && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        self.pos = start + found + b"endstream".len();
        Ok(self.data[start..end].to_vec())
    }

    /// Parse a direct object
    pub fn parse_object(&mut self) -> PdfGuardResult<Object> {
        self.parse_object_at_depth(0)
    }

    fn parse_object_at_depth(&mut self, depth: usize) -> PdfGuardResult<Object> {
        if depth > MAX_NESTING {
            return Err(self.error("object nesting too deep"));
        }
        self.skip_whitespace();

        match self.peek() {
            None => Err(self.error("unexpected end of data")),
            Some(b'/') => {
                self.pos += 1;
                Ok(Object::Name(self.read_name()))
            }
            Some(b'(') => {
                self.pos += 1;
                Ok(Object::String(self.read_literal_string()?))
            }
            Some(b'<') if self.data.get(self.pos + 1) == Some(&b'<') => {
                self.pos += 2;
                Ok(Object::Dictionary(self.read_dictionary(depth)?))
            }
            Some(b'<') => {
                self.pos += 1;
                Ok(Object::String(self.read_hex_string()?))
            }
            Some(b'[') => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        Some(b']') => {
                            self.pos += 1;
                            break;
                        }
                        None => return Err(self.error("unterminated array")),
                        _ => items.push(self.parse_object_at_depth(depth + 1)?),
                    }
                }
                Ok(Object::Array(items))
            }
            Some(_) => self.read_scalar(),
        }
    }

    fn read_dictionary(&mut self, depth: usize) -> PdfGuardResult<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'>') if self.data.get(self.pos + 1) == Some(&b'>') => {
                    self.pos += 2;
                    return Ok(dict);
                }
                Some(b'/') => {
                    self.pos += 1;
                    let key = self.read_name();
                    let value = self.parse_object_at_depth(depth + 1)?;
                    // A null value is equivalent to an absent entry.
                    if value != Object::Null {
                        dict.set_bytes(key, value);
                    }
                }
                None => return Err(self.error("unterminated dictionary")),
                Some(_) => return Err(self.error("dictionary key must be a name")),
            }
        }
    }

    fn read_scalar(&mut self) -> PdfGuardResult<Object> {
        let token = self.read_token();
        match token {
            b"" => Err(self.error("unexpected delimiter")),
            b"true" => Ok(Object::Boolean(true)),
            b"false" => Ok(Object::Boolean(false)),
            b"null" => Ok(Object::Null),
            _ => {
                if let Some(number) = parse_unsigned(token) {
                    if let Some(id) = self.try_reference(number) {
                        return Ok(Object::Reference(id));
                    }
                }
                parse_number(token).ok_or_else(|| {
                    self.error(format!(
                        "unexpected token '{}'",
                        String::from_utf8_lossy(token)
                    ))
                })
            }
        }
    }

    /// After an unsigned integer, look ahead for `G R`
    fn try_reference(&mut self, number: u64) -> Option<ObjectId> {
        let save = self.pos;
        let reference = (|| {
            let generation = self.read_unsigned()?;
            if self.read_token() != b"R" {
                return None;
            }
            Some(ObjectId::new(
                u32::try_from(number).ok()?,
                u16::try_from(generation).ok()?,
            ))
        })();
        if reference.is_none() {
            self.pos = save;
        }
        reference
    }

    fn read_name(&mut self) -> Vec<u8> {
        let mut name = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let hex = self.data.get(self.pos..self.pos + 2);
                if let Some(decoded) = hex.and_then(|h| {
                    std::str::from_utf8(h)
                        .ok()
                        .and_then(|s| u8::from_str_radix(s, 16).ok())
                }) {
                    name.push(decoded);
                    self.pos += 2;
                    continue;
                }
            }
            name.push(b);
        }
        name
    }

    fn read_literal_string(&mut self) -> PdfGuardResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut nesting = 1usize;

        loop {
            let b = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += 1;
            match b {
                b'(' => {
                    nesting += 1;
                    out.push(b);
                }
                b')' => {
                    nesting -= 1;
                    if nesting == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\r' => {
                    // Unescaped end-of-line markers read as a single LF.
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                b'\\' => {
                    let esc = self.peek().ok_or_else(|| self.error("unterminated string"))?;
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'0'..=b'7' => {
                            let mut value = (esc - b'0') as u16;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u16;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push(value as u8);
                        }
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
    }

    fn read_hex_string(&mut self) -> PdfGuardResult<Vec<u8>> {
        let mut digits = Vec::new();
        loop {
            let b = self
                .peek()
                .ok_or_else(|| self.error("unterminated hex string"))?;
            self.pos += 1;
            match b {
                b'>' => break,
                b if b.is_ascii_hexdigit() => digits.push(b),
                b if is_whitespace(b) => continue,
                _ => return Err(self.error("invalid hex string")),
            }
        }
        if digits.len() % 2 != 0 {
            digits.push(b'0');
        }
        hex::decode(&digits).map_err(|_| self.error("invalid hex string"))
    }
}

fn parse_unsigned(token: &[u8]) -> Option<u64> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(token).ok()?.parse().ok()
}

fn parse_number(token: &[u8]) -> Option<Object> {
    let text = std::str::from_utf8(token).ok()?;
    if !text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'))
    {
        return None;
    }
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Object::Integer(i));
        }
    }
    text.parse::<f64>().ok().map(Object::Real)
}

pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub(crate) fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
