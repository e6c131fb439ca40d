// Reader for the table-literal subset used by mission files.
//
// Accepts `name = { ... }` documents and bare field lists (weather template
// fragments). Values are tables, strings, numbers, booleans and nil; any
// other expression is reported as unsupported instead of being evaluated.
use crate::error::{ParseError, Position};
use crate::literal::{Assignment, Key, LiteralNode, Table};

pub const MAX_DEPTH: usize = 200;

// 2^53: beyond this an f64 no longer names every integer.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

pub fn parse_assignment(src: &str) -> Result<Assignment, ParseError> {
    Parser::new(src).parse_assignment()
}

pub fn parse_fragment(src: &str) -> Result<Table, ParseError> {
    Parser::new(src).parse_fragment()
}

#[derive(Debug)]
pub struct Parser<'a> {
    src: &'a str,
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Self {
            src,
            data: src.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn parse_assignment(&mut self) -> Result<Assignment, ParseError> {
        self.skip_trivia()?;
        let name = match self.read_name() {
            Some(name) => name.to_string(),
            None => return Err(self.expected("variable name")),
        };
        self.skip_trivia()?;
        self.expect(b'=', "'='")?;
        self.skip_trivia()?;
        let value_pos = self.pos;
        let root = match self.parse_value()? {
            LiteralNode::Table(t) => t,
            other => {
                return Err(ParseError::UnsupportedValue {
                    what: format!("{} assigned to '{}', expected a table", other.kind(), name),
                    pos: self.position_at(value_pos),
                });
            }
        };
        self.skip_trivia()?;
        if self.peek() == Some(b';') {
            self.pos += 1;
            self.skip_trivia()?;
        }
        self.expect_end()?;
        Ok(Assignment { name, root })
    }

    /// A bare `{ ... }` or a field list running to end of input.
    pub fn parse_fragment(&mut self) -> Result<Table, ParseError> {
        self.skip_trivia()?;
        if self.peek() == Some(b'{') {
            self.pos += 1;
            let t = self.parse_fields(Some(b'}'))?;
            self.skip_trivia()?;
            if matches!(self.peek(), Some(b',' | b';')) {
                self.pos += 1;
                self.skip_trivia()?;
            }
            self.expect_end()?;
            return Ok(t);
        }
        self.parse_fields(None)
    }

    // Fields up to `close` (consumed), or to end of input when `close` is None.
    fn parse_fields(&mut self, close: Option<u8>) -> Result<Table, ParseError> {
        let mut table = Table::new();
        let mut next_index: i64 = 1;
        loop {
            self.skip_trivia()?;
            match (self.peek(), close) {
                (None, None) => break,
                (None, Some(_)) => return Err(self.eof()),
                (Some(c), Some(cl)) if c == cl => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }
            let (key, value) = self.parse_field(&mut next_index)?;
            table.insert(key, value);
            self.skip_trivia()?;
            match self.peek() {
                Some(b',' | b';') => self.pos += 1,
                Some(c) if Some(c) == close => {}
                None if close.is_none() => {}
                None => return Err(self.eof()),
                Some(_) => return Err(self.expected("',' or '}'")),
            }
        }
        Ok(table)
    }

    fn parse_field(&mut self, next_index: &mut i64) -> Result<(Key, LiteralNode), ParseError> {
        match self.peek() {
            Some(b'[') if !self.at_long_bracket() => {
                self.pos += 1;
                self.skip_trivia()?;
                let key = self.parse_key()?;
                self.skip_trivia()?;
                self.expect(b']', "']'")?;
                self.skip_trivia()?;
                self.expect(b'=', "'='")?;
                self.skip_trivia()?;
                let value = self.parse_value()?;
                Ok((key, value))
            }
            Some(c) if is_name_start(c) => {
                let save = self.pos;
                let name = self.read_name().unwrap_or_default();
                self.skip_trivia()?;
                if self.peek() == Some(b'=') && self.peek_at(1) != Some(b'=') {
                    self.pos += 1;
                    self.skip_trivia()?;
                    let value = self.parse_value()?;
                    return Ok((Key::Name(name.to_string()), value));
                }
                self.pos = save;
                self.parse_positional(next_index)
            }
            _ => self.parse_positional(next_index),
        }
    }

    fn parse_positional(&mut self, next_index: &mut i64) -> Result<(Key, LiteralNode), ParseError> {
        let value = self.parse_value()?;
        let key = Key::Index(*next_index);
        *next_index += 1;
        Ok((key, value))
    }

    fn parse_key(&mut self) -> Result<Key, ParseError> {
        let start = self.pos;
        match self.parse_value()? {
            LiteralNode::Str(s) => Ok(Key::classify(&s)),
            LiteralNode::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT => {
                Ok(Key::Index(n as i64))
            }
            LiteralNode::Number(n) => Err(ParseError::UnsupportedKey {
                what: format!("non-integral number {}", n),
                pos: self.position_at(start),
            }),
            other => Err(ParseError::UnsupportedKey {
                what: other.kind().to_string(),
                pos: self.position_at(start),
            }),
        }
    }

    fn parse_value(&mut self) -> Result<LiteralNode, ParseError> {
        let start = self.pos;
        let value = match self.peek() {
            None => return Err(self.eof()),
            Some(b'{') => {
                self.pos += 1;
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    return Err(ParseError::TooDeep {
                        max: MAX_DEPTH,
                        pos: self.position_at(start),
                    });
                }
                let t = self.parse_fields(Some(b'}'))?;
                self.depth -= 1;
                LiteralNode::Table(t)
            }
            Some(b'"' | b'\'') => LiteralNode::Str(self.read_quoted()?),
            Some(b'[') if self.at_long_bracket() => LiteralNode::Str(self.read_long_bracket()?.to_string()),
            Some(b'-') => {
                self.pos += 1;
                self.skip_trivia()?;
                match self.peek() {
                    Some(c) if c.is_ascii_digit() || c == b'.' => LiteralNode::Number(-self.read_number()?),
                    _ => return Err(self.unsupported(start, "unary operator '-'")),
                }
            }
            Some(c) if c.is_ascii_digit() => LiteralNode::Number(self.read_number()?),
            Some(b'.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                LiteralNode::Number(self.read_number()?)
            }
            Some(c) if is_name_start(c) => match self.read_name().unwrap_or_default() {
                "true" => LiteralNode::Bool(true),
                "false" => LiteralNode::Bool(false),
                "nil" => LiteralNode::Nil,
                "function" => return Err(self.unsupported(start, "function")),
                "not" => return Err(self.unsupported(start, "unary operator 'not'")),
                other => {
                    let what = format!("identifier '{}'", other);
                    return Err(self.unsupported(start, &what));
                }
            },
            Some(b'#') => return Err(self.unsupported(start, "length operator")),
            Some(b'.') if self.data[self.pos..].starts_with(b"...") => {
                return Err(self.unsupported(start, "vararg"));
            }
            Some(_) => return Err(self.expected("value")),
        };
        self.reject_operator(start)?;
        Ok(value)
    }

    // A value followed by an operator or call is an expression, not a literal.
    fn reject_operator(&mut self, start: usize) -> Result<(), ParseError> {
        let save = self.pos;
        self.skip_trivia()?;
        let op = match self.peek() {
            Some(b'+' | b'-' | b'*' | b'/' | b'%' | b'^' | b'<' | b'>' | b'~') => true,
            Some(b'.' | b'(' | b':') => true,
            Some(b'=') => self.peek_at(1) == Some(b'='),
            Some(b'a') => self.at_word("and"),
            Some(b'o') => self.at_word("or"),
            _ => false,
        };
        if op {
            return Err(self.unsupported(start, "expression"));
        }
        self.pos = save;
        Ok(())
    }

    fn read_number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        let value = if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            u64::from_str_radix(&self.src[digits_start..self.pos], 16)
                .ok()
                .map(|n| n as f64)
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.peek() == Some(b'.') {
                self.pos += 1;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                self.pos += 1;
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.pos += 1;
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            self.src[start..self.pos].parse::<f64>().ok()
        };
        // `12abc` is one malformed token, not a number followed by a name.
        if self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
                self.pos += 1;
            }
            return Err(self.invalid_number(start));
        }
        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(self.invalid_number(start)),
        }
    }

    fn read_quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let quote = self.data[self.pos];
        self.pos += 1;
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(ParseError::UnterminatedString(self.position_at(start)));
            };
            match c {
                c if c == quote => {
                    self.pos += 1;
                    break;
                }
                b'\n' | b'\r' => return Err(ParseError::UnterminatedString(self.position_at(start))),
                b'\\' => {
                    self.pos += 1;
                    self.read_escape(start, &mut buf)?;
                }
                _ => {
                    buf.push(c);
                    self.pos += 1;
                }
            }
        }
        String::from_utf8(buf).map_err(|_| ParseError::InvalidUtf8(self.position_at(start)))
    }

    fn read_escape(&mut self, string_start: usize, buf: &mut Vec<u8>) -> Result<(), ParseError> {
        let esc_pos = self.pos - 1;
        let Some(c) = self.peek() else {
            return Err(ParseError::UnterminatedString(self.position_at(string_start)));
        };
        self.pos += 1;
        match c {
            b'n' => buf.push(b'\n'),
            b't' => buf.push(b'\t'),
            b'r' => buf.push(b'\r'),
            b'a' => buf.push(0x07),
            b'b' => buf.push(0x08),
            b'f' => buf.push(0x0c),
            b'v' => buf.push(0x0b),
            b'\\' | b'"' | b'\'' => buf.push(c),
            // backslash-newline is a literal line break; CRLF and LFCR count once
            b'\n' => {
                buf.push(b'\n');
                if self.peek() == Some(b'\r') {
                    self.pos += 1;
                }
            }
            b'\r' => {
                buf.push(b'\n');
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'0'..=b'9' => {
                let mut value = u32::from(c - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d) if d.is_ascii_digit() => {
                            value = value * 10 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                let byte = u8::try_from(value).map_err(|_| ParseError::InvalidEscape {
                    seq: value.to_string(),
                    pos: self.position_at(esc_pos),
                })?;
                buf.push(byte);
            }
            other => {
                return Err(ParseError::InvalidEscape {
                    seq: char::from(other).to_string(),
                    pos: self.position_at(esc_pos),
                });
            }
        }
        Ok(())
    }

    // `[[`, `[=[`, `[==[` ...
    fn at_long_bracket(&self) -> bool {
        self.long_bracket_level(self.pos).is_some()
    }

    fn long_bracket_level(&self, at: usize) -> Option<usize> {
        if self.data.get(at) != Some(&b'[') {
            return None;
        }
        let mut i = at + 1;
        while self.data.get(i) == Some(&b'=') {
            i += 1;
        }
        (self.data.get(i) == Some(&b'[')).then_some(i - at - 1)
    }

    fn read_long_bracket(&mut self) -> Result<&'a str, ParseError> {
        let start = self.pos;
        let Some(level) = self.long_bracket_level(start) else {
            return Err(self.expected("long string"));
        };
        self.pos += level + 2;
        // a line break right after the opening bracket is not part of the text
        if self.data[self.pos..].starts_with(b"\r\n") {
            self.pos += 2;
        } else if matches!(self.peek(), Some(b'\n' | b'\r')) {
            self.pos += 1;
        }
        let body_start = self.pos;
        let mut close = String::with_capacity(level + 2);
        close.push(']');
        close.push_str(&"=".repeat(level));
        close.push(']');
        match self.src[body_start..].find(&close) {
            Some(rel) => {
                self.pos = body_start + rel + close.len();
                Ok(&self.src[body_start..body_start + rel])
            }
            None => Err(ParseError::UnterminatedString(self.position_at(start))),
        }
    }

    fn read_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if !self.peek().is_some_and(is_name_start) {
            return None;
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        Some(&self.src[start..self.pos])
    }

    fn at_word(&self, word: &str) -> bool {
        let end = self.pos + word.len();
        self.data[self.pos..].starts_with(word.as_bytes())
            && !self
                .data
                .get(end)
                .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
    }

    // Whitespace, `-- line` comments and `--[[ long ]]` comments.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if !self.data[self.pos..].starts_with(b"--") {
                return Ok(());
            }
            let comment_start = self.pos;
            self.pos += 2;
            if self.at_long_bracket() {
                self.read_long_bracket()
                    .map_err(|_| ParseError::UnexpectedEof(self.position_at(comment_start)))?;
            } else {
                while self.peek().is_some_and(|c| c != b'\n') {
                    self.pos += 1;
                }
            }
        }
    }

    fn expect(&mut self, want: u8, what: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            None => Err(self.eof()),
            Some(_) => Err(self.expected(what)),
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.pos < self.data.len() {
            return Err(ParseError::TrailingInput(self.position_at(self.pos)));
        }
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.data.get(self.pos + ahead).copied()
    }

    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.data.len());
        let before = &self.data[..offset];
        let line = before.iter().filter(|&&c| c == b'\n').count() + 1;
        let line_start = before.iter().rposition(|&c| c == b'\n').map_or(0, |i| i + 1);
        Position {
            offset,
            line,
            column: offset - line_start + 1,
        }
    }

    fn eof(&self) -> ParseError {
        ParseError::UnexpectedEof(self.position_at(self.data.len()))
    }

    fn expected(&self, expected: &'static str) -> ParseError {
        let found = self.src[self.pos..]
            .chars()
            .next()
            .map(|c| c.to_string())
            .unwrap_or_default();
        ParseError::Expected {
            expected,
            found,
            pos: self.position_at(self.pos),
        }
    }

    fn unsupported(&self, start: usize, what: &str) -> ParseError {
        ParseError::UnsupportedValue {
            what: what.to_string(),
            pos: self.position_at(start),
        }
    }

    fn invalid_number(&self, start: usize) -> ParseError {
        ParseError::InvalidNumber {
            text: self.src[start..self.pos].to_string(),
            pos: self.position_at(start),
        }
    }
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}
