/// Restricted JavaScript literal parser.
///
/// Accepts the subset of JavaScript expression syntax that legacy test-case
/// inputs use: array and object literals, strings in either quote style,
/// numbers in all radix forms, signed numbers, and the literal names
/// `true`, `false`, `null`, `undefined`, `NaN` and `Infinity`. Comments and
/// trailing commas are allowed. Nothing is ever evaluated: any other
/// identifier in value position is an error.
use crate::value::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub message: String,
    pub offset: usize,
}

type Result<T> = std::result::Result<T, LiteralError>;

/// Nesting cap for arrays and objects.
const MAX_DEPTH: usize = 256;

/// Parse exactly one literal; only whitespace and comments may follow it.
pub fn parse_literal(src: &str) -> Result<Value> {
    let mut parser = Parser {
        chars: src.char_indices().collect(),
        pos: 0,
        len: src.len(),
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_trivia()?;
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(parser.error(format!("Unexpected '{}' after literal", c))),
    }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|(i, _)| *i).unwrap_or(self.len)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            message: message.into(),
            offset: self.offset(),
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("Expected '{}' but found '{}'", want, c))),
            None => Err(self.error(format!("Expected '{}' but input ended", want))),
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() || c == '\u{feff}' => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if is_line_terminator(c) {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => return Err(self.error("Unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_trivia()?;
        match self.peek() {
            Some('[') => self.nested(Self::array),
            Some('{') => self.nested(Self::object),
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                Ok(Value::String(self.string_body(q)?))
            }
            Some('-') => {
                self.pos += 1;
                self.unary_operand().map(|n| Value::Number(-n))
            }
            Some('+') => {
                self.pos += 1;
                self.unary_operand().map(Value::Number)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number().map(Value::Number),
            Some(c) if is_identifier_start(c) => {
                let start = self.offset();
                let name = self.identifier();
                match name.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    "undefined" => Ok(Value::Undefined),
                    "NaN" => Ok(Value::Number(f64::NAN)),
                    "Infinity" => Ok(Value::Number(f64::INFINITY)),
                    _ => Err(LiteralError {
                        message: format!("{} is not defined", name),
                        offset: start,
                    }),
                }
            }
            Some(c) => Err(self.error(format!("Unexpected '{}'", c))),
            None => Err(self.error("Unexpected end of input")),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Value>) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("Literal nested too deeply"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    /// Operand of a unary `+`/`-`: a number, `Infinity` or `NaN`, possibly
    /// behind further signs.
    fn unary_operand(&mut self) -> Result<f64> {
        let mut negate = false;
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some('-') => {
                    negate = !negate;
                    self.pos += 1;
                }
                Some('+') => self.pos += 1,
                _ => break,
            }
        }

        let n = match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.number()?,
            Some(c) if is_identifier_start(c) => match self.identifier().as_str() {
                "Infinity" => f64::INFINITY,
                "NaN" => f64::NAN,
                other => return Err(self.error(format!("Unsupported operand '{}' for unary sign", other))),
            },
            _ => return Err(self.error("Expected a number after sign")),
        };
        Ok(if negate { -n } else { n })
    }

    fn array(&mut self) -> Result<Value> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                // elision: `[1,,2]` has a hole that reads as undefined
                Some(',') => {
                    self.pos += 1;
                    items.push(Value::Undefined);
                    continue;
                }
                _ => {}
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                Some(c) => return Err(self.error(format!("Expected ',' or ']' but found '{}'", c))),
                None => return Err(self.error("Unterminated array")),
            }
        }
    }

    fn object(&mut self) -> Result<Value> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::object(entries));
            }

            let key = self.property_key()?;
            self.skip_trivia()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                Some(c) => return Err(self.error(format!("Expected ',' or '}}' but found '{}'", c))),
                None => return Err(self.error("Unterminated object")),
            }
        }
    }

    fn property_key(&mut self) -> Result<String> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                self.string_body(q)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let n = self.number()?;
                Ok(crate::value::format_number(n))
            }
            Some(c) if is_identifier_start(c) => Ok(self.identifier()),
            Some(c) => Err(self.error(format!("Unexpected '{}' in property name", c))),
            None => Err(self.error("Unterminated object")),
        }
    }

    fn identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if name.is_empty() && !is_identifier_start(c) {
                break;
            }
            if !name.is_empty() && !is_identifier_part(c) {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        name
    }

    fn number(&mut self) -> Result<f64> {
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let n = if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.digits(|c| c.is_digit(radix));
            if digits.is_empty() {
                return Err(self.error("Missing digits after radix prefix"));
            }
            digits
                .chars()
                .fold(0f64, |acc, c| acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64)
        } else {
            let mut text = self.digits(|c| c.is_ascii_digit());
            if self.peek() == Some('.') {
                self.pos += 1;
                text.push('.');
                text.push_str(&self.digits(|c| c.is_ascii_digit()));
            }
            if text == "." {
                return Err(self.error("Unexpected '.'"));
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                self.pos += 1;
                text.push('e');
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    self.pos += 1;
                    text.push(sign);
                }
                let exp = self.digits(|c| c.is_ascii_digit());
                if exp.is_empty() {
                    return Err(self.error("Missing exponent digits"));
                }
                text.push_str(&exp);
            }
            text.parse::<f64>()
                .map_err(|_| self.error(format!("Invalid number '{}'", text)))?
        };

        // `1a` is a SyntaxError in JavaScript
        if let Some(c) = self.peek() {
            if is_identifier_start(c) || c.is_ascii_digit() {
                return Err(self.error(format!("Unexpected '{}' after number", c)));
            }
        }
        Ok(n)
    }

    /// Digits accepted by `accept`, with `_` separators between digits.
    fn digits(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if accept(c) {
                out.push(c);
                self.pos += 1;
            } else if c == '_' && !out.is_empty() && self.peek_at(1).is_some_and(&accept) {
                self.pos += 1;
            } else {
                break;
            }
        }
        out
    }

    fn string_body(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("Unterminated string"));
            };
            match c {
                c if c == quote => return Ok(out),
                '\\' => self.escape(&mut out)?,
                '\n' | '\r' => return Err(self.error("Unterminated string")),
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<()> {
        let Some(c) = self.bump() else {
            return Err(self.error("Unterminated string"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.pos += 1;
                    let hex = self.digits(|c| c.is_ascii_hexdigit());
                    self.expect('}')?;
                    u32::from_str_radix(&hex, 16).map_err(|_| self.error("Invalid unicode escape"))?
                } else {
                    self.hex_digits(4)?
                };
                out.push(self.unicode_scalar(code)?);
            }
            // line continuation
            '\r' => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            c if is_line_terminator(c) => {}
            c if c.is_ascii_digit() => return Err(self.error("Octal escapes are not allowed")),
            c => out.push(c),
        }
        Ok(())
    }

    /// Combine a UTF-16 surrogate pair written as two `\u` escapes.
    fn unicode_scalar(&mut self, code: u32) -> Result<char> {
        if (0xD800..0xDC00).contains(&code)
            && self.peek() == Some('\\')
            && self.peek_at(1) == Some('u')
        {
            let save = self.pos;
            self.pos += 2;
            if let Ok(low) = self.hex_digits(4) {
                if (0xDC00..0xE000).contains(&low) {
                    let scalar = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(scalar).ok_or_else(|| self.error("Invalid surrogate pair"));
                }
            }
            self.pos = save;
        }
        Ok(char::from_u32(code).unwrap_or('\u{fffd}'))
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("Invalid hexadecimal escape"))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(code)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}
