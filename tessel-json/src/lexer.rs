//! Token source: a linear scanner over the input text.
//!
//! The lexer always holds one token of lookahead. Deserializers are entered with
//! the current token at the first token of their value and return with the
//! current token at whatever follows it.
//!
//! String and identifier tokens are decoded eagerly into a reusable buffer, so
//! the fast path can compare a key against a field name without re-scanning.
//! Number tokens are kept as spans and only parsed when a deserializer asks for
//! an integer, float or decimal.

use alloc::string::String;
use core::fmt;

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;
use rust_decimal::Decimal;
use tessel_core::Value;

use crate::error::{DeserError, DeserErrorKind, Result};

/// Location of a token in the input, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first byte
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl Span {
    /// Span of `len` bytes starting at `offset`.
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.offset, span.len).into()
    }
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// quoted string
    Str,
    /// integer literal
    Int,
    /// number with a fraction or exponent
    Float,
    /// bare word other than `true`, `false` and `null`
    Ident,
    /// `null`
    Null,
    /// `true`
    True,
    /// `false`
    False,
    /// end of input
    Eof,
}

impl TokenKind {
    /// Human-readable name for diagnostics.
    pub const fn describe(self) -> &'static str {
        match self {
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Colon => "`:`",
            TokenKind::Comma => "`,`",
            TokenKind::Str => "a string",
            TokenKind::Int | TokenKind::Float => "a number",
            TokenKind::Ident => "an identifier",
            TokenKind::Null => "`null`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Eof => "end of input",
        }
    }

    /// Whether the token is a complete value by itself.
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            TokenKind::Str
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Ident
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A scalar value read off a single token.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// integer that fits 64 bits
    Int(i64),
    /// float
    Float(f64),
    /// exact decimal (also integers too large for 64 bits)
    Decimal(Decimal),
    /// string or identifier
    Str(String),
}

impl Scalar {
    /// Short name of the variant, for diagnostics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "a boolean",
            Scalar::Int(_) | Scalar::Float(_) | Scalar::Decimal(_) => "a number",
            Scalar::Str(_) => "a string",
        }
    }

    /// The scalar as it would appear in a diagnostic.
    pub fn describe(&self) -> String {
        match self {
            Scalar::Null => "`null`".into(),
            Scalar::Bool(b) => format!("`{b}`"),
            Scalar::Int(n) => format!("number `{n}`"),
            Scalar::Float(f) => format!("number `{f}`"),
            Scalar::Decimal(d) => format!("number `{d}`"),
            Scalar::Str(s) => format!("string \"{}\"", truncate(s)),
        }
    }

    /// The scalar as an untyped value.
    pub fn into_value(self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(n) => Value::Int(n),
            Scalar::Float(f) => Value::Float(f),
            Scalar::Decimal(d) => Value::Decimal(d),
            Scalar::Str(s) => Value::Str(s),
        }
    }
}

/// Value shape a fast-path field expects; decides which tokens `scan_field`
/// may consume on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// `true` / `false`
    Bool,
    /// integer literal
    Int,
    /// any number literal
    Float,
    /// any number literal, parsed exactly
    Decimal,
    /// string literal
    Str,
    /// integer (epoch millis) or string
    Date,
    /// anything else: the field deserializer reads the value
    Value,
}

/// Outcome of [`JsonLexer::scan_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMatch {
    /// Key and value consumed; the current token is the `,` after the value.
    Full(Scalar),
    /// Key and value consumed, and the closing `}` after them.
    End(Scalar),
    /// Key consumed, value was `null`; `end` tells whether `}` followed and was consumed.
    Null {
        /// whether the object ended
        end: bool,
    },
    /// Key consumed; the current token is the first token of the value.
    NamePending,
    /// The current key is not the expected one. Nothing was consumed.
    NoMatch,
}

/// Saved lexer position, for re-reading a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    start: usize,
}

/// JSON lexer over a string slice.
pub struct JsonLexer<'a> {
    input: &'a str,
    pos: usize,
    start: usize,
    token: TokenKind,
    string: String,
    single_quotes: bool,
}

impl<'a> JsonLexer<'a> {
    /// Lexer over `input`. Call [`next_token`](Self::next_token) to read the first token.
    pub fn new(input: &'a str) -> Self {
        Self::with_options(input, false)
    }

    /// Lexer that also accepts `'single quoted'` strings when `single_quotes` is set.
    pub fn with_options(input: &'a str, single_quotes: bool) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
            token: TokenKind::Eof,
            string: String::new(),
            single_quotes,
        }
    }

    /// The current token.
    pub fn token(&self) -> TokenKind {
        self.token
    }

    /// Byte offset just past the current token.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Span of the current token.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.pos - self.start)
    }

    /// Whether single-quoted strings are accepted.
    pub fn single_quotes(&self) -> bool {
        self.single_quotes
    }

    /// Decoded text of the current string or identifier token.
    pub fn string_value(&self) -> &str {
        &self.string
    }

    /// Take the decoded text of the current string or identifier token.
    pub fn take_string(&mut self) -> String {
        core::mem::take(&mut self.string)
    }

    /// Raw text of the current number token.
    pub fn number_text(&self) -> &'a str {
        &self.input[self.start..self.pos]
    }

    /// Current integer token as `i64`.
    pub fn int_value(&self) -> Result<i64> {
        i64::from_lexical(self.number_text().as_bytes()).map_err(|_| {
            self.error(DeserErrorKind::NumberOutOfRange {
                value: self.number_text().into(),
                target: "long",
            })
        })
    }

    /// Current number token as `f64`.
    pub fn float_value(&self) -> Result<f64> {
        f64::from_lexical(self.number_text().as_bytes()).map_err(|_| {
            self.error(DeserErrorKind::InvalidValue {
                message: format!("`{}` is not a valid number", self.number_text()),
            })
        })
    }

    /// Current number token as an exact decimal.
    pub fn decimal_value(&self) -> Result<Decimal> {
        let text = self.number_text();
        let parsed = if text.contains(['e', 'E']) {
            Decimal::from_scientific(text)
        } else {
            Decimal::from_str_exact(text)
        };
        parsed.map_err(|_| {
            self.error(DeserErrorKind::NumberOutOfRange {
                value: text.into(),
                target: "decimal",
            })
        })
    }

    /// Error of `kind` at the current token.
    pub fn error(&self, kind: DeserErrorKind) -> DeserError {
        DeserError::new(kind, self.span())
    }

    /// Describe the current token for diagnostics.
    pub fn found(&self) -> String {
        match self.token {
            TokenKind::Str => format!("string \"{}\"", truncate(&self.string)),
            TokenKind::Ident => format!("`{}`", truncate(&self.string)),
            TokenKind::Int | TokenKind::Float => format!("number `{}`", self.number_text()),
            other => other.describe().into(),
        }
    }

    /// Error for a current token that is not one of `expected`.
    pub fn unexpected(&self, expected: &'static str) -> DeserError {
        if self.token == TokenKind::Eof {
            self.error(DeserErrorKind::UnexpectedEof { expected })
        } else {
            self.error(DeserErrorKind::Syntax {
                expected,
                found: self.found(),
            })
        }
    }

    /// Error for a well-formed value of the wrong shape.
    pub fn mismatch(&self, expected: impl fmt::Display) -> DeserError {
        if self.token == TokenKind::Eof {
            return self.error(DeserErrorKind::UnexpectedEof { expected: "a value" });
        }
        self.error(DeserErrorKind::TypeMismatch {
            expected: expected.to_string(),
            found: self.found(),
        })
    }

    /// Consume the current token if it is `expected`, else fail.
    pub fn advance(&mut self, expected: TokenKind) -> Result<()> {
        if self.token != expected {
            return Err(self.unexpected(expected.describe()));
        }
        self.next_token()
    }

    /// Step over the separator after an object member: consume `,`, leave `}`.
    pub fn end_member(&mut self) -> Result<()> {
        match self.token {
            TokenKind::Comma => self.next_token(),
            TokenKind::RBrace => Ok(()),
            _ => Err(self.unexpected("`,` or `}`")),
        }
    }

    /// Step over the separator after an array element: consume `,`, leave `]`.
    pub fn end_element(&mut self) -> Result<()> {
        match self.token {
            TokenKind::Comma => self.next_token(),
            TokenKind::RBracket => Ok(()),
            _ => Err(self.unexpected("`,` or `]`")),
        }
    }

    /// Read the scalar at the current token and move past it. Returns `None`,
    /// consuming nothing, if the token starts an object or array.
    pub fn scalar(&mut self) -> Result<Option<Scalar>> {
        let scalar = match self.token {
            TokenKind::Null => Scalar::Null,
            TokenKind::True => Scalar::Bool(true),
            TokenKind::False => Scalar::Bool(false),
            TokenKind::Int => match self.int_value() {
                Ok(n) => Scalar::Int(n),
                Err(_) => Scalar::Decimal(self.decimal_value()?),
            },
            TokenKind::Float => Scalar::Float(self.float_value()?),
            TokenKind::Str | TokenKind::Ident => Scalar::Str(self.take_string()),
            _ => return Ok(None),
        };
        self.next_token()?;
        Ok(Some(scalar))
    }

    /// Like [`scalar`](Self::scalar), but only for tokens `kind` can take
    /// without further interpretation.
    pub fn read_scalar(&mut self, kind: ScanKind) -> Result<Option<Scalar>> {
        let scalar = match (kind, self.token) {
            (ScanKind::Bool, TokenKind::True) => Scalar::Bool(true),
            (ScanKind::Bool, TokenKind::False) => Scalar::Bool(false),
            (ScanKind::Int | ScanKind::Date, TokenKind::Int) => match self.int_value() {
                Ok(n) => Scalar::Int(n),
                Err(_) => return Ok(None),
            },
            (ScanKind::Float, TokenKind::Int | TokenKind::Float) => {
                Scalar::Float(self.float_value()?)
            }
            (ScanKind::Decimal, TokenKind::Int | TokenKind::Float) => {
                Scalar::Decimal(self.decimal_value()?)
            }
            (ScanKind::Str | ScanKind::Date, TokenKind::Str) => Scalar::Str(self.take_string()),
            _ => return Ok(None),
        };
        self.next_token()?;
        Ok(Some(scalar))
    }

    /// Fast path: if the current key is exactly `name`, consume it and, when
    /// the value is a scalar `kind` accepts, the value too.
    pub fn scan_field(&mut self, name: &str, kind: ScanKind) -> Result<FieldMatch> {
        if !matches!(self.token, TokenKind::Str | TokenKind::Ident) || self.string != name {
            return Ok(FieldMatch::NoMatch);
        }
        self.next_token()?;
        self.advance(TokenKind::Colon)?;

        if self.token == TokenKind::Null {
            self.next_token()?;
            return Ok(FieldMatch::Null {
                end: self.close_member()?,
            });
        }
        if kind == ScanKind::Value {
            return Ok(FieldMatch::NamePending);
        }
        let Some(scalar) = self.read_scalar(kind)? else {
            return Ok(FieldMatch::NamePending);
        };
        if self.close_member()? {
            Ok(FieldMatch::End(scalar))
        } else {
            Ok(FieldMatch::Full(scalar))
        }
    }

    /// After a member value: `}` is consumed (returns `true`), `,` is left in
    /// place (returns `false`).
    fn close_member(&mut self) -> Result<bool> {
        match self.token {
            TokenKind::RBrace => {
                self.next_token()?;
                Ok(true)
            }
            TokenKind::Comma => Ok(false),
            _ => Err(self.unexpected("`,` or `}`")),
        }
    }

    /// Generic path: read a key and its `:`. At `}`, consume it and return `None`.
    pub fn scan_key(&mut self) -> Result<Option<String>> {
        let key = match self.token {
            TokenKind::RBrace => {
                self.next_token()?;
                return Ok(None);
            }
            TokenKind::Str | TokenKind::Ident => self.take_string(),
            TokenKind::Int | TokenKind::Float => self.number_text().into(),
            _ => return Err(self.unexpected("a key or `}`")),
        };
        self.next_token()?;
        self.advance(TokenKind::Colon)?;
        Ok(Some(key))
    }

    /// Inside an array: if the next tokens are `"<key>": "<name>",`, consume
    /// them and return the name. Otherwise consume nothing.
    pub fn scan_type_name(&mut self, key: &str) -> Result<Option<String>> {
        if self.token != TokenKind::Str || self.string != key {
            return Ok(None);
        }
        let saved = self.snapshot();
        self.next_token()?;
        if self.token != TokenKind::Colon {
            self.restore(saved)?;
            return Ok(None);
        }
        self.next_token()?;
        if self.token != TokenKind::Str {
            return Err(self.mismatch("a type name"));
        }
        let name = self.take_string();
        self.next_token()?;
        self.end_element()?;
        Ok(Some(name))
    }

    /// Save the current position.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { start: self.start }
    }

    /// Return to a saved position; the token there is scanned again.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        self.pos = snapshot.start;
        self.next_token()
    }

    /// Skip one complete value of any shape.
    pub fn skip_value(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.token {
                TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.unexpected("a value"))?;
                }
                TokenKind::Eof => return Err(self.unexpected("a value")),
                _ => {}
            }
            self.next_token()?;
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<()> {
        self.skip_whitespace();
        self.start = self.pos;
        let Some(&byte) = self.input.as_bytes().get(self.pos) else {
            self.token = TokenKind::Eof;
            return Ok(());
        };
        self.token = match byte {
            b'{' => self.punct(TokenKind::LBrace),
            b'}' => self.punct(TokenKind::RBrace),
            b'[' => self.punct(TokenKind::LBracket),
            b']' => self.punct(TokenKind::RBracket),
            b':' => self.punct(TokenKind::Colon),
            b',' => self.punct(TokenKind::Comma),
            b'"' => self.scan_string(b'"')?,
            b'\'' if self.single_quotes => self.scan_string(b'\'')?,
            b'-' | b'0'..=b'9' => self.scan_number()?,
            b if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => self.scan_ident(),
            _ => return Err(self.unexpected_char()),
        };
        Ok(())
    }

    fn punct(&mut self, token: TokenKind) -> TokenKind {
        self.pos += 1;
        token
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = bytes.get(self.pos) {
            self.pos += 1;
        }
    }

    fn unexpected_char(&self) -> DeserError {
        let c = self.input[self.pos..].chars().next().unwrap_or('\0');
        DeserError::new(
            DeserErrorKind::Syntax {
                expected: "a JSON value",
                found: format!("`{c}`"),
            },
            Span::new(self.pos, c.len_utf8()),
        )
    }

    fn scan_ident(&mut self) -> TokenKind {
        let bytes = self.input.as_bytes();
        while let Some(&b) = bytes.get(self.pos) {
            if !(b.is_ascii_alphanumeric() || b == b'_' || b == b'$') {
                break;
            }
            self.pos += 1;
        }
        match &self.input[self.start..self.pos] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            word => {
                self.string.clear();
                self.string.push_str(word);
                TokenKind::Ident
            }
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind> {
        let bytes = self.input.as_bytes();
        let digits = |pos: &mut usize| {
            let from = *pos;
            while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
                *pos += 1;
            }
            *pos > from
        };

        let mut pos = self.pos;
        let mut float = false;
        if bytes[pos] == b'-' {
            pos += 1;
        }
        let mut ok = digits(&mut pos);
        if ok && bytes.get(pos) == Some(&b'.') {
            pos += 1;
            float = true;
            ok = digits(&mut pos);
        }
        if ok && matches!(bytes.get(pos), Some(b'e' | b'E')) {
            pos += 1;
            float = true;
            if matches!(bytes.get(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            ok = digits(&mut pos);
        }
        self.pos = pos;
        if !ok {
            return Err(DeserError::new(
                DeserErrorKind::Syntax {
                    expected: "a digit",
                    found: format!("`{}`", &self.input[self.start..self.pos]),
                },
                self.span(),
            ));
        }
        Ok(if float {
            TokenKind::Float
        } else {
            TokenKind::Int
        })
    }

    fn scan_string(&mut self, quote: u8) -> Result<TokenKind> {
        let bytes = self.input.as_bytes();
        self.string.clear();
        let mut i = self.pos + 1;
        let mut run = i;
        loop {
            let Some(&b) = bytes.get(i) else {
                self.pos = i;
                return Err(DeserError::new(
                    DeserErrorKind::UnexpectedEof {
                        expected: "closing quote",
                    },
                    Span::new(self.start, i - self.start),
                ));
            };
            if b == quote {
                self.string.push_str(&self.input[run..i]);
                self.pos = i + 1;
                return Ok(TokenKind::Str);
            }
            if b != b'\\' {
                i += 1;
                continue;
            }

            self.string.push_str(&self.input[run..i]);
            let escape_at = i;
            let c = match bytes.get(i + 1) {
                Some(b'"') => '"',
                Some(b'\'') => '\'',
                Some(b'\\') => '\\',
                Some(b'/') => '/',
                Some(b'b') => '\x08',
                Some(b'f') => '\x0c',
                Some(b'n') => '\n',
                Some(b'r') => '\r',
                Some(b't') => '\t',
                Some(b'u') => {
                    let (c, len) = self.unicode_escape(i)?;
                    self.string.push(c);
                    i += len;
                    run = i;
                    continue;
                }
                _ => {
                    return Err(DeserError::new(
                        DeserErrorKind::Syntax {
                            expected: "a valid escape sequence",
                            found: format!(
                                "`{}`",
                                self.input.get(escape_at..escape_at + 2).unwrap_or("\\")
                            ),
                        },
                        Span::new(escape_at, 2),
                    ));
                }
            };
            self.string.push(c);
            i += 2;
            run = i;
        }
    }

    /// Decode `\uXXXX` (and a following low surrogate) at byte `at`.
    /// Returns the character and the number of bytes consumed.
    fn unicode_escape(&self, at: usize) -> Result<(char, usize)> {
        let invalid = |len: usize| {
            DeserError::new(
                DeserErrorKind::Syntax {
                    expected: "a valid unicode escape",
                    found: format!("`{}`", self.input.get(at..at + len).unwrap_or("\\u")),
                },
                Span::new(at, len),
            )
        };
        let hex = |from: usize| {
            self.input
                .get(from..from + 4)
                .and_then(|digits| u16::from_str_radix(digits, 16).ok())
        };

        let high = hex(at + 2).ok_or_else(|| invalid(6))?;
        if !(0xD800..=0xDBFF).contains(&high) {
            return char::from_u32(high.into())
                .map(|c| (c, 6))
                .ok_or_else(|| invalid(6));
        }
        if self.input.get(at + 6..at + 8) != Some("\\u") {
            return Err(invalid(6));
        }
        let low = hex(at + 8).ok_or_else(|| invalid(12))?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(invalid(12));
        }
        let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
        char::from_u32(code)
            .map(|c| (c, 12))
            .ok_or_else(|| invalid(12))
    }
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(32) {
        Some((at, _)) => &s[..at],
        None => s,
    }
}
