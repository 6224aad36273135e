use alloc::string::ToString;

use tessel_core::Value;

use crate::error::Result;
use crate::lexer::{Scalar, TokenKind};
use crate::reader::JsonReader;

/// Strings. Numbers and booleans are accepted and kept as their text.
pub(crate) fn deserialize(reader: &mut JsonReader<'_>) -> Result<Value> {
    let lexer = &mut reader.lexer;
    let value = match lexer.token() {
        TokenKind::Null => Value::Null,
        TokenKind::Str | TokenKind::Ident => Value::Str(lexer.take_string()),
        TokenKind::Int | TokenKind::Float => Value::Str(lexer.number_text().into()),
        TokenKind::True => Value::Str("true".into()),
        TokenKind::False => Value::Str("false".into()),
        _ => return Err(lexer.mismatch("a string")),
    };
    lexer.next_token()?;
    Ok(value)
}

pub(crate) fn from_scalar(scalar: Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Str(s) => Value::Str(s),
        Scalar::Bool(b) => Value::Str(b.to_string()),
        Scalar::Int(n) => Value::Str(n.to_string()),
        Scalar::Float(f) => Value::Str(f.to_string()),
        Scalar::Decimal(d) => Value::Str(d.to_string()),
    }
}
