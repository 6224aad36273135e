use alloc::vec::Vec;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tessel_core::Value;

use crate::error::{DeserError, DeserErrorKind, Result};
use crate::lexer::TokenKind;
use crate::reader::JsonReader;

/// Byte arrays: a base64 string, or an array of integers in `-128..=255`
/// (negative values are two's complement bytes).
pub(crate) fn deserialize(reader: &mut JsonReader<'_>) -> Result<Value> {
    let lexer = &mut reader.lexer;
    match lexer.token() {
        TokenKind::Null => {
            lexer.next_token()?;
            Ok(Value::Null)
        }
        TokenKind::Str => {
            let span = lexer.span();
            let bytes = STANDARD.decode(lexer.string_value()).map_err(|err| {
                DeserError::new(
                    DeserErrorKind::InvalidValue {
                        message: format!("invalid base64: {err}"),
                    },
                    span,
                )
            })?;
            lexer.next_token()?;
            Ok(Value::Bytes(bytes))
        }
        TokenKind::LBracket => {
            lexer.next_token()?;
            let mut bytes = Vec::new();
            while lexer.token() != TokenKind::RBracket {
                if lexer.token() != TokenKind::Int {
                    return Err(lexer.mismatch("a byte"));
                }
                let n = lexer.int_value()?;
                let byte = match n {
                    0..=255 => n as u8,
                    -128..=-1 => n as i8 as u8,
                    _ => {
                        return Err(lexer.error(DeserErrorKind::NumberOutOfRange {
                            value: n.to_string(),
                            target: "byte",
                        }));
                    }
                };
                bytes.push(byte);
                lexer.next_token()?;
                lexer.end_element()?;
            }
            lexer.next_token()?;
            Ok(Value::Bytes(bytes))
        }
        _ => Err(lexer.mismatch("bytes")),
    }
}
