use alloc::sync::Arc;

use tessel_core::{EnumDescriptor, EnumValue, Value};

use crate::error::{DeserError, DeserErrorKind, Result};
use crate::lexer::{Span, TokenKind};
use crate::reader::JsonReader;
use crate::Features;

/// Enum constants by ordinal or by (case-insensitive) name.
#[derive(Debug, Clone)]
pub struct EnumDeserializer {
    ty: Arc<EnumDescriptor>,
}

impl EnumDeserializer {
    /// Deserializer for constants of `ty`.
    pub fn new(ty: Arc<EnumDescriptor>) -> Self {
        Self { ty }
    }

    /// The enum type.
    pub fn ty(&self) -> &Arc<EnumDescriptor> {
        &self.ty
    }

    fn constant(&self, ordinal: usize, span: Span) -> Result<Value> {
        EnumValue::new(Arc::clone(&self.ty), ordinal)
            .map(Value::Enum)
            .ok_or_else(|| self.out_of_bounds(ordinal as i64, span))
    }

    fn out_of_bounds(&self, ordinal: i64, span: Span) -> DeserError {
        DeserError::new(
            DeserErrorKind::InvalidValue {
                message: format!(
                    "ordinal {ordinal} is out of range for `{}` ({} constants)",
                    self.ty.name(),
                    self.ty.constants().len()
                ),
            },
            span,
        )
    }

    pub(crate) fn deserialize(&self, reader: &mut JsonReader<'_>) -> Result<Value> {
        let strict = reader.config.has(Features::ERROR_ON_ENUM_NOT_MATCH);
        let lexer = &mut reader.lexer;
        let span = lexer.span();
        match lexer.token() {
            TokenKind::Null => {
                lexer.next_token()?;
                Ok(Value::Null)
            }
            TokenKind::Int => {
                let ordinal = lexer.int_value()?;
                lexer.next_token()?;
                match usize::try_from(ordinal) {
                    Ok(ordinal) => self.constant(ordinal, span),
                    Err(_) => Err(self.out_of_bounds(ordinal, span)),
                }
            }
            TokenKind::Str | TokenKind::Ident => {
                let text = lexer.take_string();
                lexer.next_token()?;
                if text.is_empty() {
                    return Ok(Value::Null);
                }
                match self.ty.lookup(&text) {
                    Some(ordinal) => self.constant(ordinal, span),
                    None if strict => Err(DeserError::new(
                        DeserErrorKind::InvalidValue {
                            message: format!(
                                "`{text}` is not a constant of `{}`",
                                self.ty.name()
                            ),
                        },
                        span,
                    )),
                    None => {
                        debug!("`{text}` matches no constant of `{}`", self.ty.name());
                        Ok(Value::Null)
                    }
                }
            }
            _ => Err(lexer.mismatch(self.ty.name())),
        }
    }
}
