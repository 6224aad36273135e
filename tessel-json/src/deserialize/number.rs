use alloc::string::ToString;

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tessel_core::{Primitive, Value};

use crate::error::{DeserError, DeserErrorKind, Result};
use crate::lexer::{Scalar, TokenKind};
use crate::reader::JsonReader;
use crate::Features;

/// Which numeric (or boolean) shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// never null: null and empty strings become zero
    Primitive(Primitive),
    /// nullable primitive
    Boxed(Primitive),
    /// exact decimal
    Decimal,
    /// any number, kept in the representation it was written in
    Number,
}

/// Deserializer for primitives, boxed primitives and numbers.
#[derive(Debug, Clone, Copy)]
pub struct NumberDeserializer {
    kind: NumberKind,
}

impl NumberDeserializer {
    /// Deserializer producing `kind`.
    pub fn new(kind: NumberKind) -> Self {
        Self { kind }
    }

    /// Produced shape.
    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    fn describe(&self) -> &'static str {
        match self.kind {
            NumberKind::Primitive(p) | NumberKind::Boxed(p) => p.name(),
            NumberKind::Decimal => "decimal",
            NumberKind::Number => "number",
        }
    }

    pub(crate) fn deserialize(&self, reader: &mut JsonReader<'_>) -> Result<Value> {
        let features = reader.config.features();
        let lexer = &mut reader.lexer;
        let span = lexer.span();

        // decimals are read from the number text, never through f64
        let exact = match (self.kind, lexer.token()) {
            (NumberKind::Decimal, TokenKind::Int | TokenKind::Float) => true,
            (NumberKind::Number, TokenKind::Float) => {
                features.contains(Features::USE_BIG_DECIMAL)
            }
            _ => false,
        };
        let scalar = if exact {
            let decimal = lexer.decimal_value()?;
            lexer.next_token()?;
            Scalar::Decimal(decimal)
        } else {
            match lexer.scalar()? {
                Some(scalar) => scalar,
                None => return Err(lexer.mismatch(self.describe())),
            }
        };
        self.from_scalar(scalar, features)
            .map_err(|kind| DeserError::new(kind, span))
    }

    /// Coerce an already-read scalar.
    pub(crate) fn from_scalar(
        &self,
        scalar: Scalar,
        features: Features,
    ) -> core::result::Result<Value, DeserErrorKind> {
        match self.kind {
            NumberKind::Primitive(p) => coerce(p, scalar, false),
            NumberKind::Boxed(p) => coerce(p, scalar, true),
            NumberKind::Decimal => to_decimal(scalar),
            NumberKind::Number => to_number(scalar, features),
        }
    }
}

fn mismatch(expected: &str, found: &Scalar) -> DeserErrorKind {
    DeserErrorKind::TypeMismatch {
        expected: expected.into(),
        found: found.describe(),
    }
}

fn out_of_range(value: impl ToString, target: &'static str) -> DeserErrorKind {
    DeserErrorKind::NumberOutOfRange {
        value: value.to_string(),
        target,
    }
}

fn coerce(
    p: Primitive,
    scalar: Scalar,
    nullable: bool,
) -> core::result::Result<Value, DeserErrorKind> {
    let empty = if nullable { Value::Null } else { p.zero() };
    match scalar {
        Scalar::Null => return Ok(empty),
        Scalar::Str(ref s) if s.trim().is_empty() => return Ok(empty),
        _ => {}
    }

    match p {
        Primitive::Bool => match scalar {
            Scalar::Bool(b) => Ok(Value::Bool(b)),
            Scalar::Int(0) => Ok(Value::Bool(false)),
            Scalar::Int(1) => Ok(Value::Bool(true)),
            Scalar::Str(ref s) => match s.trim() {
                t if t.eq_ignore_ascii_case("true") || t == "1" => Ok(Value::Bool(true)),
                t if t.eq_ignore_ascii_case("false") || t == "0" => Ok(Value::Bool(false)),
                _ => Err(mismatch(p.name(), &scalar)),
            },
            _ => Err(mismatch(p.name(), &scalar)),
        },
        Primitive::Int | Primitive::Long => {
            let n = match scalar {
                Scalar::Int(n) => n,
                Scalar::Bool(b) => i64::from(b),
                Scalar::Float(f) => truncate(f, p)?,
                Scalar::Decimal(d) => d.trunc().to_i64().ok_or_else(|| out_of_range(d, p.name()))?,
                Scalar::Str(ref s) => {
                    let text = s.trim();
                    match i64::from_lexical(text.as_bytes()) {
                        Ok(n) => n,
                        Err(_) => match f64::from_lexical(text.as_bytes()) {
                            Ok(f) => truncate(f, p)?,
                            Err(_) => return Err(mismatch(p.name(), &scalar)),
                        },
                    }
                }
                Scalar::Null => return Ok(empty),
            };
            if p == Primitive::Int && i32::try_from(n).is_err() {
                return Err(out_of_range(n, p.name()));
            }
            Ok(Value::Int(n))
        }
        Primitive::Double => match scalar {
            Scalar::Int(n) => Ok(Value::Float(n as f64)),
            Scalar::Float(f) => Ok(Value::Float(f)),
            Scalar::Decimal(d) => d
                .to_f64()
                .map(Value::Float)
                .ok_or_else(|| out_of_range(d, p.name())),
            Scalar::Str(ref s) => f64::from_lexical(s.trim().as_bytes())
                .map(Value::Float)
                .map_err(|_| mismatch(p.name(), &scalar)),
            _ => Err(mismatch(p.name(), &scalar)),
        },
    }
}

/// Drop the fraction of `f`, failing if the result does not fit 64 bits.
fn truncate(f: f64, p: Primitive) -> core::result::Result<i64, DeserErrorKind> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Ok(t as i64)
    } else {
        Err(out_of_range(f, p.name()))
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str_exact(text).ok()
    }
}

fn to_decimal(scalar: Scalar) -> core::result::Result<Value, DeserErrorKind> {
    match scalar {
        Scalar::Null => Ok(Value::Null),
        Scalar::Int(n) => Ok(Value::Decimal(Decimal::from(n))),
        Scalar::Float(f) => Decimal::try_from(f)
            .map(Value::Decimal)
            .map_err(|_| out_of_range(f, "decimal")),
        Scalar::Decimal(d) => Ok(Value::Decimal(d)),
        Scalar::Str(ref s) => {
            let text = s.trim();
            if text.is_empty() {
                return Ok(Value::Null);
            }
            parse_decimal(text)
                .map(Value::Decimal)
                .ok_or_else(|| mismatch("decimal", &scalar))
        }
        Scalar::Bool(_) => Err(mismatch("decimal", &scalar)),
    }
}

fn to_number(scalar: Scalar, features: Features) -> core::result::Result<Value, DeserErrorKind> {
    let big = features.contains(Features::USE_BIG_DECIMAL);
    match scalar {
        Scalar::Null => Ok(Value::Null),
        Scalar::Int(n) => Ok(Value::Int(n)),
        Scalar::Float(f) if big => Decimal::try_from(f)
            .map(Value::Decimal)
            .map_err(|_| out_of_range(f, "decimal")),
        Scalar::Float(f) => Ok(Value::Float(f)),
        Scalar::Decimal(d) => Ok(Value::Decimal(d)),
        Scalar::Str(ref s) => {
            let text = s.trim();
            if text.is_empty() {
                return Ok(Value::Null);
            }
            if let Ok(n) = i64::from_lexical(text.as_bytes()) {
                return Ok(Value::Int(n));
            }
            if big && let Some(d) = parse_decimal(text) {
                return Ok(Value::Decimal(d));
            }
            f64::from_lexical(text.as_bytes())
                .map(Value::Float)
                .map_err(|_| mismatch("number", &scalar))
        }
        Scalar::Bool(_) => Err(mismatch("number", &scalar)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    fn int(scalar: Scalar) -> core::result::Result<Value, DeserErrorKind> {
        coerce(Primitive::Int, scalar, false)
    }

    #[test]
    fn ints_are_range_checked_and_truncated() {
        assert_eq!(int(Scalar::Int(7)), Ok(Value::Int(7)));
        assert_eq!(int(Scalar::Float(2.9)), Ok(Value::Int(2)));
        assert_eq!(int(Scalar::Str(" 42 ".into())), Ok(Value::Int(42)));
        assert_eq!(int(Scalar::Str("4.5".into())), Ok(Value::Int(4)));
        assert_eq!(
            int(Scalar::Int(1 << 40)),
            Err(DeserErrorKind::NumberOutOfRange {
                value: "1099511627776".into(),
                target: "int",
            })
        );
        assert_eq!(
            coerce(Primitive::Long, Scalar::Int(1 << 40), false),
            Ok(Value::Int(1 << 40))
        );
    }

    #[test]
    fn null_and_empty_become_zero_or_null() {
        assert_eq!(int(Scalar::Null), Ok(Value::Int(0)));
        assert_eq!(int(Scalar::Str(String::new())), Ok(Value::Int(0)));
        assert_eq!(coerce(Primitive::Int, Scalar::Null, true), Ok(Value::Null));
        assert_eq!(
            coerce(Primitive::Double, Scalar::Null, false),
            Ok(Value::Float(0.0))
        );
    }

    #[test]
    fn booleans_accept_digits_and_words() {
        let b = |s| coerce(Primitive::Bool, s, false);
        assert_eq!(b(Scalar::Int(1)), Ok(Value::Bool(true)));
        assert_eq!(b(Scalar::Str("FALSE".into())), Ok(Value::Bool(false)));
        assert!(b(Scalar::Int(2)).is_err());
        assert!(b(Scalar::Str("yes".into())).is_err());
    }

    #[test]
    fn numbers_keep_their_representation() {
        let plain = Features::empty();
        assert_eq!(to_number(Scalar::Float(1.5), plain), Ok(Value::Float(1.5)));
        assert_eq!(
            to_number(Scalar::Float(1.5), Features::USE_BIG_DECIMAL),
            Ok(Value::Decimal(Decimal::new(15, 1)))
        );
        assert_eq!(to_number(Scalar::Str("12".into()), plain), Ok(Value::Int(12)));
        assert!(to_number(Scalar::Bool(true), plain).is_err());
    }

    #[test]
    fn decimals_parse_strings_exactly() {
        assert_eq!(
            to_decimal(Scalar::Str("0.10".into())),
            Ok(Value::Decimal(Decimal::new(10, 2)))
        );
        assert_eq!(
            to_decimal(Scalar::Str("1e3".into())),
            Ok(Value::Decimal(Decimal::from(1000)))
        );
    }
}
