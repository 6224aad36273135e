use tessel_core::{MapKind, SeqKind, Value, ValueType};

use super::{CollectionDeserializer, MapDeserializer};
use crate::Features;
use crate::context::PathKey;
use crate::error::Result;
use crate::lexer::TokenKind;
use crate::reader::JsonReader;

static ANY: ValueType = ValueType::Any;
static STR: ValueType = ValueType::Str;

/// Untyped values: objects become linked maps, arrays become lists, scalars
/// keep the shape they were written in.
pub(crate) fn deserialize(reader: &mut JsonReader<'_>, key: PathKey) -> Result<Value> {
    match reader.lexer.token() {
        TokenKind::LBrace => {
            MapDeserializer::new(MapKind::Linked, &STR, &ANY).read_into(reader, None, key)
        }
        TokenKind::LBracket => {
            CollectionDeserializer::new(SeqKind::List, &ANY).read_into(reader, None, key)
        }
        TokenKind::Float if reader.config.has(Features::USE_BIG_DECIMAL) => {
            let decimal = reader.lexer.decimal_value()?;
            reader.lexer.next_token()?;
            Ok(Value::Decimal(decimal))
        }
        _ => match reader.lexer.scalar()? {
            Some(scalar) => Ok(scalar.into_value()),
            None => Err(reader.lexer.unexpected("a value")),
        },
    }
}
