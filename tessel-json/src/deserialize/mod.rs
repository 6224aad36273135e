//! Value deserializers, one per shape of declared type.
//!
//! [`deserializer_for`] maps a [`ValueType`] onto a [`ValueDeserializer`];
//! containers call back into it for their children, so recursion follows the
//! type structure. Named types are looked up in the registry on the way.

use alloc::sync::Arc;

use tessel_core::{FieldDescriptor, SubtypeError, TypeRegistry, Value, ValueType};

use crate::context::PathKey;
use crate::error::{DeserError, DeserErrorKind, Result, suggest};
use crate::lexer::{Scalar, Span};
use crate::reader::JsonReader;

mod any;
mod array_mapping;
mod bytes;
mod collection;
mod date;
mod enums;
mod map;
mod number;
mod record;
mod scalar;
mod throwable;

pub use collection::CollectionDeserializer;
pub use date::DateDeserializer;
pub use enums::EnumDeserializer;
pub use map::MapDeserializer;
pub use number::{NumberDeserializer, NumberKind};
pub use record::RecordDeserializer;

/// Deserializer for one declared type.
#[derive(Debug, Clone)]
pub enum ValueDeserializer<'t> {
    /// record types: objects, positional arrays, single-argument scalars
    Record(RecordDeserializer),
    /// maps of any flavour
    Map(MapDeserializer<'t>),
    /// lists and sets
    Collection(CollectionDeserializer<'t>),
    /// enum constants
    Enum(EnumDeserializer),
    /// primitives, boxed primitives, decimals and untyped numbers
    Number(NumberDeserializer),
    /// points in time
    Date(DateDeserializer<'t>),
    /// error values
    Throwable,
    /// base64 strings or byte arrays
    Bytes,
    /// strings
    Scalar,
    /// whatever the input holds
    Any,
}

/// Deserializer for values declared as `ty`.
pub fn deserializer_for<'t>(
    ty: &'t ValueType,
    registry: &TypeRegistry,
) -> Result<ValueDeserializer<'t>> {
    Ok(match ty {
        ValueType::Primitive(p) => ValueDeserializer::Number(NumberDeserializer::new(
            NumberKind::Primitive(*p),
        )),
        ValueType::Boxed(p) => {
            ValueDeserializer::Number(NumberDeserializer::new(NumberKind::Boxed(*p)))
        }
        ValueType::Decimal => {
            ValueDeserializer::Number(NumberDeserializer::new(NumberKind::Decimal))
        }
        ValueType::Number => ValueDeserializer::Number(NumberDeserializer::new(NumberKind::Number)),
        ValueType::Str => ValueDeserializer::Scalar,
        ValueType::Bytes => ValueDeserializer::Bytes,
        ValueType::Date => ValueDeserializer::Date(DateDeserializer::new(None)),
        ValueType::Enum(name) => match registry.enumeration(name) {
            Some(ty) => ValueDeserializer::Enum(EnumDeserializer::new(Arc::clone(ty))),
            None => return Err(unregistered(name, registry)),
        },
        ValueType::Record(name) => match registry.record(name) {
            Some(ty) => ValueDeserializer::Record(RecordDeserializer::new(Arc::clone(ty))),
            None => return Err(unregistered(name, registry)),
        },
        ValueType::List { kind, elem } => {
            ValueDeserializer::Collection(CollectionDeserializer::new(*kind, elem))
        }
        ValueType::Map { kind, key, value } => {
            ValueDeserializer::Map(MapDeserializer::new(kind.clone(), key, value))
        }
        ValueType::Throwable => ValueDeserializer::Throwable,
        ValueType::Any => ValueDeserializer::Any,
    })
}

/// Deserializer for a field, honouring its date format.
pub fn deserializer_for_field<'t>(
    field: &'t FieldDescriptor,
    registry: &TypeRegistry,
) -> Result<ValueDeserializer<'t>> {
    match (field.ty(), field.format()) {
        (ValueType::Date, Some(format)) => {
            Ok(ValueDeserializer::Date(DateDeserializer::new(Some(&**format))))
        }
        (ty, _) => deserializer_for(ty, registry),
    }
}

fn unregistered(name: &str, registry: &TypeRegistry) -> DeserError {
    DeserError::without_span(DeserErrorKind::UnknownType {
        name: name.into(),
        reason: SubtypeError::Unregistered,
        suggestion: suggest(name, registry.names()),
    })
}

impl ValueDeserializer<'_> {
    /// Read one value starting at the current token, reached through `key`.
    pub fn deserialize(&self, reader: &mut JsonReader<'_>, key: PathKey) -> Result<Value> {
        match self {
            ValueDeserializer::Record(de) => de.deserialize(reader, key),
            ValueDeserializer::Map(de) => de.read_into(reader, None, key),
            ValueDeserializer::Collection(de) => de.read_into(reader, None, key),
            ValueDeserializer::Enum(de) => de.deserialize(reader),
            ValueDeserializer::Number(de) => de.deserialize(reader),
            ValueDeserializer::Date(de) => de.deserialize(reader),
            ValueDeserializer::Throwable => throwable::deserialize(reader, key),
            ValueDeserializer::Bytes => bytes::deserialize(reader),
            ValueDeserializer::Scalar => scalar::deserialize(reader),
            ValueDeserializer::Any => any::deserialize(reader, key),
        }
    }

    /// Convert a scalar the fast path already consumed.
    pub(crate) fn from_scalar(
        &self,
        reader: &JsonReader<'_>,
        scalar: Scalar,
        span: Span,
    ) -> Result<Value> {
        let features = reader.config.features();
        match self {
            ValueDeserializer::Number(de) => de
                .from_scalar(scalar, features)
                .map_err(|kind| DeserError::new(kind, span)),
            ValueDeserializer::Date(de) => de.from_scalar(scalar, features, span),
            ValueDeserializer::Scalar => Ok(scalar::from_scalar(scalar)),
            _ => Ok(scalar.into_value()),
        }
    }
}
