//! Declared semantic types of fields, parameters and top-level targets.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use crate::Value;

/// Name of a registered record or enum type.
///
/// Named types are resolved through the [`TypeRegistry`](crate::TypeRegistry) at
/// parse time, which is what allows recursive and mutually recursive types.
pub type TypeName = Arc<str>;

/// Scalar kinds with a zero default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `true` / `false`
    Bool,
    /// 32-bit signed integer, range checked
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit float
    Double,
}

impl Primitive {
    /// The value a primitive slot holds before anything is assigned.
    pub fn zero(self) -> Value {
        match self {
            Primitive::Bool => Value::Bool(false),
            Primitive::Int | Primitive::Long => Value::Int(0),
            Primitive::Double => Value::Float(0.0),
        }
    }

    /// Short lowercase name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Double => "double",
        }
    }
}

/// Which sequence container to build for a JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeqKind {
    /// Ordered, duplicates allowed.
    #[default]
    List,
    /// Duplicates removed.
    Set,
    /// Duplicates removed, sorted once the array is complete.
    SortedSet,
    /// Duplicates removed, insertion order kept.
    LinkedSet,
}

impl SeqKind {
    /// Whether the container drops duplicate elements.
    pub const fn is_set(self) -> bool {
        !matches!(self, SeqKind::List)
    }
}

/// Which associative container to build for a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MapKind {
    /// Hash map.
    #[default]
    Hash,
    /// Insertion-ordered map.
    Linked,
    /// Keys sorted once the object is complete.
    Sorted,
    /// Concurrent map: null values are never stored.
    Concurrent,
    /// Keys are constants of the key enum type.
    EnumKeyed,
    /// A user map type, created empty through its default constructor.
    Custom(TypeName),
}

/// Declared semantic type of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    /// Non-nullable scalar; null and missing values become [`Primitive::zero`].
    Primitive(Primitive),
    /// Nullable scalar.
    Boxed(Primitive),
    /// UTF-8 string.
    Str,
    /// Arbitrary precision decimal.
    Decimal,
    /// Any numeric value, kept in the representation it was read in.
    Number,
    /// Byte array, base64 encoded on the wire.
    Bytes,
    /// Point in time.
    Date,
    /// Constant of a registered enum.
    Enum(TypeName),
    /// Instance of a registered record type.
    Record(TypeName),
    /// Sequence container.
    List {
        /// container flavour
        kind: SeqKind,
        /// element type
        elem: Box<ValueType>,
    },
    /// Associative container.
    Map {
        /// container flavour
        kind: MapKind,
        /// key type; anything other than [`ValueType::Str`] re-parses the key text
        key: Box<ValueType>,
        /// value type
        value: Box<ValueType>,
    },
    /// Error value with message, cause and stack trace.
    Throwable,
    /// Untyped: objects become linked maps, arrays become lists.
    Any,
}

impl ValueType {
    /// `boolean`
    pub const BOOL: ValueType = ValueType::Primitive(Primitive::Bool);
    /// `int`
    pub const INT: ValueType = ValueType::Primitive(Primitive::Int);
    /// `long`
    pub const LONG: ValueType = ValueType::Primitive(Primitive::Long);
    /// `double`
    pub const DOUBLE: ValueType = ValueType::Primitive(Primitive::Double);

    /// Instance of the named record type.
    pub fn record(name: impl Into<TypeName>) -> Self {
        ValueType::Record(name.into())
    }

    /// Constant of the named enum type.
    pub fn enumeration(name: impl Into<TypeName>) -> Self {
        ValueType::Enum(name.into())
    }

    /// `List<elem>`
    pub fn list(elem: ValueType) -> Self {
        Self::seq(SeqKind::List, elem)
    }

    /// Sequence of the given flavour.
    pub fn seq(kind: SeqKind, elem: ValueType) -> Self {
        ValueType::List {
            kind,
            elem: Box::new(elem),
        }
    }

    /// Hash map from string keys.
    pub fn map(value: ValueType) -> Self {
        Self::map_of(MapKind::Hash, ValueType::Str, value)
    }

    /// Map of the given flavour and key type.
    pub fn map_of(kind: MapKind, key: ValueType, value: ValueType) -> Self {
        ValueType::Map {
            kind,
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Whether the type is a boolean, primitive or boxed.
    pub const fn is_boolean(&self) -> bool {
        matches!(
            self,
            ValueType::Primitive(Primitive::Bool) | ValueType::Boxed(Primitive::Bool)
        )
    }

    /// The primitive kind if the type is non-nullable.
    pub const fn as_primitive(&self) -> Option<Primitive> {
        match self {
            ValueType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Value of a slot of this type before anything is assigned.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Primitive(p) => p.zero(),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Primitive(p) => f.write_str(p.name()),
            ValueType::Boxed(p) => write!(f, "{}?", p.name()),
            ValueType::Str => f.write_str("string"),
            ValueType::Decimal => f.write_str("decimal"),
            ValueType::Number => f.write_str("number"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::Date => f.write_str("date"),
            ValueType::Enum(name) | ValueType::Record(name) => f.write_str(name),
            ValueType::List { kind, elem } => {
                let container = match kind {
                    SeqKind::List => "List",
                    SeqKind::Set => "Set",
                    SeqKind::SortedSet => "SortedSet",
                    SeqKind::LinkedSet => "LinkedSet",
                };
                write!(f, "{container}<{elem}>")
            }
            ValueType::Map { key, value, .. } => write!(f, "Map<{key}, {value}>"),
            ValueType::Throwable => f.write_str("throwable"),
            ValueType::Any => f.write_str("any"),
        }
    }
}
