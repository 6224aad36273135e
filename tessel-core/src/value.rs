//! Leaf values and map keys.
//!
//! Containers are not stored inline: a [`Value::Node`] points into the
//! [`Graph`](crate::Graph) arena, which is how one object can be reached from
//! several places (and from itself).

use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::{EnumValue, NodeId};

/// A deserialized value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// JSON `null`, or an absent nullable field.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integer that fits 64 bits.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Exact decimal number.
    Decimal(Decimal),
    /// String.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTC timestamp.
    Date(DateTime<Utc>),
    /// Constant of an enum type.
    Enum(EnumValue),
    /// Record, map, sequence or error living in the graph.
    Node(NodeId),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as a float, for integers, floats and decimals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The graph node, if this is one.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// The enum constant, if this is one.
    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Enum(_) => "enum",
            Value::Node(_) => "node",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

/// Totally ordered, hashable projection of a [`Value`], used as a map key and
/// for set membership.
///
/// Floats are equal by bit pattern, decimals by value, dates by epoch
/// milliseconds and nodes by identity. Numbers of any representation order
/// numerically; other variants order among themselves in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// `null`
    Null,
    /// boolean
    Bool(bool),
    /// integer
    Int(i64),
    /// float, by bits
    Float(u64),
    /// decimal, normalized
    Decimal(Decimal),
    /// string
    Str(String),
    /// bytes
    Bytes(Vec<u8>),
    /// epoch millis
    Date(i64),
    /// enum constant, ordered by ordinal
    Enum {
        /// enum type name
        ty: String,
        /// position in declaration order
        ordinal: usize,
        /// constant name
        name: String,
    },
    /// graph node
    Node(NodeId),
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(n) => Key::Int(*n),
            Value::Float(f) => Key::Float(f.to_bits()),
            Value::Decimal(d) => Key::Decimal(d.normalize()),
            Value::Str(s) => Key::Str(s.clone()),
            Value::Bytes(b) => Key::Bytes(b.clone()),
            Value::Date(d) => Key::Date(d.timestamp_millis()),
            Value::Enum(e) => Key::Enum {
                ty: e.ty().name().into(),
                ordinal: e.ordinal(),
                name: e.name().into(),
            },
            Value::Node(id) => Key::Node(*id),
        }
    }
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Key::Null => 0,
            Key::Bool(_) => 1,
            Key::Int(_) => 2,
            Key::Float(_) => 3,
            Key::Decimal(_) => 4,
            Key::Str(_) => 5,
            Key::Bytes(_) => 6,
            Key::Date(_) => 7,
            Key::Enum { .. } => 8,
            Key::Node(_) => 9,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Key::Int(n) => Some(*n as f64),
            Key::Float(bits) => Some(f64::from_bits(*bits)),
            Key::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Bool(a), Key::Bool(b)) => a.cmp(b),
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Float(a), Key::Float(b)) => f64::from_bits(*a).total_cmp(&f64::from_bits(*b)),
            (Key::Decimal(a), Key::Decimal(b)) => a.cmp(b),
            (Key::Str(a), Key::Str(b)) => a.cmp(b),
            (Key::Bytes(a), Key::Bytes(b)) => a.cmp(b),
            (Key::Date(a), Key::Date(b)) => a.cmp(b),
            (
                Key::Enum { ty, ordinal, name },
                Key::Enum {
                    ty: other_ty,
                    ordinal: other_ordinal,
                    name: other_name,
                },
            ) => (ty, ordinal, name).cmp(&(other_ty, other_ordinal, other_name)),
            (Key::Node(a), Key::Node(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                // mixed representations: by value, then by representation
                (Some(a), Some(b)) => a.total_cmp(&b).then(self.rank().cmp(&other.rank())),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => f.write_str("null"),
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(n) => write!(f, "{n}"),
            Key::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Key::Decimal(d) => write!(f, "{d}"),
            Key::Str(s) => f.write_str(s),
            Key::Bytes(b) => write!(f, "{b:?}"),
            Key::Date(ms) => write!(f, "{ms}"),
            Key::Enum { name, .. } => f.write_str(name),
            Key::Node(id) => write!(f, "{id}"),
        }
    }
}
