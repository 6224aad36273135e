#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

extern crate alloc;

/// Trace-level logging macro that forwards to `tracing::trace!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Trace-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Debug-level logging macro that forwards to `tracing::debug!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Debug-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[allow(unused_imports)]
pub(crate) use debug;
#[allow(unused_imports)]
pub(crate) use trace;

mod config;
mod context;
mod deserialize;
mod error;
mod lexer;
mod reader;
mod resolve;

pub use config::{DEFAULT_MAX_DEPTH, DEFAULT_TYPE_KEY, Features, ParserConfig, ParserConfigBuilder};
pub use context::{CtxId, PathKey};
pub use deserialize::{
    CollectionDeserializer, DateDeserializer, EnumDeserializer, MapDeserializer,
    NumberDeserializer, NumberKind, RecordDeserializer, ValueDeserializer, deserializer_for,
    deserializer_for_field,
};
pub use error::{DeserError, DeserErrorKind, Result};
pub use lexer::{FieldMatch, JsonLexer, Scalar, ScanKind, Snapshot, Span, TokenKind};
pub use reader::JsonReader;
pub use resolve::{RefTarget, ResolveTask, Slot};

use std::sync::LazyLock;

use tessel_core::{Document, TypeRegistry, ValueType};

/// Deserialize `input` as a value of type `ty` with the default configuration.
///
/// Record and enum types named by `ty` must be registered in `registry`.
///
/// ```
/// use tessel_core::{FieldDescriptor, TypeDescriptor, TypeRegistry, ValueType};
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .register_record(
///         TypeDescriptor::builder("Point")
///             .field(FieldDescriptor::builder("x", ValueType::INT))
///             .field(FieldDescriptor::builder("y", ValueType::INT))
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let doc = tessel_json::from_str(r#"{"y": 2, "x": 1}"#, &ValueType::record("Point"), &registry)
///     .unwrap();
/// let point = doc.record_at("$").unwrap();
/// assert_eq!(point.get("x").and_then(|v| v.as_i64()), Some(1));
/// assert_eq!(point.get("y").and_then(|v| v.as_i64()), Some(2));
/// ```
pub fn from_str(input: &str, ty: &ValueType, registry: &TypeRegistry) -> Result<Document> {
    from_str_with_config(input, ty, registry, ParserConfig::default_ref())
}

/// Deserialize `input` as a value of type `ty` under `config`.
pub fn from_str_with_config(
    input: &str,
    ty: &ValueType,
    registry: &TypeRegistry,
    config: &ParserConfig,
) -> Result<Document> {
    from_str_inner(input, ty, registry, config).map_err(|err| err.with_source(input))
}

fn from_str_inner(
    input: &str,
    ty: &ValueType,
    registry: &TypeRegistry,
    config: &ParserConfig,
) -> Result<Document> {
    trace!("parsing {} bytes as `{ty}`", input.len());
    let reader = JsonReader::new(input, registry, config)?;
    let de = deserializer_for(ty, registry).map_err(|err| err.or_span(Span::new(0, 0)))?;
    reader.read_document(&de)
}

/// Parse `input` without a schema: objects become linked maps, arrays lists.
pub fn parse(input: &str) -> Result<Document> {
    static EMPTY: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::new);
    from_str(input, &ValueType::Any, &EMPTY)
}
