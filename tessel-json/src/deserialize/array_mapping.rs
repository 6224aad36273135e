//! Positional encoding of records: `[v1, v2, ...]` in field declaration order.

use alloc::sync::Arc;

use tessel_core::{TypeDescriptor, Value};

use super::record::{RecordBuild, RecordDeserializer};
use crate::context::PathKey;
use crate::error::{DeserError, DeserErrorKind, Result, suggest};
use crate::lexer::{Span, TokenKind};
use crate::reader::JsonReader;
use crate::Features;

/// Read a positional array. An optional leading `"<type key>": "<name>",`
/// pair selects a subtype.
pub(super) fn read(
    de: &RecordDeserializer,
    reader: &mut JsonReader<'_>,
    key: PathKey,
    features: Features,
) -> Result<Value> {
    let start = reader.lexer.span();
    reader.lexer.next_token()?;

    let config = reader.config;
    let registry = reader.registry;
    let ty = de.ty();
    if !features.contains(Features::DISABLE_SPECIAL_KEY_DETECT)
        && let Some(tag) = reader.lexer.scan_type_name(config.type_key_for(ty))?
        && tag != ty.tag()
        && tag != ty.name()
    {
        let sub = registry
            .resolve_subtype(
                &tag,
                ty,
                config.guard(),
                features.contains(Features::SAFE_MODE),
            )
            .map_err(|reason| {
                DeserError::new(
                    DeserErrorKind::UnknownType {
                        suggestion: suggest(&tag, registry.names()),
                        name: tag.clone(),
                        reason,
                    },
                    start,
                )
            })?;
        trace!("positional `{}` is a `{}`", ty.name(), sub.name());
        let sub = RecordDeserializer::new(sub);
        let features = config.features().for_type(sub.ty());
        let build = RecordBuild::new(Arc::clone(sub.ty()), features, key, start, None);
        return read_elements(&sub, reader, build).map_err(|err| err.with_type(sub.ty().name()));
    }

    let build = RecordBuild::new(Arc::clone(ty), features, key, start, None);
    read_elements(de, reader, build)
}

fn read_elements(
    de: &RecordDeserializer,
    reader: &mut JsonReader<'_>,
    mut build: RecordBuild,
) -> Result<Value> {
    let result = fill(de, reader, &mut build);
    build.close(reader);
    result
}

fn fill(
    de: &RecordDeserializer,
    reader: &mut JsonReader<'_>,
    build: &mut RecordBuild,
) -> Result<Value> {
    let ty = Arc::clone(de.ty());
    for i in 0..ty.fields().len() {
        if reader.lexer.token() == TokenKind::RBracket {
            return Err(arity(&ty, i, reader.lexer.span()));
        }
        if i > 0 {
            reader.lexer.advance(TokenKind::Comma)?;
        }
        de.read_field(reader, build, i)?;
    }

    match reader.lexer.token() {
        TokenKind::RBracket => reader.lexer.next_token()?,
        TokenKind::Comma => {
            return Err(DeserError::new(
                DeserErrorKind::InvalidValue {
                    message: format!(
                        "expected {} elements for `{}`, found more",
                        ty.fields().len(),
                        ty.name()
                    ),
                },
                reader.lexer.span(),
            ));
        }
        _ => return Err(reader.lexer.unexpected("`,` or `]`")),
    }
    de.finish(reader, build)
}

fn arity(ty: &TypeDescriptor, found: usize, span: Span) -> DeserError {
    DeserError::new(
        DeserErrorKind::InvalidValue {
            message: format!(
                "expected {} elements for `{}`, found {found}",
                ty.fields().len(),
                ty.name()
            ),
        },
        span,
    )
}
