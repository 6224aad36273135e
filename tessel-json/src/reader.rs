//! Per-parse state and the reader every deserializer works against.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use tessel_core::{Document, Graph, TypeRegistry, Value, ValueType};

use crate::context::{ContextArena, PathKey};
use crate::deserialize::ValueDeserializer;
use crate::error::{DeserError, DeserErrorKind, Result};
use crate::lexer::{JsonLexer, Span, TokenKind};
use crate::resolve::{self, RefTarget, ResolveTask, Slot};
use crate::{Features, ParserConfig};

/// Everything one parse owns besides the lexer.
#[derive(Debug, Default)]
pub(crate) struct ParseState {
    pub(crate) graph: Graph,
    pub(crate) contexts: ContextArena,
    pub(crate) tasks: Vec<ResolveTask>,
    /// Set when the value just returned is a placeholder for a deferred reference.
    pub(crate) pending_ref: Option<usize>,
    /// Arrays and objects currently open.
    pub(crate) depth: usize,
}

/// Token source plus parse state, threaded through every [`ValueDeserializer`].
pub struct JsonReader<'a> {
    pub(crate) lexer: JsonLexer<'a>,
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) config: &'a ParserConfig,
    pub(crate) state: ParseState,
}

impl<'a> JsonReader<'a> {
    /// Reader positioned at the first token of `input`.
    pub fn new(
        input: &'a str,
        registry: &'a TypeRegistry,
        config: &'a ParserConfig,
    ) -> Result<Self> {
        let mut lexer =
            JsonLexer::with_options(input, config.has(Features::ALLOW_SINGLE_QUOTES));
        lexer.next_token()?;
        Ok(Self {
            lexer,
            registry,
            config,
            state: ParseState::default(),
        })
    }

    /// The token source.
    pub fn lexer(&self) -> &JsonLexer<'a> {
        &self.lexer
    }

    /// Types available to this parse.
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Options of this parse.
    pub fn config(&self) -> &'a ParserConfig {
        self.config
    }

    /// Containers built so far.
    pub fn graph(&self) -> &Graph {
        &self.state.graph
    }

    /// Read the whole input as one value of `de`, then resolve every deferred
    /// reference.
    pub fn read_document(mut self, de: &ValueDeserializer<'_>) -> Result<Document> {
        let (mut root, deferred) = self.read_slot(de, PathKey::Root)?;
        if let Some(task) = deferred {
            self.bind(task, Slot::Root);
        }
        if self.lexer.token() != TokenKind::Eof {
            return Err(self.lexer.error(DeserErrorKind::TrailingInput {
                found: self.lexer.found(),
            }));
        }
        resolve::drain(&mut self.state, &mut root)?;
        Ok(Document::new(self.state.graph, root))
    }

    /// Deserialize one value that is about to be stored somewhere. The second
    /// element names the resolve task to bind if the value is a deferred `$ref`.
    pub(crate) fn read_slot(
        &mut self,
        de: &ValueDeserializer<'_>,
        key: PathKey,
    ) -> Result<(Value, Option<usize>)> {
        let nested = matches!(self.lexer.token(), TokenKind::LBrace | TokenKind::LBracket);
        if nested {
            let limit = self.config.max_depth();
            if self.state.depth >= limit {
                return Err(self
                    .lexer
                    .error(DeserErrorKind::DepthLimitExceeded { limit }));
            }
            self.state.depth += 1;
        }
        self.state.pending_ref = None;
        let value = de.deserialize(self, key);
        if nested {
            self.state.depth -= 1;
        }
        Ok((value?, self.state.pending_ref.take()))
    }

    /// Tell a deferred reference where its value goes.
    pub(crate) fn bind(&mut self, task: usize, slot: Slot) {
        if let Some(task) = self.state.tasks.get_mut(task) {
            task.slot = Some(slot);
        }
    }

    /// Read the value of a `$ref` key. Targets that already exist are returned
    /// directly; otherwise a task is queued and `null` stands in until the
    /// caller binds it.
    pub(crate) fn read_ref(&mut self) -> Result<Value> {
        if self.lexer.token() != TokenKind::Str {
            return Err(self.lexer.mismatch("a reference path"));
        }
        let span = self.lexer.span();
        let text = self.lexer.take_string();
        self.lexer.next_token()?;

        let Some(target) = RefTarget::parse(&text) else {
            return Err(DeserError::new(
                DeserErrorKind::InvalidValue {
                    message: format!("`{text}` is not a reference path"),
                },
                span,
            ));
        };

        let contexts = &self.state.contexts;
        let ctx = contexts.current();
        let immediate = match &target {
            RefTarget::Current => ctx.and_then(|ctx| contexts.node(ctx)),
            RefTarget::Parent => ctx
                .and_then(|ctx| contexts.parent(ctx))
                .and_then(|ctx| contexts.node(ctx)),
            RefTarget::Root => ctx.and_then(|ctx| contexts.node(contexts.root_of(ctx))),
            RefTarget::Path(_) => None,
        };
        if let Some(id) = immediate {
            trace!("`{text}` resolved immediately to {id}");
            return Ok(Value::Node(id));
        }

        trace!(
            "deferring `{text}` from {}",
            ctx.map(|ctx| contexts.path_of(ctx)).unwrap_or_default()
        );
        self.state.tasks.push(ResolveTask {
            ctx,
            target,
            text,
            span,
            slot: None,
        });
        self.state.pending_ref = Some(self.state.tasks.len() - 1);
        Ok(Value::Null)
    }

    /// Deserialize a map key's text as `ty`. Structured key types read the text
    /// as JSON; scalar key types read it as a string literal.
    pub(crate) fn read_key(
        &mut self,
        text: &str,
        ty: &ValueType,
        de: &ValueDeserializer<'_>,
        span: Span,
    ) -> Result<Value> {
        let source: Cow<'_, str> = match ty {
            ValueType::Record(_) | ValueType::List { .. } | ValueType::Map { .. } => {
                Cow::Borrowed(text)
            }
            _ => Cow::Owned(quote(text)),
        };

        let mut nested = JsonReader {
            lexer: JsonLexer::with_options(&source, self.lexer.single_quotes()),
            registry: self.registry,
            config: self.config,
            state: core::mem::take(&mut self.state),
        };
        let result = nested.read_nested(de);
        self.state = core::mem::take(&mut nested.state);

        // offsets inside the key text do not map onto the document
        result.map_err(|mut err| {
            err.span = Some(span);
            err
        })
    }

    fn read_nested(&mut self, de: &ValueDeserializer<'_>) -> Result<Value> {
        self.lexer.next_token()?;
        let value = de.deserialize(self, PathKey::Root)?;
        if self.lexer.token() != TokenKind::Eof {
            return Err(self.lexer.error(DeserErrorKind::TrailingInput {
                found: self.lexer.found(),
            }));
        }
        Ok(value)
    }
}

/// `text` as a JSON string literal.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
