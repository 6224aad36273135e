//! Error types for JSON deserialization.

use alloc::string::{String, ToString};
use core::fmt::{self, Display};

use tessel_core::SubtypeError;

use crate::lexer::Span;

/// Error type for JSON deserialization.
#[derive(Debug)]
pub struct DeserError {
    /// The specific kind of error
    pub kind: DeserErrorKind,
    /// Source span where the error occurred
    pub span: Option<Span>,
    /// Field being deserialized when the error occurred (innermost)
    pub field: Option<String>,
    /// Record type being deserialized when the error occurred (innermost)
    pub type_name: Option<String>,
    /// The source input (for diagnostics)
    pub source_code: Option<String>,
}

impl Display for DeserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match (&self.type_name, &self.field) {
            (Some(ty), Some(field)) => write!(f, " (at `{ty}.{field}`)"),
            (Some(ty), None) => write!(f, " (in `{ty}`)"),
            (None, Some(field)) => write!(f, " (at `{field}`)"),
            (None, None) => Ok(()),
        }
    }
}

impl core::error::Error for DeserError {}

impl DeserError {
    /// Create a new error with span information
    pub const fn new(kind: DeserErrorKind, span: Span) -> Self {
        DeserError {
            kind,
            span: Some(span),
            field: None,
            type_name: None,
            source_code: None,
        }
    }

    /// Create an error without span information
    pub const fn without_span(kind: DeserErrorKind) -> Self {
        DeserError {
            kind,
            span: None,
            field: None,
            type_name: None,
            source_code: None,
        }
    }

    /// Attach the field and type being deserialized, unless an inner frame
    /// already did.
    pub fn with_context(mut self, field: &str, type_name: &str) -> Self {
        if self.field.is_none() && self.type_name.is_none() {
            self.field = Some(field.to_string());
            self.type_name = Some(type_name.to_string());
        }
        self
    }

    /// Attach the record type being deserialized, unless already known.
    pub fn with_type(mut self, type_name: &str) -> Self {
        if self.type_name.is_none() {
            self.type_name = Some(type_name.to_string());
        }
        self
    }

    /// Point the error at `span` if it has no location yet.
    pub(crate) fn or_span(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    /// Attach source code for rich diagnostics
    pub fn with_source(mut self, source: &str) -> Self {
        self.source_code = Some(source.to_string());
        self
    }

    /// Whether the value had the wrong shape for its declared type, as opposed
    /// to malformed input. Such errors can be absorbed under
    /// [`Features::IGNORE_MISMATCHED_VALUES`](crate::Features::IGNORE_MISMATCHED_VALUES).
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self.kind,
            DeserErrorKind::TypeMismatch { .. } | DeserErrorKind::NumberOutOfRange { .. }
        )
    }
}

/// Specific error kinds for JSON deserialization
#[derive(Debug, Clone, PartialEq)]
pub enum DeserErrorKind {
    /// Malformed input: unexpected character or punctuation
    Syntax {
        /// What was expected
        expected: &'static str,
        /// What was found instead
        found: String,
    },
    /// Input ended early
    UnexpectedEof {
        /// What was expected before EOF
        expected: &'static str,
    },
    /// Well-formed value of the wrong shape for the declared type
    TypeMismatch {
        /// The expected type
        expected: String,
        /// What was found
        found: String,
    },
    /// Number does not fit the target type
    NumberOutOfRange {
        /// The number as written
        value: String,
        /// The target type
        target: &'static str,
    },
    /// Value of the right shape that is still not acceptable
    InvalidValue {
        /// Description of why the value is invalid
        message: String,
    },
    /// Discriminator naming a type that cannot be used here
    UnknownType {
        /// The discriminator value
        name: String,
        /// Why it was rejected
        reason: SubtypeError,
        /// Closest registered name
        suggestion: Option<String>,
    },
    /// `$ref` path that matched nothing once the document was complete
    UnresolvedReference {
        /// The reference as written
        path: String,
    },
    /// Constructor, factory or post-build step failed
    Construction {
        /// Message returned by the user code
        message: String,
    },
    /// Key matching no field, rejected by configuration
    UnmappedField {
        /// The key
        field: String,
        /// Closest declared field name
        suggestion: Option<String>,
    },
    /// Non-whitespace input after the top-level value
    TrailingInput {
        /// What was found
        found: String,
    },
    /// Arrays and objects nested deeper than the configured limit
    DepthLimitExceeded {
        /// The configured limit
        limit: usize,
    },
}

impl Display for DeserErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeserErrorKind::Syntax { expected, found } => {
                write!(f, "syntax error: expected {expected}, found {found}")
            }
            DeserErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            DeserErrorKind::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            DeserErrorKind::NumberOutOfRange { value, target } => {
                write!(f, "number `{value}` out of range for {target}")
            }
            DeserErrorKind::InvalidValue { message } => write!(f, "invalid value: {message}"),
            DeserErrorKind::UnknownType { name, reason, .. } => {
                write!(f, "cannot use type `{name}`: {reason}")
            }
            DeserErrorKind::UnresolvedReference { path } => {
                write!(f, "reference `{path}` does not point to any value")
            }
            DeserErrorKind::Construction { message } => {
                write!(f, "failed to construct instance: {message}")
            }
            DeserErrorKind::UnmappedField { field, .. } => {
                write!(f, "unknown field `{field}`")
            }
            DeserErrorKind::TrailingInput { found } => {
                write!(f, "trailing input after the top-level value: {found}")
            }
            DeserErrorKind::DepthLimitExceeded { limit } => {
                write!(f, "arrays and objects are nested deeper than {limit} levels")
            }
        }
    }
}

impl DeserErrorKind {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            DeserErrorKind::Syntax { .. } => "tessel::syntax",
            DeserErrorKind::UnexpectedEof { .. } => "tessel::unexpected_eof",
            DeserErrorKind::TypeMismatch { .. } => "tessel::type_mismatch",
            DeserErrorKind::NumberOutOfRange { .. } => "tessel::number_out_of_range",
            DeserErrorKind::InvalidValue { .. } => "tessel::invalid_value",
            DeserErrorKind::UnknownType { .. } => "tessel::unknown_type",
            DeserErrorKind::UnresolvedReference { .. } => "tessel::unresolved_reference",
            DeserErrorKind::Construction { .. } => "tessel::construction",
            DeserErrorKind::UnmappedField { .. } => "tessel::unmapped_field",
            DeserErrorKind::TrailingInput { .. } => "tessel::trailing_input",
            DeserErrorKind::DepthLimitExceeded { .. } => "tessel::depth_limit_exceeded",
        }
    }

    /// Get a label describing where/what the error points to.
    pub fn label(&self) -> String {
        match self {
            DeserErrorKind::Syntax { expected, .. } => format!("expected {expected}"),
            DeserErrorKind::UnexpectedEof { expected } => format!("expected {expected}"),
            DeserErrorKind::TypeMismatch { expected, .. } => format!("expected {expected}"),
            DeserErrorKind::NumberOutOfRange { target, .. } => {
                format!("out of range for {target}")
            }
            DeserErrorKind::InvalidValue { .. } => "invalid value".into(),
            DeserErrorKind::UnknownType { name, .. } => format!("type `{name}`"),
            DeserErrorKind::UnresolvedReference { .. } => "dangling reference".into(),
            DeserErrorKind::Construction { .. } => "while constructing this value".into(),
            DeserErrorKind::UnmappedField { field, .. } => format!("unknown field `{field}`"),
            DeserErrorKind::TrailingInput { .. } => "unexpected input".into(),
            DeserErrorKind::DepthLimitExceeded { .. } => "nested too deeply".into(),
        }
    }

    /// Get help text, if any.
    pub fn help(&self) -> Option<String> {
        match self {
            DeserErrorKind::UnmappedField {
                suggestion: Some(suggested),
                ..
            }
            | DeserErrorKind::UnknownType {
                suggestion: Some(suggested),
                ..
            } => Some(format!("did you mean `{suggested}`?")),
            DeserErrorKind::UnknownType {
                reason: SubtypeError::Disallowed,
                ..
            } => Some("register the type as a subtype, or allow it with a type guard".into()),
            DeserErrorKind::UnresolvedReference { .. } => {
                Some("reference paths start at the document root, e.g. `$.items[0]`".into())
            }
            DeserErrorKind::DepthLimitExceeded { .. } => {
                Some("raise the limit with `ParserConfigBuilder::max_depth`".into())
            }
            _ => None,
        }
    }
}

impl miette::Diagnostic for DeserError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_code
            .as_ref()
            .map(|s| s as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(core::iter::once(miette::LabeledSpan::at(
            span,
            self.kind.label(),
        ))))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.kind
            .help()
            .map(|help| Box::new(help) as Box<dyn Display + 'a>)
    }
}

/// Result type for JSON deserialization
pub type Result<T> = core::result::Result<T, DeserError>;

/// Closest candidate to `unknown`, if any is similar enough to be worth suggesting.
pub(crate) fn suggest<'c>(
    unknown: &str,
    candidates: impl IntoIterator<Item = &'c str>,
) -> Option<String> {
    const SIMILARITY_THRESHOLD: f64 = 0.7;

    let mut best: Option<(&str, f64)> = None;
    for known in candidates {
        let score = strsim::jaro_winkler(unknown, known);
        if score > SIMILARITY_THRESHOLD && best.is_none_or(|(_, top)| score > top) {
            best = Some((known, score));
        }
    }
    best.map(|(known, _)| known.to_string())
}
