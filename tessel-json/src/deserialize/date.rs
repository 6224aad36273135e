use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tessel_core::Value;

use crate::error::{DeserError, DeserErrorKind, Result};
use crate::lexer::{Scalar, Span, TokenKind};
use crate::reader::JsonReader;
use crate::Features;

/// Patterns tried after RFC 3339, in order.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Points in time: epoch milliseconds or date strings.
#[derive(Debug, Clone, Copy)]
pub struct DateDeserializer<'t> {
    format: Option<&'t str>,
}

impl<'t> DateDeserializer<'t> {
    /// Deserializer trying `format` (chrono `strftime` syntax) before the
    /// built-in patterns.
    pub fn new(format: Option<&'t str>) -> Self {
        Self { format }
    }

    pub(crate) fn deserialize(&self, reader: &mut JsonReader<'_>) -> Result<Value> {
        let features = reader.config.features();
        let lexer = &mut reader.lexer;
        let span = lexer.span();
        let scalar = match lexer.token() {
            TokenKind::Null => Scalar::Null,
            TokenKind::Int => Scalar::Int(lexer.int_value()?),
            TokenKind::Str => Scalar::Str(lexer.take_string()),
            _ => return Err(lexer.mismatch("a date")),
        };
        lexer.next_token()?;
        self.from_scalar(scalar, features, span)
    }

    pub(crate) fn from_scalar(
        &self,
        scalar: Scalar,
        features: Features,
        span: Span,
    ) -> Result<Value> {
        let parsed = match &scalar {
            Scalar::Null => return Ok(Value::Null),
            Scalar::Str(text) if text.is_empty() => return Ok(Value::Null),
            Scalar::Int(millis) => DateTime::from_timestamp_millis(*millis),
            Scalar::Str(text) => self.parse(text),
            _ => None,
        };
        match parsed {
            Some(date) => Ok(Value::Date(date)),
            None if features.contains(Features::STRICT_DATES) => Err(DeserError::new(
                DeserErrorKind::InvalidValue {
                    message: format!("{} is not a recognized date", scalar.describe()),
                },
                span,
            )),
            None => {
                debug!("unparseable date {}, using null", scalar.describe());
                Ok(Value::Null)
            }
        }
    }

    fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if let Some(format) = self.format
            && let Some(date) = with_format(text, format)
        {
            return Some(date);
        }
        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Some(date.with_timezone(&Utc));
        }
        if let Some(date) = DATE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        {
            return Some(date.and_utc());
        }
        if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return day.and_hms_opt(0, 0, 0).map(|date| date.and_utc());
        }
        if let Some(millis) = text
            .strip_prefix("/Date(")
            .and_then(|rest| rest.strip_suffix(")/"))
        {
            return epoch_millis(millis);
        }
        epoch_millis(text)
    }
}

fn with_format(text: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_str(text, format) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
        return Some(date.and_utc());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|date| date.and_utc())
}

/// `1700000000000`, optionally followed by a `+0800`-style offset, which is
/// ignored since the number is already UTC.
fn epoch_millis(text: &str) -> Option<DateTime<Utc>> {
    let digits_end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map_or(text.len(), |(i, _)| i);
    let (digits, rest) = text.split_at(digits_end);
    let offset_ok = rest.is_empty()
        || (rest.len() == 5
            && rest.starts_with(['+', '-'])
            && rest[1..].bytes().all(|b| b.is_ascii_digit()));
    if digits.is_empty() || digits == "-" || !offset_ok {
        return None;
    }
    DateTime::from_timestamp_millis(digits.parse().ok()?)
}
