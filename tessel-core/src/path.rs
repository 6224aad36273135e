//! Absolute paths into a value graph, as written in `$ref` targets.
//!
//! The accepted syntax is `$` followed by any number of `.name`, `['name']` or
//! `[index]` steps.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

/// A single step from a container to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    /// Record field, map key or error member by name.
    Field(String),
    /// Sequence element by position.
    Index(usize),
}

/// A path from the document root, recorded as a series of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// The root path `$`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `$`, `$.a.b[0]` or `$['a b']`. Returns `None` on anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let mut rest = text.strip_prefix('$')?;
        let mut steps = Vec::new();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                if end == 0 {
                    return None;
                }
                steps.push(PathStep::Field(after[..end].into()));
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let close = after.find(']')?;
                let inner = &after[..close];
                let quoted = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
                let step = match quoted {
                    Some(name) => PathStep::Field(name.into()),
                    None => PathStep::Index(inner.parse().ok()?),
                };
                steps.push(step);
                rest = &after[close + 1..];
            } else {
                return None;
            }
        }
        Some(Self { steps })
    }

    /// Append a step.
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// Steps from the root.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Whether this is `$`.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('$')?;
        for step in &self.steps {
            match step {
                PathStep::Field(name) if name.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                    write!(f, ".{name}")?
                }
                PathStep::Field(name) => write!(f, "['{name}']")?,
                PathStep::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}
