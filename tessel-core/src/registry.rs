//! Named type lookup and the polymorphic trust boundary.
//!
//! A discriminator in the input names a type. Types reachable through the
//! expected type's declared subtypes are trusted outright. Anything else must be
//! registered, assignable to the expected type, and allowed by a [`TypeGuard`].

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::collections::HashMap;

use crate::{EnumDescriptor, TypeDescriptor};

/// A registered named type.
#[derive(Debug, Clone)]
pub enum Described {
    /// record type
    Record(Arc<TypeDescriptor>),
    /// enum type
    Enum(Arc<EnumDescriptor>),
}

/// Caller-supplied policy for discriminators naming types outside the declared
/// subtype tree.
pub trait TypeGuard: Send + Sync {
    /// Whether `name` may be instantiated where `expected` (if any) was declared.
    fn allows(&self, name: &str, expected: Option<&TypeDescriptor>) -> bool;
}

/// Allows type names starting with one of a fixed set of prefixes.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    prefixes: Vec<String>,
}

impl AllowList {
    /// Guard accepting names starting with any of `prefixes`.
    pub fn new<S: Into<String>>(prefixes: impl IntoIterator<Item = S>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl TypeGuard for AllowList {
    fn allows(&self, name: &str, _expected: Option<&TypeDescriptor>) -> bool {
        self.prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// Why a discriminator was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtypeError {
    /// No registered type carries the tag.
    Unregistered,
    /// The named type does not extend the expected one.
    NotAssignable,
    /// Rejected by safe mode or by the guard.
    Disallowed,
}

impl fmt::Display for SubtypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubtypeError::Unregistered => "type is not registered",
            SubtypeError::NotAssignable => "type is not a subtype of the expected type",
            SubtypeError::Disallowed => "type is not allowed",
        })
    }
}

impl core::error::Error for SubtypeError {}

/// A record type could not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another record type already owns the discriminator tag.
    DuplicateTag {
        /// the contested tag
        tag: String,
        /// the type that owns it
        owner: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateTag { tag, owner } => {
                write!(f, "tag `{tag}` is already registered by `{owner}`")
            }
        }
    }
}

impl core::error::Error for RegistryError {}

/// Every named type known to a parse.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_name: HashMap<String, Described>,
    by_tag: HashMap<String, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record type under its name and tag. Returns the shared handle.
    ///
    /// Registering a name again replaces the earlier type. A tag owned by a
    /// type of another name is rejected and leaves the registry unchanged.
    pub fn register_record(
        &mut self,
        ty: TypeDescriptor,
    ) -> Result<Arc<TypeDescriptor>, RegistryError> {
        if let Some(owner) = self.by_tag.get(ty.tag())
            && owner.name() != ty.name()
        {
            return Err(RegistryError::DuplicateTag {
                tag: ty.tag().into(),
                owner: owner.name().into(),
            });
        }
        let ty = Arc::new(ty);
        if let Some(Described::Record(old)) = self.by_name.get(ty.name())
            && old.tag() != ty.tag()
        {
            self.by_tag.remove(old.tag());
        }
        self.by_tag.insert(ty.tag().into(), ty.clone());
        self.by_name
            .insert(ty.name().into(), Described::Record(ty.clone()));
        Ok(ty)
    }

    /// Register an enum type under its name.
    pub fn register_enum(&mut self, ty: EnumDescriptor) -> Arc<EnumDescriptor> {
        let ty = Arc::new(ty);
        self.by_name
            .insert(ty.name().into(), Described::Enum(ty.clone()));
        ty
    }

    /// Registered type by name.
    pub fn get(&self, name: &str) -> Option<&Described> {
        self.by_name.get(name)
    }

    /// Registered record type by name.
    pub fn record(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        match self.by_name.get(name)? {
            Described::Record(ty) => Some(ty),
            Described::Enum(_) => None,
        }
    }

    /// Registered enum type by name.
    pub fn enumeration(&self, name: &str) -> Option<&Arc<EnumDescriptor>> {
        match self.by_name.get(name)? {
            Described::Enum(ty) => Some(ty),
            Described::Record(_) => None,
        }
    }

    /// Registered record type by discriminator tag, then by name.
    pub fn by_tag(&self, tag: &str) -> Option<&Arc<TypeDescriptor>> {
        self.by_tag.get(tag).or_else(|| self.record(tag))
    }

    /// Whether `ty` is `expected` or transitively declares it as supertype.
    pub fn is_assignable(&self, ty: &TypeDescriptor, expected: &TypeDescriptor) -> bool {
        let mut current = Some(ty);
        // A supertype cycle is cut off after visiting every registered type.
        for _ in 0..=self.by_name.len() {
            let Some(ty) = current else {
                return false;
            };
            if ty.name() == expected.name() {
                return true;
            }
            current = ty
                .supertype()
                .and_then(|name| self.record(name))
                .map(|arc| &**arc);
        }
        false
    }

    /// Search the declared subtypes of `expected`, depth first, for `tag`.
    pub fn declared_subtype(
        &self,
        tag: &str,
        expected: &TypeDescriptor,
    ) -> Option<&Arc<TypeDescriptor>> {
        let mut stack: Vec<&str> = expected.subtypes().iter().rev().map(|n| &**n).collect();
        let mut visited = 0usize;
        while let Some(name) = stack.pop() {
            visited += 1;
            if visited > self.by_name.len() {
                break;
            }
            let Some(sub) = self.record(name) else {
                continue;
            };
            if sub.tag() == tag || sub.name() == tag {
                return Some(sub);
            }
            stack.extend(sub.subtypes().iter().rev().map(|n| &**n));
        }
        None
    }

    /// Resolve the discriminator `tag` found where `expected` was declared.
    ///
    /// Declared subtypes are always accepted. Other registered types are
    /// accepted outside safe mode when they are assignable to `expected` and
    /// the guard allows them.
    pub fn resolve_subtype(
        &self,
        tag: &str,
        expected: &TypeDescriptor,
        guard: Option<&dyn TypeGuard>,
        safe_mode: bool,
    ) -> Result<Arc<TypeDescriptor>, SubtypeError> {
        if let Some(sub) = self.declared_subtype(tag, expected) {
            return Ok(sub.clone());
        }
        if safe_mode {
            return Err(SubtypeError::Disallowed);
        }
        let ty = self.by_tag(tag).ok_or(SubtypeError::Unregistered)?;
        if !self.is_assignable(ty, expected) {
            return Err(SubtypeError::NotAssignable);
        }
        match guard {
            Some(guard) if guard.allows(ty.name(), Some(expected)) => Ok(ty.clone()),
            _ => Err(SubtypeError::Disallowed),
        }
    }

    /// Resolve a discriminator found in an untyped position (`Any`, map values).
    /// The guard must allow the type; safe mode rejects everything.
    pub fn resolve_untyped(
        &self,
        tag: &str,
        guard: Option<&dyn TypeGuard>,
        safe_mode: bool,
    ) -> Result<Arc<TypeDescriptor>, SubtypeError> {
        if safe_mode {
            return Err(SubtypeError::Disallowed);
        }
        let ty = self.by_tag(tag).ok_or(SubtypeError::Unregistered)?;
        match guard {
            Some(guard) if guard.allows(ty.name(), None) => Ok(ty.clone()),
            _ => Err(SubtypeError::Disallowed),
        }
    }

    /// Every registered name, sorted. Used for "did you mean" suggestions.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
