use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::hash::{fnv1a_64, fnv1a_64_smart};
use crate::{Value, ValueType};

bitflags! {
    /// Per-field behaviour switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// The container is only reachable through a getter: the default instance
        /// owns an empty container and parsed elements are added to it in place.
        const READ_ONLY = 1 << 0;
        /// Resolve by exact name (and aliases) only.
        const NO_SMART_MATCH = 1 << 1;
        /// The field is a nested record or map whose keys appear at this level.
        const UNWRAPPED = 1 << 2;
    }
}

/// Custom conversion applied to a parsed value before it is stored.
pub type ConvertFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// One declared field of a record type.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: Arc<str>,
    ty: ValueType,
    aliases: Vec<Arc<str>>,
    hash: u64,
    smart_hash: u64,
    flags: FieldFlags,
    converter: Option<ConvertFn>,
    format: Option<Arc<str>>,
    index: usize,
}

impl FieldDescriptor {
    /// Start describing a field.
    pub fn builder(name: impl Into<Arc<str>>, ty: ValueType) -> FieldBuilder {
        FieldBuilder::new(name.into(), ty)
    }

    /// Declared name, as written on the wire.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the declared name.
    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Declared type.
    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// Alternate names accepted on the wire.
    pub fn aliases(&self) -> &[Arc<str>] {
        &self.aliases
    }

    /// FNV-1a hash of the name.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Smart hash (lowercased, separators removed) of the name.
    pub fn smart_hash(&self) -> u64 {
        self.smart_hash
    }

    /// Behaviour switches.
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    /// Shorthand for `flags().contains(flag)`.
    pub fn has(&self, flag: FieldFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Date format pattern (chrono `strftime` syntax) tried before the built-in ones.
    pub fn format(&self) -> Option<&Arc<str>> {
        self.format.as_ref()
    }

    /// Position in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Apply the custom converter, if any.
    pub fn convert(&self, value: Value) -> Result<Value, String> {
        match &self.converter {
            Some(convert) => convert(value),
            None => Ok(value),
        }
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("aliases", &self.aliases)
            .field("flags", &self.flags)
            .field("converter", &self.converter.is_some())
            .field("format", &self.format)
            .field("index", &self.index)
            .finish()
    }
}

/// Builder for [`FieldDescriptor`].
pub struct FieldBuilder {
    field: FieldDescriptor,
}

impl FieldBuilder {
    fn new(name: Arc<str>, ty: ValueType) -> Self {
        let hash = fnv1a_64(&name);
        let smart_hash = fnv1a_64_smart(&name);
        Self {
            field: FieldDescriptor {
                name,
                ty,
                aliases: Vec::new(),
                hash,
                smart_hash,
                flags: FieldFlags::empty(),
                converter: None,
                format: None,
                index: 0,
            },
        }
    }

    /// Accept `alias` as an alternate wire name.
    pub fn alias(mut self, alias: impl Into<Arc<str>>) -> Self {
        self.field.aliases.push(alias.into());
        self
    }

    /// Add behaviour switches.
    pub fn flags(mut self, flags: FieldFlags) -> Self {
        self.field.flags |= flags;
        self
    }

    /// Mark as a getter-only container filled in place.
    pub fn read_only(self) -> Self {
        self.flags(FieldFlags::READ_ONLY)
    }

    /// Opt out of smart matching.
    pub fn exact_only(self) -> Self {
        self.flags(FieldFlags::NO_SMART_MATCH)
    }

    /// Re-expose the nested record's or map's keys at this level.
    pub fn unwrapped(self) -> Self {
        self.flags(FieldFlags::UNWRAPPED)
    }

    /// Date format pattern for this field.
    pub fn format(mut self, pattern: impl Into<Arc<str>>) -> Self {
        self.field.format = Some(pattern.into());
        self
    }

    /// Custom conversion applied before the value is stored.
    pub fn converter<F>(mut self, convert: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.field.converter = Some(Arc::new(convert));
        self
    }

    /// Finish the descriptor. The index is assigned by the owning type.
    pub fn build(self) -> FieldDescriptor {
        self.field
    }
}

impl From<FieldBuilder> for FieldDescriptor {
    fn from(builder: FieldBuilder) -> Self {
        builder.build()
    }
}
