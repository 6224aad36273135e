use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::OnceLock;

use bitflags::bitflags;

use crate::{
    Creator, FieldDescriptor, MatchTables, Param, PostBuildFn, Record, TypeName, Value,
};

bitflags! {
    /// Per-type behaviour switches, OR-ed with the parser's features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// Accept the positional `[v1, v2, ...]` encoding.
        const ARRAY_MAPPING = 1 << 0;
        /// Disable smart matching for every field of the type.
        const NO_SMART_MATCH = 1 << 1;
    }
}

/// Immutable description of a record type, shared by every parse.
pub struct TypeDescriptor {
    name: TypeName,
    tag: TypeName,
    fields: Vec<FieldDescriptor>,
    sorted: Vec<usize>,
    creator: Creator,
    post_build: Option<PostBuildFn>,
    type_key: Option<Arc<str>>,
    supertype: Option<TypeName>,
    subtypes: Vec<TypeName>,
    flags: TypeFlags,
    tables: OnceLock<MatchTables>,
}

impl TypeDescriptor {
    /// Start describing the record type `name`.
    pub fn builder(name: impl Into<TypeName>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name.into())
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the registered name.
    pub fn name_arc(&self) -> &TypeName {
        &self.name
    }

    /// Discriminator value naming this type on the wire.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Field at `index` in declaration order.
    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    /// Declaration indices ordered by field name.
    pub fn sorted(&self) -> &[usize] {
        &self.sorted
    }

    /// Binary search by declared name over the sorted order.
    pub fn find_exact(&self, name: &str) -> Option<usize> {
        self.sorted
            .binary_search_by(|&index| self.fields[index].name().cmp(name))
            .ok()
            .map(|pos| self.sorted[pos])
    }

    /// Name, then alias, lookup. Never smart.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.find_exact(name)
            .or_else(|| self.tables().exact(name))
    }

    /// Match tables, built on first use.
    pub fn tables(&self) -> &MatchTables {
        self.tables.get_or_init(|| MatchTables::build(&self.fields))
    }

    /// Smart lookup, honouring [`TypeFlags::NO_SMART_MATCH`].
    pub fn smart_match(&self, key: &str) -> Option<usize> {
        if self.flags.contains(TypeFlags::NO_SMART_MATCH) {
            return None;
        }
        self.tables().smart(key, &self.fields)
    }

    /// Instantiation strategy.
    pub fn creator(&self) -> &Creator {
        &self.creator
    }

    /// Optional step run on the finished instance.
    pub fn post_build(&self) -> Option<&PostBuildFn> {
        self.post_build.as_ref()
    }

    /// Discriminator key override.
    pub fn type_key(&self) -> Option<&str> {
        self.type_key.as_deref()
    }

    /// Declared supertype.
    pub fn supertype(&self) -> Option<&TypeName> {
        self.supertype.as_ref()
    }

    /// Subtypes a discriminator may redirect to without further checks.
    pub fn subtypes(&self) -> &[TypeName] {
        &self.subtypes
    }

    /// Behaviour switches.
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    /// Slot values of a freshly default-constructed instance.
    ///
    /// Containers of read-only fields are not created here: they need a graph.
    pub fn default_slots(&self, empty_strings: bool) -> Vec<Value> {
        self.fields
            .iter()
            .map(|field| match field.ty() {
                crate::ValueType::Str if empty_strings => Value::Str(String::new()),
                ty => ty.default_value(),
            })
            .collect()
    }

    /// Single creator parameter, for scalar-to-record coercion.
    pub fn single_param(&self) -> Option<&Param> {
        match self.creator.params() {
            [param] => Some(param),
            _ => None,
        }
    }

    /// Apply the post-build step to `record`.
    pub fn finish(&self, record: &Record) -> Result<Option<Value>, String> {
        match &self.post_build {
            Some(step) => step(record),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("fields", &self.fields)
            .field("creator", &self.creator)
            .field("post_build", &self.post_build.is_some())
            .field("supertype", &self.supertype)
            .field("subtypes", &self.subtypes)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Reasons a descriptor cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Two fields share a name.
    DuplicateField {
        /// owning type
        type_name: String,
        /// repeated name
        field: String,
    },
    /// More fields than a match table can index.
    TooManyFields {
        /// owning type
        type_name: String,
    },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::DuplicateField { type_name, field } => {
                write!(f, "type `{type_name}` declares field `{field}` twice")
            }
            DescriptorError::TooManyFields { type_name } => {
                write!(f, "type `{type_name}` declares more than {} fields", u32::MAX)
            }
        }
    }
}

impl core::error::Error for DescriptorError {}

/// Builder for [`TypeDescriptor`].
pub struct TypeDescriptorBuilder {
    name: TypeName,
    tag: Option<TypeName>,
    fields: Vec<FieldDescriptor>,
    creator: Creator,
    post_build: Option<PostBuildFn>,
    type_key: Option<Arc<str>>,
    supertype: Option<TypeName>,
    subtypes: Vec<TypeName>,
    flags: TypeFlags,
}

impl TypeDescriptorBuilder {
    fn new(name: TypeName) -> Self {
        Self {
            name,
            tag: None,
            fields: Vec::new(),
            creator: Creator::Default,
            post_build: None,
            type_key: None,
            supertype: None,
            subtypes: Vec::new(),
            flags: TypeFlags::empty(),
        }
    }

    /// Append a field; declaration order is call order.
    pub fn field(mut self, field: impl Into<FieldDescriptor>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Instantiation strategy.
    pub fn creator(mut self, creator: Creator) -> Self {
        self.creator = creator;
        self
    }

    /// Step run on the finished instance; a `Some` result replaces it.
    pub fn post_build<F>(mut self, step: F) -> Self
    where
        F: Fn(&Record) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        self.post_build = Some(Arc::new(step));
        self
    }

    /// Discriminator value for this type (defaults to the name).
    pub fn tag(mut self, tag: impl Into<TypeName>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Discriminator key override for objects of this type.
    pub fn type_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.type_key = Some(key.into());
        self
    }

    /// Declare the supertype.
    pub fn extends(mut self, supertype: impl Into<TypeName>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    /// Register a subtype reachable through the discriminator.
    pub fn subtype(mut self, subtype: impl Into<TypeName>) -> Self {
        self.subtypes.push(subtype.into());
        self
    }

    /// Add behaviour switches.
    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<TypeDescriptor, DescriptorError> {
        if self.fields.len() > u32::MAX as usize {
            return Err(DescriptorError::TooManyFields {
                type_name: String::from(&*self.name),
            });
        }

        let mut fields = self.fields;
        for (index, field) in fields.iter_mut().enumerate() {
            field.set_index(index);
        }

        let mut sorted: Vec<usize> = (0..fields.len()).collect();
        sorted.sort_by(|&a, &b| fields[a].name().cmp(fields[b].name()));
        if let Some(pair) = sorted
            .windows(2)
            .find(|pair| fields[pair[0]].name() == fields[pair[1]].name())
        {
            return Err(DescriptorError::DuplicateField {
                type_name: String::from(&*self.name),
                field: String::from(fields[pair[0]].name()),
            });
        }

        Ok(TypeDescriptor {
            tag: self.tag.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            fields,
            sorted,
            creator: self.creator,
            post_build: self.post_build,
            type_key: self.type_key,
            supertype: self.supertype,
            subtypes: self.subtypes,
            flags: self.flags,
            tables: OnceLock::new(),
        })
    }
}
