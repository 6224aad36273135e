use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::OnceLock;

use crate::hash::{fnv1a_64, fnv1a_64_folded};
use crate::{HashIndex, TypeName};

/// One constant of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    name: Arc<str>,
    aliases: Vec<Arc<str>>,
}

impl EnumConstant {
    /// Constant with no aliases.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    /// Accept `alias` as another spelling of this constant.
    pub fn alias(mut self, alias: impl Into<Arc<str>>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternate spellings.
    pub fn aliases(&self) -> &[Arc<str>] {
        &self.aliases
    }

    fn spellings(&self) -> impl Iterator<Item = &str> {
        core::iter::once(&*self.name).chain(self.aliases.iter().map(|alias| &**alias))
    }
}

impl From<&str> for EnumConstant {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug)]
struct EnumTables {
    exact: HashIndex,
    folded: HashIndex,
}

/// Immutable description of an enum type: its constants in ordinal order.
pub struct EnumDescriptor {
    name: TypeName,
    constants: Vec<EnumConstant>,
    tables: OnceLock<EnumTables>,
}

impl EnumDescriptor {
    /// Describe the enum `name`; ordinals follow the order of `constants`.
    pub fn new<C>(name: impl Into<TypeName>, constants: impl IntoIterator<Item = C>) -> Self
    where
        C: Into<EnumConstant>,
    {
        Self {
            name: name.into(),
            constants: constants.into_iter().map(Into::into).collect(),
            tables: OnceLock::new(),
        }
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constants in ordinal order.
    pub fn constants(&self) -> &[EnumConstant] {
        &self.constants
    }

    /// Constant at `ordinal`, if in range.
    pub fn by_ordinal(&self, ordinal: usize) -> Option<&EnumConstant> {
        self.constants.get(ordinal)
    }

    /// Ordinal of the constant spelled `text`: case-sensitive first, then ASCII
    /// case-insensitive.
    pub fn lookup(&self, text: &str) -> Option<usize> {
        let tables = self.tables();
        tables
            .exact
            .get(fnv1a_64(text))
            .or_else(|| tables.folded.get(fnv1a_64_folded(text)))
    }

    fn tables(&self) -> &EnumTables {
        self.tables.get_or_init(|| {
            let entries = || {
                self.constants
                    .iter()
                    .enumerate()
                    .flat_map(|(ordinal, c)| c.spellings().map(move |s| (s, ordinal)))
            };
            EnumTables {
                exact: HashIndex::build(entries().map(|(s, o)| (fnv1a_64(s), o))),
                folded: HashIndex::build(entries().map(|(s, o)| (fnv1a_64_folded(s), o))),
            }
        })
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("name", &self.name)
            .field("constants", &self.constants)
            .finish()
    }
}

/// A resolved enum constant.
#[derive(Clone)]
pub struct EnumValue {
    ty: Arc<EnumDescriptor>,
    ordinal: usize,
}

impl EnumValue {
    /// The constant at `ordinal` of `ty`, if in range.
    pub fn new(ty: Arc<EnumDescriptor>, ordinal: usize) -> Option<Self> {
        (ordinal < ty.constants.len()).then_some(Self { ty, ordinal })
    }

    /// Owning enum.
    pub fn ty(&self) -> &Arc<EnumDescriptor> {
        &self.ty
    }

    /// Position in declaration order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Declared name of the constant.
    pub fn name(&self) -> &str {
        self.ty.constants[self.ordinal].name()
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal && self.ty.name == other.ty.name
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.ty.name, self.name())
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
