//! How instances of a record type come into existence.
//!
//! Invocation closures are registered once when the descriptor is built; nothing
//! is looked up at parse time.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::{Record, Value, ValueType};

/// A named constructor or factory parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Matched against field names first, then by position.
    pub name: Arc<str>,
    /// Declared type, used to pick a default when the value is missing.
    pub ty: ValueType,
}

impl Param {
    /// Describe a parameter.
    pub fn new(name: impl Into<Arc<str>>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Receives the arguments in parameter order and returns every slot in field
/// declaration order.
pub type ConstructFn = Arc<dyn Fn(Vec<Value>) -> Result<Vec<Value>, String> + Send + Sync>;

/// Receives the arguments in parameter order.
pub type FactoryFn = Arc<dyn Fn(Vec<Value>) -> Result<Built, String> + Send + Sync>;

/// Runs on the finished instance; `Some` replaces it.
pub type PostBuildFn = Arc<dyn Fn(&Record) -> Result<Option<Value>, String> + Send + Sync>;

/// Output of a factory method.
#[derive(Debug, Clone, PartialEq)]
pub enum Built {
    /// Slots of a new instance of the owning type, in declaration order.
    Slots(Vec<Value>),
    /// Some other value stands in for the instance.
    Value(Value),
}

/// Instantiation strategy of a record type.
#[derive(Clone, Default)]
pub enum Creator {
    /// No-argument constructor: the instance exists before any field is read.
    #[default]
    Default,
    /// Constructor taking parameters; fields are buffered until the object ends.
    Constructor {
        /// declared parameters
        params: Vec<Param>,
        /// invocation
        invoke: ConstructFn,
    },
    /// Static factory taking parameters; fields are buffered until the object ends.
    Factory {
        /// declared parameters
        params: Vec<Param>,
        /// invocation
        invoke: FactoryFn,
    },
}

impl Creator {
    /// Constructor from parameters and a closure.
    pub fn constructor<F>(params: Vec<Param>, invoke: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>, String> + Send + Sync + 'static,
    {
        Creator::Constructor {
            params,
            invoke: Arc::new(invoke),
        }
    }

    /// Factory from parameters and a closure.
    pub fn factory<F>(params: Vec<Param>, invoke: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Built, String> + Send + Sync + 'static,
    {
        Creator::Factory {
            params,
            invoke: Arc::new(invoke),
        }
    }

    /// Declared parameters; empty for [`Creator::Default`].
    pub fn params(&self) -> &[Param] {
        match self {
            Creator::Default => &[],
            Creator::Constructor { params, .. } | Creator::Factory { params, .. } => params,
        }
    }

    /// Whether an instance can be created before any field is read.
    pub fn is_default(&self) -> bool {
        matches!(self, Creator::Default)
    }
}

impl fmt::Debug for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Creator::Default => f.write_str("Default"),
            Creator::Constructor { params, .. } => {
                f.debug_tuple("Constructor").field(params).finish()
            }
            Creator::Factory { params, .. } => f.debug_tuple("Factory").field(params).finish(),
        }
    }
}
