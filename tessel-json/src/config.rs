//! Parser configuration.

use alloc::sync::Arc;
use core::fmt;
use std::sync::LazyLock;

use bitflags::bitflags;
use tessel_core::{TypeDescriptor, TypeFlags, TypeGuard};

bitflags! {
    /// Parser-wide behaviour switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u32 {
        /// Accept `[v1, v2, ...]` for every record type.
        const SUPPORT_ARRAY_TO_BEAN = 1 << 0;
        /// Match keys to fields by exact name and alias only.
        const DISABLE_FIELD_SMART_MATCH = 1 << 1;
        /// Keys matching no field are an error instead of extras.
        const FAIL_ON_UNKNOWN_PROPERTIES = 1 << 2;
        /// Enum text matching no constant is an error instead of null.
        const ERROR_ON_ENUM_NOT_MATCH = 1 << 3;
        /// Missing string fields default to `""` instead of null.
        const INIT_STRING_FIELD_AS_EMPTY = 1 << 4;
        /// Field values of the wrong shape are kept as extras instead of failing.
        const IGNORE_MISMATCHED_VALUES = 1 << 5;
        /// Floating point numbers in untyped positions become decimals.
        const USE_BIG_DECIMAL = 1 << 6;
        /// Unparseable dates are an error instead of null.
        const STRICT_DATES = 1 << 7;
        /// Treat `$ref` and the type key as ordinary keys.
        const DISABLE_SPECIAL_KEY_DETECT = 1 << 8;
        /// Accept `'single quoted'` strings.
        const ALLOW_SINGLE_QUOTES = 1 << 9;
        /// Reject every discriminator that is not a declared subtype.
        const SAFE_MODE = 1 << 10;
    }
}

impl Features {
    /// Parser features with a record type's own flags folded in.
    pub fn for_type(self, ty: &TypeDescriptor) -> Features {
        let mut features = self;
        if ty.flags().contains(TypeFlags::ARRAY_MAPPING) {
            features |= Features::SUPPORT_ARRAY_TO_BEAN;
        }
        if ty.flags().contains(TypeFlags::NO_SMART_MATCH) {
            features |= Features::DISABLE_FIELD_SMART_MATCH;
        }
        features
    }
}

/// Discriminator key used when neither the type nor the configuration names one.
pub const DEFAULT_TYPE_KEY: &str = "@type";

/// How deeply arrays and objects may nest unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 128;

static DEFAULT_CONFIG: LazyLock<ParserConfig> = LazyLock::new(|| ParserConfig::builder().build());

/// Options for one or more parses.
#[derive(Clone)]
pub struct ParserConfig {
    features: Features,
    type_key: Arc<str>,
    guard: Option<Arc<dyn TypeGuard>>,
    max_depth: usize,
}

impl ParserConfig {
    /// Start from the defaults: no features, `@type` discriminator, no guard,
    /// [`DEFAULT_MAX_DEPTH`] levels of nesting.
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder {
            features: Features::empty(),
            type_key: Arc::from(DEFAULT_TYPE_KEY),
            guard: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// The shared default configuration.
    pub fn default_ref() -> &'static ParserConfig {
        &DEFAULT_CONFIG
    }

    /// Enabled features.
    pub fn features(&self) -> Features {
        self.features
    }

    /// Whether every feature in `feature` is enabled.
    pub fn has(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    /// Default discriminator key.
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    /// Discriminator key for objects of `ty`.
    pub fn type_key_for<'a>(&'a self, ty: &'a TypeDescriptor) -> &'a str {
        ty.type_key().unwrap_or(&self.type_key)
    }

    /// Policy for discriminators outside the declared subtype tree.
    pub fn guard(&self) -> Option<&dyn TypeGuard> {
        self.guard.as_deref()
    }

    /// How many arrays and objects may enclose one another.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("features", &self.features)
            .field("type_key", &self.type_key)
            .field("guard", &self.guard.is_some())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// Builder for [`ParserConfig`].
pub struct ParserConfigBuilder {
    features: Features,
    type_key: Arc<str>,
    guard: Option<Arc<dyn TypeGuard>>,
    max_depth: usize,
}

impl ParserConfigBuilder {
    /// Enable `features` in addition to those already enabled.
    pub fn features(mut self, features: Features) -> Self {
        self.features |= features;
        self
    }

    /// Set the default discriminator key.
    pub fn type_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.type_key = key.into();
        self
    }

    /// Install a policy for discriminators naming types outside the declared
    /// subtype tree.
    pub fn guard(mut self, guard: impl TypeGuard + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Limit how deeply arrays and objects may nest. Deeper input fails with
    /// [`DepthLimitExceeded`](crate::DeserErrorKind::DepthLimitExceeded).
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> ParserConfig {
        ParserConfig {
            features: self.features,
            type_key: self.type_key,
            guard: self.guard,
            max_depth: self.max_depth,
        }
    }
}
