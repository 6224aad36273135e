#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod creator;
pub use creator::*;

mod descriptor;
pub use descriptor::*;

mod enum_;
pub use enum_::*;

mod field;
pub use field::*;

mod graph;
pub use graph::*;

pub mod hash;

mod matching;
pub use matching::*;

mod path;
pub use path::*;

mod registry;
pub use registry::*;

mod types;
pub use types::*;

mod value;
pub use value::*;
