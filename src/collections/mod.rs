//! Small container helpers
//!
//! - [`Bunch`]: a string-keyed map with dotted-path access
//! - [`StringEnum`]: ordered enum-like values built from a list of names

mod bunch;
mod string_enum;

pub use bunch::{Bunch, BunchError};
pub use string_enum::{StringEnum, StringEnumError};
