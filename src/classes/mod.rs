//! Type-level helpers
//!
//! - [`Singleton`] and [`instance`]: at most one instance of a value
//! - [`Hierarchy`]: documentation inheritance along a C3-linearized hierarchy

pub mod hierarchy;
mod singleton;

pub use hierarchy::{Hierarchy, HierarchyError};
pub use singleton::{Singleton, has_instance, instance};
