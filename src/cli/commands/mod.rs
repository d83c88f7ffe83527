//! Command implementations for the utilp CLI
//!
//! Each command is organized into its own module.

pub mod config;
pub mod path;
pub mod reduce;
pub mod replace;
pub mod version;
