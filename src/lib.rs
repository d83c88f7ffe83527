//! # utilp - small utilities around a background result reducer
//!
//! The centerpiece is [`reducer::ResultReducer`], a worker thread that folds
//! partial results pulled from a shared queue into one value and publishes it
//! back on the same queue when told to finish. Around it sit a handful of
//! general helpers.
//!
//! ## Modules
//!
//! - [`reducer`]: the background reducer, its queue and its handle
//! - [`collections`]: [`Bunch`](collections::Bunch) dot-access maps and
//!   [`StringEnum`](collections::StringEnum)
//! - [`classes`]: process-wide singletons and a C3 type hierarchy with
//!   documentation inheritance
//! - [`logging`]: `tracing` setup and the console/file
//!   [`PrintLogger`](logging::PrintLogger)
//! - [`utils`]: path validity checks and single-pass string replacement
//! - [`config`]: layered figment configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use utilp::reducer::{ReducerConfig, reduce_all};
//!
//! let outcome = reduce_all(
//!     "sum",
//!     [3, 4, 5],
//!     |acc: Option<i32>, x: i32| Ok(acc.unwrap_or(0) + x),
//!     ReducerConfig::default(),
//! )
//! .unwrap();
//! assert_eq!(outcome.result, Some(12));
//! ```

pub mod classes;
pub mod cli;
pub mod collections;
pub mod config;
pub mod logging;
pub mod reducer;
pub mod utils;

pub use cli::{Cli, Output};
pub use config::UtilpConfig;

/// Result type alias for utilp operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
