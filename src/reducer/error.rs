//! Error types for the background reducer.

use thiserror::Error;

/// Errors raised while configuring, running or joining a [`ResultReducer`].
///
/// [`ResultReducer`]: super::ResultReducer
#[derive(Error, Debug)]
pub enum ReducerError {
    #[error("report interval must be a positive integer")]
    InvalidInterval,

    #[error("failed to spawn reducer thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reducer '{name}' failed after {processed} partial results: {source}")]
    Fault {
        name: String,
        processed: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("reducer '{name}' panicked after {processed} partial results")]
    Panicked { name: String, processed: usize },

    #[error("queue of reducer '{name}' is disconnected")]
    QueueDisconnected { name: String },

    #[error("reducer '{name}' received a completion value it did not produce")]
    UnexpectedFinal { name: String },
}

/// Errors raised by [`ResultQueue`] operations.
///
/// [`ResultQueue`]: super::ResultQueue
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("timed out waiting on the result queue")]
    Timeout,

    #[error("result queue is disconnected")]
    Disconnected,
}
