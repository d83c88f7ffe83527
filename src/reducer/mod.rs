//! Background reduction of partial results
//!
//! A [`ResultReducer`] runs on its own thread and drains a shared
//! [`ResultQueue`]. Every [`QueueItem::Partial`] is folded into a running
//! accumulator with a caller-supplied reducer. When the worker takes the
//! [`QueueItem::Done`] sentinel off the queue it pushes
//! [`QueueItem::Final`] with the accumulated value back onto the same queue
//! and exits.
//!
//! ```text
//!  producers ──Partial──▶ ┌─────────────┐ ──▶ ResultReducer thread
//!  producer  ──Done─────▶ │ ResultQueue │         │
//!  consumer  ◀──Final──── └─────────────┘ ◀───────┘
//! ```
//!
//! # Termination
//!
//! - Sentinel: state becomes [`ReducerState::Completed`] and the final value
//!   is published. A second sentinel is left untouched in the queue.
//! - [`CancelToken::cancel`]: state becomes [`ReducerState::Cancelled`],
//!   nothing is published.
//! - Reducer error or panic: state becomes [`ReducerState::Crashed`], nothing
//!   is published and [`ReducerHandle::join`] returns the fault. A consumer
//!   waiting on the queue must apply a timeout to notice this.
//!
//! # Waiting
//!
//! The default [`WaitStrategy::Blocking`] blocks on the queue and the
//! cancellation channel at once. [`WaitStrategy::Polling`] checks the queue
//! without blocking and sleeps a random sub-`max_backoff` interval when it
//! is empty. Both strategies fold the same items in the same order.

mod error;
mod queue;
mod worker;

pub use error::{QueueError, ReducerError};
pub use queue::{QueueItem, ResultQueue};
pub use worker::{
    CancelToken, DEFAULT_MAX_BACKOFF, DEFAULT_REPORT_INTERVAL, ReducerConfig, ReducerHandle,
    ReducerOutcome, ReducerState, ResultReducer, WaitStrategy,
};

/// Fold `partials` on a background reducer and wait for the outcome.
///
/// Convenience wrapper that creates the queue, starts the worker, pushes every
/// partial result followed by the sentinel and joins.
pub fn reduce_all<P, A, I, F>(
    name: &str,
    partials: I,
    reducer: F,
    config: ReducerConfig,
) -> Result<ReducerOutcome<A>, ReducerError>
where
    P: Send + 'static,
    A: Clone + Send + 'static,
    I: IntoIterator<Item = P>,
    F: Fn(Option<A>, P) -> anyhow::Result<A> + Send + 'static,
{
    let queue = ResultQueue::new();
    let handle = ResultReducer::new(name, &queue, reducer)
        .with_config(config)
        .start()?;

    let disconnected = || ReducerError::QueueDisconnected {
        name: name.to_string(),
    };
    for partial in partials {
        queue.push_partial(partial).map_err(|_| disconnected())?;
    }
    queue.finish().map_err(|_| disconnected())?;

    handle.join()
}
