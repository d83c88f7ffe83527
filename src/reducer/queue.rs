use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::fmt;
use std::time::{Duration, Instant};

use super::error::QueueError;

/// An item travelling through a [`ResultQueue`].
///
/// Control signals are separate variants, so no partial result can ever be
/// mistaken for the end-of-stream marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem<P, A> {
    /// One unit of work's output, to be folded into the aggregate
    Partial(P),
    /// Sentinel: no more partial results will arrive
    Done,
    /// Completion signal published by the reducer; `None` when nothing was folded
    Final(Option<A>),
}

impl<P, A> QueueItem<P, A> {
    pub fn is_final(&self) -> bool {
        matches!(self, QueueItem::Final(_))
    }
}

/// Thread-safe FIFO shared between producers, a reducer worker and the
/// downstream consumer.
///
/// Cloning is cheap and every clone refers to the same queue.
pub struct ResultQueue<P, A> {
    tx: Sender<QueueItem<P, A>>,
    rx: Receiver<QueueItem<P, A>>,
    /// One token per `Final` pushed, so consumers can wait for completion
    /// without taking items off the main queue
    published_tx: Sender<()>,
    published_rx: Receiver<()>,
}

impl<P, A> ResultQueue<P, A> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        let (published_tx, published_rx) = unbounded();
        Self {
            tx,
            rx,
            published_tx,
            published_rx,
        }
    }

    /// Push any item onto the back of the queue
    pub fn push(&self, item: QueueItem<P, A>) -> Result<(), QueueError> {
        let is_final = item.is_final();
        self.tx.send(item).map_err(|_| QueueError::Disconnected)?;
        if is_final {
            let _ = self.published_tx.send(());
        }
        Ok(())
    }

    /// Push a genuine partial result
    pub fn push_partial(&self, partial: P) -> Result<(), QueueError> {
        self.push(QueueItem::Partial(partial))
    }

    /// Push the end-of-stream sentinel
    pub fn finish(&self) -> Result<(), QueueError> {
        self.push(QueueItem::Done)
    }

    /// Pop the next item without blocking
    pub fn try_pop(&self) -> Option<QueueItem<P, A>> {
        self.rx.try_recv().ok()
    }

    /// Block until an item is available.
    ///
    /// Popping competes with a running worker: a concurrent `pop` may take a
    /// partial result the worker never folds. Use
    /// [`wait_final`](Self::wait_final) to wait for the outcome instead.
    pub fn pop(&self) -> Result<QueueItem<P, A>, QueueError> {
        self.rx.recv().map_err(|_| QueueError::Disconnected)
    }

    /// Block for at most `timeout` waiting for an item.
    ///
    /// Competes with a running worker in the same way as [`pop`](Self::pop).
    pub fn pop_timeout(&self, timeout: Duration) -> Result<QueueItem<P, A>, QueueError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => QueueError::Timeout,
            RecvTimeoutError::Disconnected => QueueError::Disconnected,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Remove and return the first completion value in the queue.
    ///
    /// Every other item is put back in its original order. Call this once the
    /// worker that owns the queue has exited, otherwise it competes with the
    /// worker for partial results.
    pub fn take_final(&self) -> Option<Option<A>> {
        let mut found = None;
        let mut rest = Vec::new();
        while let Some(item) = self.try_pop() {
            match item {
                QueueItem::Final(value) if found.is_none() => found = Some(value),
                other => rest.push(other),
            }
        }
        for item in rest {
            // We hold a receiver, so the channel cannot be disconnected here.
            let _ = self.push(item);
        }
        found
    }

    /// Block until a completion value is published and take it.
    ///
    /// Unlike [`pop`](Self::pop) this never takes a partial result or a
    /// sentinel off the queue while waiting, so it is safe to call while the
    /// worker is still running. A crashed or cancelled worker publishes
    /// nothing, in which case this returns [`QueueError::Timeout`].
    pub fn wait_final(&self, timeout: Duration) -> Result<Option<A>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.published_rx.recv_timeout(remaining) {
                Ok(()) => {
                    // Another consumer may have taken it first.
                    if let Some(value) = self.take_final() {
                        return Ok(value);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(QueueError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(QueueError::Disconnected),
            }
        }
    }

    pub(crate) fn receiver(&self) -> &Receiver<QueueItem<P, A>> {
        &self.rx
    }
}

impl<P, A> Clone for ResultQueue<P, A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            published_tx: self.published_tx.clone(),
            published_rx: self.published_rx.clone(),
        }
    }
}

impl<P, A> Default for ResultQueue<P, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, A> fmt::Debug for ResultQueue<P, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultQueue").field("len", &self.len()).finish()
    }
}
