use crossbeam::channel::{self, Receiver, RecvError, RecvTimeoutError, Sender};
use crossbeam::select;
use rand::Rng;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::ReducerError;
use super::queue::{QueueItem, ResultQueue};

/// Progress is reported once per this many partial results by default
pub const DEFAULT_REPORT_INTERVAL: usize = 500;

/// Upper bound of the randomized sleep between polls of an empty queue
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(1);

type ReduceFn<P, A> = Box<dyn Fn(Option<A>, P) -> anyhow::Result<A> + Send>;
type ProgressFn = Box<dyn Fn(usize) + Send>;

/// How the worker waits for the next item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategy {
    /// Block on the queue, multiplexed with the cancellation channel
    #[default]
    Blocking,
    /// Poll the queue and sleep a uniformly random duration below
    /// `max_backoff` whenever it is empty
    Polling { max_backoff: Duration },
}

impl WaitStrategy {
    pub fn polling() -> Self {
        WaitStrategy::Polling {
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Reporting and waiting options for a reducer worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerConfig {
    /// Report progress every `interval` partial results
    pub verbose: bool,
    /// Reporting cadence, must be positive
    pub interval: usize,
    pub wait: WaitStrategy,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            interval: DEFAULT_REPORT_INTERVAL,
            wait: WaitStrategy::default(),
        }
    }
}

/// Lifecycle of a reducer worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReducerState {
    Created = 0,
    Running = 1,
    /// Sentinel observed and final value published
    Completed = 2,
    /// Stopped through a [`CancelToken`], nothing published
    Cancelled = 3,
    /// Reducer or queue fault, nothing published
    Crashed = 4,
}

impl ReducerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReducerState::Created,
            1 => ReducerState::Running,
            2 => ReducerState::Completed,
            3 => ReducerState::Cancelled,
            _ => ReducerState::Crashed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReducerState::Completed | ReducerState::Cancelled | ReducerState::Crashed
        )
    }
}

impl fmt::Display for ReducerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReducerState::Created => "created",
            ReducerState::Running => "running",
            ReducerState::Completed => "completed",
            ReducerState::Cancelled => "cancelled",
            ReducerState::Crashed => "crashed",
        };
        f.write_str(label)
    }
}

/// Counters shared between the worker thread and its handle.
/// Only the worker writes them.
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    processed: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ReducerState::Created as u8),
            processed: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> ReducerState {
        ReducerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ReducerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }
}

/// Stops a running worker without pushing a sentinel through the queue
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Sender<()>,
}

impl CancelToken {
    pub fn cancel(&self) {
        // A full buffer means a cancellation is already pending.
        let _ = self.tx.try_send(());
    }
}

/// What a worker hands back through [`ReducerHandle::join`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReducerOutcome<A> {
    pub name: String,
    /// Final accumulator, `None` if no partial result was folded
    pub result: Option<A>,
    pub processed: usize,
    pub state: ReducerState,
}

/// A background worker folding partial results pulled from a [`ResultQueue`].
///
/// The reducer receives `None` as accumulator for the first partial result.
/// Partial results are folded in dequeue order; with several producers that
/// order depends on thread interleaving, so the reducer should be associative
/// and commutative. Order-sensitive reducers fed by concurrent producers give
/// interleaving-dependent results.
///
/// ```rust
/// use utilp::reducer::{QueueItem, ResultQueue, ResultReducer};
///
/// let queue = ResultQueue::new();
/// let handle = ResultReducer::new("sum", &queue, |acc: Option<i64>, x: i64| {
///     Ok(acc.map_or(x, |a| a + x))
/// })
/// .start()
/// .unwrap();
///
/// for x in [3, 4, 5] {
///     queue.push_partial(x).unwrap();
/// }
/// queue.finish().unwrap();
///
/// let outcome = handle.join().unwrap();
/// assert_eq!(outcome.result, Some(12));
/// assert_eq!(queue.take_final(), Some(Some(12)));
/// ```
pub struct ResultReducer<P, A> {
    name: String,
    queue: ResultQueue<P, A>,
    reducer: ReduceFn<P, A>,
    config: ReducerConfig,
    progress: Option<ProgressFn>,
}

impl<P, A> ResultReducer<P, A>
where
    P: Send + 'static,
    A: Clone + Send + 'static,
{
    pub fn new<F>(name: impl Into<String>, queue: &ResultQueue<P, A>, reducer: F) -> Self
    where
        F: Fn(Option<A>, P) -> anyhow::Result<A> + Send + 'static,
    {
        Self {
            name: name.into(),
            queue: queue.clone(),
            reducer: Box::new(reducer),
            config: ReducerConfig::default(),
            progress: None,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn interval(mut self, interval: usize) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn wait_strategy(mut self, wait: WaitStrategy) -> Self {
        self.config.wait = wait;
        self
    }

    pub fn with_config(mut self, config: ReducerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default console progress line with a custom sink.
    /// The sink receives the number of partial results folded so far.
    pub fn on_progress<F>(mut self, sink: F) -> Self
    where
        F: Fn(usize) + Send + 'static,
    {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Spawn the worker on its own named thread and return immediately
    pub fn start(self) -> Result<ReducerHandle<A>, ReducerError> {
        if self.config.interval == 0 {
            return Err(ReducerError::InvalidInterval);
        }

        let shared = Arc::new(Shared::new());
        let (cancel_tx, cancel_rx) = channel::bounded(1);
        // Never sent on; the worker drops its end when the thread exits.
        let (exit_tx, exit_rx) = channel::bounded::<()>(0);

        let name = self.name.clone();
        let worker = Worker {
            name: self.name,
            queue: self.queue,
            reducer: self.reducer,
            config: self.config,
            progress: self.progress,
            shared: shared.clone(),
            cancel_rx,
        };

        shared.set_state(ReducerState::Running);
        let thread_shared = shared.clone();
        let thread = thread::Builder::new()
            .name(name.replace('\0', ""))
            .spawn(move || {
                let _exit_guard = exit_tx;
                // Panics outside the reducer (a progress sink, a closed stdout)
                // still have to leave the state at Crashed.
                match panic::catch_unwind(AssertUnwindSafe(|| worker.run())) {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(err)) => {
                        thread_shared.set_state(ReducerState::Crashed);
                        Err(err)
                    }
                    Err(payload) => {
                        thread_shared.set_state(ReducerState::Crashed);
                        panic::resume_unwind(payload)
                    }
                }
            })
            .map_err(|source| ReducerError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(ReducerHandle {
            name,
            thread,
            shared,
            cancel: CancelToken { tx: cancel_tx },
            exited: exit_rx,
        })
    }
}

impl<P, A> fmt::Debug for ResultReducer<P, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultReducer")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("custom_progress", &self.progress.is_some())
            .finish()
    }
}

/// Handle to a started worker
pub struct ReducerHandle<A> {
    name: String,
    thread: JoinHandle<Result<ReducerOutcome<A>, ReducerError>>,
    shared: Arc<Shared>,
    cancel: CancelToken,
    exited: Receiver<()>,
}

impl<A> ReducerHandle<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ReducerState {
        self.shared.state()
    }

    /// Snapshot of the number of partial results folded so far
    pub fn processed_count(&self) -> usize {
        self.shared.processed()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait up to `timeout` for the worker thread to exit, whatever the reason.
    /// Returns `false` if it is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.exited.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// Block until the worker exits and return its outcome
    pub fn join(self) -> Result<ReducerOutcome<A>, ReducerError> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(ReducerError::Panicked {
                name: self.name,
                processed: self.shared.processed(),
            }),
        }
    }
}

impl<A> fmt::Debug for ReducerHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("processed", &self.processed_count())
            .finish()
    }
}

enum Wake<T> {
    Item(Result<T, RecvError>),
    Cancel(Result<(), RecvError>),
}

struct Worker<P, A> {
    name: String,
    queue: ResultQueue<P, A>,
    reducer: ReduceFn<P, A>,
    config: ReducerConfig,
    progress: Option<ProgressFn>,
    shared: Arc<Shared>,
    cancel_rx: Receiver<()>,
}

impl<P, A> Worker<P, A>
where
    A: Clone,
{
    fn run(mut self) -> Result<ReducerOutcome<A>, ReducerError> {
        debug!(reducer = %self.name, wait = ?self.config.wait, "reducer started");
        let mut acc: Option<A> = None;

        loop {
            let Some(item) = self.next_item()? else {
                debug!(reducer = %self.name, processed = self.shared.processed(), "reducer cancelled");
                self.shared.set_state(ReducerState::Cancelled);
                return Ok(self.outcome(acc, ReducerState::Cancelled));
            };

            match item {
                QueueItem::Done => {
                    // Settled before publishing, so whoever takes the final
                    // value already sees Completed.
                    self.shared.set_state(ReducerState::Completed);
                    self.queue
                        .push(QueueItem::Final(acc.clone()))
                        .map_err(|_| self.disconnected())?;
                    debug!(reducer = %self.name, processed = self.shared.processed(), "reducer completed");
                    return Ok(self.outcome(acc, ReducerState::Completed));
                }
                QueueItem::Partial(partial) => {
                    acc = Some(self.fold(acc, partial)?);
                    let processed = self.shared.processed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.report(processed);
                }
                QueueItem::Final(value) => {
                    warn!(reducer = %self.name, "completion value found on the input queue");
                    // Put it back so its owner can still collect it.
                    let _ = self.queue.push(QueueItem::Final(value));
                    return Err(ReducerError::UnexpectedFinal {
                        name: self.name.clone(),
                    });
                }
            }
        }
    }

    fn fold(&self, acc: Option<A>, partial: P) -> Result<A, ReducerError> {
        let processed = self.shared.processed();
        match panic::catch_unwind(AssertUnwindSafe(|| (self.reducer)(acc, partial))) {
            Ok(Ok(next)) => Ok(next),
            Ok(Err(source)) => {
                error!(reducer = %self.name, processed, "reducer failed: {source:#}");
                Err(ReducerError::Fault {
                    name: self.name.clone(),
                    processed,
                    source: source.into(),
                })
            }
            Err(_) => {
                error!(reducer = %self.name, processed, "reducer panicked");
                Err(ReducerError::Panicked {
                    name: self.name.clone(),
                    processed,
                })
            }
        }
    }

    fn report(&self, processed: usize) {
        if !self.config.verbose || !processed.is_multiple_of(self.config.interval) {
            return;
        }
        info!(reducer = %self.name, processed, "partial results reduced");
        match &self.progress {
            Some(sink) => sink(processed),
            None => println!("{processed} partial results reduced."),
        }
    }

    /// `Ok(None)` means the worker was cancelled
    fn next_item(&mut self) -> Result<Option<QueueItem<P, A>>, ReducerError> {
        match self.config.wait {
            WaitStrategy::Blocking => self.wait_blocking(),
            WaitStrategy::Polling { max_backoff } => Ok(self.wait_polling(max_backoff)),
        }
    }

    fn wait_blocking(&mut self) -> Result<Option<QueueItem<P, A>>, ReducerError> {
        loop {
            let wake = {
                let items = self.queue.receiver();
                let cancel = &self.cancel_rx;
                select! {
                    recv(items) -> item => Wake::Item(item),
                    recv(cancel) -> signal => Wake::Cancel(signal),
                }
            };

            match wake {
                Wake::Item(Ok(item)) => return Ok(Some(item)),
                Wake::Item(Err(_)) => return Err(self.disconnected()),
                Wake::Cancel(Ok(())) => return Ok(None),
                // Every token is gone, nobody can cancel any more.
                Wake::Cancel(Err(_)) => self.cancel_rx = channel::never(),
            }
        }
    }

    fn wait_polling(&mut self, max_backoff: Duration) -> Option<QueueItem<P, A>> {
        loop {
            if self.cancel_rx.try_recv().is_ok() {
                return None;
            }
            if let Some(item) = self.queue.try_pop() {
                return Some(item);
            }
            // Sleep, but wake up early on cancellation.
            match self.cancel_rx.recv_timeout(random_backoff(max_backoff)) {
                Ok(()) => return None,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.cancel_rx = channel::never(),
            }
        }
    }

    fn outcome(&self, result: Option<A>, state: ReducerState) -> ReducerOutcome<A> {
        ReducerOutcome {
            name: self.name.clone(),
            result,
            processed: self.shared.processed(),
            state,
        }
    }

    fn disconnected(&self) -> ReducerError {
        ReducerError::QueueDisconnected {
            name: self.name.clone(),
        }
    }
}

fn random_backoff(max_backoff: Duration) -> Duration {
    let max_nanos = u64::try_from(max_backoff.as_nanos()).unwrap_or(u64::MAX);
    if max_nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::rng().random_range(0..max_nanos))
}
