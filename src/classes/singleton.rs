use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, OnceLock, PoisonError};

/// A lazily constructed value that exists at most once.
///
/// Meant for `static` items:
///
/// ```rust
/// use utilp::classes::Singleton;
///
/// static GREETING: Singleton<String> = Singleton::new();
///
/// let first = GREETING.get_or_init(|| "hello".to_string());
/// let second = GREETING.get_or_init(|| "ignored".to_string());
/// assert!(std::ptr::eq(first, second));
/// ```
#[derive(Debug)]
pub struct Singleton<T> {
    cell: OnceLock<T>,
}

impl<T> Singleton<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get_or_init<F: FnOnce() -> T>(&self, init: F) -> &T {
        self.cell.get_or_init(init)
    }

    /// Like [`get_or_init`](Self::get_or_init) but the constructor may fail,
    /// in which case nothing is stored and a later call may try again.
    pub fn get_or_try_init<F, E>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = init()?;
        // If another thread won the race its value is kept and ours dropped.
        Ok(self.cell.get_or_init(|| value))
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for Singleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

type Registry = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static INSTANCES: LazyLock<Mutex<Registry>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Process-wide instance of `T`, constructed by `init` on first request.
///
/// Later calls return the same instance and never run their `init`.
/// `init` runs while the registry lock is held, so it must not request
/// another instance itself.
pub fn instance<T, F>(init: F) -> Arc<T>
where
    T: Any + Send + Sync,
    F: FnOnce() -> T,
{
    let mut registry = INSTANCES.lock().unwrap_or_else(PoisonError::into_inner);
    let entry = registry
        .entry(TypeId::of::<T>())
        .or_insert_with(|| Arc::new(init()) as Arc<dyn Any + Send + Sync>);
    match Arc::clone(entry).downcast::<T>() {
        Ok(instance) => instance,
        Err(_) => unreachable!("instances are keyed by their own TypeId"),
    }
}

/// Whether a process-wide instance of `T` has been constructed
pub fn has_instance<T: Any>() -> bool {
    INSTANCES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<T>())
}
