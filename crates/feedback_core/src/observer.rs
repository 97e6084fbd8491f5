//! crates/feedback_core/src/observer.rs
//!
//! A typed push channel: holds the current value of some piece of state and
//! delivers every change, in order, to a registry of callbacks.
//!
//! Both the session manager (publishing `SessionState`) and identity service
//! adapters (publishing `Option<Identity>`) are built on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A registered callback. Listeners must not publish into the channel that
/// is currently calling them.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ChannelInner<T> {
    current: Mutex<T>,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    /// Held for the whole of a delivery so pushes never interleave.
    delivery: Mutex<()>,
    next_id: AtomicU64,
}

/// Current value plus its ordered subscribers.
pub struct StateChannel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T> StateChannel<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                current: Mutex::new(initial),
                listeners: Mutex::new(Vec::new()),
                delivery: Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        lock(&self.inner.current).clone()
    }

    /// Registers `listener`, calls it with the current value right away, and
    /// keeps calling it on every later change until the returned handle is
    /// released.
    pub fn subscribe(&self, listener: Listener<T>) -> Subscription {
        let _delivery = lock(&self.inner.delivery);
        let current = self.get();
        listener(&current);

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, listener));

        let weak: Weak<ChannelInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.listeners).retain(|(other, _)| *other != id);
            }
        })
    }

    /// Replaces the value and pushes it to every listener. Returns `false`
    /// (and pushes nothing) when the value did not change.
    pub fn publish(&self, value: T) -> bool {
        let _delivery = lock(&self.inner.delivery);
        {
            let mut current = lock(&self.inner.current);
            if *current == value {
                return false;
            }
            *current = value.clone();
        }

        let listeners: Vec<Listener<T>> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&value);
        }
        true
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }
}

/// Handle returned by `subscribe`. Releasing it (explicitly or by dropping
/// it) stops further deliveries to the listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A handle with nothing to release.
    pub fn detached() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
