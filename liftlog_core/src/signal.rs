//! Push-based notifications with explicit teardown.
//!
//! `Listeners<E>` is a plain event fan-out; `Signal<T>` adds a current value
//! that can be read synchronously. Both hand out a `Subscription` guard that
//! deregisters the listener when dropped.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<E>)>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A listener that panicked must not take the whole registry down with it
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Guard returned by `subscribe`; dropping it removes the listener
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Explicitly remove the listener
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A set of listeners for events of type `E`
pub struct Listeners<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }
}

impl<E> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: 'static> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    lock(&registry).callbacks.retain(|(cid, _)| *cid != id);
                }
            })),
        }
    }

    /// Deliver an event to every current listener
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or
    /// unsubscribe without deadlocking.
    pub fn emit(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value with change notification
pub struct Signal<T> {
    value: Arc<Mutex<T>>,
    listeners: Listeners<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            listeners: self.listeners.clone(),
        }
    }
}

impl<T: Clone + PartialEq + Send + 'static> Signal<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
            listeners: Listeners::new(),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        lock(&self.value).clone()
    }

    /// Replace the value; listeners fire only when it actually changed
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = lock(&self.value);
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.listeners.emit(&value);
        true
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}
