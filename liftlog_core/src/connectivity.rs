//! Network reachability as a single boolean signal.
//!
//! This is a passive mirror of what the platform reports; it never probes.
//! Until the first report arrives the device is assumed to be online.

use crate::signal::{Signal, Subscription};

/// Connectivity change reported by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

#[derive(Clone)]
pub struct ConnectivityObserver {
    online: Signal<bool>,
}

impl Default for ConnectivityObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityObserver {
    /// Observer with no platform reading yet (assumes online)
    pub fn new() -> Self {
        Self::with_initial(None)
    }

    /// Observer seeded with the platform's current reading, if it has one
    pub fn with_initial(online: Option<bool>) -> Self {
        Self {
            online: Signal::new(online.unwrap_or(true)),
        }
    }

    /// Feed a platform event
    pub fn handle(&self, event: ConnectivityEvent) {
        let online = event == ConnectivityEvent::Online;
        if self.online.set(online) {
            tracing::info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.get()
    }

    /// Listen for transitions; the callback receives the new state
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.online.subscribe(move |online| callback(*online))
    }

    pub fn subscriber_count(&self) -> usize {
        self.online.subscriber_count()
    }
}
