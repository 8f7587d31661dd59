//! Install-prompt lifecycle.
//!
//! Decides when to offer "install this app". The prompt is shown only when
//! all four hold:
//! - the platform has offered a deferred install capability
//! - the user has not dismissed the prompt
//! - the user has completed at least one workout
//! - the app is not already running standalone
//!
//! `dismissed` and `firstWorkoutCompleted` persist as flag keys whose
//! presence means true. The deferred capability is transient and can be
//! consumed only once.

use crate::signal::{Listeners, Subscription};
use crate::storage::Storage;
use crate::store::{Store, StoreEvent};
use crate::Result;
use std::sync::{Arc, Mutex, MutexGuard};

pub const INSTALL_PROMPT_DISMISSED_KEY: &str = "INSTALL_PROMPT_DISMISSED";
pub const FIRST_WORKOUT_COMPLETED_KEY: &str = "FIRST_WORKOUT_COMPLETED";

/// What the user chose in the native install dialog
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    Accepted,
    Declined,
}

/// One-shot platform handle that shows the native install dialog
pub trait DeferredPrompt: Send {
    fn prompt(self: Box<Self>) -> PromptOutcome;
}

/// Read-only facts about how the app is running
pub trait InstallPlatform: Send + Sync {
    fn is_standalone(&self) -> bool;
}

/// A platform whose standalone state never changes
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticPlatform {
    pub standalone: bool,
}

impl InstallPlatform for StaticPlatform {
    fn is_standalone(&self) -> bool {
        self.standalone
    }
}

/// Derived lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallPhase {
    /// No capability, already installed, or running standalone
    Ineligible,
    /// Capability present, waiting for the first completed workout
    EligibleUnprompted,
    /// Capability present but the user dismissed the prompt
    EligibleDismissed,
    /// The prompt should be visible
    Shown,
}

/// Point-in-time view of the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstallSnapshot {
    pub dismissed: bool,
    pub first_workout_completed: bool,
    pub can_install: bool,
    pub is_standalone: bool,
    pub installed: bool,
}

impl InstallSnapshot {
    pub fn should_show_prompt(&self) -> bool {
        self.can_install && !self.dismissed && self.first_workout_completed && !self.is_standalone
    }

    pub fn phase(&self) -> InstallPhase {
        if !self.can_install || self.is_standalone || self.installed {
            InstallPhase::Ineligible
        } else if self.dismissed {
            InstallPhase::EligibleDismissed
        } else if self.first_workout_completed {
            InstallPhase::Shown
        } else {
            InstallPhase::EligibleUnprompted
        }
    }
}

/// Result of `prompt_install`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallPromptResult {
    Accepted,
    Declined,
    /// No live capability; the platform already consumed or never offered it
    Unavailable,
}

struct Inner {
    storage: Box<dyn Storage>,
    platform: Box<dyn InstallPlatform>,
    deferred: Option<Box<dyn DeferredPrompt>>,
    dismissed: bool,
    first_workout_completed: bool,
    installed: bool,
}

impl Inner {
    fn snapshot(&self) -> InstallSnapshot {
        InstallSnapshot {
            dismissed: self.dismissed,
            first_workout_completed: self.first_workout_completed,
            can_install: self.deferred.is_some(),
            is_standalone: self.platform.is_standalone(),
            installed: self.installed,
        }
    }
}

/// Install-lifecycle controller; clones share state
#[derive(Clone)]
pub struct InstallController {
    inner: Arc<Mutex<Inner>>,
    changes: Listeners<InstallSnapshot>,
}

impl InstallController {
    /// Create a controller, reading persisted flags from `storage`
    pub fn new(
        storage: impl Storage + 'static,
        platform: impl InstallPlatform + 'static,
    ) -> Result<Self> {
        let dismissed = storage.contains(INSTALL_PROMPT_DISMISSED_KEY)?;
        let first_workout_completed = storage.contains(FIRST_WORKOUT_COMPLETED_KEY)?;

        tracing::debug!(
            "Install flags: dismissed={}, first_workout_completed={}",
            dismissed,
            first_workout_completed
        );

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                storage: Box::new(storage),
                platform: Box::new(platform),
                deferred: None,
                dismissed,
                first_workout_completed,
                installed: false,
            })),
            changes: Listeners::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` under the lock and notify listeners if the snapshot changed
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let (result, before, after) = {
            let mut inner = self.lock();
            let before = inner.snapshot();
            let result = f(&mut inner);
            let after = inner.snapshot();
            (result, before, after)
        };
        if before != after {
            self.changes.emit(&after);
        }
        result
    }

    pub fn snapshot(&self) -> InstallSnapshot {
        self.lock().snapshot()
    }

    pub fn should_show_prompt(&self) -> bool {
        self.snapshot().should_show_prompt()
    }

    pub fn phase(&self) -> InstallPhase {
        self.snapshot().phase()
    }

    /// Listen for state changes
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&InstallSnapshot) + Send + Sync + 'static,
    {
        self.changes.subscribe(callback)
    }

    /// The platform offered a deferred install capability
    ///
    /// Ignored when the prompt was dismissed or the app is already installed.
    pub fn capability_offered(&self, prompt: Box<dyn DeferredPrompt>) {
        self.update(|inner| {
            if inner.dismissed || inner.installed || inner.platform.is_standalone() {
                tracing::debug!("Ignoring install capability (dismissed or installed)");
                return;
            }
            tracing::info!("Install capability available");
            inner.deferred = Some(prompt);
        });
    }

    /// The platform reports the app was installed by any route
    pub fn app_installed(&self) {
        self.update(|inner| {
            inner.deferred = None;
            inner.installed = true;
        });
        tracing::info!("App installed");
    }

    /// Record the first completed workout; repeat calls are no-ops
    pub fn mark_first_workout_complete(&self) -> Result<()> {
        self.update(|inner| -> Result<()> {
            if inner.first_workout_completed {
                return Ok(());
            }
            inner.storage.write(FIRST_WORKOUT_COMPLETED_KEY, "true")?;
            inner.first_workout_completed = true;
            tracing::info!("First workout completed");
            Ok(())
        })
    }

    /// Hide the prompt for good
    pub fn dismiss_prompt(&self) -> Result<()> {
        self.update(|inner| -> Result<()> {
            if inner.dismissed {
                return Ok(());
            }
            inner.storage.write(INSTALL_PROMPT_DISMISSED_KEY, "true")?;
            inner.dismissed = true;
            tracing::info!("Install prompt dismissed");
            Ok(())
        })
    }

    /// Developer reset: clear both persisted flags
    pub fn reset(&self) -> Result<()> {
        self.update(|inner| -> Result<()> {
            inner.storage.remove(INSTALL_PROMPT_DISMISSED_KEY)?;
            inner.dismissed = false;
            inner.storage.remove(FIRST_WORKOUT_COMPLETED_KEY)?;
            inner.first_workout_completed = false;
            tracing::info!("Install flags reset");
            Ok(())
        })
    }

    /// Show the native install dialog through the deferred capability
    ///
    /// A missing capability is an expected race, reported as `Unavailable`.
    pub fn prompt_install(&self) -> InstallPromptResult {
        let deferred = self.update(|inner| inner.deferred.take());
        let Some(deferred) = deferred else {
            tracing::debug!("Install prompt requested with no capability");
            return InstallPromptResult::Unavailable;
        };

        // The dialog runs without holding the lock
        match deferred.prompt() {
            PromptOutcome::Accepted => {
                self.update(|inner| inner.installed = true);
                tracing::info!("Install accepted");
                InstallPromptResult::Accepted
            }
            PromptOutcome::Declined => {
                tracing::info!("Install declined");
                InstallPromptResult::Declined
            }
        }
    }

    /// Mark the first workout complete when `store` saves a workout
    pub fn observe_store(&self, store: &Store) -> Subscription {
        let controller = self.clone();
        store.subscribe(move |event| {
            if let StoreEvent::WorkoutSaved { .. } = event {
                if let Err(e) = controller.mark_first_workout_complete() {
                    tracing::warn!("Failed to record first workout: {}", e);
                }
            }
        })
    }
}

impl std::fmt::Debug for InstallController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InstallController").field(&self.snapshot()).finish()
    }
}
