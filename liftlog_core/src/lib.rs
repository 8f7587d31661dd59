#![forbid(unsafe_code)]

//! Core domain model and persistence for the liftlog fitness tracker.
//!
//! This crate provides:
//! - Domain types (exercises, weight workouts, cardio sessions)
//! - Validation with field-level violations
//! - Local persistence (snapshot + journal, key-value flags)
//! - Versioned JSON backup export/import
//! - Seedable mock data generation
//! - Connectivity and install-prompt state

pub mod types;
pub mod error;
pub mod validate;
pub mod clock;
pub mod signal;
pub mod storage;
pub mod journal;
pub mod catalog;
pub mod store;
pub mod backup;
pub mod generator;
pub mod connectivity;
pub mod install;
pub mod report;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, FieldViolation, RecordKind, Result, ValidationErrors};
pub use types::*;
pub use clock::{Clock, FixedClock, SystemClock};
pub use signal::Subscription;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{Store, StoreEvent};
pub use catalog::default_exercises;
pub use backup::{BackupDocument, ImportReport, MIN_SUPPORTED_SCHEMA, SCHEMA_VERSION};
pub use generator::{generate, GenerationSummary, GeneratorConfig};
pub use connectivity::{ConnectivityEvent, ConnectivityObserver};
pub use install::{
    DeferredPrompt, InstallController, InstallPhase, InstallPlatform, InstallPromptResult,
    InstallSnapshot, PromptOutcome, StaticPlatform,
};
pub use report::{write_activity_csv, write_activity_csv_file};
pub use config::Config;
