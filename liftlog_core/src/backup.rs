//! Backup export/import.
//!
//! A `BackupDocument` is a complete, versioned snapshot of the store.
//! Import is a merge by id: records whose id already exists are skipped and
//! counted, never overwritten, so importing the same document twice is a
//! no-op. Validation of the whole document happens before any write; the
//! accepted records are then committed as a single journal entry.

use crate::error::ValidationErrors;
use crate::journal::JournalEntry;
use crate::store::{Store, StoreEvent};
use crate::validate::{validate_cardio, validate_exercise, validate_saved_workout};
use crate::{CardioSession, Error, Exercise, Result, WeightWorkout};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Schema version written by this codec
pub const SCHEMA_VERSION: u32 = 1;

/// Oldest schema version this codec still reads
pub const MIN_SUPPORTED_SCHEMA: u32 = 1;

/// Portable snapshot of the whole store
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub exercises: Vec<Exercise>,
    pub workouts: Vec<WeightWorkout>,
    pub cardio_sessions: Vec<CardioSession>,
}

/// Outcome of an import
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub exercises_added: usize,
    pub workouts_added: usize,
    pub cardio_added: usize,
    /// Records whose id was already present
    pub skipped: usize,
}

impl ImportReport {
    pub fn total_added(&self) -> usize {
        self.exercises_added + self.workouts_added + self.cardio_added
    }
}

/// Reject versions outside `MIN_SUPPORTED_SCHEMA..=SCHEMA_VERSION`
pub fn check_schema_version(found: i64) -> Result<()> {
    if found < i64::from(MIN_SUPPORTED_SCHEMA) || found > i64::from(SCHEMA_VERSION) {
        return Err(Error::UnsupportedSchema {
            found,
            min: MIN_SUPPORTED_SCHEMA,
            max: SCHEMA_VERSION,
        });
    }
    Ok(())
}

impl BackupDocument {
    /// Total number of records in the document
    pub fn record_count(&self) -> usize {
        self.exercises.len() + self.workouts.len() + self.cardio_sessions.len()
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a backup from JSON text
    ///
    /// The schema version is checked before the body is decoded, so a
    /// document from an unknown version is rejected without any attempt to
    /// interpret its records.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let field = value.get("schemaVersion");
        let version = match field.and_then(serde_json::Value::as_i64) {
            Some(version) => version,
            // Integers beyond i64 are still versions, just unknown ones
            None if field.is_some_and(serde_json::Value::is_u64) => i64::MAX,
            None => {
                let mut errors = ValidationErrors::new();
                errors.push("schemaVersion", "missing or not an integer");
                return Err(errors.into());
            }
        };
        check_schema_version(version)?;

        Ok(serde_json::from_value(value)?)
    }

    /// Atomically write the backup to `path`
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(self.to_json()?.as_bytes())?;
        temp.flush()?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::StorageUnavailable(e.error))?;

        tracing::info!("Wrote backup with {} records to {:?}", self.record_count(), path);
        Ok(())
    }

    /// Read and parse a backup file
    pub fn read_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

impl Store {
    /// Snapshot the whole store
    pub fn export(&self) -> BackupDocument {
        let doc = BackupDocument {
            schema_version: SCHEMA_VERSION,
            exported_at: self.now(),
            exercises: self.exercises.clone(),
            workouts: self.workouts().cloned().collect(),
            cardio_sessions: self.cardio_sessions().cloned().collect(),
        };
        tracing::info!("Exported {} records", doc.record_count());
        doc
    }

    /// Merge a backup into the store
    ///
    /// Fails without touching the store when the schema is unsupported or
    /// any record is invalid.
    ///
    /// New workouts are appended before new cardio sessions, each in
    /// document order. The document keeps no order across the two lists, so
    /// a workout and a cardio session with the same `completedAt` may swap
    /// places in `query_recent_activity` after a round trip.
    pub fn import(&mut self, doc: &BackupDocument) -> Result<ImportReport> {
        check_schema_version(i64::from(doc.schema_version))?;
        self.validate_import(doc)?;

        let mut report = ImportReport::default();

        let exercises: Vec<Exercise> = doc
            .exercises
            .iter()
            .filter(|e| self.exercise(&e.id).is_none())
            .cloned()
            .collect();
        let workouts: Vec<WeightWorkout> = doc
            .workouts
            .iter()
            .filter(|w| self.workout(&w.id).is_none())
            .cloned()
            .collect();
        let cardio_sessions: Vec<CardioSession> = doc
            .cardio_sessions
            .iter()
            .filter(|c| self.cardio_session(&c.id).is_none())
            .cloned()
            .collect();

        report.exercises_added = exercises.len();
        report.workouts_added = workouts.len();
        report.cardio_added = cardio_sessions.len();
        report.skipped = doc.record_count() - report.total_added();

        if report.total_added() > 0 {
            self.commit(JournalEntry::Imported {
                exercises,
                workouts,
                cardio_sessions,
            })?;
            self.emit(StoreEvent::Imported(report));
        }

        tracing::info!(
            "Imported backup: {} exercises, {} workouts, {} cardio added, {} skipped",
            report.exercises_added,
            report.workouts_added,
            report.cardio_added,
            report.skipped
        );
        Ok(report)
    }

    fn validate_import(&self, doc: &BackupDocument) -> Result<()> {
        let mut errors = ValidationErrors::new();

        duplicate_ids("exercises", doc.exercises.iter().map(|e| &e.id), &mut errors);
        duplicate_ids("workouts", doc.workouts.iter().map(|w| &w.id), &mut errors);
        duplicate_ids(
            "cardioSessions",
            doc.cardio_sessions.iter().map(|c| &c.id),
            &mut errors,
        );

        for (i, exercise) in doc.exercises.iter().enumerate() {
            errors.extend_prefixed(&format!("exercises[{}]", i), validate_exercise(exercise));
        }

        // Sets may reference exercises already stored or shipped in the document
        let shipped: HashSet<Uuid> = doc.exercises.iter().map(|e| e.id).collect();
        let exercise_exists = |id: &Uuid| shipped.contains(id) || self.exercise(id).is_some();

        for (i, workout) in doc.workouts.iter().enumerate() {
            errors.extend_prefixed(
                &format!("workouts[{}]", i),
                validate_saved_workout(workout, exercise_exists),
            );
        }

        for (i, session) in doc.cardio_sessions.iter().enumerate() {
            errors.extend_prefixed(&format!("cardioSessions[{}]", i), validate_cardio(session));
        }

        if !errors.is_empty() {
            tracing::warn!("Rejected backup with {} violations", errors.len());
        }
        errors.into_result()
    }
}

fn duplicate_ids<'a, I>(collection: &str, ids: I, errors: &mut ValidationErrors)
where
    I: IntoIterator<Item = &'a Uuid>,
{
    let mut seen = HashSet::new();
    for (i, id) in ids.into_iter().enumerate() {
        if !seen.insert(*id) {
            errors.push(format!("{}[{}].id", collection, i), format!("duplicate id {}", id));
        }
    }
}
