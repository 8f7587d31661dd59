//! Write-ahead journal for store mutations.
//!
//! Each successful mutation is appended as one JSON line. Opening the store
//! replays the snapshot and then the journal; `Store::compact` folds the
//! journal back into the snapshot.

use crate::storage::Storage;
use crate::{Activity, CardioSession, Exercise, Result, WeightWorkout};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage key of the journal
pub const JOURNAL_KEY: &str = "store.wal";

/// Storage key of the compacted snapshot
pub const SNAPSHOT_KEY: &str = "store.json";

/// One journaled mutation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    ExerciseAdded {
        exercise: Exercise,
    },
    WorkoutSaved {
        workout: WeightWorkout,
    },
    WorkoutDeleted {
        id: Uuid,
    },
    CardioSaved {
        session: CardioSession,
    },
    CardioDeleted {
        id: Uuid,
    },
    /// A whole backup import, committed as a single line
    Imported {
        exercises: Vec<Exercise>,
        workouts: Vec<WeightWorkout>,
        cardio_sessions: Vec<CardioSession>,
    },
}

/// Compacted store contents
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub exercises: Vec<Exercise>,
    /// Saved workouts and cardio sessions in insertion order
    pub activity: Vec<Activity>,
}

/// Append one entry to the journal; durable once this returns
pub fn append(storage: &mut dyn Storage, entry: &JournalEntry) -> Result<()> {
    let line = serde_json::to_string(entry)?;
    storage.append_line(JOURNAL_KEY, &line)
}

/// Read all journal entries
///
/// Undecodable lines (e.g. a write torn by a crash) are skipped with a
/// warning rather than failing the whole load.
pub fn read_entries(storage: &dyn Storage) -> Result<Vec<JournalEntry>> {
    let contents = match storage.read(JOURNAL_KEY)? {
        Some(contents) => contents,
        None => return Ok(Vec::new()),
    };

    let mut entries = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<JournalEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse journal entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    tracing::debug!("Read {} journal entries", entries.len());
    Ok(entries)
}

/// Load the snapshot, or an empty one when none has been written yet
pub fn read_snapshot(storage: &dyn Storage) -> Result<Snapshot> {
    match storage.read(SNAPSHOT_KEY)? {
        Some(contents) => Ok(serde_json::from_str(&contents)?),
        None => Ok(Snapshot::default()),
    }
}

/// Replace the snapshot and drop the journal it subsumes
pub fn write_snapshot(storage: &mut dyn Storage, snapshot: &Snapshot) -> Result<()> {
    let contents = serde_json::to_string(snapshot)?;
    storage.write(SNAPSHOT_KEY, &contents)?;
    storage.remove(JOURNAL_KEY)
}
