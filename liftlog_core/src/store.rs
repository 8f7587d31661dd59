//! The persistence store: single source of truth for on-device data.
//!
//! Every public write is one validate-then-commit step: the mutation is
//! validated in full, appended to the journal (durable before returning),
//! applied in memory, and announced to subscribers. A failed write leaves
//! both the store and the caller's draft untouched.

use crate::catalog::default_exercises;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, RecordKind};
use crate::journal::{self, JournalEntry, Snapshot};
use crate::signal::{Listeners, Subscription};
use crate::storage::{FileStorage, Storage};
use crate::validate::{validate_cardio, validate_exercise, validate_workout};
use crate::{Activity, CardioSession, Exercise, Result, WeightWorkout, WorkoutStatus};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

/// Flag key written once the default catalog has been seeded
pub const EXERCISES_SEEDED_KEY: &str = "EXERCISES_SEEDED";

/// Emitted after every successful mutation
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    ExercisesAdded { count: usize },
    WorkoutSaved { id: Uuid },
    WorkoutDeleted { id: Uuid },
    CardioSaved { id: Uuid },
    CardioDeleted { id: Uuid },
    Imported(crate::backup::ImportReport),
}

/// Durable store of exercises, workouts and cardio sessions
pub struct Store {
    storage: Box<dyn Storage>,
    clock: Box<dyn Clock>,
    pub(crate) exercises: Vec<Exercise>,
    /// Saved workouts and cardio sessions in insertion order
    pub(crate) activity: Vec<Activity>,
    journal_len: usize,
    events: Listeners<StoreEvent>,
}

impl Store {
    /// Open a store over `storage` using wall-clock time
    pub fn open(storage: impl Storage + 'static) -> Result<Self> {
        Self::open_with_clock(storage, SystemClock)
    }

    /// Open a file-backed store in `dir`
    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open(FileStorage::new(dir))
    }

    /// Open a store with an explicit time source
    pub fn open_with_clock(
        storage: impl Storage + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        let storage: Box<dyn Storage> = Box::new(storage);

        let Snapshot {
            exercises,
            activity,
        } = journal::read_snapshot(&*storage)?;
        let entries = journal::read_entries(&*storage)?;

        let mut store = Self {
            storage,
            clock: Box::new(clock),
            exercises,
            activity,
            journal_len: entries.len(),
            events: Listeners::new(),
        };

        for entry in entries {
            store.apply(entry);
        }

        tracing::info!(
            "Opened store: {} exercises, {} workouts, {} cardio sessions",
            store.exercises.len(),
            store.workouts().count(),
            store.cardio_sessions().count()
        );
        Ok(store)
    }

    /// Current time according to the store's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Subscribe to store-changed events
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Number of journal entries not yet folded into the snapshot
    pub fn journal_len(&self) -> usize {
        self.journal_len
    }

    // ========================================================================
    // Exercises
    // ========================================================================

    /// All exercises in insertion order
    pub fn list_exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn exercise(&self, id: &Uuid) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == *id)
    }

    /// Case-insensitive lookup by name
    pub fn find_exercise_by_name(&self, name: &str) -> Option<&Exercise> {
        let wanted = name.trim().to_lowercase();
        self.exercises
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
    }

    /// Add one exercise to the reference data
    pub fn add_exercise(&mut self, exercise: Exercise) -> Result<Uuid> {
        let mut errors = validate_exercise(&exercise);
        if self.exercise(&exercise.id).is_some() {
            errors.push("id", format!("exercise {} already exists", exercise.id));
        }
        errors.into_result()?;

        let id = exercise.id;
        self.commit(JournalEntry::ExerciseAdded { exercise })?;
        tracing::info!("Added exercise {}", id);
        self.events.emit(&StoreEvent::ExercisesAdded { count: 1 });
        Ok(id)
    }

    /// Seed the built-in catalog once per storage
    ///
    /// Returns the number of exercises added; 0 once seeding has happened.
    pub fn seed_default_exercises(&mut self) -> Result<usize> {
        if self.storage.contains(EXERCISES_SEEDED_KEY)? {
            return Ok(0);
        }

        let missing: Vec<Exercise> = default_exercises()
            .iter()
            .filter(|e| self.exercise(&e.id).is_none())
            .cloned()
            .collect();
        let count = missing.len();

        if count > 0 {
            self.commit(JournalEntry::Imported {
                exercises: missing,
                workouts: Vec::new(),
                cardio_sessions: Vec::new(),
            })?;
        }
        let stamp = self.now().to_rfc3339();
        self.storage.write(EXERCISES_SEEDED_KEY, &stamp)?;

        tracing::info!("Seeded {} default exercises", count);
        if count > 0 {
            self.events.emit(&StoreEvent::ExercisesAdded { count });
        }
        Ok(count)
    }

    // ========================================================================
    // Workouts
    // ========================================================================

    /// Commit a draft workout
    ///
    /// Stamps `completedAt` with the current time unless the draft already
    /// carries one (backdated entry), and marks the workout saved. A
    /// completion time in the future is rejected.
    pub fn save_workout(&mut self, draft: &WeightWorkout) -> Result<Uuid> {
        let now = self.now();
        let mut workout = draft.clone();
        workout.completed_at = Some(draft.completed_at.unwrap_or(now));
        workout.status = WorkoutStatus::Saved;

        let mut errors = validate_workout(&workout, |id| self.exercise(id).is_some());
        if draft.completed_at.is_some_and(|at| at > now) {
            errors.push("completedAt", "must not be in the future");
        }
        if self.workout(&workout.id).is_some() {
            errors.push("id", format!("workout {} is already saved", workout.id));
        }
        errors.into_result()?;

        let id = workout.id;
        let sets = workout.sets.len();
        self.commit(JournalEntry::WorkoutSaved { workout })?;

        tracing::info!("Saved workout {} with {} sets", id, sets);
        self.events.emit(&StoreEvent::WorkoutSaved { id });
        Ok(id)
    }

    pub fn workout(&self, id: &Uuid) -> Option<&WeightWorkout> {
        self.workouts().find(|w| w.id == *id)
    }

    /// Saved workouts in insertion order
    pub fn workouts(&self) -> impl Iterator<Item = &WeightWorkout> {
        self.activity.iter().filter_map(Activity::as_workout)
    }

    pub fn delete_workout(&mut self, id: &Uuid) -> Result<()> {
        if self.workout(id).is_none() {
            return Err(Error::NotFound {
                kind: RecordKind::Workout,
                id: *id,
            });
        }

        self.commit(JournalEntry::WorkoutDeleted { id: *id })?;
        tracing::info!("Deleted workout {}", id);
        self.events.emit(&StoreEvent::WorkoutDeleted { id: *id });
        Ok(())
    }

    // ========================================================================
    // Cardio
    // ========================================================================

    pub fn save_cardio_session(&mut self, session: &CardioSession) -> Result<Uuid> {
        let mut errors = validate_cardio(session);
        if self.cardio_session(&session.id).is_some() {
            errors.push("id", format!("cardio session {} is already saved", session.id));
        }
        errors.into_result()?;

        let id = session.id;
        self.commit(JournalEntry::CardioSaved {
            session: session.clone(),
        })?;

        tracing::info!(
            "Saved cardio session {} ({:?}, {} min)",
            id,
            session.kind,
            session.duration_minutes
        );
        self.events.emit(&StoreEvent::CardioSaved { id });
        Ok(id)
    }

    pub fn cardio_session(&self, id: &Uuid) -> Option<&CardioSession> {
        self.cardio_sessions().find(|c| c.id == *id)
    }

    /// Saved cardio sessions in insertion order
    pub fn cardio_sessions(&self) -> impl Iterator<Item = &CardioSession> {
        self.activity.iter().filter_map(Activity::as_cardio)
    }

    pub fn delete_cardio_session(&mut self, id: &Uuid) -> Result<()> {
        if self.cardio_session(id).is_none() {
            return Err(Error::NotFound {
                kind: RecordKind::CardioSession,
                id: *id,
            });
        }

        self.commit(JournalEntry::CardioDeleted { id: *id })?;
        tracing::info!("Deleted cardio session {}", id);
        self.events.emit(&StoreEvent::CardioDeleted { id: *id });
        Ok(())
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Most recent activity first
    ///
    /// Sorted by `completedAt` descending; on equal timestamps the later
    /// write comes first.
    pub fn query_recent_activity(&self, limit: usize) -> Vec<&Activity> {
        let mut indexed: Vec<(usize, &Activity)> = self.activity.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            b.completed_at()
                .cmp(&a.completed_at())
                .then_with(|| ib.cmp(ia))
        });
        indexed.into_iter().take(limit).map(|(_, a)| a).collect()
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Fold the journal into a fresh snapshot
    ///
    /// Returns the number of journal entries folded.
    pub fn compact(&mut self) -> Result<usize> {
        let snapshot = Snapshot {
            exercises: self.exercises.clone(),
            activity: self.activity.clone(),
        };
        journal::write_snapshot(&mut *self.storage, &snapshot)?;

        let folded = std::mem::take(&mut self.journal_len);
        tracing::info!("Compacted {} journal entries into snapshot", folded);
        Ok(folded)
    }

    /// Journal `entry` durably, then apply it in memory
    pub(crate) fn commit(&mut self, entry: JournalEntry) -> Result<()> {
        journal::append(&mut *self.storage, &entry)?;
        self.journal_len += 1;
        self.apply(entry);
        Ok(())
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        self.events.emit(&event);
    }

    /// Apply a journaled mutation; re-applying an entry is a no-op
    fn apply(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::ExerciseAdded { exercise } => self.insert_exercise(exercise),
            JournalEntry::WorkoutSaved { workout } => self.insert_workout(workout),
            JournalEntry::CardioSaved { session } => self.insert_cardio(session),
            JournalEntry::WorkoutDeleted { id } => self
                .activity
                .retain(|a| !matches!(a, Activity::Workout(w) if w.id == id)),
            JournalEntry::CardioDeleted { id } => self
                .activity
                .retain(|a| !matches!(a, Activity::Cardio(c) if c.id == id)),
            JournalEntry::Imported {
                exercises,
                workouts,
                cardio_sessions,
            } => {
                for exercise in exercises {
                    self.insert_exercise(exercise);
                }
                for workout in workouts {
                    self.insert_workout(workout);
                }
                for session in cardio_sessions {
                    self.insert_cardio(session);
                }
            }
        }
    }

    fn insert_exercise(&mut self, exercise: Exercise) {
        if self.exercise(&exercise.id).is_none() {
            self.exercises.push(exercise);
        }
    }

    fn insert_workout(&mut self, workout: WeightWorkout) {
        if self.workout(&workout.id).is_none() {
            self.activity.push(Activity::Workout(workout));
        }
    }

    fn insert_cardio(&mut self, session: CardioSession) {
        if self.cardio_session(&session.id).is_none() {
            self.activity.push(Activity::Cardio(session));
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("exercises", &self.exercises.len())
            .field("activity", &self.activity.len())
            .field("journal_len", &self.journal_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStorage;
    use crate::CardioType;
    use chrono::{Duration, TimeZone};
    use std::sync::{Arc, Mutex};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()
    }

    fn store_with_bench(storage: MemoryStorage) -> (Store, Uuid) {
        let mut store = Store::open_with_clock(storage, FixedClock(fixed_now())).unwrap();
        let bench = store
            .add_exercise(Exercise::new("Barbell Bench Press").with_muscle_groups(["chest"]))
            .unwrap();
        (store, bench)
    }

    fn draft_with(exercise_id: Uuid, reps: i32, weight_kg: f64) -> WeightWorkout {
        let mut draft = WeightWorkout::draft(fixed_now() - Duration::minutes(45));
        draft.log_set(exercise_id, reps, weight_kg);
        draft
    }

    #[test]
    fn test_saved_workout_is_most_recent() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());

        let draft = draft_with(bench, 8, 60.0);
        let id = store.save_workout(&draft).unwrap();

        let recent = store.query_recent_activity(1);
        assert_eq!(recent.len(), 1);
        let workout = recent[0].as_workout().unwrap();
        assert_eq!(workout.id, id);
        assert_eq!(workout.status, WorkoutStatus::Saved);
        assert_eq!(workout.completed_at, Some(fixed_now()));
        assert_eq!(workout.sets[0].reps, 8);
        assert_eq!(workout.sets[0].weight_kg, 60.0);
    }

    #[test]
    fn test_zero_reps_rejected() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());

        let err = store.save_workout(&draft_with(bench, 0, 60.0)).unwrap_err();
        assert!(err.violations().unwrap().mentions("reps"));
        assert_eq!(store.workouts().count(), 0);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());

        let err = store.save_workout(&draft_with(bench, 8, -5.0)).unwrap_err();
        assert!(err.violations().unwrap().mentions("weightKg"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());

        let mut draft = draft_with(bench, 0, -5.0);
        draft.log_set(Uuid::new_v4(), 5, 20.0);

        let err = store.save_workout(&draft).unwrap_err();
        let violations = err.violations().unwrap();
        assert_eq!(violations.len(), 3);
        assert!(violations.mentions("reps"));
        assert!(violations.mentions("weightKg"));
        assert!(violations.mentions("exerciseId"));
    }

    #[test]
    fn test_failed_save_keeps_draft_and_store() {
        let storage = MemoryStorage::new();
        let (mut store, bench) = store_with_bench(storage.clone());

        let draft = draft_with(bench, 5, 80.0);
        storage.set_unavailable(true);

        let err = store.save_workout(&draft).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
        assert_eq!(store.workouts().count(), 0);
        assert_eq!(draft.status, WorkoutStatus::Draft);

        storage.set_unavailable(false);
        store.save_workout(&draft).unwrap();
        assert_eq!(store.workouts().count(), 1);
    }

    #[test]
    fn test_double_delete_is_not_found() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());
        let id = store.save_workout(&draft_with(bench, 5, 50.0)).unwrap();

        store.delete_workout(&id).unwrap();
        let err = store.delete_workout(&id).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                kind: RecordKind::Workout,
                ..
            }
        ));
    }

    #[test]
    fn test_resave_same_draft_rejected() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());
        let draft = draft_with(bench, 5, 50.0);

        store.save_workout(&draft).unwrap();
        let err = store.save_workout(&draft).unwrap_err();
        assert!(err.violations().unwrap().mentions("id"));
    }

    #[test]
    fn test_cardio_save_and_delete() {
        let (mut store, _) = store_with_bench(MemoryStorage::new());

        let session = CardioSession::new(CardioType::Treadmill, 30, Some(5.0), fixed_now());
        let id = store.save_cardio_session(&session).unwrap();

        let recent = store.query_recent_activity(10);
        assert_eq!(recent[0].as_cardio(), Some(&session));

        store.delete_cardio_session(&id).unwrap();
        assert!(matches!(
            store.delete_cardio_session(&id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_cardio_validation() {
        let (mut store, _) = store_with_bench(MemoryStorage::new());

        let session = CardioSession::new(CardioType::Bike, 0, Some(-2.0), fixed_now());
        let err = store.save_cardio_session(&session).unwrap_err();
        let violations = err.violations().unwrap();
        assert!(violations.mentions("durationMinutes"));
        assert!(violations.mentions("distanceKm"));
    }

    #[test]
    fn test_recent_activity_ordering() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());

        let mut old = draft_with(bench, 5, 50.0);
        old.started_at = fixed_now() - Duration::days(3);
        old.completed_at = Some(fixed_now() - Duration::days(3) + Duration::hours(1));
        let old_id = store.save_workout(&old).unwrap();

        // Same completion time: later write wins the tie
        let first = CardioSession::new(CardioType::Run, 20, None, fixed_now());
        let second = CardioSession::new(CardioType::Row, 15, None, fixed_now());
        store.save_cardio_session(&first).unwrap();
        store.save_cardio_session(&second).unwrap();

        let ids: Vec<Uuid> = store
            .query_recent_activity(10)
            .iter()
            .map(|a| a.id())
            .collect();
        assert_eq!(ids, vec![second.id, first.id, old_id]);
        assert_eq!(store.query_recent_activity(2).len(), 2);
    }

    #[test]
    fn test_survives_reload() {
        let storage = MemoryStorage::new();
        let (mut store, bench) = store_with_bench(storage.clone());
        let id = store.save_workout(&draft_with(bench, 8, 60.0)).unwrap();
        drop(store);

        let reopened = Store::open(storage).unwrap();
        assert_eq!(reopened.list_exercises().len(), 1);
        assert_eq!(reopened.workout(&id).unwrap().sets[0].reps, 8);
    }

    #[test]
    fn test_file_store_survives_reload() {
        let temp_dir = tempfile::tempdir().unwrap();

        let mut store = Store::open_dir(temp_dir.path()).unwrap();
        store.seed_default_exercises().unwrap();
        let squat = store.find_exercise_by_name("barbell back squat").unwrap().id;
        let mut draft = WeightWorkout::draft(Utc::now() - Duration::minutes(30));
        draft.log_set(squat, 5, 100.0);
        let id = store.save_workout(&draft).unwrap();
        drop(store);

        let reopened = Store::open_dir(temp_dir.path()).unwrap();
        assert!(reopened.workout(&id).is_some());
    }

    #[test]
    fn test_seed_runs_once() {
        let storage = MemoryStorage::new();
        let mut store = Store::open(storage.clone()).unwrap();

        let seeded = store.seed_default_exercises().unwrap();
        assert_eq!(seeded, default_exercises().len());
        assert_eq!(store.seed_default_exercises().unwrap(), 0);

        let mut reopened = Store::open(storage).unwrap();
        assert_eq!(reopened.seed_default_exercises().unwrap(), 0);
        assert_eq!(reopened.list_exercises().len(), default_exercises().len());
    }

    #[test]
    fn test_events_emitted_on_mutation() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let id = store.save_workout(&draft_with(bench, 5, 50.0)).unwrap();
        let _ = store.save_workout(&draft_with(bench, 0, 50.0));
        store.delete_workout(&id).unwrap();
        sub.unsubscribe();
        let _ = store.save_workout(&draft_with(bench, 5, 50.0)).unwrap();

        let events = seen.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                StoreEvent::WorkoutSaved { id },
                StoreEvent::WorkoutDeleted { id }
            ]
        );
    }

    #[test]
    fn test_compact_then_reload() {
        let storage = MemoryStorage::new();
        let (mut store, bench) = store_with_bench(storage.clone());

        let keep = store.save_workout(&draft_with(bench, 5, 50.0)).unwrap();
        let gone = store.save_workout(&draft_with(bench, 6, 55.0)).unwrap();
        store.delete_workout(&gone).unwrap();

        assert_eq!(store.compact().unwrap(), 4);
        assert_eq!(store.journal_len(), 0);
        assert!(!storage.keys().contains(&journal::JOURNAL_KEY.to_string()));

        let reopened = Store::open(storage).unwrap();
        assert!(reopened.workout(&keep).is_some());
        assert!(reopened.workout(&gone).is_none());
        assert_eq!(reopened.list_exercises().len(), 1);
    }

    #[test]
    fn test_backdated_draft_keeps_completion_time() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());

        let mut draft = draft_with(bench, 5, 50.0);
        draft.started_at = fixed_now() - Duration::days(2);
        draft.completed_at = Some(fixed_now() - Duration::days(2) + Duration::minutes(50));
        let id = store.save_workout(&draft).unwrap();

        assert_eq!(store.workout(&id).unwrap().completed_at, draft.completed_at);
    }

    #[test]
    fn test_future_completion_rejected() {
        let (mut store, bench) = store_with_bench(MemoryStorage::new());

        let mut future = draft_with(bench, 5, 50.0);
        future.completed_at = Some(fixed_now() + Duration::days(365));
        let err = store.save_workout(&future).unwrap_err();
        assert!(err.violations().unwrap().mentions("completedAt"));
        assert_eq!(store.workouts().count(), 0);

        let id = store.save_workout(&draft_with(bench, 5, 50.0)).unwrap();
        assert_eq!(store.query_recent_activity(1)[0].id(), id);
    }
}
