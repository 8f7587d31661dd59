//! Mock data generator for demos and tests.
//!
//! Generated records go through the public `Store` API exactly like
//! user-entered ones. With a seed, the same config on an equal store
//! (same clock, same exercises) produces identical records, ids included.

use crate::error::ValidationErrors;
use crate::validate::{validate_cardio, validate_workout};
use crate::{CardioSession, CardioType, Exercise, Result, Store, WeightWorkout};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PROGRESS_EVERY: usize = 25;

/// How much data to generate
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub workout_count: usize,
    pub cardio_count: usize,
    /// Records are spread over this many days before now
    pub date_range_days: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            workout_count: 10,
            cardio_count: 5,
            date_range_days: 30,
        }
    }
}

/// What a generation run created
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub workouts_created: usize,
    pub sets_created: usize,
    pub cardio_created: usize,
}

/// Populate `store` with random but valid workouts and cardio sessions
///
/// Fails with a validation error, before saving anything, when the
/// exercise catalog is empty or the config is unusable.
pub fn generate(
    store: &mut Store,
    config: &GeneratorConfig,
    seed: Option<u64>,
) -> Result<GenerationSummary> {
    let mut errors = ValidationErrors::new();
    if config.date_range_days == 0 {
        errors.push("dateRangeDays", "must be at least 1");
    }
    if store.list_exercises().is_empty() {
        errors.push("exercises", "catalog is empty; seed exercises first");
    }
    errors.into_result()?;

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let now = store.now();
    let exercises = store.list_exercises().to_vec();

    let workouts: Vec<WeightWorkout> = (0..config.workout_count)
        .map(|_| random_workout(&mut rng, &exercises, now, config.date_range_days))
        .collect();
    let sessions: Vec<CardioSession> = (0..config.cardio_count)
        .map(|_| random_cardio(&mut rng, now, config.date_range_days))
        .collect();

    // Everything is checked before the first save
    let mut errors = ValidationErrors::new();
    for (i, workout) in workouts.iter().enumerate() {
        errors.extend_prefixed(
            &format!("workouts[{}]", i),
            validate_workout(workout, |id| store.exercise(id).is_some()),
        );
    }
    for (i, session) in sessions.iter().enumerate() {
        errors.extend_prefixed(&format!("cardioSessions[{}]", i), validate_cardio(session));
    }
    errors.into_result()?;

    let mut summary = GenerationSummary::default();
    for workout in &workouts {
        store.save_workout(workout)?;
        summary.workouts_created += 1;
        summary.sets_created += workout.sets.len();
        log_progress(summary.workouts_created, workouts.len(), "workouts");
    }
    for session in &sessions {
        store.save_cardio_session(session)?;
        summary.cardio_created += 1;
        log_progress(summary.cardio_created, sessions.len(), "cardio sessions");
    }

    tracing::info!(
        "Generated {} workouts ({} sets) and {} cardio sessions",
        summary.workouts_created,
        summary.sets_created,
        summary.cardio_created
    );
    Ok(summary)
}

fn log_progress(done: usize, total: usize, what: &str) {
    if done % PROGRESS_EVERY == 0 || done == total {
        tracing::debug!("Generated {}/{} {}", done, total, what);
    }
}

fn random_id(rng: &mut ChaCha8Rng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// A time within the range, at least `min_minutes_ago` before now
fn random_past(
    rng: &mut ChaCha8Rng,
    now: DateTime<Utc>,
    range_days: u32,
    min_minutes_ago: i64,
) -> DateTime<Utc> {
    let days_ago = i64::from(rng.gen_range(0..range_days));
    let minutes_ago = rng.gen_range(min_minutes_ago..=min_minutes_ago + 600);
    now - Duration::days(days_ago) - Duration::minutes(minutes_ago)
}

fn random_workout(
    rng: &mut ChaCha8Rng,
    exercises: &[Exercise],
    now: DateTime<Utc>,
    range_days: u32,
) -> WeightWorkout {
    let duration: i64 = rng.gen_range(30..=90);
    let started_at = random_past(rng, now, range_days, duration + 10);

    let mut workout = WeightWorkout::draft(started_at);
    workout.id = random_id(rng);
    workout.completed_at = Some(started_at + Duration::minutes(duration));

    let count = rng.gen_range(2..=4).min(exercises.len());
    let picked: Vec<&Exercise> = exercises.choose_multiple(rng, count).collect();
    for exercise in picked {
        let sets: u32 = rng.gen_range(3..=5);
        let loaded = exercise.equipment.is_some();
        let base = if loaded {
            f64::from(rng.gen_range(8u32..=40)) * 2.5
        } else {
            0.0
        };

        for set in 0..sets {
            let reps = rng.gen_range(5..=12);
            // Ramp up one plate step per set for loaded lifts
            let weight = if loaded { base + 2.5 * f64::from(set) } else { 0.0 };
            workout.log_set(exercise.id, reps, weight);
        }
    }

    workout
}

fn random_cardio(rng: &mut ChaCha8Rng, now: DateTime<Utc>, range_days: u32) -> CardioSession {
    const KINDS: [CardioType; 6] = [
        CardioType::Treadmill,
        CardioType::Bike,
        CardioType::Run,
        CardioType::Row,
        CardioType::Elliptical,
        CardioType::Walk,
    ];

    let kind = KINDS[rng.gen_range(0..KINDS.len())].clone();
    let duration_minutes: i32 = rng.gen_range(15..=60);
    let completed_at = random_past(rng, now, range_days, 5);

    let distance_km = if kind.tracks_distance() {
        let speed_kmh = match kind {
            CardioType::Bike => 22.0,
            CardioType::Row => 12.0,
            CardioType::Run => 10.5,
            CardioType::Walk => 5.0,
            _ => 9.0,
        } * rng.gen_range(0.85..1.15);
        let km = speed_kmh * f64::from(duration_minutes) / 60.0;
        Some((km * 100.0).round() / 100.0)
    } else {
        None
    };

    let mut session = CardioSession::new(kind, duration_minutes, distance_km, completed_at);
    session.id = random_id(rng);
    session
}
