//! Field validation for domain writes.
//!
//! Every check collects all violations instead of stopping at the first,
//! so the caller can show everything that needs fixing at once.

use crate::error::ValidationErrors;
use crate::{CardioSession, CardioType, Exercise, WeightWorkout, WorkoutStatus};
use uuid::Uuid;

/// Validate an exercise definition
pub fn validate_exercise(exercise: &Exercise) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if exercise.name.trim().is_empty() {
        errors.push("name", "must not be empty");
    }
    if exercise.muscle_groups.iter().any(|g| g.trim().is_empty()) {
        errors.push("muscleGroups", "must not contain empty names");
    }
    if let Some(equipment) = &exercise.equipment {
        if equipment.trim().is_empty() {
            errors.push("equipment", "must be omitted rather than empty");
        }
    }

    errors
}

/// Validate the sets and timestamps of a workout
///
/// `exercise_exists` resolves set references; a dangling id is a violation.
pub fn validate_workout<F>(workout: &WeightWorkout, exercise_exists: F) -> ValidationErrors
where
    F: Fn(&Uuid) -> bool,
{
    let mut errors = ValidationErrors::new();

    if workout.sets.is_empty() {
        errors.push("sets", "at least one set is required");
    }

    for (i, set) in workout.sets.iter().enumerate() {
        if !exercise_exists(&set.exercise_id) {
            errors.push(
                format!("sets[{}].exerciseId", i),
                format!("unknown exercise {}", set.exercise_id),
            );
        }
        if set.reps <= 0 {
            errors.push(
                format!("sets[{}].reps", i),
                format!("must be positive, got {}", set.reps),
            );
        }
        check_non_negative(&mut errors, &format!("sets[{}].weightKg", i), set.weight_kg);
    }

    if let Some(completed_at) = workout.completed_at {
        if completed_at < workout.started_at {
            errors.push("completedAt", "must not be earlier than startedAt");
        }
    }

    errors
}

/// Validate a workout found in a backup document
///
/// Backed-up workouts must already be committed.
pub fn validate_saved_workout<F>(workout: &WeightWorkout, exercise_exists: F) -> ValidationErrors
where
    F: Fn(&Uuid) -> bool,
{
    let mut errors = validate_workout(workout, exercise_exists);
    if workout.status != WorkoutStatus::Saved {
        errors.push("status", "must be saved");
    }
    if workout.completed_at.is_none() {
        errors.push("completedAt", "is required for a saved workout");
    }
    errors
}

/// Validate a cardio session
pub fn validate_cardio(session: &CardioSession) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if session.duration_minutes <= 0 {
        errors.push(
            "durationMinutes",
            format!("must be positive, got {}", session.duration_minutes),
        );
    }
    if let Some(distance) = session.distance_km {
        check_non_negative(&mut errors, "distanceKm", distance);
    }
    if let CardioType::Other(name) = &session.kind {
        if name.trim().is_empty() {
            errors.push("type", "custom type needs a name");
        }
    }

    errors
}

fn check_non_negative(errors: &mut ValidationErrors, field: &str, value: f64) {
    if !value.is_finite() {
        errors.push(field, "must be a finite number");
    } else if value < 0.0 {
        errors.push(field, format!("must be non-negative, got {}", value));
    }
}
