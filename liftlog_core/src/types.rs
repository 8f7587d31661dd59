//! Core domain types for liftlog.
//!
//! This module defines the records kept on-device:
//! - Exercises (reference data)
//! - Weight workouts and their sets
//! - Cardio sessions
//! - The `Activity` union returned by history queries
//!
//! Wire names are camelCase; they are the backup file contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

// ============================================================================
// Exercises
// ============================================================================

/// An exercise definition (e.g., "Barbell Bench Press")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub muscle_groups: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
}

impl Exercise {
    /// Create an exercise with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            muscle_groups: BTreeSet::new(),
            equipment: None,
        }
    }

    pub fn with_muscle_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.muscle_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_equipment(mut self, equipment: impl Into<String>) -> Self {
        self.equipment = Some(equipment.into());
        self
    }
}

// ============================================================================
// Weight Workouts
// ============================================================================

/// One logged set; order within the parent workout is significant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    pub exercise_id: Uuid,
    pub reps: i32,
    pub weight_kg: f64,
}

/// Whether a workout is still being authored or has been committed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutStatus {
    Draft,
    Saved,
}

/// A weight-training workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightWorkout {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub sets: Vec<WorkoutSet>,
    pub status: WorkoutStatus,
}

impl WeightWorkout {
    /// Start a new draft workout
    pub fn draft(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            completed_at: None,
            sets: Vec::new(),
            status: WorkoutStatus::Draft,
        }
    }

    /// Append a set to the draft (authoring is append-only)
    pub fn log_set(&mut self, exercise_id: Uuid, reps: i32, weight_kg: f64) -> &mut Self {
        self.sets.push(WorkoutSet {
            exercise_id,
            reps,
            weight_kg,
        });
        self
    }

    pub fn is_saved(&self) -> bool {
        self.status == WorkoutStatus::Saved
    }

    /// Sets grouped by exercise, in order of each exercise's first appearance
    pub fn sets_by_exercise(&self) -> Vec<(Uuid, Vec<&WorkoutSet>)> {
        let mut groups: Vec<(Uuid, Vec<&WorkoutSet>)> = Vec::new();
        for set in &self.sets {
            match groups.iter_mut().find(|(id, _)| *id == set.exercise_id) {
                Some((_, sets)) => sets.push(set),
                None => groups.push((set.exercise_id, vec![set])),
            }
        }
        groups
    }

    /// Total volume (reps x weight) across all sets
    pub fn volume_kg(&self) -> f64 {
        self.sets
            .iter()
            .map(|s| f64::from(s.reps) * s.weight_kg)
            .sum()
    }
}

// ============================================================================
// Cardio
// ============================================================================

/// Type of cardio session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum CardioType {
    Treadmill,
    Bike,
    Run,
    Row,
    Elliptical,
    StairClimber,
    Swim,
    Walk,
    Other(String),
}

impl CardioType {
    /// Whether distance is normally tracked for this type
    pub fn tracks_distance(&self) -> bool {
        !matches!(self, CardioType::Elliptical | CardioType::StairClimber)
    }

    /// Parse a user-facing name (case-insensitive); unknown names become `Other`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "treadmill" => CardioType::Treadmill,
            "bike" | "cycle" | "cycling" => CardioType::Bike,
            "run" | "running" => CardioType::Run,
            "row" | "rower" | "rowing" => CardioType::Row,
            "elliptical" => CardioType::Elliptical,
            "stairclimber" | "stairs" => CardioType::StairClimber,
            "swim" | "swimming" => CardioType::Swim,
            "walk" | "walking" => CardioType::Walk,
            _ => CardioType::Other(name.trim().to_string()),
        }
    }
}

/// A recorded cardio session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardioSession {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: CardioType,
    pub duration_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl CardioSession {
    pub fn new(
        kind: CardioType,
        duration_minutes: i32,
        distance_km: Option<f64>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            duration_minutes,
            distance_km,
            completed_at,
        }
    }
}

// ============================================================================
// Activity
// ============================================================================

/// A saved record in the activity history
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Activity {
    Workout(WeightWorkout),
    Cardio(CardioSession),
}

impl Activity {
    pub fn id(&self) -> Uuid {
        match self {
            Activity::Workout(w) => w.id,
            Activity::Cardio(c) => c.id,
        }
    }

    /// Completion time; saved workouts always carry one
    pub fn completed_at(&self) -> DateTime<Utc> {
        match self {
            Activity::Workout(w) => w.completed_at.unwrap_or(w.started_at),
            Activity::Cardio(c) => c.completed_at,
        }
    }

    pub fn as_workout(&self) -> Option<&WeightWorkout> {
        match self {
            Activity::Workout(w) => Some(w),
            Activity::Cardio(_) => None,
        }
    }

    pub fn as_cardio(&self) -> Option<&CardioSession> {
        match self {
            Activity::Cardio(c) => Some(c),
            Activity::Workout(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_grouped_by_first_appearance() {
        let bench = Uuid::new_v4();
        let row = Uuid::new_v4();
        let mut workout = WeightWorkout::draft(Utc::now());
        workout
            .log_set(bench, 8, 60.0)
            .log_set(row, 10, 50.0)
            .log_set(bench, 6, 65.0);

        let groups = workout.sets_by_exercise();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, bench);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[1].reps, 6);
        assert_eq!(groups[1].0, row);
    }

    #[test]
    fn test_volume() {
        let mut workout = WeightWorkout::draft(Utc::now());
        workout.log_set(Uuid::new_v4(), 10, 50.0).log_set(Uuid::new_v4(), 5, 100.0);
        assert_eq!(workout.volume_kg(), 1000.0);
    }

    #[test]
    fn test_cardio_wire_names() {
        let session = CardioSession::new(CardioType::Treadmill, 30, Some(5.0), Utc::now());
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["type"], "treadmill");
        assert_eq!(json["durationMinutes"], 30);
        assert_eq!(json["distanceKm"], 5.0);
    }

    #[test]
    fn test_absent_distance_is_not_zero() {
        let session = CardioSession::new(CardioType::Elliptical, 20, None, Utc::now());
        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("distanceKm"));

        let parsed: CardioSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.distance_km, None);
    }

    #[test]
    fn test_cardio_type_parse() {
        assert_eq!(CardioType::parse("Treadmill"), CardioType::Treadmill);
        assert_eq!(CardioType::parse("stair-climber"), CardioType::StairClimber);
        assert_eq!(
            CardioType::parse("Jump rope"),
            CardioType::Other("Jump rope".into())
        );
    }
}
