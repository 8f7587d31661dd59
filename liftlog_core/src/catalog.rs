//! Default exercise catalog seeded at first launch.
//!
//! Ids are fixed so that two fresh installs agree on every exercise id,
//! which keeps backups portable between devices.

use crate::types::Exercise;
use once_cell::sync::Lazy;
use uuid::Uuid;

/// Cached default catalog - built once and reused
static DEFAULT_EXERCISES: Lazy<Vec<Exercise>> = Lazy::new(build_default_exercises);

/// Get a reference to the cached default catalog
pub fn default_exercises() -> &'static [Exercise] {
    &DEFAULT_EXERCISES
}

fn exercise(id: u128, name: &str, groups: &[&str], equipment: Option<&str>) -> Exercise {
    Exercise {
        id: Uuid::from_u128(id),
        name: name.to_string(),
        muscle_groups: groups.iter().map(|g| g.to_string()).collect(),
        equipment: equipment.map(str::to_string),
    }
}

fn build_default_exercises() -> Vec<Exercise> {
    // 0x11f7_... prefix marks built-in catalog ids
    vec![
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0001,
            "Barbell Bench Press",
            &["chest", "triceps", "shoulders"],
            Some("barbell"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0002,
            "Barbell Back Squat",
            &["quads", "glutes", "hamstrings"],
            Some("barbell"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0003,
            "Deadlift",
            &["hamstrings", "glutes", "back"],
            Some("barbell"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0004,
            "Overhead Press",
            &["shoulders", "triceps"],
            Some("barbell"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0005,
            "Barbell Row",
            &["back", "biceps"],
            Some("barbell"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0006,
            "Pull-up",
            &["back", "biceps"],
            Some("pullup_bar"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0007,
            "Dumbbell Lunge",
            &["quads", "glutes"],
            Some("dumbbell"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0008,
            "Dumbbell Curl",
            &["biceps"],
            Some("dumbbell"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_0009,
            "Lat Pulldown",
            &["back", "biceps"],
            Some("cable"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_000a,
            "Leg Press",
            &["quads", "glutes"],
            Some("machine"),
        ),
        exercise(
            0x11f7_0000_0000_4000_8000_0000_0000_000b,
            "Plank",
            &["core"],
            None,
        ),
    ]
}
