//! CSV activity report for spreadsheets.
//!
//! One row per logged set and one per cardio session, newest activity first.

use crate::{Activity, Result, Store};
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    kind: &'static str,
    id: String,
    completed_at: String,
    exercise: Option<&'a str>,
    set_number: Option<usize>,
    reps: Option<i32>,
    weight_kg: Option<f64>,
    cardio_type: Option<String>,
    duration_minutes: Option<i32>,
    distance_km: Option<f64>,
}

/// Write the report to any writer; returns the number of data rows
pub fn write_activity_csv<W: Write>(store: &Store, writer: W) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for activity in store.query_recent_activity(usize::MAX) {
        let completed_at = activity.completed_at().to_rfc3339();
        match activity {
            Activity::Workout(workout) => {
                for (i, set) in workout.sets.iter().enumerate() {
                    let exercise = store.exercise(&set.exercise_id).map(|e| e.name.as_str());
                    writer.serialize(CsvRow {
                        kind: "workout",
                        id: workout.id.to_string(),
                        completed_at: completed_at.clone(),
                        exercise,
                        set_number: Some(i + 1),
                        reps: Some(set.reps),
                        weight_kg: Some(set.weight_kg),
                        cardio_type: None,
                        duration_minutes: None,
                        distance_km: None,
                    })?;
                    rows += 1;
                }
            }
            Activity::Cardio(session) => {
                writer.serialize(CsvRow {
                    kind: "cardio",
                    id: session.id.to_string(),
                    completed_at,
                    exercise: None,
                    set_number: None,
                    reps: None,
                    weight_kg: None,
                    cardio_type: Some(cardio_label(&session.kind)),
                    duration_minutes: Some(session.duration_minutes),
                    distance_km: session.distance_km,
                })?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    Ok(rows)
}

/// Write the report to `path`, synced to disk before returning
pub fn write_activity_csv_file(store: &Store, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = std::fs::File::create(path)?;
    let rows = write_activity_csv(store, &file)?;
    file.sync_all()?;

    tracing::info!("Wrote {} report rows to {:?}", rows, path);
    Ok(rows)
}

/// Same spelling as the backup format (`stairClimber`), custom names verbatim
fn cardio_label(kind: &crate::CardioType) -> String {
    match kind {
        crate::CardioType::Other(name) => name.clone(),
        other => match serde_json::to_value(other) {
            Ok(serde_json::Value::String(name)) => name,
            _ => format!("{:?}", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStorage;
    use crate::{CardioSession, CardioType, Exercise, WeightWorkout};
    use chrono::{Duration, TimeZone, Utc};

    fn sample_store() -> Store {
        let now = Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap();
        let mut store = Store::open_with_clock(MemoryStorage::new(), FixedClock(now)).unwrap();
        let squat = store.add_exercise(Exercise::new("Back Squat")).unwrap();

        let mut draft = WeightWorkout::draft(now - Duration::hours(1));
        draft.log_set(squat, 5, 100.0).log_set(squat, 5, 102.5);
        store.save_workout(&draft).unwrap();

        let run = CardioSession::new(CardioType::Run, 25, Some(4.2), now - Duration::days(1));
        store.save_cardio_session(&run).unwrap();
        store
    }

    #[test]
    fn test_rows_per_set_and_session() {
        let store = sample_store();
        let mut out = Vec::new();

        let rows = write_activity_csv(&store, &mut out).unwrap();
        assert_eq!(rows, 3);

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][0], "workout");
        assert_eq!(&records[0][3], "Back Squat");
        assert_eq!(&records[1][6], "102.5");
        assert_eq!(&records[2][0], "cardio");
        assert_eq!(&records[2][7], "run");
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("reports").join("activity.csv");

        let rows = write_activity_csv_file(&sample_store(), &path).unwrap();
        assert_eq!(rows, 3);

        let reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.into_records().count(), 3);
    }

    #[test]
    fn test_cardio_label_matches_backup_spelling() {
        assert_eq!(cardio_label(&CardioType::StairClimber), "stairClimber");
        assert_eq!(cardio_label(&CardioType::Treadmill), "treadmill");
        assert_eq!(cardio_label(&CardioType::Other("Skierg".into())), "Skierg");

        let session = CardioSession::new(CardioType::StairClimber, 15, None, Utc::now());
        let wire = serde_json::to_value(&session).unwrap();
        assert_eq!(wire["type"], "stairClimber");
    }

    #[test]
    fn test_empty_store() {
        let store = Store::open(MemoryStorage::new()).unwrap();
        let mut out = Vec::new();
        assert_eq!(write_activity_csv(&store, &mut out).unwrap(), 0);
    }
}
