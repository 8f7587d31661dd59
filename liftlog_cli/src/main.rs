use clap::{Parser, Subcommand};
use liftlog_core::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Local-first workout and cardio log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the exercise catalog
    Exercises,

    /// Log a weight workout
    Workout {
        /// One set as <exercise>:<reps>x<kg>; repeat for more sets
        #[arg(long = "set", required = true, value_name = "SET")]
        sets: Vec<String>,
    },

    /// Log a cardio session
    Cardio {
        /// Cardio type (treadmill, bike, run, row, elliptical, stairclimber, swim, walk, ...)
        #[arg(long = "type", value_name = "TYPE")]
        kind: String,

        /// Duration in minutes
        #[arg(long, allow_hyphen_values = true)]
        minutes: i32,

        /// Distance in kilometres
        #[arg(long, allow_hyphen_values = true)]
        distance: Option<f64>,
    },

    /// Show recent activity, newest first (default)
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Delete a saved workout
    DeleteWorkout { id: String },

    /// Delete a cardio session
    DeleteCardio { id: String },

    /// Export everything to a JSON backup
    Export {
        /// Output file (defaults to the backup directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Merge a JSON backup into the log
    Import { file: PathBuf },

    /// Fill the log with random demo data
    Generate {
        #[arg(long)]
        workouts: Option<usize>,

        #[arg(long)]
        cardio: Option<usize>,

        /// Spread records over this many days
        #[arg(long)]
        days: Option<u32>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Fold the journal into the snapshot
    Compact,

    /// Write a CSV activity report
    Report {
        #[arg(long)]
        out: PathBuf,
    },

    /// Inspect or change install-prompt flags
    Install {
        #[command(subcommand)]
        action: InstallAction,
    },
}

#[derive(Subcommand)]
enum InstallAction {
    /// Show persisted flags and the derived phase
    Status,
    /// Never show the install prompt again
    Dismiss,
    /// Clear both flags
    Reset,
}

fn main() -> Result<()> {
    // Initialize logging
    liftlog_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    let data_dir = config.data.data_dir.clone();

    let mut store = Store::open_dir(&data_dir)?;
    if config.data.seed_exercises {
        store.seed_default_exercises()?;
    }

    // The CLI has no install capability, but a saved workout still
    // records the first-workout flag for a later UI session
    let install = InstallController::new(FileStorage::new(&data_dir), StaticPlatform::default())?;
    let _install_sub = install.observe_store(&store);

    match cli.command {
        Some(Commands::Exercises) => cmd_exercises(&store),
        Some(Commands::Workout { sets }) => cmd_workout(&mut store, &sets),
        Some(Commands::Cardio {
            kind,
            minutes,
            distance,
        }) => cmd_cardio(&mut store, &kind, minutes, distance),
        Some(Commands::Recent { limit }) => cmd_recent(&store, limit),
        Some(Commands::DeleteWorkout { id }) => {
            store.delete_workout(&parse_id(&id)?)?;
            println!("✓ Deleted workout {}", id);
            Ok(())
        }
        Some(Commands::DeleteCardio { id }) => {
            store.delete_cardio_session(&parse_id(&id)?)?;
            println!("✓ Deleted cardio session {}", id);
            Ok(())
        }
        Some(Commands::Export { out }) => cmd_export(&store, out, &config),
        Some(Commands::Import { file }) => cmd_import(&mut store, &file),
        Some(Commands::Generate {
            workouts,
            cardio,
            days,
            seed,
        }) => {
            let mut settings = config.generator.clone();
            settings.workout_count = workouts.unwrap_or(settings.workout_count);
            settings.cardio_count = cardio.unwrap_or(settings.cardio_count);
            settings.date_range_days = days.unwrap_or(settings.date_range_days);
            let seed = seed.or(settings.seed);

            let summary = generate(&mut store, &settings.to_generator_config(), seed)?;
            println!(
                "✓ Generated {} workouts ({} sets) and {} cardio sessions",
                summary.workouts_created, summary.sets_created, summary.cardio_created
            );
            Ok(())
        }
        Some(Commands::Compact) => {
            let folded = store.compact()?;
            println!("✓ Compacted {} journal entries", folded);
            Ok(())
        }
        Some(Commands::Report { out }) => {
            let rows = write_activity_csv_file(&store, &out)?;
            println!("✓ Wrote {} rows", rows);
            println!("  CSV: {}", out.display());
            Ok(())
        }
        Some(Commands::Install { action }) => cmd_install(&install, action),
        None => {
            // Default to "recent" command
            cmd_recent(&store, 10)
        }
    }
}

fn cmd_exercises(store: &Store) -> Result<()> {
    if store.list_exercises().is_empty() {
        println!("No exercises.");
        return Ok(());
    }

    for exercise in store.list_exercises() {
        let groups: Vec<&str> = exercise.muscle_groups.iter().map(String::as_str).collect();
        println!(
            "{}  {:<28} {:<30} {}",
            exercise.id,
            exercise.name,
            groups.join(", "),
            exercise.equipment.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_workout(store: &mut Store, sets: &[String]) -> Result<()> {
    let mut draft = WeightWorkout::draft(store.now());
    let mut errors = ValidationErrors::new();

    for (i, arg) in sets.iter().enumerate() {
        match parse_set(store, arg) {
            Ok((exercise_id, reps, weight_kg)) => {
                draft.log_set(exercise_id, reps, weight_kg);
            }
            Err(message) => errors.push(format!("sets[{}]", i), message),
        }
    }
    errors.into_result()?;

    let id = store.save_workout(&draft)?;
    println!("✓ Workout saved!");
    println!("  Id: {}", id);
    println!("  Sets: {}  Volume: {:.1} kg", draft.sets.len(), draft.volume_kg());
    Ok(())
}

/// Parse `<exercise>:<reps>x<kg>`; the exercise is a catalog name or id
fn parse_set(store: &Store, arg: &str) -> std::result::Result<(Uuid, i32, f64), String> {
    let (exercise, load) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("expected <exercise>:<reps>x<kg>, got '{}'", arg))?;
    let (reps, weight) = load
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected <reps>x<kg>, got '{}'", load))?;

    let exercise_id = match store.find_exercise_by_name(exercise) {
        Some(found) => found.id,
        None => Uuid::parse_str(exercise.trim())
            .map_err(|_| format!("unknown exercise '{}'", exercise.trim()))?,
    };
    let reps = reps
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("reps '{}' is not a whole number", reps.trim()))?;
    let weight_kg = weight
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("weight '{}' is not a number", weight.trim()))?;

    Ok((exercise_id, reps, weight_kg))
}

fn cmd_cardio(store: &mut Store, kind: &str, minutes: i32, distance: Option<f64>) -> Result<()> {
    let kind = CardioType::parse(kind);
    if distance.is_some() && !kind.tracks_distance() {
        tracing::warn!("{:?} does not usually track distance", kind);
    }

    let session = CardioSession::new(kind, minutes, distance, store.now());
    let id = store.save_cardio_session(&session)?;
    println!("✓ Cardio session saved!");
    println!("  Id: {}", id);
    Ok(())
}

fn cmd_recent(store: &Store, limit: usize) -> Result<()> {
    let recent = store.query_recent_activity(limit);
    if recent.is_empty() {
        println!("No activity logged yet.");
        return Ok(());
    }

    for activity in recent {
        let when = activity.completed_at().format("%Y-%m-%d %H:%M");
        match activity {
            Activity::Workout(workout) => {
                println!(
                    "{}  workout  {}  {} sets, {:.1} kg",
                    when,
                    workout.id,
                    workout.sets.len(),
                    workout.volume_kg()
                );
                for (exercise_id, sets) in workout.sets_by_exercise() {
                    let name = store
                        .exercise(&exercise_id)
                        .map(|e| e.name.as_str())
                        .unwrap_or("(deleted exercise)");
                    let loads: Vec<String> = sets
                        .iter()
                        .map(|s| format!("{}x{}", s.reps, s.weight_kg))
                        .collect();
                    println!("      {}: {}", name, loads.join(", "));
                }
            }
            Activity::Cardio(session) => {
                let distance = session
                    .distance_km
                    .map(|km| format!(", {} km", km))
                    .unwrap_or_default();
                println!(
                    "{}  cardio   {}  {:?} {} min{}",
                    when, session.id, session.kind, session.duration_minutes, distance
                );
            }
        }
    }
    Ok(())
}

fn cmd_export(store: &Store, out: Option<PathBuf>, config: &Config) -> Result<()> {
    let doc = store.export();
    let path = out.unwrap_or_else(|| {
        config.backup_dir().join(format!(
            "liftlog-backup-{}.json",
            doc.exported_at.format("%Y%m%d-%H%M%S")
        ))
    });

    doc.write_to(&path)?;
    println!("✓ Exported {} records", doc.record_count());
    println!("  Backup: {}", path.display());
    Ok(())
}

fn cmd_import(store: &mut Store, file: &Path) -> Result<()> {
    let doc = BackupDocument::read_from(file)?;
    let report = store.import(&doc)?;

    println!(
        "✓ Imported {} exercises, {} workouts, {} cardio sessions",
        report.exercises_added, report.workouts_added, report.cardio_added
    );
    if report.skipped > 0 {
        println!("  Skipped {} records already present", report.skipped);
    }
    Ok(())
}

fn cmd_install(install: &InstallController, action: InstallAction) -> Result<()> {
    match action {
        InstallAction::Status => {
            let snapshot = install.snapshot();
            println!("Prompt dismissed:        {}", snapshot.dismissed);
            println!("First workout completed: {}", snapshot.first_workout_completed);
            println!("Phase:                   {:?}", snapshot.phase());
        }
        InstallAction::Dismiss => {
            install.dismiss_prompt()?;
            println!("✓ Install prompt dismissed");
        }
        InstallAction::Reset => {
            install.reset()?;
            println!("✓ Install flags reset");
        }
    }
    Ok(())
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.push("id", format!("'{}' is not a valid id", id));
        errors.into()
    })
}
