//! Error types for the liftlog_core library.

use std::fmt;
use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for liftlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more field-level violations on a domain write
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Operation addressed a record that does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: Uuid },

    /// Backup document outside the supported schema window
    #[error("Unsupported backup schema version {found} (supported {min}..={max})")]
    UnsupportedSchema { found: i64, min: u32, max: u32 },

    /// Durable storage failed (disk full, permissions, storage disabled)
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Field violations carried by a validation error, if any
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// The kind of record an operation addressed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Exercise,
    Workout,
    CardioSession,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Exercise => "Exercise",
            RecordKind::Workout => "Workout",
            RecordKind::CardioSession => "Cardio session",
        };
        f.write_str(name)
    }
}

/// A single offending field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldViolation {
    /// Field path in wire naming, e.g. `sets[2].weightKg`
    pub field: String,
    pub message: String,
}

/// Every violation found while validating one write
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation for `field`
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Merge another set of violations, prefixing their field paths
    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for v in other.violations {
            self.violations.push(FieldViolation {
                field: format!("{}.{}", prefix, v.field),
                message: v.message,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.violations.iter()
    }

    /// True when some violation names `field` as its last path segment
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| {
            v.field == field
                || v.field.ends_with(&format!(".{}", field))
                || v.field.starts_with(&format!("{}[", field))
        })
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_matches_nested_paths() {
        let mut errors = ValidationErrors::new();
        errors.push("sets[0].reps", "must be positive");
        errors.push("weightKg", "must be non-negative");

        assert!(errors.mentions("reps"));
        assert!(errors.mentions("weightKg"));
        assert!(errors.mentions("sets"));
        assert!(!errors.mentions("durationMinutes"));
    }

    #[test]
    fn test_display_lists_every_violation() {
        let mut errors = ValidationErrors::new();
        errors.push("reps", "must be positive");
        errors.push("weightKg", "must be non-negative");

        let rendered = Error::Validation(errors).to_string();
        assert!(rendered.contains("reps: must be positive"));
        assert!(rendered.contains("weightKg: must be non-negative"));
    }

    #[test]
    fn test_extend_prefixed() {
        let mut inner = ValidationErrors::new();
        inner.push("sets[1].reps", "must be positive");

        let mut outer = ValidationErrors::new();
        outer.extend_prefixed("workouts[3]", inner);

        let fields: Vec<_> = outer.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["workouts[3].sets[1].reps"]);
    }
}
