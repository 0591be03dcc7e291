//! Entity types for exercises, workout templates and logged sessions.
//!
//! Every struct here maps one-to-one onto a table in
//! [`crate::storage::schema`]. An `id` of `0` means "not yet persisted"; the
//! stores let SQLite assign the key in that case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// How an exercise is performed and measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExerciseType {
    /// Repetitions with external load
    #[default]
    RepsWeight,
    /// Bodyweight repetitions
    Reps,
    /// Held position, measured in time
    Isometric,
    /// Held position with external load
    IsometricWeights,
}

impl ExerciseType {
    /// Integer code stored in the `exercise.type` column.
    pub fn value(self) -> i32 {
        match self {
            ExerciseType::RepsWeight => 0,
            ExerciseType::Reps => 1,
            ExerciseType::Isometric => 2,
            ExerciseType::IsometricWeights => 3,
        }
    }

    /// Decode a stored integer code.
    pub fn from_value(value: i32) -> Result<Self, UnknownVariant> {
        match value {
            0 => Ok(ExerciseType::RepsWeight),
            1 => Ok(ExerciseType::Reps),
            2 => Ok(ExerciseType::Isometric),
            3 => Ok(ExerciseType::IsometricWeights),
            other => Err(UnknownVariant::new("ExerciseType", other.to_string())),
        }
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExerciseType::RepsWeight => write!(f, "Reps & Weight"),
            ExerciseType::Reps => write!(f, "Reps"),
            ExerciseType::Isometric => write!(f, "Isometric"),
            ExerciseType::IsometricWeights => write!(f, "Weighted Isometric"),
        }
    }
}

/// Role a muscle group plays in an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MuscleGroupRole {
    Primary,
    Secondary,
}

impl MuscleGroupRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MuscleGroupRole::Primary => "PRIMARY",
            MuscleGroupRole::Secondary => "SECONDARY",
        }
    }
}

impl FromStr for MuscleGroupRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIMARY" => Ok(MuscleGroupRole::Primary),
            "SECONDARY" => Ok(MuscleGroupRole::Secondary),
            other => Err(UnknownVariant::new("MuscleGroupRole", other)),
        }
    }
}

/// Kind of set within an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetType {
    Warmup,
    #[default]
    Working,
}

impl SetType {
    pub fn as_str(self) -> &'static str {
        match self {
            SetType::Warmup => "WARMUP",
            SetType::Working => "WORKING",
        }
    }
}

impl FromStr for SetType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WARMUP" => Ok(SetType::Warmup),
            "WORKING" => Ok(SetType::Working),
            other => Err(UnknownVariant::new("SetType", other)),
        }
    }
}

/// A stored enum value that does not name any known variant.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// A named muscle group (chest, quads, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleGroup {
    pub id: i64,
    pub name: String,
}

impl MuscleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

/// An exercise from the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Surrogate key (0 = unsaved)
    pub id: i64,
    /// Display name
    pub name: String,
    /// Free-form description, empty when unset
    pub description: String,
    /// Performed one side at a time
    pub unilateral: bool,
    /// Measurement kind
    pub exercise_type: ExerciseType,
}

impl Exercise {
    /// Create an unsaved exercise with default description, sidedness and type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: String::new(),
            unilateral: false,
            exercise_type: ExerciseType::default(),
        }
    }
}

/// Association row between an exercise and a muscle group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseMuscleGroup {
    pub exercise_id: i64,
    pub muscle_group_id: i64,
    pub role: MuscleGroupRole,
}

/// A reusable workout template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutModel {
    pub id: i64,
    pub name: String,
}

impl WorkoutModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

/// An exercise slot inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExercise {
    pub id: i64,
    pub workout_model_id: i64,
    pub exercise_id: i64,
    /// Position among the template's exercises
    pub order: i32,
}

/// A planned set inside a template exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    pub id: i64,
    pub model_exercise_id: i64,
    /// Position among the exercise's sets
    pub order: i32,
    pub set_type: SetType,
}

/// A dated, loggable performance of a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    /// Surrogate key (0 = unsaved)
    pub id: i64,
    /// Template this session was started from. Historical reference only:
    /// the template may since have been edited or deleted.
    pub workout_model_id: i64,
    /// Display name
    pub name: String,
    /// Whether the session was finished
    pub completed: bool,
    /// When the session started
    pub start_date: DateTime<Utc>,
    /// When the session ended, if it has
    pub end_date: Option<DateTime<Utc>>,
}

/// An exercise performed during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExercise {
    pub id: i64,
    pub workout_session_id: i64,
    pub exercise_id: i64,
    /// Position among the session's exercises
    pub order: i32,
}

/// A performed (or pending) set during a session.
///
/// `reps`, `weight` and `rir` are `None` until logged. `completed` is set
/// independently of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSet {
    /// Surrogate key (0 = unsaved)
    pub id: i64,
    /// Owning session exercise
    pub session_exercise_id: i64,
    /// Position among the exercise's sets
    pub order: i32,
    /// Warmup or working set
    pub set_type: SetType,
    /// Whether the set was ticked off
    pub completed: bool,
    /// Repetitions performed
    pub reps: Option<i32>,
    /// Load used, in the user's unit
    pub weight: Option<f64>,
    /// Reps in reserve
    pub rir: Option<i32>,
}
