//! Database schema definitions.
//!
//! Sibling rows carry a `sort_order` column; it is the only presentation
//! key and is deliberately not unique.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Muscle groups table
CREATE TABLE IF NOT EXISTS muscle_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

-- Exercise library
CREATE TABLE IF NOT EXISTS exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    unilateral INTEGER NOT NULL DEFAULT 0,
    exercise_type INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_exercises_name ON exercises(name);

-- Exercise <-> muscle group association
CREATE TABLE IF NOT EXISTS exercise_muscle_groups (
    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    muscle_group_id INTEGER NOT NULL REFERENCES muscle_groups(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('PRIMARY', 'SECONDARY')),
    PRIMARY KEY (exercise_id, muscle_group_id)
);

CREATE INDEX IF NOT EXISTS idx_exercise_muscle_groups_exercise ON exercise_muscle_groups(exercise_id);
CREATE INDEX IF NOT EXISTS idx_exercise_muscle_groups_muscle ON exercise_muscle_groups(muscle_group_id);

-- Workout templates
CREATE TABLE IF NOT EXISTS workout_models (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS model_exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workout_model_id INTEGER NOT NULL REFERENCES workout_models(id) ON DELETE CASCADE,
    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    sort_order INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_model_exercises_model ON model_exercises(workout_model_id, sort_order);
CREATE INDEX IF NOT EXISTS idx_model_exercises_exercise ON model_exercises(exercise_id);

CREATE TABLE IF NOT EXISTS model_sets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_exercise_id INTEGER NOT NULL REFERENCES model_exercises(id) ON DELETE CASCADE,
    sort_order INTEGER NOT NULL,
    set_type TEXT NOT NULL CHECK (set_type IN ('WARMUP', 'WORKING'))
);

CREATE INDEX IF NOT EXISTS idx_model_sets_exercise ON model_sets(model_exercise_id, sort_order);

-- Logged sessions. workout_model_id is a historical value, not a foreign key:
-- deleting a template must leave its sessions in place.
CREATE TABLE IF NOT EXISTS workout_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workout_model_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    start_date INTEGER NOT NULL,
    end_date INTEGER
);

CREATE INDEX IF NOT EXISTS idx_workout_sessions_start ON workout_sessions(start_date);
CREATE INDEX IF NOT EXISTS idx_workout_sessions_model ON workout_sessions(workout_model_id, start_date);

CREATE TABLE IF NOT EXISTS session_exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workout_session_id INTEGER NOT NULL REFERENCES workout_sessions(id) ON DELETE CASCADE,
    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    sort_order INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_session_exercises_session ON session_exercises(workout_session_id, sort_order);
CREATE INDEX IF NOT EXISTS idx_session_exercises_exercise ON session_exercises(exercise_id);

CREATE TABLE IF NOT EXISTS session_sets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_exercise_id INTEGER NOT NULL REFERENCES session_exercises(id) ON DELETE CASCADE,
    sort_order INTEGER NOT NULL,
    set_type TEXT NOT NULL CHECK (set_type IN ('WARMUP', 'WORKING')),
    completed INTEGER NOT NULL DEFAULT 0,
    reps INTEGER,
    weight REAL,
    rir INTEGER
);

CREATE INDEX IF NOT EXISTS idx_session_sets_exercise ON session_sets(session_exercise_id, sort_order);
"#;

/// SQL for schema version tracking (migrations)
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// Connection-level settings applied on every open.
///
/// Foreign keys are off by default in SQLite; the cascade rules above do
/// nothing without them.
pub const CONNECTION_PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA synchronous = NORMAL;
"#;

/// Every table created by [`SCHEMA`], leaves first.
pub const TABLES: &[&str] = &[
    "muscle_groups",
    "exercises",
    "exercise_muscle_groups",
    "workout_models",
    "model_exercises",
    "model_sets",
    "workout_sessions",
    "session_exercises",
    "session_sets",
];
