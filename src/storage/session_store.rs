//! Logged workout session storage operations.
//!
//! Mirrors the template store for `workout_sessions`, `session_exercises`
//! and `session_sets`, and adds date-based listings and per-set logging.
//! Listings are newest first.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

use crate::storage::database::{
    contains_pattern, timestamp_from_millis, timestamp_millis, DatabaseError,
};
use crate::storage::exercise_store::{
    exercise_from_row, id_or_null, placeholders, MAX_BOUND_IDS,
};
use crate::storage::model_store::{set_type_from_row, WorkoutModelStore};
use crate::workouts::composite::{
    InsertedAggregate, InsertedChild, NewWorkoutSession, SessionExerciseWithSets,
    WorkoutSessionWithExercises,
};
use crate::workouts::types::{SessionExercise, SessionSet, WorkoutSession};

const SESSION_COLUMNS: &str = "id, workout_model_id, name, completed, start_date, end_date";
const SESSION_SET_COLUMNS: &str =
    "id, session_exercise_id, sort_order, set_type, completed, reps, weight, rir";

/// Workout session store borrowing an open connection.
pub struct WorkoutSessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> WorkoutSessionStore<'a> {
    /// Create a new session store with the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== Root rows ==========

    /// Insert a session row, replacing any row with the same id.
    pub fn insert_workout_session(&self, session: &WorkoutSession) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO workout_sessions
             (id, workout_model_id, name, completed, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id_or_null(session.id),
                session.workout_model_id,
                session.name,
                session.completed,
                timestamp_millis(&session.start_date),
                session.end_date.as_ref().map(timestamp_millis),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update every field of a session row. Returns rows affected.
    pub fn update_workout_session(&self, session: &WorkoutSession) -> Result<usize, DatabaseError> {
        let rows = self.conn.execute(
            "UPDATE workout_sessions SET workout_model_id = ?2, name = ?3, completed = ?4,
             start_date = ?5, end_date = ?6 WHERE id = ?1",
            params![
                session.id,
                session.workout_model_id,
                session.name,
                session.completed,
                timestamp_millis(&session.start_date),
                session.end_date.as_ref().map(timestamp_millis),
            ],
        )?;
        Ok(rows)
    }

    /// Delete a session with its exercises and sets.
    pub fn delete_workout_session(&self, id: i64) -> Result<usize, DatabaseError> {
        let rows = self
            .conn
            .execute("DELETE FROM workout_sessions WHERE id = ?1", params![id])?;
        Ok(rows)
    }

    /// Get a session row by id.
    pub fn get_workout_session(&self, id: i64) -> Result<Option<WorkoutSession>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM workout_sessions WHERE id = ?1", SESSION_COLUMNS),
                params![id],
                session_row,
            )
            .optional()?;

        row.map(SessionRow::into_session).transpose()
    }

    /// All session rows, newest first.
    pub fn list_workout_sessions(&self) -> Result<Vec<WorkoutSession>, DatabaseError> {
        self.query_sessions(
            &format!(
                "SELECT {} FROM workout_sessions ORDER BY start_date DESC, id DESC",
                SESSION_COLUMNS
            ),
            params![],
        )
    }

    /// All sessions with exercises and sets, newest first.
    pub fn list_workout_sessions_with_exercises(
        &self,
    ) -> Result<Vec<WorkoutSessionWithExercises>, DatabaseError> {
        let sessions = self.list_workout_sessions()?;
        self.assemble(sessions)
    }

    /// A session with its ordered exercises and sets.
    pub fn get_workout_session_with_exercises(
        &self,
        id: i64,
    ) -> Result<Option<WorkoutSessionWithExercises>, DatabaseError> {
        match self.get_workout_session(id)? {
            Some(session) => Ok(self.assemble(vec![session])?.pop()),
            None => Ok(None),
        }
    }

    /// Sessions started from the given template, newest first.
    pub fn sessions_by_model(
        &self,
        workout_model_id: i64,
    ) -> Result<Vec<WorkoutSessionWithExercises>, DatabaseError> {
        let sessions = self.query_sessions(
            &format!(
                "SELECT {} FROM workout_sessions WHERE workout_model_id = ?1
                 ORDER BY start_date DESC, id DESC",
                SESSION_COLUMNS
            ),
            params![workout_model_id],
        )?;
        self.assemble(sessions)
    }

    /// Sessions whose start lies in `[start, end]`, newest first.
    pub fn sessions_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkoutSessionWithExercises>, DatabaseError> {
        let sessions = self.query_sessions(
            &format!(
                "SELECT {} FROM workout_sessions WHERE start_date BETWEEN ?1 AND ?2
                 ORDER BY start_date DESC, id DESC",
                SESSION_COLUMNS
            ),
            params![timestamp_millis(&start), timestamp_millis(&end)],
        )?;
        self.assemble(sessions)
    }

    /// The `limit` most recent sessions.
    pub fn recent_sessions(
        &self,
        limit: usize,
    ) -> Result<Vec<WorkoutSessionWithExercises>, DatabaseError> {
        let sessions = self.query_sessions(
            &format!(
                "SELECT {} FROM workout_sessions ORDER BY start_date DESC, id DESC LIMIT ?1",
                SESSION_COLUMNS
            ),
            params![i64::try_from(limit).unwrap_or(i64::MAX)],
        )?;
        self.assemble(sessions)
    }

    /// Sessions whose name contains `term` (case-insensitive), newest first.
    pub fn search_workout_sessions(
        &self,
        term: &str,
    ) -> Result<Vec<WorkoutSessionWithExercises>, DatabaseError> {
        let sessions = self.query_sessions(
            &format!(
                "SELECT {} FROM workout_sessions WHERE name LIKE ?1 ESCAPE '\\'
                 ORDER BY start_date DESC, id DESC",
                SESSION_COLUMNS
            ),
            params![contains_pattern(term)],
        )?;
        self.assemble(sessions)
    }

    // ========== Children ==========

    /// Insert a session exercise, replacing any row with the same id.
    pub fn insert_session_exercise(
        &self,
        exercise: &SessionExercise,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session_exercises
             (id, workout_session_id, exercise_id, sort_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id_or_null(exercise.id),
                exercise.workout_session_id,
                exercise.exercise_id,
                exercise.order,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a session set, replacing any row with the same id.
    pub fn insert_session_set(&self, set: &SessionSet) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session_sets
             (id, session_exercise_id, sort_order, set_type, completed, reps, weight, rir)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id_or_null(set.id),
                set.session_exercise_id,
                set.order,
                set.set_type.as_str(),
                set.completed,
                set.reps,
                set.weight,
                set.rir,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a session set by id.
    pub fn get_session_set(&self, id: i64) -> Result<Option<SessionSet>, DatabaseError> {
        let set = self
            .conn
            .query_row(
                &format!("SELECT {} FROM session_sets WHERE id = ?1", SESSION_SET_COLUMNS),
                params![id],
                |row| session_set_from_row(row, 0),
            )
            .optional()?;
        Ok(set)
    }

    /// Update every field of a session set. Returns rows affected.
    pub fn update_session_set(&self, set: &SessionSet) -> Result<usize, DatabaseError> {
        let rows = self.conn.execute(
            "UPDATE session_sets SET session_exercise_id = ?2, sort_order = ?3, set_type = ?4,
             completed = ?5, reps = ?6, weight = ?7, rir = ?8 WHERE id = ?1",
            params![
                set.id,
                set.session_exercise_id,
                set.order,
                set.set_type.as_str(),
                set.completed,
                set.reps,
                set.weight,
                set.rir,
            ],
        )?;
        Ok(rows)
    }

    /// Delete a session set.
    pub fn delete_session_set(&self, id: i64) -> Result<usize, DatabaseError> {
        let rows = self
            .conn
            .execute("DELETE FROM session_sets WHERE id = ?1", params![id])?;
        Ok(rows)
    }

    /// Overwrite the logged performance of one set.
    ///
    /// All three fields are written; `None` stores NULL.
    pub fn update_session_set_performance(
        &self,
        id: i64,
        reps: Option<i32>,
        weight: Option<f64>,
        rir: Option<i32>,
    ) -> Result<usize, DatabaseError> {
        let rows = self.conn.execute(
            "UPDATE session_sets SET reps = ?2, weight = ?3, rir = ?4 WHERE id = ?1",
            params![id, reps, weight, rir],
        )?;
        Ok(rows)
    }

    /// Mark one set completed, leaving its performance fields alone.
    pub fn mark_session_set_completed(&self, id: i64) -> Result<usize, DatabaseError> {
        let rows = self.conn.execute(
            "UPDATE session_sets SET completed = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(rows)
    }

    // ========== Composite inserts ==========

    /// Insert a session with its exercises and sets in one transaction.
    ///
    /// Generated ids are returned in the same positions as the drafts.
    pub fn insert_complete_workout_session(
        &self,
        session: &NewWorkoutSession,
    ) -> Result<InsertedAggregate, DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let inserted = write_session(&tx, session)?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::debug!(
            "Inserted workout session {} with {} exercises and {} sets",
            inserted.root_id,
            inserted.children.len(),
            inserted.total_sets()
        );
        Ok(inserted)
    }

    /// Insert a session from flat, unlinked rows in one transaction.
    ///
    /// Same pairing rule as
    /// [`WorkoutModelStore::insert_complete_workout_model_flat`]: each set
    /// follows its provisional parent's `order` to the newly inserted
    /// exercise, and sets that cannot be paired are skipped.
    pub fn insert_complete_workout_session_flat(
        &self,
        session: &WorkoutSession,
        exercises: &[SessionExercise],
        sets: &[SessionSet],
    ) -> Result<i64, DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        let store = WorkoutSessionStore::new(&tx);

        let session_id = store.insert_workout_session(session)?;

        let mut inserted: Vec<(i32, i64)> = Vec::with_capacity(exercises.len());
        for exercise in exercises {
            let id = store.insert_session_exercise(&SessionExercise {
                id: 0,
                workout_session_id: session_id,
                ..exercise.clone()
            })?;
            inserted.push((exercise.order, id));
        }

        let mut skipped = 0usize;
        for set in sets {
            let parent = exercises
                .iter()
                .find(|e| e.id == set.session_exercise_id)
                .and_then(|supplied| inserted.iter().find(|(order, _)| *order == supplied.order));

            match parent {
                Some(&(_, session_exercise_id)) => {
                    store.insert_session_set(&SessionSet {
                        id: 0,
                        session_exercise_id,
                        ..set.clone()
                    })?;
                }
                None => {
                    skipped += 1;
                    tracing::warn!(
                        "Skipping session set (order {}): no exercise matches provisional parent {}",
                        set.order,
                        set.session_exercise_id
                    );
                }
            }
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::debug!(
            "Inserted workout session {} with {} exercises, {} sets skipped",
            session_id,
            inserted.len(),
            skipped
        );
        Ok(session_id)
    }

    /// Start a new session that copies a template's exercises and sets.
    ///
    /// The template is read and the session written in one transaction.
    /// Copied sets are not completed and have no performance logged.
    /// Returns `None` if the template does not exist.
    pub fn start_session_from_model(
        &self,
        workout_model_id: i64,
        name: &str,
        start_date: DateTime<Utc>,
    ) -> Result<Option<InsertedAggregate>, DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let template =
            match WorkoutModelStore::new(&tx).get_workout_model_with_exercises(workout_model_id)? {
                Some(template) => template,
                None => return Ok(None),
            };

        let draft = NewWorkoutSession::from_template(&template, name, start_date);
        let inserted = write_session(&tx, &draft)?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::debug!(
            "Started workout session {} from template {} with {} sets",
            inserted.root_id,
            workout_model_id,
            inserted.total_sets()
        );
        Ok(Some(inserted))
    }

    // ========== Helpers ==========

    fn query_sessions(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<WorkoutSession>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, session_row)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_session()?);
        }
        Ok(sessions)
    }

    /// Attach exercises and sets to `sessions`, keeping their order.
    fn assemble(
        &self,
        sessions: Vec<WorkoutSession>,
    ) -> Result<Vec<WorkoutSessionWithExercises>, DatabaseError> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let root_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
        let mut sets_by_exercise: HashMap<i64, Vec<SessionSet>> = HashMap::new();
        let mut exercises_by_session: HashMap<i64, Vec<SessionExerciseWithSets>> = HashMap::new();

        for session_ids in root_ids.chunks(MAX_BOUND_IDS) {
            let in_list = placeholders(session_ids.len());

            {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT ss.id, ss.session_exercise_id, ss.sort_order, ss.set_type, ss.completed,
                            ss.reps, ss.weight, ss.rir
                     FROM session_sets ss
                     JOIN session_exercises se ON se.id = ss.session_exercise_id
                     WHERE se.workout_session_id IN ({})
                     ORDER BY ss.sort_order ASC, ss.id ASC",
                    in_list
                ))?;
                let rows = stmt.query_map(rusqlite::params_from_iter(session_ids.iter()), |row| {
                    session_set_from_row(row, 0)
                })?;
                for row in rows {
                    let set = row?;
                    sets_by_exercise
                        .entry(set.session_exercise_id)
                        .or_default()
                        .push(set);
                }
            }

            {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT se.id, se.workout_session_id, se.exercise_id, se.sort_order,
                            e.id, e.name, e.description, e.unilateral, e.exercise_type
                     FROM session_exercises se
                     JOIN exercises e ON e.id = se.exercise_id
                     WHERE se.workout_session_id IN ({})
                     ORDER BY se.sort_order ASC, se.id ASC",
                    in_list
                ))?;
                let rows = stmt.query_map(rusqlite::params_from_iter(session_ids.iter()), |row| {
                    Ok((
                        SessionExercise {
                            id: row.get(0)?,
                            workout_session_id: row.get(1)?,
                            exercise_id: row.get(2)?,
                            order: row.get(3)?,
                        },
                        exercise_from_row(row, 4)?,
                    ))
                })?;
                for row in rows {
                    let (session_exercise, exercise) = row?;
                    let session_sets = sets_by_exercise
                        .remove(&session_exercise.id)
                        .unwrap_or_default();
                    exercises_by_session
                        .entry(session_exercise.workout_session_id)
                        .or_default()
                        .push(SessionExerciseWithSets {
                            session_exercise,
                            exercise,
                            session_sets,
                        });
                }
            }
        }

        Ok(sessions
            .into_iter()
            .map(|workout_session| {
                let exercises = exercises_by_session
                    .remove(&workout_session.id)
                    .unwrap_or_default();
                WorkoutSessionWithExercises {
                    workout_session,
                    exercises,
                }
            })
            .collect())
    }
}

/// Write a drafted session and its children. The caller owns the
/// transaction.
fn write_session(
    conn: &Connection,
    session: &NewWorkoutSession,
) -> Result<InsertedAggregate, DatabaseError> {
    conn.execute(
        "INSERT INTO workout_sessions (workout_model_id, name, completed, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session.workout_model_id,
            session.name,
            session.completed,
            timestamp_millis(&session.start_date),
            session.end_date.as_ref().map(timestamp_millis),
        ],
    )?;
    let root_id = conn.last_insert_rowid();

    let mut children = Vec::with_capacity(session.exercises.len());
    {
        let mut insert_exercise = conn.prepare(
            "INSERT INTO session_exercises (workout_session_id, exercise_id, sort_order)
             VALUES (?1, ?2, ?3)",
        )?;
        let mut insert_set = conn.prepare(
            "INSERT INTO session_sets
             (session_exercise_id, sort_order, set_type, completed, reps, weight, rir)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for draft in &session.exercises {
            let child_id =
                insert_exercise.insert(params![root_id, draft.exercise_id, draft.order])?;

            let mut set_ids = Vec::with_capacity(draft.sets.len());
            for set in &draft.sets {
                set_ids.push(insert_set.insert(params![
                    child_id,
                    set.order,
                    set.set_type.as_str(),
                    set.completed,
                    set.reps,
                    set.weight,
                    set.rir,
                ])?);
            }

            children.push(InsertedChild {
                id: child_id,
                set_ids,
            });
        }
    }

    Ok(InsertedAggregate { root_id, children })
}

/// Intermediate struct for reading session rows from database.
struct SessionRow {
    id: i64,
    workout_model_id: i64,
    name: String,
    completed: bool,
    start_date: i64,
    end_date: Option<i64>,
}

impl SessionRow {
    fn into_session(self) -> Result<WorkoutSession, DatabaseError> {
        let start_date = timestamp_from_millis(self.start_date)?;
        let end_date = self.end_date.map(timestamp_from_millis).transpose()?;

        Ok(WorkoutSession {
            id: self.id,
            workout_model_id: self.workout_model_id,
            name: self.name,
            completed: self.completed,
            start_date,
            end_date,
        })
    }
}

fn session_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        workout_model_id: row.get(1)?,
        name: row.get(2)?,
        completed: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
    })
}

fn session_set_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<SessionSet> {
    Ok(SessionSet {
        id: row.get(offset)?,
        session_exercise_id: row.get(offset + 1)?,
        order: row.get(offset + 2)?,
        set_type: set_type_from_row(row, offset + 3)?,
        completed: row.get(offset + 4)?,
        reps: row.get(offset + 5)?,
        weight: row.get(offset + 6)?,
        rir: row.get(offset + 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::workouts::composite::{
        ModelExerciseDraft, NewWorkoutModel, SessionExerciseDraft, SessionSetDraft,
    };
    use crate::workouts::fixtures;
    use crate::workouts::types::{Exercise, SetType, WorkoutModel};
    use chrono::TimeZone;

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn seed_exercises(db: &Database, count: usize) -> Vec<i64> {
        (1..=count)
            .map(|i| {
                db.exercises()
                    .insert_exercise(&Exercise::new(format!("Exercise {}", i)))
                    .unwrap()
            })
            .collect()
    }

    fn session_draft(exercise_ids: &[i64], set_count: usize) -> NewWorkoutSession {
        NewWorkoutSession {
            workout_model_id: 1,
            name: "Monday Workout".to_string(),
            completed: false,
            start_date: date(2025, 1, 6),
            end_date: None,
            exercises: exercise_ids
                .iter()
                .enumerate()
                .map(|(i, &exercise_id)| SessionExerciseDraft {
                    exercise_id,
                    order: i as i32,
                    sets: (0..set_count)
                        .map(|s| SessionSetDraft {
                            order: s as i32,
                            ..Default::default()
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_insert_and_get_workout_session() {
        let db = Database::open_in_memory().expect("Failed to create database");
        let store = db.workout_sessions();

        let mut session = fixtures::workout_session(0, 1, "Monday Workout", date(2025, 1, 6));
        session.end_date = Some(date(2025, 1, 6) + chrono::Duration::minutes(75));

        let id = store.insert_workout_session(&session).expect("Failed to insert");
        let retrieved = store
            .get_workout_session(id)
            .expect("Failed to get")
            .expect("Session not found");

        assert_eq!(retrieved.id, id);
        assert_eq!(retrieved.name, "Monday Workout");
        assert_eq!(retrieved.workout_model_id, 1);
        assert!(retrieved.completed);
        assert_eq!(retrieved.start_date, session.start_date);
        assert_eq!(retrieved.end_date, session.end_date);
    }

    #[test]
    fn test_sessions_ordered_by_start_date_desc() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        store
            .insert_workout_session(&fixtures::workout_session(0, 1, "Oldest", date(2025, 1, 1)))
            .unwrap();
        store
            .insert_workout_session(&fixtures::workout_session(0, 1, "Newest", date(2025, 1, 3)))
            .unwrap();
        store
            .insert_workout_session(&fixtures::workout_session(0, 1, "Middle", date(2025, 1, 2)))
            .unwrap();

        let names: Vec<String> = store
            .list_workout_sessions()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Newest", "Middle", "Oldest"]);
    }

    #[test]
    fn test_sessions_by_date_range_inclusive() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        for (name, day) in [
            ("Jan 1", date(2024, 1, 1)),
            ("Jan 15", date(2024, 1, 15)),
            ("Jan 31", date(2024, 1, 31)),
            ("Feb 15", date(2024, 2, 15)),
        ] {
            store
                .insert_workout_session(&fixtures::workout_session(0, 1, name, day))
                .unwrap();
        }

        let january = store
            .sessions_by_date_range(date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        let names: Vec<&str> = january
            .iter()
            .map(|s| s.workout_session.name.as_str())
            .collect();
        assert_eq!(names, vec!["Jan 31", "Jan 15", "Jan 1"]);
    }

    #[test]
    fn test_sessions_by_model_and_recent() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        for day in 1..=6 {
            let model_id = if day % 2 == 0 { 2 } else { 3 };
            store
                .insert_workout_session(&fixtures::workout_session(
                    0,
                    model_id,
                    &format!("Day {}", day),
                    date(2024, 3, day),
                ))
                .unwrap();
        }

        let even = store.sessions_by_model(2).unwrap();
        let names: Vec<&str> = even.iter().map(|s| s.workout_session.name.as_str()).collect();
        assert_eq!(names, vec!["Day 6", "Day 4", "Day 2"]);

        let recent = store.recent_sessions(2).unwrap();
        let names: Vec<&str> = recent
            .iter()
            .map(|s| s.workout_session.name.as_str())
            .collect();
        assert_eq!(names, vec!["Day 6", "Day 5"]);

        assert!(store.recent_sessions(0).unwrap().is_empty());
        assert!(store.sessions_by_model(99).unwrap().is_empty());
    }

    #[test]
    fn test_search_workout_sessions() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        for (name, day) in [("Push Day", 1), ("Pull Day", 2), ("Leg Day", 3)] {
            store
                .insert_workout_session(&fixtures::workout_session(0, 1, name, date(2024, 5, day)))
                .unwrap();
        }

        let days = store.search_workout_sessions("Day").unwrap();
        let names: Vec<&str> = days.iter().map(|s| s.workout_session.name.as_str()).collect();
        assert_eq!(names, vec!["Leg Day", "Pull Day", "Push Day"]);

        let push = store.search_workout_sessions("Push").unwrap();
        assert_eq!(push.len(), 1);
        assert_eq!(push[0].workout_session.name, "Push Day");
    }

    #[test]
    fn test_update_and_delete_workout_session() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);
        let store = db.workout_sessions();

        let inserted = store
            .insert_complete_workout_session(&session_draft(&ids, 2))
            .unwrap();
        let mut session = store.get_workout_session(inserted.root_id).unwrap().unwrap();

        session.completed = true;
        session.end_date = Some(session.start_date + chrono::Duration::hours(1));
        assert_eq!(store.update_workout_session(&session).unwrap(), 1);
        assert_eq!(
            store.get_workout_session(inserted.root_id).unwrap().unwrap(),
            session
        );

        assert_eq!(store.delete_workout_session(inserted.root_id).unwrap(), 1);
        assert!(store.get_workout_session(inserted.root_id).unwrap().is_none());
        assert_eq!(db.count_rows("session_exercises").unwrap(), 0);
        assert_eq!(db.count_rows("session_sets").unwrap(), 0);
    }

    #[test]
    fn test_composite_insert_n_by_m() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 3);
        let store = db.workout_sessions();

        let inserted = store
            .insert_complete_workout_session(&session_draft(&ids, 4))
            .unwrap();

        let loaded = store
            .get_workout_session_with_exercises(inserted.root_id)
            .unwrap()
            .expect("Session not found");
        assert_eq!(loaded.exercises.len(), 3);
        assert!(loaded.exercises.iter().all(|e| e.session_sets.len() == 4));
        assert_eq!(loaded.total_sets(), 12);
        assert_eq!(loaded.completed_sets(), 0);
    }

    #[test]
    fn test_empty_session_has_empty_children() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        let inserted = store
            .insert_complete_workout_session(&session_draft(&[], 0))
            .unwrap();
        assert!(inserted.children.is_empty());

        let loaded = store
            .get_workout_session_with_exercises(inserted.root_id)
            .unwrap()
            .unwrap();
        assert!(loaded.exercises.is_empty());
    }

    #[test]
    fn test_update_session_set_performance_touches_one_set() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 2);
        let store = db.workout_sessions();

        let inserted = store
            .insert_complete_workout_session(&session_draft(&ids, 3))
            .unwrap();
        let before = store
            .get_workout_session_with_exercises(inserted.root_id)
            .unwrap()
            .unwrap();

        let target = inserted.children[1].set_ids[2];
        assert_eq!(
            store
                .update_session_set_performance(target, Some(5), Some(102.5), Some(1))
                .unwrap(),
            1
        );

        let after = store
            .get_workout_session_with_exercises(inserted.root_id)
            .unwrap()
            .unwrap();

        for (old, new) in before.exercises.iter().zip(after.exercises.iter()) {
            for (old_set, new_set) in old.session_sets.iter().zip(new.session_sets.iter()) {
                if new_set.id == target {
                    assert_eq!(new_set.reps, Some(5));
                    assert_eq!(new_set.weight, Some(102.5));
                    assert_eq!(new_set.rir, Some(1));
                    assert_eq!(new_set.completed, old_set.completed);
                    assert_eq!(new_set.set_type, old_set.set_type);
                } else {
                    assert_eq!(new_set, old_set);
                }
            }
        }
    }

    #[test]
    fn test_update_session_set_performance_writes_nulls() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);
        let store = db.workout_sessions();

        let inserted = store
            .insert_complete_workout_session(&session_draft(&ids, 1))
            .unwrap();
        let set_id = inserted.children[0].set_ids[0];

        store
            .update_session_set_performance(set_id, Some(10), Some(40.0), Some(3))
            .unwrap();
        store
            .update_session_set_performance(set_id, None, Some(42.5), None)
            .unwrap();

        let set = store.get_session_set(set_id).unwrap().unwrap();
        assert_eq!(set.reps, None);
        assert_eq!(set.weight, Some(42.5));
        assert_eq!(set.rir, None);
    }

    #[test]
    fn test_mark_session_set_completed() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);
        let store = db.workout_sessions();

        let inserted = store
            .insert_complete_workout_session(&session_draft(&ids, 2))
            .unwrap();
        let set_id = inserted.children[0].set_ids[0];
        store
            .update_session_set_performance(set_id, Some(8), Some(60.0), Some(2))
            .unwrap();

        assert_eq!(store.mark_session_set_completed(set_id).unwrap(), 1);

        let set = store.get_session_set(set_id).unwrap().unwrap();
        assert!(set.completed);
        assert_eq!(set.reps, Some(8));
        assert_eq!(set.weight, Some(60.0));
        assert_eq!(set.rir, Some(2));

        let other = store
            .get_session_set(inserted.children[0].set_ids[1])
            .unwrap()
            .unwrap();
        assert!(!other.completed);

        assert_eq!(store.mark_session_set_completed(9999).unwrap(), 0);
    }

    #[test]
    fn test_update_and_delete_session_set() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);
        let store = db.workout_sessions();

        let inserted = store
            .insert_complete_workout_session(&session_draft(&ids, 2))
            .unwrap();
        let set_id = inserted.children[0].set_ids[0];

        let mut set = store.get_session_set(set_id).unwrap().unwrap();
        set.set_type = SetType::Warmup;
        set.completed = true;
        set.reps = Some(12);
        assert_eq!(store.update_session_set(&set).unwrap(), 1);
        assert_eq!(store.get_session_set(set_id).unwrap().unwrap(), set);

        assert_eq!(store.delete_session_set(set_id).unwrap(), 1);
        assert!(store.get_session_set(set_id).unwrap().is_none());
        assert_eq!(db.count_rows("session_sets").unwrap(), 1);
    }

    #[test]
    fn test_flat_insert_session() {
        let db = Database::open_in_memory().unwrap();
        let logged = fixtures::workout_session_with_exercises(date(2024, 6, 1), 2, 3);
        for child in &logged.exercises {
            db.exercises().insert_exercise(&child.exercise).unwrap();
        }

        let (session, exercises, sets) = fixtures::flatten_workout_session(&logged);
        let store = db.workout_sessions();
        let id = store
            .insert_complete_workout_session_flat(&session, &exercises, &sets)
            .unwrap();

        let loaded = store.get_workout_session_with_exercises(id).unwrap().unwrap();
        assert_eq!(loaded.exercises.len(), 2);
        assert_eq!(loaded.total_sets(), 6);
        assert_eq!(loaded.completed_sets(), 6);
        assert_eq!(loaded.exercises[0].session_sets[0].weight, Some(60.0));
    }

    #[test]
    fn test_deleting_model_keeps_sessions() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);

        let model_id = db
            .workout_models()
            .insert_workout_model(&WorkoutModel::new("Push Day"))
            .unwrap();

        let mut draft = session_draft(&ids, 1);
        draft.workout_model_id = model_id;
        let inserted = db
            .workout_sessions()
            .insert_complete_workout_session(&draft)
            .unwrap();

        db.workout_models().delete_workout_model(model_id).unwrap();

        let session = db
            .workout_sessions()
            .get_workout_session_with_exercises(inserted.root_id)
            .unwrap()
            .expect("Session should survive template deletion");
        assert_eq!(session.workout_session.workout_model_id, model_id);
        assert_eq!(session.total_sets(), 1);
    }

    #[test]
    fn test_start_session_from_model_copies_plan() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 2);

        let template = db
            .workout_models()
            .insert_complete_workout_model(&NewWorkoutModel {
                name: "Pull Day".to_string(),
                exercises: ids
                    .iter()
                    .enumerate()
                    .map(|(i, &id)| ModelExerciseDraft::with_working_sets(id, i as i32, 3))
                    .collect(),
            })
            .unwrap();

        let store = db.workout_sessions();
        let started = store
            .start_session_from_model(template.root_id, "Pull Day #1", date(2024, 7, 1))
            .unwrap()
            .expect("Template exists");

        let session = store
            .get_workout_session_with_exercises(started.root_id)
            .unwrap()
            .unwrap();
        assert_eq!(session.workout_session.workout_model_id, template.root_id);
        assert!(!session.workout_session.completed);
        assert_eq!(session.exercises.len(), 2);
        assert_eq!(session.total_sets(), 6);
        assert!(session
            .exercises
            .iter()
            .flat_map(|e| e.session_sets.iter())
            .all(|s| !s.completed && s.reps.is_none() && s.weight.is_none() && s.rir.is_none()));

        assert!(store
            .start_session_from_model(9999, "Nothing", date(2024, 7, 2))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_start_session_from_missing_model_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        let started = store
            .start_session_from_model(42, "Nothing", date(2024, 7, 2))
            .unwrap();
        assert!(started.is_none());
        assert_eq!(db.count_rows("workout_sessions").unwrap(), 0);

        // The read transaction was released, so later writes still work
        let ids = seed_exercises(&db, 1);
        store
            .insert_complete_workout_session(&session_draft(&ids, 1))
            .unwrap();
        assert_eq!(db.count_rows("workout_sessions").unwrap(), 1);
    }

    #[test]
    fn test_composite_insert_rolls_back_on_missing_exercise() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);
        let store = db.workout_sessions();

        let result = store.insert_complete_workout_session(&session_draft(&[ids[0], 4242], 3));

        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
        assert_eq!(db.count_rows("workout_sessions").unwrap(), 0);
        assert_eq!(db.count_rows("session_exercises").unwrap(), 0);
        assert_eq!(db.count_rows("session_sets").unwrap(), 0);
    }

    #[test]
    fn test_flat_insert_rolls_back_on_missing_exercise() {
        let db = Database::open_in_memory().unwrap();
        let logged = fixtures::workout_session_with_exercises(date(2024, 6, 1), 2, 2);
        // Only the first exercise exists
        db.exercises()
            .insert_exercise(&logged.exercises[0].exercise)
            .unwrap();

        let (session, exercises, sets) = fixtures::flatten_workout_session(&logged);
        let result = db
            .workout_sessions()
            .insert_complete_workout_session_flat(&session, &exercises, &sets);

        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
        assert_eq!(db.count_rows("workout_sessions").unwrap(), 0);
        assert_eq!(db.count_rows("session_exercises").unwrap(), 0);
        assert_eq!(db.count_rows("session_sets").unwrap(), 0);
    }

    #[test]
    fn test_flat_insert_skips_unresolvable_sets() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);
        let store = db.workout_sessions();

        let exercises = vec![fixtures::session_exercise(7, 0, ids[0], 0)];
        let sets = vec![
            fixtures::session_set(1, 7, 0),
            fixtures::session_set(2, 8, 1),
        ];

        let id = store
            .insert_complete_workout_session_flat(
                &fixtures::workout_session(0, 1, "Partial", date(2024, 6, 3)),
                &exercises,
                &sets,
            )
            .unwrap();

        let loaded = store.get_workout_session_with_exercises(id).unwrap().unwrap();
        assert_eq!(loaded.exercises.len(), 1);
        assert_eq!(loaded.total_sets(), 1);
        assert_eq!(loaded.exercises[0].session_sets[0].order, 0);
        assert_eq!(db.count_rows("session_sets").unwrap(), 1);
    }

    #[test]
    fn test_dates_past_year_9999_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        store
            .insert_workout_session(&fixtures::workout_session(0, 1, "Now", date(2024, 1, 1)))
            .unwrap();
        let far_id = store
            .insert_workout_session(&WorkoutSession {
                end_date: Some(far + chrono::Duration::hours(1)),
                ..fixtures::workout_session(0, 1, "Far future", far)
            })
            .unwrap();

        let names: Vec<String> = store
            .list_workout_sessions()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Far future", "Now"]);

        let loaded = store.get_workout_session(far_id).unwrap().unwrap();
        assert_eq!(loaded.start_date, far);
        assert_eq!(loaded.end_date, Some(far + chrono::Duration::hours(1)));

        let range = store
            .sessions_by_date_range(date(2023, 1, 1), date(2025, 1, 1))
            .unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range[0].workout_session.name, "Now");
    }

    #[test]
    fn test_recent_sessions_with_unbounded_limit() {
        let db = Database::open_in_memory().unwrap();
        let store = db.workout_sessions();

        for day in 1..=3 {
            store
                .insert_workout_session(&fixtures::workout_session(
                    0,
                    1,
                    &format!("Day {}", day),
                    date(2024, 8, day),
                ))
                .unwrap();
        }

        let all = store.recent_sessions(usize::MAX).unwrap();
        let names: Vec<&str> = all.iter().map(|s| s.workout_session.name.as_str()).collect();
        assert_eq!(names, vec!["Day 3", "Day 2", "Day 1"]);
    }

    #[test]
    fn test_list_with_exercises_beyond_parameter_limit() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed_exercises(&db, 1);
        let count = 33_000;
        let first = date(2000, 1, 1);

        let tx = db.connection().unchecked_transaction().unwrap();
        let store = WorkoutSessionStore::new(&tx);
        for i in 0..count {
            let session_id = store
                .insert_workout_session(&fixtures::workout_session(
                    0,
                    1,
                    &format!("Session {:05}", i),
                    first + chrono::Duration::hours(i),
                ))
                .unwrap();
            if i % 1000 == 0 {
                let exercise_id = store
                    .insert_session_exercise(&fixtures::session_exercise(0, session_id, ids[0], 0))
                    .unwrap();
                store
                    .insert_session_set(&fixtures::session_set(0, exercise_id, 0))
                    .unwrap();
            }
        }
        tx.commit().unwrap();

        let all = db
            .workout_sessions()
            .list_workout_sessions_with_exercises()
            .unwrap();
        assert_eq!(all.len(), count as usize);
        assert_eq!(all[0].workout_session.name, "Session 32999");
        assert_eq!(all.iter().map(|s| s.total_sets()).sum::<usize>(), 33);
        assert_eq!(all[32_999].workout_session.name, "Session 00000");
        assert_eq!(all[32_999].exercises.len(), 1);
    }
}
