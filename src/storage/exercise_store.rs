//! Exercise library storage operations.
//!
//! Provides persistence for:
//! - Exercises (CRUD, listing, search, filter by type)
//! - Muscle groups and their role-tagged links to exercises

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

use crate::storage::database::{contains_pattern, DatabaseError};
use crate::workouts::composite::{ExerciseWithMuscleGroups, TaggedMuscleGroup};
use crate::workouts::types::{
    Exercise, ExerciseMuscleGroup, ExerciseType, MuscleGroup, MuscleGroupRole,
};

/// Column list matching [`exercise_from_row`].
pub(crate) const EXERCISE_COLUMNS: &str = "id, name, description, unilateral, exercise_type";

/// Exercise store borrowing an open connection.
pub struct ExerciseStore<'a> {
    conn: &'a Connection,
}

impl<'a> ExerciseStore<'a> {
    /// Create a new exercise store with the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== Exercises ==========

    /// Insert an exercise, replacing any row with the same id.
    ///
    /// Returns the row id (generated when `exercise.id` is 0).
    pub fn insert_exercise(&self, exercise: &Exercise) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO exercises (id, name, description, unilateral, exercise_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id_or_null(exercise.id),
                exercise.name,
                exercise.description,
                exercise.unilateral,
                exercise.exercise_type.value(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Update every field of an existing exercise. Returns rows affected.
    pub fn update_exercise(&self, exercise: &Exercise) -> Result<usize, DatabaseError> {
        let rows = self.conn.execute(
            "UPDATE exercises SET name = ?2, description = ?3, unilateral = ?4, exercise_type = ?5
             WHERE id = ?1",
            params![
                exercise.id,
                exercise.name,
                exercise.description,
                exercise.unilateral,
                exercise.exercise_type.value(),
            ],
        )?;

        Ok(rows)
    }

    /// Delete an exercise. Template and session entries using it and its
    /// muscle group links go with it.
    pub fn delete_exercise(&self, id: i64) -> Result<usize, DatabaseError> {
        let rows = self
            .conn
            .execute("DELETE FROM exercises WHERE id = ?1", params![id])?;
        Ok(rows)
    }

    /// Get an exercise by id.
    pub fn get_exercise(&self, id: i64) -> Result<Option<Exercise>, DatabaseError> {
        let exercise = self
            .conn
            .query_row(
                &format!("SELECT {} FROM exercises WHERE id = ?1", EXERCISE_COLUMNS),
                params![id],
                |row| exercise_from_row(row, 0),
            )
            .optional()?;

        Ok(exercise)
    }

    /// All exercises ordered by name.
    pub fn list_exercises(&self) -> Result<Vec<Exercise>, DatabaseError> {
        self.query_exercises(
            &format!("SELECT {} FROM exercises ORDER BY name ASC, id ASC", EXERCISE_COLUMNS),
            params![],
        )
    }

    /// All exercises with their muscle groups, ordered by name.
    pub fn list_exercises_with_muscle_groups(
        &self,
    ) -> Result<Vec<ExerciseWithMuscleGroups>, DatabaseError> {
        let exercises = self.list_exercises()?;
        self.attach_muscle_groups(exercises)
    }

    /// Exercises whose name contains `term` (case-insensitive), ordered by name.
    pub fn search_exercises(
        &self,
        term: &str,
    ) -> Result<Vec<ExerciseWithMuscleGroups>, DatabaseError> {
        let exercises = self.query_exercises(
            &format!(
                "SELECT {} FROM exercises WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name ASC, id ASC",
                EXERCISE_COLUMNS
            ),
            params![contains_pattern(term)],
        )?;
        self.attach_muscle_groups(exercises)
    }

    /// Exercises of the given type, ordered by name.
    pub fn exercises_by_type(
        &self,
        exercise_type: ExerciseType,
    ) -> Result<Vec<ExerciseWithMuscleGroups>, DatabaseError> {
        let exercises = self.query_exercises(
            &format!(
                "SELECT {} FROM exercises WHERE exercise_type = ?1 ORDER BY name ASC, id ASC",
                EXERCISE_COLUMNS
            ),
            params![exercise_type.value()],
        )?;
        self.attach_muscle_groups(exercises)
    }

    /// An exercise with its role-tagged muscle groups.
    pub fn get_exercise_with_muscle_groups(
        &self,
        id: i64,
    ) -> Result<Option<ExerciseWithMuscleGroups>, DatabaseError> {
        match self.get_exercise(id)? {
            Some(exercise) => Ok(self.attach_muscle_groups(vec![exercise])?.pop()),
            None => Ok(None),
        }
    }

    fn query_exercises(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Exercise>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| exercise_from_row(row, 0))?;

        let mut exercises = Vec::new();
        for row in rows {
            exercises.push(row?);
        }
        Ok(exercises)
    }

    /// Load muscle group links for `exercises` and attach them, keeping the
    /// input order. One query per [`MAX_BOUND_IDS`] exercises.
    fn attach_muscle_groups(
        &self,
        exercises: Vec<Exercise>,
    ) -> Result<Vec<ExerciseWithMuscleGroups>, DatabaseError> {
        if exercises.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = exercises.iter().map(|e| e.id).collect();
        let mut by_exercise: HashMap<i64, Vec<TaggedMuscleGroup>> = HashMap::new();

        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let sql = format!(
                "SELECT emg.exercise_id, mg.id, mg.name, emg.role
                 FROM exercise_muscle_groups emg
                 JOIN muscle_groups mg ON mg.id = emg.muscle_group_id
                 WHERE emg.exercise_id IN ({})
                 ORDER BY CASE emg.role WHEN 'PRIMARY' THEN 0 ELSE 1 END, mg.name ASC, mg.id ASC",
                placeholders(chunk.len())
            );

            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                let exercise_id: i64 = row.get(0)?;
                let role: String = row.get(3)?;
                let role = role.parse::<MuscleGroupRole>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
                })?;
                Ok((
                    exercise_id,
                    TaggedMuscleGroup {
                        muscle_group: MuscleGroup {
                            id: row.get(1)?,
                            name: row.get(2)?,
                        },
                        role,
                    },
                ))
            })?;

            for row in rows {
                let (exercise_id, tagged) = row?;
                by_exercise.entry(exercise_id).or_default().push(tagged);
            }
        }

        Ok(exercises
            .into_iter()
            .map(|exercise| {
                let muscle_groups = by_exercise.remove(&exercise.id).unwrap_or_default();
                ExerciseWithMuscleGroups {
                    exercise,
                    muscle_groups,
                }
            })
            .collect())
    }

    // ========== Muscle groups ==========

    /// Insert a muscle group, replacing any row with the same id.
    pub fn insert_muscle_group(&self, muscle_group: &MuscleGroup) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO muscle_groups (id, name) VALUES (?1, ?2)",
            params![id_or_null(muscle_group.id), muscle_group.name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a muscle group by id.
    pub fn get_muscle_group(&self, id: i64) -> Result<Option<MuscleGroup>, DatabaseError> {
        let muscle_group = self
            .conn
            .query_row(
                "SELECT id, name FROM muscle_groups WHERE id = ?1",
                params![id],
                |row| {
                    Ok(MuscleGroup {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(muscle_group)
    }

    /// All muscle groups ordered by name.
    pub fn list_muscle_groups(&self) -> Result<Vec<MuscleGroup>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM muscle_groups ORDER BY name ASC, id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(MuscleGroup {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    /// Delete a muscle group and its exercise links.
    pub fn delete_muscle_group(&self, id: i64) -> Result<usize, DatabaseError> {
        let rows = self
            .conn
            .execute("DELETE FROM muscle_groups WHERE id = ?1", params![id])?;
        Ok(rows)
    }

    /// Link a muscle group to an exercise, replacing an existing link's role.
    pub fn link_muscle_group(
        &self,
        exercise_id: i64,
        muscle_group_id: i64,
        role: MuscleGroupRole,
    ) -> Result<ExerciseMuscleGroup, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO exercise_muscle_groups (exercise_id, muscle_group_id, role)
             VALUES (?1, ?2, ?3)",
            params![exercise_id, muscle_group_id, role.as_str()],
        )?;
        Ok(ExerciseMuscleGroup {
            exercise_id,
            muscle_group_id,
            role,
        })
    }

    /// Link rows of one exercise, ordered by muscle group id.
    pub fn muscle_group_links(
        &self,
        exercise_id: i64,
    ) -> Result<Vec<ExerciseMuscleGroup>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT exercise_id, muscle_group_id, role FROM exercise_muscle_groups
             WHERE exercise_id = ?1 ORDER BY muscle_group_id ASC",
        )?;
        let rows = stmt.query_map(params![exercise_id], |row| {
            let role: String = row.get(2)?;
            Ok(ExerciseMuscleGroup {
                exercise_id: row.get(0)?,
                muscle_group_id: row.get(1)?,
                role: role.parse().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
                })?,
            })
        })?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    /// Remove a link. Returns rows affected.
    pub fn unlink_muscle_group(
        &self,
        exercise_id: i64,
        muscle_group_id: i64,
    ) -> Result<usize, DatabaseError> {
        let rows = self.conn.execute(
            "DELETE FROM exercise_muscle_groups WHERE exercise_id = ?1 AND muscle_group_id = ?2",
            params![exercise_id, muscle_group_id],
        )?;
        Ok(rows)
    }
}

/// Read an exercise from `row`, starting at column `offset` in
/// [`EXERCISE_COLUMNS`] order.
pub(crate) fn exercise_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Exercise> {
    let type_code: i32 = row.get(offset + 4)?;
    let exercise_type = ExerciseType::from_value(type_code).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(offset + 4, Type::Integer, Box::new(e))
    })?;

    Ok(Exercise {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        unilateral: row.get(offset + 3)?,
        exercise_type,
    })
}

/// Most ids bound into one `IN (...)` list. SQLite builds before 3.32
/// reject statements with more than 999 parameters.
pub(crate) const MAX_BOUND_IDS: usize = 999;

/// `?1, ?2, ...` for an `IN (...)` list.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Zero ids are bound as NULL so SQLite assigns the key.
pub(crate) fn id_or_null(id: i64) -> Option<i64> {
    (id != 0).then_some(id)
}
