//! Workout template storage operations.
//!
//! A template is a `workout_models` row owning ordered `model_exercises`,
//! each owning ordered `model_sets`. Composite inserts write all three
//! levels in one transaction.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

use crate::storage::database::{contains_pattern, DatabaseError};
use crate::storage::exercise_store::{
    exercise_from_row, id_or_null, placeholders, MAX_BOUND_IDS,
};
use crate::workouts::composite::{
    InsertedAggregate, InsertedChild, ModelExerciseWithSets, NewWorkoutModel,
    WorkoutModelWithExercises,
};
use crate::workouts::types::{ModelExercise, ModelSet, SetType, WorkoutModel};

/// Workout template store borrowing an open connection.
pub struct WorkoutModelStore<'a> {
    conn: &'a Connection,
}

impl<'a> WorkoutModelStore<'a> {
    /// Create a new template store with the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== Root rows ==========

    /// Insert a template row, replacing any row with the same id.
    ///
    /// Replacing an existing template deletes its exercises and sets.
    pub fn insert_workout_model(&self, model: &WorkoutModel) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO workout_models (id, name) VALUES (?1, ?2)",
            params![id_or_null(model.id), model.name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Rename a template. Returns rows affected.
    pub fn update_workout_model(&self, model: &WorkoutModel) -> Result<usize, DatabaseError> {
        let rows = self.conn.execute(
            "UPDATE workout_models SET name = ?2 WHERE id = ?1",
            params![model.id, model.name],
        )?;
        Ok(rows)
    }

    /// Delete a template with its exercises and sets.
    ///
    /// Sessions started from it are kept.
    pub fn delete_workout_model(&self, id: i64) -> Result<usize, DatabaseError> {
        let rows = self
            .conn
            .execute("DELETE FROM workout_models WHERE id = ?1", params![id])?;
        Ok(rows)
    }

    /// Get a template row by id.
    pub fn get_workout_model(&self, id: i64) -> Result<Option<WorkoutModel>, DatabaseError> {
        let model = self
            .conn
            .query_row(
                "SELECT id, name FROM workout_models WHERE id = ?1",
                params![id],
                model_from_row,
            )
            .optional()?;
        Ok(model)
    }

    /// All template rows ordered by name.
    pub fn list_workout_models(&self) -> Result<Vec<WorkoutModel>, DatabaseError> {
        self.query_models(
            "SELECT id, name FROM workout_models ORDER BY name ASC, id ASC",
            params![],
        )
    }

    /// All templates with exercises and sets, ordered by name.
    pub fn list_workout_models_with_exercises(
        &self,
    ) -> Result<Vec<WorkoutModelWithExercises>, DatabaseError> {
        let models = self.list_workout_models()?;
        self.assemble(models)
    }

    /// Templates whose name contains `term` (case-insensitive), ordered by name.
    pub fn search_workout_models(
        &self,
        term: &str,
    ) -> Result<Vec<WorkoutModelWithExercises>, DatabaseError> {
        let models = self.query_models(
            "SELECT id, name FROM workout_models WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY name ASC, id ASC",
            params![contains_pattern(term)],
        )?;
        self.assemble(models)
    }

    /// A template with its ordered exercises and sets.
    pub fn get_workout_model_with_exercises(
        &self,
        id: i64,
    ) -> Result<Option<WorkoutModelWithExercises>, DatabaseError> {
        match self.get_workout_model(id)? {
            Some(model) => Ok(self.assemble(vec![model])?.pop()),
            None => Ok(None),
        }
    }

    // ========== Children ==========

    /// Insert a template exercise, replacing any row with the same id.
    pub fn insert_model_exercise(&self, exercise: &ModelExercise) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO model_exercises (id, workout_model_id, exercise_id, sort_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id_or_null(exercise.id),
                exercise.workout_model_id,
                exercise.exercise_id,
                exercise.order,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a planned set, replacing any row with the same id.
    pub fn insert_model_set(&self, set: &ModelSet) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO model_sets (id, model_exercise_id, sort_order, set_type)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id_or_null(set.id),
                set.model_exercise_id,
                set.order,
                set.set_type.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Every planned set in the database, by id. Debugging aid.
    pub fn list_model_sets(&self) -> Result<Vec<ModelSet>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, model_exercise_id, sort_order, set_type FROM model_sets ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| model_set_from_row(row, 0))?;

        let mut sets = Vec::new();
        for row in rows {
            sets.push(row?);
        }
        Ok(sets)
    }

    // ========== Composite inserts ==========

    /// Insert a template with its exercises and sets in one transaction.
    ///
    /// Generated ids are returned in the same positions as the drafts.
    pub fn insert_complete_workout_model(
        &self,
        model: &NewWorkoutModel,
    ) -> Result<InsertedAggregate, DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tx.execute(
            "INSERT INTO workout_models (name) VALUES (?1)",
            params![model.name],
        )?;
        let root_id = tx.last_insert_rowid();

        let mut children = Vec::with_capacity(model.exercises.len());
        {
            let mut insert_exercise = tx.prepare(
                "INSERT INTO model_exercises (workout_model_id, exercise_id, sort_order)
                 VALUES (?1, ?2, ?3)",
            )?;
            let mut insert_set = tx.prepare(
                "INSERT INTO model_sets (model_exercise_id, sort_order, set_type)
                 VALUES (?1, ?2, ?3)",
            )?;

            for draft in &model.exercises {
                let child_id =
                    insert_exercise.insert(params![root_id, draft.exercise_id, draft.order])?;

                let mut set_ids = Vec::with_capacity(draft.sets.len());
                for set in &draft.sets {
                    set_ids.push(insert_set.insert(params![
                        child_id,
                        set.order,
                        set.set_type.as_str()
                    ])?);
                }

                children.push(InsertedChild {
                    id: child_id,
                    set_ids,
                });
            }
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let inserted = InsertedAggregate { root_id, children };
        tracing::debug!(
            "Inserted workout model {} with {} exercises and {} sets",
            root_id,
            inserted.children.len(),
            inserted.total_sets()
        );
        Ok(inserted)
    }

    /// Insert a template from flat, unlinked rows in one transaction.
    ///
    /// The ids on `exercises` and the `model_exercise_id` on `sets` are
    /// provisional and only used to pair each set with its exercise. After
    /// the exercises are inserted, each set is attached to the new exercise
    /// whose `order` equals that of its provisional parent. Sets whose
    /// parent cannot be resolved this way are skipped without error.
    ///
    /// Returns the generated template id.
    pub fn insert_complete_workout_model_flat(
        &self,
        model: &WorkoutModel,
        exercises: &[ModelExercise],
        sets: &[ModelSet],
    ) -> Result<i64, DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        let store = WorkoutModelStore::new(&tx);

        let model_id = store.insert_workout_model(model)?;

        // (order, generated id), in insertion order
        let mut inserted: Vec<(i32, i64)> = Vec::with_capacity(exercises.len());
        for exercise in exercises {
            let id = store.insert_model_exercise(&ModelExercise {
                id: 0,
                workout_model_id: model_id,
                ..exercise.clone()
            })?;
            inserted.push((exercise.order, id));
        }

        let mut skipped = 0usize;
        for set in sets {
            let parent = exercises
                .iter()
                .find(|e| e.id == set.model_exercise_id)
                .and_then(|supplied| inserted.iter().find(|(order, _)| *order == supplied.order));

            match parent {
                Some(&(_, model_exercise_id)) => {
                    store.insert_model_set(&ModelSet {
                        id: 0,
                        model_exercise_id,
                        ..set.clone()
                    })?;
                }
                None => {
                    skipped += 1;
                    tracing::warn!(
                        "Skipping model set (order {}): no exercise matches provisional parent {}",
                        set.order,
                        set.model_exercise_id
                    );
                }
            }
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::debug!(
            "Inserted workout model {} with {} exercises, {} sets skipped",
            model_id,
            inserted.len(),
            skipped
        );
        Ok(model_id)
    }

    // ========== Helpers ==========

    fn query_models(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<WorkoutModel>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, model_from_row)?;

        let mut models = Vec::new();
        for row in rows {
            models.push(row?);
        }
        Ok(models)
    }

    /// Attach exercises and sets to `models`, keeping their order.
    ///
    /// One query per level; each root appears exactly once in the output.
    fn assemble(
        &self,
        models: Vec<WorkoutModel>,
    ) -> Result<Vec<WorkoutModelWithExercises>, DatabaseError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let root_ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut sets_by_exercise: HashMap<i64, Vec<ModelSet>> = HashMap::new();
        let mut exercises_by_model: HashMap<i64, Vec<ModelExerciseWithSets>> = HashMap::new();

        for model_ids in root_ids.chunks(MAX_BOUND_IDS) {
            let in_list = placeholders(model_ids.len());

            {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT ms.id, ms.model_exercise_id, ms.sort_order, ms.set_type
                     FROM model_sets ms
                     JOIN model_exercises me ON me.id = ms.model_exercise_id
                     WHERE me.workout_model_id IN ({})
                     ORDER BY ms.sort_order ASC, ms.id ASC",
                    in_list
                ))?;
                let rows = stmt.query_map(rusqlite::params_from_iter(model_ids.iter()), |row| {
                    model_set_from_row(row, 0)
                })?;
                for row in rows {
                    let set = row?;
                    sets_by_exercise
                        .entry(set.model_exercise_id)
                        .or_default()
                        .push(set);
                }
            }

            {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT me.id, me.workout_model_id, me.exercise_id, me.sort_order,
                            e.id, e.name, e.description, e.unilateral, e.exercise_type
                     FROM model_exercises me
                     JOIN exercises e ON e.id = me.exercise_id
                     WHERE me.workout_model_id IN ({})
                     ORDER BY me.sort_order ASC, me.id ASC",
                    in_list
                ))?;
                let rows = stmt.query_map(rusqlite::params_from_iter(model_ids.iter()), |row| {
                    Ok((
                        ModelExercise {
                            id: row.get(0)?,
                            workout_model_id: row.get(1)?,
                            exercise_id: row.get(2)?,
                            order: row.get(3)?,
                        },
                        exercise_from_row(row, 4)?,
                    ))
                })?;
                for row in rows {
                    let (model_exercise, exercise) = row?;
                    let model_sets = sets_by_exercise
                        .remove(&model_exercise.id)
                        .unwrap_or_default();
                    exercises_by_model
                        .entry(model_exercise.workout_model_id)
                        .or_default()
                        .push(ModelExerciseWithSets {
                            model_exercise,
                            exercise,
                            model_sets,
                        });
                }
            }
        }

        Ok(models
            .into_iter()
            .map(|workout_model| {
                let exercises = exercises_by_model
                    .remove(&workout_model.id)
                    .unwrap_or_default();
                WorkoutModelWithExercises {
                    workout_model,
                    exercises,
                }
            })
            .collect())
    }
}

fn model_from_row(row: &Row<'_>) -> rusqlite::Result<WorkoutModel> {
    Ok(WorkoutModel {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn model_set_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ModelSet> {
    Ok(ModelSet {
        id: row.get(offset)?,
        model_exercise_id: row.get(offset + 1)?,
        order: row.get(offset + 2)?,
        set_type: set_type_from_row(row, offset + 3)?,
    })
}

/// Decode a `set_type` column.
pub(crate) fn set_type_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<SetType> {
    let raw: String = row.get(idx)?;
    raw.parse::<SetType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
