//! Sample data builders.
//!
//! Defaults describe a bench-press push day. Composite builders give the
//! i-th exercise id `i`, name `"Exercise i"` and order `i - 1`, and number
//! sets from order 0.

use chrono::{DateTime, Utc};

use crate::workouts::composite::{
    ModelExerciseWithSets, SessionExerciseWithSets, WorkoutModelWithExercises,
    WorkoutSessionWithExercises,
};
use crate::workouts::types::{
    Exercise, ExerciseType, ModelExercise, ModelSet, SessionExercise, SessionSet,
    SetType, WorkoutModel, WorkoutSession,
};

pub fn exercise(id: i64, name: &str) -> Exercise {
    Exercise {
        id,
        name: name.to_string(),
        description: "Compound exercise for the upper body.".to_string(),
        unilateral: false,
        exercise_type: ExerciseType::RepsWeight,
    }
}

pub fn workout_model(id: i64, name: &str) -> WorkoutModel {
    WorkoutModel {
        id,
        name: name.to_string(),
    }
}

pub fn model_exercise(id: i64, workout_model_id: i64, exercise_id: i64, order: i32) -> ModelExercise {
    ModelExercise {
        id,
        workout_model_id,
        exercise_id,
        order,
    }
}

pub fn model_set(id: i64, model_exercise_id: i64, order: i32) -> ModelSet {
    ModelSet {
        id,
        model_exercise_id,
        order,
        set_type: SetType::Working,
    }
}

pub fn workout_session(
    id: i64,
    workout_model_id: i64,
    name: &str,
    start_date: DateTime<Utc>,
) -> WorkoutSession {
    WorkoutSession {
        id,
        workout_model_id,
        name: name.to_string(),
        completed: true,
        start_date,
        end_date: None,
    }
}

pub fn session_exercise(
    id: i64,
    workout_session_id: i64,
    exercise_id: i64,
    order: i32,
) -> SessionExercise {
    SessionExercise {
        id,
        workout_session_id,
        exercise_id,
        order,
    }
}

/// A completed working set of 8 × 60 with 2 in reserve.
pub fn session_set(id: i64, session_exercise_id: i64, order: i32) -> SessionSet {
    SessionSet {
        id,
        session_exercise_id,
        order,
        set_type: SetType::Working,
        completed: true,
        reps: Some(8),
        weight: Some(60.0),
        rir: Some(2),
    }
}

/// A template with `exercise_count` exercises of `set_count` sets each.
///
/// Set ids are unique across the whole template.
pub fn workout_model_with_exercises(
    exercise_count: usize,
    set_count: usize,
) -> WorkoutModelWithExercises {
    let workout_model = workout_model(1, "Push Day");
    let exercises = (1..=exercise_count)
        .map(|i| {
            let base_id = ((i - 1) * set_count) as i64;
            let exercise = exercise(i as i64, &format!("Exercise {}", i));
            let model_exercise =
                model_exercise(i as i64, workout_model.id, exercise.id, i as i32 - 1);
            let model_sets = (1..=set_count)
                .map(|s| model_set(base_id + s as i64, model_exercise.id, s as i32 - 1))
                .collect();
            ModelExerciseWithSets {
                model_exercise,
                exercise,
                model_sets,
            }
        })
        .collect();

    WorkoutModelWithExercises {
        workout_model,
        exercises,
    }
}

/// A session started at `start_date` with `exercise_count` exercises of
/// `set_count` sets each.
pub fn workout_session_with_exercises(
    start_date: DateTime<Utc>,
    exercise_count: usize,
    set_count: usize,
) -> WorkoutSessionWithExercises {
    let workout_session = workout_session(1, 1, "Push Day", start_date);
    let exercises = (1..=exercise_count)
        .map(|i| {
            let base_id = ((i - 1) * set_count) as i64;
            let exercise = exercise(i as i64, &format!("Exercise {}", i));
            let session_exercise =
                session_exercise(i as i64, workout_session.id, exercise.id, i as i32 - 1);
            let session_sets = (1..=set_count)
                .map(|s| session_set(base_id + s as i64, session_exercise.id, s as i32 - 1))
                .collect();
            SessionExerciseWithSets {
                session_exercise,
                exercise,
                session_sets,
            }
        })
        .collect();

    WorkoutSessionWithExercises {
        workout_session,
        exercises,
    }
}

/// Split a template into the flat rows taken by
/// [`crate::storage::WorkoutModelStore::insert_complete_workout_model_flat`].
pub fn flatten_workout_model(
    template: &WorkoutModelWithExercises,
) -> (WorkoutModel, Vec<ModelExercise>, Vec<ModelSet>) {
    let exercises = template
        .exercises
        .iter()
        .map(|e| e.model_exercise.clone())
        .collect();
    let sets = template
        .exercises
        .iter()
        .flat_map(|e| e.model_sets.iter().cloned())
        .collect();
    (template.workout_model.clone(), exercises, sets)
}

/// Split a session into the flat rows taken by
/// [`crate::storage::WorkoutSessionStore::insert_complete_workout_session_flat`].
pub fn flatten_workout_session(
    session: &WorkoutSessionWithExercises,
) -> (WorkoutSession, Vec<SessionExercise>, Vec<SessionSet>) {
    let exercises = session
        .exercises
        .iter()
        .map(|e| e.session_exercise.clone())
        .collect();
    let sets = session
        .exercises
        .iter()
        .flat_map(|e| e.session_sets.iter().cloned())
        .collect();
    (session.workout_session.clone(), exercises, sets)
}
