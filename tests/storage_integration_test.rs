//! Integration tests for the storage layer through the async handle.
//!
//! Each test uses a fresh database file in a temporary directory and runs
//! its work on tokio's blocking pool, the way the binary does.

use chrono::{DateTime, TimeZone, Utc};
use liftlog::storage::{DatabaseError, DatabaseHandle, ExecutionMode};
use liftlog::workouts::{
    Exercise, ExerciseType, ModelExerciseDraft, MuscleGroup, MuscleGroupRole, NewWorkoutModel,
};
use std::time::Duration;

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 17, 0, 0).unwrap()
}

async fn open(dir: &tempfile::TempDir) -> DatabaseHandle {
    DatabaseHandle::open(
        dir.path().join("liftlog.db"),
        Duration::from_millis(1000),
        ExecutionMode::Blocking,
    )
    .await
    .expect("Failed to open database")
}

/// Seed a push-day catalog and template, returning the template id.
async fn seed_push_day(db: &DatabaseHandle) -> i64 {
    db.call(|db| {
        let exercises = db.exercises();
        let chest = exercises.insert_muscle_group(&MuscleGroup::new("Chest"))?;
        let triceps = exercises.insert_muscle_group(&MuscleGroup::new("Triceps"))?;

        let bench = exercises.insert_exercise(&Exercise::new("Bench Press"))?;
        let dips = exercises.insert_exercise(&Exercise {
            exercise_type: ExerciseType::Reps,
            ..Exercise::new("Dips")
        })?;
        exercises.link_muscle_group(bench, chest, MuscleGroupRole::Primary)?;
        exercises.link_muscle_group(bench, triceps, MuscleGroupRole::Secondary)?;
        exercises.link_muscle_group(dips, triceps, MuscleGroupRole::Primary)?;

        let inserted = db
            .workout_models()
            .insert_complete_workout_model(&NewWorkoutModel {
                name: "Push Day".to_string(),
                exercises: vec![
                    ModelExerciseDraft::with_working_sets(bench, 0, 4),
                    ModelExerciseDraft::with_working_sets(dips, 1, 3),
                ],
            })?;
        Ok(inserted.root_id)
    })
    .await
    .expect("Failed to seed data")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_template_to_logged_session() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir).await;
    let model_id = seed_push_day(&db).await;

    let started = db
        .call(move |db| {
            db.workout_sessions()
                .start_session_from_model(model_id, "Push Day #1", date(2024, 9, 2))
        })
        .await
        .unwrap()
        .expect("Template exists");
    assert_eq!(started.children.len(), 2);
    assert_eq!(started.total_sets(), 7);

    // Log the first bench set
    let first_set = started.children[0].set_ids[0];
    db.call(move |db| {
        let sessions = db.workout_sessions();
        sessions.update_session_set_performance(first_set, Some(8), Some(80.0), Some(2))?;
        sessions.mark_session_set_completed(first_set)
    })
    .await
    .unwrap();

    let session_id = started.root_id;
    let session = db
        .call(move |db| db.workout_sessions().get_workout_session_with_exercises(session_id))
        .await
        .unwrap()
        .expect("Session not found");

    assert_eq!(session.workout_session.workout_model_id, model_id);
    assert_eq!(session.exercises[0].exercise.name, "Bench Press");
    assert_eq!(session.exercises[1].exercise.name, "Dips");
    assert_eq!(session.completed_sets(), 1);

    let logged = &session.exercises[0].session_sets[0];
    assert!(logged.completed);
    assert_eq!(logged.reps, Some(8));
    assert_eq!(logged.weight, Some(80.0));
    assert_eq!(logged.rir, Some(2));

    db.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let db = open(&dir).await;
    let model_id = seed_push_day(&db).await;
    db.close().await.unwrap();

    let db = open(&dir).await;
    let template = db
        .call(move |db| db.workout_models().get_workout_model_with_exercises(model_id))
        .await
        .unwrap()
        .expect("Template not found after reopen");

    assert_eq!(template.workout_model.name, "Push Day");
    assert_eq!(template.total_sets(), 7);

    let bench = db
        .call(|db| db.exercises().search_exercises("bench"))
        .await
        .unwrap();
    assert_eq!(bench.len(), 1);
    let primary: Vec<&str> = bench[0]
        .with_role(MuscleGroupRole::Primary)
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(primary, vec!["Chest"]);

    db.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_history_by_date_range() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir).await;
    let model_id = seed_push_day(&db).await;

    for (name, day) in [
        ("Week 1", date(2024, 1, 1)),
        ("Week 3", date(2024, 1, 15)),
        ("Week 5", date(2024, 1, 31)),
        ("Week 7", date(2024, 2, 15)),
    ] {
        db.call(move |db| {
            db.workout_sessions()
                .start_session_from_model(model_id, name, day)
        })
        .await
        .unwrap();
    }

    let january = db
        .call(|db| {
            db.workout_sessions().sessions_by_date_range(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
            )
        })
        .await
        .unwrap();
    let names: Vec<&str> = january
        .iter()
        .map(|s| s.workout_session.name.as_str())
        .collect();
    assert_eq!(names, vec!["Week 5", "Week 3", "Week 1"]);
    assert!(january.iter().all(|s| s.total_sets() == 7));

    let recent = db
        .call(|db| db.workout_sessions().recent_sessions(1))
        .await
        .unwrap();
    assert_eq!(recent[0].workout_session.name, "Week 7");

    db.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cascades() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir).await;
    let model_id = seed_push_day(&db).await;

    db.call(move |db| {
        db.workout_sessions()
            .start_session_from_model(model_id, "Push Day #1", date(2024, 3, 4))
    })
    .await
    .unwrap();

    // Deleting the template leaves the session in place
    db.call(move |db| db.workout_models().delete_workout_model(model_id))
        .await
        .unwrap();
    let counts = db
        .call(|db| {
            Ok((
                db.count_rows("model_exercises")?,
                db.count_rows("model_sets")?,
                db.count_rows("workout_sessions")?,
                db.count_rows("session_sets")?,
            ))
        })
        .await
        .unwrap();
    assert_eq!(counts, (0, 0, 1, 7));

    // Deleting an exercise removes its session rows and muscle group links
    let dips = db
        .call(|db| db.exercises().search_exercises("Dips"))
        .await
        .unwrap()
        .remove(0)
        .exercise
        .id;
    db.call(move |db| db.exercises().delete_exercise(dips))
        .await
        .unwrap();

    let counts = db
        .call(|db| {
            Ok((
                db.count_rows("session_exercises")?,
                db.count_rows("session_sets")?,
                db.count_rows("exercise_muscle_groups")?,
                db.count_rows("muscle_groups")?,
            ))
        })
        .await
        .unwrap();
    assert_eq!(counts, (1, 4, 2, 2));

    db.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_composite_insert_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir).await;

    let result = db
        .call(|db| {
            db.workout_models()
                .insert_complete_workout_model(&NewWorkoutModel {
                    name: "Broken".to_string(),
                    exercises: vec![ModelExerciseDraft::with_working_sets(42, 0, 3)],
                })
        })
        .await;
    assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));

    let models = db.call(|db| db.count_rows("workout_models")).await.unwrap();
    assert_eq!(models, 0);

    db.close().await.unwrap();
}
