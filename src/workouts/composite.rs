//! Nested aggregate views and the ordered drafts used to create them.
//!
//! Reads return a root with its ordered children, each child carrying the
//! referenced [`Exercise`] and its ordered sets. Writes take drafts whose
//! nesting expresses ownership, so no identifier has to be invented before
//! the rows exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workouts::types::{
    Exercise, ModelExercise, ModelSet, MuscleGroup, MuscleGroupRole, SessionExercise, SessionSet,
    SetType, WorkoutModel, WorkoutSession,
};

/// A muscle group together with the role it plays in one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedMuscleGroup {
    pub muscle_group: MuscleGroup,
    pub role: MuscleGroupRole,
}

/// An exercise with every muscle group it is linked to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseWithMuscleGroups {
    pub exercise: Exercise,
    pub muscle_groups: Vec<TaggedMuscleGroup>,
}

impl ExerciseWithMuscleGroups {
    /// Muscle groups with the given role, in stored order.
    pub fn with_role(&self, role: MuscleGroupRole) -> impl Iterator<Item = &MuscleGroup> {
        self.muscle_groups
            .iter()
            .filter(move |m| m.role == role)
            .map(|m| &m.muscle_group)
    }
}

/// A template exercise with its exercise row and planned sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExerciseWithSets {
    pub model_exercise: ModelExercise,
    pub exercise: Exercise,
    pub model_sets: Vec<ModelSet>,
}

/// A full template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutModelWithExercises {
    pub workout_model: WorkoutModel,
    pub exercises: Vec<ModelExerciseWithSets>,
}

impl WorkoutModelWithExercises {
    /// Number of planned sets across all exercises.
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.model_sets.len()).sum()
    }
}

/// A session exercise with its exercise row and logged sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExerciseWithSets {
    pub session_exercise: SessionExercise,
    pub exercise: Exercise,
    pub session_sets: Vec<SessionSet>,
}

/// A full logged session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSessionWithExercises {
    pub workout_session: WorkoutSession,
    pub exercises: Vec<SessionExerciseWithSets>,
}

impl WorkoutSessionWithExercises {
    /// Number of sets across all exercises.
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.session_sets.len()).sum()
    }

    /// Number of sets marked completed.
    pub fn completed_sets(&self) -> usize {
        self.exercises
            .iter()
            .flat_map(|e| e.session_sets.iter())
            .filter(|s| s.completed)
            .count()
    }
}

/// A planned set to create under a [`ModelExerciseDraft`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSetDraft {
    pub order: i32,
    pub set_type: SetType,
}

/// A template exercise to create, owning its sets.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelExerciseDraft {
    pub exercise_id: i64,
    pub order: i32,
    pub sets: Vec<ModelSetDraft>,
}

impl ModelExerciseDraft {
    /// `set_count` working sets ordered `0..set_count`.
    pub fn with_working_sets(exercise_id: i64, order: i32, set_count: usize) -> Self {
        Self {
            exercise_id,
            order,
            sets: (0..set_count)
                .map(|i| ModelSetDraft {
                    order: i as i32,
                    set_type: SetType::Working,
                })
                .collect(),
        }
    }
}

/// A complete template to insert in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkoutModel {
    pub name: String,
    pub exercises: Vec<ModelExerciseDraft>,
}

/// A set to create under a [`SessionExerciseDraft`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSetDraft {
    pub order: i32,
    pub set_type: SetType,
    pub completed: bool,
    pub reps: Option<i32>,
    pub weight: Option<f64>,
    pub rir: Option<i32>,
}

/// A session exercise to create, owning its sets.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionExerciseDraft {
    pub exercise_id: i64,
    pub order: i32,
    pub sets: Vec<SessionSetDraft>,
}

/// A complete session to insert in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkoutSession {
    pub workout_model_id: i64,
    pub name: String,
    pub completed: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub exercises: Vec<SessionExerciseDraft>,
}

impl NewWorkoutSession {
    /// An open session following `template`'s plan.
    ///
    /// Sets keep their order and type, start uncompleted and carry no
    /// logged performance.
    pub fn from_template(
        template: &WorkoutModelWithExercises,
        name: impl Into<String>,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            workout_model_id: template.workout_model.id,
            name: name.into(),
            completed: false,
            start_date,
            end_date: None,
            exercises: template
                .exercises
                .iter()
                .map(|child| SessionExerciseDraft {
                    exercise_id: child.exercise.id,
                    order: child.model_exercise.order,
                    sets: child
                        .model_sets
                        .iter()
                        .map(|set| SessionSetDraft {
                            order: set.order,
                            set_type: set.set_type,
                            ..Default::default()
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Generated ids of one inserted child and its sets, in draft order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedChild {
    pub id: i64,
    pub set_ids: Vec<i64>,
}

/// Generated ids of an inserted aggregate.
///
/// `children[i]` belongs to the i-th draft exercise and `children[i].set_ids[j]`
/// to its j-th draft set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedAggregate {
    pub root_id: i64,
    pub children: Vec<InsertedChild>,
}

impl InsertedAggregate {
    pub fn total_sets(&self) -> usize {
        self.children.iter().map(|c| c.set_ids.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workouts::fixtures;
    use chrono::TimeZone;

    #[test]
    fn test_from_template_resets_performance() {
        let mut template = fixtures::workout_model_with_exercises(2, 3);
        template.exercises[1].model_sets[0].set_type = SetType::Warmup;
        let start = Utc.with_ymd_and_hms(2024, 4, 2, 18, 30, 0).unwrap();

        let draft = NewWorkoutSession::from_template(&template, "Push Day #4", start);

        assert_eq!(draft.workout_model_id, template.workout_model.id);
        assert_eq!(draft.name, "Push Day #4");
        assert!(!draft.completed);
        assert_eq!(draft.end_date, None);
        assert_eq!(draft.exercises.len(), 2);
        assert_eq!(draft.exercises[1].exercise_id, 2);
        assert_eq!(draft.exercises[1].order, 1);
        assert_eq!(draft.exercises[1].sets[0].set_type, SetType::Warmup);
        assert!(draft
            .exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .all(|s| !s.completed && s.reps.is_none() && s.weight.is_none() && s.rir.is_none()));
    }

    #[test]
    fn test_session_counts() {
        let start = Utc.with_ymd_and_hms(2024, 4, 2, 18, 30, 0).unwrap();
        let mut session = fixtures::workout_session_with_exercises(start, 2, 2);
        session.exercises[0].session_sets[1].completed = false;

        assert_eq!(session.total_sets(), 4);
        assert_eq!(session.completed_sets(), 3);
    }
}
