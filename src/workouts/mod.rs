//! Workout domain types: exercises, templates and logged sessions.

pub mod composite;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod types;

pub use composite::{
    ExerciseWithMuscleGroups, InsertedAggregate, InsertedChild, ModelExerciseDraft,
    ModelExerciseWithSets, ModelSetDraft, NewWorkoutModel, NewWorkoutSession,
    SessionExerciseDraft, SessionExerciseWithSets, SessionSetDraft, TaggedMuscleGroup,
    WorkoutModelWithExercises, WorkoutSessionWithExercises,
};
pub use types::{
    Exercise, ExerciseMuscleGroup, ExerciseType, ModelExercise, ModelSet, MuscleGroup,
    MuscleGroupRole, SessionExercise, SessionSet, SetType, UnknownVariant, WorkoutModel,
    WorkoutSession,
};
