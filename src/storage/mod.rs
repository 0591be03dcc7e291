//! Storage module for the database, its stores and configuration.

pub mod config;
pub mod database;
pub mod exercise_store;
pub mod handle;
pub mod model_store;
pub mod schema;
pub mod session_store;

pub use config::{AppConfig, ConfigError, ExecutionMode};
pub use database::{Database, DatabaseError};
pub use exercise_store::ExerciseStore;
pub use handle::DatabaseHandle;
pub use model_store::WorkoutModelStore;
pub use session_store::WorkoutSessionStore;
