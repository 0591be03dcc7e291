//! LiftLog - Strength Training Log Storage
//!
//! Local SQLite persistence for a strength-training log: an exercise catalog
//! with muscle groups, reusable workout templates, and logged workout
//! sessions with per-set performance.

pub mod storage;
pub mod workouts;

// Re-export commonly used types
pub use storage::database::{Database, DatabaseError};
pub use storage::handle::DatabaseHandle;
pub use storage::config::AppConfig;
