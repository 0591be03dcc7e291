//! LiftLog - Strength Training Log Storage
//!
//! Opens the configured database and prints a short summary of its contents.

use anyhow::Context;
use liftlog::storage::config::load_config;
use liftlog::storage::DatabaseHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LiftLog v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    let path = config.database_path();

    let db = DatabaseHandle::open(&path, config.busy_timeout(), config.execution_mode)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    let exercises = db.call(|db| db.count_rows("exercises")).await?;
    let templates = db
        .call(|db| db.workout_models().list_workout_models_with_exercises())
        .await?;
    let limit = config.recent_sessions_limit;
    let recent = db
        .call(move |db| db.workout_sessions().recent_sessions(limit))
        .await?;

    tracing::info!(
        "{} exercises, {} workout templates, {} recent sessions",
        exercises,
        templates.len(),
        recent.len()
    );

    for template in &templates {
        tracing::info!(
            "Template '{}': {} exercises, {} sets",
            template.workout_model.name,
            template.exercises.len(),
            template.total_sets()
        );
    }
    for session in &recent {
        tracing::info!(
            "Session '{}' on {}: {}/{} sets completed",
            session.workout_session.name,
            session.workout_session.start_date.format("%Y-%m-%d"),
            session.completed_sets(),
            session.total_sets()
        );
    }

    db.close().await?;
    Ok(())
}
