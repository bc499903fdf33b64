use crate::config::{AppConfig, StorageBackend};
use crate::store::{MemoryStore, PgStore, SharedStore};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

// Setup the database and execute any migrations
pub async fn setup_database(config: &AppConfig) -> anyhow::Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("database_url is required when storage = \"postgres\"")?;
    let pool = PgPool::connect(url).await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to migrate the database")?;
        info!("migrations executed");
    }

    Ok(pool)
}

/// The one place a storage handle is constructed. Call it once at start-up and
/// hand the result to [`crate::AppState`].
pub async fn build_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    Ok(match config.storage {
        StorageBackend::Postgres => Arc::new(PgStore::new(setup_database(config).await?)),
        StorageBackend::Memory => {
            info!("using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    })
}
