use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::task::JoinHandle;

/// Pool that opens connections on demand; building it never touches the network.
pub fn lazy_pool(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(database_url)
        .context("parse DATABASE_URL")
}

/// Open a first connection and run migrations in the background.
///
/// Startup does not wait on the returned handle; the outcome is only logged.
pub fn connect_db(pool: PgPool) -> JoinHandle<()> {
    tokio::spawn(async move {
        match establish(&pool).await {
            Ok(()) => tracing::info!("database connected"),
            Err(e) => tracing::error!(error = ?e, "database connection failed"),
        }
    })
}

async fn establish(pool: &PgPool) -> anyhow::Result<()> {
    pool.acquire().await.context("connect to database")?;

    if let Err(e) = sqlx::migrate!("./migrations").run(pool).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
    Ok(())
}
