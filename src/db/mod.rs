pub mod models;

use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};

pub type DbPool = sqlx::SqlitePool;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
  if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
    tracing::info!("Creating database: {}", database_url);
    Sqlite::create_database(database_url).await?;
  }

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(database_url)
    .await?;

  // WAL keeps readers unblocked while a writer commits; busy_timeout makes
  // contending writers wait for the lock instead of failing immediately.
  sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
  sqlx::query("PRAGMA busy_timeout=5000").execute(&pool).await?;

  tracing::info!("Running migrations...");
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await?;

  tracing::info!("Database ready");
  Ok(pool)
}

/// Single-connection in-memory database, used by tests.
pub async fn create_test_pool() -> Result<DbPool, sqlx::Error> {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await?;

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await?;

  Ok(pool)
}
