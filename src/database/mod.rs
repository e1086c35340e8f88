mod error;

pub use error::DbError;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Run migrations and get a database connection pool.
///
/// # Errors
///
/// * Returns an error if the database URL cannot be parsed.
/// * Returns an error if the database connection fails.
/// * Returns an error if migrations fail.
pub async fn get_db_pool(
    url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> color_eyre::Result<SqlitePool> {
    info!("Connecting to database.");
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
