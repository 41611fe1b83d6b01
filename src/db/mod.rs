//! SQLite connection pool and the table-level primitives the pipeline
//! depends on: existence check, drop, and results-table creation.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::DB_TABLE_NAME;

/// Open (creating if missing) the single-file results database.
pub async fn create_pool(db_file: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

/// Check whether a table exists in the database.
pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Drop a table if it exists. Used to clear the previous run's results
/// before a fresh run begins.
pub async fn drop_table_if_exists(pool: &SqlitePool, table_name: &str) -> Result<(), sqlx::Error> {
    if table_exists(pool, table_name).await? {
        sqlx::query(&format!(r#"DROP TABLE "{table_name}""#))
            .execute(pool)
            .await?;
        tracing::debug!(table = table_name, "Starting new test, results table was dropped");
    }
    Ok(())
}

/// Create the append-only results table if it does not exist yet.
/// Column names are the contract consumed by the reporting layer.
pub async fn ensure_results_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{DB_TABLE_NAME}" (
            method               TEXT    NOT NULL,
            url                  TEXT    NOT NULL,
            headers              TEXT    NOT NULL,
            data                 TEXT    NOT NULL,
            machineName          TEXT    NOT NULL,
            DestinationURL       TEXT    NOT NULL,
            WAF_Name             TEXT    NOT NULL,
            DateTime             TEXT    NOT NULL,
            TestName             TEXT    NOT NULL,
            DataSetType          TEXT    NOT NULL,
            TestId               INTEGER NOT NULL,
            Category             TEXT,
            response_status_code INTEGER NOT NULL,
            isBlocked            BOOLEAN NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;
    Ok(())
}
