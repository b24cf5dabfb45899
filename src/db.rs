use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

use crate::constants::EXPECTED_DB_VERSION;
use crate::queries::{ddl, metadata};

type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Open a file-based database connection pool for production use
/// Enables WAL mode and foreign keys (cascade deletes depend on them)
pub async fn open_database_pool(db_path: &Path) -> Result<SqlitePool, DynError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Initialize database schema
/// Creates tables and indexes; safe to call on an existing database
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), DynError> {
    sqlx::query(&ddl::create_metadata_table())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_sessions_table())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_markers_table())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_posts_table())
        .execute(pool)
        .await?;

    sqlx::query(&ddl::create_markers_session_index())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_posts_marker_id_index())
        .execute(pool)
        .await?;

    Ok(())
}

/// Verify the schema version of an opened database, stamping fresh databases
/// A mismatched version aborts startup rather than risking silent corruption
pub async fn check_database_version(pool: &SqlitePool) -> Result<(), DynError> {
    let sql = metadata::select_by_key("version");
    let version: Option<String> = sqlx::query_scalar(&sql).fetch_optional(pool).await?;

    match version {
        Some(v) if v == EXPECTED_DB_VERSION => Ok(()),
        Some(v) => Err(format!(
            "Unsupported database version: '{}'. This application only supports version '{}'",
            v, EXPECTED_DB_VERSION
        )
        .into()),
        None => {
            let sql = metadata::upsert("version", EXPECTED_DB_VERSION);
            sqlx::query(&sql).execute(pool).await?;
            Ok(())
        }
    }
}

/// Create a database in a temporary directory for testing
/// Returns (pool, guard) - keep the guard alive to prevent temp file deletion
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqlitePool, tempfile::TempDir), DynError> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("test.sqlite");
    let pool = open_database_pool(&db_path).await?;
    Ok((pool, dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_database_is_stamped_with_the_expected_version() {
        let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
        init_database_schema(&pool).await.unwrap();

        check_database_version(&pool).await.unwrap();

        let sql = metadata::select_by_key("version");
        let version: String = sqlx::query_scalar(&sql).fetch_one(&pool).await.unwrap();
        assert_eq!(version, EXPECTED_DB_VERSION);

        // A second check against the stamped database passes
        check_database_version(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_database_version_is_rejected() {
        let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
        init_database_schema(&pool).await.unwrap();

        let sql = metadata::upsert("version", "999");
        sqlx::query(&sql).execute(&pool).await.unwrap();

        let err = check_database_version(&pool).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported database version"));
    }

    #[tokio::test]
    async fn test_cascade_pragmas_are_active() {
        let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
        init_database_schema(&pool).await.unwrap();

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
