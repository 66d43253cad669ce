use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::constants::EXPECTED_DB_VERSION;
use crate::queries::{ddl, metadata};

type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Open a file-based database pool for production use
/// Creates the file if missing, enables WAL mode and foreign keys
pub async fn open_database_connection(db_path: &Path) -> Result<SqlitePool, DynError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    info!("SQLite database: {}", db_path.display());
    Ok(pool)
}

/// Create every table and index if missing and stamp the schema version
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), DynError> {
    let statements = [
        ddl::create_metadata_table(),
        ddl::create_users_table(),
        ddl::create_audio_library_table(),
        ddl::create_slot_table(),
        ddl::create_slot_weekday_index(),
        ddl::create_preset_table(),
        ddl::create_schedule_config_table(),
    ];
    for sql in statements.iter() {
        sqlx::query(sql).execute(pool).await?;
    }

    let version: Option<String> = sqlx::query_scalar(&metadata::select_by_key("version"))
        .fetch_optional(pool)
        .await?;
    match version {
        None => {
            sqlx::query(&metadata::upsert("version", EXPECTED_DB_VERSION))
                .execute(pool)
                .await?;
        }
        Some(v) if v != EXPECTED_DB_VERSION => {
            return Err(format!(
                "Unsupported database version: '{}'. This application only supports version '{}'",
                v, EXPECTED_DB_VERSION
            )
            .into());
        }
        Some(_) => {}
    }

    Ok(())
}

/// Create a database in a temporary directory for testing
/// Returns (pool, guard) - keep the guard alive to prevent deletion
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqlitePool, tempfile::TempDir), DynError> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test.sqlite");
    let pool = open_database_connection(&db_path).await?;
    Ok((pool, temp_dir))
}
