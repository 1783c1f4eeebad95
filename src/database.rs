use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};
use std::sync::{Mutex, MutexGuard};
use tokio::task;

pub type DbResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct Database {
    connection: Mutex<Connection>,
}

impl Database {
    pub async fn new(database_url: &str) -> DbResult<Self> {
        let db_path = database_url.strip_prefix("sqlite:").unwrap_or(database_url).to_string();

        // Ensure the data directory exists
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connection = task::spawn_blocking(move || -> DbResult<Connection> {
            let conn = Connection::open(&db_path)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(conn)
        })
        .await??;

        Ok(Database {
            connection: Mutex::new(connection),
        })
    }

    pub async fn migrate(&self) -> DbResult<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../migrations/001_initial_schema.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    pub async fn health_check(&self) -> DbResult<()> {
        let conn = self.lock()?;
        let _result: i32 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(())
    }

    /// Locks the shared connection, turning a poisoned lock into an error.
    pub fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| format!("database connection poisoned: {}", e).into())
    }
}

/// True when `err` is SQLite refusing a write over a UNIQUE (or other)
/// constraint.
pub fn is_constraint_violation(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .and_then(|e| e.sqlite_error_code())
        == Some(rusqlite::ErrorCode::ConstraintViolation)
}

/// SQLite stores timestamps as `YYYY-MM-DD HH:MM:SS` strings.
pub fn parse_datetime(s: String) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}
