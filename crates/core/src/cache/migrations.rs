//! Database schema migrations.
//!
//! The applied schema version is tracked in SQLite's `user_version` pragma.
//! Each pending migration runs in its own transaction together with the
//! version bump, so a failed migration leaves the previous version intact.

use super::Error;
use tokio_rusqlite::Connection;

/// A single schema step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Ordered migration list. Versions must be strictly increasing.
const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "stores", sql: include_str!("../../migrations/001_stores.sql") },
    Migration { version: 2, name: "entries", sql: include_str!("../../migrations/002_entries.sql") },
];

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Apply every migration newer than the database's `user_version`.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the step whose SQL failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} (v{}): {e}", migration.name, migration.version)))?;
            tx.pragma_update(None, "user_version", migration.version)?;
            tx.commit()?;

            tracing::debug!(version = migration.version, name = migration.name, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
