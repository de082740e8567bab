//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically, then their journal-mode switch.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A migration is applied at most once per database file; re-running
//!   `apply_migrations` on an up-to-date database is a no-op.
//! - Migrations are additive; none of them drops user rows.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
    /// Journal mode to switch to once the migration transaction committed.
    ///
    /// SQLite refuses `journal_mode` changes inside a transaction.
    journal_mode: Option<&'static str>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
    journal_mode: Some("wal"),
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    // Re-read under the write lock; another connection may have migrated.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let locked_version = current_user_version(&tx)?;
    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > locked_version)
        .collect();
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    for migration in &pending {
        if let Some(mode) = migration.journal_mode {
            let active = set_journal_mode(conn, mode)?;
            info!(
                "event=db_migrate module=db status=ok version={} journal_mode={}",
                migration.version, active
            );
        } else {
            info!(
                "event=db_migrate module=db status=ok version={}",
                migration.version
            );
        }
    }

    Ok(())
}

/// Returns the journal mode SQLite reports after the switch.
///
/// In-memory databases keep `memory` mode regardless of the request.
fn set_journal_mode(conn: &Connection, mode: &str) -> DbResult<String> {
    let active = conn.pragma_update_and_check(None, "journal_mode", mode, |row| {
        row.get::<_, String>(0)
    })?;
    Ok(active.to_lowercase())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
