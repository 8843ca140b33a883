//! Versioned schema of the hierarchy store.
//!
//! - v1: `dag_links` (edges plus root sentinels), `dag_descendants` (the
//!   closure table) and the single `store_meta` row.
//! - v2: the `dag_nodes` registry the CLI names nodes with.
//!
//! The applied version is kept twice, in `PRAGMA user_version` and in
//! `store_meta.schema_version`, and both move in the same transaction.

use super::schema;
use rusqlite::{Connection, types::Type};

struct Migration {
    version: u32,
    adds: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        adds: "closure tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        adds: "node registry",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Newest store layout this build writes.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// Layout version recorded in the store; `0` for a fresh file.
///
/// # Errors
///
/// Fails if the pragma cannot be read or holds a negative value.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`], one transaction per
/// layout step. Returns the version the store ends at.
///
/// # Errors
///
/// Fails on the first step that SQLite rejects; earlier steps stay applied.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for step in MIGRATIONS.iter().filter(move |step| step.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(step.version)],
        )?;
        tx.commit()?;
        tracing::debug!(version = step.version, adds = step.adds, "store schema upgraded");
        current = step.version;
    }

    Ok(current)
}
