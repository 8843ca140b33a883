//! Closure store: the `dag_descendants` relation.
//!
//! Rows are (ancestor, descendant, distance) triples. The same pair may
//! appear several times with different distances when the graph holds paths
//! of different lengths between them; identical triples are stored once.

use rusqlite::{Connection, params};

use super::{MAX_BOUND_IDS, bind_ids, placeholders};
use crate::error::DagError;
use crate::node::NodeKey;

/// One row of the closure store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClosureEntry<K> {
    pub ancestor_id: K,
    pub descendant_id: K,
    pub distance: u32,
}

/// Ancestors of `id` with their distance, `id` itself included at 0.
///
/// Ordered most-distant first.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the query fails.
pub fn entries_where_descendant<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    id: &K,
) -> Result<Vec<(K, u32)>, DagError> {
    let mut stmt = conn.prepare_cached(
        "SELECT ancestor_id, distance FROM dag_descendants
         WHERE collection = ?1 AND descendant_id = ?2
         ORDER BY distance DESC, ancestor_id",
    )?;
    let rows = stmt.query_map(params![collection, id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Descendants of `id` with their distance, `id` itself included at 0.
///
/// Ordered nearest first.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the query fails.
pub fn entries_where_ancestor<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    id: &K,
) -> Result<Vec<(K, u32)>, DagError> {
    let mut stmt = conn.prepare_cached(
        "SELECT descendant_id, distance FROM dag_descendants
         WHERE collection = ?1 AND ancestor_id = ?2
         ORDER BY distance ASC, descendant_id",
    )?;
    let rows = stmt.query_map(params![collection, id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Insert the triple unless it already exists. Returns `true` when a row
/// was written.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the insert fails.
pub fn upsert<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    ancestor: &K,
    descendant: &K,
    distance: u32,
) -> Result<bool, DagError> {
    let written = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO dag_descendants
                (collection, ancestor_id, descendant_id, distance)
             VALUES (?1, ?2, ?3, ?4)",
        )?
        .execute(params![collection, ancestor, descendant, distance])?;
    Ok(written > 0)
}

/// Delete every row whose ancestor is in `ancestors` and whose descendant is
/// in `descendants`, at any distance. Returns the number removed.
///
/// # Errors
///
/// Returns [`DagError::Db`] if a delete fails.
pub fn delete_where<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    ancestors: &[K],
    descendants: &[K],
) -> Result<usize, DagError> {
    let mut removed = 0;
    for ancestor_chunk in ancestors.chunks(MAX_BOUND_IDS) {
        for descendant_chunk in descendants.chunks(MAX_BOUND_IDS) {
            let sql = format!(
                "DELETE FROM dag_descendants
                 WHERE collection = ?
                   AND ancestor_id IN ({})
                   AND descendant_id IN ({})",
                placeholders(ancestor_chunk.len()),
                placeholders(descendant_chunk.len()),
            );
            let mut values = bind_ids(&collection, ancestor_chunk);
            values.extend(descendant_chunk.iter().map(|id| id as &dyn rusqlite::ToSql));
            removed += conn.execute(&sql, values.as_slice())?;
        }
    }
    Ok(removed)
}

/// Delete every row naming `id` as ancestor or descendant.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the delete fails.
pub fn delete_all_for_node<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    id: &K,
) -> Result<usize, DagError> {
    let removed = conn.execute(
        "DELETE FROM dag_descendants
         WHERE collection = ?1 AND (ancestor_id = ?2 OR descendant_id = ?2)",
        params![collection, id],
    )?;
    Ok(removed)
}

/// Delete every row touching any of `ids` on either side.
///
/// # Errors
///
/// Returns [`DagError::Db`] if a delete fails.
pub fn delete_touching<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    ids: &[K],
) -> Result<usize, DagError> {
    let mut removed = 0;
    for chunk in ids.chunks(MAX_BOUND_IDS) {
        let list = placeholders(chunk.len());
        let sql = format!(
            "DELETE FROM dag_descendants
             WHERE collection = ? AND (ancestor_id IN ({list}) OR descendant_id IN ({list}))"
        );
        let mut values = bind_ids(&collection, chunk);
        values.extend(chunk.iter().map(|id| id as &dyn rusqlite::ToSql));
        removed += conn.execute(&sql, values.as_slice())?;
    }
    Ok(removed)
}

/// Every row of the collection, sorted.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the query fails.
pub fn all_entries<K: NodeKey>(
    conn: &Connection,
    collection: &str,
) -> Result<Vec<ClosureEntry<K>>, DagError> {
    let mut stmt = conn.prepare_cached(
        "SELECT ancestor_id, descendant_id, distance FROM dag_descendants
         WHERE collection = ?1
         ORDER BY ancestor_id, descendant_id, distance",
    )?;
    let rows = stmt.query_map(params![collection], |row| {
        Ok(ClosureEntry {
            ancestor_id: row.get(0)?,
            descendant_id: row.get(1)?,
            distance: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
