//! Edge store: the `dag_links` relation.
//!
//! A row with `parent_id = NULL` is the root sentinel. Queries match the
//! parent with `IS` so the sentinel and real parents share one code path.

use rusqlite::{Connection, OptionalExtension, params};

use super::{MAX_BOUND_IDS, bind_ids, placeholders};
use crate::error::DagError;
use crate::node::NodeKey;

/// One row of the edge store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge<K> {
    /// `None` for the root sentinel.
    pub parent_id: Option<K>,
    pub child_id: K,
}

impl<K> Edge<K> {
    /// Returns `true` for the null-parent root marker.
    pub const fn is_sentinel(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Insert the edge `parent → child`.
///
/// # Errors
///
/// Returns [`DagError::SelfLoop`] when `parent == child`, or
/// [`DagError::Db`] if the insert fails.
pub fn create_edge<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    parent: Option<&K>,
    child: &K,
) -> Result<(), DagError> {
    if parent == Some(child) {
        return Err(DagError::self_loop(child));
    }
    conn.prepare_cached(
        "INSERT INTO dag_links (collection, parent_id, child_id) VALUES (?1, ?2, ?3)",
    )?
    .execute(params![collection, parent, child])?;
    Ok(())
}

/// Delete every `parent → child` row. Returns the number removed.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the delete fails.
pub fn delete_edges<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    parent: Option<&K>,
    child: &K,
) -> Result<usize, DagError> {
    let removed = conn
        .prepare_cached(
            "DELETE FROM dag_links WHERE collection = ?1 AND parent_id IS ?2 AND child_id = ?3",
        )?
        .execute(params![collection, parent, child])?;
    Ok(removed)
}

/// Returns `true` if at least one `parent → child` row exists.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the lookup fails.
pub fn edge_exists<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    parent: Option<&K>,
    child: &K,
) -> Result<bool, DagError> {
    let found = conn
        .prepare_cached(
            "SELECT 1 FROM dag_links
             WHERE collection = ?1 AND parent_id IS ?2 AND child_id = ?3
             LIMIT 1",
        )?
        .query_row(params![collection, parent, child], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Every edge whose child is `child`, sentinel included, in insertion order.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the query fails.
pub fn edges_by_child<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    child: &K,
) -> Result<Vec<Edge<K>>, DagError> {
    let mut stmt = conn.prepare_cached(
        "SELECT parent_id FROM dag_links
         WHERE collection = ?1 AND child_id = ?2
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![collection, child], |row| row.get::<_, Option<K>>(0))?;
    let mut edges = Vec::new();
    for parent_id in rows {
        edges.push(Edge {
            parent_id: parent_id?,
            child_id: child.clone(),
        });
    }
    Ok(edges)
}

/// Every edge whose parent is `parent`, in insertion order.
///
/// Passing `None` lists the root sentinels, i.e. the current roots.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the query fails.
pub fn edges_by_parent<K: NodeKey>(
    conn: &Connection,
    collection: &str,
    parent: Option<&K>,
) -> Result<Vec<Edge<K>>, DagError> {
    let mut stmt = conn.prepare_cached(
        "SELECT child_id FROM dag_links
         WHERE collection = ?1 AND parent_id IS ?2
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![collection, parent], |row| row.get::<_, K>(0))?;
    let mut edges = Vec::new();
    for child_id in rows {
        edges.push(Edge {
            parent_id: parent.cloned(),
            child_id: child_id?,
        });
    }
    Ok(edges)
}

/// Every edge in the collection, in insertion order.
///
/// # Errors
///
/// Returns [`DagError::Db`] if the query fails.
pub fn all_edges<K: NodeKey>(conn: &Connection, collection: &str) -> Result<Vec<Edge<K>>, DagError> {
    let mut stmt = conn.prepare_cached(
        "SELECT parent_id, child_id FROM dag_links WHERE collection = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![collection], |row| {
        Ok(Edge {
            parent_id: row.get(0)?,
            child_id: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Delete every edge naming `id` as parent or child.
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
        "DELETE FROM dag_links WHERE collection = ?1 AND (parent_id = ?2 OR child_id = ?2)",
        params![collection, id],
    )?;
    Ok(removed)
}

/// Delete every edge touching any of `ids`, as parent or child.
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
            "DELETE FROM dag_links
             WHERE collection = ? AND (parent_id IN ({list}) OR child_id IN ({list}))"
        );
        // The id list appears twice; bind it twice.
        let mut values = bind_ids(&collection, chunk);
        values.extend(chunk.iter().map(|id| id as &dyn rusqlite::ToSql));
        removed += conn.execute(&sql, values.as_slice())?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    const C: &str = "tags";

    #[test]
    fn create_and_find_edges() {
        let conn = open_in_memory().unwrap();
        create_edge(&conn, C, None, &1_i64).unwrap();
        create_edge(&conn, C, Some(&1_i64), &2_i64).unwrap();
        create_edge(&conn, C, Some(&1_i64), &3_i64).unwrap();

        assert!(edge_exists(&conn, C, Some(&1_i64), &2_i64).unwrap());
        assert!(edge_exists(&conn, C, None, &1_i64).unwrap());
        assert!(!edge_exists(&conn, C, None, &2_i64).unwrap());

        let children: Vec<i64> = edges_by_parent(&conn, C, Some(&1_i64))
            .unwrap()
            .into_iter()
            .map(|e| e.child_id)
            .collect();
        assert_eq!(children, vec![2, 3]);

        let parents = edges_by_child(&conn, C, &2_i64).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].parent_id, Some(1));
        assert!(!parents[0].is_sentinel());
    }

    #[test]
    fn self_loop_is_rejected_before_sql() {
        let conn = open_in_memory().unwrap();
        let err = create_edge(&conn, C, Some(&5_i64), &5_i64).unwrap_err();
        assert!(matches!(err, DagError::SelfLoop { .. }));
        assert!(all_edges::<i64>(&conn, C).unwrap().is_empty());
    }

    #[test]
    fn sentinel_is_listed_by_null_parent() {
        let conn = open_in_memory().unwrap();
        create_edge(&conn, C, None, &"a".to_string()).unwrap();
        create_edge(&conn, C, None, &"b".to_string()).unwrap();

        let roots = edges_by_parent::<String>(&conn, C, None).unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(Edge::is_sentinel));
    }

    #[test]
    fn delete_edges_matches_null_parent_exactly() {
        let conn = open_in_memory().unwrap();
        create_edge(&conn, C, None, &2_i64).unwrap();
        create_edge(&conn, C, Some(&1_i64), &2_i64).unwrap();

        assert_eq!(delete_edges::<i64>(&conn, C, None, &2_i64).unwrap(), 1);
        let left = edges_by_child(&conn, C, &2_i64).unwrap();
        assert_eq!(left, vec![Edge { parent_id: Some(1), child_id: 2 }]);
    }

    #[test]
    fn collections_are_isolated() {
        let conn = open_in_memory().unwrap();
        create_edge(&conn, "tags", Some(&1_i64), &2_i64).unwrap();
        create_edge(&conn, "places", Some(&1_i64), &3_i64).unwrap();

        assert_eq!(edges_by_parent(&conn, "tags", Some(&1_i64)).unwrap().len(), 1);
        assert!(!edge_exists(&conn, "places", Some(&1_i64), &2_i64).unwrap());
    }

    #[test]
    fn delete_all_and_touching() {
        let conn = open_in_memory().unwrap();
        create_edge(&conn, C, Some(&1_i64), &2_i64).unwrap();
        create_edge(&conn, C, Some(&2_i64), &3_i64).unwrap();
        create_edge(&conn, C, Some(&3_i64), &4_i64).unwrap();

        assert_eq!(delete_all_for_node(&conn, C, &2_i64).unwrap(), 2);
        assert_eq!(all_edges::<i64>(&conn, C).unwrap().len(), 1);

        create_edge(&conn, C, Some(&1_i64), &2_i64).unwrap();
        assert_eq!(delete_touching(&conn, C, &[1_i64, 4]).unwrap(), 2);
        assert!(all_edges::<i64>(&conn, C).unwrap().is_empty());
    }
}
