//! Built-in node storage over the `dag_nodes` table.
//!
//! Embedders with their own node tables implement [`NodeSource`] instead;
//! this registry backs the `lin` CLI and the integration tests.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

use crate::db::write_tx;
use crate::engine::Dag;
use crate::error::DagError;
use crate::node::NodeSource;

/// Node source reading `dag_nodes` through the caller's connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteNodes;

/// DAG over registry nodes keyed by their integer id.
pub type NodeDag = Dag<i64, SqliteNodes>;

/// One row of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub id: i64,
    pub collection: String,
    pub name: String,
}

impl NodeRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            collection: row.get(1)?,
            name: row.get(2)?,
        })
    }
}

impl NodeSource<i64> for SqliteNodes {
    fn exists(&self, conn: &Connection, id: &i64) -> Result<bool, DagError> {
        let found = conn
            .prepare_cached("SELECT 1 FROM dag_nodes WHERE node_id = ?1")?
            .query_row([id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn name(&self, conn: &Connection, id: &i64) -> Result<Option<String>, DagError> {
        Ok(conn
            .prepare_cached("SELECT name FROM dag_nodes WHERE node_id = ?1")?
            .query_row([id], |row| row.get(0))
            .optional()?)
    }

    fn collection_of(&self, conn: &Connection, id: &i64) -> Result<Option<String>, DagError> {
        Ok(conn
            .prepare_cached("SELECT collection FROM dag_nodes WHERE node_id = ?1")?
            .query_row([id], |row| row.get(0))
            .optional()?)
    }
}

impl Dag<i64, SqliteNodes> {
    /// Register a node in this collection and give it its root sentinel and
    /// self row, all in one transaction. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the insert fails.
    pub fn create_node(&self, conn: &mut Connection, name: &str) -> Result<i64, DagError> {
        write_tx(conn, |tx| {
            tx.prepare_cached("INSERT INTO dag_nodes (collection, name) VALUES (?1, ?2)")?
                .execute(params![self.collection(), name])?;
            let id = tx.last_insert_rowid();
            self.initialize_node_tx(tx, &id)?;
            debug!(collection = self.collection(), id, name, "created node");
            Ok(id)
        })
    }

    /// # Errors
    ///
    /// [`DagError::Identity`] if `id` is not a node of this collection.
    pub fn rename_node(&self, conn: &mut Connection, id: i64, name: &str) -> Result<(), DagError> {
        write_tx(conn, |tx| {
            self.resolve(tx, &id)?;
            tx.prepare_cached("UPDATE dag_nodes SET name = ?1 WHERE node_id = ?2")?
                .execute(params![name, id])?;
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the lookup fails.
    pub fn get_node(&self, conn: &Connection, id: i64) -> Result<Option<NodeRecord>, DagError> {
        Ok(conn
            .prepare_cached(
                "SELECT node_id, collection, name FROM dag_nodes
                 WHERE node_id = ?1 AND collection = ?2",
            )?
            .query_row(params![id, self.collection()], NodeRecord::from_row)
            .optional()?)
    }

    /// Every node of the collection in id order.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn list_nodes(&self, conn: &Connection) -> Result<Vec<NodeRecord>, DagError> {
        let mut stmt = conn.prepare_cached(
            "SELECT node_id, collection, name FROM dag_nodes
             WHERE collection = ?1 ORDER BY node_id",
        )?;
        let rows = stmt.query_map([self.collection()], NodeRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Nodes of the collection named exactly `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn find_by_name(&self, conn: &Connection, name: &str) -> Result<Vec<NodeRecord>, DagError> {
        let mut stmt = conn.prepare_cached(
            "SELECT node_id, collection, name FROM dag_nodes
             WHERE collection = ?1 AND name = ?2 ORDER BY node_id",
        )?;
        let rows = stmt.query_map(params![self.collection(), name], NodeRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Detach `id` from the hierarchy, then drop its registry row.
    ///
    /// # Errors
    ///
    /// [`DagError::Identity`] if `id` is not a node of this collection.
    pub fn delete_node(&self, conn: &mut Connection, id: i64) -> Result<(), DagError> {
        write_tx(conn, |tx| {
            self.resolve(tx, &id)?;
            self.remove_node_tx(tx, &id)?;
            tx.prepare_cached("DELETE FROM dag_nodes WHERE node_id = ?1")?
                .execute([id])?;
            Ok(())
        })
    }
}
