//! Node identity and the node-storage collaborator seam.
//!
//! The closure engine never owns nodes. It needs three things from whoever
//! does: whether an id exists, the node's name (for the classifier), and
//! optionally which collection the node belongs to (for type checks on
//! shared tables). [`NodeSource`] is that seam.

use rusqlite::Connection;
use rusqlite::types::{FromSql, ToSql};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::DagError;

/// Stable unique identifier for a node.
///
/// Blanket-implemented for every type SQLite can round-trip that is also
/// hashable and totally ordered, e.g. `i64` and `String`.
pub trait NodeKey: Clone + Eq + Hash + Ord + fmt::Debug + ToSql + FromSql {}

impl<T> NodeKey for T where T: Clone + Eq + Hash + Ord + fmt::Debug + ToSql + FromSql {}

/// Read-only view of the node storage the engine runs against.
///
/// Every method receives the connection of the current unit of work, so a
/// SQLite-backed source observes uncommitted writes of the same transaction.
pub trait NodeSource<K> {
    /// Returns `true` if `id` names a live node.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the lookup fails.
    fn exists(&self, conn: &Connection, id: &K) -> Result<bool, DagError>;

    /// The node's display name, or `None` when the node is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the lookup fails.
    fn name(&self, conn: &Connection, id: &K) -> Result<Option<String>, DagError>;

    /// Logical collection the node belongs to, when the source tracks it.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the lookup fails.
    fn collection_of(&self, _conn: &Connection, _id: &K) -> Result<Option<String>, DagError> {
        Ok(None)
    }
}

/// In-memory names keyed by id. Nodes are whatever keys the map holds.
impl<K: NodeKey> NodeSource<K> for HashMap<K, String> {
    fn exists(&self, _conn: &Connection, id: &K) -> Result<bool, DagError> {
        Ok(self.contains_key(id))
    }

    fn name(&self, _conn: &Connection, id: &K) -> Result<Option<String>, DagError> {
        Ok(self.get(id).cloned())
    }
}
