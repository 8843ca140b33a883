//! Read-only hierarchy queries derived from the edge and closure stores.
//!
//! Sequences straight from the closure store keep one entry per stored
//! distance, so a node reachable along paths of different length shows up
//! once per length. Callers wanting a node set pass the result through
//! [`unique`].

use rusqlite::Connection;
use std::collections::HashSet;
use std::hash::Hash;

use crate::engine::Dag;
use crate::error::DagError;
use crate::node::{NodeKey, NodeSource};
use crate::store::{closure, edges};

/// Drop repeated items, keeping the first occurrence of each.
pub fn unique<T, I>(items: I) -> Vec<T>
where
    T: Clone + Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

impl<K: NodeKey, S: NodeSource<K>> Dag<K, S> {
    /// Ancestors of `n`, most distant first, `n` excluded.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn ancestors(&self, conn: &Connection, n: &K) -> Result<Vec<K>, DagError> {
        Ok(closure::entries_where_descendant(conn, self.collection(), n)?
            .into_iter()
            .filter(|(_, distance)| *distance > 0)
            .map(|(id, _)| id)
            .collect())
    }

    /// Descendants of `n`, nearest first, `n` excluded.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn descendants(&self, conn: &Connection, n: &K) -> Result<Vec<K>, DagError> {
        Ok(closure::entries_where_ancestor(conn, self.collection(), n)?
            .into_iter()
            .filter(|(_, distance)| *distance > 0)
            .map(|(id, _)| id)
            .collect())
    }

    /// Ancestors of `n` followed by `n` itself.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn path(&self, conn: &Connection, n: &K) -> Result<Vec<K>, DagError> {
        Ok(closure::entries_where_descendant(conn, self.collection(), n)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// `n` itself followed by its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn subtree(&self, conn: &Connection, n: &K) -> Result<Vec<K>, DagError> {
        Ok(closure::entries_where_ancestor(conn, self.collection(), n)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Real parents of `n` in link order.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn parents(&self, conn: &Connection, n: &K) -> Result<Vec<K>, DagError> {
        Ok(edges::edges_by_child(conn, self.collection(), n)?
            .into_iter()
            .filter_map(|edge| edge.parent_id)
            .collect())
    }

    /// Children of `n` in link order.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn children(&self, conn: &Connection, n: &K) -> Result<Vec<K>, DagError> {
        Ok(edges::edges_by_parent(conn, self.collection(), Some(n))?
            .into_iter()
            .map(|edge| edge.child_id)
            .collect())
    }

    /// Ancestors then descendants: furthest ancestor down to furthest
    /// descendant, `n` excluded.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if a query fails.
    pub fn lineage(&self, conn: &Connection, n: &K) -> Result<Vec<K>, DagError> {
        let mut out = self.ancestors(conn, n)?;
        out.extend(self.descendants(conn, n)?);
        Ok(out)
    }

    /// `true` iff `n` has edges and every one of them is the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn is_root(&self, conn: &Connection, n: &K) -> Result<bool, DagError> {
        let links = edges::edges_by_child(conn, self.collection(), n)?;
        Ok(!links.is_empty() && links.iter().all(edges::Edge::is_sentinel))
    }

    /// `true` iff no edge names `n` as parent.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn is_leaf(&self, conn: &Connection, n: &K) -> Result<bool, DagError> {
        Ok(edges::edges_by_parent(conn, self.collection(), Some(n))?.is_empty())
    }

    /// `true` iff `child` hangs directly under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn child_of(&self, conn: &Connection, child: &K, parent: &K) -> Result<bool, DagError> {
        edges::edge_exists(conn, self.collection(), Some(parent), child)
    }

    /// `true` iff `parent` is a direct parent of `child`.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn parent_of(&self, conn: &Connection, parent: &K, child: &K) -> Result<bool, DagError> {
        edges::edge_exists(conn, self.collection(), Some(parent), child)
    }

    /// `true` iff `ancestor` reaches `descendant` by at least one edge.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn ancestor_of(
        &self,
        conn: &Connection,
        ancestor: &K,
        descendant: &K,
    ) -> Result<bool, DagError> {
        Ok(self.distance_between(conn, ancestor, descendant)?.is_some())
    }

    /// `true` iff `descendant` is reachable from `ancestor`.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn descendant_of(
        &self,
        conn: &Connection,
        descendant: &K,
        ancestor: &K,
    ) -> Result<bool, DagError> {
        self.ancestor_of(conn, ancestor, descendant)
    }

    /// Shortest stored distance between `a` and `b` in either direction.
    ///
    /// `None` when the nodes are unrelated or equal.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn distance_to(&self, conn: &Connection, a: &K, b: &K) -> Result<Option<u32>, DagError> {
        let down = self.distance_between(conn, a, b)?;
        let up = self.distance_between(conn, b, a)?;
        Ok(down.into_iter().chain(up).min())
    }

    fn distance_between(
        &self,
        conn: &Connection,
        ancestor: &K,
        descendant: &K,
    ) -> Result<Option<u32>, DagError> {
        let mut stmt = conn.prepare_cached(
            "SELECT MIN(distance) FROM dag_descendants
             WHERE collection = ?1 AND ancestor_id = ?2 AND descendant_id = ?3
               AND distance > 0",
        )?;
        let distance: Option<u32> = stmt.query_row(
            rusqlite::params![self.collection(), ancestor, descendant],
            |row| row.get(0),
        )?;
        Ok(distance)
    }

    /// Every node of the collection, i.e. every id with a self row.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn nodes(&self, conn: &Connection) -> Result<Vec<K>, DagError> {
        let mut stmt = conn.prepare_cached(
            "SELECT ancestor_id FROM dag_descendants
             WHERE collection = ?1 AND distance = 0 AND ancestor_id = descendant_id
             ORDER BY ancestor_id",
        )?;
        let rows = stmt.query_map([self.collection()], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Nodes that carry the root sentinel, in the order they became roots.
    ///
    /// Under `allow_root_and_parent` this includes roots that also have
    /// real parents.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn roots(&self, conn: &Connection) -> Result<Vec<K>, DagError> {
        Ok(edges::edges_by_parent(conn, self.collection(), None)?
            .into_iter()
            .map(|edge| edge.child_id)
            .collect())
    }

    /// Nodes with no children.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Db`] if the query fails.
    pub fn leaves(&self, conn: &Connection) -> Result<Vec<K>, DagError> {
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT l.child_id FROM dag_links l
             WHERE l.collection = ?1
               AND NOT EXISTS (
                   SELECT 1 FROM dag_links c
                   WHERE c.collection = l.collection AND c.parent_id = l.child_id
               )
             ORDER BY l.child_id",
        )?;
        let rows = stmt.query_map([self.collection()], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub(crate) fn has_real_parent(&self, conn: &Connection, n: &K) -> Result<bool, DagError> {
        Ok(edges::edges_by_child(conn, self.collection(), n)?
            .iter()
            .any(|edge| !edge.is_sentinel()))
    }
}

#[cfg(test)]
mod tests {
    use super::unique;
    use crate::config::DagConfig;
    use crate::db::open_in_memory;
    use crate::engine::Dag;
    use rusqlite::Connection;
    use std::collections::HashMap;

    type TestDag = Dag<i64, HashMap<i64, String>>;

    fn test_db(count: i64) -> (Connection, TestDag) {
        let mut conn = open_in_memory().unwrap();
        let names: HashMap<i64, String> =
            (1..=count).map(|id| (id, format!("node {id}"))).collect();
        let dag = Dag::new(DagConfig::for_collection("q"), names).unwrap();
        for id in 1..=count {
            dag.initialize_node(&mut conn, &id).unwrap();
        }
        (conn, dag)
    }

    #[test]
    fn fresh_node_is_a_lone_root_leaf() {
        let (conn, dag) = test_db(1);
        assert!(dag.is_root(&conn, &1).unwrap());
        assert!(dag.is_leaf(&conn, &1).unwrap());
        assert!(dag.ancestors(&conn, &1).unwrap().is_empty());
        assert!(dag.descendants(&conn, &1).unwrap().is_empty());
        assert_eq!(dag.path(&conn, &1).unwrap(), vec![1]);
        assert_eq!(dag.subtree(&conn, &1).unwrap(), vec![1]);
    }

    #[test]
    fn chain_orders_ancestors_far_first_and_descendants_near_first() {
        let (mut conn, dag) = test_db(4);
        for (p, c) in [(1, 2), (2, 3), (3, 4)] {
            dag.link(&mut conn, Some(&p), &c).unwrap();
        }

        assert_eq!(dag.ancestors(&conn, &4).unwrap(), vec![1, 2, 3]);
        assert_eq!(dag.descendants(&conn, &1).unwrap(), vec![2, 3, 4]);
        assert_eq!(dag.path(&conn, &3).unwrap(), vec![1, 2, 3]);
        assert_eq!(dag.subtree(&conn, &2).unwrap(), vec![2, 3, 4]);
        assert_eq!(dag.lineage(&conn, &2).unwrap(), vec![1, 3, 4]);
    }

    #[test]
    fn predicates_follow_direct_and_transitive_edges() {
        let (mut conn, dag) = test_db(3);
        dag.link(&mut conn, Some(&1), &2).unwrap();
        dag.link(&mut conn, Some(&2), &3).unwrap();

        assert!(dag.parent_of(&conn, &1, &2).unwrap());
        assert!(dag.child_of(&conn, &2, &1).unwrap());
        assert!(!dag.child_of(&conn, &3, &1).unwrap());
        assert!(dag.ancestor_of(&conn, &1, &3).unwrap());
        assert!(dag.descendant_of(&conn, &3, &1).unwrap());
        assert!(!dag.ancestor_of(&conn, &3, &1).unwrap());
        assert!(!dag.ancestor_of(&conn, &1, &1).unwrap());
        assert!(!dag.is_root(&conn, &2).unwrap());
        assert!(!dag.is_leaf(&conn, &2).unwrap());
    }

    #[test]
    fn distance_to_takes_the_shortest_path_either_way() {
        let (mut conn, dag) = test_db(4);
        for (p, c) in [(1, 2), (2, 3), (1, 3)] {
            dag.link(&mut conn, Some(&p), &c).unwrap();
        }

        assert_eq!(dag.distance_to(&conn, &1, &3).unwrap(), Some(1));
        assert_eq!(dag.distance_to(&conn, &3, &1).unwrap(), Some(1));
        assert_eq!(dag.distance_to(&conn, &1, &4).unwrap(), None);
        assert_eq!(dag.distance_to(&conn, &2, &2).unwrap(), None);
    }

    #[test]
    fn multi_length_paths_repeat_until_deduplicated() {
        let (mut conn, dag) = test_db(3);
        for (p, c) in [(1, 2), (2, 3), (1, 3)] {
            dag.link(&mut conn, Some(&p), &c).unwrap();
        }

        let descendants = dag.descendants(&conn, &1).unwrap();
        assert_eq!(descendants, vec![2, 3, 3]);
        assert_eq!(unique(descendants), vec![2, 3]);
    }

    #[test]
    fn parents_and_children_keep_link_order() {
        let (mut conn, dag) = test_db(4);
        dag.add_child(&mut conn, &1, &[4, 2, 3]).unwrap();
        dag.add_parent(&mut conn, &4, &[3]).unwrap();

        assert_eq!(dag.children(&conn, &1).unwrap(), vec![4, 2, 3]);
        assert_eq!(dag.parents(&conn, &4).unwrap(), vec![1, 3]);
    }

    #[test]
    fn collection_scopes_list_nodes_roots_and_leaves() {
        let (mut conn, dag) = test_db(4);
        dag.link(&mut conn, Some(&1), &2).unwrap();
        dag.link(&mut conn, Some(&1), &3).unwrap();

        assert_eq!(dag.nodes(&conn).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(dag.roots(&conn).unwrap(), vec![1, 4]);
        assert_eq!(dag.leaves(&conn).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn root_with_parent_is_not_root_by_predicate() {
        let mut config = DagConfig::for_collection("q");
        config.allow_root_and_parent = true;
        let mut conn = open_in_memory().unwrap();
        let names = HashMap::from([(1_i64, String::from("a")), (2, String::from("b"))]);
        let dag = Dag::new(config, names).unwrap();
        dag.initialize_node(&mut conn, &1).unwrap();
        dag.initialize_node(&mut conn, &2).unwrap();
        dag.link(&mut conn, Some(&1), &2).unwrap();

        assert!(!dag.is_root(&conn, &2).unwrap());
        assert_eq!(dag.roots(&conn).unwrap(), vec![1, 2]);
    }

    #[test]
    fn unique_keeps_first_occurrence() {
        assert_eq!(unique(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
