//! Name-based classifier.
//!
//! A node belongs under another when its name holds every word of the other
//! name plus at least one more: "hemp fibre" sits under "fibre", and
//! "indian hemp fibre" under "hemp fibre". Words are whitespace-separated
//! and compared as sets, so "goat wool" and "wool goat" are equivalent
//! parents of "goat wool fibre".
//!
//! Placement only ever goes through [`Dag::link`]; nothing here touches
//! the closure store.

use rusqlite::{Connection, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::db::write_tx;
use crate::engine::Dag;
use crate::error::DagError;
use crate::node::{NodeKey, NodeSource};
use crate::query::unique;

/// Distinct whitespace-separated words of `name`.
pub fn word_set(name: &str) -> BTreeSet<&str> {
    name.split_whitespace().collect()
}

/// Number of whitespace-separated words in `name`, repeats counted.
pub fn word_count(name: &str) -> usize {
    name.split_whitespace().count()
}

/// `true` iff `candidate` holds every word of `parent` and at least one
/// word `parent` lacks.
pub fn should_descend_from(parent: &str, candidate: &str) -> bool {
    let parent_words = word_set(parent);
    let candidate_words = word_set(candidate);
    parent_words.is_subset(&candidate_words) && candidate_words.len() > parent_words.len()
}

/// Size of the word-set intersection. Used only to rank candidates.
pub fn matching_word_count(a: &str, b: &str) -> usize {
    word_set(a).intersection(&word_set(b)).count()
}

impl<K: NodeKey, S: NodeSource<K>> Dag<K, S> {
    /// Name of `id` from the node source.
    ///
    /// # Errors
    ///
    /// [`DagError::Identity`] if the source has no name for `id`.
    pub fn name_of(&self, conn: &Connection, id: &K) -> Result<String, DagError> {
        self.source()
            .name(conn, id)?
            .ok_or_else(|| DagError::identity(id))
    }

    /// Words of `n`'s name that appear in none of its parents' names.
    ///
    /// # Errors
    ///
    /// [`DagError::Identity`] if a name is missing, [`DagError::Db`] on
    /// query failure.
    pub fn unique_name_portion(&self, conn: &Connection, n: &K) -> Result<Option<String>, DagError> {
        let name = self.name_of(conn, n)?;
        let parent_names = self
            .parents(conn, n)?
            .iter()
            .map(|parent| self.name_of(conn, parent))
            .collect::<Result<Vec<_>, _>>()?;
        let mut parent_words = BTreeSet::new();
        for parent_name in &parent_names {
            parent_words.extend(parent_name.split_whitespace());
        }

        let portion: Vec<&str> = name
            .split_whitespace()
            .filter(|word| !parent_words.contains(word))
            .collect();
        Ok((!portion.is_empty()).then(|| portion.join(" ")))
    }

    /// Drop `candidate` into the deepest matching spots under `root`.
    ///
    /// Returns `false`, changing nothing, when `candidate` does not belong
    /// under `root` at all.
    pub fn plinko(&self, conn: &mut Connection, root: &K, candidate: &K) -> Result<bool, DagError> {
        write_tx(conn, |tx| self.plinko_tx(tx, root, candidate))
    }

    pub fn plinko_tx(
        &self,
        tx: &Transaction<'_>,
        root: &K,
        candidate: &K,
    ) -> Result<bool, DagError> {
        let candidate_name = self.name_of(tx, candidate)?;
        if root == candidate || !should_descend_from(&self.name_of(tx, root)?, &candidate_name) {
            return Ok(false);
        }

        // Every spot under the root the candidate could legally sit.
        let mut scored: Vec<(usize, K, String)> = Vec::new();
        for node in unique(self.subtree(tx, root)?) {
            if node == *candidate {
                continue;
            }
            let name = self.name_of(tx, &node)?;
            if should_descend_from(&name, &candidate_name) {
                scored.push((matching_word_count(&candidate_name, &name), node, name));
            }
        }

        let Some(best) = scored.iter().map(|(score, ..)| *score).max() else {
            return Ok(false);
        };
        for (_, parent, parent_name) in scored.iter().filter(|(score, ..)| *score == best) {
            self.link_tx(tx, Some(parent), candidate)?;
            debug!(
                candidate = candidate_name.as_str(),
                parent = parent_name.as_str(),
                score = best,
                "plinko placed node"
            );
        }
        Ok(true)
    }

    /// Plinko each of `others` under `root`, shortest names first so longer
    /// names find the shorter ones already placed. Returns the nodes that
    /// found no spot.
    pub fn plinko_multiple(
        &self,
        conn: &mut Connection,
        root: &K,
        others: &[K],
    ) -> Result<Vec<K>, DagError> {
        write_tx(conn, |tx| {
            let mut unplaced = Vec::new();
            for group in self.word_count_groups(tx, others)?.into_values() {
                for (_, node) in group {
                    if !self.plinko_tx(tx, root, &node)? {
                        unplaced.push(node);
                    }
                }
            }
            Ok(unplaced)
        })
    }

    /// Arrange `nodes` by name.
    ///
    /// The shortest names seed the set of roots. Each longer group is
    /// plinkoed into every root; a node that fits under none becomes a root
    /// itself for the groups after it. Existing placement is kept, see
    /// [`Dag::reorganize_all`] for a clean rebuild.
    pub fn reorganize(&self, conn: &mut Connection, nodes: &[K]) -> Result<(), DagError> {
        write_tx(conn, |tx| self.reorganize_tx(tx, nodes))
    }

    pub fn reorganize_tx(&self, tx: &Transaction<'_>, nodes: &[K]) -> Result<(), DagError> {
        let mut groups = self.word_count_groups(tx, nodes)?.into_iter();
        let Some((shortest, seed)) = groups.next() else {
            return Ok(());
        };
        let mut roots: Vec<K> = seed.into_iter().map(|(_, id)| id).collect();
        info!(
            collection = self.collection(),
            nodes = nodes.len(),
            seed_words = shortest,
            seed_roots = roots.len(),
            "reorganizing"
        );

        for (words, group) in groups {
            let mut promoted = Vec::new();
            for (name, node) in group {
                let mut placed = false;
                for root in &roots {
                    placed |= self.plinko_tx(tx, root, &node)?;
                }
                if !placed {
                    info!(name = name.as_str(), words, "no suitable parent; promoting to root");
                    promoted.push(node);
                }
            }
            roots.extend(promoted);
        }
        Ok(())
    }

    /// Reset the hierarchy of `nodes`, then reorganize them, in one
    /// transaction. Pass [`Dag::nodes`] to rebuild the whole collection.
    ///
    /// Starting from bare roots keeps stale placement from hiding a better
    /// parent, e.g. "walrus ivory" stuck under "ivory" when "walrus" arrives.
    /// Nodes outside the set keep their own links.
    pub fn reorganize_all(&self, conn: &mut Connection, nodes: &[K]) -> Result<(), DagError> {
        write_tx(conn, |tx| self.reorganize_all_tx(tx, nodes))
    }

    pub fn reorganize_all_tx(&self, tx: &Transaction<'_>, nodes: &[K]) -> Result<(), DagError> {
        self.reset_hierarchy_tx(tx, nodes)?;
        self.reorganize_tx(tx, nodes)
    }

    /// `nodes` grouped by word count, ascending, each group sorted by name.
    fn word_count_groups(
        &self,
        conn: &Connection,
        nodes: &[K],
    ) -> Result<BTreeMap<usize, Vec<(String, K)>>, DagError> {
        let mut groups: BTreeMap<usize, Vec<(String, K)>> = BTreeMap::new();
        for node in unique(nodes.iter().cloned()) {
            let name = self.name_of(conn, &node)?;
            groups.entry(word_count(&name)).or_default().push((name, node));
        }
        for group in groups.values_mut() {
            group.sort();
        }
        Ok(groups)
    }
}
