//! Persistence for the two hierarchy relations.
//!
//! - [`edges`]: direct parent→child links, including the root sentinel
//! - [`closure`]: (ancestor, descendant, distance) triples
//!
//! Both modules are plain CRUD scoped to one collection. Keeping the two
//! relations consistent is the closure engine's job, not theirs.

pub mod closure;
pub mod edges;

use rusqlite::ToSql;

/// Upper bound on ids bound into one `IN (...)` list.
pub(crate) const MAX_BOUND_IDS: usize = 400;

/// `?, ?, ?` with `count` placeholders.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Collection parameter followed by every id in `ids`.
pub(crate) fn bind_ids<'a, K: ToSql>(
    collection: &'a dyn ToSql,
    ids: &'a [K],
) -> Vec<&'a dyn ToSql> {
    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(ids.len() + 1);
    values.push(collection);
    values.extend(ids.iter().map(|id| id as &dyn ToSql));
    values
}

#[cfg(test)]
mod tests {
    use super::{bind_ids, placeholders};

    #[test]
    fn placeholders_are_comma_separated() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn bind_ids_puts_collection_first() {
        let ids = [4_i64, 5, 6];
        assert_eq!(bind_ids(&"tags", &ids).len(), 4);
    }
}
