use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    UnresolvedNode,
    SelfLoop,
    TypeMismatch,
    CycleDetected,
    CorruptStore,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::UnresolvedNode => "E2001",
            Self::SelfLoop => "E2002",
            Self::TypeMismatch => "E2003",
            Self::CycleDetected => "E2004",
            Self::CorruptStore => "E3001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::UnresolvedNode => "Node id does not resolve",
            Self::SelfLoop => "Self-referential link",
            Self::TypeMismatch => "Parent and child belong to different collections",
            Self::CycleDetected => "Hierarchy contains a cycle",
            Self::CorruptStore => "Closure table out of sync with links",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `lin init` to create the store."),
            Self::ConfigParseError => Some("Fix syntax in .lineage/config.toml and retry."),
            Self::UnresolvedNode => Some("Create the node before linking it."),
            Self::SelfLoop => Some("Pick a parent that differs from the child."),
            Self::TypeMismatch => None,
            Self::CycleDetected => Some("Unlink one edge of the loop, then run `lin verify`."),
            Self::CorruptStore => Some("Run `lin reorganize --reset` or re-link the affected nodes."),
            Self::LockContention => Some("Retry after the other `lin` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the edge store, closure store, and closure engine.
///
/// Node ids are carried in their `Debug` rendering so the error type stays
/// independent of the key type a collection uses.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// An operation was handed an id the node source does not know.
    #[error("node {id} does not resolve to a stored node")]
    Identity { id: String },

    /// A link whose parent and child are the same node.
    #[error("self referential link on node {id} cannot be created")]
    SelfLoop { id: String },

    /// Parent and child belong to different logical collections.
    #[error("node {id} belongs to collection '{actual}', expected '{expected}'")]
    TypeMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// A rebuild walk reached a node already on its own path.
    #[error("cycle detected at node {id}; hierarchy must stay acyclic")]
    CycleDetected { id: String },

    /// Configuration could not be applied.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl DagError {
    pub(crate) fn identity(id: &impl fmt::Debug) -> Self {
        Self::Identity {
            id: format!("{id:?}"),
        }
    }

    pub(crate) fn self_loop(id: &impl fmt::Debug) -> Self {
        Self::SelfLoop {
            id: format!("{id:?}"),
        }
    }

    pub(crate) fn cycle(id: &impl fmt::Debug) -> Self {
        Self::CycleDetected {
            id: format!("{id:?}"),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Identity { .. } => ErrorCode::UnresolvedNode,
            Self::SelfLoop { .. } => ErrorCode::SelfLoop,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::Config(_) => ErrorCode::ConfigParseError,
            Self::Db(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Whether the caller may retry with different arguments.
    ///
    /// Identity and type errors are caller bugs; a self-loop is a rejected
    /// request that leaves the store untouched.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::SelfLoop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{DagError, ErrorCode};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::UnresolvedNode,
            ErrorCode::SelfLoop,
            ErrorCode::TypeMismatch,
            ErrorCode::CycleDetected,
            ErrorCode::CorruptStore,
            ErrorCode::LockContention,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::SelfLoop.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn dag_error_maps_to_codes() {
        assert_eq!(DagError::identity(&7_i64).code(), ErrorCode::UnresolvedNode);
        assert_eq!(DagError::self_loop(&7_i64).code(), ErrorCode::SelfLoop);
        assert_eq!(DagError::cycle(&"a").code(), ErrorCode::CycleDetected);
        assert!(DagError::self_loop(&1_i64).hint().is_some());
    }

    #[test]
    fn only_self_loop_is_recoverable() {
        assert!(DagError::self_loop(&1_i64).is_recoverable());
        assert!(!DagError::identity(&1_i64).is_recoverable());
        let mismatch = DagError::TypeMismatch {
            id: "1".into(),
            expected: "tags".into(),
            actual: "places".into(),
        };
        assert!(!mismatch.is_recoverable());
    }

    #[test]
    fn display_mentions_offending_id() {
        let e = DagError::self_loop(&"bark");
        assert!(e.to_string().contains("\"bark\""), "display: {e}");
        let e = DagError::identity(&42_i64);
        assert!(e.to_string().contains("42"), "display: {e}");
    }
}
