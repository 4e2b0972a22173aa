//! Scope error types.

use thiserror::Error;

/// Result type for scope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// A target that could not be restored during rollback.
///
/// Carried by [`ScopeError::RollbackIncomplete`] so callers can tell which
/// targets were left with their mutated state.
#[derive(Debug)]
pub struct FailedRestore {
    /// Name the target was tracked under.
    pub name: String,
    /// Why restoration failed.
    pub error: Box<ScopeError>,
}

/// Errors that can occur during scope operations.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// No target is tracked under the given name.
    #[error("no target tracked as {0:?}")]
    UnknownTarget(String),

    /// A target with this name is already tracked in the scope.
    #[error("target {0:?} is already tracked in this scope")]
    DuplicateTarget(String),

    /// The target's slot is borrowed in a way that blocks the operation.
    #[error("target {0:?} is borrowed elsewhere; release outstanding borrows first")]
    TargetBusy(String),

    /// One or more targets could not be restored at exit.
    ///
    /// Restoration is best-effort: every other target was still attempted
    /// before this error was produced.
    #[error("rollback incomplete; could not restore: {}", failed_names(.0))]
    RollbackIncomplete(Vec<FailedRestore>),
}

impl ScopeError {
    /// Create an unknown-target error.
    pub fn unknown_target(name: impl Into<String>) -> Self {
        Self::UnknownTarget(name.into())
    }

    /// Create a duplicate-target error.
    pub fn duplicate_target(name: impl Into<String>) -> Self {
        Self::DuplicateTarget(name.into())
    }

    /// Create a target-busy error.
    pub fn target_busy(name: impl Into<String>) -> Self {
        Self::TargetBusy(name.into())
    }
}

fn failed_names(failures: &[FailedRestore]) -> String {
    failures
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_target_display() {
        let err = ScopeError::unknown_target("ls");
        assert_eq!(err.to_string(), "no target tracked as \"ls\"");
    }

    #[test]
    fn test_duplicate_target_display() {
        let err = ScopeError::duplicate_target("a");
        assert_eq!(err.to_string(), "target \"a\" is already tracked in this scope");
    }

    #[test]
    fn test_rollback_incomplete_lists_names() {
        let err = ScopeError::RollbackIncomplete(vec![
            FailedRestore {
                name: "a".to_string(),
                error: Box::new(ScopeError::target_busy("a")),
            },
            FailedRestore {
                name: "b".to_string(),
                error: Box::new(ScopeError::target_busy("b")),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("rollback incomplete"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn test_failed_restore_keeps_cause() {
        let failure = FailedRestore {
            name: "a".to_string(),
            error: Box::new(ScopeError::target_busy("a")),
        };
        assert!(matches!(*failure.error, ScopeError::TargetBusy(_)));
    }
}
