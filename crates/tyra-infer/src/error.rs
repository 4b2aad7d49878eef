use thiserror::Error;
use tyra_types::{TypeId, TypeOrPackId, TypePackId};

/// Why a unification attempt failed.
///
/// A failed attempt may have staged partial work in the unifier's log; the
/// caller drops the log (or the child unifier) to discard it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnifyError {
    #[error("type {sub} could not be converted into {sup}")]
    TypeMismatch { sub: TypeId, sup: TypeId },

    #[error("type pack {sub} could not be converted into {sup}")]
    PackMismatch { sub: TypePackId, sup: TypePackId },

    #[error("{var} occurs in {within}; the result would be infinite")]
    OccursCheck {
        var: TypeOrPackId,
        within: TypeOrPackId,
    },

    #[error("table {table} is missing property `{name}`")]
    MissingProperty { table: TypeId, name: String },

    #[error("expected {expected} values, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("unification exceeded the recursion limit of {limit}")]
    RecursionLimit { limit: usize },
}
