//! Staged content for a single node.

use std::fmt;

use tyra_types::{Shape, TypePackVar, TypeVar};

/// Would-be content for one node, owned by exactly one [`TxnLog`](crate::TxnLog).
///
/// Created by the first staging call for the node in that log and dropped by
/// the log's `commit` or `clear`. Two logs that touch the same node hold two
/// independent entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending<C> {
    pub pending: C,
}

/// Pending state for a type node.
pub type PendingType = Pending<TypeVar>;

/// Pending state for a type pack node.
pub type PendingTypePack = Pending<TypePackVar>;

impl<C> Pending<C> {
    pub fn new(state: C) -> Self {
        Self { pending: state }
    }

    pub fn get<T: Shape<C>>(&self) -> Option<&T> {
        T::narrow(&self.pending)
    }

    /// Narrow the staged content for in-place editing.
    ///
    /// Staged content is meant to be edited freely, so unlike
    /// `TypeVar::get_mut` this does not object to redirect content.
    pub fn get_mut<T: Shape<C>>(&mut self) -> Option<&mut T> {
        T::narrow_mut(&mut self.pending)
    }

    pub fn is<T: Shape<C>>(&self) -> bool {
        T::narrow(&self.pending).is_some()
    }

    pub fn into_inner(self) -> C {
        self.pending
    }
}

impl<C: fmt::Debug> Pending<C> {
    /// Verbose structural dump of the staged content.
    pub fn dump(&self) -> String {
        format!("{:#?}", self.pending)
    }
}

impl<C: fmt::Display> fmt::Display for Pending<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use tyra_types::{
        BoundType, FreeType, TableState, TableType, TypeId, TypeLevel, TypePack,
    };

    #[test]
    fn display_renders_staged_content() {
        let pending = PendingType::new(TypeVar::new(BoundType {
            bound_to: TypeId::NUMBER,
        }));
        assert_snapshot!(pending.to_string(), @"bound t3");

        let pack = PendingTypePack::new(TypePack::closed(vec![TypeId::STRING]).into());
        assert_snapshot!(pack.to_string(), @"(t4)");
    }

    #[test]
    fn dump_is_structural() {
        let pending = PendingType::new(TypeVar::new(
            TableType::new(TableState::Free, TypeLevel::new(1, 0)).with_prop("x", TypeId::NUMBER),
        ));
        let dump = pending.dump();
        assert!(dump.contains("TableType"), "{dump}");
        assert!(dump.contains("props"), "{dump}");
        assert!(dump.contains("Free"), "{dump}");
        assert!(dump.contains('\n'), "dump should be multi-line: {dump}");
    }

    #[test]
    fn get_mut_edits_in_place_even_on_redirects() {
        let mut pending = PendingType::new(TypeVar::new(BoundType {
            bound_to: TypeId::NIL,
        }));
        assert!(pending.get_mut::<FreeType>().is_none());
        if let Some(bound) = pending.get_mut::<BoundType>() {
            bound.bound_to = TypeId::STRING;
        }
        assert_eq!(
            pending.get::<BoundType>().map(|b| b.bound_to),
            Some(TypeId::STRING)
        );
        assert!(!pending.is::<TableType>());
    }

    #[test]
    fn into_inner_returns_owned_content() {
        let pack = PendingTypePack::new(TypePack::closed(Vec::new()).into());
        let content = pack.into_inner();
        assert!(content.is::<TypePack>());
    }
}
