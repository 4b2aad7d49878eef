//! Cycle guard shared by a family of nested logs.
//!
//! Structural comparison of a cyclic graph recurses forever unless it can tell
//! that a pair of nodes is already being compared further up the stack. The
//! stack lives behind an `Rc` created by the root log and cloned into every
//! log nested under it, so speculative sub-attempts see exactly the pairs
//! their enclosing comparison has in flight.

use std::cell::RefCell;
use std::rc::Rc;

use tyra_types::TypeOrPackId;

/// An order-normalized pair of nodes under comparison.
pub type SeenPair = (TypeOrPackId, TypeOrPackId);

fn sorted_pair(lhs: TypeOrPackId, rhs: TypeOrPackId) -> SeenPair {
    if lhs > rhs {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    }
}

/// Handle to a seen stack. Clones share the same stack.
#[derive(Debug, Clone, Default)]
pub struct SharedSeen(Rc<RefCell<Vec<SeenPair>>>);

impl SharedSeen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, lhs: TypeOrPackId, rhs: TypeOrPackId) -> bool {
        let pair = sorted_pair(lhs, rhs);
        self.0.borrow().contains(&pair)
    }

    pub fn push(&self, lhs: TypeOrPackId, rhs: TypeOrPackId) {
        self.0.borrow_mut().push(sorted_pair(lhs, rhs));
    }

    /// Pop `(lhs, rhs)`, which must be the most recent push.
    pub fn pop(&self, lhs: TypeOrPackId, rhs: TypeOrPackId) {
        let pair = sorted_pair(lhs, rhs);
        let mut stack = self.0.borrow_mut();
        debug_assert_eq!(
            stack.last(),
            Some(&pair),
            "seen pairs must be popped in reverse push order"
        );
        if let Some(pos) = stack.iter().rposition(|p| *p == pair) {
            stack.remove(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Whether both handles point at the same stack.
    pub fn ptr_eq(&self, other: &SharedSeen) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Keeps a pair on the seen stack until dropped.
///
/// Holding the guard does not borrow the log, so the comparison it protects
/// can keep staging changes. Because release happens in `Drop`, every exit
/// path (including `?` early returns) pops the pair.
#[must_use = "the pair is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SeenGuard {
    seen: SharedSeen,
    pair: SeenPair,
}

impl SeenGuard {
    pub fn new(seen: SharedSeen, lhs: TypeOrPackId, rhs: TypeOrPackId) -> Self {
        seen.push(lhs, rhs);
        Self {
            seen,
            pair: sorted_pair(lhs, rhs),
        }
    }
}

impl Drop for SeenGuard {
    fn drop(&mut self) {
        self.seen.pop(self.pair.0, self.pair.1);
    }
}
