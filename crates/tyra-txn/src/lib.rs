//! Speculative mutation and rollback for the Tyra type graph.
//!
//! Inference often has to try a unification that may fail: one option of a
//! union, an overload, a subtyping check that has to be abandoned halfway.
//! Instead of rewriting nodes in place, the checker stages replacement content
//! in a [`TxnLog`]. Staged content is visible through the log's accessors and
//! invisible to everyone else until the log is committed. An attempt that
//! fails is dropped (or cleared) and leaves the graph untouched.
//!
//! Logs nest. A child log is created for each speculative sub-attempt; on
//! success its entries are merged into the parent with [`TxnLog::concat`].
//! A child never sees its parent's staged content, only live content and its
//! own entries. All logs in a family share one stack of in-progress node
//! pairs, used to stop recursive comparisons of cyclic types.
//!
//! [`TxnLog::inverse`] snapshots the live content of everything a log is
//! about to change, which gives a committed log an undo.

pub mod log;
pub mod pending;
pub mod seen;
pub mod trace;

pub use log::{Changes, Staged, TxnLog, TxnOptions, TxnState};
pub use pending::{Pending, PendingType, PendingTypePack};
pub use seen::{SeenGuard, SeenPair, SharedSeen};
pub use trace::{TxnAction, TxnStep, TxnTrace};

#[cfg(test)]
mod prop_tests;
