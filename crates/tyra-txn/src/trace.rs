//! Staging traces for observability.
//!
//! A log can record every staging action it performs so tooling can show how
//! a speculative attempt built up its change set. Tracing is opt-in via
//! `TxnLog::enable_tracing()`; nothing is rendered when it is off.

use serde::Serialize;

/// A single recorded staging action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxnStep {
    pub step: usize,
    pub action: TxnAction,
    /// The node acted on, for per-node actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub detail: String,
}

/// What a log did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnAction {
    /// Node queued with a copy of its live content.
    Queue,
    /// Staged content overwritten wholesale.
    Replace,
    /// Table aliased to another table, or alias removed.
    BindTable,
    ChangeLevel,
    ChangeScope,
    ChangeIndexer,
    /// Another log's entries merged in.
    Concat,
    /// Staged entries written to the live graph.
    Commit,
    /// Staged entries discarded.
    Clear,
}

/// Recorder owned by a log.
#[derive(Debug, Clone, Default)]
pub struct TxnTrace {
    enabled: bool,
    steps: Vec<TxnStep>,
}

impl TxnTrace {
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn steps(&self) -> &[TxnStep] {
        &self.steps
    }

    pub fn take(&mut self) -> Vec<TxnStep> {
        std::mem::take(&mut self.steps)
    }

    /// Record `action`. `detail` is only rendered while tracing is enabled.
    pub(crate) fn record(
        &mut self,
        action: TxnAction,
        node: Option<String>,
        detail: impl FnOnce() -> String,
    ) {
        if !self.enabled {
            return;
        }
        self.steps.push(TxnStep {
            step: self.steps.len(),
            action,
            node,
            detail: detail(),
        });
    }

    /// Append the steps of a log merged into this one, renumbered.
    pub(crate) fn absorb(&mut self, other: TxnTrace) {
        if !self.enabled {
            return;
        }
        for mut step in other.steps {
            step.step = self.steps.len();
            self.steps.push(step);
        }
    }
}
