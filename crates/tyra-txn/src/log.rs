//! The transaction log.

use std::collections::BTreeMap;

use serde::Serialize;
use tyra_types::{
    Content, NodeId, ScopeId, Shape, TableIndexer, TableType, TypeArena, TypeId, TypeLevel,
    TypeOrPackId, TypePackId,
};

use crate::pending::{Pending, PendingType, PendingTypePack};
use crate::seen::{SeenGuard, SharedSeen};
use crate::trace::{TxnAction, TxnStep, TxnTrace};

pub type TypeChanges = BTreeMap<TypeId, PendingType>;
pub type PackChanges = BTreeMap<TypePackId, PendingTypePack>;

mod sealed {
    pub trait Sealed {}

    impl Sealed for tyra_types::TypeId {}
    impl Sealed for tyra_types::TypePackId {}
}

/// A node kind the log keeps a staging map for.
pub trait Staged: NodeId + sealed::Sealed + 'static {
    #[doc(hidden)]
    fn staging<'a>(
        types: &'a TypeChanges,
        packs: &'a PackChanges,
    ) -> &'a BTreeMap<Self, Pending<Self::Content>>;

    #[doc(hidden)]
    fn staging_mut<'a>(
        types: &'a mut TypeChanges,
        packs: &'a mut PackChanges,
    ) -> &'a mut BTreeMap<Self, Pending<Self::Content>>;
}

impl Staged for TypeId {
    fn staging<'a>(types: &'a TypeChanges, _packs: &'a PackChanges) -> &'a TypeChanges {
        types
    }

    fn staging_mut<'a>(
        types: &'a mut TypeChanges,
        _packs: &'a mut PackChanges,
    ) -> &'a mut TypeChanges {
        types
    }
}

impl Staged for TypePackId {
    fn staging<'a>(_types: &'a TypeChanges, packs: &'a PackChanges) -> &'a PackChanges {
        packs
    }

    fn staging_mut<'a>(
        _types: &'a mut TypeChanges,
        packs: &'a mut PackChanges,
    ) -> &'a mut PackChanges {
        packs
    }
}

/// Tunables for a log family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnOptions {
    /// Redirect hops `follow` takes before giving up on a chain.
    pub max_follow_steps: usize,
}

impl Default for TxnOptions {
    fn default() -> Self {
        Self {
            // Well-formed graphs never get close; this only stops a redirect
            // cycle from hanging the checker.
            max_follow_steps: 10_000,
        }
    }
}

/// Lifecycle of a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Nothing staged since creation or the last `clear`.
    Clean,
    /// At least one staging call since the last `commit`/`clear`.
    Dirty,
    /// Last transition was `commit`; the live graph has been rewritten.
    Committed,
}

/// The footprint of a log: every handle with a staged entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changes {
    pub types: Vec<TypeId>,
    pub packs: Vec<TypePackId>,
}

impl Changes {
    pub fn len(&self) -> usize {
        self.types.len() + self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.packs.is_empty()
    }

    pub fn contains(&self, node: impl Into<TypeOrPackId>) -> bool {
        match node.into() {
            TypeOrPackId::Type(ty) => self.types.binary_search(&ty).is_ok(),
            TypeOrPackId::Pack(tp) => self.packs.binary_search(&tp).is_ok(),
        }
    }
}

fn stage<'a, K: Staged>(
    map: &'a mut BTreeMap<K, Pending<K::Content>>,
    arena: &TypeArena,
    id: K,
) -> &'a mut Pending<K::Content> {
    debug_assert!(
        !id.content(arena).is_persistent(),
        "staging a change to persistent node {id}"
    );
    map.entry(id)
        .or_insert_with(|| Pending::new(id.content(arena).clone()))
}

thread_local! {
    static EMPTY: &'static TxnLog = Box::leak(Box::new(TxnLog::new()));
}

/// Staging area for speculative rewrites of the type graph.
///
/// Nothing staged here is visible in the [`TypeArena`] until [`TxnLog::commit`].
/// Log-aware accessors ([`TxnLog::follow`], [`TxnLog::get`], ...) prefer this
/// log's staged content over live content, node by node. Staged content is
/// never looked up in a parent log: a child's changes reach its parent only
/// through an explicit [`TxnLog::concat`].
///
/// Every log in a family (a root and the logs nested under it with
/// [`TxnLog::child`]) shares one seen stack for cycle detection.
#[derive(Debug)]
pub struct TxnLog {
    type_changes: TypeChanges,
    pack_changes: PackChanges,
    /// Nesting depth below the root log that created the seen stack.
    depth: u32,
    seen: SharedSeen,
    state: TxnState,
    options: TxnOptions,
    trace: TxnTrace,
}

impl TxnLog {
    /// A root log that owns a fresh seen stack.
    pub fn new() -> Self {
        Self::with_options(TxnOptions::default())
    }

    pub fn with_options(options: TxnOptions) -> Self {
        Self::from_parts(SharedSeen::new(), 0, options)
    }

    /// A log joining the family that owns `seen`.
    pub fn with_shared_seen(seen: SharedSeen) -> Self {
        Self::from_parts(seen, 0, TxnOptions::default())
    }

    /// A log nested under `self`: shares the seen stack, stages independently.
    pub fn child(&self) -> Self {
        let mut child = Self::from_parts(self.seen.clone(), self.depth + 1, self.options);
        if self.trace.is_enabled() {
            child.trace.enable();
        }
        child
    }

    fn from_parts(seen: SharedSeen, depth: u32, options: TxnOptions) -> Self {
        Self {
            type_changes: BTreeMap::new(),
            pack_changes: BTreeMap::new(),
            depth,
            seen,
            state: TxnState::Clean,
            options,
            trace: TxnTrace::default(),
        }
    }

    /// A shared log with nothing staged, for read-only, log-aware access to the
    /// live graph.
    pub fn empty() -> &'static TxnLog {
        EMPTY.with(|log| *log)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub fn options(&self) -> TxnOptions {
        self.options
    }

    /// True when nothing is staged; dropping the log has no effect.
    pub fn is_clean(&self) -> bool {
        self.type_changes.is_empty() && self.pack_changes.is_empty()
    }

    pub fn shared_seen(&self) -> &SharedSeen {
        &self.seen
    }

    // -- Observability --

    /// Record staging actions from now on. Children created afterwards trace too.
    pub fn enable_tracing(&mut self) {
        self.trace.enable();
    }

    pub fn trace(&self) -> &[TxnStep] {
        self.trace.steps()
    }

    pub fn take_trace(&mut self) -> Vec<TxnStep> {
        self.trace.take()
    }

    // -- Staging --

    /// Stage `id` for modification, seeding the entry from its live content on
    /// first use. Later calls return the same entry, including any edits made
    /// to it since.
    pub fn queue<K: Staged>(&mut self, arena: &TypeArena, id: K) -> &mut Pending<K::Content> {
        self.state = TxnState::Dirty;
        let entry = stage(
            K::staging_mut(&mut self.type_changes, &mut self.pack_changes),
            arena,
            id,
        );
        self.trace
            .record(TxnAction::Queue, Some(id.to_string()), || entry.to_string());
        entry
    }

    /// The entry staged for `id` in this log, if any. Parent logs are not
    /// consulted.
    ///
    /// Staged content is not transitive: it may refer to nodes that have no
    /// entry here, so walking a staged subgraph takes one lookup per node.
    pub fn pending<K: Staged>(&self, id: K) -> Option<&Pending<K::Content>> {
        K::staging(&self.type_changes, &self.pack_changes).get(&id)
    }

    pub fn pending_mut<K: Staged>(&mut self, id: K) -> Option<&mut Pending<K::Content>> {
        K::staging_mut(&mut self.type_changes, &mut self.pack_changes).get_mut(&id)
    }

    /// Stage `replacement` as the whole content of `id`.
    ///
    /// Accepts full content or any single shape (`FreeType`, `TypePack`, ...).
    pub fn replace<K: Staged>(
        &mut self,
        arena: &TypeArena,
        id: K,
        replacement: impl Into<K::Content>,
    ) -> &mut Pending<K::Content> {
        self.state = TxnState::Dirty;
        let entry = stage(
            K::staging_mut(&mut self.type_changes, &mut self.pack_changes),
            arena,
            id,
        );
        entry.pending.reassign(replacement.into());
        self.trace
            .record(TxnAction::Replace, Some(id.to_string()), || entry.to_string());
        entry
    }

    /// Alias the table `ty` to `new_bound_to`, or drop its alias with `None`.
    pub fn bind_table(
        &mut self,
        arena: &TypeArena,
        ty: TypeId,
        new_bound_to: Option<TypeId>,
    ) -> &mut PendingType {
        debug_assert!(
            self.is::<TableType, _>(arena, ty),
            "bind_table on non-table {ty}"
        );
        self.state = TxnState::Dirty;
        let entry = stage(&mut self.type_changes, arena, ty);
        if let Some(table) = entry.get_mut::<TableType>() {
            table.bound_to = new_bound_to;
        }
        self.trace
            .record(TxnAction::BindTable, Some(ty.to_string()), || entry.to_string());
        entry
    }

    /// Stage a copy of `id` carrying `new_level`. Content kinds without a
    /// level are staged unchanged.
    pub fn change_level<K: Staged>(
        &mut self,
        arena: &TypeArena,
        id: K,
        new_level: TypeLevel,
    ) -> &mut Pending<K::Content> {
        self.state = TxnState::Dirty;
        let entry = stage(
            K::staging_mut(&mut self.type_changes, &mut self.pack_changes),
            arena,
            id,
        );
        entry.pending.set_level(new_level);
        self.trace.record(
            TxnAction::ChangeLevel,
            Some(id.to_string()),
            || format!("level {new_level}"),
        );
        entry
    }

    /// Stage a copy of `id` belonging to `new_scope`. Content kinds without a
    /// scope are staged unchanged.
    pub fn change_scope<K: Staged>(
        &mut self,
        arena: &TypeArena,
        id: K,
        new_scope: ScopeId,
    ) -> &mut Pending<K::Content> {
        self.state = TxnState::Dirty;
        let entry = stage(
            K::staging_mut(&mut self.type_changes, &mut self.pack_changes),
            arena,
            id,
        );
        entry.pending.set_scope(new_scope);
        self.trace.record(
            TxnAction::ChangeScope,
            Some(id.to_string()),
            || format!("scope {new_scope}"),
        );
        entry
    }

    /// Stage a copy of the table `ty` with `indexer` (or without one).
    pub fn change_indexer(
        &mut self,
        arena: &TypeArena,
        ty: TypeId,
        indexer: Option<TableIndexer>,
    ) -> &mut PendingType {
        self.state = TxnState::Dirty;
        let entry = stage(&mut self.type_changes, arena, ty);
        if let Some(table) = entry.get_mut::<TableType>() {
            table.indexer = indexer;
        }
        self.trace
            .record(TxnAction::ChangeIndexer, Some(ty.to_string()), || {
                entry.to_string()
            });
        entry
    }

    // -- Resolution and narrowing --

    /// Staged content of `id` if this log has any, else its live content.
    pub fn content<'a, K: Staged>(&'a self, arena: &'a TypeArena, id: K) -> &'a K::Content {
        match self.pending(id) {
            Some(entry) => &entry.pending,
            None => id.content(arena),
        }
    }

    /// Follow redirects, preferring staged content at each hop.
    ///
    /// The result may itself have staged content; use [`TxnLog::pending`] or
    /// [`TxnLog::get`] to look at it.
    pub fn follow<K: Staged>(&self, arena: &TypeArena, id: K) -> K {
        let mut current = id;
        for _ in 0..self.options.max_follow_steps {
            match self.content(arena, current).redirect() {
                Some(next) => current = next,
                None => return current,
            }
        }
        tracing::warn!(
            start = %id,
            reached = %current,
            max_steps = self.options.max_follow_steps,
            "follow gave up on a redirect chain"
        );
        current
    }

    /// Level of the staged content of `id`, or of its live content when
    /// nothing is staged. Staged content that carries no level yields `None`
    /// even if the live content has one.
    pub fn get_level<K: Staged>(&self, arena: &TypeArena, id: K) -> Option<TypeLevel> {
        self.content(arena, id).level()
    }

    /// Narrow the staged-or-live content of `id` to shape `T`.
    pub fn get<'a, T, K>(&'a self, arena: &'a TypeArena, id: K) -> Option<&'a T>
    where
        K: Staged,
        T: Shape<K::Content>,
    {
        T::narrow(self.content(arena, id))
    }

    /// Mutable form of [`TxnLog::get`].
    ///
    /// When `id` has no staged entry this hands out the live content, so
    /// edits through it bypass the log.
    pub fn get_mut<'a, T, K>(&'a mut self, arena: &'a mut TypeArena, id: K) -> Option<&'a mut T>
    where
        K: Staged,
        T: Shape<K::Content>,
    {
        if let Some(entry) =
            K::staging_mut(&mut self.type_changes, &mut self.pack_changes).get_mut(&id)
        {
            return T::narrow_mut(&mut entry.pending);
        }
        T::narrow_mut(id.content_mut(arena))
    }

    /// Whether the staged-or-live content of `id` has shape `T`. Safe on
    /// redirect content.
    pub fn is<T, K>(&self, arena: &TypeArena, id: K) -> bool
    where
        K: Staged,
        T: Shape<K::Content>,
    {
        T::narrow(self.content(arena, id)).is_some()
    }

    // -- Cycle guard --

    pub fn have_seen<K: NodeId>(&self, lhs: K, rhs: K) -> bool {
        self.seen.contains(lhs.into(), rhs.into())
    }

    pub fn push_seen<K: NodeId>(&mut self, lhs: K, rhs: K) {
        self.seen.push(lhs.into(), rhs.into());
    }

    pub fn pop_seen<K: NodeId>(&mut self, lhs: K, rhs: K) {
        self.seen.pop(lhs.into(), rhs.into());
    }

    /// Push `(lhs, rhs)` until the returned guard is dropped.
    ///
    /// Takes `&mut self` like [`TxnLog::push_seen`], so the shared
    /// [`TxnLog::empty`] log cannot be used to push pairs.
    pub fn seen_guard<K: NodeId>(&mut self, lhs: K, rhs: K) -> SeenGuard {
        SeenGuard::new(self.seen.clone(), lhs.into(), rhs.into())
    }

    // -- Merge, commit, rollback --

    /// Take over every entry of `rhs`. Where both logs staged the same node,
    /// `rhs` wins.
    pub fn concat(&mut self, rhs: TxnLog) {
        let TxnLog {
            type_changes,
            pack_changes,
            trace,
            ..
        } = rhs;
        let merged_types = type_changes.len();
        let merged_packs = pack_changes.len();
        if merged_types + merged_packs > 0 {
            self.state = TxnState::Dirty;
        }
        self.type_changes.extend(type_changes);
        self.pack_changes.extend(pack_changes);

        tracing::trace!(
            depth = self.depth,
            types = merged_types,
            packs = merged_packs,
            "concatenated transaction log"
        );
        self.trace.absorb(trace);
        self.trace.record(TxnAction::Concat, None, || {
            format!("{merged_types} types, {merged_packs} packs")
        });
    }

    /// Write every staged entry into the live graph, then clear the log.
    pub fn commit(&mut self, arena: &mut TypeArena) {
        let types = std::mem::take(&mut self.type_changes);
        let packs = std::mem::take(&mut self.pack_changes);
        let (type_count, pack_count) = (types.len(), packs.len());

        for (ty, entry) in types {
            arena[ty].reassign(entry.pending);
        }
        for (tp, entry) in packs {
            arena[tp].reassign(entry.pending);
        }

        self.state = TxnState::Committed;
        tracing::trace!(
            depth = self.depth,
            types = type_count,
            packs = pack_count,
            "committed transaction log"
        );
        self.trace.record(TxnAction::Commit, None, || {
            format!("{type_count} types, {pack_count} packs")
        });
    }

    /// Drop every staged entry without touching the live graph.
    pub fn clear(&mut self) {
        let dropped = self.type_changes.len() + self.pack_changes.len();
        self.type_changes.clear();
        self.pack_changes.clear();
        self.state = TxnState::Clean;
        tracing::trace!(depth = self.depth, dropped, "cleared transaction log");
        self.trace
            .record(TxnAction::Clear, None, || format!("{dropped} entries dropped"));
    }

    /// A log that, once committed, puts every node this log is about to
    /// change back to its current live content.
    ///
    /// Must be computed before [`TxnLog::commit`]: afterwards the live graph
    /// already holds the new content and there is nothing left to restore.
    pub fn inverse(&self, arena: &TypeArena) -> TxnLog {
        assert!(
            self.state != TxnState::Committed,
            "inverse() must be computed before commit()"
        );
        let mut inversed = TxnLog::from_parts(self.seen.clone(), 0, self.options);
        for &ty in self.type_changes.keys() {
            inversed
                .type_changes
                .insert(ty, Pending::new(arena[ty].clone()));
        }
        for &tp in self.pack_changes.keys() {
            inversed
                .pack_changes
                .insert(tp, Pending::new(arena[tp].clone()));
        }
        if !inversed.is_clean() {
            inversed.state = TxnState::Dirty;
        }
        tracing::trace!(
            types = inversed.type_changes.len(),
            packs = inversed.pack_changes.len(),
            "computed inverse transaction log"
        );
        inversed
    }

    /// Every handle with a staged entry, sorted.
    pub fn get_changes(&self) -> Changes {
        Changes {
            types: self.type_changes.keys().copied().collect(),
            packs: self.pack_changes.keys().copied().collect(),
        }
    }
}

impl Default for TxnLog {
    fn default() -> Self {
        Self::new()
    }
}
