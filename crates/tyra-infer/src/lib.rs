//! Structural unification for Tyra, staged through a transaction log.
//!
//! The unifier never writes to the [`TypeArena`]. Every binding, level change
//! and table extension it decides on is staged in its [`TxnLog`]; the caller
//! takes the log back with [`Unifier::into_log`] and commits it (or drops it)
//! once the whole check has been decided.
//!
//! Speculative sub-attempts (union options) run in a [`Unifier::child`]. A
//! child stages into its own log but reads through its ancestors' staged
//! content, so it sees every binding made so far. On success its log is
//! concatenated into the parent; on failure it is dropped.

mod error;
mod promote;

#[cfg(test)]
mod prop_tests;

pub use error::UnifyError;

use tyra_txn::{Staged, TxnLog};
use tyra_types::{
    BoundType, BoundTypePack, Content, ErrorTypePack, FreeType, FreeTypePack, FunctionType,
    TableState, TableType, TypeArena, TypeId, TypePack, TypePackId, TypePackVariant, TypeVariant,
    VariadicTypePack,
};

pub type UnifyResult = Result<(), UnifyError>;

/// Tunables for a unifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnifyOptions {
    /// Nested type/pack comparisons allowed before giving up.
    pub max_depth: usize,
}

impl Default for UnifyOptions {
    fn default() -> Self {
        Self { max_depth: 200 }
    }
}

/// Which side of a pack comparison had values left over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Sub,
    Sup,
}

#[derive(Debug)]
pub struct Unifier<'a> {
    arena: &'a TypeArena,
    /// The unifier this one was spawned from. Its staged content is visible
    /// here but never written.
    outer: Option<&'a Unifier<'a>>,
    log: TxnLog,
    options: UnifyOptions,
    depth: usize,
}

impl<'a> Unifier<'a> {
    pub fn new(arena: &'a TypeArena) -> Self {
        Self::with_options(arena, UnifyOptions::default())
    }

    pub fn with_options(arena: &'a TypeArena, options: UnifyOptions) -> Self {
        Self::with_log(arena, TxnLog::new(), options)
    }

    /// A unifier staging into an existing log, e.g. one with tracing enabled.
    pub fn with_log(arena: &'a TypeArena, log: TxnLog, options: UnifyOptions) -> Self {
        Self {
            arena,
            outer: None,
            log,
            options,
            depth: 0,
        }
    }

    /// A nested unifier for a speculative attempt. Shares the cycle guard and
    /// the recursion budget already spent.
    pub fn child(&self) -> Unifier<'_> {
        Unifier {
            arena: self.arena,
            outer: Some(self),
            log: self.log.child(),
            options: self.options,
            depth: self.depth,
        }
    }

    pub fn arena(&self) -> &'a TypeArena {
        self.arena
    }

    pub fn log(&self) -> &TxnLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut TxnLog {
        &mut self.log
    }

    pub fn into_log(self) -> TxnLog {
        self.log
    }

    pub fn options(&self) -> UnifyOptions {
        self.options
    }

    /// Stage whatever it takes for `sub` to be usable where `sup` is expected.
    ///
    /// On error the log may hold partial work and should be discarded.
    pub fn try_unify(&mut self, sub: TypeId, sup: TypeId) -> UnifyResult {
        self.unify_types(sub, sup)
    }

    /// Pack form of [`Unifier::try_unify`].
    pub fn try_unify_packs(&mut self, sub: TypePackId, sup: TypePackId) -> UnifyResult {
        self.unify_packs(sub, sup)
    }

    // -- Layered view: own log, then ancestors' logs, then the arena --

    /// Content of `id` as this unifier sees it.
    pub fn content<K: Staged>(&self, id: K) -> &K::Content {
        match self.log.pending(id) {
            Some(entry) => &entry.pending,
            None => self
                .outer_content(id)
                .unwrap_or_else(|| id.content(self.arena)),
        }
    }

    fn outer_content<K: Staged>(&self, id: K) -> Option<&K::Content> {
        let mut unifier = self.outer;
        while let Some(current) = unifier {
            if let Some(entry) = current.log.pending(id) {
                return Some(&entry.pending);
            }
            unifier = current.outer;
        }
        None
    }

    /// Follow redirects through the layered view.
    pub fn follow<K: Staged>(&self, id: K) -> K {
        if self.outer.is_none() {
            return self.log.follow(self.arena, id);
        }
        let max_steps = self.log.options().max_follow_steps;
        let mut current = id;
        for _ in 0..max_steps {
            match self.content(current).redirect() {
                Some(next) => current = next,
                None => return current,
            }
        }
        tracing::warn!(start = %id, reached = %current, max_steps, "follow gave up on a redirect chain");
        current
    }

    /// Copy an ancestor's staged content for `id` into this log, so that
    /// in-place edits start from what this unifier sees rather than from the
    /// live graph.
    fn stage_from_view<K: Staged>(&mut self, id: K) {
        if self.log.pending(id).is_some() {
            return;
        }
        let inherited = self.outer_content(id).cloned();
        if let Some(content) = inherited {
            self.log.replace(self.arena, id, content);
        }
    }

    // -- Recursion budget --

    fn enter(&mut self) -> UnifyResult {
        if self.depth >= self.options.max_depth {
            tracing::warn!(
                limit = self.options.max_depth,
                "unification hit the recursion limit"
            );
            return Err(UnifyError::RecursionLimit {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    // -- Types --

    fn unify_types(&mut self, sub: TypeId, sup: TypeId) -> UnifyResult {
        self.enter()?;
        let result = self.unify_types_inner(sub, sup);
        self.depth -= 1;
        result
    }

    fn unify_types_inner(&mut self, sub: TypeId, sup: TypeId) -> UnifyResult {
        let sub = self.follow(sub);
        let sup = self.follow(sup);
        if sub == sup {
            return Ok(());
        }

        let sub_var = self.content(sub).clone();
        let sup_var = self.content(sup).clone();
        match (&sub_var.ty, &sup_var.ty) {
            (TypeVariant::Free(sub_free), TypeVariant::Free(sup_free)) => {
                // The survivor must be the one living at the outer level.
                if sup_free.level.subsumes(sub_free.level) {
                    self.bind_type(sub, sup);
                } else {
                    self.promote(sub.into(), sup_free.level, sup_free.scope);
                    self.bind_type(sup, sub);
                }
                Ok(())
            }
            (_, TypeVariant::Free(free)) => self.bind_free_type(sup, free, sub),
            (TypeVariant::Free(free), _) => self.bind_free_type(sub, free, sup),

            (TypeVariant::Error(_), _) | (_, TypeVariant::Error(_)) => Ok(()),

            // Every option of the subtype must fit.
            (TypeVariant::Union(union), _) => {
                for &option in &union.options {
                    self.unify_types(option, sup)?;
                }
                Ok(())
            }
            // Some option of the supertype must accept the subtype.
            (_, TypeVariant::Union(union)) => self.unify_with_any_option(sub, sup, &union.options),

            (TypeVariant::Primitive(a), TypeVariant::Primitive(b)) if a == b => Ok(()),
            (TypeVariant::Function(sub_fn), TypeVariant::Function(sup_fn)) => {
                self.unify_functions(sub, sup, sub_fn, sup_fn)
            }
            (TypeVariant::Table(sub_table), TypeVariant::Table(sup_table)) => {
                self.unify_tables(sub, sup, sub_table, sup_table)
            }
            _ => Err(UnifyError::TypeMismatch { sub, sup }),
        }
    }

    fn bind_type(&mut self, from: TypeId, to: TypeId) {
        self.log.replace(self.arena, from, BoundType { bound_to: to });
    }

    fn bind_free_type(&mut self, var: TypeId, free: &FreeType, target: TypeId) -> UnifyResult {
        if self.occurs_in_type(var, target) {
            return Err(UnifyError::OccursCheck {
                var: var.into(),
                within: target.into(),
            });
        }
        self.promote(target.into(), free.level, free.scope);
        self.bind_type(var, target);
        Ok(())
    }

    fn unify_with_any_option(&mut self, sub: TypeId, sup: TypeId, options: &[TypeId]) -> UnifyResult {
        for &option in options {
            let mut attempt = self.child();
            match attempt.unify_types(sub, option) {
                Ok(()) => {
                    let staged = attempt.into_log();
                    self.log.concat(staged);
                    return Ok(());
                }
                Err(err) => tracing::trace!(%sub, %option, %err, "union option rejected"),
            }
        }
        Err(UnifyError::TypeMismatch { sub, sup })
    }

    fn unify_functions(
        &mut self,
        sub: TypeId,
        sup: TypeId,
        sub_fn: &FunctionType,
        sup_fn: &FunctionType,
    ) -> UnifyResult {
        if self.log.have_seen(sub, sup) {
            return Ok(());
        }
        let _guard = self.log.seen_guard(sub, sup);

        // Arguments are contravariant.
        self.unify_packs(sup_fn.arg_types, sub_fn.arg_types)?;
        self.unify_packs(sub_fn.ret_types, sup_fn.ret_types)
    }

    fn unify_tables(
        &mut self,
        sub: TypeId,
        sup: TypeId,
        sub_table: &TableType,
        sup_table: &TableType,
    ) -> UnifyResult {
        if self.log.have_seen(sub, sup) {
            return Ok(());
        }
        let _guard = self.log.seen_guard(sub, sup);

        for (name, &sup_prop) in &sup_table.props {
            match sub_table.props.get(name) {
                Some(&sub_prop) => self.unify_types(sub_prop, sup_prop)?,
                None if sub_table.is_extensible() => self.add_prop(sub, name, sup_prop),
                None => {
                    return Err(UnifyError::MissingProperty {
                        table: sub,
                        name: name.clone(),
                    })
                }
            }
        }
        for (name, &sub_prop) in &sub_table.props {
            if sup_table.props.contains_key(name) {
                continue;
            }
            if sup_table.is_extensible() {
                self.add_prop(sup, name, sub_prop);
            } else if sub_table.state == TableState::Free {
                // A free table's properties are demands on whatever it becomes.
                return Err(UnifyError::MissingProperty {
                    table: sup,
                    name: name.clone(),
                });
            }
        }

        match (sub_table.indexer, sup_table.indexer) {
            (Some(sub_indexer), Some(sup_indexer)) => {
                self.unify_types(sub_indexer.index_type, sup_indexer.index_type)?;
                self.unify_types(sub_indexer.index_result_type, sup_indexer.index_result_type)?;
            }
            (None, Some(sup_indexer)) => {
                if !sub_table.is_extensible() {
                    return Err(UnifyError::TypeMismatch { sub, sup });
                }
                self.stage_from_view(sub);
                self.log.change_indexer(self.arena, sub, Some(sup_indexer));
            }
            (Some(sub_indexer), None) if sup_table.is_extensible() => {
                self.stage_from_view(sup);
                self.log.change_indexer(self.arena, sup, Some(sub_indexer));
            }
            _ => {}
        }

        if sub_table.state == TableState::Free {
            self.alias_table(sub, sub_table, sup);
        } else if sup_table.state == TableState::Free {
            self.alias_table(sup, sup_table, sub);
        }
        Ok(())
    }

    fn add_prop(&mut self, table: TypeId, name: &str, ty: TypeId) {
        self.stage_from_view(table);
        if let Some(staged) = self.log.queue(self.arena, table).get_mut::<TableType>() {
            staged.props.insert(name.to_owned(), ty);
        }
    }

    /// Make the free table `free` an alias of `target`.
    fn alias_table(&mut self, free: TypeId, free_table: &TableType, target: TypeId) {
        self.promote(target.into(), free_table.level, free_table.scope);
        self.stage_from_view(free);
        self.log.bind_table(self.arena, free, Some(target));
    }

    // -- Packs --

    fn unify_packs(&mut self, sub: TypePackId, sup: TypePackId) -> UnifyResult {
        self.enter()?;
        let result = self.unify_packs_inner(sub, sup);
        self.depth -= 1;
        result
    }

    fn unify_packs_inner(&mut self, sub: TypePackId, sup: TypePackId) -> UnifyResult {
        let sub = self.follow(sub);
        let sup = self.follow(sup);
        if sub == sup {
            return Ok(());
        }

        let sub_var = self.content(sub).clone();
        let sup_var = self.content(sup).clone();
        match (&sub_var.ty, &sup_var.ty) {
            (TypePackVariant::Free(sub_free), TypePackVariant::Free(sup_free)) => {
                if sup_free.level.subsumes(sub_free.level) {
                    self.bind_pack(sub, sup);
                } else {
                    self.promote(sub.into(), sup_free.level, sup_free.scope);
                    self.bind_pack(sup, sub);
                }
                Ok(())
            }
            (_, TypePackVariant::Free(free)) => self.bind_free_pack(sup, free, sub),
            (TypePackVariant::Free(free), _) => self.bind_free_pack(sub, free, sup),

            (TypePackVariant::Error(_), _) | (_, TypePackVariant::Error(_)) => Ok(()),

            (TypePackVariant::Variadic(sub_var), TypePackVariant::Variadic(sup_var)) => {
                self.unify_types(sub_var.ty, sup_var.ty)
            }
            (TypePackVariant::List(_), _) | (_, TypePackVariant::List(_)) => {
                self.unify_pack_lists(sub, sup)
            }
            _ => Err(UnifyError::PackMismatch { sub, sup }),
        }
    }

    fn bind_pack(&mut self, from: TypePackId, to: TypePackId) {
        self.log
            .replace(self.arena, from, BoundTypePack { bound_to: to });
    }

    fn bind_free_pack(
        &mut self,
        var: TypePackId,
        free: &FreeTypePack,
        target: TypePackId,
    ) -> UnifyResult {
        if self.occurs_in_pack(var, target) {
            return Err(UnifyError::OccursCheck {
                var: var.into(),
                within: target.into(),
            });
        }
        self.promote(target.into(), free.level, free.scope);
        self.bind_pack(var, target);
        Ok(())
    }

    /// The head types of `tp` with nested list tails spliced in, and the
    /// first tail that is not a list.
    fn flatten(&self, tp: TypePackId) -> (Vec<TypeId>, Option<TypePackId>) {
        let mut head = Vec::new();
        let mut current = self.follow(tp);
        for _ in 0..self.log.options().max_follow_steps {
            match &self.content(current).ty {
                TypePackVariant::List(pack) => {
                    head.extend_from_slice(&pack.head);
                    match pack.tail {
                        Some(tail) => current = self.follow(tail),
                        None => return (head, None),
                    }
                }
                _ => return (head, Some(current)),
            }
        }
        (head, Some(current))
    }

    fn unify_pack_lists(&mut self, sub: TypePackId, sup: TypePackId) -> UnifyResult {
        let (sub_head, sub_tail) = self.flatten(sub);
        let (sup_head, sup_tail) = self.flatten(sup);

        for (&sub_ty, &sup_ty) in sub_head.iter().zip(&sup_head) {
            self.unify_types(sub_ty, sup_ty)?;
        }

        let mismatch = UnifyError::CountMismatch {
            expected: sup_head.len(),
            actual: sub_head.len(),
        };
        let shared = sub_head.len().min(sup_head.len());
        if sub_head.len() > shared {
            return self.absorb_extra(&sub_head[shared..], sub_tail, sup_tail, Side::Sub, mismatch);
        }
        if sup_head.len() > shared {
            return self.absorb_extra(&sup_head[shared..], sup_tail, sub_tail, Side::Sup, mismatch);
        }

        match (sub_tail, sup_tail) {
            (Some(sub_tail), Some(sup_tail)) => self.unify_packs(sub_tail, sup_tail),
            (None, None) => Ok(()),
            (Some(tail), None) | (None, Some(tail)) => self.close_tail(tail, mismatch),
        }
    }

    /// Fit `extra` values (followed by `extra_tail`) from one side into the
    /// other side's `tail`.
    fn absorb_extra(
        &mut self,
        extra: &[TypeId],
        extra_tail: Option<TypePackId>,
        tail: Option<TypePackId>,
        side: Side,
        mismatch: UnifyError,
    ) -> UnifyResult {
        let Some(tail) = tail else {
            return Err(mismatch);
        };

        let tail_var = self.content(tail).clone();
        match &tail_var.ty {
            TypePackVariant::Free(free) => {
                if let Some(inner) = extra_tail
                    && self.occurs_in_pack(tail, inner)
                {
                    return Err(UnifyError::OccursCheck {
                        var: tail.into(),
                        within: inner.into(),
                    });
                }
                for &ty in extra {
                    self.promote(ty.into(), free.level, free.scope);
                }
                let rest = TypePack {
                    head: extra.to_vec(),
                    tail: extra_tail,
                };
                self.log.replace(self.arena, tail, rest);
                Ok(())
            }
            TypePackVariant::Variadic(variadic) => {
                for &ty in extra {
                    match side {
                        Side::Sub => self.unify_types(ty, variadic.ty)?,
                        Side::Sup => self.unify_types(variadic.ty, ty)?,
                    }
                }
                match (extra_tail, side) {
                    (Some(extra_tail), Side::Sub) => self.unify_packs(extra_tail, tail),
                    (Some(extra_tail), Side::Sup) => self.unify_packs(tail, extra_tail),
                    (None, _) => Ok(()),
                }
            }
            TypePackVariant::Error(_) => Ok(()),
            _ => Err(mismatch),
        }
    }

    /// The other side ran out of values and has no tail: `tail` must accept
    /// zero values.
    fn close_tail(&mut self, tail: TypePackId, mismatch: UnifyError) -> UnifyResult {
        let tail_var = self.content(tail);
        if tail_var.is::<FreeTypePack>() {
            self.bind_pack(tail, TypePackId::EMPTY);
            Ok(())
        } else if tail_var.is::<VariadicTypePack>() || tail_var.is::<ErrorTypePack>() {
            Ok(())
        } else {
            Err(mismatch)
        }
    }
}
