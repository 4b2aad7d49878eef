//! Occurs checks and level/scope promotion.

use std::collections::BTreeSet;

use tyra_txn::Staged;
use tyra_types::{
    Content, ScopeId, TableState, TypeId, TypeLevel, TypeOrPackId, TypePackId, TypePackVariant,
    TypeVariant,
};

use crate::Unifier;

impl Unifier<'_> {
    /// Whether binding the free type `var` to `ty` would make it contain
    /// itself. Only unions are looked through: recursion under a table or
    /// function is a legitimate cyclic type.
    pub(crate) fn occurs_in_type(&self, var: TypeId, ty: TypeId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![ty];
        while let Some(ty) = stack.pop() {
            let ty = self.follow(ty);
            if ty == var {
                return true;
            }
            if !visited.insert(ty) {
                continue;
            }
            if let TypeVariant::Union(union) = &self.content(ty).ty {
                stack.extend(union.options.iter().copied());
            }
        }
        false
    }

    /// Pack form of [`Unifier::occurs_in_type`], looking through list tails.
    pub(crate) fn occurs_in_pack(&self, var: TypePackId, tp: TypePackId) -> bool {
        let mut visited = BTreeSet::new();
        let mut current = Some(tp);
        while let Some(tp) = current {
            let tp = self.follow(tp);
            if tp == var {
                return true;
            }
            if !visited.insert(tp) {
                return false;
            }
            current = match &self.content(tp).ty {
                TypePackVariant::List(pack) => pack.tail,
                _ => None,
            };
        }
        false
    }

    /// Lower every node reachable from `root` that lives at a level inner to
    /// `level` (or a scope inner to `scope`) so it cannot be generalized
    /// before the free variable it is being bound to.
    pub(crate) fn promote(
        &mut self,
        root: TypeOrPackId,
        level: TypeLevel,
        scope: Option<ScopeId>,
    ) {
        let mut visited = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node {
                TypeOrPackId::Type(ty) => {
                    let ty = self.follow(ty);
                    if !visited.insert(TypeOrPackId::Type(ty)) {
                        continue;
                    }
                    let content = self.content(ty).clone();
                    match &content.ty {
                        TypeVariant::Free(_) => self.promote_node(ty, &content, level, scope),
                        TypeVariant::Function(func) => {
                            self.promote_node(ty, &content, level, scope);
                            stack.push(func.arg_types.into());
                            stack.push(func.ret_types.into());
                        }
                        TypeVariant::Table(table) => {
                            if table.state == TableState::Free {
                                self.promote_node(ty, &content, level, scope);
                            }
                            stack.extend(table.props.values().copied().map(TypeOrPackId::from));
                            if let Some(indexer) = table.indexer {
                                stack.push(indexer.index_type.into());
                                stack.push(indexer.index_result_type.into());
                            }
                        }
                        TypeVariant::Union(union) => {
                            stack.extend(union.options.iter().copied().map(TypeOrPackId::from));
                        }
                        _ => {}
                    }
                }
                TypeOrPackId::Pack(tp) => {
                    let tp = self.follow(tp);
                    if !visited.insert(TypeOrPackId::Pack(tp)) {
                        continue;
                    }
                    let content = self.content(tp).clone();
                    match &content.ty {
                        TypePackVariant::Free(_) => self.promote_node(tp, &content, level, scope),
                        TypePackVariant::List(pack) => {
                            stack.extend(pack.head.iter().copied().map(TypeOrPackId::from));
                            stack.extend(pack.tail.map(TypeOrPackId::from));
                        }
                        TypePackVariant::Variadic(variadic) => stack.push(variadic.ty.into()),
                        _ => {}
                    }
                }
            }
        }
    }

    fn promote_node<K: Staged>(
        &mut self,
        id: K,
        content: &K::Content,
        level: TypeLevel,
        scope: Option<ScopeId>,
    ) {
        let lower_level = content
            .level()
            .is_some_and(|current| level.subsumes_strict(current));
        let widen_scope = match (scope, content.scope()) {
            (Some(target), Some(current)) => target != current && target.encloses(current),
            _ => false,
        };
        if !lower_level && !widen_scope {
            return;
        }

        self.stage_from_view(id);
        if lower_level {
            self.log.change_level(self.arena, id, level);
        }
        if let (true, Some(target)) = (widen_scope, scope) {
            self.log.change_scope(self.arena, id, target);
        }
    }
}
