//! Graph fixtures shared by the benchmarks.

use tyra_types::{
    BoundType, FunctionType, TableState, TableType, TypeArena, TypeId, TypeLevel, TypePack,
    UnionType,
};

pub const LEVEL: TypeLevel = TypeLevel::new(1, 0);

/// `count` fresh free types.
pub fn free_types(arena: &mut TypeArena, count: usize) -> Vec<TypeId> {
    (0..count).map(|_| arena.fresh_type(LEVEL)).collect()
}

/// A redirect chain of `len` bound types ending in a free type. Returns the
/// head of the chain.
pub fn bound_chain(arena: &mut TypeArena, len: usize) -> TypeId {
    let mut head = arena.fresh_type(LEVEL);
    for _ in 0..len {
        head = arena.add_type(BoundType { bound_to: head });
    }
    head
}

fn prop_name(i: usize) -> String {
    format!("field{i}")
}

/// A free table with `width` free-typed properties, and a sealed table with
/// the same properties at `number`.
pub fn record_pair(arena: &mut TypeArena, width: usize) -> (TypeId, TypeId) {
    let mut open = TableType::new(TableState::Free, LEVEL);
    let mut closed = TableType::new(TableState::Sealed, LEVEL);
    for i in 0..width {
        open = open.with_prop(prop_name(i), arena.fresh_type(LEVEL));
        closed = closed.with_prop(prop_name(i), TypeId::NUMBER);
    }
    (arena.add_type(open), arena.add_type(closed))
}

/// `depth` sealed tables nested through a `next` property around `leaf`.
pub fn nested_tables(arena: &mut TypeArena, depth: usize, leaf: TypeId) -> TypeId {
    let mut current = leaf;
    for _ in 0..depth {
        current = arena.add_type(
            TableType::new(TableState::Sealed, LEVEL)
                .with_prop("next", current)
                .with_prop("tag", TypeId::STRING),
        );
    }
    current
}

/// A function of `arity` free arguments returning one free value, and the
/// same signature over `number`.
pub fn function_pair(arena: &mut TypeArena, arity: usize) -> (TypeId, TypeId) {
    let open_args = free_types(arena, arity);
    let open_ret = arena.fresh_type(LEVEL);
    let open_args = arena.add_pack(TypePack::closed(open_args));
    let open_rets = arena.add_pack(TypePack::closed(vec![open_ret]));

    let closed_args = arena.add_pack(TypePack::closed(vec![TypeId::NUMBER; arity]));
    let closed_rets = arena.add_pack(TypePack::closed(vec![TypeId::NUMBER]));

    (
        arena.add_type(FunctionType::new(open_args, open_rets)),
        arena.add_type(FunctionType::new(closed_args, closed_rets)),
    )
}

/// A free table with `width` properties at `number`, and a union of
/// `options` sealed tables of which only the last accepts it.
pub fn union_with_late_match(
    arena: &mut TypeArena,
    width: usize,
    options: usize,
) -> (TypeId, TypeId) {
    let mut open = TableType::new(TableState::Free, LEVEL);
    let mut closed = TableType::new(TableState::Sealed, LEVEL);
    for i in 0..width {
        open = open.with_prop(prop_name(i), TypeId::NUMBER);
        closed = closed.with_prop(prop_name(i), TypeId::NUMBER);
    }
    let mut candidates: Vec<TypeId> = (1..options)
        .map(|i| {
            let mut wrong = TableType::new(TableState::Sealed, LEVEL);
            for j in 0..width {
                wrong = wrong.with_prop(prop_name(j), TypeId::STRING);
            }
            arena.add_type(wrong.with_prop(format!("extra{i}"), TypeId::BOOLEAN))
        })
        .collect();
    candidates.push(arena.add_type(closed));
    let open = arena.add_type(open);
    (open, arena.add_type(UnionType { options: candidates }))
}
