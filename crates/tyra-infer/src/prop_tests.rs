//! Property tests for the unifier using proptest.
//!
//! Types are generated as shapes (primitives, free variables, sealed tables,
//! functions) and built into an arena, usually twice so that two structurally
//! identical but physically distinct graphs can be compared. Properties:
//!
//! 1. Structurally identical graphs always unify
//! 2. Committing a unification and then its inverse restores the arena
//! 3. Unifying a node with itself stages nothing
//! 4. Primitive unification succeeds exactly when the primitives agree
//! 5. Work done in a dropped child never reaches the parent

use proptest::prelude::*;
use tyra_types::*;

use crate::Unifier;

#[derive(Debug, Clone)]
enum ShapeTree {
    Prim(PrimitiveType),
    Free,
    Table(Vec<(String, ShapeTree)>),
    Function(Vec<ShapeTree>, Vec<ShapeTree>),
}

const LABEL_POOL: &[&str] = &["x", "y", "next", "value", "len"];

fn arb_primitive() -> impl Strategy<Value = PrimitiveType> {
    prop_oneof![
        Just(PrimitiveType::Nil),
        Just(PrimitiveType::Boolean),
        Just(PrimitiveType::Number),
        Just(PrimitiveType::String),
        Just(PrimitiveType::Thread),
    ]
}

fn arb_shape() -> impl Strategy<Value = ShapeTree> {
    let leaf = prop_oneof![
        arb_primitive().prop_map(ShapeTree::Prim),
        Just(ShapeTree::Free),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::btree_map(prop::sample::select(LABEL_POOL), inner.clone(), 0..3)
                .prop_map(|props| {
                    ShapeTree::Table(
                        props
                            .into_iter()
                            .map(|(name, shape)| (name.to_owned(), shape))
                            .collect(),
                    )
                }),
            (
                prop::collection::vec(inner.clone(), 0..3),
                prop::collection::vec(inner, 0..2)
            )
                .prop_map(|(args, rets)| ShapeTree::Function(args, rets)),
        ]
    })
}

fn builtin(prim: PrimitiveType) -> TypeId {
    match prim {
        PrimitiveType::Nil => TypeId::NIL,
        PrimitiveType::Boolean => TypeId::BOOLEAN,
        PrimitiveType::Number => TypeId::NUMBER,
        PrimitiveType::String => TypeId::STRING,
        PrimitiveType::Thread => TypeId::THREAD,
    }
}

fn build(arena: &mut TypeArena, shape: &ShapeTree) -> TypeId {
    let level = TypeLevel::new(1, 0);
    match shape {
        ShapeTree::Prim(prim) => builtin(*prim),
        ShapeTree::Free => arena.fresh_type(level),
        ShapeTree::Table(props) => {
            let mut table = TableType::new(TableState::Sealed, level);
            for (name, prop) in props {
                let prop = build(arena, prop);
                table = table.with_prop(name.clone(), prop);
            }
            arena.add_type(table)
        }
        ShapeTree::Function(args, rets) => {
            let args: Vec<TypeId> = args.iter().map(|arg| build(arena, arg)).collect();
            let rets: Vec<TypeId> = rets.iter().map(|ret| build(arena, ret)).collect();
            let args = arena.add_pack(TypePack::closed(args));
            let rets = arena.add_pack(TypePack::closed(rets));
            let mut func = FunctionType::new(args, rets);
            func.level = level;
            arena.add_type(func)
        }
    }
}

fn snapshot(arena: &TypeArena) -> (Vec<TypeVar>, Vec<TypePackVar>) {
    (
        (0..arena.type_count())
            .map(|i| arena[TypeId(i as u32)].clone())
            .collect(),
        (0..arena.pack_count())
            .map(|i| arena[TypePackId(i as u32)].clone())
            .collect(),
    )
}

proptest! {
    /// Two copies of the same shape unify, whatever the shape.
    #[test]
    fn identical_shapes_unify(shape in arb_shape()) {
        let mut arena = TypeArena::new();
        let lhs = build(&mut arena, &shape);
        let rhs = build(&mut arena, &shape);

        let mut u = Unifier::new(&arena);
        prop_assert_eq!(u.try_unify(lhs, rhs), Ok(()));
        prop_assert!(u.log().shared_seen().is_empty());
    }

    /// A committed unification is fully undone by committing its inverse.
    #[test]
    fn inverse_undoes_unification(shape in arb_shape()) {
        let mut arena = TypeArena::new();
        let lhs = build(&mut arena, &shape);
        let rhs = build(&mut arena, &shape);
        let before = snapshot(&arena);

        let mut u = Unifier::new(&arena);
        prop_assert_eq!(u.try_unify(lhs, rhs), Ok(()));
        let mut log = u.into_log();
        let mut undo = log.inverse(&arena);

        log.commit(&mut arena);
        undo.commit(&mut arena);
        prop_assert_eq!(snapshot(&arena), before);
    }

    /// Unifying a node with itself is a no-op.
    #[test]
    fn self_unification_stages_nothing(shape in arb_shape()) {
        let mut arena = TypeArena::new();
        let ty = build(&mut arena, &shape);

        let mut u = Unifier::new(&arena);
        prop_assert_eq!(u.try_unify(ty, ty), Ok(()));
        prop_assert!(u.log().is_clean());
    }

    /// Primitives unify exactly when they are the same primitive.
    #[test]
    fn primitives_unify_iff_equal(a in arb_primitive(), b in arb_primitive()) {
        let arena = TypeArena::new();
        let mut u = Unifier::new(&arena);
        prop_assert_eq!(u.try_unify(builtin(a), builtin(b)).is_ok(), a == b);
        prop_assert!(u.log().is_clean());
    }

    /// Binding staged by a child stays in the child until merged.
    #[test]
    fn dropped_child_work_is_discarded(shape in arb_shape()) {
        let mut arena = TypeArena::new();
        let ty = build(&mut arena, &shape);
        let var = arena.fresh_type(TypeLevel::new(0, 0));

        let u = Unifier::new(&arena);
        let mut child = u.child();
        prop_assert_eq!(child.try_unify(var, ty), Ok(()));
        prop_assert_eq!(child.follow(var), child.follow(ty));
        drop(child);

        prop_assert!(u.log().is_clean());
        prop_assert_eq!(u.follow(var), var);
    }
}
