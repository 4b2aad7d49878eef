//! Property tests for the transaction log using proptest.
//!
//! Each case builds a small arena of free types and packs, runs a random
//! sequence of staging operations against one or two logs, and checks:
//!
//! 1. Staging never writes to the live graph
//! 2. Committing a log and then its inverse restores every node
//! 3. After `concat`, the right-hand log wins on every node it staged
//! 4. `get_changes` lists exactly the nodes that were staged
//! 5. `follow` ends on a non-redirect node when redirects are acyclic
//! 6. Re-queueing a staged node never alters its staged content

use std::collections::BTreeSet;

use proptest::prelude::*;
use tyra_types::*;

use crate::TxnLog;

const TYPES: usize = 8;
const PACKS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Queue(usize),
    Primitive(usize, PrimitiveType),
    /// Redirect type `.0` to a strictly earlier type `.1`.
    Bind(usize, usize),
    ChangeLevel(usize, u32),
    ChangeScope(usize, u32),
    QueuePack(usize),
    VariadicPack(usize, PrimitiveType),
    PackLevel(usize, u32),
}

fn arb_primitive() -> impl Strategy<Value = PrimitiveType> {
    prop_oneof![
        Just(PrimitiveType::Nil),
        Just(PrimitiveType::Boolean),
        Just(PrimitiveType::Number),
        Just(PrimitiveType::String),
        Just(PrimitiveType::Thread),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..TYPES).prop_map(Op::Queue),
        (0..TYPES, arb_primitive()).prop_map(|(i, p)| Op::Primitive(i, p)),
        (1..TYPES)
            .prop_flat_map(|i| (Just(i), 0..i))
            .prop_map(|(i, j)| Op::Bind(i, j)),
        (0..TYPES, 0..4u32).prop_map(|(i, l)| Op::ChangeLevel(i, l)),
        (0..TYPES, 0..4u32).prop_map(|(i, s)| Op::ChangeScope(i, s)),
        (0..PACKS).prop_map(Op::QueuePack),
        (0..PACKS, arb_primitive()).prop_map(|(i, p)| Op::VariadicPack(i, p)),
        (0..PACKS, 0..4u32).prop_map(|(i, l)| Op::PackLevel(i, l)),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(arb_op(), 0..24)
}

struct Fixture {
    arena: TypeArena,
    types: Vec<TypeId>,
    packs: Vec<TypePackId>,
}

impl Fixture {
    fn new() -> Self {
        let mut arena = TypeArena::new();
        let types = (0..TYPES)
            .map(|i| arena.fresh_type(TypeLevel::new(i as u32 % 3 + 1, 0)))
            .collect();
        let packs = (0..PACKS)
            .map(|i| arena.fresh_pack(TypeLevel::new(i as u32 % 2 + 1, 0)))
            .collect();
        Self {
            arena,
            types,
            packs,
        }
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

    /// Apply `ops` to `log`, returning the nodes touched.
    fn apply(&self, log: &mut TxnLog, ops: &[Op]) -> (BTreeSet<TypeId>, BTreeSet<TypePackId>) {
        let mut types = BTreeSet::new();
        let mut packs = BTreeSet::new();
        for op in ops {
            match *op {
                Op::Queue(i) => {
                    log.queue(&self.arena, self.types[i]);
                    types.insert(self.types[i]);
                }
                Op::Primitive(i, prim) => {
                    log.replace(&self.arena, self.types[i], prim);
                    types.insert(self.types[i]);
                }
                Op::Bind(i, j) => {
                    log.replace(
                        &self.arena,
                        self.types[i],
                        BoundType {
                            bound_to: self.types[j],
                        },
                    );
                    types.insert(self.types[i]);
                }
                Op::ChangeLevel(i, level) => {
                    log.change_level(&self.arena, self.types[i], TypeLevel::new(level, 0));
                    types.insert(self.types[i]);
                }
                Op::ChangeScope(i, scope) => {
                    log.change_scope(&self.arena, self.types[i], ScopeId(scope));
                    types.insert(self.types[i]);
                }
                Op::QueuePack(i) => {
                    log.queue(&self.arena, self.packs[i]);
                    packs.insert(self.packs[i]);
                }
                Op::VariadicPack(i, prim) => {
                    log.replace(
                        &self.arena,
                        self.packs[i],
                        VariadicTypePack {
                            ty: Self::builtin(prim),
                        },
                    );
                    packs.insert(self.packs[i]);
                }
                Op::PackLevel(i, level) => {
                    log.change_level(&self.arena, self.packs[i], TypeLevel::new(level, 0));
                    packs.insert(self.packs[i]);
                }
            }
        }
        (types, packs)
    }

    fn snapshot(&self) -> (Vec<TypeVar>, Vec<TypePackVar>) {
        (
            self.types.iter().map(|&ty| self.arena[ty].clone()).collect(),
            self.packs.iter().map(|&tp| self.arena[tp].clone()).collect(),
        )
    }
}

proptest! {
    /// Nothing a log stages is written to the arena before commit.
    #[test]
    fn staging_leaves_live_graph_untouched(ops in arb_ops()) {
        let fixture = Fixture::new();
        let before = fixture.snapshot();
        let mut log = TxnLog::new();
        fixture.apply(&mut log, &ops);
        prop_assert_eq!(fixture.snapshot(), before);
    }

    /// Committing a log and then its inverse is a no-op on the graph.
    #[test]
    fn inverse_undoes_commit(ops in arb_ops()) {
        let mut fixture = Fixture::new();
        let before = fixture.snapshot();
        let mut log = TxnLog::new();
        fixture.apply(&mut log, &ops);

        let mut undo = log.inverse(&fixture.arena);
        prop_assert_eq!(undo.get_changes(), log.get_changes());

        log.commit(&mut fixture.arena);
        undo.commit(&mut fixture.arena);
        prop_assert_eq!(fixture.snapshot(), before);
    }

    /// The committed graph matches what the log showed before commit.
    #[test]
    fn commit_materializes_staged_view(ops in arb_ops()) {
        let mut fixture = Fixture::new();
        let mut log = TxnLog::new();
        fixture.apply(&mut log, &ops);

        let staged: Vec<TypeVar> = fixture
            .types
            .iter()
            .map(|&ty| log.content(&fixture.arena, ty).clone())
            .collect();
        log.commit(&mut fixture.arena);
        prop_assert!(log.is_clean());
        prop_assert_eq!(fixture.snapshot().0, staged);
    }

    /// After `concat`, every node the right-hand log staged shows the
    /// right-hand content, and every other node keeps the left-hand view.
    #[test]
    fn concat_right_hand_side_wins(lhs_ops in arb_ops(), rhs_ops in arb_ops()) {
        let fixture = Fixture::new();
        let mut lhs = TxnLog::new();
        fixture.apply(&mut lhs, &lhs_ops);
        let mut rhs = lhs.child();
        let (rhs_types, rhs_packs) = fixture.apply(&mut rhs, &rhs_ops);

        let expected_types: Vec<TypeVar> = fixture
            .types
            .iter()
            .map(|&ty| {
                let winner = if rhs_types.contains(&ty) { &rhs } else { &lhs };
                winner.content(&fixture.arena, ty).clone()
            })
            .collect();
        let expected_packs: Vec<TypePackVar> = fixture
            .packs
            .iter()
            .map(|&tp| {
                let winner = if rhs_packs.contains(&tp) { &rhs } else { &lhs };
                winner.content(&fixture.arena, tp).clone()
            })
            .collect();

        lhs.concat(rhs);
        for (ty, expected) in fixture.types.iter().zip(&expected_types) {
            prop_assert_eq!(lhs.content(&fixture.arena, *ty), expected);
        }
        for (tp, expected) in fixture.packs.iter().zip(&expected_packs) {
            prop_assert_eq!(lhs.content(&fixture.arena, *tp), expected);
        }
    }

    /// The footprint of a log is exactly the set of staged nodes.
    #[test]
    fn get_changes_matches_staged_nodes(ops in arb_ops()) {
        let fixture = Fixture::new();
        let mut log = TxnLog::new();
        let (types, packs) = fixture.apply(&mut log, &ops);

        let changes = log.get_changes();
        prop_assert_eq!(changes.types, types.into_iter().collect::<Vec<_>>());
        prop_assert_eq!(changes.packs, packs.into_iter().collect::<Vec<_>>());
    }

    /// With redirects only pointing at earlier nodes, `follow` always lands
    /// on content that is not a redirect.
    #[test]
    fn follow_reaches_non_redirect(ops in arb_ops(), start in 0..TYPES) {
        let fixture = Fixture::new();
        let mut log = TxnLog::new();
        fixture.apply(&mut log, &ops);

        let end = log.follow(&fixture.arena, fixture.types[start]);
        prop_assert!(log.content(&fixture.arena, end).redirect().is_none());
        prop_assert_eq!(log.follow(&fixture.arena, end), end);
    }

    /// Queueing an already staged node hands back the same content.
    #[test]
    fn requeue_is_idempotent(ops in arb_ops(), target in 0..TYPES) {
        let fixture = Fixture::new();
        let mut log = TxnLog::new();
        fixture.apply(&mut log, &ops);

        let ty = fixture.types[target];
        let first = log.queue(&fixture.arena, ty).pending.clone();
        let second = log.queue(&fixture.arena, ty).pending.clone();
        prop_assert_eq!(first, second);
        prop_assert_eq!(log.get_changes().types.iter().filter(|&&t| t == ty).count(), 1);
    }
}
