//! Type graph representation for Tyra.
//!
//! Types and type packs are nodes in a [`TypeArena`], addressed by stable
//! handles ([`TypeId`], [`TypePackId`]). A node's content may be replaced in
//! place; its handle never changes. The graph may be cyclic: a table refers to
//! its property types, which are free to refer back to the table.
//!
//! The transaction log in `tyra-txn` stages replacement content for nodes and
//! relies on the [`NodeId`] and [`Content`] traits defined here to treat type
//! nodes and pack nodes uniformly.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::Serialize;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Stable handle to a type node in a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    // Builtins, interned at these indices by `TypeArena::new()`.
    pub const ERROR: TypeId = TypeId(0);
    pub const NIL: TypeId = TypeId(1);
    pub const BOOLEAN: TypeId = TypeId(2);
    pub const NUMBER: TypeId = TypeId(3);
    pub const STRING: TypeId = TypeId(4);
    pub const THREAD: TypeId = TypeId(5);

    /// First index handed out for non-builtin types.
    pub const FIRST_DYNAMIC: u32 = 6;

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Stable handle to a type pack node in a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypePackId(pub u32);

impl TypePackId {
    pub const ERROR: TypePackId = TypePackId(0);
    /// The closed, empty pack `()`.
    pub const EMPTY: TypePackId = TypePackId(1);

    pub const FIRST_DYNAMIC: u32 = 2;

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

impl fmt::Display for TypePackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tp{}", self.0)
    }
}

/// Either kind of handle. Keys of the cycle guard, which tracks type pairs
/// and pack pairs on one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOrPackId {
    Type(TypeId),
    Pack(TypePackId),
}

impl From<TypeId> for TypeOrPackId {
    fn from(id: TypeId) -> Self {
        TypeOrPackId::Type(id)
    }
}

impl From<TypePackId> for TypeOrPackId {
    fn from(id: TypePackId) -> Self {
        TypeOrPackId::Pack(id)
    }
}

impl fmt::Display for TypeOrPackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeOrPackId::Type(id) => write!(f, "{id}"),
            TypeOrPackId::Pack(id) => write!(f, "{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Levels and scopes
// ---------------------------------------------------------------------------

/// Generalization level of a free or structural type.
///
/// Outer levels subsume inner ones. When a type escapes into an outer level
/// (for example by being bound to a free variable of that level) its level
/// must be lowered, otherwise it would be generalized too eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct TypeLevel {
    pub level: u32,
    pub sub_level: u32,
}

impl TypeLevel {
    pub const fn new(level: u32, sub_level: u32) -> Self {
        Self { level, sub_level }
    }

    /// True when `self` encloses `other` or is the same level.
    pub fn subsumes(self, other: TypeLevel) -> bool {
        if self.level < other.level {
            return true;
        }
        if self.level > other.level {
            return false;
        }
        self.sub_level == other.sub_level
    }

    /// Like [`TypeLevel::subsumes`], but false for equal levels.
    pub fn subsumes_strict(self, other: TypeLevel) -> bool {
        self != other && self.subsumes(other)
    }

    /// The next inner level.
    pub fn incr(self) -> Self {
        Self {
            level: self.level + 1,
            sub_level: 0,
        }
    }
}

impl fmt::Display for TypeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.level, self.sub_level)
    }
}

/// Opaque scope token. Scopes are numbered in nesting order, so a smaller id
/// encloses a larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn encloses(self, other: ScopeId) -> bool {
        self.0 <= other.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Type content
// ---------------------------------------------------------------------------

/// Redirect: this node is really `bound_to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundType {
    pub bound_to: TypeId,
}

/// An unsolved type variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeType {
    pub level: TypeLevel,
    pub scope: Option<ScopeId>,
}

impl FreeType {
    pub fn new(level: TypeLevel) -> Self {
        Self { level, scope: None }
    }
}

/// A quantified type parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericType {
    pub level: TypeLevel,
    pub scope: Option<ScopeId>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Nil,
    Boolean,
    Number,
    String,
    Thread,
}

impl PrimitiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Nil => "nil",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Number => "number",
            PrimitiveType::String => "string",
            PrimitiveType::Thread => "thread",
        }
    }
}

/// Dynamic key signature of a table: `[index_type]: index_result_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableIndexer {
    pub index_type: TypeId,
    pub index_result_type: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableState {
    /// Shape is fixed; no new properties may be added.
    Sealed,
    /// Literal under construction; properties may still be added.
    Unsealed,
    /// Inferred from usage; may grow and may be aliased to another table.
    Free,
    /// Quantified table shape.
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableType {
    pub props: BTreeMap<String, TypeId>,
    pub indexer: Option<TableIndexer>,
    /// Alias to another table. Followed like a redirect.
    pub bound_to: Option<TypeId>,
    pub state: TableState,
    pub level: TypeLevel,
    pub scope: Option<ScopeId>,
    pub name: Option<String>,
}

impl TableType {
    pub fn new(state: TableState, level: TypeLevel) -> Self {
        Self {
            props: BTreeMap::new(),
            indexer: None,
            bound_to: None,
            state,
            level,
            scope: None,
            name: None,
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.props.insert(name.into(), ty);
        self
    }

    pub fn with_indexer(mut self, index_type: TypeId, index_result_type: TypeId) -> Self {
        self.indexer = Some(TableIndexer {
            index_type,
            index_result_type,
        });
        self
    }

    /// Whether properties may still be added to this table.
    pub fn is_extensible(&self) -> bool {
        matches!(self.state, TableState::Unsealed | TableState::Free)
    }
}

/// Function type: `arg_types -> ret_types`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub arg_types: TypePackId,
    pub ret_types: TypePackId,
    pub level: TypeLevel,
    pub scope: Option<ScopeId>,
}

impl FunctionType {
    pub fn new(arg_types: TypePackId, ret_types: TypePackId) -> Self {
        Self {
            arg_types,
            ret_types,
            level: TypeLevel::default(),
            scope: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionType {
    pub options: Vec<TypeId>,
}

/// Result of a failed check; unifies with anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorType;

/// The current form of a type node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeVariant {
    Bound(BoundType),
    Free(FreeType),
    Generic(GenericType),
    Primitive(PrimitiveType),
    Table(TableType),
    Function(FunctionType),
    Union(UnionType),
    Error(ErrorType),
}

/// Content slot of a type node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVar {
    pub ty: TypeVariant,
    /// Shared builtins are never rewritten.
    pub persistent: bool,
}

impl TypeVar {
    pub fn new(ty: impl Into<TypeVariant>) -> Self {
        Self {
            ty: ty.into(),
            persistent: false,
        }
    }

    pub fn persistent(ty: impl Into<TypeVariant>) -> Self {
        Self {
            ty: ty.into(),
            persistent: true,
        }
    }

    /// Narrow to shape `T`.
    ///
    /// Call sites are expected to have followed the node first: narrowing a
    /// `Bound` node to anything but [`BoundType`] trips a debug assertion.
    /// Use [`TypeVar::is`] to probe nodes that may still be redirects.
    pub fn get<T: Shape<TypeVar>>(&self) -> Option<&T> {
        debug_assert!(
            T::IS_REDIRECT || !matches!(self.ty, TypeVariant::Bound(_)),
            "narrowing a bound type without following it"
        );
        T::narrow(self)
    }

    pub fn get_mut<T: Shape<TypeVar>>(&mut self) -> Option<&mut T> {
        debug_assert!(
            T::IS_REDIRECT || !matches!(self.ty, TypeVariant::Bound(_)),
            "narrowing a bound type without following it"
        );
        T::narrow_mut(self)
    }

    /// Shape test that never asserts, even on `Bound` content.
    pub fn is<T: Shape<TypeVar>>(&self) -> bool {
        T::narrow(self).is_some()
    }
}

impl From<TypeVariant> for TypeVar {
    fn from(ty: TypeVariant) -> Self {
        TypeVar::new(ty)
    }
}

// ---------------------------------------------------------------------------
// Type pack content
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundTypePack {
    pub bound_to: TypePackId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeTypePack {
    pub level: TypeLevel,
    pub scope: Option<ScopeId>,
}

impl FreeTypePack {
    pub fn new(level: TypeLevel) -> Self {
        Self { level, scope: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTypePack {
    pub level: TypeLevel,
    pub scope: Option<ScopeId>,
    pub name: Option<String>,
}

/// An explicit list of types, optionally followed by a tail pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePack {
    pub head: Vec<TypeId>,
    pub tail: Option<TypePackId>,
}

impl TypePack {
    pub fn closed(head: Vec<TypeId>) -> Self {
        Self { head, tail: None }
    }
}

/// Zero or more values of `ty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariadicTypePack {
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTypePack;

/// The current form of a pack node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePackVariant {
    Bound(BoundTypePack),
    Free(FreeTypePack),
    Generic(GenericTypePack),
    List(TypePack),
    Variadic(VariadicTypePack),
    Error(ErrorTypePack),
}

/// Content slot of a pack node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePackVar {
    pub ty: TypePackVariant,
    pub persistent: bool,
}

impl TypePackVar {
    pub fn new(ty: impl Into<TypePackVariant>) -> Self {
        Self {
            ty: ty.into(),
            persistent: false,
        }
    }

    pub fn persistent(ty: impl Into<TypePackVariant>) -> Self {
        Self {
            ty: ty.into(),
            persistent: true,
        }
    }

    pub fn get<T: Shape<TypePackVar>>(&self) -> Option<&T> {
        debug_assert!(
            T::IS_REDIRECT || !matches!(self.ty, TypePackVariant::Bound(_)),
            "narrowing a bound type pack without following it"
        );
        T::narrow(self)
    }

    pub fn get_mut<T: Shape<TypePackVar>>(&mut self) -> Option<&mut T> {
        debug_assert!(
            T::IS_REDIRECT || !matches!(self.ty, TypePackVariant::Bound(_)),
            "narrowing a bound type pack without following it"
        );
        T::narrow_mut(self)
    }

    pub fn is<T: Shape<TypePackVar>>(&self) -> bool {
        T::narrow(self).is_some()
    }
}

impl From<TypePackVariant> for TypePackVar {
    fn from(ty: TypePackVariant) -> Self {
        TypePackVar::new(ty)
    }
}

// ---------------------------------------------------------------------------
// Shapes: narrowing content to one variant
// ---------------------------------------------------------------------------

/// One concrete form that content `C` can take.
pub trait Shape<C>: Sized {
    /// Whether this is the redirect form of `C`.
    const IS_REDIRECT: bool;

    fn narrow(content: &C) -> Option<&Self>;
    fn narrow_mut(content: &mut C) -> Option<&mut Self>;
}

macro_rules! shapes {
    ($content:ty, $variants:ident { $($variant:ident($shape:ty, $redirect:literal)),* $(,)? }) => {
        $(
            impl From<$shape> for $variants {
                fn from(shape: $shape) -> Self {
                    $variants::$variant(shape)
                }
            }

            impl From<$shape> for $content {
                fn from(shape: $shape) -> Self {
                    <$content>::new($variants::$variant(shape))
                }
            }

            impl Shape<$content> for $shape {
                const IS_REDIRECT: bool = $redirect;

                fn narrow(content: &$content) -> Option<&Self> {
                    match &content.ty {
                        $variants::$variant(shape) => Some(shape),
                        _ => None,
                    }
                }

                fn narrow_mut(content: &mut $content) -> Option<&mut Self> {
                    match &mut content.ty {
                        $variants::$variant(shape) => Some(shape),
                        _ => None,
                    }
                }
            }
        )*
    };
}

shapes!(TypeVar, TypeVariant {
    Bound(BoundType, true),
    Free(FreeType, false),
    Generic(GenericType, false),
    Primitive(PrimitiveType, false),
    Table(TableType, false),
    Function(FunctionType, false),
    Union(UnionType, false),
    Error(ErrorType, false),
});

shapes!(TypePackVar, TypePackVariant {
    Bound(BoundTypePack, true),
    Free(FreeTypePack, false),
    Generic(GenericTypePack, false),
    List(TypePack, false),
    Variadic(VariadicTypePack, false),
    Error(ErrorTypePack, false),
});

// ---------------------------------------------------------------------------
// Node traits
// ---------------------------------------------------------------------------

/// Content of a node, as seen by code that treats types and packs alike.
pub trait Content: Clone + fmt::Debug + fmt::Display + 'static {
    type Id: NodeId<Content = Self>;

    /// The node this content redirects to, if any.
    fn redirect(&self) -> Option<Self::Id>;

    /// Generalization level, for content kinds that carry one.
    fn level(&self) -> Option<TypeLevel>;

    /// Overwrite the level. Returns false if this kind carries no level.
    fn set_level(&mut self, level: TypeLevel) -> bool;

    fn scope(&self) -> Option<ScopeId>;

    /// Overwrite the scope. Returns false if this kind carries no scope.
    fn set_scope(&mut self, scope: ScopeId) -> bool;

    fn is_persistent(&self) -> bool;

    /// Replace the structural content, keeping node-level flags.
    fn reassign(&mut self, other: Self);
}

/// A node handle.
pub trait NodeId:
    Copy + Ord + fmt::Debug + fmt::Display + Into<TypeOrPackId> + Serialize
{
    type Content: Content<Id = Self>;

    fn content(self, arena: &TypeArena) -> &Self::Content;
    fn content_mut(self, arena: &mut TypeArena) -> &mut Self::Content;
}

impl NodeId for TypeId {
    type Content = TypeVar;

    fn content(self, arena: &TypeArena) -> &TypeVar {
        &arena[self]
    }

    fn content_mut(self, arena: &mut TypeArena) -> &mut TypeVar {
        &mut arena[self]
    }
}

impl NodeId for TypePackId {
    type Content = TypePackVar;

    fn content(self, arena: &TypeArena) -> &TypePackVar {
        &arena[self]
    }

    fn content_mut(self, arena: &mut TypeArena) -> &mut TypePackVar {
        &mut arena[self]
    }
}

impl Content for TypeVar {
    type Id = TypeId;

    fn redirect(&self) -> Option<TypeId> {
        match &self.ty {
            TypeVariant::Bound(bound) => Some(bound.bound_to),
            TypeVariant::Table(table) => table.bound_to,
            _ => None,
        }
    }

    fn level(&self) -> Option<TypeLevel> {
        match &self.ty {
            TypeVariant::Free(free) => Some(free.level),
            TypeVariant::Table(table)
                if matches!(table.state, TableState::Free | TableState::Generic) =>
            {
                Some(table.level)
            }
            TypeVariant::Function(func) => Some(func.level),
            _ => None,
        }
    }

    fn set_level(&mut self, level: TypeLevel) -> bool {
        match &mut self.ty {
            TypeVariant::Free(free) => free.level = level,
            TypeVariant::Table(table) => {
                debug_assert!(
                    matches!(table.state, TableState::Free | TableState::Generic),
                    "changing the level of a {:?} table",
                    table.state
                );
                table.level = level;
            }
            TypeVariant::Function(func) => func.level = level,
            _ => return false,
        }
        true
    }

    fn scope(&self) -> Option<ScopeId> {
        match &self.ty {
            TypeVariant::Free(free) => free.scope,
            TypeVariant::Table(table) => table.scope,
            TypeVariant::Function(func) => func.scope,
            _ => None,
        }
    }

    fn set_scope(&mut self, scope: ScopeId) -> bool {
        match &mut self.ty {
            TypeVariant::Free(free) => free.scope = Some(scope),
            TypeVariant::Table(table) => table.scope = Some(scope),
            TypeVariant::Function(func) => func.scope = Some(scope),
            _ => return false,
        }
        true
    }

    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn reassign(&mut self, other: TypeVar) {
        self.ty = other.ty;
    }
}

impl Content for TypePackVar {
    type Id = TypePackId;

    fn redirect(&self) -> Option<TypePackId> {
        match &self.ty {
            TypePackVariant::Bound(bound) => Some(bound.bound_to),
            _ => None,
        }
    }

    fn level(&self) -> Option<TypeLevel> {
        match &self.ty {
            TypePackVariant::Free(free) => Some(free.level),
            _ => None,
        }
    }

    fn set_level(&mut self, level: TypeLevel) -> bool {
        match &mut self.ty {
            TypePackVariant::Free(free) => {
                free.level = level;
                true
            }
            _ => false,
        }
    }

    fn scope(&self) -> Option<ScopeId> {
        match &self.ty {
            TypePackVariant::Free(free) => free.scope,
            _ => None,
        }
    }

    fn set_scope(&mut self, scope: ScopeId) -> bool {
        match &mut self.ty {
            TypePackVariant::Free(free) => {
                free.scope = Some(scope);
                true
            }
            _ => false,
        }
    }

    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn reassign(&mut self, other: TypePackVar) {
        self.ty = other.ty;
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Owner of every type and pack node.
///
/// Nodes are never removed, so a handle stays valid for the arena's lifetime.
/// Indexing with a handle from another arena is a caller bug and panics if
/// the index is out of range.
#[derive(Debug, Clone)]
pub struct TypeArena {
    types: Vec<TypeVar>,
    packs: Vec<TypePackVar>,
}

impl TypeArena {
    pub fn new() -> Self {
        let types = vec![
            TypeVar::persistent(ErrorType),
            TypeVar::persistent(PrimitiveType::Nil),
            TypeVar::persistent(PrimitiveType::Boolean),
            TypeVar::persistent(PrimitiveType::Number),
            TypeVar::persistent(PrimitiveType::String),
            TypeVar::persistent(PrimitiveType::Thread),
        ];
        debug_assert_eq!(types.len(), TypeId::FIRST_DYNAMIC as usize);
        let packs = vec![
            TypePackVar::persistent(ErrorTypePack),
            TypePackVar::persistent(TypePack::closed(Vec::new())),
        ];
        debug_assert_eq!(packs.len(), TypePackId::FIRST_DYNAMIC as usize);
        Self { types, packs }
    }

    pub fn add_type(&mut self, ty: impl Into<TypeVar>) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.into());
        id
    }

    pub fn add_pack(&mut self, tp: impl Into<TypePackVar>) -> TypePackId {
        let id = TypePackId(self.packs.len() as u32);
        self.packs.push(tp.into());
        id
    }

    /// Allocate a fresh free type at `level`.
    pub fn fresh_type(&mut self, level: TypeLevel) -> TypeId {
        self.add_type(FreeType::new(level))
    }

    /// Allocate a fresh free pack at `level`.
    pub fn fresh_pack(&mut self, level: TypeLevel) -> TypePackId {
        self.add_pack(FreeTypePack::new(level))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    /// Follow redirects through live content only.
    ///
    /// A chain longer than the number of nodes must revisit a node, so the
    /// walk stops there and returns the node it reached.
    pub fn follow<K: NodeId>(&self, id: K) -> K {
        let limit = self.types.len().max(self.packs.len());
        let mut current = id;
        for _ in 0..limit {
            match current.content(self).redirect() {
                Some(next) => current = next,
                None => return current,
            }
        }
        current
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<TypeId> for TypeArena {
    type Output = TypeVar;

    fn index(&self, id: TypeId) -> &TypeVar {
        &self.types[id.index()]
    }
}

impl IndexMut<TypeId> for TypeArena {
    fn index_mut(&mut self, id: TypeId) -> &mut TypeVar {
        &mut self.types[id.index()]
    }
}

impl Index<TypePackId> for TypeArena {
    type Output = TypePackVar;

    fn index(&self, id: TypePackId) -> &TypePackVar {
        &self.packs[id.index()]
    }
}

impl IndexMut<TypePackId> for TypeArena {
    fn index_mut(&mut self, id: TypePackId) -> &mut TypePackVar {
        &mut self.packs[id.index()]
    }
}

// ---------------------------------------------------------------------------
// Display (short, handle-level rendering for diagnostics)
// ---------------------------------------------------------------------------

fn write_level_and_scope(
    f: &mut fmt::Formatter<'_>,
    level: TypeLevel,
    scope: Option<ScopeId>,
) -> fmt::Result {
    match scope {
        Some(scope) => write!(f, "({level}, {scope})"),
        None => write!(f, "({level})"),
    }
}

impl fmt::Display for TypeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeVariant::Bound(bound) => write!(f, "bound {}", bound.bound_to),
            TypeVariant::Free(free) => {
                write!(f, "free")?;
                write_level_and_scope(f, free.level, free.scope)
            }
            TypeVariant::Generic(generic) => match &generic.name {
                Some(name) => write!(f, "{name}"),
                None => {
                    write!(f, "generic")?;
                    write_level_and_scope(f, generic.level, generic.scope)
                }
            },
            TypeVariant::Primitive(prim) => write!(f, "{}", prim.as_str()),
            TypeVariant::Table(table) => {
                if let Some(target) = table.bound_to {
                    return write!(f, "table -> {target}");
                }
                if table.props.is_empty() && table.indexer.is_none() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                let mut first = true;
                for (name, ty) in &table.props {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{name}: {ty}")?;
                }
                if let Some(indexer) = &table.indexer {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "[{}]: {}", indexer.index_type, indexer.index_result_type)?;
                }
                write!(f, " }}")
            }
            TypeVariant::Function(func) => write!(f, "{} -> {}", func.arg_types, func.ret_types),
            TypeVariant::Union(union) => {
                for (i, option) in union.options.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{option}")?;
                }
                Ok(())
            }
            TypeVariant::Error(_) => write!(f, "*error*"),
        }
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)
    }
}

impl fmt::Display for TypePackVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePackVariant::Bound(bound) => write!(f, "bound {}", bound.bound_to),
            TypePackVariant::Free(free) => {
                write!(f, "free")?;
                write_level_and_scope(f, free.level, free.scope)
            }
            TypePackVariant::Generic(generic) => match &generic.name {
                Some(name) => write!(f, "{name}..."),
                None => {
                    write!(f, "generic")?;
                    write_level_and_scope(f, generic.level, generic.scope)
                }
            },
            TypePackVariant::List(pack) => {
                write!(f, "(")?;
                for (i, ty) in pack.head.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                if let Some(tail) = pack.tail {
                    if !pack.head.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...{tail}")?;
                }
                write!(f, ")")
            }
            TypePackVariant::Variadic(variadic) => write!(f, "...{}", variadic.ty),
            TypePackVariant::Error(_) => write!(f, "*error*"),
        }
    }
}

impl fmt::Display for TypePackVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)
    }
}
