//! The uniform node/tree model that the matcher and patch extractor operate
//! on, independently of the host grammar. A [`Tree`] is built once by
//! [`crate::tree_builder`], never mutated, and destroyed once the patch list
//! has been produced.

use std::cell::UnsafeCell;
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use typed_arena::Arena;

/// A dense, pre-order-assigned identity for a node, unique within the tree
/// that contains it. This doubles as the `pk` used in patch descriptions
/// (see [`Node::name`]) and as half of the memoization key in
/// [`crate::matching`].
pub type NodeId = usize;

/// The closed set of constructs the tree builder can produce.
///
/// Kinds that wrap a homogeneous list of peer children (function bodies,
/// call arguments, decorator lists, ...) are not given their own variant;
/// they all become [`NodeKind::Group`], disambiguated by the slot name
/// carried in [`Payload::Text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    ExpressionStatement,
    Identifier,
    Number,
    StringLiteral,
    BytesLiteral,
    BoolLiteral,
    NoneLiteral,
    Ellipsis,
    /// A binary/boolean/unary/comparison operator symbol, e.g. `+`, `and`, `not`, `==`.
    Operator,
    UnaryOp,
    BinaryOp,
    BoolOp,
    CompareOp,
    Attribute,
    Subscript,
    Slice,
    Starred,
    Call,
    Lambda,
    ConditionalExpr,
    ListLiteral,
    TupleLiteral,
    SetLiteral,
    DictLiteral,
    ListComp,
    SetComp,
    DictComp,
    GeneratorExp,
    Comprehension,
    Yield,
    YieldFrom,
    If,
    For,
    While,
    Try,
    ExceptHandler,
    With,
    WithItem,
    Assign,
    AugAssign,
    AnnAssign,
    Delete,
    Import,
    ImportFrom,
    Alias,
    Global,
    Nonlocal,
    Pass,
    Break,
    Continue,
    Return,
    Raise,
    Assert,
    FunctionDef,
    Parameters,
    Parameter,
    ClassDef,
    Keyword,
    /// A synthetic wrapper around a homogeneous, ordered list of peer nodes
    /// belonging to the same parent slot. Carries a slot name payload (e.g.
    /// `Body`, `Targets`, `CallArgs`).
    Group,
}

impl NodeKind {
    fn label(self) -> &'static str {
        match self {
            Self::Module => "Module",
            Self::ExpressionStatement => "ExpressionStatement",
            Self::Identifier => "Identifier",
            Self::Number => "Number",
            Self::StringLiteral => "StringLiteral",
            Self::BytesLiteral => "BytesLiteral",
            Self::BoolLiteral => "BoolLiteral",
            Self::NoneLiteral => "NoneLiteral",
            Self::Ellipsis => "Ellipsis",
            Self::Operator => "Operator",
            Self::UnaryOp => "UnaryOp",
            Self::BinaryOp => "BinaryOp",
            Self::BoolOp => "BoolOp",
            Self::CompareOp => "CompareOp",
            Self::Attribute => "Attribute",
            Self::Subscript => "Subscript",
            Self::Slice => "Slice",
            Self::Starred => "Starred",
            Self::Call => "Call",
            Self::Lambda => "Lambda",
            Self::ConditionalExpr => "ConditionalExpr",
            Self::ListLiteral => "ListLiteral",
            Self::TupleLiteral => "TupleLiteral",
            Self::SetLiteral => "SetLiteral",
            Self::DictLiteral => "DictLiteral",
            Self::ListComp => "ListComp",
            Self::SetComp => "SetComp",
            Self::DictComp => "DictComp",
            Self::GeneratorExp => "GeneratorExp",
            Self::Comprehension => "Comprehension",
            Self::Yield => "Yield",
            Self::YieldFrom => "YieldFrom",
            Self::If => "If",
            Self::For => "For",
            Self::While => "While",
            Self::Try => "Try",
            Self::ExceptHandler => "ExceptHandler",
            Self::With => "With",
            Self::WithItem => "WithItem",
            Self::Assign => "Assign",
            Self::AugAssign => "AugAssign",
            Self::AnnAssign => "AnnAssign",
            Self::Delete => "Delete",
            Self::Import => "Import",
            Self::ImportFrom => "ImportFrom",
            Self::Alias => "Alias",
            Self::Global => "Global",
            Self::Nonlocal => "Nonlocal",
            Self::Pass => "Pass",
            Self::Break => "Break",
            Self::Continue => "Continue",
            Self::Return => "Return",
            Self::Raise => "Raise",
            Self::Assert => "Assert",
            Self::FunctionDef => "FunctionDef",
            Self::Parameters => "Parameters",
            Self::Parameter => "Parameter",
            Self::ClassDef => "ClassDef",
            Self::Keyword => "Keyword",
            Self::Group => "Group",
        }
    }
}

/// The data a node carries beyond its kind. Two nodes match at the node
/// level iff their kinds and payloads are both equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Payload {
    /// No extra data (most node kinds).
    Empty,
    /// Identifier name, numeric/string/bytes literal text, operator symbol,
    /// or group slot name, depending on the owning [`NodeKind`].
    Text(String),
    /// `True` / `False`.
    Bool(bool),
}

impl Payload {
    fn describe(&self) -> Option<&str> {
        match self {
            Self::Empty | Self::Bool(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

/// A single node in a [`Tree`], arena-allocated for the lifetime of the
/// comparison. Identity is `id`, not pointer equality.
#[derive(Debug)]
pub struct Node<'a> {
    pub id: NodeId,
    pub kind: NodeKind,
    pub payload: Payload,
    pub children: Vec<&'a Node<'a>>,
    size: usize,
    parent: UnsafeCell<Option<&'a Node<'a>>>,
}

// SAFETY: `parent` is only ever written once, right after the node's
// children are linked to it, and from then on every read sees the same
// arena-owned reference. Mirrors the teacher lineage's own justification for
// `AstNode`'s identical `UnsafeCell` parent pointer.
unsafe impl Sync for Node<'_> {}
unsafe impl Send for Node<'_> {}

impl<'a> Node<'a> {
    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&'a Node<'a>> {
        self.children.get(index).copied()
    }

    pub fn parent(&self) -> Option<&'a Node<'a>> {
        // SAFETY: see the `unsafe impl Sync` justification above.
        unsafe { *self.parent.get() }
    }

    /// Depth-first, pre-order iterator over this subtree (itself first).
    pub fn dfs(&'a self) -> impl Iterator<Item = &'a Node<'a>> {
        DfsIterator { stack: vec![self] }
    }

    /// Iterator over this node and its ancestors, root last.
    pub fn ancestors(&'a self) -> impl Iterator<Item = &'a Node<'a>> {
        AncestorsIterator { cursor: Some(self) }
    }

    /// Whether `self` is a direct child of `other`.
    pub fn is_direct_child_of(&self, other: &Node<'a>) -> bool {
        other.children.iter().any(|c| c.id == self.id)
    }

    /// The child reached by following `path` (a sequence of child indices)
    /// from this node, if every step is in range.
    pub fn child_at_path(&'a self, path: &[usize]) -> Option<&'a Node<'a>> {
        let mut current = self;
        for &index in path {
            current = current.child(index)?;
        }
        Some(current)
    }

    /// `pk_KIND`: the stable, human-readable name used in patch descriptions.
    /// `KIND` is `ID: <name>` for identifiers, `Num: <value>` for numeric
    /// literals, the slot name for group nodes, and the node-kind label
    /// otherwise.
    pub fn name(&self) -> String {
        format!("{}_{}", self.id, self.kind_label())
    }

    fn kind_label(&self) -> String {
        match self.kind {
            NodeKind::Identifier => format!("ID: {}", self.text()),
            NodeKind::Number => format!("Num: {}", self.text()),
            NodeKind::Group => self.text().to_string(),
            _ => self.kind.label().to_string(),
        }
    }

    fn text(&self) -> &str {
        self.payload.describe().unwrap_or_default()
    }

    /// The string form used in patch descriptions: `NAME` for a leaf,
    /// `NAME: [child1, child2, ...]` otherwise.
    pub fn describe(&self) -> String {
        if self.is_leaf() {
            self.name()
        } else {
            let children = self.children.iter().map(|c| c.describe()).join(", ");
            format!("{}: [{children}]", self.name())
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Node<'_> {}

impl Hash for Node<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Whether two nodes match at the node level: same kind, same payload.
/// Children are not considered here; that's the matcher's job.
pub fn node_match(left: &Node<'_>, right: &Node<'_>) -> bool {
    left.kind == right.kind && left.payload == right.payload
}

struct DfsIterator<'a> {
    stack: Vec<&'a Node<'a>>,
}

impl<'a> Iterator for DfsIterator<'a> {
    type Item = &'a Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

struct AncestorsIterator<'a> {
    cursor: Option<&'a Node<'a>>,
}

impl<'a> Iterator for AncestorsIterator<'a> {
    type Item = &'a Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = current.parent();
        Some(current)
    }
}

/// A parsed, normalized source. The arena its [`Node`]s are allocated in is
/// owned by the caller (see [`crate::tree_builder::build`]); `'a` ties this
/// tree's lifetime to it.
pub struct Tree<'a> {
    root: &'a Node<'a>,
}

impl<'a> Tree<'a> {
    pub fn root(&self) -> &'a Node<'a> {
        self.root
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }
}

/// Builder used by [`crate::tree_builder`] to assemble a [`Tree`] bottom-up
/// while assigning pre-order ids top-down.
pub(crate) struct TreeBuilder<'a> {
    arena: &'a Arena<Node<'a>>,
    next_id: NodeId,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(arena: &'a Arena<Node<'a>>) -> Self {
        Self { arena, next_id: 0 }
    }

    /// Reserve the next pre-order id. Call this before recursing into
    /// children so that a parent's id is always lower than its children's.
    pub(crate) fn reserve_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Allocate a node with already-built children and link their parent
    /// pointers back to it.
    pub(crate) fn alloc(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        payload: Payload,
        children: Vec<&'a Node<'a>>,
    ) -> &'a Node<'a> {
        let size = 1 + children.iter().map(|c| c.size()).sum::<usize>();
        let node = self.arena.alloc(Node {
            id,
            kind,
            payload,
            children,
            size,
            parent: UnsafeCell::new(None),
        });
        for child in &node.children {
            // SAFETY: parent is only ever written immediately after
            // construction, exactly once, before the node is shared further.
            unsafe { *child.parent.get() = Some(node) };
        }
        node
    }

    pub(crate) fn finish(self, root: &'a Node<'a>) -> Tree<'a> {
        Tree { root }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ctx;

    #[test]
    fn size_and_leaf() {
        let ctx = ctx();
        let tree = ctx.parse("a + b");
        assert!(!tree.root().is_leaf());
        assert_eq!(tree.size(), tree.root().size());
    }

    #[test]
    fn dfs_visits_every_node() {
        let ctx = ctx();
        let tree = ctx.parse("a + b");
        assert_eq!(tree.root().dfs().count(), tree.size());
    }

    #[test]
    fn ids_are_preorder() {
        let ctx = ctx();
        let tree = ctx.parse("a + b");
        let ids: Vec<_> = tree.root().dfs().map(|n| n.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn identical_identifiers_match() {
        let ctx = ctx();
        let left = ctx.parse("x");
        let right = ctx.parse("x");
        let left_id = left.root().dfs().find(|n| n.kind == NodeKind::Identifier);
        let right_id = right.root().dfs().find(|n| n.kind == NodeKind::Identifier);
        assert!(node_match(left_id.unwrap(), right_id.unwrap()));
    }
}
