//! The patch model and the extractor that walks a [`MatchTable`] to produce
//! an ordered list of [`Patch`]es.
//!
//! The extraction algorithm and its coalescing rules are described in the
//! crate's top-level documentation. The "all children kept" no-op delete on
//! `ROOT_ROOT` is an inherited quirk, preserved here for parity rather than
//! "corrected". `CHILD_ROOT` delete-coalescing walks the full ancestor
//! chain of the current left node (not just the node itself) when testing
//! membership in the previous `Delete`'s target, so a multi-level descent
//! collapses into a single `Delete` with a multi-element path.

use itertools::Itertools;

use crate::matching::{Decision, MatchTable};
use crate::tree::Node;

/// One tagged edit operation. See the crate documentation for the exact
/// semantics and the textual format produced by [`Patch::describe`].
#[derive(Debug)]
pub enum Patch<'a> {
    /// Relabel a single matched node to its right-side counterpart.
    Edit {
        from: &'a Node<'a>,
        to: &'a Node<'a>,
    },
    /// Append one or more right-side subtrees as further children of `under`.
    InsertUnder {
        under: &'a Node<'a>,
        inserted: Vec<&'a Node<'a>>,
    },
    /// `inserted` wraps `anchor`; `path` locates `anchor`'s position from
    /// `inserted`'s root.
    InsertAbove {
        anchor: &'a Node<'a>,
        inserted: &'a Node<'a>,
        path: Vec<usize>,
    },
    /// Remove `target` from the left side. If `delete_root` is set,
    /// `target` itself is removed and `kept` is the single path to the
    /// subtree that takes its place; otherwise `kept` lists the indices of
    /// `target`'s children that survive.
    Delete {
        target: &'a Node<'a>,
        delete_root: bool,
        kept: Vec<usize>,
    },
}

impl<'a> Patch<'a> {
    /// The approximate number of affected nodes. Always >= 1 for every
    /// patch this extractor emits, except the inherited `ROOT_ROOT`
    /// no-op delete (see the crate documentation's design notes), which
    /// legitimately carries weight 0.
    pub fn weight(&self) -> usize {
        match self {
            Self::Edit { .. } => 1,
            Self::InsertUnder { inserted, .. } => inserted.iter().map(|t| t.size()).sum(),
            Self::InsertAbove { inserted, path, .. } => {
                let placed = inserted.child_at_path(path).map_or(0, Node::size);
                inserted.size() - placed
            }
            Self::Delete {
                target,
                delete_root,
                kept,
            } => {
                if *delete_root {
                    let placed = target.child_at_path(kept).map_or(0, Node::size);
                    target.size() - placed
                } else {
                    let kept: std::collections::HashSet<_> = kept.iter().copied().collect();
                    target
                        .children
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| !kept.contains(i))
                        .map(|(_, c)| c.size())
                        .sum()
                }
            }
        }
    }

    /// The stable, human-readable description documented at the crate root.
    pub fn describe(&self) -> String {
        match self {
            Self::Edit { from, to } => format!("change \"{}\" to \"{}\"", from.name(), to.name()),
            Self::InsertUnder { under, inserted } => {
                let list = inserted.iter().map(|t| t.describe()).join(", ");
                format!("insert tree=\"[{list}]\" under node=\"{}\"", under.name())
            }
            Self::InsertAbove {
                anchor,
                inserted,
                path,
            } => {
                let tree_str = describe_with_placeholder(inserted, path);
                format!(
                    "insert tree=\"{tree_str}\" above node=\"{}\" new_child_position={path:?}",
                    anchor.name()
                )
            }
            Self::Delete {
                target,
                delete_root,
                kept,
            } => format!(
                "delete tree \"{}\"; delete_root = {delete_root}; not_deleted_descendants = {kept:?};",
                target.name()
            ),
        }
    }
}

/// Renders `root`'s `describe()` form with the descendant at `path`
/// replaced by the literal token `Place_for_child_node`.
fn describe_with_placeholder(root: &Node<'_>, path: &[usize]) -> String {
    fn go(node: &Node<'_>, path: &[usize]) -> String {
        if path.is_empty() {
            return "Place_for_child_node".to_string();
        }
        let (&next, rest) = path.split_first().expect("checked non-empty above");
        if node.is_leaf() {
            return node.name();
        }
        let children = node
            .children
            .iter()
            .enumerate()
            .map(|(i, c)| if i == next { go(c, rest) } else { c.describe() })
            .join(", ");
        format!("{}: [{children}]", node.name())
    }
    go(root, path)
}

/// Walks `table` from `(left, right)`, emitting the ordered patch list.
pub fn extract_patches<'a>(left: &'a Node<'a>, right: &'a Node<'a>, table: &MatchTable) -> Vec<Patch<'a>> {
    let mut patches = Vec::new();
    extract(left, right, table, &mut patches);
    patches
}

fn extract<'a>(left: &'a Node<'a>, right: &'a Node<'a>, table: &MatchTable, patches: &mut Vec<Patch<'a>>) {
    match table.get(left, right).decision {
        Decision::RootRoot => {
            let (left_count, right_count) = (left.children.len(), right.children.len());

            if left_count > right_count {
                patches.push(Patch::Delete {
                    target: left,
                    delete_root: false,
                    kept: (0..left_count).collect(),
                });
            }

            if right_count > left_count {
                patches.push(Patch::InsertUnder {
                    under: left,
                    inserted: right.children[left_count..].to_vec(),
                });
            }

            if !crate::tree::node_match(left, right) {
                patches.push(Patch::Edit { from: left, to: right });
            }

            for (l_child, r_child) in left.children.iter().zip(right.children.iter()) {
                extract(l_child, r_child, table, patches);
            }
        }

        Decision::RootChild(index) => {
            let coalesced = matches!(
                patches.last_mut(),
                Some(Patch::InsertAbove { anchor, .. }) if anchor.id == left.id
            );
            if coalesced {
                if let Some(Patch::InsertAbove { path, .. }) = patches.last_mut() {
                    path.push(index);
                }
            } else {
                patches.push(Patch::InsertAbove {
                    anchor: left,
                    inserted: right,
                    path: vec![index],
                });
            }
            let next_right = right.child(index).expect("decision index is in range");
            extract(left, next_right, table, patches);
        }

        Decision::ChildRoot(index) => {
            let coalesced = matches!(
                patches.last_mut(),
                Some(Patch::Delete { target, delete_root: true, .. })
                    if left.ancestors().any(|a| a.is_direct_child_of(*target))
            );
            if coalesced {
                if let Some(Patch::Delete { kept, .. }) = patches.last_mut() {
                    kept.push(index);
                }
            } else {
                patches.push(Patch::Delete {
                    target: left,
                    delete_root: true,
                    kept: vec![index],
                });
            }
            let next_left = left.child(index).expect("decision index is in range");
            extract(next_left, right, table, patches);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::match_trees;
    use crate::test_utils::ctx;

    fn patches_for<'a>(left: &'a crate::tree::Tree<'a>, right: &'a crate::tree::Tree<'a>) -> Vec<Patch<'a>> {
        let table = match_trees(left.root(), right.root());
        extract_patches(left.root(), right.root(), &table)
    }

    #[test]
    fn identity_produces_no_patches() {
        let ctx = ctx();
        let source = "def f(a, b):\n    return a + b\n";
        let left = ctx.parse(source);
        let right = ctx.parse(source);
        assert!(patches_for(&left, &right).is_empty());
    }

    #[test]
    fn wrapping_in_multiplication_inserts_above() {
        let ctx = ctx();
        let left = ctx.parse("a + b");
        let right = ctx.parse("(a + b) * c");
        let patches = patches_for(&left, &right);
        assert!(patches.iter().any(|p| matches!(p, Patch::InsertAbove { .. })));
    }

    #[test]
    fn removing_a_wrapping_function_deletes_root() {
        let ctx = ctx();
        let left = ctx.parse("def f():\n    a + b\n");
        let right = ctx.parse("a + b");
        let patches = patches_for(&left, &right);
        assert!(
            patches
                .iter()
                .any(|p| matches!(p, Patch::Delete { delete_root: true, .. }))
        );
    }

    #[test]
    fn a_deep_child_root_chain_coalesces_into_one_delete() {
        let ctx = ctx();
        let left = ctx.parse("f(g(h(x)))\n");
        let right = ctx.parse("x\n");
        let patches = patches_for(&left, &right);
        let deletes: Vec<_> = patches
            .iter()
            .filter(|p| matches!(p, Patch::Delete { delete_root: true, .. }))
            .collect();
        assert_eq!(
            deletes.len(),
            1,
            "expected the whole call chain to coalesce into a single root delete, got: {patches:?}"
        );
        if let Patch::Delete { kept, .. } = deletes[0] {
            assert!(kept.len() >= 3, "expected a multi-level kept path, got: {kept:?}");
        }
    }

    #[test]
    fn renaming_an_identifier_is_a_single_edit_of_weight_one() {
        let ctx = ctx();
        let left = ctx.parse("a + b");
        let right = ctx.parse("a + c");
        let patches = patches_for(&left, &right);
        let edits: Vec<_> = patches.iter().filter(|p| matches!(p, Patch::Edit { .. })).collect();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].weight(), 1);
    }

    #[test]
    fn added_trailing_statement_inserts_under_module() {
        let ctx = ctx();
        let left = ctx.parse("a = 1\n");
        let right = ctx.parse("a = 1\nb = 2\n");
        let patches = patches_for(&left, &right);
        assert!(matches!(
            patches.as_slice(),
            [Patch::InsertUnder { .. }]
        ));
    }

    #[test]
    fn total_weight_bounded_by_combined_size() {
        let ctx = ctx();
        let left = ctx.parse("def f(a, b):\n    if a:\n        return a\n    return b\n");
        let right = ctx.parse("def g(a, b, c):\n    if a and c:\n        return a\n    return b + c\n");
        let patches = patches_for(&left, &right);
        let total: usize = patches.iter().map(Patch::weight).sum();
        assert!(total <= left.size() + right.size());
    }
}
