//! The memoized matcher described in the crate's top-level documentation:
//! for every ordered pair of subtrees `(L, R)`, compute the largest number
//! of node-level matches obtainable under one of three alignment decisions.
//!
//! This is a direct, intentionally unoptimal structural recursion rather
//! than an optimal tree-edit-distance algorithm: children are paired
//! positionally (child *i* with child *i*) instead of through a bipartite
//! matching, and ties are broken by preferring earlier candidates. Both
//! choices are load-bearing for determinism and are preserved rather than
//! "fixed", since the patch extractor depends on reproducing them exactly.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::tree::{Node, node_match};

/// Which of the two roots moved to produce the best alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The two roots are aligned directly; `index` is 1 if they match at
    /// the node level, 0 otherwise (kept as a field to mirror the source's
    /// reuse of the match count as a boolean).
    RootRoot,
    /// `L` is best aligned against `R`'s child at `index`.
    RootChild(usize),
    /// `L`'s child at `index` is best aligned against `R`.
    ChildRoot(usize),
}

/// The best-known alignment for one ordered pair of subtrees.
#[derive(Debug, Clone, Copy)]
pub struct Match {
    pub score: usize,
    pub decision: Decision,
}

/// Key into the memoization table: a pair of node identities. Node ids are
/// only unique within a single tree, so both sides' ids are combined with
/// which tree they belong to by construction (the table is only ever
/// queried with one fixed left tree and one fixed right tree).
type Key = (usize, usize);

/// The memoization table produced by [`match_trees`], consumed by
/// [`crate::patch::extract_patches`].
#[derive(Debug, Default)]
pub struct MatchTable {
    table: FxHashMap<Key, Match>,
}

impl MatchTable {
    pub fn get(&self, left: &Node<'_>, right: &Node<'_>) -> Match {
        self.table[&(left.id, right.id)]
    }
}

/// Computes `match(L, R)` for every pair of subtrees reachable from the
/// given roots, memoizing as it goes. Runtime is worst-case
/// `O(|L| * |R|)` table entries, each costing `O(max-arity)` to compute.
pub fn match_trees<'a>(left: &'a Node<'a>, right: &'a Node<'a>) -> MatchTable {
    let mut table = MatchTable::default();
    compute(left, right, &mut table);
    debug!(
        "matched {} x {} nodes into a {}-entry table",
        left.size(),
        right.size(),
        table.table.len()
    );
    table
}

fn compute<'a>(left: &'a Node<'a>, right: &'a Node<'a>, table: &mut MatchTable) -> Match {
    let key = (left.id, right.id);
    if let Some(existing) = table.table.get(&key) {
        return *existing;
    }

    let roots_match = usize::from(node_match(left, right));
    let mut best_score = roots_match;
    let mut best_decision = Decision::RootRoot;

    for (l_child, r_child) in left.children.iter().zip(right.children.iter()) {
        best_score += compute(l_child, r_child, table).score;
    }

    for (index, r_child) in right.children.iter().enumerate() {
        let candidate = compute(left, r_child, table).score;
        if candidate > best_score {
            best_score = candidate;
            best_decision = Decision::RootChild(index);
        }
    }

    for (index, l_child) in left.children.iter().enumerate() {
        let candidate = compute(l_child, right, table).score;
        if candidate > best_score {
            best_score = candidate;
            best_decision = Decision::ChildRoot(index);
        }
    }

    trace!(
        "match({}, {}) = {best_score} via {best_decision:?}",
        left.name(),
        right.name()
    );

    let result = Match {
        score: best_score,
        decision: best_decision,
    };
    table.table.insert(key, result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ctx;

    #[test]
    fn identical_trees_match_fully() {
        let ctx = ctx();
        let left = ctx.parse("a + b");
        let right = ctx.parse("a + b");
        let table = match_trees(left.root(), right.root());
        let m = table.get(left.root(), right.root());
        assert_eq!(m.score, left.size());
        assert_eq!(m.decision, Decision::RootRoot);
    }

    #[test]
    fn score_never_exceeds_smaller_tree_size() {
        let ctx = ctx();
        let left = ctx.parse("a + b");
        let right = ctx.parse("(a + b) * c");
        let table = match_trees(left.root(), right.root());
        let m = table.get(left.root(), right.root());
        assert!(m.score <= left.size().min(right.size()));
    }

    #[test]
    fn wrapped_expression_prefers_root_child() {
        let ctx = ctx();
        let left = ctx.parse("a + b");
        let right = ctx.parse("(a + b) * c");
        let table = match_trees(left.root(), right.root());
        let m = table.get(left.root(), right.root());
        assert!(matches!(m.decision, Decision::RootChild(_)));
    }
}
