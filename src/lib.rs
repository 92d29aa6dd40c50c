//! Human-readable structural diffs between two program sources.
//!
//! ## Overview
//!
//! Given a "left" (student) source and a "right" (reference) source, this
//! crate computes the smallest set of edits, in a human-readable form,
//! that transforms one into the other. Three independently-selectable
//! strategies are available: an abstract-syntax-tree differ (the core
//! subsystem), a line/char differ, and a token differ.
//!
//! The AST differ parses both sources, adapts them into a uniform tree
//! model ([`tree`]), computes a best correspondence between nodes
//! ([`matching`]) and walks that correspondence to emit a compact,
//! coalesced list of tagged patches ([`patch`]). [`ast_diff`] wires those
//! three steps together behind [`describe_changes`], the crate's primary
//! entry point.
//!
//! The line/char and token strategies ([`line_diff`], [`token_diff`]) are
//! thin, independent peers built on well-known sequence-diff primitives;
//! they share a simpler patch model ([`peer_patch`]) over character
//! offsets rather than the tree model. [`strategy`] dispatches across all
//! three by name. [`sample_selector`] is an unrelated collaborator used by
//! the enclosing feedback service to pick which reference solution a
//! submission most resembles before diffing against it.
//!
//! ## Using as a library
//!
//! This crate is not designed to be used outside the feedback service it
//! was built for; the Rust API is not meant to be stable.

pub mod ast_diff;
pub mod error;
pub(crate) mod line_diff;
pub(crate) mod matching;
pub(crate) mod patch;
pub(crate) mod peer_patch;
pub mod sample_selector;
pub mod settings;
pub mod strategy;
#[cfg(test)]
pub(crate) mod test_utils;
pub(crate) mod token_diff;
pub mod tree;
pub(crate) mod tree_builder;

pub use ast_diff::describe_changes;
pub use error::DiffError;
pub use strategy::Strategy;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn describe_changes_is_the_crate_entry_point() {
        let result = describe_changes("a + b", "a + b").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn strategy_dispatch_agrees_with_the_ast_entry_point() {
        let settings = settings::DiffSettings::default();
        let via_strategy = strategy::describe(Strategy::Ast, "a + b", "a + c", &settings).unwrap();
        let via_entry_point = describe_changes("a + b", "a + c").unwrap();
        assert_eq!(via_strategy, via_entry_point);
    }
}
