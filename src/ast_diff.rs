//! Wires the tree builder, matcher and patch extractor together behind the
//! single entry point the rest of the package (and its callers) use:
//! [`describe_changes`].

use typed_arena::Arena;

use crate::error::{DiffError, Side};
use crate::matching::match_trees;
use crate::patch::extract_patches;
use crate::tree::Node;
use crate::tree_builder;

fn parse(source: &str, side: Side) -> Result<tree_sitter::Tree, DiffError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python_orchard::LANGUAGE.into())
        .expect("bundled grammar is always loadable");
    let tree = parser.parse(source, None).ok_or_else(|| DiffError::ParseFailure {
        side,
        byte_offset: 0,
        message: "parser produced no tree".to_string(),
    })?;
    if tree.root_node().has_error() {
        return Err(DiffError::ParseFailure {
            side,
            byte_offset: first_error_offset(&tree),
            message: "source contains a syntax error".to_string(),
        });
    }
    Ok(tree)
}

fn first_error_offset(tree: &tree_sitter::Tree) -> usize {
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return node.start_byte();
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return tree.root_node().end_byte();
            }
        }
    }
}

/// Parses `left_source` and `right_source`, builds their uniform trees,
/// matches them and extracts the resulting patches, rendering each as a
/// `(description, weight)` pair in emission order.
pub fn describe_changes(left_source: &str, right_source: &str) -> Result<Vec<(String, usize)>, DiffError> {
    let left_cst = parse(left_source, Side::Left)?;
    let right_cst = parse(right_source, Side::Right)?;

    let left_arena: Arena<Node<'_>> = Arena::new();
    let right_arena: Arena<Node<'_>> = Arena::new();

    let left_tree = tree_builder::build(&left_cst, left_source, &left_arena)?;
    let right_tree = tree_builder::build(&right_cst, right_source, &right_arena)?;

    let table = match_trees(left_tree.root(), right_tree.root());
    let patches = extract_patches(left_tree.root(), right_tree.root(), &table);

    Ok(patches.iter().map(|p| (p.describe(), p.weight())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sources_describe_no_changes() {
        let source = "def f(a, b):\n    return a + b\n";
        assert!(describe_changes(source, source).unwrap().is_empty());
    }

    #[test]
    fn syntax_error_is_surfaced_as_parse_failure() {
        let err = describe_changes("def f(:\n", "def f():\n    pass\n").unwrap_err();
        assert!(matches!(err, DiffError::ParseFailure { side: Side::Left, .. }));
    }

    #[test]
    fn renamed_identifier_yields_single_edit_of_weight_one() {
        let result = describe_changes("a + b", "a + c").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1, 1);
        assert!(result[0].0.starts_with("change "));
    }

    #[test]
    fn wrapping_statement_in_a_function_inserts_above() {
        let result = describe_changes("a + b", "def f():\n    a + b\n").unwrap();
        assert!(result.iter().any(|(desc, _)| desc.contains("insert tree=")));
    }
}
