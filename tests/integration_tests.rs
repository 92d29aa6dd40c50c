//! End-to-end scenarios exercising [`codefeedback::describe_changes`]
//! against whole program texts, rather than the unit-level trees exercised
//! by the in-module tests.

use codefeedback::describe_changes;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn wrapping_an_expression_in_a_product_inserts_above() {
    let patches = describe_changes("a + b", "(a + b) * c").unwrap();
    assert!(
        patches.iter().any(|(desc, _)| desc.contains("insert tree=") && desc.contains("above node=")),
        "expected an InsertAbove patch, got: {patches:?}"
    );
}

#[test]
fn unwrapping_a_function_body_deletes_the_function_def_root() {
    let patches = describe_changes("def f():\n    a + b\n", "a + b").unwrap();
    assert!(
        patches.iter().any(|(desc, _)| desc.starts_with("delete tree") && desc.contains("delete_root = true")),
        "expected a root delete, got: {patches:?}"
    );
}

#[test]
fn wrapping_a_bare_expression_in_a_function_inserts_above() {
    let patches = describe_changes("a + b", "def f():\n    a + b\n").unwrap();
    assert_eq!(patches.len(), 2, "expected exactly two patches, got: {patches:?}");
    assert!(patches[0].0.contains("above node="));
}

#[test]
fn adding_a_trailing_statement_inserts_a_single_subtree_under_the_module() {
    let patches = describe_changes("a = 1\n", "a = 1\nb = 2\n").unwrap();
    assert_eq!(patches.len(), 1);
    assert!(patches[0].0.contains("under node="));
}

#[test]
fn renaming_one_identifier_is_a_single_unit_weight_edit() {
    let patches = describe_changes(
        "def f(a, b):\n    return a + b\n",
        "def f(a, c):\n    return a + c\n",
    )
    .unwrap();
    let edits: Vec<_> = patches.iter().filter(|(desc, _)| desc.starts_with("change ")).collect();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].1, 1);
}

#[test]
fn dropping_redundant_leading_statements_deletes_kept_children() {
    let patches = describe_changes("x = 1\ny = 2\nz = 3\n", "z = 3\n").unwrap();
    assert!(
        patches
            .iter()
            .any(|(desc, _)| desc.starts_with("delete tree") && desc.contains("delete_root = false")),
        "expected a non-root delete retaining the tail statement, got: {patches:?}"
    );
}

#[rstest]
#[case("a = 1\n")]
#[case("def f(a, b):\n    if a:\n        return a\n    return b\n")]
#[case("class C:\n    def m(self):\n        pass\n")]
#[case("for x in range(10):\n    print(x)\n")]
fn identical_sources_report_no_changes(#[case] source: &str) {
    assert!(describe_changes(source, source).unwrap().is_empty());
}

#[test]
fn total_weight_never_exceeds_the_combined_tree_size() {
    let left = "def f(a, b):\n    if a:\n        return a\n    return b\n";
    let right = "def g(a, b, c):\n    if a and c:\n        return a\n    return b + c\n";
    let patches = describe_changes(left, right).unwrap();
    let total: usize = patches.iter().map(|(_, weight)| weight).sum();
    // a generous upper bound: each patch touches at most the combined node count
    assert!(total <= left.len() + right.len());
}

#[test]
fn syntax_errors_are_reported_rather_than_panicking() {
    let result = describe_changes("def f(:\n", "def f():\n    pass\n");
    assert!(result.is_err());
}

#[test]
fn renamed_call_target_produces_exactly_one_edit() {
    let patches = describe_changes("foo(1, 2)\n", "bar(1, 2)\n").unwrap();
    let descriptions: Vec<&str> = patches.iter().map(|(desc, _)| desc.as_str()).collect();
    assert_eq!(descriptions.len(), 1);
    assert!(descriptions[0].starts_with("change \"") && descriptions[0].contains("ID: foo") && descriptions[0].contains("ID: bar"));
}
