//! Exercises the line/char and token strategies through the public
//! [`codefeedback::strategy`] dispatcher, since their patch types are
//! crate-private.

use codefeedback::settings::DiffSettings;
use codefeedback::strategy::{describe, Strategy};

#[test]
fn line_strategy_reports_an_inserted_line() {
    let settings = DiffSettings::default();
    let patches = describe(Strategy::LineChar, "a = 1\n", "a = 1\nb = 2\n", &settings).unwrap();
    assert_eq!(patches.len(), 1);
    assert!(patches[0].0.contains("Insert"));
}

#[test]
fn token_strategy_reports_a_single_rename() {
    let settings = DiffSettings::default();
    let patches = describe(Strategy::Token, "foo(1)\n", "bar(1)\n", &settings).unwrap();
    assert_eq!(patches.len(), 1);
    assert!(patches[0].0.contains("Replace"));
}

#[test]
fn unknown_strategy_name_is_an_invalid_selection_error() {
    assert!(Strategy::parse("json-diff").is_err());
}

#[test]
fn every_strategy_agrees_on_identical_sources() {
    let settings = DiffSettings::default();
    let source = "def f(a, b):\n    return a + b\n";
    for strategy in [Strategy::Ast, Strategy::LineChar, Strategy::Token] {
        assert!(describe(strategy, source, source, &settings).unwrap().is_empty());
    }
}
