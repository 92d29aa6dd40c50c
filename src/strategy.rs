//! The dispatch enum tying the AST strategy together with its two line/char
//! and token peers, so a caller can select a comparison strategy by name
//! without depending on any one strategy's internal patch type.

use std::time::Duration;

use crate::error::DiffError;
use crate::settings::DiffSettings;
use crate::{ast_diff, line_diff, token_diff};

/// One of the three independently-selectable comparison strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Ast,
    LineChar,
    Token,
}

impl Strategy {
    pub fn parse(name: &str) -> Result<Self, DiffError> {
        match name {
            "ast" => Ok(Self::Ast),
            "line" | "line_char" => Ok(Self::LineChar),
            "token" => Ok(Self::Token),
            other => Err(DiffError::InvalidSelection {
                name: other.to_string(),
            }),
        }
    }
}

/// Runs the selected strategy and renders its patches as `(description,
/// weight)` pairs, the common shape every strategy's peers collapse to at
/// the package boundary.
pub fn describe(strategy: Strategy, left: &str, right: &str, settings: &DiffSettings) -> Result<Vec<(String, usize)>, DiffError> {
    match strategy {
        Strategy::Ast => ast_diff::describe_changes(left, right),
        Strategy::LineChar => Ok(line_diff::diff(left, right, settings)
            .iter()
            .map(|p| (p.to_string(), p.size()))
            .collect()),
        Strategy::Token => Ok(token_diff::diff(left, right)?
            .iter()
            .map(|p| (p.to_string(), p.size()))
            .collect()),
    }
}

/// Applies `settings.selection_timeout` (if set) by delegating to
/// [`crate::sample_selector::find_closest`] with [`crate::sample_selector::quick_ratio`].
pub fn closest_sample<'s, S: AsRef<str>>(source: &str, samples: &'s [S], settings: &DiffSettings) -> Option<&'s S> {
    let timeout = settings.selection_timeout.map(Duration::from_secs_f64);
    crate::sample_selector::find_closest(source, samples, crate::sample_selector::quick_ratio, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_name_is_rejected() {
        assert!(Strategy::parse("xml").is_err());
    }

    #[test]
    fn known_strategy_names_round_trip() {
        assert_eq!(Strategy::parse("ast").unwrap(), Strategy::Ast);
        assert_eq!(Strategy::parse("line").unwrap(), Strategy::LineChar);
        assert_eq!(Strategy::parse("token").unwrap(), Strategy::Token);
    }

    #[test]
    fn identical_sources_yield_no_patches_under_every_strategy() {
        let settings = DiffSettings::default();
        let source = "a = 1\n";
        for strategy in [Strategy::Ast, Strategy::LineChar, Strategy::Token] {
            let result = describe(strategy, source, source, &settings).expect("parses");
            assert!(result.is_empty(), "{strategy:?} reported spurious changes");
        }
    }
}
