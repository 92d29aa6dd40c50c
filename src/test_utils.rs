//! Test-only helpers: a single-arena context that parses Python source
//! into our uniform tree model without repeating the parser/arena
//! boilerplate in every test module.

use tree_sitter::Parser;
use typed_arena::Arena;

use crate::error::DiffError;
use crate::tree::{Node, Tree};
use crate::tree_builder;

/// Owns the arena a parsed [`Tree`] borrows from, so tests can build
/// several trees in one scope without juggling arena lifetimes by hand.
pub struct TestContext<'a> {
    arena: Arena<Node<'a>>,
}

pub fn ctx<'a>() -> TestContext<'a> {
    TestContext { arena: Arena::new() }
}

impl<'a> TestContext<'a> {
    /// Parses and builds `source`, panicking if the grammar rejects it or
    /// the builder encounters an unsupported construct.
    pub fn parse(&'a self, source: &'a str) -> Tree<'a> {
        self.try_parse(source).expect("test source should parse and build cleanly")
    }

    /// As [`Self::parse`], but surfaces parse and build failures instead
    /// of panicking.
    pub fn try_parse(&'a self, source: &'a str) -> Result<Tree<'a>, DiffError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python_orchard::LANGUAGE.into())
            .expect("bundled grammar is always loadable");
        let cst = parser.parse(source, None).ok_or_else(|| DiffError::ParseFailure {
            side: crate::error::Side::Left,
            byte_offset: 0,
            message: "parser produced no tree".to_string(),
        })?;
        if cst.root_node().has_error() {
            return Err(DiffError::ParseFailure {
                side: crate::error::Side::Left,
                byte_offset: 0,
                message: "source contains a syntax error".to_string(),
            });
        }
        tree_builder::build(&cst, source, &self.arena)
    }
}
