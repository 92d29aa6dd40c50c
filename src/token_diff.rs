//! The lexical token diff strategy: both sources are reduced to their
//! stream of meaningful tokens (comments dropped), and the two streams are
//! diffed as sequences of `(kind, text)` pairs rather than of characters.
//! This catches renames and reorderings that a line diff would report as a
//! wholesale replacement, at the cost of ignoring how the tokens are laid
//! out on the page.

use similar::{capture_diff_slices, Algorithm, DiffOp};
use tree_sitter::Parser;

use crate::error::{DiffError, Side};
use crate::peer_patch::PeerPatch;

/// A token reduced to what matters for comparison: its grammar kind and
/// its literal text. Two tokens are equal iff both agree, regardless of
/// where in the source they occur; `start_byte`/`end_byte` are carried as
/// positional metadata for rendering patches, not as part of the key.
#[derive(Debug, Clone)]
struct ComparableToken {
    kind: String,
    text: String,
    start_byte: usize,
    end_byte: usize,
}

impl PartialEq for ComparableToken {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}
impl Eq for ComparableToken {}

impl std::hash::Hash for ComparableToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.text.hash(state);
    }
}

fn is_junk(kind: &str) -> bool {
    kind == "comment"
}

fn tokens_of(source: &str) -> Result<Vec<ComparableToken>, DiffError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python_orchard::LANGUAGE.into())
        .expect("bundled grammar is always loadable");
    let tree = parser.parse(source, None).ok_or_else(|| DiffError::ParseFailure {
        side: Side::Left,
        byte_offset: 0,
        message: "parser produced no tree".to_string(),
    })?;

    let mut tokens = Vec::new();
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        if node.child_count() == 0 {
            if !is_junk(node.kind()) && !node.byte_range().is_empty() {
                tokens.push(ComparableToken {
                    kind: node.kind().to_string(),
                    text: source[node.byte_range()].to_string(),
                    start_byte: node.start_byte(),
                    end_byte: node.end_byte(),
                });
            }
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return Ok(tokens);
            }
        }
    }
}

/// Computes the patches transforming `source`'s token stream into
/// `target`'s.
pub fn diff(source: &str, target: &str) -> Result<Vec<PeerPatch>, DiffError> {
    let src_tokens = tokens_of(source)?;
    let tgt_tokens = tokens_of(target)?;
    let src_len = src_tokens.len();

    let ops = capture_diff_slices(Algorithm::Myers, &src_tokens, &tgt_tokens);
    let mut patches = Vec::new();

    for op in ops {
        let (old_index, old_len, new_index, new_len) = match op {
            DiffOp::Equal { .. } => continue,
            DiffOp::Delete {
                old_index, old_len, ..
            } => (old_index, old_len, 0, 0),
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => (old_index, 0, new_index, new_len),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => (old_index, old_len, new_index, new_len),
        };

        let src_start = if old_index == src_len {
            src_tokens.last().map_or(0, |t| t.end_byte)
        } else {
            src_tokens[old_index].start_byte
        };

        match op {
            DiffOp::Delete { .. } => {
                let src_end = src_tokens[old_index + old_len - 1].end_byte;
                patches.push(PeerPatch::Delete {
                    start: src_start,
                    stop: src_end,
                });
            }
            DiffOp::Insert { .. } => {
                let tgt_start = tgt_tokens[new_index].start_byte;
                let tgt_end = tgt_tokens[new_index + new_len - 1].end_byte;
                patches.push(PeerPatch::Insert {
                    pos: src_start,
                    text: target[tgt_start..tgt_end].to_string(),
                });
            }
            DiffOp::Replace { .. } => {
                let src_end = src_tokens[old_index + old_len - 1].end_byte;
                let tgt_start = tgt_tokens[new_index].start_byte;
                let tgt_end = tgt_tokens[new_index + new_len - 1].end_byte;
                patches.push(PeerPatch::Replace {
                    start: src_start,
                    stop: src_end,
                    text: target[tgt_start..tgt_end].to_string(),
                });
            }
            DiffOp::Equal { .. } => unreachable!("filtered above"),
        }
    }

    Ok(patches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sources_produce_no_patches() {
        let patches = diff("a = 1\n", "a = 1\n").expect("parses");
        assert!(patches.is_empty());
    }

    #[test]
    fn renaming_a_call_is_a_single_replace() {
        let patches = diff("foo(1)\n", "bar(1)\n").expect("parses");
        assert_eq!(patches.len(), 1);
        assert!(matches!(patches[0], PeerPatch::Replace { .. }));
    }

    #[test]
    fn comments_are_ignored() {
        let patches = diff("a = 1  # note\n", "a = 1  # a different note\n").expect("parses");
        assert!(patches.is_empty());
    }

    #[test]
    fn a_shared_tail_matches_despite_its_offset_shifting() {
        let patches = diff("b = 2\n", "a = 1\nb = 2\n").expect("parses");
        assert!(
            !patches.is_empty() && patches.iter().all(|p| matches!(p, PeerPatch::Insert { .. })),
            "expected only inserts (the shared `b = 2` tail should match despite its shifted offset), got: {patches:?}"
        );
    }

    #[test]
    fn appended_statement_is_an_insert() {
        let patches = diff("a = 1\n", "a = 1\nb = 2\n").expect("parses");
        assert!(patches.iter().any(|p| matches!(p, PeerPatch::Insert { .. })));
    }
}
