//! The plain character/line diff strategy: a line-level pass with a
//! character-level pass nested inside replaced blocks, falling back to a
//! plain line replacement when no two lines in a replaced block are
//! similar enough to be worth diffing internally.

use similar::TextDiff;

use crate::peer_patch::PeerPatch;
use crate::settings::DiffSettings;

/// Indexes a text into lines together with their cumulative character
/// offsets, so that a (line, column) position can be mapped back to a
/// single character offset into the whole text.
struct Index<'a> {
    lines: Vec<&'a str>,
    lens: Vec<usize>,
}

impl<'a> Index<'a> {
    fn new(text: &'a str) -> Self {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let lens = lines.iter().map(|l| l.chars().count()).collect();
        Self { lines, lens }
    }

    fn map(&self, line: usize, char_offset: usize) -> usize {
        self.lens[..line].iter().sum::<usize>() + char_offset
    }

    fn line_start(&self, line: usize) -> usize {
        self.map(line, 0)
    }

    fn line_end(&self, line: usize) -> usize {
        self.map(line, self.lens[line])
    }

    fn subtext(&self, start: usize, end: usize) -> String {
        self.lines[start..end].concat()
    }
}

/// Computes the patches transforming `source` into `target`.
pub fn diff(source: &str, target: &str, settings: &DiffSettings) -> Vec<PeerPatch> {
    let src = Index::new(source);
    let tgt = Index::new(target);
    let mut patches = Vec::new();

    let line_diff = TextDiff::from_lines(source, target);
    for op in line_diff.ops() {
        match *op {
            similar::DiffOp::Equal { .. } => {}
            similar::DiffOp::Delete {
                old_index, old_len, ..
            } => patches.push(PeerPatch::Delete {
                start: src.line_start(old_index),
                stop: src.line_end(old_index + old_len - 1),
            }),
            similar::DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => patches.push(PeerPatch::Insert {
                pos: src.line_start(old_index),
                text: tgt.subtext(new_index, new_index + new_len),
            }),
            similar::DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => replace_with_matches(
                &src,
                (old_index, old_index + old_len),
                &tgt,
                (new_index, new_index + new_len),
                settings,
                &mut patches,
            ),
        }
    }
    patches
}

fn char_ratio(a: &str, b: &str) -> f64 {
    TextDiff::from_chars(a, b).ratio() as f64
}

/// Searches the replaced block for the pair of lines most similar to each
/// other; diffs that pair at the character level and recurses on the
/// surrounding sub-blocks. Falls back to a plain line replacement if
/// nothing in the block clears `settings.line_similarity_cutoff`.
fn replace_with_matches(
    src: &Index<'_>,
    src_bounds: (usize, usize),
    tgt: &Index<'_>,
    tgt_bounds: (usize, usize),
    settings: &DiffSettings,
    patches: &mut Vec<PeerPatch>,
) {
    let (src_start, src_end) = src_bounds;
    let (tgt_start, tgt_end) = tgt_bounds;

    let mut equal: Option<(usize, usize)> = None;
    let mut best = (settings.line_similarity_cutoff - 0.01, None::<(usize, usize)>);

    for j in tgt_start..tgt_end {
        let tgt_line = tgt.lines[j];
        for i in src_start..src_end {
            let src_line = src.lines[i];
            if src_line == tgt_line {
                equal.get_or_insert((i, j));
                continue;
            }
            let ratio = char_ratio(src_line, tgt_line);
            if ratio > best.0 {
                best = (ratio, Some((i, j)));
            }
        }
    }

    let (ratio, pair) = best;
    let (src_best, tgt_best, treat_as_identical) = if ratio < settings.line_similarity_cutoff {
        match equal {
            Some((i, j)) => (i, j, true),
            None => {
                patches.push(PeerPatch::Replace {
                    start: src.line_start(src_start),
                    stop: src.line_end(src_end - 1),
                    text: tgt.subtext(tgt_start, tgt_end),
                });
                return;
            }
        }
    } else {
        let (i, j) = pair.expect("ratio above cutoff implies a candidate pair was recorded");
        (i, j, false)
    };

    replace_auto(src, (src_start, src_best), tgt, (tgt_start, tgt_best), settings, patches);

    if !treat_as_identical {
        let src_close = src.lines[src_best];
        let tgt_close = tgt.lines[tgt_best];
        for op in TextDiff::from_chars(src_close, tgt_close).ops() {
            match *op {
                similar::DiffOp::Equal { .. } => {}
                similar::DiffOp::Delete {
                    old_index, old_len, ..
                } => patches.push(PeerPatch::Delete {
                    start: src.map(src_best, old_index),
                    stop: src.map(src_best, old_index + old_len),
                }),
                similar::DiffOp::Insert {
                    old_index,
                    new_index,
                    new_len,
                } => patches.push(PeerPatch::Insert {
                    pos: src.map(src_best, old_index),
                    text: tgt_close.chars().skip(new_index).take(new_len).collect(),
                }),
                similar::DiffOp::Replace {
                    old_index,
                    old_len,
                    new_index,
                    new_len,
                } => patches.push(PeerPatch::Replace {
                    start: src.map(src_best, old_index),
                    stop: src.map(src_best, old_index + old_len),
                    text: tgt_close.chars().skip(new_index).take(new_len).collect(),
                }),
            }
        }
    }

    replace_auto(
        src,
        (src_best + 1, src_end),
        tgt,
        (tgt_best + 1, tgt_end),
        settings,
        patches,
    );
}

fn replace_auto(
    src: &Index<'_>,
    src_bounds: (usize, usize),
    tgt: &Index<'_>,
    tgt_bounds: (usize, usize),
    settings: &DiffSettings,
    patches: &mut Vec<PeerPatch>,
) {
    let (src_start, src_end) = src_bounds;
    let (tgt_start, tgt_end) = tgt_bounds;
    if src_start < src_end {
        if tgt_start < tgt_end {
            replace_with_matches(src, src_bounds, tgt, tgt_bounds, settings, patches);
        } else {
            patches.push(PeerPatch::Delete {
                start: src.line_start(src_start),
                stop: src.line_end(src_end - 1),
            });
        }
    } else if tgt_start < tgt_end {
        patches.push(PeerPatch::Insert {
            pos: src.line_start(src_start),
            text: tgt.subtext(tgt_start, tgt_end),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_produce_no_patches() {
        let settings = DiffSettings::default();
        let text = "a\nb\nc\n";
        assert!(diff(text, text, &settings).is_empty());
    }

    #[test]
    fn appended_line_is_an_insert() {
        let settings = DiffSettings::default();
        let patches = diff("a\nb\n", "a\nb\nc\n", &settings);
        assert!(matches!(patches.as_slice(), [PeerPatch::Insert { .. }]));
    }

    #[test]
    fn similar_replaced_line_is_diffed_at_char_level() {
        let settings = DiffSettings::default();
        let patches = diff("hello world\n", "hello there\n", &settings);
        assert!(!patches.is_empty());
        let total: usize = patches.iter().map(PeerPatch::size).sum();
        assert!(total < "hello there\n".chars().count());
    }

    #[test]
    fn unrelated_replaced_line_falls_back_to_plain_replace() {
        let settings = DiffSettings::default();
        let patches = diff("x\n", "completely different content here\n", &settings);
        assert!(matches!(patches.as_slice(), [PeerPatch::Replace { .. }]));
    }
}
