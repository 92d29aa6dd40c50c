//! The patch model shared by the two non-AST comparison strategies
//! ([`crate::line_diff`] and [`crate::token_diff`]). Both work over
//! character offsets into the left (source) text rather than over the
//! uniform tree model, so they share one small, independent patch type
//! instead of reusing [`crate::patch::Patch`].

/// One edit over a character range of the left source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerPatch {
    /// Cuts chars in range `[start, stop)`.
    Delete { start: usize, stop: usize },
    /// Inserts `text` starting from position `pos` (before the character
    /// currently at that position).
    Insert { pos: usize, text: String },
    /// Replaces chars in range `[start, stop)` with `text`.
    Replace {
        start: usize,
        stop: usize,
        text: String,
    },
}

impl std::fmt::Display for PeerPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delete { start, stop } => {
                if start + 1 == *stop {
                    write!(f, "Delete char #{start}")
                } else {
                    write!(f, "Delete chars #{start} - #{}", stop - 1)
                }
            }
            Self::Insert { pos, text } => write!(f, "Insert {text:?} starting from position #{pos}"),
            Self::Replace { start, stop, text } => {
                if start + 1 == *stop {
                    write!(f, "Replace char #{start} with {text:?}")
                } else {
                    write!(f, "Replace chars #{start} - #{} with {text:?}", stop - 1)
                }
            }
        }
    }
}

impl PeerPatch {
    /// The approximate number of characters affected.
    pub fn size(&self) -> usize {
        match self {
            Self::Delete { start, stop } => stop - start,
            Self::Insert { text, .. } => text.chars().count(),
            Self::Replace { start, stop, text } => (stop - start) + text.chars().count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_describes_single_char() {
        let patch = PeerPatch::Delete { start: 3, stop: 4 };
        assert_eq!(patch.to_string(), "Delete char #3");
    }

    #[test]
    fn delete_describes_range() {
        let patch = PeerPatch::Delete { start: 3, stop: 6 };
        assert_eq!(patch.to_string(), "Delete chars #3 - #5");
    }

    #[test]
    fn insert_size_is_char_count() {
        let patch = PeerPatch::Insert {
            pos: 0,
            text: "abc".to_string(),
        };
        assert_eq!(patch.size(), 3);
    }
}
