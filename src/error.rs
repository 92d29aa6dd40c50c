use thiserror::Error;

/// Everything that can go wrong while comparing two sources.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The parser rejected one of the two sources outright.
    #[error("failed to parse {side} source at byte {byte_offset}: {message}")]
    ParseFailure {
        side: Side,
        byte_offset: usize,
        message: String,
    },

    /// The tree builder ran into a grammar node it doesn't know how to
    /// normalize. This is a programmer-error signal (missing grammar
    /// coverage), not something a caller can recover from.
    #[error("unsupported grammar node {kind:?} at byte {byte_offset}")]
    UnsupportedNode { kind: String, byte_offset: usize },

    /// The caller asked for a strategy name that doesn't exist.
    #[error("unknown diff strategy {name:?}")]
    InvalidSelection { name: String },
}

/// Which of the two input sources an error pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}
