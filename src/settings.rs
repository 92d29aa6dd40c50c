//! Knobs shared by the non-AST comparison strategies and the sample
//! selector. The AST core itself (§4.1–4.3 of the crate documentation) is
//! pure and configuration-free; these settings only affect its peers.

/// Tunables for [`crate::line_diff`] and [`crate::sample_selector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffSettings {
    /// Minimum char-sequence similarity ratio for two lines in a replaced
    /// block to be worth diffing internally rather than treated as an
    /// unrelated pair.
    pub line_similarity_cutoff: f64,
    /// Maximum time, in seconds, [`crate::strategy::closest_sample`] spends
    /// scanning a sample pool before returning the best candidate found so
    /// far. `None` means no limit.
    pub selection_timeout: Option<f64>,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            line_similarity_cutoff: 0.75,
            selection_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cutoff_matches_documented_value() {
        assert_eq!(DiffSettings::default().line_similarity_cutoff, 0.75);
    }
}
