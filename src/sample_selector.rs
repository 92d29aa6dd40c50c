//! Picks, out of a pool of candidate samples, the one most similar to a
//! given source under a pluggable metric. Used by the enclosing feedback
//! service to find which reference solution a submission most resembles
//! before diffing against it; independent of the AST/line/token core.

use std::time::{Duration, Instant};

/// A similarity metric between two strings, higher meaning more similar.
/// No upper bound is assumed beyond "higher is closer".
pub trait Metric {
    fn similarity(&self, source: &str, sample: &str) -> f64;
}

impl<F: Fn(&str, &str) -> f64> Metric for F {
    fn similarity(&self, source: &str, sample: &str) -> f64 {
        self(source, sample)
    }
}

/// The default metric: a quick, character-sequence similarity ratio (an
/// upper-bound estimate rather than an exact edit-distance ratio, the same
/// trade-off `difflib.SequenceMatcher.quick_ratio` makes).
pub fn quick_ratio(source: &str, sample: &str) -> f64 {
    if source.is_empty() && sample.is_empty() {
        return 1.0;
    }
    similar::TextDiff::from_chars(source, sample).ratio() as f64
}

/// Scans `samples` for the one with the highest similarity to `source`
/// under `metric`, giving up early once `timeout` has elapsed and
/// returning whichever candidate was best so far.
///
/// Returns `None` if `samples` is empty.
pub fn find_closest<'s, S, M>(source: &str, samples: &'s [S], metric: M, timeout: Option<Duration>) -> Option<&'s S>
where
    S: AsRef<str>,
    M: Metric,
{
    let start = Instant::now();
    let mut best: Option<(&S, f64)> = None;

    for sample in samples {
        let score = metric.similarity(source, sample.as_ref());
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((sample, score));
        }
        if let Some(limit) = timeout {
            if start.elapsed() >= limit {
                break;
            }
        }
    }

    best.map(|(sample, _)| sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_most_similar_sample() {
        let samples = vec!["def f(a, b):\n    return a - b\n", "def f(a, b):\n    return a + b\n"];
        let closest = find_closest("def f(a, b):\n    return a + b\n", &samples, quick_ratio, None);
        assert_eq!(closest, Some(&"def f(a, b):\n    return a + b\n"));
    }

    #[test]
    fn empty_pool_has_no_closest() {
        let samples: Vec<&str> = vec![];
        assert!(find_closest("anything", &samples, quick_ratio, None).is_none());
    }

    #[test]
    fn custom_metric_is_used_verbatim() {
        let samples = vec!["aaa", "zzz"];
        let always_prefer_second = |_: &str, sample: &str| if sample == "zzz" { 1.0 } else { 0.0 };
        let closest = find_closest("anything", &samples, always_prefer_second, None);
        assert_eq!(closest, Some(&"zzz"));
    }
}
