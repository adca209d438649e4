//! Timestamp extraction from language-model text.

use std::sync::LazyLock;

use autocut_models::RawCandidate;
use regex::Regex;

/// Smallest span accepted from a bare `start - end` pair (seconds).
pub const DEFAULT_MIN_BARE_SPAN: f64 = 30.0;

/// `[120-245]`
static BRACKETED_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)-(\d+)\]").unwrap());

/// `120 - 245` anywhere in the text
static BARE_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").unwrap());

/// Pulls raw `(start, end)` candidates out of unstructured text.
///
/// Implementations must not fail: text without recognisable timestamps yields
/// an empty list.
pub trait TimestampExtractor {
    fn extract(&self, text: &str) -> Vec<RawCandidate>;
}

impl<F> TimestampExtractor for F
where
    F: Fn(&str) -> Vec<RawCandidate>,
{
    fn extract(&self, text: &str) -> Vec<RawCandidate> {
        self(text)
    }
}

/// Regex-first extractor.
///
/// Every `[start-end]` match is returned in text order, reversed or
/// overlapping pairs included. Only when there is no bracketed pair at all
/// does it look for bare `start - end` pairs, keeping those spanning at least
/// `min_bare_span` seconds so stray digit pairs are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketedPairExtractor {
    min_bare_span: f64,
}

impl BracketedPairExtractor {
    pub fn new() -> Self {
        Self {
            min_bare_span: DEFAULT_MIN_BARE_SPAN,
        }
    }

    pub fn with_min_bare_span(mut self, min_bare_span: f64) -> Self {
        self.min_bare_span = min_bare_span;
        self
    }

    pub fn min_bare_span(&self) -> f64 {
        self.min_bare_span
    }
}

impl Default for BracketedPairExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampExtractor for BracketedPairExtractor {
    fn extract(&self, text: &str) -> Vec<RawCandidate> {
        let bracketed = capture_pairs(&BRACKETED_PAIR, text);
        if !bracketed.is_empty() {
            return bracketed;
        }

        capture_pairs(&BARE_PAIR, text)
            .into_iter()
            .filter(|c| c.span() >= self.min_bare_span)
            .collect()
    }
}

fn capture_pairs(pattern: &Regex, text: &str) -> Vec<RawCandidate> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            // Digits only, so parsing as f64 cannot fail and cannot overflow
            let start = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let end = caps.get(2)?.as_str().parse::<f64>().ok()?;
            Some(RawCandidate::new(start, end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(candidates: &[RawCandidate]) -> Vec<(f64, f64)> {
        candidates.iter().map(|c| (c.start, c.end)).collect()
    }

    #[test]
    fn test_bracketed_pairs_in_order() {
        let extractor = BracketedPairExtractor::new();
        let found = extractor.extract("blah [10-80], [90-85], [9999-10010]");
        assert_eq!(
            pairs(&found),
            vec![(10.0, 80.0), (90.0, 85.0), (9999.0, 10010.0)]
        );
    }

    #[test]
    fn test_bare_pairs_only_without_brackets() {
        let extractor = BracketedPairExtractor::new();

        // Bracketed match present: bare pairs are ignored entirely
        let found = extractor.extract("[100-200] and also 300 - 400");
        assert_eq!(pairs(&found), vec![(100.0, 200.0)]);

        let found = extractor.extract("Momento 1: 120 - 245\nMomento 2: 300-310");
        assert_eq!(pairs(&found), vec![(120.0, 245.0)]);
    }

    #[test]
    fn test_bare_pair_span_threshold() {
        let extractor = BracketedPairExtractor::new();
        assert_eq!(pairs(&extractor.extract("0 - 30")), vec![(0.0, 30.0)]);
        assert!(extractor.extract("pages 12-14").is_empty());

        let relaxed = BracketedPairExtractor::new().with_min_bare_span(1.0);
        assert_eq!(pairs(&relaxed.extract("pages 12-14")), vec![(12.0, 14.0)]);
    }

    #[test]
    fn test_no_timestamps_is_empty() {
        let extractor = BracketedPairExtractor::new();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("Desculpe, não encontrei momentos.").is_empty());
        assert!(extractor.extract("[abc-def]").is_empty());
    }

    #[test]
    fn test_huge_numbers_do_not_panic() {
        let extractor = BracketedPairExtractor::new();
        let found = extractor.extract("[99999999999999999999999-99999999999999999999999999]");
        assert_eq!(found.len(), 1);
        assert!(found[0].start.is_finite());
    }

    #[test]
    fn test_closure_extractor() {
        let fixed = |_: &str| vec![RawCandidate::new(1.0, 2.0)];
        assert_eq!(fixed.extract("anything").len(), 1);
    }
}
