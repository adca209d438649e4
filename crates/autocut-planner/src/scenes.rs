//! Candidates from scene-change boundaries.

use autocut_models::RawCandidate;

/// One candidate per boundary: each boundary to the next, and the last
/// boundary to the end of the source.
pub fn boundary_candidates(boundaries: &[f64], total_duration: f64) -> Vec<RawCandidate> {
    let ends = boundaries
        .iter()
        .skip(1)
        .copied()
        .chain(std::iter::once(total_duration));

    boundaries
        .iter()
        .zip(ends)
        .map(|(&start, end)| RawCandidate::new(start, end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_to_candidates() {
        let candidates = boundary_candidates(&[5.0, 40.0, 130.0], 200.0);
        let pairs: Vec<(f64, f64)> = candidates.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(pairs, vec![(5.0, 40.0), (40.0, 130.0), (130.0, 200.0)]);
    }

    #[test]
    fn test_single_boundary() {
        let candidates = boundary_candidates(&[12.5], 100.0);
        assert_eq!(candidates, vec![RawCandidate::new(12.5, 100.0)]);
    }

    #[test]
    fn test_no_boundaries() {
        assert!(boundary_candidates(&[], 100.0).is_empty());
    }
}
