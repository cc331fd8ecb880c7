//! Segment fixtures shared by the pathseg benchmarks.

use pathseg_codec::{IsdAsn, PathInterface, Segment};

/// ISD-AS used for every fixture hop.
pub const BENCH_IA: IsdAsn = IsdAsn(0x0001_ff00_0000_0110);

/// A literal with `hops` interfaces, ids starting at `first`.
pub fn literal(first: u64, hops: usize) -> Segment {
    Segment::from_interfaces((0..hops as u64).map(|i| PathInterface::new(first + i, BENCH_IA)))
}

/// `count` distinct literals of `hops` interfaces each.
pub fn flat_segments(count: usize, hops: usize) -> Vec<Segment> {
    (0..count)
        .map(|i| literal((i * hops) as u64, hops))
        .collect()
}

/// A complete composition tree of the given depth and fan-out with distinct
/// literal leaves.
pub fn nested_segment(depth: usize, width: usize) -> Segment {
    fn build(depth: usize, width: usize, next: &mut u64) -> Segment {
        if depth == 0 {
            *next += 1;
            return literal(*next * 4, 4);
        }
        Segment::from_segments((0..width).map(|_| build(depth - 1, width, next)))
    }
    build(depth, width, &mut 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathseg_codec::recursive_subsegments;

    #[test]
    fn nested_leaves_are_distinct() {
        let tree = nested_segment(2, 3);
        let subs = recursive_subsegments(&tree);
        // 3 inner compositions + 9 leaves.
        assert_eq!(subs.len(), 12);
        let mut fingerprints: Vec<_> = subs.iter().map(Segment::fingerprint).collect();
        fingerprints.sort();
        fingerprints.dedup();
        assert_eq!(fingerprints.len(), 12);
    }

    #[test]
    fn flat_segments_are_distinct() {
        let segments = flat_segments(8, 3);
        assert_eq!(segments.len(), 8);
        assert_ne!(segments[0].fingerprint(), segments[1].fingerprint());
    }
}
