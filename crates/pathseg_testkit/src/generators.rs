//! Property-based test generators using proptest.
//!
//! Values are drawn from small pools so generated batches share
//! subsegments and exercise deduplication.

use pathseg_codec::{IsdAsn, PathInterface, Segment};
use proptest::prelude::*;

/// Base ISD-AS of the generated pool.
pub const POOL_IA_BASE: u64 = 0x0001_ff00_0000_0110;

/// Strategy for generating ISD-AS identifiers, mostly from a small pool.
pub fn isd_asn_strategy() -> impl Strategy<Value = IsdAsn> {
    prop_oneof![
        4 => (0u64..4).prop_map(|n| IsdAsn(POOL_IA_BASE + n)),
        1 => any::<u64>().prop_map(IsdAsn),
    ]
}

/// Strategy for generating path interfaces.
pub fn path_interface_strategy() -> impl Strategy<Value = PathInterface> {
    (0u64..6, isd_asn_strategy()).prop_map(|(id, ia)| PathInterface::new(id, ia))
}

/// Strategy for generating literal segments.
pub fn literal_strategy() -> impl Strategy<Value = Segment> {
    prop::collection::vec(path_interface_strategy(), 0..4).prop_map(Segment::from_interfaces)
}

/// Strategy for generating segment trees up to four levels deep.
pub fn segment_strategy() -> impl Strategy<Value = Segment> {
    literal_strategy().prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Segment::from_segments)
    })
}

/// Strategy for generating a batch of top-level segments.
pub fn segment_list_strategy(
    min_segments: usize,
    max_segments: usize,
) -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec(segment_strategy(), min_segments..max_segments)
}

/// A receiver cache and a batch to send against it.
#[derive(Debug, Clone)]
pub struct SessionCase {
    /// Segments the receiver already holds.
    pub old: Vec<Segment>,
    /// Top-level segments to send.
    pub new: Vec<Segment>,
}

/// Strategy for generating a cache and a batch drawn from one pool, so the
/// batch repeats itself and overlaps the cache.
pub fn session_case_strategy() -> impl Strategy<Value = SessionCase> {
    prop::collection::vec(segment_strategy(), 1..8)
        .prop_flat_map(|pool| {
            let n = pool.len();
            (
                Just(pool),
                prop::collection::vec(any::<bool>(), n),
                prop::collection::vec(0..n, 0..8),
            )
        })
        .prop_map(|(pool, in_cache, picks)| {
            let old = pool
                .iter()
                .zip(&in_cache)
                .filter(|(_, &cached)| cached)
                .map(|(segment, _)| segment.clone())
                .collect();
            let new = picks.into_iter().map(|i| pool[i].clone()).collect();
            SessionCase { old, new }
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
