//! Append-only fingerprint index used by the encoder.

use std::collections::HashMap;

use crate::error::{CodecError, CodecResult};
use crate::segment::{Fingerprint, FingerprintMemo, Segment};

/// Maps fingerprints to positions in the combined cache + message index
/// space.
///
/// Indices are handed out strictly in emission order and never reassigned.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    by_fingerprint: HashMap<Fingerprint, u16>,
    next: usize,
}

impl SegmentIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the index with the receiver's cached segments at positions
    /// `0..old.len()`.
    ///
    /// A fingerprint appearing more than once keeps its last position.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::IndexOverflow`] if the cache does not fit the
    /// 16-bit index space.
    pub fn from_old(old: &[Segment]) -> CodecResult<Self> {
        Self::from_old_with(old, &mut FingerprintMemo::new())
    }

    pub(crate) fn from_old_with<'a>(
        old: &'a [Segment],
        memo: &mut FingerprintMemo<'a>,
    ) -> CodecResult<Self> {
        let mut index = Self::new();
        for segment in old {
            index.assign(memo.fingerprint(segment))?;
        }
        Ok(index)
    }

    /// Looks up the index of a fingerprint.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<u16> {
        self.by_fingerprint.get(fingerprint).copied()
    }

    /// Returns true if the fingerprint has an index.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.by_fingerprint.contains_key(fingerprint)
    }

    /// Registers `fingerprint` at the next index and returns that index.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::IndexOverflow`] once the index space is used up.
    pub fn assign(&mut self, fingerprint: Fingerprint) -> CodecResult<u16> {
        let idx = self.reserve()?;
        self.by_fingerprint.insert(fingerprint, idx);
        Ok(idx)
    }

    /// Consumes the next index without registering a fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::IndexOverflow`] once the index space is used up.
    pub fn reserve(&mut self) -> CodecResult<u16> {
        let idx = u16::try_from(self.next)
            .map_err(|_| CodecError::IndexOverflow { index: self.next })?;
        self.next += 1;
        Ok(idx)
    }

    /// The index the next segment will receive.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Number of registered fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_fingerprint.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_fingerprint.is_empty()
    }
}
