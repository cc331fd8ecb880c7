//! Segment model and content fingerprints.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{CodecError, CodecResult};
use crate::interface::PathInterface;

/// Fingerprint preimage tag for literals.
const LITERAL_TAG: u8 = b'L';

/// Fingerprint preimage tag for compositions.
const COMPOSITION_TAG: u8 = b'C';

/// A path segment: either a concrete hop sequence or an ordered
/// composition of child segments.
///
/// Children are reference counted, so cloning a segment only copies its
/// direct child list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Leaf segment holding interfaces in hop order.
    Literal {
        /// Hop sequence.
        interfaces: Vec<PathInterface>,
    },
    /// Internal node composing child segments in order.
    Composition {
        /// Child segments.
        segments: Vec<Arc<Segment>>,
    },
}

/// Wire discriminant of a [`Segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// A [`Segment::Literal`].
    Literal,
    /// A [`Segment::Composition`].
    Composition,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal => f.write_str("literal"),
            Self::Composition => f.write_str("composition"),
        }
    }
}

impl Segment {
    /// Builds a literal from a hop sequence.
    pub fn from_interfaces(interfaces: impl IntoIterator<Item = PathInterface>) -> Self {
        Self::Literal {
            interfaces: interfaces.into_iter().collect(),
        }
    }

    /// Builds a composition from child segments.
    ///
    /// A single child is allowed and yields a wrapper composition.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self::Composition {
            segments: segments.into_iter().map(Arc::new).collect(),
        }
    }

    /// Builds a composition from already shared children.
    pub fn from_shared(segments: impl IntoIterator<Item = Arc<Segment>>) -> Self {
        Self::Composition {
            segments: segments.into_iter().collect(),
        }
    }

    /// Returns the wire discriminant.
    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Literal { .. } => SegmentKind::Literal,
            Self::Composition { .. } => SegmentKind::Composition,
        }
    }

    /// Returns true for a literal.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// Returns true for a composition.
    #[must_use]
    pub fn is_composition(&self) -> bool {
        matches!(self, Self::Composition { .. })
    }

    /// Number of interfaces (literal) or direct children (composition).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Literal { interfaces } => interfaces.len(),
            Self::Composition { segments } => segments.len(),
        }
    }

    /// Returns true if the segment has no interfaces or children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct children of a composition; empty for a literal.
    #[must_use]
    pub fn subsegments(&self) -> &[Arc<Segment>] {
        match self {
            Self::Literal { .. } => &[],
            Self::Composition { segments } => segments,
        }
    }

    /// Computes the content fingerprint.
    ///
    /// Equal structure and content always give equal fingerprints. Children
    /// shared through the same `Arc` are hashed once.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        FingerprintMemo::new().fingerprint(self)
    }
}

impl Drop for Segment {
    // Unlinks uniquely owned children onto a local stack so deep trees do
    // not recurse once per level.
    fn drop(&mut self) {
        let Self::Composition { segments } = self else {
            return;
        };
        let mut pending = std::mem::take(segments);
        while let Some(child) = pending.pop() {
            if let Ok(mut owned) = Arc::try_unwrap(child) {
                if let Self::Composition { segments } = &mut owned {
                    pending.append(segments);
                }
            }
        }
    }
}

/// Fingerprints keyed by segment address.
///
/// Entries stay valid because every key is borrowed for `'a`.
#[derive(Debug, Default)]
pub(crate) struct FingerprintMemo<'a> {
    known: HashMap<*const Segment, Fingerprint>,
    _borrowed: PhantomData<&'a Segment>,
}

impl<'a> FingerprintMemo<'a> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Post-order walk over an explicit stack; each distinct node is
    /// hashed once.
    pub(crate) fn fingerprint(&mut self, root: &'a Segment) -> Fingerprint {
        if let Some(fingerprint) = self.known.get(&address(root)) {
            return *fingerprint;
        }

        let mut pending: Vec<(&'a Segment, bool)> = root
            .subsegments()
            .iter()
            .map(|child| (child.as_ref(), false))
            .collect();
        while let Some((segment, expanded)) = pending.pop() {
            if self.known.contains_key(&address(segment)) {
                continue;
            }
            if expanded {
                let fingerprint = self.hash_node(segment);
                self.known.insert(address(segment), fingerprint);
                continue;
            }
            pending.push((segment, true));
            for child in segment.subsegments() {
                if !self.known.contains_key(&address(child)) {
                    pending.push((child.as_ref(), false));
                }
            }
        }

        let fingerprint = self.hash_node(root);
        self.known.insert(address(root), fingerprint);
        fingerprint
    }

    /// Hashes one node. Children are normally memoized already.
    fn hash_node(&mut self, segment: &'a Segment) -> Fingerprint {
        let mut hasher = Sha256::new();
        match segment {
            Segment::Literal { interfaces } => {
                hasher.update([LITERAL_TAG]);
                hasher.update((interfaces.len() as u32).to_be_bytes());
                for iface in interfaces {
                    hasher.update(iface.to_bytes());
                }
            }
            Segment::Composition { segments } => {
                hasher.update([COMPOSITION_TAG]);
                hasher.update((segments.len() as u32).to_be_bytes());
                for child in segments {
                    let cached = self.known.get(&address(child)).copied();
                    let child_fingerprint = match cached {
                        Some(known) => known,
                        None => self.fingerprint(child),
                    };
                    hasher.update(child_fingerprint.as_bytes());
                }
            }
        }
        Fingerprint(hasher.finalize().into())
    }
}

/// Composition heights keyed by segment address, bounded by a nesting
/// limit.
///
/// Recursion stops at the limit, so the walk never goes deeper than
/// `max_depth` frames.
#[derive(Debug)]
pub(crate) struct NestingGuard<'a> {
    heights: HashMap<*const Segment, usize>,
    max_depth: usize,
    _borrowed: PhantomData<&'a Segment>,
}

impl<'a> NestingGuard<'a> {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            heights: HashMap::new(),
            max_depth,
            _borrowed: PhantomData,
        }
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the height of `segment`: 0 for a literal or an empty
    /// composition, else one more than its tallest child.
    ///
    /// # Errors
    ///
    /// [`CodecError::NestingTooDeep`] if the height exceeds the limit.
    pub(crate) fn height(&mut self, segment: &'a Segment) -> CodecResult<usize> {
        self.height_at(segment, 0)
    }

    fn height_at(&mut self, segment: &'a Segment, depth: usize) -> CodecResult<usize> {
        let children = segment.subsegments();
        if children.is_empty() {
            return Ok(0);
        }

        let height = match self.heights.get(&address(segment)) {
            Some(&height) => height,
            None => {
                if depth >= self.max_depth {
                    return Err(self.too_deep());
                }
                let mut height = 0;
                for child in children {
                    height = height.max(self.height_at(child, depth + 1)? + 1);
                }
                self.heights.insert(address(segment), height);
                height
            }
        };

        if depth + height > self.max_depth {
            return Err(self.too_deep());
        }
        Ok(height)
    }

    pub(crate) fn too_deep(&self) -> CodecError {
        CodecError::NestingTooDeep {
            max_depth: self.max_depth,
        }
    }
}

fn address(segment: &Segment) -> *const Segment {
    segment
}

/// SHA-256 content identity of a [`Segment`].
///
/// Displays and serializes as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Creates a fingerprint from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

/// Error parsing a hex fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint hex: {0}")]
pub struct ParseFingerprintError(String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(ParseFingerprintError(s.to_string()));
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseFingerprintError(s.to_string()))?;
        }
        Ok(Self(out))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::IsdAsn;

    fn hop(id: u64, ia: u64) -> PathInterface {
        PathInterface::new(id, IsdAsn(ia))
    }

    #[test]
    fn equal_content_equal_fingerprint() {
        let a = Segment::from_interfaces([hop(1, 10), hop(2, 20)]);
        let b = Segment::from_interfaces([hop(1, 10), hop(2, 20)]);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let ca = Segment::from_segments([a.clone(), b.clone()]);
        let cb = Segment::from_segments([b, a]);
        assert_eq!(ca.fingerprint(), cb.fingerprint());
    }

    #[test]
    fn order_matters() {
        let a = Segment::from_interfaces([hop(1, 10), hop(2, 20)]);
        let b = Segment::from_interfaces([hop(2, 20), hop(1, 10)]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn wrapper_differs_from_wrapped() {
        let lit = Segment::from_interfaces([hop(1, 10)]);
        let wrapper = Segment::from_segments([lit.clone()]);
        assert_ne!(lit.fingerprint(), wrapper.fingerprint());
        assert_ne!(
            wrapper.fingerprint(),
            Segment::from_segments([wrapper.clone()]).fingerprint()
        );
    }

    #[test]
    fn empty_literal_and_empty_composition_differ() {
        let lit = Segment::from_interfaces([]);
        let comp = Segment::from_segments([]);
        assert_ne!(lit.fingerprint(), comp.fingerprint());
    }

    #[test]
    fn fingerprint_is_stable() {
        // Pinned so persisted caches keep matching across releases.
        let empty = Segment::from_interfaces([]);
        let expected = {
            let mut h = Sha256::new();
            h.update([b'L', 0, 0, 0, 0]);
            Fingerprint(h.finalize().into())
        };
        assert_eq!(empty.fingerprint(), expected);
    }

    #[test]
    fn shared_children_hash_like_copies() {
        let leaf = Arc::new(Segment::from_interfaces([hop(1, 10)]));
        let shared = Segment::from_shared([leaf.clone(), leaf]);
        let copied = Segment::from_segments([
            Segment::from_interfaces([hop(1, 10)]),
            Segment::from_interfaces([hop(1, 10)]),
        ]);
        assert_eq!(shared.fingerprint(), copied.fingerprint());
    }

    #[test]
    fn deep_shared_chain_fingerprints_quickly() {
        // Each level references the previous one twice: 2^200 paths.
        let mut current = Arc::new(Segment::from_interfaces([hop(1, 1)]));
        for _ in 0..200 {
            current = Arc::new(Segment::from_shared([current.clone(), current]));
        }
        let first = current.fingerprint();
        assert_eq!(first, current.fingerprint());
    }

    #[test]
    fn composition_preimage_uses_child_fingerprints() {
        let lit = Segment::from_interfaces([hop(1, 10)]);
        let wrapper = Segment::from_segments([lit.clone()]);
        let expected = {
            let mut h = Sha256::new();
            h.update([b'C', 0, 0, 0, 1]);
            h.update(lit.fingerprint().as_bytes());
            Fingerprint(h.finalize().into())
        };
        assert_eq!(wrapper.fingerprint(), expected);
    }

    fn chain(levels: usize) -> Segment {
        let mut current = Segment::from_interfaces([hop(1, 1)]);
        for _ in 0..levels {
            current = Segment::from_segments([current]);
        }
        current
    }

    #[test]
    fn very_deep_chain_fingerprints_and_drops() {
        let deep = chain(200_000);
        let first = deep.fingerprint();
        assert_eq!(first, deep.fingerprint());
        assert_ne!(first, chain(199_999).fingerprint());
        drop(deep);
    }

    #[test]
    fn drop_keeps_shared_children_alive() {
        let leaf = Arc::new(Segment::from_interfaces([hop(1, 1)]));
        let parent = Segment::from_shared([leaf.clone(), leaf.clone()]);
        assert_eq!(Arc::strong_count(&leaf), 3);
        drop(parent);
        assert_eq!(Arc::strong_count(&leaf), 1);
        assert!(leaf.is_literal());
    }

    #[test]
    fn nesting_guard_bounds_height() {
        let three = chain(3);
        let empty = Segment::from_segments([]);
        let mut guard = NestingGuard::new(3);
        assert_eq!(guard.height(&three), Ok(3));
        assert_eq!(guard.height(&empty), Ok(0));

        let four = chain(4);
        assert_eq!(
            NestingGuard::new(3).height(&four),
            Err(CodecError::NestingTooDeep { max_depth: 3 })
        );

        // Bounded walk: a chain far past the limit fails without recursing
        // through it.
        let deep = chain(100_000);
        assert!(NestingGuard::new(64).height(&deep).is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let fp = Segment::from_interfaces([hop(5, 6)]).fingerprint();
        let hex = fp.to_string();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex.parse::<Fingerprint>().unwrap(), fp);
        assert!("zz".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn accessors() {
        let lit = Segment::from_interfaces([hop(1, 1), hop(2, 2)]);
        assert!(lit.is_literal());
        assert_eq!(lit.len(), 2);
        assert!(lit.subsegments().is_empty());

        let comp = Segment::from_segments([lit.clone()]);
        assert!(comp.is_composition());
        assert_eq!(comp.kind(), SegmentKind::Composition);
        assert_eq!(comp.subsegments()[0].as_ref(), &lit);
    }

    #[test]
    fn serde_json_shape() {
        let seg = Segment::from_segments([Segment::from_interfaces([hop(1, 2)])]);
        let json = serde_json::to_string(&seg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"composition","segments":[{"type":"literal","interfaces":[{"id":1,"ia":2}]}]}"#
        );
        let back: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seg);
    }
}
