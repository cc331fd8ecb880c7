//! Segment message encoder.

use bytes::BufMut;
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::header::{
    MessageHeader, RecordFlags, HEADER_LEN, RECORD_HEADER_LEN, SUBSEGMENT_REF_LEN,
};
use crate::index::SegmentIndex;
use crate::interface::{encode_interfaces, IsdAsn, INTERFACE_LEN};
use crate::segment::{FingerprintMemo, NestingGuard, Segment, SegmentKind};

/// Output of [`encode_segments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    /// The wire bytes.
    pub bytes: Vec<u8>,
    /// Segments represented by the emitted records, in record order.
    pub sent_segments: Vec<Segment>,
}

/// Encode top-level segments against the receiver's cache.
///
/// See [`SegmentEncoder::encode`].
///
/// # Errors
///
/// Fails only on input that cannot be represented on the wire.
pub fn encode_segments(
    new: &[Segment],
    old: &[Segment],
    src_ia: IsdAsn,
    dst_ia: IsdAsn,
) -> CodecResult<EncodedMessage> {
    SegmentEncoder::new(old).encode(new, src_ia, dst_ia)
}

/// Encoder for segment messages bound to one receiver cache snapshot.
pub struct SegmentEncoder<'a> {
    old: &'a [Segment],
    config: CodecConfig,
}

impl<'a> SegmentEncoder<'a> {
    /// Create an encoder for a receiver holding `old`.
    pub fn new(old: &'a [Segment]) -> Self {
        Self {
            old,
            config: CodecConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Encode `new` as accepted top-level segments.
    ///
    /// Subsegments the receiver cannot resolve are emitted first as
    /// unaccepted records, in post-order. A top-level segment the receiver
    /// already knows, from its cache or from an earlier record, is
    /// re-announced as a single-child wrapper composition so every
    /// top-level input consumes exactly one index.
    ///
    /// # Errors
    ///
    /// - [`CodecError::NestingTooDeep`] if a segment nests past the limit
    /// - [`CodecError::SegmentTooLong`] if a segment has more than 255 entries
    /// - [`CodecError::IndexOverflow`] if the index space runs out
    pub fn encode(
        &self,
        new: &[Segment],
        src_ia: IsdAsn,
        dst_ia: IsdAsn,
    ) -> CodecResult<EncodedMessage> {
        let mut state = EncodeState::new(self.old, &self.config)?;
        state.bytes.reserve(HEADER_LEN + new.len() * RECORD_HEADER_LEN);
        MessageHeader::new(0, src_ia, dst_ia).write_to(&mut state.bytes);

        for segment in new {
            state.push_top_level(segment)?;
        }

        let EncodeState {
            index,
            mut bytes,
            sent,
            ..
        } = state;
        let numsegs = u16::try_from(index.next_index()).map_err(|_| CodecError::IndexOverflow {
            index: index.next_index(),
        })?;
        bytes[2..4].copy_from_slice(&numsegs.to_be_bytes());

        debug!(
            cached = self.old.len(),
            records = sent.len(),
            accepted = new.len(),
            numsegs,
            len = bytes.len(),
            "encoded segment message"
        );

        Ok(EncodedMessage {
            bytes,
            sent_segments: sent,
        })
    }
}

/// Working state of one encode call.
///
/// Fingerprints and nesting heights are memoized by address, so a subtree
/// shared through `Arc` is walked once however often it is referenced.
struct EncodeState<'a> {
    index: SegmentIndex,
    memo: FingerprintMemo<'a>,
    nesting: NestingGuard<'a>,
    bytes: Vec<u8>,
    sent: Vec<Segment>,
}

impl<'a> EncodeState<'a> {
    fn new(old: &'a [Segment], config: &CodecConfig) -> CodecResult<Self> {
        let mut memo = FingerprintMemo::new();
        let index = SegmentIndex::from_old_with(old, &mut memo)?;
        Ok(Self {
            index,
            memo,
            nesting: NestingGuard::new(config.max_nesting_depth),
            bytes: Vec::new(),
            sent: Vec::new(),
        })
    }

    fn push_top_level(&mut self, segment: &'a Segment) -> CodecResult<()> {
        let height = self.nesting.height(segment)?;

        let fingerprint = self.memo.fingerprint(segment);
        if let Some(known) = self.index.get(&fingerprint) {
            // The wrapper adds one level on the receiving side.
            if height >= self.nesting.max_depth() {
                return Err(self.nesting.too_deep());
            }
            let idx = self.index.reserve()?;
            trace!(idx, known, %fingerprint, "re-announcing known segment");
            write_wrapper_record(&mut self.bytes, known);
            self.sent.push(Segment::from_segments([segment.clone()]));
        } else {
            self.introduce_subsegments(segment)?;
            let idx = self.index.assign(fingerprint)?;
            trace!(idx, kind = %segment.kind(), "encoding accepted segment");
            write_record(&mut self.bytes, segment, true, &self.index, &mut self.memo)?;
            self.sent.push(segment.clone());
        }
        Ok(())
    }

    /// Emits every not-yet-indexed proper subsegment of `segment` in
    /// post-order. An indexed child is referenced as-is, so its own subtree
    /// is not walked.
    fn introduce_subsegments(&mut self, segment: &'a Segment) -> CodecResult<()> {
        for child in segment.subsegments() {
            let child: &'a Segment = child;
            let fingerprint = self.memo.fingerprint(child);
            if self.index.contains(&fingerprint) {
                continue;
            }
            self.introduce_subsegments(child)?;
            let idx = self.index.assign(fingerprint)?;
            trace!(idx, kind = %child.kind(), "encoding subsegment");
            write_record(&mut self.bytes, child, false, &self.index, &mut self.memo)?;
            self.sent.push(child.clone());
        }
        Ok(())
    }
}

/// Serialize a single segment record.
///
/// Composition children are written as their indices in `index`.
///
/// # Errors
///
/// - [`CodecError::SegmentTooLong`] if the segment has more than 255 entries
/// - [`CodecError::UnindexedSubsegment`] if a child has no index
pub fn encode_segment(
    segment: &Segment,
    accepted: bool,
    index: &SegmentIndex,
) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(record_len(segment));
    write_record(&mut buf, segment, accepted, index, &mut FingerprintMemo::new())?;
    Ok(buf)
}

fn record_len(segment: &Segment) -> usize {
    let entry_len = if segment.is_literal() {
        INTERFACE_LEN
    } else {
        SUBSEGMENT_REF_LEN
    };
    RECORD_HEADER_LEN + segment.len() * entry_len
}

fn write_record<'a>(
    buf: &mut Vec<u8>,
    segment: &'a Segment,
    accepted: bool,
    index: &SegmentIndex,
    memo: &mut FingerprintMemo<'a>,
) -> CodecResult<()> {
    let seglen =
        u8::try_from(segment.len()).map_err(|_| CodecError::SegmentTooLong { len: segment.len() })?;

    // All references resolve before anything is written.
    let refs = segment
        .subsegments()
        .iter()
        .map(|child| {
            let fingerprint = memo.fingerprint(child);
            index
                .get(&fingerprint)
                .ok_or_else(|| CodecError::UnindexedSubsegment {
                    fingerprint: fingerprint.to_hex(),
                })
        })
        .collect::<CodecResult<Vec<u16>>>()?;

    buf.reserve(record_len(segment));
    buf.put_u8(RecordFlags::new(segment.kind(), accepted).to_byte());
    buf.put_u8(seglen);
    // No options are ever emitted.
    buf.put_u16(0);
    match segment {
        Segment::Literal { interfaces } => encode_interfaces(buf, interfaces),
        Segment::Composition { .. } => {
            for idx in refs {
                buf.put_u16(idx);
            }
        }
    }
    Ok(())
}

/// Accepted single-child composition pointing at `known`.
fn write_wrapper_record(buf: &mut Vec<u8>, known: u16) {
    buf.put_u8(RecordFlags::new(SegmentKind::Composition, true).to_byte());
    buf.put_u8(1);
    buf.put_u16(0);
    buf.put_u16(known);
}

/// Lists the proper subsegments of `segment` in post-order.
///
/// Each child is preceded by its own subsegments. Shared children appear
/// once per occurrence.
pub fn recursive_subsegments(segment: &Segment) -> Vec<Segment> {
    let mut out = Vec::new();
    collect_subsegments(segment, &mut out);
    out
}

fn collect_subsegments(segment: &Segment, out: &mut Vec<Segment>) {
    for child in segment.subsegments() {
        collect_subsegments(child, out);
        out.push(Segment::clone(child));
    }
}
