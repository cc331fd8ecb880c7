//! Segment message decoder.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::header::{MessageHeader, RecordFlags, RECORD_HEADER_LEN, SUBSEGMENT_REF_LEN};
use crate::interface::{decode_interfaces, IsdAsn, INTERFACE_LEN};
use crate::segment::{NestingGuard, Segment, SegmentKind};

/// Output of [`decode_segments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Every record of the message, in record order.
    pub new_segments: Vec<Segment>,
    /// The records flagged as accepted, in record order.
    pub accepted_segments: Vec<Segment>,
    /// Source ISD-AS from the header.
    pub src_ia: IsdAsn,
    /// Destination ISD-AS from the header.
    pub dst_ia: IsdAsn,
}

/// Decode a segment message against the cache the sender assumed.
///
/// # Errors
///
/// See [`SegmentDecoder::decode`].
pub fn decode_segments(bytes: &[u8], old: &[Segment]) -> CodecResult<DecodedMessage> {
    SegmentDecoder::new(bytes).decode(old)
}

/// A bounds-checked segment message decoder.
pub struct SegmentDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    config: CodecConfig,
}

impl<'a> SegmentDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            config: CodecConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Decode the message.
    ///
    /// The header's `numsegs` spans the receiver cache plus the records of
    /// this message, so `numsegs - old.len()` records are read. Composition
    /// references resolve into `old` first and then into records decoded
    /// strictly earlier in this message.
    ///
    /// # Errors
    ///
    /// - [`CodecError::MalformedHeader`] if the header or any record does not
    ///   fit the buffer, or `numsegs` is smaller than the cache
    /// - [`CodecError::InvalidReference`] on a forward or out-of-range
    ///   reference
    /// - [`CodecError::NestingTooDeep`] if a record nests deeper than
    ///   [`CodecConfig::max_nesting_depth`], counting levels inside
    ///   referenced cache entries
    /// - [`CodecError::TrailingBytes`] if configured to reject them
    pub fn decode(mut self, old: &[Segment]) -> CodecResult<DecodedMessage> {
        let header = MessageHeader::parse(self.data)?;
        self.pos = usize::from(header.hdrlen);

        let numsegs = usize::from(header.numsegs);
        let record_count = numsegs.checked_sub(old.len()).ok_or_else(|| {
            CodecError::malformed_header(format!(
                "numsegs {numsegs} smaller than cache of {} segments",
                old.len()
            ))
        })?;

        // Every record is at least RECORD_HEADER_LEN bytes; don't trust the
        // header for the allocation.
        let capacity = record_count.min(self.remaining().len() / RECORD_HEADER_LEN);
        let mut decoded: Vec<Arc<Segment>> = Vec::with_capacity(capacity);
        let mut heights: Vec<usize> = Vec::with_capacity(capacity);
        let mut accepted_at = Vec::new();
        let mut cache_nesting = NestingGuard::new(self.config.max_nesting_depth);

        for position in 0..record_count {
            let flags = RecordFlags::from_byte(self.read_u8()?);
            let seglen = usize::from(self.read_u8()?);
            let optlen = usize::from(self.read_u16()?);

            let (segment, height) = match flags.kind {
                SegmentKind::Literal => {
                    let payload = self.read_bytes(seglen * INTERFACE_LEN)?;
                    let literal = Segment::Literal {
                        interfaces: decode_interfaces(payload, seglen)?,
                    };
                    (literal, 0)
                }
                SegmentKind::Composition => {
                    let refs = self.read_bytes(seglen * SUBSEGMENT_REF_LEN)?;
                    let mut height = 0;
                    let children = refs
                        .chunks_exact(SUBSEGMENT_REF_LEN)
                        .map(|raw| {
                            let index = u16::from_be_bytes([raw[0], raw[1]]);
                            let (child, child_height) =
                                resolve(index, old, &decoded, &heights, &mut cache_nesting)?;
                            height = height.max(child_height + 1);
                            Ok(child)
                        })
                        .collect::<CodecResult<Vec<_>>>()?;
                    if height > cache_nesting.max_depth() {
                        return Err(cache_nesting.too_deep());
                    }
                    (Segment::from_shared(children), height)
                }
            };
            self.read_bytes(optlen)?;

            trace!(
                idx = old.len() + position,
                kind = %flags.kind,
                accepted = flags.accepted,
                seglen,
                optlen,
                "decoded segment record"
            );
            if flags.accepted {
                accepted_at.push(position);
            }
            decoded.push(Arc::new(segment));
            heights.push(height);
        }

        let trailing = self.remaining().len();
        if trailing > 0 && !self.config.allow_trailing_bytes {
            return Err(CodecError::TrailingBytes { count: trailing });
        }

        let accepted_segments: Vec<Segment> = accepted_at
            .iter()
            .map(|&position| Segment::clone(&decoded[position]))
            .collect();
        let new_segments: Vec<Segment> = decoded
            .into_iter()
            .map(|segment| Arc::try_unwrap(segment).unwrap_or_else(|shared| Segment::clone(&shared)))
            .collect();

        debug!(
            cached = old.len(),
            records = new_segments.len(),
            accepted = accepted_segments.len(),
            trailing,
            "decoded segment message"
        );

        Ok(DecodedMessage {
            new_segments,
            accepted_segments,
            src_ia: header.src_ia,
            dst_ia: header.dst_ia,
        })
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let available = self.data.len().saturating_sub(self.pos);
        if len > available {
            return Err(CodecError::malformed_header(format!(
                "record needs {len} bytes at offset {}, {available} available",
                self.pos
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    #[inline]
    fn read_u16(&mut self) -> CodecResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

/// Resolves a subsegment index into the cache or an earlier record,
/// returning the segment with its height.
fn resolve<'o>(
    index: u16,
    old: &'o [Segment],
    decoded: &[Arc<Segment>],
    heights: &[usize],
    cache_nesting: &mut NestingGuard<'o>,
) -> CodecResult<(Arc<Segment>, usize)> {
    let k = usize::from(index);
    if let Some(segment) = old.get(k) {
        let height = cache_nesting.height(segment)?;
        return Ok((Arc::new(segment.clone()), height));
    }
    let position = k - old.len();
    match (decoded.get(position), heights.get(position)) {
        (Some(segment), Some(&height)) => Ok((Arc::clone(segment), height)),
        _ => Err(CodecError::InvalidReference {
            index,
            resolvable: old.len() + decoded.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{HEADER_LEN, SEG_ACCEPTED_MASK, SEG_TYPE_COMPOSITION};
    use crate::interface::PathInterface;

    fn header(numsegs: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        MessageHeader::new(numsegs, IsdAsn(0xaa), IsdAsn(0xbb)).write_to(&mut buf);
        buf
    }

    fn literal_record(buf: &mut Vec<u8>, accepted: bool, id: u64, ia: u64) {
        buf.push(if accepted { SEG_ACCEPTED_MASK } else { 0 });
        buf.push(1);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&id.to_be_bytes());
        buf.extend_from_slice(&ia.to_be_bytes());
    }

    fn composition_record(buf: &mut Vec<u8>, accepted: bool, refs: &[u16]) {
        let accepted_bit = if accepted { SEG_ACCEPTED_MASK } else { 0 };
        buf.push(SEG_TYPE_COMPOSITION | accepted_bit);
        buf.push(refs.len() as u8);
        buf.extend_from_slice(&[0, 0]);
        for r in refs {
            buf.extend_from_slice(&r.to_be_bytes());
        }
    }

    fn lit(id: u64, ia: u64) -> Segment {
        Segment::from_interfaces([PathInterface::new(id, IsdAsn(ia))])
    }

    /// A literal followed by single-child compositions, each pointing at the
    /// record before it. The last record is accepted.
    fn chain_message(records: u16) -> Vec<u8> {
        let mut buf = header(records);
        literal_record(&mut buf, records == 1, 1, 1);
        for k in 1..records {
            composition_record(&mut buf, k + 1 == records, &[k - 1]);
        }
        buf
    }

    #[test]
    fn decode_header_only() {
        let msg = decode_segments(&header(0), &[]).unwrap();
        assert!(msg.new_segments.is_empty());
        assert!(msg.accepted_segments.is_empty());
        assert_eq!(msg.src_ia, IsdAsn(0xaa));
        assert_eq!(msg.dst_ia, IsdAsn(0xbb));
    }

    #[test]
    fn decode_composition_of_literals() {
        let mut buf = header(3);
        literal_record(&mut buf, false, 1, 0x10);
        literal_record(&mut buf, false, 2, 0x20);
        composition_record(&mut buf, true, &[0, 1]);

        let msg = decode_segments(&buf, &[]).unwrap();
        let comp = Segment::from_segments([lit(1, 0x10), lit(2, 0x20)]);
        assert_eq!(msg.new_segments, vec![lit(1, 0x10), lit(2, 0x20), comp.clone()]);
        assert_eq!(msg.accepted_segments, vec![comp]);
    }

    #[test]
    fn decode_resolves_into_cache() {
        let old = vec![lit(5, 5)];
        let mut buf = header(3);
        literal_record(&mut buf, false, 6, 6);
        composition_record(&mut buf, true, &[1, 0]);

        let msg = decode_segments(&buf, &old).unwrap();
        assert_eq!(msg.new_segments.len(), 2);
        assert_eq!(
            msg.accepted_segments,
            vec![Segment::from_segments([lit(6, 6), lit(5, 5)])]
        );
    }

    #[test]
    fn forward_reference_rejected() {
        let mut buf = header(2);
        composition_record(&mut buf, true, &[1]);
        literal_record(&mut buf, false, 1, 1);

        let err = decode_segments(&buf, &[]).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidReference {
                index: 1,
                resolvable: 0
            }
        );
    }

    #[test]
    fn self_reference_rejected() {
        let mut buf = header(2);
        literal_record(&mut buf, false, 1, 1);
        composition_record(&mut buf, true, &[1]);

        let err = decode_segments(&buf, &[]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidReference { index: 1, .. }));
    }

    #[test]
    fn out_of_range_reference_rejected() {
        let mut buf = header(1);
        composition_record(&mut buf, true, &[0xffff]);
        assert!(matches!(
            decode_segments(&buf, &[]),
            Err(CodecError::InvalidReference { index: 0xffff, .. })
        ));
    }

    #[test]
    fn short_buffer_is_malformed() {
        assert!(matches!(
            decode_segments(&[0u8; 10], &[]),
            Err(CodecError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn truncated_record_is_malformed() {
        let mut buf = header(1);
        literal_record(&mut buf, true, 1, 1);
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            decode_segments(&buf, &[]),
            Err(CodecError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn numsegs_past_buffer_is_malformed() {
        let mut buf = header(2);
        literal_record(&mut buf, true, 1, 1);
        assert!(matches!(
            decode_segments(&buf, &[]),
            Err(CodecError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn numsegs_below_cache_is_malformed() {
        let buf = header(0);
        assert!(matches!(
            decode_segments(&buf, &[lit(1, 1)]),
            Err(CodecError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn options_and_padding_skipped() {
        let mut buf = header(1);
        buf[1] = (HEADER_LEN + 4) as u8;
        buf.extend_from_slice(&[0xee; 4]);
        buf.push(SEG_ACCEPTED_MASK);
        buf.push(1);
        buf.extend_from_slice(&3u16.to_be_bytes());
        buf.extend_from_slice(&9u64.to_be_bytes());
        buf.extend_from_slice(&8u64.to_be_bytes());
        buf.extend_from_slice(&[1, 2, 3]);

        let msg = SegmentDecoder::new(&buf)
            .with_config(CodecConfig::new().allow_trailing_bytes(false))
            .decode(&[])
            .unwrap();
        assert_eq!(msg.accepted_segments, vec![lit(9, 8)]);
    }

    #[test]
    fn truncated_options_are_malformed() {
        let mut buf = header(1);
        buf.push(0);
        buf.push(0);
        buf.extend_from_slice(&10u16.to_be_bytes());
        buf.extend_from_slice(&[0; 9]);
        assert!(matches!(
            decode_segments(&buf, &[]),
            Err(CodecError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn trailing_bytes_policy() {
        let mut buf = header(1);
        literal_record(&mut buf, true, 1, 1);
        buf.extend_from_slice(&[0, 0]);

        assert!(decode_segments(&buf, &[]).is_ok());
        let err = SegmentDecoder::new(&buf)
            .with_config(CodecConfig::new().allow_trailing_bytes(false))
            .decode(&[])
            .unwrap_err();
        assert_eq!(err, CodecError::TrailingBytes { count: 2 });
    }

    #[test]
    fn unaccepted_records_not_in_accepted() {
        let mut buf = header(3);
        literal_record(&mut buf, true, 1, 1);
        literal_record(&mut buf, false, 2, 2);
        literal_record(&mut buf, true, 3, 3);

        let msg = decode_segments(&buf, &[]).unwrap();
        assert_eq!(msg.new_segments.len(), 3);
        assert_eq!(msg.accepted_segments, vec![lit(1, 1), lit(3, 3)]);
    }

    #[test]
    fn shared_children_reuse_decoded_records() {
        let mut buf = header(3);
        literal_record(&mut buf, false, 1, 1);
        composition_record(&mut buf, false, &[0, 0]);
        composition_record(&mut buf, true, &[1, 0]);

        let msg = decode_segments(&buf, &[]).unwrap();
        let pair = Segment::from_segments([lit(1, 1), lit(1, 1)]);
        assert_eq!(msg.new_segments[1], pair);
        assert_eq!(
            msg.accepted_segments,
            vec![Segment::from_segments([pair, lit(1, 1)])]
        );
    }

    #[test]
    fn deep_chain_rejected() {
        let err = decode_segments(&chain_message(u16::MAX), &[]).unwrap_err();
        assert_eq!(err, CodecError::NestingTooDeep { max_depth: 64 });
    }

    #[test]
    fn chain_up_to_limit_decodes() {
        // 65 records: heights 0 through 64.
        let msg = decode_segments(&chain_message(65), &[]).unwrap();
        assert_eq!(msg.new_segments.len(), 65);
        assert_eq!(msg.accepted_segments.len(), 1);

        assert_eq!(
            decode_segments(&chain_message(66), &[]),
            Err(CodecError::NestingTooDeep { max_depth: 64 })
        );
    }

    #[test]
    fn cache_entries_count_toward_depth() {
        let mut nested = lit(1, 1);
        for _ in 0..3 {
            nested = Segment::from_segments([nested]);
        }
        let old = vec![nested];
        let mut buf = header(2);
        composition_record(&mut buf, true, &[0]);

        let config = CodecConfig::new().max_nesting_depth(3);
        let err = SegmentDecoder::new(&buf)
            .with_config(config)
            .decode(&old)
            .unwrap_err();
        assert_eq!(err, CodecError::NestingTooDeep { max_depth: 3 });

        let config = CodecConfig::new().max_nesting_depth(4);
        assert!(SegmentDecoder::new(&buf).with_config(config).decode(&old).is_ok());
    }

    #[test]
    fn deep_chain_with_raised_limit_fingerprints_and_drops() {
        let buf = chain_message(u16::MAX);
        let msg = SegmentDecoder::new(&buf)
            .with_config(CodecConfig::new().max_nesting_depth(usize::MAX))
            .decode(&[])
            .unwrap();
        assert_eq!(msg.new_segments.len(), usize::from(u16::MAX));

        let accepted = &msg.accepted_segments[0];
        assert_eq!(accepted.fingerprint(), msg.new_segments[65534].fingerprint());
        drop(msg);
    }
}
