//! End-to-end wire scenarios for the segment codec.

use pathseg_codec::header::{HEADER_LEN, RECORD_HEADER_LEN};
use pathseg_codec::{
    decode_segments, encode_segments, CodecError, IsdAsn, PathInterface, Segment, INTERFACE_LEN,
};

const X: IsdAsn = IsdAsn(0x0001_ff00_0000_0110);
const Y: IsdAsn = IsdAsn(0x0001_ff00_0000_0111);

fn hop_literal(id: u64, ia: IsdAsn) -> Segment {
    Segment::from_interfaces([PathInterface::new(id, ia)])
}

fn two_hop_composition() -> Segment {
    Segment::from_segments([hop_literal(1, X), hop_literal(2, Y)])
}

fn numsegs(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[2], bytes[3]])
}

#[test]
fn fresh_composition_emits_three_records() {
    let comp = two_hop_composition();
    let encoded = encode_segments(&[comp.clone()], &[], X, Y).unwrap();

    assert_eq!(numsegs(&encoded.bytes), 3);
    let lit_len = RECORD_HEADER_LEN + INTERFACE_LEN;
    assert_eq!(
        encoded.bytes.len(),
        HEADER_LEN + 2 * lit_len + RECORD_HEADER_LEN + 4
    );

    let records = &encoded.bytes[HEADER_LEN..];
    // Literal(id1) at index 0, not accepted
    assert_eq!(&records[..4], &[0b00, 1, 0, 0]);
    assert_eq!(&records[4..12], &1u64.to_be_bytes());
    assert_eq!(&records[12..20], &X.0.to_be_bytes());
    // Literal(id2) at index 1, not accepted
    assert_eq!(&records[lit_len..lit_len + 4], &[0b00, 1, 0, 0]);
    assert_eq!(&records[lit_len + 4..lit_len + 12], &2u64.to_be_bytes());
    // Composition([0, 1]) at index 2, accepted
    assert_eq!(&records[2 * lit_len..], &[0b11, 2, 0, 0, 0, 0, 0, 1]);

    let decoded = decode_segments(&encoded.bytes, &[]).unwrap();
    assert_eq!(decoded.new_segments.len(), 3);
    assert_eq!(decoded.accepted_segments, vec![comp]);
    assert_eq!(decoded.src_ia, X);
    assert_eq!(decoded.dst_ia, Y);
}

#[test]
fn cached_composition_emits_single_wrapper() {
    let comp = two_hop_composition();
    let old = vec![comp.clone()];
    let encoded = encode_segments(&[comp.clone()], &old, X, Y).unwrap();

    assert_eq!(numsegs(&encoded.bytes), 2);
    assert_eq!(&encoded.bytes[HEADER_LEN..], &[0b11, 1, 0, 0, 0, 0]);
    assert_eq!(
        encoded.sent_segments,
        vec![Segment::from_segments([comp.clone()])]
    );

    let decoded = decode_segments(&encoded.bytes, &old).unwrap();
    assert_eq!(decoded.new_segments, encoded.sent_segments);
    assert_eq!(decoded.accepted_segments, encoded.sent_segments);
}

#[test]
fn same_segment_twice_sends_content_once() {
    let a = two_hop_composition();
    let encoded = encode_segments(&[a.clone(), a.clone()], &[], X, Y).unwrap();

    let full_records = encoded
        .sent_segments
        .iter()
        .filter(|s| s.fingerprint() == a.fingerprint())
        .count();
    assert_eq!(full_records, 1);
    assert_eq!(
        encoded.sent_segments.last(),
        Some(&Segment::from_segments([a.clone()]))
    );

    let decoded = decode_segments(&encoded.bytes, &[]).unwrap();
    assert_eq!(
        decoded.accepted_segments,
        vec![a.clone(), Segment::from_segments([a])]
    );
}

#[test]
fn reference_to_later_record_rejected() {
    // Swap the composition ahead of its children.
    let encoded = encode_segments(&[two_hop_composition()], &[], X, Y).unwrap();
    let lit_len = RECORD_HEADER_LEN + INTERFACE_LEN;
    let records = &encoded.bytes[HEADER_LEN..];

    let mut reordered = encoded.bytes[..HEADER_LEN].to_vec();
    reordered.extend_from_slice(&records[2 * lit_len..]);
    reordered.extend_from_slice(&records[..2 * lit_len]);

    assert_eq!(
        decode_segments(&reordered, &[]),
        Err(CodecError::InvalidReference {
            index: 0,
            resolvable: 0
        })
    );
}

#[test]
fn decode_with_wrong_cache_fails_cleanly() {
    let comp = two_hop_composition();
    let old = vec![comp.clone()];
    let encoded = encode_segments(&[comp], &old, X, Y).unwrap();

    // The receiver lost its cache: index 0 no longer resolves.
    assert_eq!(
        decode_segments(&encoded.bytes, &[]),
        Err(CodecError::InvalidReference {
            index: 0,
            resolvable: 0
        })
    );
}
