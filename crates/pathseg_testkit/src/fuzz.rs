//! Fuzz testing harnesses for the segment codec.
//!
//! These targets can be driven by cargo-fuzz or any other byte-oriented
//! fuzzer.

use pathseg_codec::{
    decode_segments, encode_segments, IsdAsn, MessageHeader, PathInterface, RecordFlags, Segment,
    SegmentKind,
};

/// Fuzz target for message decoding.
///
/// Arbitrary bytes must either decode or return an error, never panic.
pub fn fuzz_decode(data: &[u8]) {
    let _ = decode_segments(data, &[]);
}

/// Fuzz target for decoding against a non-empty cache.
///
/// The first byte selects how many entries of `cache` the receiver holds.
pub fn fuzz_decode_with_cache(data: &[u8], cache: &[Segment]) {
    let Some((&take, rest)) = data.split_first() else {
        return;
    };
    let held = usize::from(take).min(cache.len());
    let _ = decode_segments(rest, &cache[..held]);
}

/// Fuzz target for re-encoding decoded messages.
///
/// Whatever decodes must re-encode, and the re-encoded message must decode
/// to the same accepted segments or their wrappers.
pub fn fuzz_roundtrip(data: &[u8]) {
    let Ok(decoded) = decode_segments(data, &[]) else {
        return;
    };
    let Ok(encoded) = encode_segments(
        &decoded.accepted_segments,
        &[],
        decoded.src_ia,
        decoded.dst_ia,
    ) else {
        // Decoded trees can nest deeper than the encoder allows.
        return;
    };
    let again = decode_segments(&encoded.bytes, &[]).expect("Re-encoded message must decode");

    assert_eq!(
        again.accepted_segments.len(),
        decoded.accepted_segments.len(),
        "Roundtrip changed the accepted count"
    );
    // Decoded trees may share subtrees heavily; compare by fingerprint.
    for (got, original) in again.accepted_segments.iter().zip(&decoded.accepted_segments) {
        let got = got.fingerprint();
        let expected = original.fingerprint();
        let wrapper = Segment::from_segments([original.clone()]).fingerprint();
        assert!(
            got == expected || got == wrapper,
            "Roundtrip mismatch for {expected:?}"
        );
    }
}

/// Builds a well-formed message whose records form one composition chain:
/// a literal, then compositions each referencing the record before it.
///
/// Useful as a fuzz seed; the random byte generators never reach this depth.
pub fn chain_message(records: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    MessageHeader::new(records, IsdAsn(1), IsdAsn(2)).write_to(&mut buf);
    if records == 0 {
        return buf;
    }

    buf.push(RecordFlags::new(SegmentKind::Literal, records == 1).to_byte());
    buf.push(1);
    buf.extend_from_slice(&[0, 0]);
    buf.extend_from_slice(&PathInterface::new(1, IsdAsn(1)).to_bytes());
    for k in 1..records {
        buf.push(RecordFlags::new(SegmentKind::Composition, k + 1 == records).to_byte());
        buf.push(1);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&(k - 1).to_be_bytes());
    }
    buf
}
