//! Wire test vectors for the segment codec.
//!
//! These vectors pin the byte layout so other implementations of the format
//! can be checked against this one.

use pathseg_codec::{CodecError, IsdAsn, PathInterface, Segment};
use serde::{Deserialize, Serialize};

/// Source ISD-AS used by the vectors.
pub const VECTOR_SRC_IA: u64 = 0x0001_ff00_0000_0110;

/// Destination ISD-AS used by the vectors.
pub const VECTOR_DST_IA: u64 = 0x0001_ff00_0000_0111;

/// An encoding vector: segments sent against a cache, and the exact bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Receiver cache.
    pub cache: Vec<Segment>,
    /// Top-level segments to encode.
    pub segments: Vec<Segment>,
    /// Source ISD-AS.
    pub src_ia: u64,
    /// Destination ISD-AS.
    pub dst_ia: u64,
    /// Expected message (hex-encoded).
    pub expected_hex: String,
}

/// A decoding vector that must be rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Receiver cache.
    pub cache: Vec<Segment>,
    /// Message bytes (hex-encoded).
    pub input_hex: String,
    /// Expected error kind, see [`error_kind`].
    pub expected_error: String,
}

fn hop(id: u64, ia: u64) -> Segment {
    Segment::from_interfaces([PathInterface::new(id, IsdAsn(ia))])
}

fn two_hop_composition() -> Segment {
    Segment::from_segments([hop(1, VECTOR_SRC_IA), hop(2, VECTOR_DST_IA)])
}

const HEADER_ADDRS: &str = "0001ff0000000110 0001ff0000000111";

/// Encoding vectors.
pub fn encoding_vectors() -> Vec<WireVector> {
    vec![
        WireVector {
            id: "empty".into(),
            description: "Header only, nothing to send".into(),
            cache: vec![],
            segments: vec![],
            src_ia: VECTOR_SRC_IA,
            dst_ia: VECTOR_DST_IA,
            expected_hex: format!("0014 0000 {HEADER_ADDRS}"),
        },
        WireVector {
            id: "fresh_composition".into(),
            description: "Composition of two literals, empty cache".into(),
            cache: vec![],
            segments: vec![two_hop_composition()],
            src_ia: VECTOR_SRC_IA,
            dst_ia: VECTOR_DST_IA,
            expected_hex: format!(
                "0014 0003 {HEADER_ADDRS}
                 00 01 0000 0000000000000001 0001ff0000000110
                 00 01 0000 0000000000000002 0001ff0000000111
                 03 02 0000 0000 0001"
            ),
        },
        WireVector {
            id: "cached_composition".into(),
            description: "Composition already cached, re-announced by wrapper".into(),
            cache: vec![two_hop_composition()],
            segments: vec![two_hop_composition()],
            src_ia: VECTOR_SRC_IA,
            dst_ia: VECTOR_DST_IA,
            expected_hex: format!("0014 0002 {HEADER_ADDRS} 03 01 0000 0000"),
        },
        WireVector {
            id: "duplicate_literal".into(),
            description: "Same literal twice in one message".into(),
            cache: vec![],
            segments: vec![hop(7, VECTOR_SRC_IA), hop(7, VECTOR_SRC_IA)],
            src_ia: VECTOR_SRC_IA,
            dst_ia: VECTOR_DST_IA,
            expected_hex: format!(
                "0014 0002 {HEADER_ADDRS}
                 02 01 0000 0000000000000007 0001ff0000000110
                 03 01 0000 0000"
            ),
        },
        WireVector {
            id: "cached_child".into(),
            description: "New composition over a cached literal".into(),
            cache: vec![hop(1, VECTOR_SRC_IA)],
            segments: vec![two_hop_composition()],
            src_ia: VECTOR_SRC_IA,
            dst_ia: VECTOR_DST_IA,
            expected_hex: format!(
                "0014 0003 {HEADER_ADDRS}
                 00 01 0000 0000000000000002 0001ff0000000111
                 03 02 0000 0000 0001"
            ),
        },
    ]
}

/// Messages the decoder must reject.
pub fn rejection_vectors() -> Vec<RejectionVector> {
    vec![
        RejectionVector {
            id: "short_header".into(),
            description: "Buffer shorter than the fixed header".into(),
            cache: vec![],
            input_hex: "0014 0000 0001ff00".into(),
            expected_error: "malformed_header".into(),
        },
        RejectionVector {
            id: "hdrlen_too_small".into(),
            description: "Declared header length below 20".into(),
            cache: vec![],
            input_hex: format!("0013 0000 {HEADER_ADDRS}"),
            expected_error: "malformed_header".into(),
        },
        RejectionVector {
            id: "missing_record".into(),
            description: "numsegs announces a record that is not there".into(),
            cache: vec![],
            input_hex: format!("0014 0001 {HEADER_ADDRS}"),
            expected_error: "malformed_header".into(),
        },
        RejectionVector {
            id: "numsegs_below_cache".into(),
            description: "numsegs smaller than the receiver cache".into(),
            cache: vec![hop(1, VECTOR_SRC_IA)],
            input_hex: format!("0014 0000 {HEADER_ADDRS}"),
            expected_error: "malformed_header".into(),
        },
        RejectionVector {
            id: "forward_reference".into(),
            description: "Composition references the record after it".into(),
            cache: vec![],
            input_hex: format!(
                "0014 0002 {HEADER_ADDRS}
                 03 01 0000 0001
                 00 01 0000 0000000000000001 0001ff0000000110"
            ),
            expected_error: "invalid_reference".into(),
        },
        RejectionVector {
            id: "self_reference".into(),
            description: "Composition references its own index".into(),
            cache: vec![hop(1, VECTOR_SRC_IA)],
            input_hex: format!("0014 0002 {HEADER_ADDRS} 03 01 0000 0001"),
            expected_error: "invalid_reference".into(),
        },
    ]
}

/// Stable name of an error kind, as used in [`RejectionVector`].
pub fn error_kind(error: &CodecError) -> &'static str {
    match error {
        CodecError::MalformedHeader { .. } => "malformed_header",
        CodecError::InvalidReference { .. } => "invalid_reference",
        CodecError::NestingTooDeep { .. } => "nesting_too_deep",
        CodecError::SegmentTooLong { .. } => "segment_too_long",
        CodecError::IndexOverflow { .. } => "index_overflow",
        CodecError::UnindexedSubsegment { .. } => "unindexed_subsegment",
        CodecError::TrailingBytes { .. } => "trailing_bytes",
    }
}

/// Encodes bytes as hexadecimal string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decodes hexadecimal string to bytes, ignoring whitespace.
pub fn hex_decode(hex: &str) -> Vec<u8> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("Invalid hex"))
        .collect()
}

/// Exports all vectors as JSON.
pub fn export_vectors_json() -> String {
    let export = serde_json::json!({
        "encoding": encoding_vectors(),
        "rejection": rejection_vectors(),
    });
    serde_json::to_string_pretty(&export).expect("Failed to serialize vectors")
}
