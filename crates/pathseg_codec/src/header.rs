//! Message header and record flag layout.
//!
//! ```text
//! Header:
//!   0      reserved
//!   1      hdrlen
//!   2..4   numsegs (u16 BE)
//!   4..12  source ISD-AS (u64 BE)
//!   12..20 destination ISD-AS (u64 BE)
//!   20..hdrlen reserved
//!
//! Record:
//!   0      flags (bit0 type, bit1 accepted)
//!   1      seglen
//!   2..4   optlen (u16 BE)
//!   payload, then optlen bytes of options
//! ```

use bytes::BufMut;

use crate::error::{CodecError, CodecResult};
use crate::interface::IsdAsn;
use crate::segment::SegmentKind;

/// Length of the header written by the encoder and the minimum accepted.
pub const HEADER_LEN: usize = 20;

/// Length of the fixed part of a segment record.
pub const RECORD_HEADER_LEN: usize = 4;

/// Wire size of one subsegment reference.
pub const SUBSEGMENT_REF_LEN: usize = 2;

/// Flag bit selecting the record type.
pub const SEG_TYPE_MASK: u8 = 1 << 0;

/// Type bit value for a literal.
pub const SEG_TYPE_LITERAL: u8 = 0;

/// Type bit value for a composition.
pub const SEG_TYPE_COMPOSITION: u8 = 1 << 0;

/// Flag bit marking an accepted record.
pub const SEG_ACCEPTED_MASK: u8 = 1 << 1;

/// Parsed fixed message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Declared header length, including reserved padding.
    pub hdrlen: u8,
    /// Size of the index space covered by this message (cache + records).
    pub numsegs: u16,
    /// Source ISD-AS.
    pub src_ia: IsdAsn,
    /// Destination ISD-AS.
    pub dst_ia: IsdAsn,
}

impl MessageHeader {
    /// Creates a header with the standard length.
    #[must_use]
    pub const fn new(numsegs: u16, src_ia: IsdAsn, dst_ia: IsdAsn) -> Self {
        Self {
            hdrlen: HEADER_LEN as u8,
            numsegs,
            src_ia,
            dst_ia,
        }
    }

    /// Parses the header at the start of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedHeader`] if the buffer is shorter than
    /// the fixed header or than the declared `hdrlen`, or if `hdrlen` is
    /// below the fixed size.
    pub fn parse(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::malformed_header(format!(
                "buffer of {} bytes shorter than {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }

        let hdrlen = bytes[1];
        if usize::from(hdrlen) < HEADER_LEN {
            return Err(CodecError::malformed_header(format!(
                "declared header length {hdrlen} below {HEADER_LEN}"
            )));
        }
        if usize::from(hdrlen) > bytes.len() {
            return Err(CodecError::malformed_header(format!(
                "declared header length {hdrlen} exceeds buffer of {} bytes",
                bytes.len()
            )));
        }

        Ok(Self {
            hdrlen,
            numsegs: u16::from_be_bytes([bytes[2], bytes[3]]),
            src_ia: IsdAsn(read_u64(&bytes[4..12])),
            dst_ia: IsdAsn(read_u64(&bytes[12..20])),
        })
    }

    /// Writes the header, zero-padded to `hdrlen`.
    ///
    /// A `hdrlen` below the fixed size is written as the fixed size.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        let hdrlen = self.hdrlen.max(HEADER_LEN as u8);
        buf.put_u8(0);
        buf.put_u8(hdrlen);
        buf.put_u16(self.numsegs);
        buf.put_u64(self.src_ia.0);
        buf.put_u64(self.dst_ia.0);
        buf.put_bytes(0, usize::from(hdrlen) - HEADER_LEN);
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_be_bytes(raw)
}

/// Decoded flags byte of a segment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFlags {
    /// Record type.
    pub kind: SegmentKind,
    /// Whether the sender marked the segment as accepted.
    pub accepted: bool,
}

impl RecordFlags {
    /// Creates record flags.
    #[must_use]
    pub const fn new(kind: SegmentKind, accepted: bool) -> Self {
        Self { kind, accepted }
    }

    /// Reads flags from a record's first byte. Unknown bits are ignored.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        let kind = if byte & SEG_TYPE_MASK == SEG_TYPE_COMPOSITION {
            SegmentKind::Composition
        } else {
            SegmentKind::Literal
        };
        Self {
            kind,
            accepted: byte & SEG_ACCEPTED_MASK != 0,
        }
    }

    /// Returns the flags byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let type_bit = match self.kind {
            SegmentKind::Literal => SEG_TYPE_LITERAL,
            SegmentKind::Composition => SEG_TYPE_COMPOSITION,
        };
        if self.accepted {
            type_bit | SEG_ACCEPTED_MASK
        } else {
            type_bit
        }
    }
}
