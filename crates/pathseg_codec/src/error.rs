//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer is too short for the declared header, or a record runs
    /// past the end of the buffer.
    #[error("malformed header: {message}")]
    MalformedHeader {
        /// Description of the framing error.
        message: String,
    },

    /// A composition references a segment that is not resolvable at its
    /// position in the message.
    #[error("invalid subsegment reference {index}: only {resolvable} segments resolvable")]
    InvalidReference {
        /// The referenced index.
        index: u16,
        /// Number of segments resolvable when the reference was read.
        resolvable: usize,
    },

    /// A segment tree nests deeper than the configured limit.
    #[error("segment nesting exceeds maximum depth of {max_depth}")]
    NestingTooDeep {
        /// The configured limit.
        max_depth: usize,
    },

    /// A segment has more entries than the one-byte length field can hold.
    #[error("segment has {len} entries, at most 255 fit in a record")]
    SegmentTooLong {
        /// Number of interfaces or subsegments.
        len: usize,
    },

    /// The message needs more indices than the 16-bit index space holds.
    #[error("segment index {index} exceeds the 16-bit index space")]
    IndexOverflow {
        /// The index that could not be assigned.
        index: usize,
    },

    /// A composition child has no index assigned yet.
    #[error("subsegment {fingerprint} has no assigned index")]
    UnindexedSubsegment {
        /// Hex fingerprint of the child.
        fingerprint: String,
    },

    /// Bytes remain after the last record.
    #[error("{count} trailing bytes after last segment record")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        count: usize,
    },
}

impl CodecError {
    /// Create a malformed header error.
    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            message: message.into(),
        }
    }
}
