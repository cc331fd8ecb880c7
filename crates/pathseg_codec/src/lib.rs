//! # pathseg codec
//!
//! Deduplicating wire codec for path segment trees.
//!
//! A message carries a set of segments to a receiver that already holds a
//! session cache of earlier segments. Sender and receiver number segments
//! in one shared index space, `cache ++ records of this message`, without
//! negotiating it:
//! - The encoder fingerprints every segment and only emits records for
//!   segments the receiver cannot resolve yet, children before parents
//! - The decoder replays the records in order, resolving composition
//!   references into the cache or into records it has already decoded
//!
//! ## Wire format
//!
//! A 20-byte header (`hdrlen`, `numsegs`, source and destination ISD-AS)
//! followed by segment records. See [`header`] for the exact layout.
//! All multi-byte fields are big-endian.
//!
//! ## Usage
//!
//! ```
//! use pathseg_codec::{decode_segments, encode_segments, IsdAsn, PathInterface, Segment};
//!
//! let hop = |id| PathInterface::new(id, IsdAsn(0x0001_ff00_0000_0110));
//! let path = Segment::from_segments([
//!     Segment::from_interfaces([hop(1)]),
//!     Segment::from_interfaces([hop(2)]),
//! ]);
//!
//! let encoded = encode_segments(&[path.clone()], &[], IsdAsn(1), IsdAsn(2)).unwrap();
//! let decoded = decode_segments(&encoded.bytes, &[]).unwrap();
//!
//! assert_eq!(decoded.new_segments, encoded.sent_segments);
//! assert_eq!(decoded.accepted_segments, vec![path]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod decoder;
mod encoder;
mod error;
pub mod header;
mod index;
mod interface;
mod segment;

pub use config::{CodecConfig, DEFAULT_MAX_NESTING_DEPTH};
pub use decoder::{decode_segments, DecodedMessage, SegmentDecoder};
pub use encoder::{encode_segment, encode_segments, recursive_subsegments, EncodedMessage, SegmentEncoder};
pub use error::{CodecError, CodecResult};
pub use header::{MessageHeader, RecordFlags};
pub use index::SegmentIndex;
pub use interface::{decode_interfaces, encode_interfaces, IsdAsn, PathInterface, INTERFACE_LEN};
pub use segment::{Fingerprint, ParseFingerprintError, Segment, SegmentKind};
