//! Session-level test helpers.
//!
//! Drives both ends of the codec across several rounds and checks that the
//! sender's view of the receiver cache never drifts from the receiver's.

use pathseg_codec::{
    decode_segments, encode_segments, CodecResult, DecodedMessage, EncodedMessage, Fingerprint,
    IsdAsn, Segment,
};

/// A sender and a receiver sharing one session.
pub struct SessionHarness {
    /// Sender's record of what the receiver holds.
    pub sender_view: Vec<Segment>,
    /// The receiver's cache.
    pub receiver_cache: Vec<Segment>,
    src_ia: IsdAsn,
    dst_ia: IsdAsn,
    rounds: usize,
}

impl SessionHarness {
    /// Creates a harness with empty caches.
    pub fn new() -> Self {
        Self::with_addresses(IsdAsn(1), IsdAsn(2))
    }

    /// Creates a harness with explicit source and destination.
    pub fn with_addresses(src_ia: IsdAsn, dst_ia: IsdAsn) -> Self {
        Self {
            sender_view: Vec::new(),
            receiver_cache: Vec::new(),
            src_ia,
            dst_ia,
            rounds: 0,
        }
    }

    /// Encodes `segments` against the sender's view without delivering.
    ///
    /// # Errors
    ///
    /// Propagates encoder errors.
    pub fn encode(&self, segments: &[Segment]) -> CodecResult<EncodedMessage> {
        encode_segments(segments, &self.sender_view, self.src_ia, self.dst_ia)
    }

    /// Runs one round: encode, decode, then both sides append what was
    /// exchanged to their caches.
    ///
    /// # Panics
    ///
    /// Panics if either side fails or the decoded records differ from the
    /// sent ones.
    pub fn send(&mut self, segments: &[Segment]) -> DecodedMessage {
        let encoded = self.encode(segments).expect("Failed to encode segments");
        let decoded =
            decode_segments(&encoded.bytes, &self.receiver_cache).expect("Failed to decode segments");

        assert_eq!(
            fingerprints(&decoded.new_segments),
            fingerprints(&encoded.sent_segments),
            "Decoded records differ from sent records in round {}",
            self.rounds
        );
        assert_eq!(decoded.src_ia, self.src_ia);
        assert_eq!(decoded.dst_ia, self.dst_ia);

        self.sender_view.extend(encoded.sent_segments);
        self.receiver_cache.extend(decoded.new_segments.iter().cloned());
        self.rounds += 1;
        decoded
    }

    /// Verifies the sender's view matches the receiver's cache.
    pub fn verify_caches_agree(&self) {
        assert_eq!(
            fingerprints(&self.sender_view),
            fingerprints(&self.receiver_cache),
            "Sender view and receiver cache diverged after {} rounds",
            self.rounds
        );
    }

    /// Returns the number of completed rounds.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

impl Default for SessionHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprints of `segments`, in order.
pub fn fingerprints(segments: &[Segment]) -> Vec<Fingerprint> {
    segments.iter().map(Segment::fingerprint).collect()
}
