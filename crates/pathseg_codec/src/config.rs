//! Codec configuration.

/// Default bound on segment nesting accepted by the encoder.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Configuration shared by the encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Deepest composition nesting the encoder walks before giving up.
    pub max_nesting_depth: usize,

    /// Whether the decoder tolerates bytes after the last record.
    pub allow_trailing_bytes: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            allow_trailing_bytes: true,
        }
    }
}

impl CodecConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Sets whether trailing bytes are tolerated.
    #[must_use]
    pub const fn allow_trailing_bytes(mut self, value: bool) -> Self {
        self.allow_trailing_bytes = value;
        self
    }
}
