//! CLI command implementations.

pub mod encode;
pub mod fingerprint;
pub mod inspect;

use pathseg_codec::{CodecError, IsdAsn, Segment};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Errors shared by the commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Reading or writing a file failed.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A segment file is not a JSON list of segments.
    #[error("{path}: invalid segment JSON: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The codec rejected the input.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Reads a JSON list of segments.
pub fn load_segments(path: &Path) -> Result<Vec<Segment>, CliError> {
    let raw = std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the receiver cache, empty when no file is given.
pub fn load_cache(path: Option<&Path>) -> Result<Vec<Segment>, CliError> {
    path.map_or_else(|| Ok(Vec::new()), load_segments)
}

/// Parses an ISD-AS as a packed value (decimal or `0x` hex) or as
/// `isd-asn`, where the AS is decimal or three colon-separated hex groups.
pub fn parse_isd_asn(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).map_err(|e| format!("invalid ISD-AS {s:?}: {e}"));
    }
    let Some((isd, asn)) = s.split_once('-') else {
        return s.parse().map_err(|e| format!("invalid ISD-AS {s:?}: {e}"));
    };

    let isd: u16 = isd.parse().map_err(|e| format!("invalid ISD in {s:?}: {e}"))?;
    let asn = if asn.contains(':') {
        let groups: Vec<&str> = asn.split(':').collect();
        if groups.len() != 3 {
            return Err(format!("AS in {s:?} must have three groups"));
        }
        groups.iter().try_fold(0u64, |acc, group| {
            u16::from_str_radix(group, 16)
                .map(|g| (acc << 16) | u64::from(g))
                .map_err(|e| format!("invalid AS in {s:?}: {e}"))
        })?
    } else {
        asn.parse::<u64>().map_err(|e| format!("invalid AS in {s:?}: {e}"))?
    };
    if asn >> 48 != 0 {
        return Err(format!("AS number in {s:?} exceeds 48 bits"));
    }
    Ok((u64::from(isd) << 48) | asn)
}

/// One-line description of a segment.
#[derive(Debug, Serialize)]
pub struct SegmentSummary {
    /// Position in the shared index space or in the input list.
    pub index: usize,
    /// `literal` or `composition`.
    pub kind: String,
    /// Interface or child count.
    pub len: usize,
    /// Content fingerprint (hex).
    pub fingerprint: String,
}

impl SegmentSummary {
    /// Summarizes `segment` at `index`.
    pub fn new(index: usize, segment: &Segment) -> Self {
        Self {
            index,
            kind: segment.kind().to_string(),
            len: segment.len(),
            fingerprint: segment.fingerprint().to_hex(),
        }
    }
}

/// Formats an ISD-AS for text output.
pub fn format_ia(ia: IsdAsn) -> String {
    format!("{ia} ({:#018x})", ia.as_u64())
}
