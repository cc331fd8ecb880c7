//! Encode command implementation.

use pathseg_codec::{encode_segments, IsdAsn, Segment};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::{load_cache, load_segments, CliError, SegmentSummary};

/// Encoding result.
#[derive(Debug, Serialize)]
pub struct EncodeResult {
    /// Output file.
    pub output: String,
    /// Message size in bytes.
    pub size: usize,
    /// Top-level segments requested.
    pub requested: usize,
    /// Records written, indexed after the cache.
    pub sent: Vec<SegmentSummary>,
}

/// Runs the encode command.
pub fn run(
    segments: &Path,
    old: Option<&Path>,
    src: u64,
    dst: u64,
    output: &Path,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let new = load_segments(segments)?;
    let cache = load_cache(old)?;
    let result = encode_to_file(&new, &cache, IsdAsn(src), IsdAsn(dst), output)?;
    info!(
        output = %output.display(),
        size = result.size,
        records = result.sent.len(),
        "wrote message"
    );

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!(
                "Wrote {} bytes to {} ({} segments, {} records)",
                result.size,
                result.output,
                result.requested,
                result.sent.len()
            );
            for sent in &result.sent {
                println!(
                    "  [{:>5}] {:<11} len={:<3} {}",
                    sent.index, sent.kind, sent.len, sent.fingerprint
                );
            }
        }
    }

    Ok(())
}

/// Encodes `new` against `cache` and writes the message to `output`.
pub fn encode_to_file(
    new: &[Segment],
    cache: &[Segment],
    src: IsdAsn,
    dst: IsdAsn,
    output: &Path,
) -> Result<EncodeResult, CliError> {
    let encoded = encode_segments(new, cache, src, dst)?;
    std::fs::write(output, &encoded.bytes).map_err(|source| CliError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    let sent = encoded
        .sent_segments
        .iter()
        .enumerate()
        .map(|(position, segment)| SegmentSummary::new(cache.len() + position, segment))
        .collect();

    Ok(EncodeResult {
        output: output.display().to_string(),
        size: encoded.bytes.len(),
        requested: new.len(),
        sent,
    })
}
