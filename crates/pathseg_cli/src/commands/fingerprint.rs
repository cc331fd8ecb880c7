//! Fingerprint command implementation.

use pathseg_codec::Segment;
use std::path::Path;

use super::{load_segments, SegmentSummary};

/// Runs the fingerprint command.
pub fn run(segments: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let summaries = summarize(&load_segments(segments)?);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        _ => {
            for summary in &summaries {
                println!("{}  {} len={}", summary.fingerprint, summary.kind, summary.len);
            }
        }
    }

    Ok(())
}

/// Summarizes each segment at its position in the list.
pub fn summarize(segments: &[Segment]) -> Vec<SegmentSummary> {
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| SegmentSummary::new(index, segment))
        .collect()
}
