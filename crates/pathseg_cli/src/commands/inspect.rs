//! Inspect command implementation.

use pathseg_codec::header::{RECORD_HEADER_LEN, SUBSEGMENT_REF_LEN};
use pathseg_codec::{decode_segments, MessageHeader, RecordFlags, Segment, SegmentKind, INTERFACE_LEN};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::{format_ia, load_cache, CliError, SegmentSummary};

/// Message inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Message size in bytes.
    pub size: usize,
    /// Declared header length.
    pub hdrlen: u8,
    /// Declared size of the index space.
    pub numsegs: u16,
    /// Source ISD-AS (packed).
    pub src_ia: u64,
    /// Destination ISD-AS (packed).
    pub dst_ia: u64,
    /// Receiver cache size the message was decoded against.
    pub cache_len: usize,
    /// Records carried by the message.
    pub records: Vec<RecordInfo>,
}

/// A single decoded record.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Segment summary; `index` is the position in the shared index space.
    #[serde(flatten)]
    pub segment: SegmentSummary,
    /// Whether the record is one of the message's top-level segments.
    pub accepted: bool,
}

/// Runs the inspect command.
pub fn run(file: &Path, old: Option<&Path>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let cache = load_cache(old)?;
    let result = inspect(&bytes, &cache)?;
    info!(
        file = %file.display(),
        records = result.records.len(),
        "inspected message"
    );

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Decodes `bytes` against `cache` and describes every record.
pub fn inspect(bytes: &[u8], cache: &[Segment]) -> Result<InspectResult, CliError> {
    let decoded = decode_segments(bytes, cache)?;
    let header = MessageHeader::parse(bytes)?;
    let accepted = accepted_flags(bytes, &header, decoded.new_segments.len());

    let records = decoded
        .new_segments
        .iter()
        .zip(accepted)
        .enumerate()
        .map(|(position, (segment, accepted))| RecordInfo {
            segment: SegmentSummary::new(cache.len() + position, segment),
            accepted,
        })
        .collect();

    Ok(InspectResult {
        size: bytes.len(),
        hdrlen: header.hdrlen,
        numsegs: header.numsegs,
        src_ia: header.src_ia.as_u64(),
        dst_ia: header.dst_ia.as_u64(),
        cache_len: cache.len(),
        records,
    })
}

/// Reads the accepted bit of each record. Only called on messages that
/// already decoded, so every record fits the buffer.
fn accepted_flags(bytes: &[u8], header: &MessageHeader, records: usize) -> Vec<bool> {
    let mut flags = Vec::with_capacity(records);
    let mut pos = usize::from(header.hdrlen);

    while flags.len() < records {
        let Some(raw) = bytes.get(pos..pos + RECORD_HEADER_LEN) else {
            break;
        };
        let record = RecordFlags::from_byte(raw[0]);
        let seglen = usize::from(raw[1]);
        let optlen = usize::from(u16::from_be_bytes([raw[2], raw[3]]));
        let unit = match record.kind {
            SegmentKind::Literal => INTERFACE_LEN,
            SegmentKind::Composition => SUBSEGMENT_REF_LEN,
        };
        pos += RECORD_HEADER_LEN + seglen * unit + optlen;
        flags.push(record.accepted);
    }

    flags
}

fn print_text_output(result: &InspectResult) {
    println!("Message");
    println!("=======");
    println!("Size:         {} bytes", result.size);
    println!("Header len:   {}", result.hdrlen);
    println!("numsegs:      {}", result.numsegs);
    println!("Source:       {}", format_ia(result.src_ia.into()));
    println!("Destination:  {}", format_ia(result.dst_ia.into()));
    println!("Cache:        {} segments", result.cache_len);
    println!();

    println!("Records ({})", result.records.len());
    println!("-------");
    for record in &result.records {
        println!(
            "  [{:>5}] {:<11} len={:<3} {} {}",
            record.segment.index,
            record.segment.kind,
            record.segment.len,
            if record.accepted { "accepted" } else { "        " },
            record.segment.fingerprint
        );
    }
}
