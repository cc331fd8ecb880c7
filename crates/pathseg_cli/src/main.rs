//! pathseg CLI
//!
//! Command-line tools for path segment messages.
//!
//! # Commands
//!
//! - `inspect` - Decode a message and list its records
//! - `encode` - Encode a JSON segment list into a message file
//! - `fingerprint` - Print segment fingerprints

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// pathseg command-line message tools.
#[derive(Parser)]
#[command(name = "pathseg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a message and list its records
    Inspect {
        /// Message file
        file: PathBuf,

        /// JSON file with the receiver cache
        #[arg(long)]
        old: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Encode a JSON segment list into a message file
    Encode {
        /// JSON file with the segments to send
        #[arg(short, long)]
        segments: PathBuf,

        /// JSON file with the receiver cache
        #[arg(long)]
        old: Option<PathBuf>,

        /// Source ISD-AS (decimal, 0x-hex, or isd-asn)
        #[arg(long, value_parser = commands::parse_isd_asn)]
        src: u64,

        /// Destination ISD-AS (decimal, 0x-hex, or isd-asn)
        #[arg(long, value_parser = commands::parse_isd_asn)]
        dst: u64,

        /// Output message file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print segment fingerprints
    Fingerprint {
        /// JSON file with the segments
        #[arg(short, long)]
        segments: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { file, old, format } => {
            commands::inspect::run(&file, old.as_deref(), &format)?;
        }
        Commands::Encode {
            segments,
            old,
            src,
            dst,
            output,
            format,
        } => {
            commands::encode::run(&segments, old.as_deref(), src, dst, &output, &format)?;
        }
        Commands::Fingerprint { segments, format } => {
            commands::fingerprint::run(&segments, &format)?;
        }
        Commands::Version => {
            println!("pathseg CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
