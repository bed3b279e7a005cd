// CLI configuration
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// lamepipe - PCM to MP3 encoder with ID3 tagging
#[derive(Parser, Debug)]
#[command(name = "lamepipe")]
#[command(about = "Encode PCM or WAV audio to tagged MP3", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode raw s16le PCM or a WAV file to MP3
    Encode(EncodeArgs),

    /// Show tags and summary frame of MP3 file(s)
    Inspect {
        /// MP3 file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// List the ID3v1 genre table
    Genres,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Input file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Output MP3 file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Encoder settings JSON (keys: bitrate, preset, id3version)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Bitrate step: kbps = 128 + 32 * N
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=6))]
    pub bitrate: Option<u8>,

    /// Quality preset, overrides the bitrate
    #[arg(short, long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Leading tag version: 1 (ID3v1) or 2 (ID3v2 with UTF-16 text)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub id3_version: Option<u8>,

    /// Sample rate of raw PCM input (ignored for WAV)
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// Bytes read from the input per chunk
    #[arg(long, default_value_t = 65536)]
    #[arg(value_parser = clap::value_parser!(u32).range(4..))]
    pub chunk_size: u32,

    /// Metadata JSON file; flags below override its fields
    #[arg(short, long, value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    #[command(flatten)]
    pub tags: TagArgs,
}

#[derive(Args, Debug, Default)]
pub struct TagArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub artist: Option<String>,
    #[arg(long)]
    pub album: Option<String>,
    #[arg(long)]
    pub album_artist: Option<String>,
    #[arg(long)]
    pub year: Option<String>,
    #[arg(long)]
    pub track: Option<u32>,
    #[arg(long)]
    pub genre: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Medium,
    Standard,
    Extreme,
}

impl PresetArg {
    /// Index as understood by the `preset` setting.
    pub fn index(self) -> i64 {
        match self {
            PresetArg::Medium => 0,
            PresetArg::Standard => 1,
            PresetArg::Extreme => 2,
        }
    }
}
