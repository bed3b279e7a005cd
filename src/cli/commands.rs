// CLI command implementations
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use lamepipe::id3::genres::GENRES;
use lamepipe::{inspect, EncoderSession, EncoderSettings, MetadataTag, PcmSource, StreamFormat};

use crate::cli::config::{EncodeArgs, TagArgs};
use crate::cli::output::OutputFormatter;

#[derive(Serialize)]
struct EncodeReport<'a> {
    output: &'a Path,
    input_bytes: u64,
    dropped_bytes: usize,
    output_bytes: u64,
    audio_start: u64,
    duration_secs: f64,
}

/// Encode PCM/WAV input to a tagged MP3 file.
///
/// A failed encode leaves a truncated file behind, so it is removed.
pub fn command_encode(args: &EncodeArgs, formatter: &OutputFormatter) -> Result<()> {
    let settings = load_settings(args)?;
    let metadata = load_metadata(args.metadata.as_deref(), &args.tags)?;

    let input: Box<dyn Read> = if args.input == "-" {
        Box::new(io::stdin())
    } else {
        let file = File::open(&args.input)
            .with_context(|| format!("cannot open {}", args.input))?;
        Box::new(BufReader::new(file))
    };
    let source = PcmSource::open(input, StreamFormat::stereo_16(args.sample_rate))
        .with_context(|| format!("cannot read input header from {}", args.input))?;

    let result = encode(source, settings, &metadata, args);
    if result.is_err() && args.output.exists() {
        warn!(path = %args.output.display(), "removing partial output");
        let _ = fs::remove_file(&args.output);
    }
    let report = result?;

    let message = format!("Encoded {} -> {}", args.input, args.output.display());
    formatter.print_success(&message);
    if !formatter.is_quiet() {
        formatter.output(&report, &mut io::stdout())?;
    }
    Ok(())
}

fn encode<'a>(
    mut source: PcmSource,
    settings: EncoderSettings,
    metadata: &MetadataTag,
    args: &'a EncodeArgs,
) -> Result<EncodeReport<'a>> {
    let format = source.format();
    let file = File::create(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;

    let mut session = EncoderSession::new(settings, BufWriter::new(file));
    session
        .begin_stream(format, metadata)
        .context("cannot start stream")?;

    let mut buffer = vec![0u8; args.chunk_size as usize];
    let mut carry = 0;
    let mut input_bytes = 0u64;
    loop {
        let read = source.read_chunk(&mut buffer[carry..])?;
        if read == 0 {
            break;
        }
        let filled = carry + read;
        let used = session.encode_chunk(&buffer[..filled])?;
        buffer.copy_within(used..filled, 0);
        carry = filled - used;
        input_bytes += used as u64;
    }
    if carry > 0 {
        warn!(bytes = carry, "dropping trailing partial frame");
    }

    session.end_stream().context("cannot finish stream")?;
    let audio_start = session.audio_start();
    let file = session
        .into_sink()
        .into_inner()
        .map_err(|e| e.into_error())
        .context("cannot flush output")?;
    let output_bytes = file.metadata()?.len();

    let frames = input_bytes / lamepipe::FRAME_BYTES as u64;
    info!(frames, output_bytes, "encode complete");

    Ok(EncodeReport {
        output: &args.output,
        input_bytes,
        dropped_bytes: carry,
        output_bytes,
        audio_start,
        duration_secs: frames as f64 / format.sample_rate.max(1) as f64,
    })
}

/// Settings file first, then command-line overrides.
fn load_settings(args: &EncodeArgs) -> Result<EncoderSettings> {
    let mut settings = match &args.settings {
        Some(path) => EncoderSettings::from_json_file(path)
            .with_context(|| format!("cannot load settings from {}", path.display()))?,
        None => EncoderSettings::default(),
    };

    let mut overrides: HashMap<String, i64> = HashMap::new();
    if let Some(bitrate) = args.bitrate {
        overrides.insert("bitrate".into(), bitrate.into());
    }
    if let Some(preset) = args.preset {
        overrides.insert("preset".into(), preset.index());
    }
    if let Some(version) = args.id3_version {
        overrides.insert("id3version".into(), version.into());
    }
    settings.apply(&overrides);
    Ok(settings)
}

fn load_metadata(path: Option<&Path>, tags: &TagArgs) -> Result<MetadataTag> {
    let mut metadata = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("cannot read metadata from {}", path.display()))?;
            serde_json::from_str(&json).context("invalid metadata JSON")?
        }
        None => MetadataTag::default(),
    };

    let overrides = [
        (&mut metadata.title, &tags.title),
        (&mut metadata.artist, &tags.artist),
        (&mut metadata.album, &tags.album),
        (&mut metadata.album_artist, &tags.album_artist),
        (&mut metadata.year, &tags.year),
        (&mut metadata.genre, &tags.genre),
        (&mut metadata.comment, &tags.comment),
    ];
    for (field, value) in overrides {
        if value.is_some() {
            field.clone_from(value);
        }
    }
    if tags.track.is_some() {
        metadata.track = tags.track;
    }

    Ok(metadata)
}

/// Show tags and summary frame of encoded files
pub fn command_inspect(files: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    let mut failures = 0;

    for path in files {
        let report = File::open(path)
            .map(BufReader::new)
            .and_then(|mut reader| inspect(&mut reader));

        match report {
            Ok(report) => {
                formatter.print_info(&path.display().to_string());
                formatter.output(&report, &mut io::stdout())?;
            }
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} files failed", failures, files.len());
    }
    Ok(())
}

/// List the genre table
pub fn command_genres(formatter: &OutputFormatter) -> Result<()> {
    #[derive(Serialize)]
    struct Genre {
        index: usize,
        name: &'static str,
    }

    let genres: Vec<Genre> = GENRES
        .iter()
        .enumerate()
        .map(|(index, &name)| Genre { index, name })
        .collect();
    formatter.output(&genres, &mut io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_metadata_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"{"title": "From file", "album": "Kept", "track": 2}"#;
        file.write_all(json.as_bytes()).unwrap();

        let tags = TagArgs {
            title: Some("From flag".into()),
            track: Some(9),
            ..TagArgs::default()
        };
        let metadata = load_metadata(Some(file.path()), &tags).unwrap();
        assert_eq!(metadata.title.as_deref(), Some("From flag"));
        assert_eq!(metadata.album.as_deref(), Some("Kept"));
        assert_eq!(metadata.track, Some(9));
    }

    #[test]
    fn metadata_defaults_to_empty() {
        let metadata = load_metadata(None, &TagArgs::default()).unwrap();
        assert_eq!(metadata, MetadataTag::default());
    }
}
