//! lamepipe - streaming PCM to MP3 encoding with ID3 tagging.
//!
//! An [`EncoderSession`] takes interleaved stereo 16-bit PCM in chunks and
//! writes to any `Write + Seek` sink:
//!
//! 1. [`EncoderSession::begin_stream`] writes the leading ID3v1 or ID3v2 tag.
//! 2. [`EncoderSession::encode_chunk`] streams MP3 frames as they are produced.
//! 3. [`EncoderSession::end_stream`] flushes, appends an ID3v1 tag and patches
//!    the LAME Info frame over the start of the audio.
//!
//! ```no_run
//! use std::io::Cursor;
//! use lamepipe::{EncoderSession, EncoderSettings, MetadataTag, StreamFormat};
//!
//! let mut session = EncoderSession::new(EncoderSettings::default(), Cursor::new(Vec::new()));
//! let metadata = MetadataTag { title: Some("Silence".into()), ..MetadataTag::default() };
//! session.begin_stream(StreamFormat::stereo_16(44100), &metadata)?;
//! session.encode_chunk(&vec![0u8; 44100 * 4])?;
//! session.end_stream()?;
//! let mp3 = session.into_sink().into_inner();
//! # Ok::<(), lamepipe::EncoderError>(())
//! ```

pub mod codec;
pub mod error;
pub mod id3;
pub mod inspect;
pub mod mpeg;
pub mod pcm;
pub mod session;
pub mod settings;
pub mod tag;
pub mod utils;

pub use codec::{CodecStatus, Lame, Mp3Codec};
pub use error::{EncoderError, Result};
pub use inspect::{inspect, LeadingTag, StreamReport};
pub use pcm::PcmSource;
pub use session::{EncoderSession, StreamFormat, FRAME_BYTES, MAX_FRAMES_PER_PASS};
pub use settings::{EncoderSettings, Preset, SettingsSource};
pub use tag::{ComposedTags, MetadataTag, TagFormat};
pub use utils::encoding::WideText;
