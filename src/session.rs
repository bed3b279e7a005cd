//! One encode operation: leading tag, streamed audio, trailing tag and the
//! summary-frame patch.
//!
//! A session moves through three phases in strict order:
//!
//! ```text
//! begin_stream   [leading tag][ ... ]          audio start offset = tag length
//! encode_chunk   [leading tag][frames...]      appended as produced
//! end_stream     [leading tag][frames...][flush][ID3v1]
//!                             ^ summary frame overwrites [offset, offset + len)
//! ```
//!
//! The sink cursor is shared by all three phases, so one session must own
//! its sink exclusively.

use std::io::{Seek, SeekFrom, Write};

use tracing::{debug, error, info};

use crate::codec::{Lame, Mp3Codec};
use crate::error::{EncoderError, Result};
use crate::id3::Id3v1Tag;
use crate::settings::EncoderSettings;
use crate::tag::{ComposedTags, MetadataTag};

/// Bytes per stereo 16-bit frame.
pub const FRAME_BYTES: usize = 4;

/// Largest number of frames handed to the encoder in one pass.
pub const MAX_FRAMES_PER_PASS: usize = 4096;

/// Size of the reusable output staging buffer.
pub const STAGING_BUFFER_SIZE: usize = 65536;

/// Shape of the PCM that will be fed to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl StreamFormat {
    pub fn stereo_16(sample_rate: u32) -> Self {
        StreamFormat {
            sample_rate,
            channels: 2,
            bits_per_sample: 16,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.channels == 2 && self.bits_per_sample == 16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Streaming,
    Finished,
}

pub struct EncoderSession<W, C = Lame> {
    codec: Option<C>,
    sink: W,
    settings: EncoderSettings,
    sample_rate: u32,
    audio_start: u64,
    trailing_tag: Option<[u8; Id3v1Tag::TAG_SIZE]>,
    phase: Phase,
    staging: Box<[u8]>,
    pcm: Vec<i16>,
}

impl<W: Write + Seek> EncoderSession<W, Lame> {
    /// Session backed by libmp3lame. If the context cannot be allocated
    /// the session is still returned and every phase fails with
    /// [`EncoderError::NotInitialized`].
    pub fn new(settings: EncoderSettings, sink: W) -> Self {
        let codec = Lame::new(&settings);
        if codec.is_none() {
            error!("failed to construct LAME stream encoder");
        }
        Self::with_codec(codec, settings, sink)
    }
}

impl<W: Write + Seek, C: Mp3Codec> EncoderSession<W, C> {
    pub fn with_codec(codec: Option<C>, settings: EncoderSettings, sink: W) -> Self {
        EncoderSession {
            codec,
            sink,
            settings,
            sample_rate: 0,
            audio_start: 0,
            trailing_tag: None,
            phase: Phase::Idle,
            staging: vec![0u8; STAGING_BUFFER_SIZE].into_boxed_slice(),
            pcm: Vec::with_capacity(MAX_FRAMES_PER_PASS * 2),
        }
    }

    /// Configure the encoder, write the leading tag and remember where the
    /// audio starts. Returns the number of tag bytes written.
    pub fn begin_stream(&mut self, format: StreamFormat, metadata: &MetadataTag) -> Result<usize> {
        let codec = self.codec.as_mut().ok_or(EncoderError::NotInitialized)?;
        if self.phase != Phase::Idle {
            return Err(EncoderError::AlreadyStarted);
        }

        if !format.is_supported() {
            error!(
                channels = format.channels,
                bits = format.bits_per_sample,
                "invalid input format to encode"
            );
            return Err(EncoderError::UnsupportedFormat {
                channels: format.channels,
                bits_per_sample: format.bits_per_sample,
            });
        }

        codec
            .set_sample_rate(format.sample_rate)
            .map_err(|status| EncoderError::Initialization(status.0))?;

        let tags = ComposedTags::compose(metadata, self.settings.tag_format);

        codec.init_params().map_err(|status| {
            error!(%status, "encoder parameter initialization failed");
            EncoderError::Initialization(status.0)
        })?;

        let leading = tags.leading_bytes(self.settings.id3v2_padding);
        if !leading.is_empty() {
            self.sink.write_all(&leading)?;
            self.audio_start = leading.len() as u64;
        }

        self.trailing_tag = tags.trailing_bytes();
        self.sample_rate = format.sample_rate;
        self.phase = Phase::Streaming;

        debug!(
            sample_rate = format.sample_rate,
            tag_format = ?tags.format(),
            tag_bytes = leading.len(),
            "stream started"
        );
        Ok(leading.len())
    }

    /// Encode as many whole frames of `pcm` as it holds and stream the
    /// output to the sink. Returns the bytes consumed, always a multiple of
    /// [`FRAME_BYTES`]; a trailing partial frame is left for the caller to
    /// resubmit in front of its next chunk.
    pub fn encode_chunk(&mut self, pcm: &[u8]) -> Result<usize> {
        let codec = self.codec.as_mut().ok_or(EncoderError::NotInitialized)?;
        if self.phase != Phase::Streaming {
            return Err(EncoderError::NotInitialized);
        }

        let mut remaining = pcm;
        let mut consumed = 0;
        while remaining.len() >= FRAME_BYTES {
            let frames = (remaining.len() / FRAME_BYTES).min(MAX_FRAMES_PER_PASS);
            let (batch, rest) = remaining.split_at(frames * FRAME_BYTES);

            self.pcm.clear();
            self.pcm.extend(
                batch
                    .chunks_exact(2)
                    .map(|sample| i16::from_le_bytes([sample[0], sample[1]])),
            );

            let written = codec
                .encode_interleaved(&self.pcm, &mut self.staging)
                .map_err(|status| {
                    error!(%status, frames, "encoding failed");
                    EncoderError::Encode(status.0)
                })?;
            self.sink.write_all(&self.staging[..written])?;

            consumed += batch.len();
            remaining = rest;
        }

        Ok(consumed)
    }

    /// Drain the encoder, append the trailing ID3v1 tag and patch the
    /// summary frame over the start of the audio.
    pub fn end_stream(&mut self) -> Result<()> {
        let codec = self.codec.as_mut().ok_or(EncoderError::NotInitialized)?;
        if self.phase != Phase::Streaming {
            return Err(EncoderError::NotInitialized);
        }
        self.phase = Phase::Finished;

        // may return one more mp3 frame
        let written = codec.flush(&mut self.staging).map_err(|status| {
            error!(%status, "flushing the encoder failed");
            EncoderError::Flush(status.0)
        })?;
        self.sink.write_all(&self.staging[..written])?;

        if let Some(tag) = &self.trailing_tag {
            self.sink.write_all(tag)?;
        }

        let summary = codec.lametag_frame(&mut self.staging);
        if self.audio_start > 0 && summary > 0 {
            self.sink.seek(SeekFrom::Start(self.audio_start))?;
            self.sink.write_all(&self.staging[..summary])?;
            debug!(
                offset = self.audio_start,
                len = summary,
                "patched summary frame"
            );
        } else {
            debug!(
                offset = self.audio_start,
                len = summary,
                "summary frame patch skipped"
            );
        }
        self.sink.flush()?;

        info!(sample_rate = self.sample_rate, "stream finished");
        Ok(())
    }

    /// Byte offset where compressed audio begins; 0 until a leading tag
    /// has been written.
    pub fn audio_start(&self) -> u64 {
        self.audio_start
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecStatus;
    use crate::tag::TagFormat;
    use std::io::Cursor;

    const PLACEHOLDER: [u8; 8] = [0xFF, 0xFB, 0, 0, 0, 0, 0, 0];
    const SUMMARY: [u8; 8] = [0xFF, 0xFB, b'I', b'n', b'f', b'o', 1, 2];

    /// Echoes the low byte of every left sample, after a placeholder frame.
    #[derive(Default)]
    struct ScriptedCodec {
        batches: Vec<usize>,
        started: bool,
        fail_init: bool,
        fail_encode_at: Option<usize>,
        fail_flush: bool,
        summary_len: usize,
    }

    impl ScriptedCodec {
        fn new() -> Self {
            ScriptedCodec {
                summary_len: SUMMARY.len(),
                ..Default::default()
            }
        }
    }

    impl Mp3Codec for ScriptedCodec {
        fn set_sample_rate(&mut self, _sample_rate: u32) -> std::result::Result<(), CodecStatus> {
            Ok(())
        }

        fn init_params(&mut self) -> std::result::Result<(), CodecStatus> {
            if self.fail_init {
                Err(CodecStatus(-1))
            } else {
                Ok(())
            }
        }

        fn encode_interleaved(
            &mut self,
            pcm: &[i16],
            out: &mut [u8],
        ) -> std::result::Result<usize, CodecStatus> {
            if self.fail_encode_at == Some(self.batches.len()) {
                return Err(CodecStatus(-3));
            }
            self.batches.push(pcm.len() / 2);

            let mut n = 0;
            if !self.started {
                self.started = true;
                out[..PLACEHOLDER.len()].copy_from_slice(&PLACEHOLDER);
                n = PLACEHOLDER.len();
            }
            for frame in pcm.chunks_exact(2) {
                out[n] = frame[0] as u8;
                n += 1;
            }
            Ok(n)
        }

        fn flush(&mut self, out: &mut [u8]) -> std::result::Result<usize, CodecStatus> {
            if self.fail_flush {
                return Err(CodecStatus(-6));
            }
            out[..3].copy_from_slice(b"END");
            Ok(3)
        }

        fn lametag_frame(&mut self, out: &mut [u8]) -> usize {
            out[..self.summary_len].copy_from_slice(&SUMMARY[..self.summary_len]);
            self.summary_len
        }
    }

    type TestSession = EncoderSession<Cursor<Vec<u8>>, ScriptedCodec>;

    fn session(codec: ScriptedCodec, format: TagFormat) -> TestSession {
        let settings = EncoderSettings {
            tag_format: format,
            ..EncoderSettings::default()
        };
        EncoderSession::with_codec(Some(codec), settings, Cursor::new(Vec::new()))
    }

    fn metadata() -> MetadataTag {
        MetadataTag {
            title: Some("Title".into()),
            artist: Some("Artist".into()),
            genre: Some("Rock".into()),
            ..MetadataTag::default()
        }
    }

    fn stereo() -> StreamFormat {
        StreamFormat::stereo_16(44100)
    }

    fn frames(count: usize) -> Vec<u8> {
        (0..count)
            .flat_map(|i| {
                let left = (i as i16).to_le_bytes();
                [left[0], left[1], 0, 0]
            })
            .collect()
    }

    fn output(session: &TestSession) -> &[u8] {
        session.sink().get_ref()
    }

    #[test]
    fn whole_frames_are_consumed_in_one_pass() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();

        assert_eq!(s.encode_chunk(&frames(4096)).unwrap(), 4096 * 4);
        assert_eq!(s.codec.as_ref().unwrap().batches, vec![4096]);
    }

    #[test]
    fn large_chunks_are_split_at_the_frame_cap() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();

        assert_eq!(s.encode_chunk(&frames(10_000)).unwrap(), 40_000);
        assert_eq!(s.codec.as_ref().unwrap().batches, vec![4096, 4096, 1808]);
    }

    #[test]
    fn remainder_bytes_are_not_consumed() {
        for extra in 1..=3 {
            let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
            s.begin_stream(stereo(), &metadata()).unwrap();

            let mut chunk = frames(10);
            chunk.extend(std::iter::repeat(0x55).take(extra));
            assert_eq!(s.encode_chunk(&chunk).unwrap(), 40);
        }
    }

    #[test]
    fn chunk_smaller_than_a_frame_consumes_nothing() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();
        assert_eq!(s.encode_chunk(&[1, 2, 3]).unwrap(), 0);
        assert!(s.codec.as_ref().unwrap().batches.is_empty());
    }

    #[test]
    fn carried_remainder_matches_single_submission() {
        let stream = frames(5000);

        let mut whole = session(ScriptedCodec::new(), TagFormat::Legacy);
        whole.begin_stream(stereo(), &metadata()).unwrap();
        whole.encode_chunk(&stream).unwrap();
        whole.end_stream().unwrap();

        let mut split = session(ScriptedCodec::new(), TagFormat::Legacy);
        split.begin_stream(stereo(), &metadata()).unwrap();
        let mut carry = Vec::new();
        for chunk in stream.chunks(1001) {
            carry.extend_from_slice(chunk);
            let used = split.encode_chunk(&carry).unwrap();
            carry.drain(..used);
        }
        assert!(carry.is_empty());
        split.end_stream().unwrap();

        assert_eq!(output(&whole), output(&split));
    }

    #[test]
    fn unsupported_format_writes_nothing() {
        for (channels, bits_per_sample) in [(1, 16), (6, 16), (2, 24)] {
            let format = StreamFormat {
                channels,
                bits_per_sample,
                ..stereo()
            };
            let mut s = session(ScriptedCodec::new(), TagFormat::Extended);
            let err = s.begin_stream(format, &metadata()).unwrap_err();
            assert!(matches!(err, EncoderError::UnsupportedFormat { .. }));
            assert!(output(&s).is_empty());
            assert_eq!(s.audio_start(), 0);
            assert!(matches!(
                s.encode_chunk(&frames(1)),
                Err(EncoderError::NotInitialized)
            ));
        }
    }

    #[test]
    fn audio_start_equals_leading_tag_length() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Extended);
        let written = s.begin_stream(stereo(), &metadata()).unwrap();
        assert_eq!(s.audio_start(), written as u64);
        assert_eq!(output(&s).len(), written);
        assert_eq!(&output(&s)[..3], b"ID3");

        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        assert_eq!(s.begin_stream(stereo(), &metadata()).unwrap(), 128);
        assert_eq!(s.audio_start(), 128);
    }

    #[test]
    fn init_failure_is_reported() {
        let codec = ScriptedCodec {
            fail_init: true,
            ..ScriptedCodec::new()
        };
        let mut s = session(codec, TagFormat::Legacy);
        let err = s.begin_stream(stereo(), &metadata()).unwrap_err();
        assert!(matches!(err, EncoderError::Initialization(-1)));
        assert!(output(&s).is_empty());
    }

    #[test]
    fn missing_codec_is_not_initialized() {
        let mut s: TestSession =
            EncoderSession::with_codec(None, EncoderSettings::default(), Cursor::new(Vec::new()));
        assert!(matches!(
            s.begin_stream(stereo(), &metadata()),
            Err(EncoderError::NotInitialized)
        ));
        assert!(matches!(
            s.encode_chunk(&frames(4)),
            Err(EncoderError::NotInitialized)
        ));
        assert!(matches!(s.end_stream(), Err(EncoderError::NotInitialized)));
    }

    #[test]
    fn begin_twice_is_rejected() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();
        assert!(matches!(
            s.begin_stream(stereo(), &metadata()),
            Err(EncoderError::AlreadyStarted)
        ));
    }

    #[test]
    fn encode_failure_aborts_the_call() {
        let codec = ScriptedCodec {
            fail_encode_at: Some(1),
            ..ScriptedCodec::new()
        };
        let mut s = session(codec, TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();
        let err = s.encode_chunk(&frames(5000)).unwrap_err();
        assert!(matches!(err, EncoderError::Encode(-3)));
    }

    #[test]
    fn end_stream_layout_and_patch() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();
        s.encode_chunk(&frames(16)).unwrap();

        let before = output(&s).to_vec();
        assert_eq!(&before[128..136], &PLACEHOLDER);

        s.end_stream().unwrap();
        let out = output(&s);

        assert_eq!(&out[..128], &before[..128]);
        assert_eq!(&out[128..136], &SUMMARY);
        assert_eq!(&out[136..before.len()], &before[136..]);
        let tail = out.len() - 128;
        assert_eq!(&out[tail - 3..tail], b"END");
        assert_eq!(&out[tail..tail + 3], b"TAG");
        assert_eq!(out[out.len() - 1], 17);
    }

    #[test]
    fn no_patch_without_leading_tag() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        assert_eq!(
            s.begin_stream(stereo(), &MetadataTag::default()).unwrap(),
            0
        );
        s.encode_chunk(&frames(16)).unwrap();
        s.end_stream().unwrap();

        let out = output(&s);
        assert_eq!(&out[..8], &PLACEHOLDER);
        // placeholder + 16 echoed bytes + flush, no trailing tag
        assert_eq!(out.len(), 8 + 16 + 3);
    }

    #[test]
    fn no_patch_without_summary() {
        let codec = ScriptedCodec {
            summary_len: 0,
            ..ScriptedCodec::new()
        };
        let mut s = session(codec, TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();
        s.encode_chunk(&frames(4)).unwrap();
        s.end_stream().unwrap();
        assert_eq!(&output(&s)[128..136], &PLACEHOLDER);
    }

    #[test]
    fn flush_failure_skips_tag_and_patch() {
        let codec = ScriptedCodec {
            fail_flush: true,
            ..ScriptedCodec::new()
        };
        let mut s = session(codec, TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();
        s.encode_chunk(&frames(4)).unwrap();
        let before = output(&s).to_vec();

        assert!(matches!(s.end_stream(), Err(EncoderError::Flush(-6))));
        assert_eq!(output(&s), &before[..]);
    }

    #[test]
    fn operations_after_end_are_rejected() {
        let mut s = session(ScriptedCodec::new(), TagFormat::Legacy);
        s.begin_stream(stereo(), &metadata()).unwrap();
        s.end_stream().unwrap();
        assert!(matches!(
            s.encode_chunk(&frames(1)),
            Err(EncoderError::NotInitialized)
        ));
        assert!(matches!(s.end_stream(), Err(EncoderError::NotInitialized)));
    }
}
