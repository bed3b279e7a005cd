//! MPEG audio frame headers and the Info/Xing summary frame.
//!
//! Frame header structure (4 bytes):
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//!
//! A = sync (11 bits), B = MPEG version, C = layer, D = protection bit,
//! E = bitrate index, F = sample rate index, G = padding, H = private,
//! I = channel mode, J = mode extension, K = copyright, L = original,
//! M = emphasis.

use serde::Serialize;

use crate::utils::io::be_u32_at;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

/// Header of a layer III frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub protected: bool,
    pub channel_mode: ChannelMode,
    pub frame_size: usize,
}

// Bitrate lookup tables (kbps), index 0 = free, 15 = bad
const BITRATES_V1_L3: [u32; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];
const BITRATES_V2_L3: [u32; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
];

const SAMPLE_RATES_V1: [u32; 4] = [44100, 48000, 32000, 0];
const SAMPLE_RATES_V2: [u32; 4] = [22050, 24000, 16000, 0];
const SAMPLE_RATES_V25: [u32; 4] = [11025, 12000, 8000, 0];

impl FrameHeader {
    /// Parse a 4-byte layer III frame header.
    pub fn parse(header: [u8; 4]) -> Option<Self> {
        if header[0] != 0xFF || (header[1] & 0xE0) != 0xE0 {
            return None;
        }

        let version = match (header[1] >> 3) & 0x03 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return None,
        };

        // layer III only
        if (header[1] >> 1) & 0x03 != 0b01 {
            return None;
        }
        let protected = header[1] & 0x01 == 0;

        let bitrate_index = (header[2] >> 4) as usize;
        let bitrate_kbps = match version {
            MpegVersion::Mpeg1 => BITRATES_V1_L3[bitrate_index],
            MpegVersion::Mpeg2 | MpegVersion::Mpeg25 => BITRATES_V2_L3[bitrate_index],
        };
        if bitrate_kbps == 0 {
            return None;
        }

        let rate_index = ((header[2] >> 2) & 0x03) as usize;
        let sample_rate = match version {
            MpegVersion::Mpeg1 => SAMPLE_RATES_V1[rate_index],
            MpegVersion::Mpeg2 => SAMPLE_RATES_V2[rate_index],
            MpegVersion::Mpeg25 => SAMPLE_RATES_V25[rate_index],
        };
        if sample_rate == 0 {
            return None;
        }

        let padding = (header[2] >> 1) & 0x01 == 1;
        let channel_mode = match header[3] >> 6 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        let coefficient = match version {
            MpegVersion::Mpeg1 => 144_000,
            MpegVersion::Mpeg2 | MpegVersion::Mpeg25 => 72_000,
        };
        let frame_size = (coefficient * bitrate_kbps / sample_rate) as usize + usize::from(padding);

        Some(FrameHeader {
            version,
            bitrate_kbps,
            sample_rate,
            padding,
            protected,
            channel_mode,
            frame_size,
        })
    }

    /// Bytes of side information following the header (and CRC).
    pub fn side_info_len(&self) -> usize {
        match (self.version, self.channel_mode) {
            (MpegVersion::Mpeg1, ChannelMode::Mono) => 17,
            (MpegVersion::Mpeg1, _) => 32,
            (_, ChannelMode::Mono) => 9,
            (_, _) => 17,
        }
    }

    pub fn samples_per_frame(&self) -> u32 {
        match self.version {
            MpegVersion::Mpeg1 => 1152,
            MpegVersion::Mpeg2 | MpegVersion::Mpeg25 => 576,
        }
    }
}

/// Contents of an Info (CBR) or Xing (VBR) summary frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryFrame {
    pub header: FrameHeader,
    /// "Info" or "Xing".
    pub kind: String,
    pub frames: Option<u32>,
    pub bytes: Option<u32>,
    pub has_toc: bool,
    pub quality: Option<u32>,
    /// Encoder version string from the LAME extension, e.g. "LAME3.100".
    pub encoder: Option<String>,
}

impl SummaryFrame {
    const FLAG_FRAMES: u32 = 0x1;
    const FLAG_BYTES: u32 = 0x2;
    const FLAG_TOC: u32 = 0x4;
    const FLAG_QUALITY: u32 = 0x8;

    /// Parse the summary carried by the frame at the start of `data`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let header = FrameHeader::parse(data.get(..4)?.try_into().ok()?)?;
        let mut offset = 4 + if header.protected { 2 } else { 0 } + header.side_info_len();

        let kind = data.get(offset..offset + 4)?;
        if kind != b"Info" && kind != b"Xing" {
            return None;
        }
        let kind = String::from_utf8_lossy(kind).to_string();
        let flags = be_u32_at(data, offset + 4)?;
        offset += 8;

        let mut field = |flag: u32, len: usize| -> Option<Option<u32>> {
            if flags & flag == 0 {
                return Some(None);
            }
            let value = if len == 4 {
                be_u32_at(data, offset)?
            } else {
                0
            };
            offset += len;
            Some(Some(value))
        };
        let frames = field(Self::FLAG_FRAMES, 4)?;
        let bytes = field(Self::FLAG_BYTES, 4)?;
        let has_toc = field(Self::FLAG_TOC, 100)?.is_some();
        let quality = field(Self::FLAG_QUALITY, 4)?;

        let encoder = data
            .get(offset..offset + 9)
            .filter(|raw| raw.iter().all(|b| b.is_ascii_graphic() || *b == b' '))
            .filter(|raw| raw.iter().any(|b| b.is_ascii_alphabetic()))
            .map(|raw| String::from_utf8_lossy(raw).trim_end().to_string());

        Some(SummaryFrame {
            header,
            kind,
            frames,
            bytes,
            has_toc,
            quality,
            encoder,
        })
    }

    /// Playing time implied by the frame count.
    pub fn duration_secs(&self) -> Option<f64> {
        self.frames.map(|frames| {
            frames as f64 * self.header.samples_per_frame() as f64 / self.header.sample_rate as f64
        })
    }
}
