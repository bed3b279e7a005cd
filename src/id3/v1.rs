// ID3v1 tag implementation

use std::io::{Read, Seek, SeekFrom};

use serde::Serialize;

use super::genres::{genre_name, GENRE_NONE};
use crate::utils::encoding::{decode_text, encode_latin1_lossy, TextEncoding};

/// ID3v1 tag structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    pub track: Option<u8>,
    pub genre: u8,
}

impl Default for Id3v1Tag {
    fn default() -> Self {
        Id3v1Tag {
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            year: String::new(),
            comment: String::new(),
            track: None,
            genre: GENRE_NONE,
        }
    }
}

impl Id3v1Tag {
    pub const TAG_SIZE: usize = 128;
    const TAG_ID: [u8; 3] = [b'T', b'A', b'G'];

    /// Render the fixed 128-byte layout.
    ///
    /// With a track number the comment shrinks to 28 bytes and byte 125
    /// stays zero (ID3v1.1).
    pub fn to_bytes(&self) -> [u8; Self::TAG_SIZE] {
        let mut buffer = [0u8; Self::TAG_SIZE];
        buffer[0..3].copy_from_slice(&Self::TAG_ID);
        Self::put_string(&mut buffer[3..33], &self.title);
        Self::put_string(&mut buffer[33..63], &self.artist);
        Self::put_string(&mut buffer[63..93], &self.album);
        Self::put_string(&mut buffer[93..97], &self.year);

        match self.track {
            Some(track) if track != 0 => {
                Self::put_string(&mut buffer[97..125], &self.comment);
                buffer[126] = track;
            }
            _ => Self::put_string(&mut buffer[97..127], &self.comment),
        }

        buffer[127] = self.genre;
        buffer
    }

    /// Read the ID3v1 tag from the last 128 bytes of a stream
    pub fn read<R: Read + Seek>(reader: &mut R) -> std::io::Result<Option<Self>> {
        let size = reader.seek(SeekFrom::End(0))?;
        if size < Self::TAG_SIZE as u64 {
            return Ok(None);
        }

        reader.seek(SeekFrom::End(-(Self::TAG_SIZE as i64)))?;
        let mut buffer = [0u8; Self::TAG_SIZE];
        reader.read_exact(&mut buffer)?;
        Ok(Self::parse(&buffer))
    }

    /// Parse ID3v1 tag from buffer
    pub fn parse(buffer: &[u8; Self::TAG_SIZE]) -> Option<Self> {
        // Check for TAG identifier
        if buffer[0..3] != Self::TAG_ID {
            return None;
        }

        let title = Self::parse_string(&buffer[3..33]);
        let artist = Self::parse_string(&buffer[33..63]);
        let album = Self::parse_string(&buffer[63..93]);
        let year = Self::parse_string(&buffer[93..97]);

        // Check for ID3v1.1 track number
        let (comment, track) = if buffer[125] == 0 && buffer[126] != 0 {
            (Self::parse_string(&buffer[97..125]), Some(buffer[126]))
        } else {
            (Self::parse_string(&buffer[97..127]), None)
        };

        Some(Id3v1Tag {
            title,
            artist,
            album,
            year,
            comment,
            track,
            genre: buffer[127],
        })
    }

    pub fn genre_name(&self) -> Option<&'static str> {
        genre_name(self.genre)
    }

    fn put_string(field: &mut [u8], value: &str) {
        let encoded = encode_latin1_lossy(value);
        let len = encoded.len().min(field.len());
        field[..len].copy_from_slice(&encoded[..len]);
    }

    /// Parse null-terminated string
    fn parse_string(bytes: &[u8]) -> String {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = decode_text(&bytes[..end], TextEncoding::Iso8859_1);
        text.trim().to_string()
    }
}
