// ID3v2 tag implementation

use std::io::Read;

use crate::utils::io::{parse_synchsafe, synchsafe_bytes};

/// ID3v2 header structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3v2Header {
    pub version: (u8, u8),
    pub flags: u8,
    pub size: u32,
}

/// ID3v2 tag structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3v2Tag {
    pub header: Id3v2Header,
    pub frames: Vec<Id3Frame>,
}

/// ID3v2 frame structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3Frame {
    pub frame_id: String,
    pub flags: u16,
    pub data: Vec<u8>,
}

impl Id3v2Header {
    pub const HEADER_SIZE: usize = 10;
    const ID: [u8; 3] = [b'I', b'D', b'3'];

    /// Read ID3v2 header from reader
    pub fn read<R: Read>(reader: &mut R) -> std::io::Result<Option<Self>> {
        let mut buffer = [0u8; Self::HEADER_SIZE];
        reader.read_exact(&mut buffer)?;
        Ok(Self::parse(&buffer))
    }

    pub fn parse(buffer: &[u8; Self::HEADER_SIZE]) -> Option<Self> {
        // Check for ID3 identifier
        if buffer[0..3] != Self::ID {
            return None;
        }

        Some(Id3v2Header {
            version: (buffer[3], buffer[4]),
            flags: buffer[5],
            size: parse_synchsafe(&buffer[6..10]),
        })
    }

    /// Header plus body, i.e. the byte length of the whole tag.
    pub fn tag_size(&self) -> u64 {
        Self::HEADER_SIZE as u64 + self.size as u64
    }
}

impl Id3v2Tag {
    /// Major version this crate writes.
    pub const WRITE_VERSION: u8 = 3;

    /// Empty ID3v2.3 tag
    pub fn new() -> Self {
        Id3v2Tag {
            header: Id3v2Header {
                version: (Self::WRITE_VERSION, 0),
                flags: 0,
                size: 0,
            },
            frames: Vec::new(),
        }
    }

    /// Attach a frame. An existing frame with the same id is replaced in
    /// place, keeping its position.
    pub fn set_frame(&mut self, frame_id: &str, data: Vec<u8>) {
        match self.frames.iter_mut().find(|f| f.frame_id == frame_id) {
            Some(frame) => frame.data = data,
            None => self.frames.push(Id3Frame {
                frame_id: frame_id.to_string(),
                flags: 0,
                data,
            }),
        }
    }

    pub fn frame(&self, frame_id: &str) -> Option<&Id3Frame> {
        self.frames.iter().find(|f| f.frame_id == frame_id)
    }

    /// Serialize header, frames and `padding` zero bytes.
    pub fn to_bytes(&self, padding: usize) -> Vec<u8> {
        let body: usize = self.frames.iter().map(Id3Frame::encoded_len).sum::<usize>() + padding;

        let mut out = Vec::with_capacity(Id3v2Header::HEADER_SIZE + body);
        out.extend_from_slice(&Id3v2Header::ID);
        out.push(Self::WRITE_VERSION);
        out.push(0);
        out.push(0);
        out.extend_from_slice(&synchsafe_bytes(body as u32));

        for frame in &self.frames {
            frame.write_to(&mut out);
        }
        out.resize(Id3v2Header::HEADER_SIZE + body, 0);
        out
    }

    /// Read ID3v2 tag from reader
    pub fn read<R: Read>(reader: &mut R) -> std::io::Result<Option<Self>> {
        let header = match Id3v2Header::read(reader)? {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut body = vec![0u8; header.size as usize];
        reader.read_exact(&mut body)?;

        let mut frames = Vec::new();
        let mut offset = 0;
        while let Some((frame, used)) = Id3Frame::parse(&body[offset..], header.version) {
            offset += used;
            frames.push(frame);
        }

        Ok(Some(Id3v2Tag { header, frames }))
    }
}

impl Default for Id3v2Tag {
    fn default() -> Self {
        Self::new()
    }
}

impl Id3Frame {
    const FRAME_HEADER_SIZE: usize = 10;

    fn encoded_len(&self) -> usize {
        Self::FRAME_HEADER_SIZE + self.data.len()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.frame_id.as_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&self.data);
    }

    /// Parse one frame; returns it with the number of bytes it occupied.
    /// Stops at padding or a truncated frame.
    pub fn parse(buffer: &[u8], version: (u8, u8)) -> Option<(Self, usize)> {
        let header = buffer.get(..Self::FRAME_HEADER_SIZE)?;

        // Check for padding (all zeros)
        if header[0] == 0 {
            return None;
        }

        let frame_id = String::from_utf8_lossy(&header[0..4]).to_string();

        // Frame size parsing depends on version
        let size = if version.0 >= 4 {
            // ID3v2.4 uses synchsafe integers
            parse_synchsafe(&header[4..8])
        } else {
            // ID3v2.3 uses regular integers
            u32::from_be_bytes([header[4], header[5], header[6], header[7]])
        };

        let flags = u16::from_be_bytes([header[8], header[9]]);
        let end = Self::FRAME_HEADER_SIZE + size as usize;
        let data = buffer.get(Self::FRAME_HEADER_SIZE..end)?.to_vec();

        let frame = Id3Frame {
            frame_id,
            flags,
            data,
        };
        Some((frame, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn set_frame_replaces_in_place() {
        let mut tag = Id3v2Tag::new();
        tag.set_frame("TPE1", b"\0first".to_vec());
        tag.set_frame("TIT2", b"\0title".to_vec());
        tag.set_frame("TPE1", b"\0second".to_vec());

        let ids: Vec<_> = tag.frames.iter().map(|f| f.frame_id.as_str()).collect();
        assert_eq!(ids, vec!["TPE1", "TIT2"]);
        assert_eq!(tag.frame("TPE1").unwrap().data, b"\0second");
    }

    #[test]
    fn header_size_covers_frames_and_padding() {
        let mut tag = Id3v2Tag::new();
        tag.set_frame("TIT2", b"\0abc".to_vec());
        let bytes = tag.to_bytes(128);

        assert_eq!(&bytes[0..5], b"ID3\x03\x00");
        assert_eq!(bytes.len(), 10 + 14 + 128);
        let header = Id3v2Header::parse(bytes[..10].try_into().unwrap()).unwrap();
        assert_eq!(header.tag_size(), bytes.len() as u64);
        assert!(bytes[24..].iter().all(|&b| b == 0));
    }

    #[test]
    fn written_tag_reads_back() {
        let mut tag = Id3v2Tag::new();
        tag.set_frame("TIT2", b"\0abc".to_vec());
        tag.set_frame("TALB", b"\0xyz".to_vec());
        let bytes = tag.to_bytes(16);

        let parsed = Id3v2Tag::read(&mut Cursor::new(bytes)).unwrap().unwrap();
        assert_eq!(parsed.header.version, (3, 0));
        assert_eq!(parsed.frames, tag.frames);
    }

    #[test]
    fn non_id3_input_is_none() {
        let mut cursor = Cursor::new(b"TAG and some other bytes".to_vec());
        assert_eq!(Id3v2Tag::read(&mut cursor).unwrap(), None);
    }
}
