//! Read back the layout of an encoded stream: leading tag, first audio
//! frame with its summary, trailing tag.

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom};

use serde::Serialize;

use crate::id3::frames::{decode_comment_frame, decode_text_frame, frame_ids};
use crate::id3::{Id3v1Tag, Id3v2Header, Id3v2Tag};
use crate::mpeg::{FrameHeader, SummaryFrame};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum LeadingTag {
    Id3v1(Id3v1Tag),
    Id3v2 {
        version: String,
        size: u64,
        fields: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamReport {
    pub size: u64,
    pub leading_tag: Option<LeadingTag>,
    pub audio_start: u64,
    pub first_frame: Option<FrameHeader>,
    pub summary: Option<SummaryFrame>,
    pub trailing_tag: Option<Id3v1Tag>,
}

pub fn inspect<R: Read + Seek>(reader: &mut R) -> io::Result<StreamReport> {
    let size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let (leading_tag, audio_start) = read_leading_tag(reader, size)?;

    let mut first_frame = None;
    let mut summary = None;
    if size >= audio_start + 4 {
        reader.seek(SeekFrom::Start(audio_start))?;
        let mut header = [0u8; 4];
        reader.read_exact(&mut header)?;
        if let Some(frame) = FrameHeader::parse(header) {
            let len = (frame.frame_size as u64).min(size - audio_start) as usize;
            let mut data = vec![0u8; len];
            data[..4].copy_from_slice(&header);
            reader.read_exact(&mut data[4..])?;
            summary = SummaryFrame::parse(&data);
            first_frame = Some(frame);
        }
    }

    let trailing_tag = if size >= audio_start + Id3v1Tag::TAG_SIZE as u64 {
        Id3v1Tag::read(reader)?
    } else {
        None
    };

    Ok(StreamReport {
        size,
        leading_tag,
        audio_start,
        first_frame,
        summary,
        trailing_tag,
    })
}

fn read_leading_tag<R: Read + Seek>(
    reader: &mut R,
    size: u64,
) -> io::Result<(Option<LeadingTag>, u64)> {
    if size >= Id3v2Header::HEADER_SIZE as u64 {
        if let Some(tag) = Id3v2Tag::read(reader)? {
            let fields = tag
                .frames
                .iter()
                .map(|frame| {
                    let value = if frame.frame_id == frame_ids::COMMENT {
                        decode_comment_frame(&frame.data)
                    } else {
                        decode_text_frame(&frame.data)
                    };
                    (frame.frame_id.clone(), value)
                })
                .collect();
            let leading = LeadingTag::Id3v2 {
                version: format!("2.{}.{}", tag.header.version.0, tag.header.version.1),
                size: tag.header.tag_size(),
                fields,
            };
            return Ok((Some(leading), tag.header.tag_size()));
        }
    }

    if size >= Id3v1Tag::TAG_SIZE as u64 {
        reader.seek(SeekFrom::Start(0))?;
        let mut buffer = [0u8; Id3v1Tag::TAG_SIZE];
        reader.read_exact(&mut buffer)?;
        if let Some(tag) = Id3v1Tag::parse(&buffer) {
            return Ok((Some(LeadingTag::Id3v1(tag)), Id3v1Tag::TAG_SIZE as u64));
        }
    }

    Ok((None, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_stream() {
        let report = inspect(&mut Cursor::new(Vec::new())).unwrap();
        assert_eq!(report.size, 0);
        assert!(report.leading_tag.is_none());
        assert!(report.first_frame.is_none());
        assert!(report.trailing_tag.is_none());
    }

    #[test]
    fn legacy_tag_then_frame() {
        let tag = Id3v1Tag {
            title: "T".into(),
            ..Id3v1Tag::default()
        };
        let mut data = tag.to_bytes().to_vec();
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        data.extend_from_slice(&frame);
        data.extend_from_slice(&tag.to_bytes());

        let report = inspect(&mut Cursor::new(data)).unwrap();
        assert_eq!(report.audio_start, 128);
        match report.leading_tag {
            Some(LeadingTag::Id3v1(t)) => assert_eq!(t.title, "T"),
            other => panic!("unexpected leading tag: {:?}", other),
        }
        assert_eq!(report.first_frame.unwrap().bitrate_kbps, 128);
        assert!(report.summary.is_none());
        assert_eq!(report.trailing_tag.unwrap().title, "T");
    }
}
