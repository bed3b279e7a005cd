//! Tag composition: turns caller metadata into the leading and trailing tag
//! bytes of an encoded stream.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::id3::frames::{comment_frame_body, frame_ids, text_frame_body};
use crate::id3::genres::{genre_name, lookup_genre, GENRE_OTHER};
use crate::id3::{Id3v1Tag, Id3v2Tag};
use crate::utils::encoding::WideText;

/// Metadata supplied by the caller for one stream. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataTag {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub year: Option<String>,
    pub track: Option<u32>,
    pub genre: Option<String>,
    pub comment: Option<String>,
}

/// Which tag goes in front of the audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagFormat {
    /// 128-byte ID3v1.1 block.
    #[default]
    Legacy,
    /// ID3v2.3 block with UTF-16 text frames.
    Extended,
}

impl TagFormat {
    /// Map the `id3version` setting; only 2 selects the extended format.
    pub fn from_version(version: i64) -> Self {
        if version == 2 {
            TagFormat::Extended
        } else {
            TagFormat::Legacy
        }
    }

}

/// Tags built once at stream start.
#[derive(Debug, Clone)]
pub struct ComposedTags {
    format: TagFormat,
    v1: Id3v1Tag,
    v2: Option<Id3v2Tag>,
    changed: bool,
    v1_content: bool,
}

impl ComposedTags {
    pub fn compose(metadata: &MetadataTag, format: TagFormat) -> Self {
        let title = present(&metadata.title);
        let artist = present(&metadata.artist);
        let album = present(&metadata.album);
        let year = present(&metadata.year);
        let track = metadata.track.map(|t| t.to_string());
        let genre = present(&metadata.genre).map(resolve_genre);
        let album_artist = present(&metadata.album_artist);
        let comment = present(&metadata.comment);

        let mut v1 = Id3v1Tag {
            title: title.unwrap_or_default().to_string(),
            artist: artist.unwrap_or_default().to_string(),
            album: album.unwrap_or_default().to_string(),
            year: year.unwrap_or_default().to_string(),
            ..Id3v1Tag::default()
        };
        v1.track = metadata
            .track
            .and_then(|t| u8::try_from(t).ok())
            .filter(|&t| t != 0);
        if let Some(index) = genre {
            v1.genre = index;
        }

        let v1_content = title.is_some()
            || artist.is_some()
            || album.is_some()
            || year.is_some()
            || v1.track.is_some()
            || genre.is_some();
        let changed = match format {
            TagFormat::Legacy => v1_content,
            TagFormat::Extended => {
                v1_content || track.is_some() || album_artist.is_some() || comment.is_some()
            }
        };

        let v2 = match format {
            TagFormat::Legacy => None,
            TagFormat::Extended => {
                let mut tag = Id3v2Tag::new();
                let genre = genre.and_then(genre_name);
                // Artist goes in twice; the second write lands on the first frame.
                attach_text(&mut tag, frame_ids::ARTIST, artist);
                attach_text(&mut tag, frame_ids::TITLE, title);
                attach_text(&mut tag, frame_ids::ARTIST, artist);
                attach_text(&mut tag, frame_ids::ALBUM_ARTIST, album_artist);
                attach_text(&mut tag, frame_ids::ALBUM, album);
                attach_text(&mut tag, frame_ids::YEAR, year);
                attach_text(&mut tag, frame_ids::TRACK, track.as_deref());
                attach_text(&mut tag, frame_ids::GENRE, genre);
                attach_comment(&mut tag, comment);
                Some(tag)
            }
        };

        debug!(?format, changed, v1_content, "composed tags");
        ComposedTags {
            format,
            v1,
            v2,
            changed,
            v1_content,
        }
    }

    pub fn format(&self) -> TagFormat {
        self.format
    }

    /// Bytes written before the audio. Empty when the selected format has
    /// nothing to carry.
    pub fn leading_bytes(&self, padding: usize) -> Vec<u8> {
        if !self.changed {
            return Vec::new();
        }
        match &self.v2 {
            Some(tag) => tag.to_bytes(padding),
            None => self.v1.to_bytes().to_vec(),
        }
    }

    /// ID3v1 block appended after the audio, if any ID3v1 field is set.
    pub fn trailing_bytes(&self) -> Option<[u8; Id3v1Tag::TAG_SIZE]> {
        self.v1_content.then(|| self.v1.to_bytes())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn resolve_genre(value: &str) -> u8 {
    lookup_genre(value).unwrap_or_else(|| {
        warn!(genre = value, "unknown genre, using Other");
        GENRE_OTHER
    })
}

fn attach_text(tag: &mut Id3v2Tag, frame_id: &str, value: Option<&str>) {
    let Some(wide) = value.and_then(|v| WideText::from_utf8(Some(v.as_bytes()))) else {
        return;
    };
    tag.set_frame(frame_id, text_frame_body(&wide));
}

fn attach_comment(tag: &mut Id3v2Tag, value: Option<&str>) {
    let (Some(description), Some(text)) = (
        WideText::from_utf8(Some(b"")),
        value.and_then(|v| WideText::from_utf8(Some(v.as_bytes()))),
    ) else {
        return;
    };
    tag.set_frame(frame_ids::COMMENT, comment_frame_body(&description, &text));
}
