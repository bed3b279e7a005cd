// ID3 frame definitions, builders and parsers

use crate::utils::encoding::{decode_text, TextEncoding, WideText};

/// Common ID3v2.3 frame identifiers
pub mod frame_ids {
    pub const TITLE: &str = "TIT2"; // Title/songname/content description
    pub const ARTIST: &str = "TPE1"; // Lead performer(s)/Soloist(s)
    pub const ALBUM_ARTIST: &str = "TPE2"; // Band/orchestra/accompaniment
    pub const ALBUM: &str = "TALB"; // Album/Movie/Show title
    pub const YEAR: &str = "TYER"; // Year
    pub const TRACK: &str = "TRCK"; // Track number/Position in set
    pub const GENRE: &str = "TCON"; // Content type
    pub const COMMENT: &str = "COMM"; // Comments
}

/// Language code written into COMM frames when none is known.
pub const UNKNOWN_LANGUAGE: [u8; 3] = *b"XXX";

/// Body of a text information frame holding wide text.
pub fn text_frame_body(text: &WideText) -> Vec<u8> {
    let mut body = vec![TextEncoding::Utf16 as u8];
    body.extend(text.to_le_bytes(false));
    body
}

/// Body of a COMM frame: encoding, language, terminated description, text.
pub fn comment_frame_body(description: &WideText, text: &WideText) -> Vec<u8> {
    let mut body = vec![TextEncoding::Utf16 as u8];
    body.extend_from_slice(&UNKNOWN_LANGUAGE);
    body.extend(description.to_le_bytes(true));
    body.extend(text.to_le_bytes(false));
    body
}

/// Decode text frame data
pub fn decode_text_frame(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }

    let encoding = TextEncoding::from_byte(data[0]);
    decode_text(&data[1..], encoding)
}

/// Decode a COMM frame, skipping language and description.
pub fn decode_comment_frame(data: &[u8]) -> String {
    if data.len() < 4 {
        return String::new();
    }

    let encoding = TextEncoding::from_byte(data[0]);
    let rest = &data[4..];
    let text_start = match encoding {
        TextEncoding::Utf16 | TextEncoding::Utf16BE => rest
            .chunks_exact(2)
            .position(|unit| unit == [0, 0])
            .map(|unit| unit * 2 + 2),
        TextEncoding::Iso8859_1 | TextEncoding::Utf8 => {
            rest.iter().position(|&b| b == 0).map(|end| end + 1)
        }
    };

    match text_start {
        Some(start) if start <= rest.len() => decode_text(&rest[start..], encoding),
        _ => String::new(),
    }
}
