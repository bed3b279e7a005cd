// Text encoding utilities for tag fields

use encoding_rs::{mem, EncoderResult, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Byte-order mark, stored as the first unit of every wide-text buffer.
pub const BOM: u16 = 0xFEFF;

/// Text encoding types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    Iso8859_1 = 0,
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => TextEncoding::Iso8859_1,
            1 => TextEncoding::Utf16,
            2 => TextEncoding::Utf16BE,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Iso8859_1,
        }
    }
}

/// BOM-prefixed UTF-16 text for ID3v2 wide-character fields.
///
/// The buffer is over-allocated and null padded: unit 0 is the BOM, the
/// transcoded text follows, and everything after it is zero. `len` counts
/// the text units only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideText {
    units: Vec<u16>,
    len: usize,
}

impl WideText {
    /// Transcode a null-terminated UTF-8 string.
    ///
    /// Returns `None` for an absent input. Bytes after the first NUL are
    /// ignored and malformed sequences turn into U+FFFD, so this never fails.
    pub fn from_utf8(src: Option<&[u8]>) -> Option<Self> {
        let src = src?;
        let src = match src.iter().position(|&b| b == 0) {
            Some(end) => &src[..end],
            None => src,
        };

        let capacity = (src.len() + 1) * 4;
        let mut units = vec![0u16; capacity];
        units[0] = BOM;
        let len = mem::convert_utf8_to_utf16(src, &mut units[1..]);

        Some(WideText { units, len })
    }

    /// Whole buffer including the BOM and the null padding.
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Transcoded text without BOM or terminator.
    pub fn text_units(&self) -> &[u16] {
        &self.units[1..1 + self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// BOM and text as UTF-16LE bytes, optionally followed by a null unit.
    pub fn to_le_bytes(&self, terminated: bool) -> Vec<u8> {
        let end = 1 + self.len + usize::from(terminated);
        self.units[..end]
            .iter()
            .flat_map(|unit| unit.to_le_bytes())
            .collect()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.text_units())
    }
}

/// Encode to a single-byte Latin encoding for ID3v1 fields.
///
/// Characters with no mapping become `?`.
pub fn encode_latin1_lossy(text: &str) -> Vec<u8> {
    let mut encoder = WINDOWS_1252.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut buffer = [0u8; 256];
    let mut rest = text;

    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(rest, &mut buffer, true);
        out.extend_from_slice(&buffer[..written]);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => out.push(b'?'),
        }
    }

    out
}

/// Decode text with specified encoding
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> String {
    let text = match encoding {
        TextEncoding::Iso8859_1 => WINDOWS_1252.decode_without_bom_handling(data).0,
        TextEncoding::Utf16 => {
            // Detect BOM
            if data.len() >= 2 {
                if data[0..2] == [0xFF, 0xFE] {
                    UTF_16LE.decode_without_bom_handling(&data[2..]).0
                } else if data[0..2] == [0xFE, 0xFF] {
                    UTF_16BE.decode_without_bom_handling(&data[2..]).0
                } else {
                    UTF_16LE.decode_without_bom_handling(data).0
                }
            } else {
                return String::new();
            }
        }
        TextEncoding::Utf16BE => UTF_16BE.decode_without_bom_handling(data).0,
        TextEncoding::Utf8 => UTF_8.decode_without_bom_handling(data).0,
    };

    text.trim_end_matches('\0').to_string()
}
