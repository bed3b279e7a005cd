//! PCM input: raw s16le or RIFF/WAVE, read in bounded chunks.

use std::io::{self, Cursor, Read};

use tracing::debug;

use crate::session::StreamFormat;
use crate::utils::io::{read_le_u16, read_le_u32};

/// PCM audio source with a known format.
pub struct PcmSource {
    reader: Box<dyn Read>,
    format: StreamFormat,
}

impl PcmSource {
    /// Wrap a reader. A leading RIFF/WAVE header is parsed and its format
    /// wins; otherwise the data is taken as raw PCM in `raw_format`.
    pub fn open<R: Read + 'static>(mut reader: R, raw_format: StreamFormat) -> io::Result<Self> {
        let mut magic = [0u8; 12];
        let got = read_up_to(&mut reader, &mut magic)?;

        if got == magic.len() && &magic[0..4] == b"RIFF" && &magic[8..12] == b"WAVE" {
            let (format, data_len) = read_wave_chunks(&mut reader)?;
            debug!(?format, data_len, "reading WAVE input");
            return Ok(PcmSource {
                reader: Box::new(reader.take(data_len as u64)),
                format,
            });
        }

        debug!(format = ?raw_format, "reading raw PCM input");
        let head = Cursor::new(magic[..got].to_vec());
        Ok(PcmSource {
            reader: Box::new(head.chain(reader)),
            format: raw_format,
        })
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Fill `buf` as far as possible; returns 0 only at end of input.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_up_to(&mut self.reader, buf)
    }
}

/// Walk chunks after "RIFF....WAVE" up to the start of "data".
fn read_wave_chunks<R: Read>(reader: &mut R) -> io::Result<(StreamFormat, u32)> {
    let mut format = None;

    loop {
        let mut id = [0u8; 4];
        reader.read_exact(&mut id)?;
        let size = read_le_u32(reader)?;

        match &id {
            b"fmt " => {
                if size < 16 {
                    return Err(invalid("fmt chunk too short"));
                }
                let _audio_format = read_le_u16(reader)?;
                let channels = read_le_u16(reader)?;
                let sample_rate = read_le_u32(reader)?;
                let _byte_rate = read_le_u32(reader)?;
                let _block_align = read_le_u16(reader)?;
                let bits_per_sample = read_le_u16(reader)?;
                skip(reader, padded(size) - 16)?;
                format = Some(StreamFormat {
                    sample_rate,
                    channels,
                    bits_per_sample,
                });
            }
            b"data" => {
                let format = format.ok_or_else(|| invalid("data chunk before fmt"))?;
                return Ok((format, size));
            }
            _ => skip(reader, padded(size))?,
        }
    }
}

fn padded(size: u32) -> u64 {
    size as u64 + (size as u64 & 1)
}

fn skip<R: Read>(reader: &mut R, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        let kind = io::ErrorKind::UnexpectedEof;
        return Err(io::Error::new(kind, "truncated WAVE chunk"));
    }
    Ok(())
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
