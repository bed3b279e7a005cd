//! The MP3 encoder behind a session.
//!
//! [`Mp3Codec`] is the contract the session drives; [`Lame`] implements it
//! on top of libmp3lame and owns the native handle for its whole lifetime.

use std::os::raw::c_int;
use std::ptr::NonNull;

use mp3lame_sys as ffi;
use thiserror::Error;
use tracing::debug;

use crate::settings::EncoderSettings;

/// Negative status reported by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("encoder returned status {0}")]
pub struct CodecStatus(pub i32);

/// Incremental MP3 encoder operating on interleaved stereo 16-bit PCM.
///
/// Output is written into a caller buffer and the number of bytes produced
/// is returned; zero is a valid result while the encoder is buffering.
pub trait Mp3Codec {
    fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), CodecStatus>;

    /// Validate and freeze parameters. Must succeed before any encode call.
    fn init_params(&mut self) -> Result<(), CodecStatus>;

    /// `pcm` holds `pcm.len() / 2` stereo frames, left sample first.
    fn encode_interleaved(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize, CodecStatus>;

    /// Emit whatever samples are still buffered as final frames.
    fn flush(&mut self, out: &mut [u8]) -> Result<usize, CodecStatus>;

    /// Summary (Info/Xing) frame describing the finished stream; 0 if none.
    fn lametag_frame(&mut self, out: &mut [u8]) -> usize;
}

/// Owned libmp3lame context. `lame_close` runs on drop.
#[derive(Debug)]
pub struct Lame {
    inner: NonNull<ffi::lame_global_flags>,
}

// The context has no thread affinity; exclusive ownership is enforced by `&mut self`.
unsafe impl Send for Lame {}

impl Lame {
    /// Allocate a context configured for stereo input at the selected
    /// preset or bitrate. Returns `None` if LAME cannot allocate.
    pub fn new(settings: &EncoderSettings) -> Option<Self> {
        let inner = NonNull::new(unsafe { ffi::lame_init() })?;
        let lame = Lame { inner };

        unsafe {
            ffi::lame_set_num_channels(lame.ptr(), 2);
            match settings.preset {
                Some(preset) => {
                    ffi::lame_set_preset(lame.ptr(), preset.lame_id() as c_int);
                }
                None => {
                    ffi::lame_set_brate(lame.ptr(), settings.bitrate_kbps() as c_int);
                }
            }
            // Tags are composed and placed by the session.
            ffi::lame_set_write_id3tag_automatic(lame.ptr(), 0);
        }

        debug!(
            preset = ?settings.preset,
            kbps = settings.bitrate_kbps(),
            "allocated LAME context"
        );
        Some(lame)
    }

    #[inline(always)]
    fn ptr(&self) -> *mut ffi::lame_global_flags {
        self.inner.as_ptr()
    }
}

impl Mp3Codec for Lame {
    fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), CodecStatus> {
        let rate = c_int::try_from(sample_rate).unwrap_or(c_int::MAX);
        let res = unsafe { ffi::lame_set_in_samplerate(self.ptr(), rate) };
        status(res).map(drop)
    }

    fn init_params(&mut self) -> Result<(), CodecStatus> {
        let res = unsafe { ffi::lame_init_params(self.ptr()) };
        status(res).map(drop)
    }

    fn encode_interleaved(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize, CodecStatus> {
        let frames = c_int::try_from(pcm.len() / 2).map_err(|_| CodecStatus(-1))?;
        let out_len = c_int::try_from(out.len()).unwrap_or(c_int::MAX);
        // LAME reads the interleaved input without modifying it.
        let res = unsafe {
            ffi::lame_encode_buffer_interleaved(
                self.ptr(),
                pcm.as_ptr() as *mut _,
                frames,
                out.as_mut_ptr() as *mut _,
                out_len,
            )
        };
        status(res)
    }

    fn flush(&mut self, out: &mut [u8]) -> Result<usize, CodecStatus> {
        let out_len = c_int::try_from(out.len()).unwrap_or(c_int::MAX);
        let res = unsafe {
            ffi::lame_encode_flush(self.ptr(), out.as_mut_ptr() as *mut _, out_len)
        };
        status(res)
    }

    fn lametag_frame(&mut self, out: &mut [u8]) -> usize {
        let len = unsafe {
            ffi::lame_get_lametag_frame(self.ptr(), out.as_mut_ptr() as *mut _, out.len() as _)
        } as usize;
        // A frame larger than the buffer is reported by size but not copied.
        if len > out.len() { 0 } else { len }
    }
}

impl Drop for Lame {
    fn drop(&mut self) {
        unsafe {
            ffi::lame_close(self.ptr());
        }
    }
}

fn status(res: c_int) -> Result<usize, CodecStatus> {
    usize::try_from(res).map_err(|_| CodecStatus(res))
}
