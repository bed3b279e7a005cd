use thiserror::Error;

/// Errors raised by an encoding session.
///
/// Every variant is fatal for the call that returns it. Bytes already
/// handed to the sink are not rolled back, so a stream that failed
/// mid-way must be discarded by the caller.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("unsupported input: {channels} channels, {bits_per_sample} bits")]
    UnsupportedFormat { channels: u16, bits_per_sample: u16 },

    #[error("encoder rejected its parameters (status {0})")]
    Initialization(i32),

    #[error("no live encoder for this operation")]
    NotInitialized,

    #[error("stream already started")]
    AlreadyStarted,

    #[error("encoding failed (status {0})")]
    Encode(i32),

    #[error("flushing the encoder failed (status {0})")]
    Flush(i32),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EncoderError>;
