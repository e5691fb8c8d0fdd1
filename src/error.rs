use crate::audio::AudioFormat;
use thiserror::Error;

/// Status of an output stream operation.
///
/// Sinks report failures through this type and the stream layers above them
/// forward it unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The compressed format has no burst configuration
    #[error("unsupported audio format {0}")]
    UnsupportedFormat(AudioFormat),

    /// The stream was used before a successful open
    #[error("stream not initialized")]
    NoInit,

    /// The sink does not implement the operation
    #[error("invalid operation")]
    InvalidOperation,

    /// A parameter was rejected
    #[error("bad value: {0}")]
    BadValue(String),

    /// The underlying device failed
    #[error("device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, Error>;
