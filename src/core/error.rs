// Error handling for KS2 reader

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Ks2Error>;

#[derive(Error, Debug)]
pub enum Ks2Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid start datetime: {0:?}")]
    InvalidDatetime(String),

    #[error("Missing calibration: {0}")]
    MissingCalibration(String),

    #[error("Channel {channel} out of range (file has {available} channels)")]
    ChannelOutOfRange { channel: usize, available: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Ks2Error {
    /// True for every structural decode failure (malformed header, bad tag,
    /// unparsable datetime).
    pub fn is_format_error(&self) -> bool {
        matches!(self, Ks2Error::Format(_) | Ks2Error::InvalidDatetime(_))
    }
}
