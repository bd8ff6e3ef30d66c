use thiserror::Error;

use crate::types::Channel;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("link I/O error while {context}: {source}")]
    Link {
        source: std::io::Error,
        context: String,
    },
    #[error("instrument response timed out")]
    Timeout,
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("malformed preamble on {channel}: {reason}")]
    MalformedPreamble { channel: Channel, reason: String },
    #[error("truncated data block on {channel}: expected {expected} bytes, got {actual}")]
    TruncatedBlock {
        channel: Channel,
        expected: usize,
        actual: usize,
    },
    #[error("{0} reports no waveform data")]
    ChannelUnavailable(Channel),
    #[error("no displayed channels detected")]
    NoChannelsSelected,
    #[error("invalid channel index {0}, expected 1..=4")]
    InvalidChannel(u8),
}

impl CaptureError {
    /// Wrap a transport-level failure with the operation it interrupted.
    pub fn link(context: impl Into<String>, source: std::io::Error) -> Self {
        CaptureError::Link {
            source,
            context: context.into(),
        }
    }
}
