use std::time::Duration;

/// Errors that can occur during message framing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing a message.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,

    /// A bounded wait expired before the message was complete.
    #[error("message exchange timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, FrameError>;
