/// Errors that can occur while encoding or parsing protocol text.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// An extent response was not two comma-separated integers.
    #[error("malformed extent response {0:?}")]
    MalformedExtent(String),

    /// A layer-list line did not carry the expected fields.
    #[error("malformed layer line {line:?}: {reason}")]
    MalformedLayerLine { line: String, reason: &'static str },

    /// A hex-encoded field contained invalid characters or odd length.
    #[error("invalid hex field {0:?}")]
    InvalidHex(String),

    /// An integer mode selector outside the known range.
    #[error("unknown mode selector {0}")]
    UnknownMode(i32),

    /// A crop rectangle field failed to parse as a number.
    #[error("malformed crop rectangle {0:?}")]
    MalformedCropRect(String),
}

pub type Result<T> = std::result::Result<T, ProtoError>;
