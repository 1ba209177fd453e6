/// Errors that can occur on shared-memory segments.
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    /// The segment key cannot be used as an OS object name.
    #[error("invalid segment key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// A segment must hold at least one byte.
    #[error("segment {key:?} requested with zero size")]
    ZeroSize { key: String },

    /// Failed to create (or size, or map) a new segment.
    #[error("failed to create segment {key:?}: {source}")]
    Create {
        key: String,
        source: std::io::Error,
    },

    /// Failed to attach to an existing segment.
    #[error("failed to attach to segment {key:?}: {source}")]
    Attach {
        key: String,
        source: std::io::Error,
    },

    /// Failed to acquire the segment lock.
    #[error("failed to lock segment {key:?}: {source}")]
    Lock {
        key: String,
        source: std::io::Error,
    },

    /// Attempted to write through a read-only attachment.
    #[error("segment {key:?} is attached read-only")]
    ReadOnly { key: String },

    /// The copy does not fit in the mapped region.
    #[error("copy overruns segment {key:?} ({got} bytes into {capacity})")]
    CopyOverrun {
        key: String,
        capacity: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, ShmError>;
