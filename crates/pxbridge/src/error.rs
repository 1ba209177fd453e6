use std::time::Duration;

use pxbridge_frame::FrameError;
use pxbridge_proto::ProtoError;
use pxbridge_shm::ShmError;
use pxbridge_transport::TransportError;

/// Errors surfaced by bridge operations.
///
/// Failures are never degraded to empty or zero results; each operation
/// reports what went wrong, with [`BridgeError::Timeout`] as the distinct
/// "host did not answer within the bounded wait" kind so callers can tell
/// a silent host from a malformed one. The bounds themselves guarantee no
/// operation ever hangs.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A bounded wait (connect, header, or payload) expired.
    #[error("host exchange timed out after {0:?}")]
    Timeout(Duration),

    /// Control-channel transport failure.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// Message framing failure.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// The host's response text did not parse.
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// Shared-memory segment failure.
    #[error("shared memory error: {0}")]
    Shm(#[from] ShmError),

    /// A staged segment is smaller than its declared geometry.
    #[error("segment {key:?} holds {got} bytes, expected {expected}")]
    ShortSegment {
        key: String,
        expected: usize,
        got: usize,
    },

    /// An image buffer's sample count does not match its geometry.
    #[error(
        "image {name:?} has {got} samples, expected {expected} ({width}x{height}x{channels})"
    )]
    ImageGeometry {
        name: String,
        width: u32,
        height: u32,
        channels: u32,
        expected: usize,
        got: usize,
    },
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectTimeout { timeout, .. } => BridgeError::Timeout(timeout),
            other => BridgeError::Transport(other),
        }
    }
}

impl From<FrameError> for BridgeError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Timeout(duration) => BridgeError::Timeout(duration),
            other => BridgeError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_timeout_maps_to_timeout_kind() {
        let err: BridgeError = TransportError::ConnectTimeout {
            path: "/tmp/x.sock".into(),
            timeout: Duration::from_secs(1),
        }
        .into();
        assert!(matches!(err, BridgeError::Timeout(_)));
    }

    #[test]
    fn frame_timeout_maps_to_timeout_kind() {
        let err: BridgeError = FrameError::Timeout(Duration::from_secs(2)).into();
        assert!(matches!(err, BridgeError::Timeout(_)));
    }

    #[test]
    fn other_frame_errors_keep_their_kind() {
        let err: BridgeError = FrameError::ConnectionClosed.into();
        assert!(matches!(err, BridgeError::Frame(_)));
    }
}
