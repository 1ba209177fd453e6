use std::fmt;
use std::io;

use pxbridge::frame::FrameError;
use pxbridge::transport::TransportError;
use pxbridge::BridgeError;

// Exit codes follow sysexits/BSD conventions where one exists (64 usage,
// 124 timeout) with tool-specific codes in between.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        BridgeError::Transport(err) => transport_error(context, err),
        BridgeError::Frame(err) => frame_error(context, err),
        BridgeError::Proto(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        BridgeError::Shm(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        BridgeError::ShortSegment { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        BridgeError::ImageGeometry { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::ConnectTimeout { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn bridge_timeout_maps_to_timeout_code() {
        let err = bridge_error("x", BridgeError::Timeout(Duration::from_secs(1)));
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn proto_errors_map_to_data_invalid() {
        let err = bridge_error(
            "x",
            BridgeError::Proto(pxbridge::proto::ProtoError::MalformedExtent("z".into())),
        );
        assert_eq!(err.code, DATA_INVALID);
    }
}
