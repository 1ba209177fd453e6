use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use pxbridge_frame::{FrameConfig, FrameReader, FrameWriter};
use pxbridge_transport::UnixDomainSocket;

use crate::error::Result;

/// The synchronous transport capability: send one command, receive one
/// response, fully blocking, one request in flight at a time.
///
/// Protocol logic only depends on this trait, so tests (or a future
/// channel-based transport) can stand in for the socket without touching
/// the bridge operations.
pub trait Exchange {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

/// Configuration for one socket exchange.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Bounded wait for the connection to complete.
    pub connect_timeout: Duration,
    /// Framing limits and per-phase read bounds.
    pub frame: FrameConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            frame: FrameConfig::default(),
        }
    }
}

/// [`Exchange`] over the host's Unix domain socket.
///
/// Each request opens a fresh connection: connect with a bounded wait,
/// write the length-prefixed command, read the length-prefixed response
/// under the header/payload bounds, write the acknowledgement token, close.
pub struct SocketExchange {
    path: PathBuf,
    config: ExchangeConfig,
}

impl SocketExchange {
    /// Exchange against the socket at `path` with default bounds.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, ExchangeConfig::default())
    }

    /// Exchange with explicit bounds.
    pub fn with_config(path: impl Into<PathBuf>, config: ExchangeConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// The endpoint this exchange connects to.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Exchange for SocketExchange {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let stream = UnixDomainSocket::connect_timeout(&self.path, self.config.connect_timeout)?;
        let reader_stream = stream.try_clone().map_err(crate::error::BridgeError::from)?;

        let mut reader = FrameReader::with_config_ipc(reader_stream, self.config.frame.clone())?;
        let mut writer = FrameWriter::with_config_ipc(stream, self.config.frame.clone())?;

        writer.send(request)?;
        let response = reader.read_response()?;

        // Best-effort: the response is already complete, so a failed ack
        // only costs the host a slightly less tidy teardown.
        if let Err(err) = writer.send_ack() {
            warn!(%err, "failed to acknowledge response");
        }
        if let Err(err) = writer.get_ref().shutdown() {
            debug!(%err, "connection shutdown failed");
        }

        debug!(
            request_len = request.len(),
            response_len = response.len(),
            "completed host exchange"
        );
        Ok(response.to_vec())
    }
}
