use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use pxbridge_transport::IpcStream;

use crate::codec::{decode_message, peek_declared_len, FrameConfig, LEN_PREFIX};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete length-prefixed messages from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete messages.
/// Timeouts configured on the underlying stream surface as
/// [`FrameError::Timeout`] so a silent host degrades to an error, never a
/// hang.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<Bytes> {
        loop {
            if let Some(message) = decode_message(&mut self.buf, self.config.max_payload_size)? {
                return Ok(message);
            }
            self.fill()?;
        }
    }

    /// Pull one chunk from the stream into the decode buffer.
    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(FrameError::Timeout(self.phase_timeout()))
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// The bounded wait in force for the current read phase.
    fn phase_timeout(&self) -> Duration {
        let timeout = if self.buf.len() < LEN_PREFIX {
            self.config.header_timeout
        } else {
            self.config.payload_timeout
        };
        timeout.unwrap_or(Duration::ZERO)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Create a reader for `IpcStream` and apply the header-phase timeout.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.header_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }

    /// Read one response with per-phase bounded waits.
    ///
    /// Waits for the 4-byte length prefix under `header_timeout`, then
    /// consumes the declared payload under `payload_timeout` per read.
    pub fn read_response(&mut self) -> Result<Bytes> {
        while peek_declared_len(&self.buf).is_none() {
            self.fill()?;
        }

        let declared = peek_declared_len(&self.buf).unwrap_or(0);
        if declared > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: declared,
                max: self.config.max_payload_size,
            });
        }

        self.inner
            .set_read_timeout(self.config.payload_timeout)
            .map_err(transport_to_frame_error)?;

        loop {
            if let Some(message) = decode_message(&mut self.buf, self.config.max_payload_size)? {
                return Ok(message);
            }
            self.fill()?;
        }
    }
}

fn transport_to_frame_error(err: pxbridge_transport::TransportError) -> FrameError {
    match err {
        pxbridge_transport::TransportError::Io(io)
        | pxbridge_transport::TransportError::Accept(io) => FrameError::Io(io),
        pxbridge_transport::TransportError::Bind { source, .. }
        | pxbridge_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Instant;

    use bytes::BufMut;

    use super::*;
    use crate::codec::encode_message;

    #[test]
    fn read_single_message() {
        let mut wire = BytesMut::new();
        encode_message(b"640,480", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let message = reader.read_message().unwrap();

        assert_eq!(message.as_ref(), b"640,480");
    }

    #[test]
    fn read_multiple_messages() {
        let mut wire = BytesMut::new();
        encode_message(b"one", &mut wire).unwrap();
        encode_message(b"two", &mut wire).unwrap();
        encode_message(b"three", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_message().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_message().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_message().unwrap().as_ref(), b"three");
    }

    #[test]
    fn read_message_with_large_payload() {
        let payload = vec![0xAB; 64 * 1024];
        let mut wire = BytesMut::new();
        encode_message(&payload, &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let message = reader.read_message().unwrap();

        assert_eq!(message.as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_message(b"slow", &mut wire).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let message = reader.read_message().unwrap();
        assert_eq!(message.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_message() {
        let mut partial = BytesMut::new();
        partial.put_u32(16);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn oversized_message_in_stream() {
        let mut wire = BytesMut::new();
        wire.put_u32(1024);

        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn would_block_maps_to_timeout() {
        let reader = WouldBlockReader;
        let mut framed = FrameReader::new(reader);
        let err = framed.read_message().unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));
    }

    struct WouldBlockReader;

    impl Read for WouldBlockReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_message(b"ok", &mut wire).unwrap();

        let reader = InterruptedThenData {
            state: 0,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let message = framed.read_message().unwrap();

        assert_eq!(message.as_ref(), b"ok");
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _ = reader.config();
        let _inner = reader.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(b"command=detach").unwrap();
        let message = reader.read_message().unwrap();

        assert_eq!(message.as_ref(), b"command=detach");
    }

    #[test]
    #[cfg(unix)]
    fn silent_host_times_out_within_bound() {
        let dir = std::env::temp_dir().join(format!(
            "pxbridge-frame-silent-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("test.sock");
        let listener = pxbridge_transport::UnixDomainSocket::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let connector = std::thread::spawn(move || {
            pxbridge_transport::UnixDomainSocket::connect(path_clone).unwrap()
        });
        // Accept and then never write anything.
        let _server_side = listener.accept().unwrap();
        let client = connector.join().unwrap();

        let cfg = FrameConfig {
            header_timeout: Some(Duration::from_millis(50)),
            payload_timeout: Some(Duration::from_millis(50)),
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config_ipc(client, cfg).unwrap();

        let start = Instant::now();
        let err = reader.read_response().unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "bounded read must not hang"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(unix)]
    fn phased_read_over_uds() {
        let dir = std::env::temp_dir().join(format!(
            "pxbridge-frame-phased-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("test.sock");
        let listener = pxbridge_transport::UnixDomainSocket::bind(&sock_path).unwrap();

        let server = std::thread::spawn(move || {
            let stream = listener.accept().unwrap();
            let mut writer = crate::writer::FrameWriter::new(stream);
            writer.send(b"key1,6c617965723031,4,2,2").unwrap();
        });

        let client = pxbridge_transport::UnixDomainSocket::connect(&sock_path).unwrap();
        let mut reader = FrameReader::with_config_ipc(client, FrameConfig::default()).unwrap();
        let message = reader.read_response().unwrap();
        assert_eq!(message.as_ref(), b"key1,6c617965723031,4,2,2");

        server.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
