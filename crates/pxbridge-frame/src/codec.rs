use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Size of the length prefix: a 4-byte big-endian unsigned integer.
pub const LEN_PREFIX: usize = 4;

/// Acknowledgement token written by the receiver after a full response.
pub const ACK: &[u8; 3] = b"ack";

/// Default maximum payload size: 16 MiB.
///
/// Control messages are small textual lists; pixel data never travels over
/// the control channel, so this is a generous desync guard rather than a
/// capacity limit.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────────────┐
/// │ Length (4B BE) │ Payload (Length bytes) │
/// └──────────────┴─────────────────┘
/// ```
pub fn encode_message(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(LEN_PREFIX + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer.
pub fn decode_message(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < LEN_PREFIX {
        return Ok(None); // Need more data
    }

    let payload_len = u32::from_be_bytes(src[0..LEN_PREFIX].try_into().unwrap()) as usize;

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = LEN_PREFIX + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(LEN_PREFIX);
    Ok(Some(src.split_to(payload_len).freeze()))
}

/// Peek the declared payload length without consuming the prefix.
///
/// Returns `None` until the full prefix is buffered.
pub fn peek_declared_len(src: &BytesMut) -> Option<usize> {
    if src.len() < LEN_PREFIX {
        return None;
    }
    Some(u32::from_be_bytes(src[0..LEN_PREFIX].try_into().unwrap()) as usize)
}

/// Configuration for the message codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Bounded wait while the 4-byte length prefix is outstanding.
    pub header_timeout: Option<Duration>,
    /// Bounded per-read wait while the declared payload is being consumed.
    pub payload_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            header_timeout: Some(Duration::from_secs(1)),
            payload_timeout: Some(Duration::from_secs(2)),
            write_timeout: Some(Duration::from_secs(1)),
        }
    }
}
