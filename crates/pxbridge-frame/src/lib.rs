//! Length-prefixed message framing for the pxbridge control channel.
//!
//! Every command and response on the wire is framed as:
//! - A 4-byte big-endian unsigned payload length
//! - The raw payload bytes
//!
//! After fully consuming a response, the receiver writes the fixed 3-byte
//! acknowledgement token [`ACK`] and closes the connection. No partial
//! reads, no buffer management in user code; bounded waits surface as
//! [`FrameError::Timeout`] instead of hanging.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_message, encode_message, FrameConfig, ACK, DEFAULT_MAX_PAYLOAD, LEN_PREFIX};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
