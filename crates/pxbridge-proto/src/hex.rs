//! Lowercase hex encoding for binary substrings embedded in message fields.
//!
//! Layer names are caller-controlled bytes; hex keeps them clear of the
//! newline and comma delimiters without any escaping scheme.

use crate::error::{ProtoError, Result};

/// Encode bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    ::hex::encode(bytes)
}

/// Decode a hex string (either case) back to bytes.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    ::hex::decode(text).map_err(|_| ProtoError::InvalidHex(text.to_string()))
}
