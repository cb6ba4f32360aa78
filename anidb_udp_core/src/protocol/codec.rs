//! Datagram encoding and decoding
//!
//! Commands go out as a single UTF-8 datagram without a trailing newline.
//! Replies come back as one datagram of UTF-8 text.

use crate::protocol::MAX_PACKET_SIZE;
use crate::protocol::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};

/// Encode a rendered command line into a datagram
pub fn encode_command(command: &str) -> Result<Bytes> {
    if command.is_empty() {
        debug!("Attempted to encode empty command");
        return Err(ProtocolError::encoding("Empty command"));
    }

    if command.len() > MAX_PACKET_SIZE {
        debug!(
            "Command too large: {} bytes (max: {MAX_PACKET_SIZE})",
            command.len()
        );
        return Err(ProtocolError::packet_too_large(command.len(), MAX_PACKET_SIZE));
    }

    let mut buffer = BytesMut::with_capacity(command.len());
    buffer.put(command.as_bytes());
    Ok(buffer.freeze())
}

/// Decode a reply datagram into text
pub fn decode_datagram(data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Err(ProtocolError::decoding("Empty datagram"));
    }

    let text = std::str::from_utf8(data)
        .map_err(|e| ProtocolError::decoding(format!("Invalid UTF-8: {e}")))?;
    trace!("Decoded {} bytes", data.len());

    Ok(text.trim_end_matches(['\n', '\r']).to_string())
}
