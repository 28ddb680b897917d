//! Ingress frame body: `[u16 BE topic length][topic UTF-8][payload]`.
//!
//! The outer length prefix belongs to the transport; this is what sits
//! inside one frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::BridgeError;

const TOPIC_LEN_BYTES: usize = 2;

pub fn encode_frame(topic: &str, payload: &[u8]) -> Result<Bytes, BridgeError> {
    if topic.is_empty() {
        return Err(BridgeError::format("empty topic"));
    }
    let topic_len = u16::try_from(topic.len())
        .map_err(|_| BridgeError::format(format!("topic too long: {} bytes", topic.len())))?;

    let mut buf = BytesMut::with_capacity(TOPIC_LEN_BYTES + topic.len() + payload.len());
    buf.put_u16(topic_len);
    buf.put_slice(topic.as_bytes());
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Split a frame into topic and payload. The payload shares `frame`'s buffer.
pub fn decode_frame(mut frame: Bytes) -> Result<(String, Bytes), BridgeError> {
    if frame.len() < TOPIC_LEN_BYTES {
        return Err(BridgeError::format(format!("frame too short: {} bytes", frame.len())));
    }
    let topic_len = frame.get_u16() as usize;
    if topic_len == 0 {
        return Err(BridgeError::format("empty topic"));
    }
    if frame.len() < topic_len {
        return Err(BridgeError::format(format!(
            "topic length {topic_len} exceeds frame ({} bytes left)",
            frame.len()
        )));
    }
    let topic = frame.split_to(topic_len);
    let topic = std::str::from_utf8(&topic)?.to_string();
    Ok((topic, frame))
}
