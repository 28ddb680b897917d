//! Batch object wire format.
//!
//! An object is `[index][body]`: the index is a JSON document listing one
//! entry per message, the body is every payload concatenated in arrival
//! order with no separators. The index byte length travels next to the
//! object as the [`HEADER_SIZE_KEY`](crate::HEADER_SIZE_KEY) metadata value.
//!
//! ```text
//! {"tiles":[{"Offset":0,"UnixTime":1700000000,"Topic":"sensors/a"}, ...]}AABCCC
//! └──────────────────────── header_size bytes ────────────────────────┘└ body ┘
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::message::Message;

/// Position of one message inside the object body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Byte offset of the payload within the body.
    #[serde(rename = "Offset")]
    pub offset: u64,
    /// Arrival time, unix seconds.
    #[serde(rename = "UnixTime")]
    pub timestamp: i64,
    #[serde(rename = "Topic")]
    pub topic: String,
}

/// The serialized header of a batch object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchIndex {
    pub tiles: Vec<BatchEntry>,
}

impl BatchIndex {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// A packaged batch ready for the storage sink.
#[derive(Debug, Clone)]
pub struct EncodedObject {
    pub index: BatchIndex,
    /// Full object: index bytes followed by the body.
    pub bytes: Bytes,
    /// Length of the serialized index at the front of `bytes`.
    pub header_size: usize,
}

impl EncodedObject {
    pub fn header(&self) -> &[u8] {
        &self.bytes[..self.header_size]
    }

    pub fn body(&self) -> &[u8] {
        &self.bytes[self.header_size..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One message recovered from a batch object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub topic: String,
    pub timestamp: i64,
    pub payload: Bytes,
}

/// Package an ordered batch into one object.
///
/// Each entry's offset is the body length before its payload is appended.
/// An empty batch yields `{"tiles":[]}` and an empty body.
pub fn encode(messages: &[Message]) -> Result<EncodedObject, BridgeError> {
    let body_len: usize = messages.iter().map(|m| m.payload.len()).sum();
    let mut body = Vec::with_capacity(body_len);
    let mut tiles = Vec::with_capacity(messages.len());

    for msg in messages {
        tiles.push(BatchEntry {
            offset: body.len() as u64,
            timestamp: msg.unix_time(),
            topic: msg.topic.clone(),
        });
        body.extend_from_slice(&msg.payload);
    }

    let index = BatchIndex { tiles };
    let header = serde_json::to_vec(&index)
        .map_err(|e| BridgeError::invariant(format!("serialize index: {e}")))?;
    let header_size = header.len();

    let mut bytes = header;
    bytes.extend_from_slice(&body);

    // Packing invariants: one entry per message, body is exactly the payloads.
    if index.len() != messages.len() {
        return Err(BridgeError::invariant(format!(
            "index has {} entries for {} messages",
            index.len(),
            messages.len()
        )));
    }
    if body.len() != body_len || bytes.len() != header_size + body_len {
        return Err(BridgeError::invariant(format!(
            "object length {} != header {header_size} + body {body_len}",
            bytes.len()
        )));
    }

    Ok(EncodedObject {
        index,
        bytes: Bytes::from(bytes),
        header_size,
    })
}

/// Parse the index at the front of an object.
pub fn decode_index(header: &[u8]) -> Result<BatchIndex, BridgeError> {
    serde_json::from_slice(header).map_err(|e| BridgeError::format(format!("parse index: {e}")))
}

/// Split an object at `header_size` and recover every message in order.
///
/// A payload spans from its offset to the next entry's offset; the last
/// payload runs to the end of the body.
pub fn decode(object: &Bytes, header_size: usize) -> Result<Vec<DecodedMessage>, BridgeError> {
    if header_size > object.len() {
        return Err(BridgeError::format(format!(
            "header size {header_size} exceeds object length {}",
            object.len()
        )));
    }
    let index = decode_index(&object[..header_size])?;
    let body = object.slice(header_size..);
    if index.is_empty() && !body.is_empty() {
        return Err(BridgeError::format(format!(
            "empty index but {} body bytes",
            body.len()
        )));
    }

    let bounds = payload_bounds(&index, body.len())?;
    Ok(index
        .tiles
        .into_iter()
        .zip(bounds)
        .map(|(entry, (start, end))| DecodedMessage {
            topic: entry.topic,
            timestamp: entry.timestamp,
            payload: body.slice(start..end),
        })
        .collect())
}

/// `(start, end)` body range for every index entry.
pub fn payload_bounds(index: &BatchIndex, body_len: usize) -> Result<Vec<(usize, usize)>, BridgeError> {
    let tiles = &index.tiles;
    if let Some(first) = tiles.first() {
        if first.offset != 0 {
            return Err(BridgeError::format(format!(
                "first offset is {}, expected 0",
                first.offset
            )));
        }
    }

    let mut bounds = Vec::with_capacity(tiles.len());
    for (i, entry) in tiles.iter().enumerate() {
        let start = entry.offset as usize;
        let end = match tiles.get(i + 1) {
            Some(next) => next.offset as usize,
            None => body_len,
        };
        if start > end || end > body_len {
            return Err(BridgeError::format(format!(
                "entry {i} ({start}..{end}) out of body bounds ({body_len} bytes)"
            )));
        }
        bounds.push((start, end));
    }
    Ok(bounds)
}
