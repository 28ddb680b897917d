use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::BridgeError;

/// Object metadata key holding the serialized index length in bytes.
///
/// Readers split header from body with it instead of scanning the object.
pub const HEADER_SIZE_KEY: &str = "header-size";

/// User metadata attached to a stored object.
pub type ObjectMetadata = HashMap<String, String>;

/// Build the metadata map for a flushed object.
pub fn object_metadata(header_size: usize) -> ObjectMetadata {
    let mut m = ObjectMetadata::new();
    m.insert(HEADER_SIZE_KEY.to_string(), header_size.to_string());
    m
}

/// Durable object store seen from the aggregation engine.
///
/// The engine doesn't know the concrete backend. Implementations must be
/// safe for concurrent use: every destination worker shares one sink.
pub trait StorageSink: Send + Sync {
    /// Store `body` under `key` inside `destination` (a bucket name).
    ///
    /// A returned error is final: the engine does not retry.
    fn put<'a>(
        &'a self,
        destination: &'a str,
        key: &'a str,
        body: Bytes,
        metadata: &'a ObjectMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<(), BridgeError>> + Send + 'a>>;
}
