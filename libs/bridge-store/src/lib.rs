//! Object-store side of the bridge: the storage sink flushed batches are
//! written through, and the openers that read them back.

pub mod config;
pub mod opener;
pub mod sink;

pub use config::{StoreBackend, StoreConfig};
pub use opener::{BucketOpener, ObjectOpener};
pub use sink::ObjectStoreSink;

use bridge_api::BridgeError;

/// Backend failures surface as delivery errors. The engine drops the batch
/// and keeps running.
pub(crate) fn store_error(e: object_store::Error) -> BridgeError {
    BridgeError::delivery(e.to_string())
}
