pub mod encoder;
pub mod error;
pub mod frame;
pub mod message;
pub mod storage;

pub use encoder::{BatchEntry, BatchIndex, DecodedMessage, EncodedObject};
pub use error::{BridgeError, ErrorKind};
pub use message::Message;
pub use storage::{HEADER_SIZE_KEY, ObjectMetadata, StorageSink, object_metadata};
