use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions};

use bridge_api::{BridgeError, ObjectMetadata, StorageSink};

use crate::config::StoreConfig;
use crate::store_error;

/// `StorageSink` over `object_store`, one client per destination bucket.
pub struct ObjectStoreSink {
    stores: HashMap<String, Arc<dyn ObjectStore>>,
}

impl std::fmt::Debug for ObjectStoreSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buckets: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        buckets.sort_unstable();
        f.debug_struct("ObjectStoreSink").field("buckets", &buckets).finish()
    }
}

impl ObjectStoreSink {
    /// Build a client for every destination bucket.
    pub fn connect<'a>(
        config: &StoreConfig,
        buckets: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, BridgeError> {
        let mut stores = HashMap::new();
        for bucket in buckets {
            let store = config.build(bucket)?;
            tracing::info!(bucket = %bucket, backend = ?config.backend, "connected store");
            stores.insert(bucket.to_string(), store);
        }
        Ok(Self { stores })
    }

    /// Use already-built clients (e.g. in-memory stores in tests).
    pub fn with_stores(stores: HashMap<String, Arc<dyn ObjectStore>>) -> Self {
        Self { stores }
    }

    pub fn store(&self, bucket: &str) -> Option<&Arc<dyn ObjectStore>> {
        self.stores.get(bucket)
    }
}

impl StorageSink for ObjectStoreSink {
    fn put<'a>(
        &'a self,
        destination: &'a str,
        key: &'a str,
        body: Bytes,
        metadata: &'a ObjectMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<(), BridgeError>> + Send + 'a>> {
        Box::pin(async move {
            let store = self.stores.get(destination).ok_or_else(|| {
                BridgeError::config(format!("no store for destination '{destination}'"))
            })?;

            let size = body.len();
            let opts = PutOptions {
                attributes: attributes(metadata),
                ..Default::default()
            };
            store
                .put_opts(&ObjectPath::from(key), body.into(), opts)
                .await
                .map_err(|e| store_error(e).with_context(format!("put {destination}/{key}")))?;

            tracing::debug!(bucket = %destination, key = %key, bytes = size, "object written");
            Ok(())
        })
    }
}

fn attributes(metadata: &ObjectMetadata) -> Attributes {
    let mut attrs = Attributes::new();
    for (k, v) in metadata {
        attrs.insert(
            Attribute::Metadata(k.clone().into()),
            AttributeValue::from(v.clone()),
        );
    }
    attrs
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use bridge_api::{HEADER_SIZE_KEY, object_metadata};

    use super::*;

    fn sink() -> (ObjectStoreSink, Arc<dyn ObjectStore>) {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let mut stores = HashMap::new();
        stores.insert("archive".to_string(), store.clone());
        (ObjectStoreSink::with_stores(stores), store)
    }

    #[tokio::test]
    async fn writes_body_and_header_size() {
        let (sink, store) = sink();
        sink.put("archive", "0000000001-00000000-abcd", Bytes::from_static(b"hello"), &object_metadata(3))
            .await
            .unwrap();

        let got = store
            .get(&ObjectPath::from("0000000001-00000000-abcd"))
            .await
            .unwrap();
        let header = got
            .attributes
            .get(&Attribute::Metadata(HEADER_SIZE_KEY.into()))
            .map(|v| v.to_string());
        assert_eq!(header.as_deref(), Some("3"));
        assert_eq!(&got.bytes().await.unwrap()[..], b"hello");
    }

    #[tokio::test]
    async fn unknown_destination_fails() {
        let (sink, _) = sink();
        let err = sink
            .put("elsewhere", "k", Bytes::new(), &ObjectMetadata::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("elsewhere"));
    }
}
