use std::sync::Arc;

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use serde::Deserialize;

use bridge_api::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    S3,
    /// Process-local buckets, lost on exit. For tests and dry runs.
    Memory,
}

/// `[store]` section: how to reach the buckets destinations write to.
///
/// Credentials come from the usual AWS environment variables
/// (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO etc.).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            region: default_region(),
            endpoint: None,
            allow_http: false,
        }
    }
}

impl StoreConfig {
    /// Client for one bucket.
    pub fn build(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, BridgeError> {
        match self.backend {
            StoreBackend::Memory => Ok(Arc::new(InMemory::new())),
            StoreBackend::S3 => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_region(&self.region)
                    .with_allow_http(self.allow_http);
                if let Some(endpoint) = &self.endpoint {
                    // S3-compatible servers generally want path-style requests.
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_virtual_hosted_style_request(false);
                }
                let store = builder.build().map_err(|e| {
                    BridgeError::config(format!("bucket '{bucket}': {e}"))
                })?;
                Ok(Arc::new(store))
            }
        }
    }
}
