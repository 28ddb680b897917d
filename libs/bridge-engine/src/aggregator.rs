use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use bridge_api::{Message, StorageSink, encoder, object_metadata};

use crate::error::EngineError;
use crate::keys::ObjectKeys;
use crate::metrics::Metrics;
use crate::policy::FlushPolicy;
use crate::queue::Inbox;

/// What a successful flush wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub key: String,
    pub messages: usize,
    pub bytes: usize,
    pub header_size: usize,
}

/// Per-destination accumulation state: one batch, one policy, one writer.
///
/// Lifecycle: idle (empty batch) → accumulating → flushing → idle. A flush
/// takes the whole batch out before encoding, so a message lands in exactly
/// one object. The batch is reset on every flush attempt: a failed upload
/// drops its messages.
pub struct Aggregator {
    destination: String,
    batch: Vec<Message>,
    policy: FlushPolicy,
    sink: Arc<dyn StorageSink>,
    metrics: Arc<Metrics>,
    keys: ObjectKeys,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("destination", &self.destination)
            .field("pending", &self.batch.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Aggregator {
    pub fn new(
        destination: String,
        policy: FlushPolicy,
        sink: Arc<dyn StorageSink>,
        metrics: Arc<Metrics>,
        keys: ObjectKeys,
    ) -> Self {
        Self {
            destination,
            batch: Vec::new(),
            policy,
            sink,
            metrics,
            keys,
        }
    }

    /// Messages held in memory, not yet flushed.
    pub fn pending(&self) -> &[Message] {
        &self.batch
    }

    pub fn is_idle(&self) -> bool {
        self.batch.is_empty()
    }

    /// Append a message and flush if the policy says the batch is full.
    pub async fn accept(&mut self, msg: Message) -> Result<Option<FlushReport>, EngineError> {
        let now = Instant::now();
        self.policy.on_append(&msg, now);
        self.batch.push(msg);
        self.metrics.record_message();

        if !self.policy.should_flush(now) {
            return Ok(None);
        }
        self.flush().await
    }

    /// Package and upload whatever is buffered. Empty batches are skipped.
    pub async fn flush(&mut self) -> Result<Option<FlushReport>, EngineError> {
        let messages = std::mem::take(&mut self.batch);
        self.policy.on_flush();
        if messages.is_empty() {
            return Ok(None);
        }

        match self.write(&messages).await {
            Ok(report) => {
                self.metrics.record_object();
                tracing::info!(
                    destination = %self.destination,
                    key = %report.key,
                    messages = report.messages,
                    bytes = report.bytes,
                    header_size = report.header_size,
                    "flushed batch"
                );
                Ok(Some(report))
            }
            Err(e) => {
                self.metrics.record_failed_flush();
                Err(e.with_context(format!(
                    "destination '{}' ({} messages dropped)",
                    self.destination,
                    messages.len()
                )))
            }
        }
    }

    async fn write(&mut self, messages: &[Message]) -> Result<FlushReport, EngineError> {
        let object = encoder::encode(messages)?;
        let key = self.keys.next(SystemTime::now());
        let metadata = object_metadata(object.header_size);

        self.sink
            .put(&self.destination, &key, object.bytes.clone(), &metadata)
            .await?;

        Ok(FlushReport {
            key,
            messages: messages.len(),
            bytes: object.len(),
            header_size: object.header_size,
        })
    }
}

/// Run an aggregator on its own task, fed by `inbox`.
///
/// On shutdown the inbox is closed, messages already queued are processed
/// normally, and the remaining partial batch is flushed once.
pub fn spawn_worker(
    mut aggregator: Aggregator,
    mut inbox: Inbox,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = inbox.recv() => match msg {
                    Some(msg) => handle(&mut aggregator, msg).await,
                    None => break,
                },
                _ = shutdown_rx.changed() => {
                    tracing::info!(destination = %aggregator.destination, "draining aggregator");
                    inbox.close();
                    while let Some(msg) = inbox.recv().await {
                        handle(&mut aggregator, msg).await;
                    }
                    break;
                }
            }
        }

        if !aggregator.is_idle() {
            if let Err(e) = aggregator.flush().await {
                tracing::error!(error = %e, "final flush failed");
            }
        }
        tracing::info!(destination = %aggregator.destination, "aggregator stopped");
    })
}

async fn handle(aggregator: &mut Aggregator, msg: Message) {
    tracing::trace!(
        destination = %aggregator.destination,
        topic = %msg.topic,
        bytes = msg.payload.len(),
        "message received"
    );
    if let Err(e) = aggregator.accept(msg).await {
        tracing::error!(error = %e, "flush failed");
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use bytes::Bytes;

    use bridge_api::{BridgeError, ObjectMetadata};

    use super::*;
    use crate::policy::{PolicyConfig, PolicyKind};

    #[derive(Default)]
    struct Recorder {
        puts: Mutex<Vec<(String, String, Bytes)>>,
        fail: bool,
    }

    impl StorageSink for Recorder {
        fn put<'a>(
            &'a self,
            destination: &'a str,
            key: &'a str,
            body: Bytes,
            _metadata: &'a ObjectMetadata,
        ) -> Pin<Box<dyn Future<Output = Result<(), BridgeError>> + Send + 'a>> {
            Box::pin(async move {
                if self.fail {
                    return Err(BridgeError::delivery("quota exceeded"));
                }
                self.puts
                    .lock()
                    .unwrap()
                    .push((destination.to_string(), key.to_string(), body));
                Ok(())
            })
        }
    }

    fn aggregator(sink: Arc<Recorder>, threshold: u64) -> (Aggregator, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let agg = Aggregator::new(
            "bucket".into(),
            FlushPolicy::new(PolicyConfig { kind: PolicyKind::Count, threshold }),
            sink,
            metrics.clone(),
            ObjectKeys::new("run00000"),
        );
        (agg, metrics)
    }

    #[tokio::test]
    async fn accumulates_until_policy_fires() {
        let sink = Arc::new(Recorder::default());
        let (mut agg, metrics) = aggregator(sink.clone(), 2);

        assert!(agg.accept(Message::received_now("t", &b"a"[..])).await.unwrap().is_none());
        assert_eq!(agg.pending().len(), 1);

        let report = agg.accept(Message::received_now("t", &b"b"[..])).await.unwrap().unwrap();
        assert_eq!(report.messages, 2);
        assert!(agg.is_idle());
        assert_eq!(sink.puts.lock().unwrap().len(), 1);
        assert_eq!(metrics.snapshot().objects, 1);
        assert_eq!(metrics.snapshot().messages, 2);
    }

    #[tokio::test]
    async fn empty_flush_writes_nothing() {
        let sink = Arc::new(Recorder::default());
        let (mut agg, metrics) = aggregator(sink.clone(), 5);
        assert!(agg.flush().await.unwrap().is_none());
        assert!(sink.puts.lock().unwrap().is_empty());
        assert_eq!(metrics.snapshot().objects, 0);
    }

    #[tokio::test]
    async fn failed_upload_still_clears_batch() {
        let sink = Arc::new(Recorder { fail: true, ..Default::default() });
        let (mut agg, metrics) = aggregator(sink, 1);

        let err = agg.accept(Message::received_now("t", &b"a"[..])).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
        assert!(agg.is_idle());
        assert_eq!(metrics.snapshot().objects, 0);
        assert_eq!(metrics.snapshot().failed_flushes, 1);
    }
}
