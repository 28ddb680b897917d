use std::net::SocketAddr;
use std::sync::Arc;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use bridge_api::frame::decode_frame;
use bridge_engine::{EngineError, IngressRouter};

/// Accept connections until `token` is cancelled, then wait for every
/// connection reader to stop. No delivery is in flight once this returns.
pub async fn run(
    listener: TcpListener,
    router: Arc<IngressRouter>,
    max_frame: usize,
    token: CancellationToken,
) {
    let tracker = TaskTracker::new();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::info!(%peer, "ingress connection");
                    tracker.spawn(connection(stream, peer, router.clone(), max_frame, token.clone()));
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            },
        }
    }

    tracker.close();
    tracker.wait().await;
    tracing::info!("ingress stopped");
}

async fn connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<IngressRouter>,
    max_frame: usize,
    token: CancellationToken,
) {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max_frame)
        .new_codec();
    let mut frames = FramedRead::new(stream, codec);

    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => break,
            frame = frames.next() => frame,
        };
        let frame = match frame {
            Some(Ok(frame)) => frame.freeze(),
            Some(Err(e)) => {
                tracing::warn!(%peer, error = %e, "ingress connection error");
                break;
            }
            None => break,
        };

        let (topic, payload) = match decode_frame(frame) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "skipping malformed frame");
                continue;
            }
        };

        match router.deliver(&topic, payload).await {
            Ok(_) => {}
            Err(e @ EngineError::DestinationClosed(_)) => {
                tracing::warn!(%peer, topic = %topic, error = %e, "message rejected");
            }
            Err(e) => tracing::error!(%peer, topic = %topic, error = %e, "delivery failed"),
        }
    }

    tracing::info!(%peer, "ingress connection closed");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use futures::SinkExt;
    use tokio_util::codec::FramedWrite;

    use bridge_api::frame::encode_frame;
    use bridge_engine::{Engine, EngineConfig};
    use bridge_store::{BucketOpener, ObjectStoreSink, StoreBackend, StoreConfig};

    use super::*;

    #[tokio::test]
    async fn frames_reach_the_bucket() {
        let config = EngineConfig::parse(
            r#"
            policy = { kind = "count", threshold = 2 }
            [[destinations]]
            name = "archive"
            topics = ["sensors/#"]
            "#,
        )
        .unwrap();
        let store_config = StoreConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        };
        let sink = Arc::new(ObjectStoreSink::connect(&store_config, ["archive"]).unwrap());
        let store = sink.store("archive").unwrap().clone();
        let engine = Engine::start(&config, sink).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let ingress = tokio::spawn(run(listener, engine.router().clone(), 1024, token.clone()));

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut out = FramedWrite::new(stream, LengthDelimitedCodec::new());
        out.send(encode_frame("sensors/a", b"AA").unwrap()).await.unwrap();
        // Malformed body and an unrouted topic are skipped.
        out.send(Bytes::from_static(&[0, 9, b'x'])).await.unwrap();
        out.send(encode_frame("other", b"zz").unwrap()).await.unwrap();
        out.send(encode_frame("sensors/b", b"B").unwrap()).await.unwrap();
        out.send(encode_frame("sensors/c", b"tail").unwrap()).await.unwrap();

        let metrics = engine.metrics().clone();
        for _ in 0..200 {
            if metrics.snapshot().messages == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        token.cancel();
        ingress.await.unwrap();
        engine.shutdown().await;

        let snap = metrics.snapshot();
        assert_eq!(snap.messages, 3);
        assert_eq!(snap.unrouted, 1);
        assert_eq!(snap.objects, 2);

        let bucket = BucketOpener::open(store.as_ref(), 0, i64::MAX).await.unwrap();
        let payloads: Vec<&[u8]> = bucket.messages().map(|m| &m.payload[..]).collect();
        assert_eq!(payloads, [b"AA".as_slice(), b"B".as_slice(), b"tail".as_slice()]);
    }
}
