use bytes::Bytes;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};

use bridge_api::frame::encode_frame;

use crate::cli::PublishArgs;
use crate::error::CtlError;

pub async fn run(args: PublishArgs) -> Result<(), CtlError> {
    let frame = encode_frame(&args.topic, args.payload.as_bytes())?;

    let stream = TcpStream::connect(args.addr.as_str())
        .await
        .map_err(|source| CtlError::Connect {
            addr: args.addr.clone(),
            source,
        })?;
    let mut out = FramedWrite::new(stream, LengthDelimitedCodec::new());

    for _ in 0..args.count {
        out.feed(frame.clone()).await?;
    }
    SinkExt::<Bytes>::flush(&mut out).await?;

    tracing::info!(addr = %args.addr, topic = %args.topic, count = args.count, "published");
    println!("published {} message(s) to {}", args.count, args.topic);
    Ok(())
}
