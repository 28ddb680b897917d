use bridge_api::DecodedMessage;
use bridge_store::{BucketOpener, ObjectOpener};

use crate::cli::{BucketArgs, MessagesArgs};
use crate::error::CtlError;

async fn open_bucket(args: &BucketArgs) -> Result<BucketOpener, CtlError> {
    let store = args.store.store_config().build(&args.bucket)?;
    Ok(BucketOpener::open(store.as_ref(), args.from, args.to).await?)
}

pub async fn objects(args: BucketArgs) -> Result<(), CtlError> {
    let bucket = open_bucket(&args).await?;
    for object in bucket.objects() {
        let range = match object.time_range() {
            Some((first, last)) => format!("{first}..{last}"),
            None => "-".to_string(),
        };
        println!("{}\t{} messages\t{}", object.key(), object.len(), range);
    }
    Ok(())
}

pub async fn topics(args: BucketArgs) -> Result<(), CtlError> {
    let bucket = open_bucket(&args).await?;
    for topic in bucket.topics() {
        println!("{topic}");
    }
    Ok(())
}

/// One JSON document per line: `{"timestamp":..,"topic":..,"payload":..}`.
pub async fn messages(args: MessagesArgs) -> Result<(), CtlError> {
    let since = args.since.unwrap_or(i64::MIN);
    let until = args.until.unwrap_or(i64::MAX);
    let keep = |m: &DecodedMessage| {
        (since..=until).contains(&m.timestamp)
            && args.topic.as_deref().is_none_or(|t| m.topic == t)
    };

    match &args.key {
        Some(key) => {
            let store = args.bucket.store.store_config().build(&args.bucket.bucket)?;
            let object = ObjectOpener::open(store.as_ref(), key).await?;
            print_messages(object.messages().iter().filter(|m| keep(*m)))?;
        }
        None => {
            let bucket = open_bucket(&args.bucket).await?;
            print_messages(bucket.messages().filter(|m| keep(*m)))?;
        }
    }
    Ok(())
}

fn print_messages<'a>(messages: impl Iterator<Item = &'a DecodedMessage>) -> Result<(), CtlError> {
    for m in messages {
        let line = serde_json::json!({
            "timestamp": m.timestamp,
            "topic": m.topic,
            "payload": String::from_utf8_lossy(&m.payload),
        });
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}
