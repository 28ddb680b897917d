//! Read side: open flushed objects and query the messages inside.

use std::collections::BTreeSet;

use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, ObjectStore};

use bridge_api::encoder::decode;
use bridge_api::{BridgeError, DecodedMessage, HEADER_SIZE_KEY};

use crate::store_error;

/// One flushed object, fetched and decoded.
#[derive(Debug, Clone)]
pub struct ObjectOpener {
    key: String,
    messages: Vec<DecodedMessage>,
}

impl ObjectOpener {
    pub async fn open(store: &dyn ObjectStore, key: &str) -> Result<Self, BridgeError> {
        let ctx = format!("object '{key}'");
        let result = store
            .get(&ObjectPath::from(key))
            .await
            .map_err(|e| store_error(e).with_context(&ctx))?;

        let header_size = result
            .attributes
            .get(&Attribute::Metadata(HEADER_SIZE_KEY.into()))
            .ok_or_else(|| BridgeError::format(format!("{ctx}: missing '{HEADER_SIZE_KEY}' metadata")))?;
        let header_size: usize = header_size.trim().parse().map_err(|_| {
            BridgeError::format(format!("{ctx}: bad '{HEADER_SIZE_KEY}' value '{}'", &**header_size))
        })?;

        let body = result
            .bytes()
            .await
            .map_err(|e| store_error(e).with_context(&ctx))?;
        let messages = decode(&body, header_size).map_err(|e| e.with_context(&ctx))?;

        Ok(Self {
            key: key.to_string(),
            messages,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn messages(&self) -> &[DecodedMessage] {
        &self.messages
    }

    pub fn messages_by_topic<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a DecodedMessage> {
        self.messages.iter().filter(move |m| m.topic == topic)
    }

    /// Messages with `from <= timestamp <= to`.
    pub fn messages_by_time_range(&self, from: i64, to: i64) -> impl Iterator<Item = &DecodedMessage> {
        self.messages
            .iter()
            .filter(move |m| (from..=to).contains(&m.timestamp))
    }

    /// Distinct topics, sorted.
    pub fn topics(&self) -> Vec<&str> {
        distinct_topics(self.messages.iter())
    }

    /// First and last timestamp in the object.
    pub fn time_range(&self) -> Option<(i64, i64)> {
        Some((self.messages.first()?.timestamp, self.messages.last()?.timestamp))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Every object of a bucket flushed within `[from, to]` (unix seconds).
#[derive(Debug, Clone, Default)]
pub struct BucketOpener {
    objects: Vec<ObjectOpener>,
}

impl BucketOpener {
    pub async fn open(store: &dyn ObjectStore, from: i64, to: i64) -> Result<Self, BridgeError> {
        let keys = list_keys(store, from, to).await?;
        let mut objects = Vec::with_capacity(keys.len());
        for key in &keys {
            objects.push(ObjectOpener::open(store, key).await?);
        }
        Ok(Self { objects })
    }

    pub fn objects(&self) -> &[ObjectOpener] {
        &self.objects
    }

    pub fn messages(&self) -> impl Iterator<Item = &DecodedMessage> {
        self.objects.iter().flat_map(|o| o.messages())
    }

    pub fn messages_by_topic<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a DecodedMessage> {
        self.messages().filter(move |m| m.topic == topic)
    }

    pub fn messages_by_time_range(&self, from: i64, to: i64) -> impl Iterator<Item = &DecodedMessage> {
        self.messages()
            .filter(move |m| (from..=to).contains(&m.timestamp))
    }

    pub fn topics(&self) -> Vec<&str> {
        distinct_topics(self.messages())
    }

    pub fn time_range(&self) -> Option<(i64, i64)> {
        let first = self.objects.iter().find_map(|o| o.time_range())?;
        let last = self.objects.iter().rev().find_map(|o| o.time_range())?;
        Some((first.0, last.1))
    }

    /// Total message count across objects.
    pub fn len(&self) -> usize {
        self.objects.iter().map(ObjectOpener::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keys whose leading flush second lies in `[from, to]`, in key order.
///
/// Keys that don't start with a second (foreign objects) are skipped.
pub async fn list_keys(store: &dyn ObjectStore, from: i64, to: i64) -> Result<Vec<String>, BridgeError> {
    let metas: Vec<_> = store
        .list(None)
        .try_collect()
        .await
        .map_err(|e| store_error(e).with_context("list objects"))?;

    let mut keys: Vec<String> = metas
        .into_iter()
        .map(|m| m.location.to_string())
        .filter(|key| key_second(key).is_some_and(|s| (from..=to).contains(&s)))
        .collect();
    keys.sort();
    Ok(keys)
}

/// Flush second encoded at the front of a key: `1700000000-...` or a bare
/// `1700000000`.
pub fn key_second(key: &str) -> Option<i64> {
    let digits = key.split('-').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn distinct_topics<'a>(messages: impl Iterator<Item = &'a DecodedMessage>) -> Vec<&'a str> {
    messages
        .map(|m| m.topic.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
