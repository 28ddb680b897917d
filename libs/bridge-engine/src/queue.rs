use serde::Deserialize;
use tokio::sync::mpsc;

use bridge_api::Message;

/// How a destination's inbound queue behaves when its worker falls behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Never block the ingress; memory grows without bound under overload.
    #[default]
    Unbounded,
    /// Bounded queue: delivery waits for space, stalling the ingress
    /// connection that produced the message.
    #[serde(alias = "backpressure")]
    BackPressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub mode: QueueMode,
    /// Capacity for `back_pressure` queues.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::default(),
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    4096
}

/// Sending half, held by the ingress router.
#[derive(Debug, Clone)]
pub enum Outbox {
    Unbounded(mpsc::UnboundedSender<Message>),
    Bounded(mpsc::Sender<Message>),
}

impl Outbox {
    /// Enqueue a message. Gives the message back if the worker is gone.
    pub async fn send(&self, msg: Message) -> Result<(), Message> {
        match self {
            Outbox::Unbounded(tx) => tx.send(msg).map_err(|e| e.0),
            Outbox::Bounded(tx) => tx.send(msg).await.map_err(|e| e.0),
        }
    }
}

/// Receiving half, owned by the destination worker.
#[derive(Debug)]
pub enum Inbox {
    Unbounded(mpsc::UnboundedReceiver<Message>),
    Bounded(mpsc::Receiver<Message>),
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<Message> {
        match self {
            Inbox::Unbounded(rx) => rx.recv().await,
            Inbox::Bounded(rx) => rx.recv().await,
        }
    }

    /// Refuse new messages; already queued ones can still be received.
    pub fn close(&mut self) {
        match self {
            Inbox::Unbounded(rx) => rx.close(),
            Inbox::Bounded(rx) => rx.close(),
        }
    }
}

pub fn channel(config: &QueueConfig) -> (Outbox, Inbox) {
    match config.mode {
        QueueMode::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Outbox::Unbounded(tx), Inbox::Unbounded(rx))
        }
        QueueMode::BackPressure => {
            let (tx, rx) = mpsc::channel(config.capacity.max(1));
            (Outbox::Bounded(tx), Inbox::Bounded(rx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_inbox_drains_then_rejects() {
        let (tx, mut rx) = channel(&QueueConfig {
            mode: QueueMode::BackPressure,
            capacity: 4,
        });
        tx.send(Message::received_now("t", &b"1"[..])).await.unwrap();
        rx.close();

        assert!(tx.send(Message::received_now("t", &b"2"[..])).await.is_err());
        assert_eq!(&rx.recv().await.unwrap().payload[..], b"1");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unbounded_keeps_order() {
        let (tx, mut rx) = channel(&QueueConfig::default());
        for i in 0..100u8 {
            tx.send(Message::received_now("t", vec![i])).await.unwrap();
        }
        for i in 0..100u8 {
            assert_eq!(rx.recv().await.unwrap().payload[0], i);
        }
    }
}
