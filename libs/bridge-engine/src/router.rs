use std::sync::Arc;

use bytes::Bytes;

use bridge_api::Message;

use crate::error::EngineError;
use crate::filter::TopicFilter;
use crate::metrics::Metrics;
use crate::queue::Outbox;

struct Route {
    filter: TopicFilter,
    destination: usize,
}

struct Destination {
    name: String,
    outbox: Outbox,
}

/// Routes ingress messages to destination queues by topic filter.
///
/// Filters are tried in declaration order and the first match wins, so a
/// message always reaches at most one destination.
pub struct IngressRouter {
    routes: Vec<Route>,
    destinations: Vec<Destination>,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for IngressRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.destinations.iter().map(|d| d.name.as_str()).collect();
        f.debug_struct("IngressRouter")
            .field("routes", &self.routes.len())
            .field("destinations", &names)
            .finish()
    }
}

impl IngressRouter {
    pub(crate) fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            routes: Vec::new(),
            destinations: Vec::new(),
            metrics,
        }
    }

    pub(crate) fn add_destination(&mut self, name: String, filters: Vec<TopicFilter>, outbox: Outbox) {
        let destination = self.destinations.len();
        self.destinations.push(Destination { name, outbox });
        self.routes
            .extend(filters.into_iter().map(|filter| Route { filter, destination }));
    }

    /// Name of the destination `topic` routes to, if any.
    pub fn route(&self, topic: &str) -> Option<&str> {
        self.lookup(topic).map(|d| d.name.as_str())
    }

    fn lookup(&self, topic: &str) -> Option<&Destination> {
        self.routes
            .iter()
            .find(|r| r.filter.matches(topic))
            .map(|r| &self.destinations[r.destination])
    }

    /// Stamp arrival time and hand the message to its destination's queue.
    ///
    /// Returns the destination name, or `None` when no filter matched (the
    /// message is counted and dropped). With back-pressure queues this waits
    /// for space.
    pub async fn deliver(
        &self,
        topic: &str,
        payload: impl Into<Bytes>,
    ) -> Result<Option<&str>, EngineError> {
        let Some(dest) = self.lookup(topic) else {
            self.metrics.record_unrouted();
            tracing::debug!(topic = %topic, "no destination for topic");
            return Ok(None);
        };

        let msg = Message::received_now(topic, payload);
        dest.outbox
            .send(msg)
            .await
            .map_err(|_| EngineError::DestinationClosed(dest.name.clone()))?;
        Ok(Some(dest.name.as_str()))
    }
}
