use prometheus::{IntCounter, Registry};
use serde::Serialize;

use crate::error::EngineError;

/// Process-wide counters. Created once at startup, shared by every worker,
/// monotonic for the life of the process.
pub struct Metrics {
    registry: Registry,
    messages: IntCounter,
    objects: IntCounter,
    failed_flushes: IntCounter,
    unrouted: IntCounter,
}

/// Read-only view of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub messages: u64,
    pub objects: u64,
    pub failed_flushes: u64,
    pub unrouted: u64,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").field("snapshot", &self.snapshot()).finish()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, EngineError> {
        let registry = Registry::new();
        let messages = counter(
            &registry,
            "total_aggregated_messages",
            "The total number of aggregated messages",
        )?;
        let objects = counter(&registry, "total_objects", "The total number of objects uploaded")?;
        let failed_flushes = counter(
            &registry,
            "total_failed_flushes",
            "The total number of batches dropped after a failed flush",
        )?;
        let unrouted = counter(
            &registry,
            "total_unrouted_messages",
            "The total number of messages matching no destination",
        )?;
        Ok(Self {
            registry,
            messages,
            objects,
            failed_flushes,
            unrouted,
        })
    }

    /// Registry for the exposition endpoint.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_message(&self) {
        self.messages.inc();
    }

    pub fn record_object(&self) {
        self.objects.inc();
    }

    pub fn record_failed_flush(&self) {
        self.failed_flushes.inc();
    }

    pub fn record_unrouted(&self) {
        self.unrouted.inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages: self.messages.get(),
            objects: self.objects.get(),
            failed_flushes: self.failed_flushes.get(),
            unrouted: self.unrouted.get(),
        }
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, EngineError> {
    let c = IntCounter::new(name, help)?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_only_grow() {
        let m = Metrics::new().unwrap();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());

        m.record_message();
        m.record_message();
        m.record_object();
        m.record_failed_flush();
        m.record_unrouted();

        let s = m.snapshot();
        assert_eq!(s.messages, 2);
        assert_eq!(s.objects, 1);
        assert_eq!(s.failed_flushes, 1);
        assert_eq!(s.unrouted, 1);
    }

    #[test]
    fn registry_exposes_counter_names() {
        let m = Metrics::new().unwrap();
        let names: Vec<String> = m
            .registry()
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"total_aggregated_messages".to_string()));
        assert!(names.contains(&"total_objects".to_string()));
    }
}
