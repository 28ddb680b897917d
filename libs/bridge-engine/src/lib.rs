pub mod aggregator;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod filter;
pub mod keys;
pub mod metrics;
pub mod policy;
pub mod queue;
pub mod router;

pub use aggregator::{Aggregator, FlushReport};
pub use bootstrap::Engine;
pub use config::{DestinationConfig, EngineConfig, ResolvedDestination};
pub use error::EngineError;
pub use filter::TopicFilter;
pub use metrics::{Metrics, MetricsSnapshot};
pub use policy::{FlushPolicy, PolicyConfig, PolicyKind};
pub use queue::{QueueConfig, QueueMode};
pub use router::IngressRouter;
