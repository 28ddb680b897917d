use std::collections::HashSet;

use serde::Deserialize;

use crate::error::EngineError;
use crate::filter::TopicFilter;
use crate::policy::PolicyConfig;
use crate::queue::QueueConfig;

/// Engine section of the configuration: routing, flush policy and queueing.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Default flush policy for destinations without their own.
    #[serde(default)]
    pub policy: Option<PolicyConfig>,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    /// Bucket name objects are written to.
    pub name: String,
    /// MQTT-style topic filters routed here.
    pub topics: Vec<String>,
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

/// A validated destination with its filters parsed and policy resolved.
#[derive(Debug, Clone)]
pub struct ResolvedDestination {
    pub name: String,
    pub filters: Vec<TopicFilter>,
    pub policy: PolicyConfig,
}

impl EngineConfig {
    /// Parse the engine section from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Check every rule and return destinations in declaration order.
    pub fn resolve(&self) -> Result<Vec<ResolvedDestination>, EngineError> {
        if self.destinations.is_empty() {
            return Err(EngineError::Config("at least one destination is required".into()));
        }
        if self.queue.capacity == 0 {
            return Err(EngineError::Config("queue.capacity must be > 0".into()));
        }
        if let Some(policy) = &self.policy {
            check_policy(policy).map_err(|e| e.with_context("policy"))?;
        }

        let mut names = HashSet::new();
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut resolved = Vec::with_capacity(self.destinations.len());

        for dest in &self.destinations {
            if dest.name.trim().is_empty() {
                return Err(EngineError::Config("destination name must not be empty".into()));
            }
            let ctx = format!("destination '{}'", dest.name);
            if !names.insert(dest.name.as_str()) {
                return Err(EngineError::Config(format!("{ctx} is declared twice")));
            }
            if dest.topics.is_empty() {
                return Err(EngineError::Config(format!("{ctx} has no topics")));
            }

            let mut filters = Vec::with_capacity(dest.topics.len());
            for topic in &dest.topics {
                let filter = TopicFilter::parse(topic).map_err(|e| e.with_context(&ctx))?;
                if !claimed.insert(topic.as_str()) {
                    return Err(EngineError::Config(format!(
                        "{ctx}: topic filter '{topic}' is already routed"
                    )));
                }
                filters.push(filter);
            }

            let policy = match (dest.policy, self.policy) {
                (Some(own), _) => {
                    check_policy(&own).map_err(|e| e.with_context(&ctx))?;
                    own
                }
                (None, Some(global)) => global,
                (None, None) => {
                    return Err(EngineError::Config(format!(
                        "{ctx} has no flush policy and no global [policy] is set"
                    )));
                }
            };

            resolved.push(ResolvedDestination {
                name: dest.name.clone(),
                filters,
                policy,
            });
        }

        Ok(resolved)
    }
}

fn check_policy(policy: &PolicyConfig) -> Result<(), EngineError> {
    if policy.threshold == 0 {
        return Err(EngineError::Config(format!(
            "{} threshold must be > 0",
            policy.kind
        )));
    }
    Ok(())
}
