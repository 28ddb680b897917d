use serde::Deserialize;

use bridge_engine::EngineConfig;
use bridge_store::StoreConfig;

use crate::error::ServerError;

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Port for `/metrics`, `/api/stats` and `/health`.
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub ingress: IngressConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// `[policy]`, `[queue]` and `[[destinations]]`.
    #[serde(flatten)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngressConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Largest accepted frame, in bytes.
    #[serde(default = "default_max_frame")]
    pub max_frame: usize,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_frame: default_max_frame(),
        }
    }
}

fn default_api_port() -> u16 {
    2112
}
fn default_listen() -> String {
    "0.0.0.0:7878".to_string()
}
fn default_max_frame() -> usize {
    8 * 1024 * 1024
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            context: "read",
            detail: format!("'{path}': {e}"),
        })?;
        Self::parse(&content).map_err(|e| match e {
            ServerError::Config { context, detail } => ServerError::Config {
                context,
                detail: format!("'{path}': {detail}"),
            },
            other => other,
        })
    }

    pub fn parse(toml_str: &str) -> Result<Self, ServerError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ServerError::Config {
            context: "parse",
            detail: e.to_string(),
        })?;
        if config.ingress.max_frame == 0 {
            return Err(ServerError::Config {
                context: "ingress",
                detail: "max_frame must be > 0".into(),
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use bridge_engine::{PolicyKind, QueueMode};
    use bridge_store::StoreBackend;

    use super::*;

    #[test]
    fn full_example() {
        let cfg = ServerConfig::parse(
            r#"
            api_port = 9000

            [ingress]
            listen = "127.0.0.1:7000"
            max_frame = 1024

            [policy]
            kind = "bytes"
            threshold = 1048576

            [queue]
            mode = "back_pressure"
            capacity = 64

            [store]
            backend = "s3"
            region = "eu-central-1"
            endpoint = "http://localhost:9000"
            allow_http = true

            [[destinations]]
            name = "sensor-archive"
            topics = ["sensors/#"]
            policy = { kind = "time", threshold = 60 }

            [[destinations]]
            name = "events"
            topics = ["events/+"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.api_port, 9000);
        assert_eq!(cfg.ingress.listen, "127.0.0.1:7000");
        assert_eq!(cfg.ingress.max_frame, 1024);
        assert_eq!(cfg.store.region, "eu-central-1");
        assert_eq!(cfg.engine.queue.mode, QueueMode::BackPressure);

        let dests = cfg.engine.resolve().unwrap();
        assert_eq!(dests[0].policy.kind, PolicyKind::Time);
        assert_eq!(dests[1].policy.kind, PolicyKind::Bytes);
    }

    #[test]
    fn defaults() {
        let cfg = ServerConfig::parse(
            r##"
            policy = { kind = "count", threshold = 10 }
            store = { backend = "memory" }
            [[destinations]]
            name = "a"
            topics = ["#"]
            "##,
        )
        .unwrap();
        assert_eq!(cfg.api_port, 2112);
        assert_eq!(cfg.ingress.listen, "0.0.0.0:7878");
        assert_eq!(cfg.ingress.max_frame, 8 * 1024 * 1024);
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.engine.queue.mode, QueueMode::Unbounded);
    }

    #[test]
    fn rejects_zero_frame_limit() {
        let err = ServerConfig::parse("ingress = { max_frame = 0 }").unwrap_err();
        assert!(matches!(err, ServerError::Config { context: "ingress", .. }));
    }
}
