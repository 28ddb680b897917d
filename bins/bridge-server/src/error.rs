#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{0}")]
    Engine(#[from] bridge_engine::EngineError),

    #[error("store: {0}")]
    Store(#[from] bridge_api::BridgeError),

    #[error("metrics api: {0}")]
    Api(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
