#[derive(Debug, thiserror::Error)]
pub enum CtlError {
    #[error("{0}")]
    Bridge(#[from] bridge_api::BridgeError),

    #[error("connect {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
