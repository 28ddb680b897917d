use bridge_api::{BridgeError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    /// The storage sink rejected a flush. The batch is gone.
    #[error("store error: {0}")]
    Store(BridgeError),

    /// Packaging a batch broke an index/body invariant.
    #[error("encode error: {0}")]
    Encode(BridgeError),

    #[error("destination '{0}' is closed")]
    DestinationClosed(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Store`/`Encode` variants, context is added to the inner `BridgeError`.
    /// For `Config`, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Store(e) => EngineError::Store(e.with_context(ctx)),
            EngineError::Encode(e) => EngineError::Encode(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

/// Sorts boundary errors by what the engine does with them: delivery
/// failures drop one batch, invariant and format failures drop one flush,
/// configuration failures stop startup.
impl From<BridgeError> for EngineError {
    fn from(e: BridgeError) -> Self {
        match e.kind() {
            ErrorKind::Delivery => EngineError::Store(e),
            ErrorKind::Invariant | ErrorKind::Format => EngineError::Encode(e),
            ErrorKind::Config => EngineError::Config(e.message),
        }
    }
}
