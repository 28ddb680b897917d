use std::fmt;

/// How the engine treats a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The object store refused or lost a request. The affected batch is
    /// dropped and the process carries on.
    Delivery,
    /// Unusable configuration. Raised before any worker starts.
    Config,
    /// Bytes from outside the process (an ingress frame, a stored object)
    /// that do not follow the expected layout.
    Format,
    /// The bridge built an index and body that disagree. Fatal to the one
    /// flush that produced it.
    Invariant,
}

impl ErrorKind {
    fn label(self) -> &'static str {
        match self {
            ErrorKind::Delivery => "delivery",
            ErrorKind::Config => "config",
            ErrorKind::Format => "format",
            ErrorKind::Invariant => "invariant",
        }
    }
}

/// Error crossing a collaborator boundary (storage sink, encoder, opener).
#[derive(Debug)]
pub struct BridgeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BridgeError {
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Delivery, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Invariant, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Prefix the message with `ctx`, keeping the kind.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind.label(), self.message)
    }
}

impl std::error::Error for BridgeError {}

// Topics travel as UTF-8 inside ingress frames.
impl From<std::str::Utf8Error> for BridgeError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::format(format!("topic is not utf-8: {e}"))
    }
}
