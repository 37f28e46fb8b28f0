//! Error types

/// Failure talking to the engine.
#[derive(Debug, thiserror::Error)]
pub(crate) enum EngineError {
    /// The request never got a response (connection refused, timeout, ...).
    #[error("engine request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The engine answered with an error status.
    #[error("engine rejected request ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl EngineError {
    /// True when the engine itself refused the request (e.g. a duplicate
    /// event registration), as opposed to the engine being unreachable.
    pub(crate) fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Rejected { status, .. } if status.is_client_error())
    }
}

/// Request-level errors surfaced to the routing layer.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("invalid key {0:?}: expected a single letter or a named special key")]
    InvalidKey(String),
    #[error("key {0:?} does not belong to any region")]
    UnknownRegion(char),
    #[error("invalid color {0:?}: expected #RRGGBB")]
    InvalidColor(String),
    #[error("invalid duration {0}: expected a positive number of seconds")]
    InvalidDuration(f64),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
