//! Turn error taxonomy: revoked contexts, transport capability gaps, and
//! failures escaping the middleware chain.

/// Errors surfaced by the turn pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// Operation attempted on a finished turn's context. Always a bug in
    /// host code (e.g. a callback holding the context past its turn).
    #[error("turn context revoked: the turn has already completed")]
    Revoked,

    /// The adapter's transport cannot perform the named operation.
    /// Recoverable: callers can fall back to sending a new activity.
    #[error("{0}: not supported")]
    NotSupported(&'static str),

    /// A middleware unit or the application logic failed.
    #[error("middleware failure: {0}")]
    Middleware(String),
}

impl TurnError {
    /// Wrap an application or middleware failure message.
    pub fn middleware(msg: impl Into<String>) -> Self {
        TurnError::Middleware(msg.into())
    }
}
