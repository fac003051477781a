//! Session-level errors.

use frontline_core::EngineError;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures surfaced by the host session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A fatal engine error bubbled up from rule execution.
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("no phase is currently running")]
    NoActivePhase,

    #[error("the running phase is '{running}', not '{wanted}'")]
    WrongPhase { running: String, wanted: &'static str },

    /// The session worker has shut down; the handle is dead.
    #[error("session worker is gone")]
    WorkerGone,

    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    #[error("snapshot decoding failed: {0}")]
    Decode(String),
}
