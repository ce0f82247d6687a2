//! Error types for the QuizCast client.

use thiserror::Error;

use crate::lifecycle::SessionPhase;

/// Errors that can occur when using the QuizCast client.
#[derive(Debug, Error)]
pub enum QuizCastError {
    /// The backend could not be reached (network failure, timeout, no response).
    ///
    /// Always recoverable: polling surfaces retry on the next tick instead of
    /// treating this as fatal.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The backend rejected the caller's credential (401-class response).
    ///
    /// Every host command handles this uniformly by clearing the local
    /// credential before returning the error.
    #[error("unauthorized")]
    Unauthorized,

    /// The referenced quiz or question does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Form input rejected before any network call was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// A command was attempted from the wrong lifecycle state.
    ///
    /// Callers should re-poll the session status to resync their believed
    /// state rather than assume the local view was correct.
    #[error("session is {actual:?}, expected {expected:?}")]
    SessionState {
        /// Phase the operation requires.
        expected: SessionPhase,
        /// Phase the client currently observes.
        actual: SessionPhase,
    },

    /// Attempted to open a session that the oracle reports as already open.
    #[error("session is already open")]
    AlreadyOpen,

    /// Attempted to join a session that is not open, or has already started.
    #[error("session is not joinable (phase {phase:?})")]
    NotJoinable {
        /// Phase the client observed at join time.
        phase: SessionPhase,
    },

    /// The host tried to advance past the last authored question.
    #[error("no authored questions remain")]
    QuestionsExhausted,

    /// The host tried to finish before advancing through every authored
    /// question.
    #[error("{remaining} authored question(s) have not been played")]
    QuestionsRemaining {
        /// Questions not yet advanced through.
        remaining: usize,
    },

    /// The backend returned an error response.
    ///
    /// When the response body carries a human-readable `message` it is
    /// preserved here and takes precedence over any generic client text.
    #[error("server error: {message}")]
    Server {
        /// Message from the response body, or a generic fallback.
        message: String,
        /// HTTP status code, if the response got that far.
        status: Option<u16>,
    },

    /// Failed to serialize or deserialize a protocol payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The lifecycle client is no longer running (shut down or torn down).
    #[error("lifecycle client stopped")]
    Stopped,
}

/// A specialized [`Result`] type for QuizCast client operations.
pub type Result<T> = std::result::Result<T, QuizCastError>;

impl QuizCastError {
    /// Returns `true` for transient failures that should be retried on the
    /// next poll tick rather than surfaced as terminal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}
