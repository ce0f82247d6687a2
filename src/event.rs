//! Typed transition notifications emitted by the lifecycle client.

use crate::protocol::LiveQuestion;

/// Events emitted on the channel returned by
/// [`LifecycleClient::start`](crate::poller::LifecycleClient::start).
///
/// Phase events arrive in lifecycle order and each at most once per session;
/// [`QuestionAdvanced`](SessionEvent::QuestionAdvanced) arrives once per
/// advanced question. [`Stopped`](SessionEvent::Stopped) is always the final
/// event before the channel closes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session opened to viewers (`Closed → Open`).
    SessionOpened,
    /// Live play began (`Open → Started`).
    SessionStarted,
    /// The host advanced to a new question. Carries the authoritative
    /// question content fetched from the session service.
    QuestionAdvanced {
        /// The now-live question.
        question: LiveQuestion,
    },
    /// The session ended (`Started → Finished`). Polling stops after this.
    SessionFinished,
    /// A poll failed transiently. Advisory only: surface as a banner if
    /// desired; the next tick retries automatically.
    PollFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The polling loop has stopped and no further events will arrive.
    Stopped {
        /// Why polling stopped, when known (`None` = session finished).
        reason: Option<String>,
    },
}
