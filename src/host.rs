//! Host control surface: commands that move the session lifecycle forward.
//!
//! The host is the sole authority for question ordering — the session
//! service stores only whatever payload the host supplies as "current", so
//! the advancing index lives here, client-side. Command responses are
//! treated as optimistic; after every successful command the controller
//! re-polls the session service and reconciles against the authoritative
//! snapshot (remote always wins).

use std::sync::Arc;

use tracing::{debug, error};

use crate::context::AuthSession;
use crate::error::{QuizCastError, Result};
use crate::lifecycle::{SessionPhase, SessionState};
use crate::protocol::{LiveQuestion, OpenRequest, QuizId, SessionSnapshot, ViewerInfo};
use crate::service::SessionService;

/// Issues lifecycle commands for one quiz session and tracks the host's
/// advancing index through the authored question sequence.
///
/// Every command requires the credential supplied at construction. Any
/// 401-class failure clears it — the uniform forced-logout rule — after
/// which all commands fail with
/// [`Unauthorized`](QuizCastError::Unauthorized) until a new controller is
/// built from a fresh login.
pub struct HostController<S: SessionService + ?Sized> {
    service: Arc<S>,
    quiz_id: QuizId,
    credential: Option<AuthSession>,
    observed: SessionState,
    questions: Vec<LiveQuestion>,
    next_index: usize,
}

impl<S: SessionService + ?Sized> HostController<S> {
    /// Build a controller for the given quiz with an authenticated credential.
    pub fn new(service: Arc<S>, quiz_id: QuizId, credential: AuthSession) -> Self {
        Self {
            service,
            quiz_id,
            credential: Some(credential),
            observed: SessionState::new(),
            questions: Vec::new(),
            next_index: 0,
        }
    }

    /// The lifecycle phase as last confirmed by the session service.
    pub fn phase(&self) -> SessionPhase {
        self.observed.phase()
    }

    /// The held credential, or `None` after a forced logout.
    pub fn credential(&self) -> Option<&AuthSession> {
        self.credential.as_ref()
    }

    /// Index of the next question to advance to.
    pub fn advancing_index(&self) -> usize {
        self.next_index
    }

    /// Authored questions not yet advanced through.
    pub fn questions_remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.next_index)
    }

    /// Re-poll the session service and reconcile the local view against the
    /// authoritative snapshot.
    pub async fn refresh(&mut self) -> Result<SessionSnapshot> {
        let snapshot = self.service.status(self.quiz_id).await?;
        self.observed.observe(&snapshot);
        Ok(snapshot)
    }

    /// Open the session to viewers.
    ///
    /// Requires the session be `Closed`. The command response is optimistic;
    /// the returned snapshot is the authoritative state confirmed by an
    /// immediate re-poll.
    ///
    /// # Errors
    ///
    /// [`AlreadyOpen`](QuizCastError::AlreadyOpen) when the oracle already
    /// reports the session open;
    /// [`Unauthorized`](QuizCastError::Unauthorized) when the caller does
    /// not own the quiz (the credential is cleared).
    pub async fn open_session(&mut self, title: &str) -> Result<SessionSnapshot> {
        if self.phase() != SessionPhase::Closed {
            return Err(QuizCastError::AlreadyOpen);
        }
        let token = self.token()?.to_owned();
        let request = OpenRequest {
            title: title.to_owned(),
        };
        self.run_command(self.service.open(&token, self.quiz_id, &request).await)
            .await?;
        debug!(quiz_id = self.quiz_id, "session opened, confirming with oracle");
        self.refresh().await
    }

    /// Begin live play with the authored question sequence, resetting the
    /// advancing index to the first question.
    ///
    /// Requires the session be `Open`.
    pub async fn start_session(&mut self, questions: Vec<LiveQuestion>) -> Result<SessionSnapshot> {
        self.guard(SessionPhase::Open)?;
        if questions.is_empty() {
            return Err(QuizCastError::Validation(
                "cannot start a session with no questions".into(),
            ));
        }
        let token = self.token()?.to_owned();
        self.run_command(self.service.start(&token, self.quiz_id).await)
            .await?;
        self.questions = questions;
        self.next_index = 0;
        debug!(
            quiz_id = self.quiz_id,
            questions = self.questions.len(),
            "session started"
        );
        self.refresh().await
    }

    /// Advance to the next authored question, sending its full payload.
    ///
    /// Requires the session be `Started` and a question remain. Returns the
    /// question that is now live.
    pub async fn advance_question(&mut self) -> Result<LiveQuestion> {
        self.guard(SessionPhase::Started)?;
        let question = self
            .questions
            .get(self.next_index)
            .cloned()
            .ok_or(QuizCastError::QuestionsExhausted)?;
        let token = self.token()?.to_owned();
        self.run_command(
            self.service
                .advance_question(&token, self.quiz_id, &question)
                .await,
        )
        .await?;
        self.next_index += 1;
        debug!(
            quiz_id = self.quiz_id,
            question = %question.id,
            index = self.next_index,
            "advanced to question"
        );
        Ok(question)
    }

    /// End the session.
    ///
    /// Requires the session be `Started` and every authored question to have
    /// been advanced through.
    pub async fn finish_session(&mut self) -> Result<SessionSnapshot> {
        self.guard(SessionPhase::Started)?;
        let remaining = self.questions_remaining();
        if remaining > 0 {
            return Err(QuizCastError::QuestionsRemaining { remaining });
        }
        let token = self.token()?.to_owned();
        self.run_command(self.service.finish(&token, self.quiz_id).await)
            .await?;
        debug!(quiz_id = self.quiz_id, "session finished");
        self.refresh().await
    }

    /// Current participant roster.
    pub async fn participants(&self) -> Result<Vec<ViewerInfo>> {
        self.service.viewers(self.quiz_id).await
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// The bearer token, or `Unauthorized` after a forced logout.
    fn token(&self) -> Result<&str> {
        self.credential
            .as_ref()
            .map(AuthSession::token)
            .ok_or(QuizCastError::Unauthorized)
    }

    /// Require a specific observed phase before issuing a command.
    fn guard(&self, expected: SessionPhase) -> Result<()> {
        let actual = self.phase();
        if actual != expected {
            return Err(QuizCastError::SessionState { expected, actual });
        }
        Ok(())
    }

    /// Unify command outcome handling: clear the credential on 401, resync
    /// the believed state on a server-reported failure, and surface the
    /// backend's message when it carries one.
    async fn run_command(
        &mut self,
        outcome: Result<crate::protocol::CommandResponse>,
    ) -> Result<()> {
        match outcome {
            Ok(response) if response.success => Ok(()),
            Ok(response) => {
                // The oracle disagrees with our believed state; re-poll so
                // the local view resyncs rather than trusting itself.
                error!(quiz_id = self.quiz_id, message = %response.message, "command rejected");
                let _ = self.refresh().await;
                let message = if response.message.is_empty() {
                    "command rejected by session service".to_string()
                } else {
                    response.message
                };
                Err(QuizCastError::Server {
                    message,
                    status: None,
                })
            }
            Err(QuizCastError::Unauthorized) => {
                error!(quiz_id = self.quiz_id, "credential rejected, forcing logout");
                self.credential = None;
                Err(QuizCastError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }
}

impl<S: SessionService + ?Sized> std::fmt::Debug for HostController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostController")
            .field("quiz_id", &self.quiz_id)
            .field("phase", &self.phase())
            .field("advancing_index", &self.next_index)
            .field("questions", &self.questions.len())
            .field("has_credential", &self.credential.is_some())
            .finish()
    }
}
