//! Service abstractions for the three QuizCast backend collaborators.
//!
//! The client is backend-agnostic: the auth, quiz-builder, and live-session
//! services are each modelled as a trait, and every surface in this crate
//! talks to them only through these seams. The built-in HTTP implementation
//! lives in [`crate::services::http`] behind the `backend-http` feature;
//! tests substitute scripted mocks.
//!
//! All traits are object-safe, so `Arc<dyn SessionService>` works for
//! dynamic dispatch where the surfaces need shared ownership.

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{
    AnswerSubmission, AuthResponse, AuthoredQuestion, CommandResponse, JoinRequest, JoinResponse,
    LiveQuestion, LoginRequest, OpenRequest, QuestionDraft, Quiz, QuizDraft, QuizId,
    SessionSnapshot, SignupRequest, UserProfile, ViewerInfo,
};

/// Account management collaborator.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account. Mirrors `POST /api/auth/signup`.
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse>;

    /// Exchange credentials for a bearer token. Mirrors `POST /api/auth/login`.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;

    /// Check that a previously issued token is still accepted.
    /// Mirrors `POST /api/auth/validate`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizCastError::Unauthorized`](crate::QuizCastError::Unauthorized)
    /// when the token has been rejected; callers must then discard it.
    async fn validate(&self, token: &str) -> Result<UserProfile>;
}

/// Quiz and question authoring collaborator.
#[async_trait]
pub trait BuilderService: Send + Sync {
    /// Quizzes owned by the caller.
    async fn list_quizzes(&self, token: &str) -> Result<Vec<Quiz>>;

    /// Create a quiz. The draft must pass
    /// [`QuizDraft::validate`] before being sent.
    async fn create_quiz(&self, token: &str, draft: &QuizDraft) -> Result<Quiz>;

    /// Fetch one quiz by id.
    async fn get_quiz(&self, token: &str, quiz: QuizId) -> Result<Quiz>;

    /// Update a quiz's title/description.
    async fn update_quiz(&self, token: &str, quiz: QuizId, draft: &QuizDraft) -> Result<Quiz>;

    /// The quiz's authored questions, in play order.
    async fn list_questions(&self, token: &str, quiz: QuizId) -> Result<Vec<AuthoredQuestion>>;

    /// Fetch one authored question.
    async fn get_question(
        &self,
        token: &str,
        quiz: QuizId,
        question: &str,
    ) -> Result<AuthoredQuestion>;

    /// Create a question. The draft must pass [`QuestionDraft::validate`]
    /// before being sent.
    async fn create_question(
        &self,
        token: &str,
        quiz: QuizId,
        draft: &QuestionDraft,
    ) -> Result<AuthoredQuestion>;

    /// Update an existing question.
    async fn update_question(
        &self,
        token: &str,
        quiz: QuizId,
        question: &str,
        draft: &QuestionDraft,
    ) -> Result<AuthoredQuestion>;
}

/// Live session collaborator — "the oracle".
///
/// The session service is the sole authority for lifecycle state. Read
/// operations (`status`, `current_question`, `viewers`, `join`,
/// `submit_answer`) are unauthenticated; host commands carry the owner's
/// bearer token.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Current lifecycle snapshot for a quiz.
    /// Mirrors `POST /api/viewer/quiz/{id}/status`.
    async fn status(&self, quiz: QuizId) -> Result<SessionSnapshot>;

    /// Authoritative content of the question a snapshot references.
    /// Mirrors `GET /api/viewer/quiz/{id}/question/{qid}`.
    async fn current_question(&self, quiz: QuizId, reference: &str) -> Result<LiveQuestion>;

    /// Join as a viewer. Mirrors `POST /api/viewer/quiz/{id}/join`.
    async fn join(&self, quiz: QuizId, request: &JoinRequest) -> Result<JoinResponse>;

    /// Open the session to viewers (host only).
    async fn open(&self, token: &str, quiz: QuizId, request: &OpenRequest)
        -> Result<CommandResponse>;

    /// Begin live play (host only).
    async fn start(&self, token: &str, quiz: QuizId) -> Result<CommandResponse>;

    /// Advance to the given question, sending its full payload — the
    /// session service stores only what the host supplies (host only).
    /// Mirrors `POST /api/viewer/quiz/{id}/question/{qid}`.
    async fn advance_question(
        &self,
        token: &str,
        quiz: QuizId,
        question: &LiveQuestion,
    ) -> Result<CommandResponse>;

    /// End the session (host only).
    async fn finish(&self, token: &str, quiz: QuizId) -> Result<CommandResponse>;

    /// Submit one answer on behalf of a participant.
    /// Mirrors `POST /api/viewer/quiz/{id}/answer`.
    async fn submit_answer(
        &self,
        quiz: QuizId,
        session_id: &str,
        submission: &AnswerSubmission,
    ) -> Result<CommandResponse>;

    /// Participant roster. Mirrors `GET /api/viewer/quiz/{id}/viewers`.
    async fn viewers(&self, quiz: QuizId) -> Result<Vec<ViewerInfo>>;
}
