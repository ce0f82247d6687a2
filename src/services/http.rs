//! HTTP backend implementation using `reqwest`.
//!
//! This module provides [`HttpBackend`], a single client that implements all
//! three service traits ([`AuthService`], [`BuilderService`],
//! [`SessionService`]) against the QuizCast REST endpoints. The three
//! services usually live behind one gateway, so [`HttpBackend::new`] takes a
//! single base URL; deployments that split them use
//! [`HttpBackend::with_bases`].
//!
//! # Feature gate
//!
//! This module is only available when the `backend-http` feature is enabled
//! (it is enabled by default).
//!
//! # Error mapping
//!
//! Transport-level failures (DNS, refused connection, timeout) become
//! [`QuizCastError::Connectivity`]. HTTP statuses map onto the error
//! taxonomy: 401 → [`Unauthorized`](QuizCastError::Unauthorized), 404 →
//! [`NotFound`](QuizCastError::NotFound), anything else non-2xx →
//! [`Server`](QuizCastError::Server) carrying the body's `message` field
//! when the body has one.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{QuizCastError, Result};
use crate::protocol::{
    AnswerSubmission, AuthResponse, AuthoredQuestion, CommandResponse, JoinRequest, JoinResponse,
    LiveQuestion, LoginRequest, OpenRequest, QuestionDraft, Quiz, QuizDraft, QuizId,
    SessionSnapshot, SignupRequest, UserProfile, ViewerInfo, ViewersResponse,
};
use crate::service::{AuthService, BuilderService, SessionService};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Answer submissions carry the participant token alongside the answer
/// fields in one flat body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerBody<'a> {
    session_id: &'a str,
    #[serde(flatten)]
    submission: &'a AnswerSubmission,
}

/// An HTTP client for the QuizCast auth, builder, and session services.
///
/// Cheap to clone: the underlying `reqwest` client shares its connection
/// pool across clones.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    auth_base: String,
    builder_base: String,
    session_base: String,
}

impl HttpBackend {
    /// Build a backend with all three services behind one base URL, e.g.
    /// `http://localhost:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizCastError::Connectivity`] if the underlying HTTP client
    /// cannot be constructed (an unusable TLS environment, in practice).
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_bases(base_url, base_url, base_url)
    }

    /// Build a backend with separately deployed auth, builder, and session
    /// services.
    pub fn with_bases(auth: &str, builder: &str, session: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| QuizCastError::Connectivity(e.to_string()))?;
        Ok(Self {
            client,
            auth_base: auth.trim_end_matches('/').to_owned(),
            builder_base: builder.trim_end_matches('/').to_owned(),
            session_base: session.trim_end_matches('/').to_owned(),
        })
    }

    /// Use a pre-configured `reqwest` client (custom TLS, proxy, timeouts).
    pub fn from_client(client: reqwest::Client, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_owned();
        Self {
            client,
            auth_base: base.clone(),
            builder_base: base.clone(),
            session_base: base,
        }
    }

    // ── Request plumbing ────────────────────────────────────────────

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| QuizCastError::Connectivity(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| QuizCastError::Connectivity(e.to_string()))?;

        if !status.is_success() {
            return Err(error_for(status, &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(%url, "GET");
        self.send(self.client.get(&url)).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: String,
        token: Option<&str>,
        body: &B,
    ) -> Result<T> {
        debug!(%url, authenticated = token.is_some(), "POST");
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.send(request).await
    }

    async fn get_authed<T: DeserializeOwned>(&self, url: String, token: &str) -> Result<T> {
        debug!(%url, "GET");
        self.send(self.client.get(&url).bearer_auth(token)).await
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/api/auth/{path}", self.auth_base)
    }

    fn builder_url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.builder_base)
    }

    fn session_url(&self, quiz: QuizId, path: &str) -> String {
        format!("{}/api/viewer/quiz/{quiz}/{path}", self.session_base)
    }
}

/// Map a non-2xx response onto the error taxonomy. The body's `message`
/// field, when present, takes precedence over generic text.
fn error_for(status: reqwest::StatusCode, body: &[u8]) -> QuizCastError {
    let message = serde_json::from_slice::<CommandResponse>(body)
        .ok()
        .map(|r| r.message)
        .filter(|m| !m.is_empty());
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            QuizCastError::Unauthorized
        }
        reqwest::StatusCode::NOT_FOUND => QuizCastError::NotFound(
            message.unwrap_or_else(|| "resource not found".to_string()),
        ),
        _ => QuizCastError::Server {
            message: message.unwrap_or_else(|| format!("request failed with status {status}")),
            status: Some(status.as_u16()),
        },
    }
}

#[async_trait]
impl AuthService for HttpBackend {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse> {
        self.post_json(self.auth_url("signup"), None, request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        self.post_json(self.auth_url("login"), None, request).await
    }

    async fn validate(&self, token: &str) -> Result<UserProfile> {
        self.post_json(self.auth_url("validate"), Some(token), &serde_json::json!({}))
            .await
    }
}

#[async_trait]
impl BuilderService for HttpBackend {
    async fn list_quizzes(&self, token: &str) -> Result<Vec<Quiz>> {
        self.get_authed(self.builder_url("quiz"), token).await
    }

    async fn create_quiz(&self, token: &str, draft: &QuizDraft) -> Result<Quiz> {
        draft.validate()?;
        self.post_json(self.builder_url("quiz"), Some(token), draft)
            .await
    }

    async fn get_quiz(&self, token: &str, quiz: QuizId) -> Result<Quiz> {
        self.get_authed(self.builder_url(&format!("quiz/{quiz}")), token)
            .await
    }

    // The builder service takes updates as a POST to the resource path.
    async fn update_quiz(&self, token: &str, quiz: QuizId, draft: &QuizDraft) -> Result<Quiz> {
        draft.validate()?;
        self.post_json(self.builder_url(&format!("quiz/{quiz}")), Some(token), draft)
            .await
    }

    async fn list_questions(&self, token: &str, quiz: QuizId) -> Result<Vec<AuthoredQuestion>> {
        self.get_authed(self.builder_url(&format!("quiz/{quiz}/question")), token)
            .await
    }

    async fn get_question(
        &self,
        token: &str,
        quiz: QuizId,
        question: &str,
    ) -> Result<AuthoredQuestion> {
        self.get_authed(
            self.builder_url(&format!("quiz/{quiz}/question/{question}")),
            token,
        )
        .await
    }

    async fn create_question(
        &self,
        token: &str,
        quiz: QuizId,
        draft: &QuestionDraft,
    ) -> Result<AuthoredQuestion> {
        draft.validate()?;
        self.post_json(
            self.builder_url(&format!("quiz/{quiz}/question")),
            Some(token),
            draft,
        )
        .await
    }

    async fn update_question(
        &self,
        token: &str,
        quiz: QuizId,
        question: &str,
        draft: &QuestionDraft,
    ) -> Result<AuthoredQuestion> {
        draft.validate()?;
        self.post_json(
            self.builder_url(&format!("quiz/{quiz}/question/{question}")),
            Some(token),
            draft,
        )
        .await
    }
}

#[async_trait]
impl SessionService for HttpBackend {
    async fn status(&self, quiz: QuizId) -> Result<SessionSnapshot> {
        self.post_json(self.session_url(quiz, "status"), None, &serde_json::json!({}))
            .await
    }

    async fn current_question(&self, quiz: QuizId, reference: &str) -> Result<LiveQuestion> {
        self.get_json(self.session_url(quiz, &format!("question/{reference}")))
            .await
    }

    async fn join(&self, quiz: QuizId, request: &JoinRequest) -> Result<JoinResponse> {
        self.post_json(self.session_url(quiz, "join"), None, request)
            .await
    }

    async fn open(
        &self,
        token: &str,
        quiz: QuizId,
        request: &OpenRequest,
    ) -> Result<CommandResponse> {
        self.post_json(self.session_url(quiz, "open"), Some(token), request)
            .await
    }

    async fn start(&self, token: &str, quiz: QuizId) -> Result<CommandResponse> {
        self.post_json(
            self.session_url(quiz, "start"),
            Some(token),
            &serde_json::json!({}),
        )
        .await
    }

    async fn advance_question(
        &self,
        token: &str,
        quiz: QuizId,
        question: &LiveQuestion,
    ) -> Result<CommandResponse> {
        self.post_json(
            self.session_url(quiz, &format!("question/{}", question.id)),
            Some(token),
            question,
        )
        .await
    }

    async fn finish(&self, token: &str, quiz: QuizId) -> Result<CommandResponse> {
        self.post_json(
            self.session_url(quiz, "finish"),
            Some(token),
            &serde_json::json!({}),
        )
        .await
    }

    async fn submit_answer(
        &self,
        quiz: QuizId,
        session_id: &str,
        submission: &AnswerSubmission,
    ) -> Result<CommandResponse> {
        let body = AnswerBody {
            session_id,
            submission,
        };
        self.post_json(self.session_url(quiz, "answer"), None, &body)
            .await
    }

    async fn viewers(&self, quiz: QuizId) -> Result<Vec<ViewerInfo>> {
        let response: ViewersResponse = self.get_json(self.session_url(quiz, "viewers")).await?;
        Ok(response.viewers)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn base_urls_are_normalized() {
        let backend = HttpBackend::new("http://localhost:8080/").unwrap();
        assert_eq!(
            backend.session_url(42, "status"),
            "http://localhost:8080/api/viewer/quiz/42/status"
        );
        assert_eq!(
            backend.auth_url("login"),
            "http://localhost:8080/api/auth/login"
        );
        assert_eq!(
            backend.builder_url("quiz/7/question"),
            "http://localhost:8080/api/quiz/7/question"
        );
    }

    #[test]
    fn answer_body_flattens_submission_fields() {
        let submission = AnswerSubmission {
            question_id: "q1".into(),
            answer: "Paris".into(),
            submission_time: 1_700_000_000_000,
        };
        let body = AnswerBody {
            session_id: "viewer-abc",
            submission: &submission,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sessionId"], "viewer-abc");
        assert_eq!(json["questionId"], "q1");
        assert_eq!(json["answer"], "Paris");
        assert_eq!(json["submissionTime"], 1_700_000_000_000_i64);
    }

    #[test]
    fn status_401_maps_to_unauthorized() {
        let err = error_for(reqwest::StatusCode::UNAUTHORIZED, b"{}");
        assert!(matches!(err, QuizCastError::Unauthorized));
    }

    #[test]
    fn status_404_maps_to_not_found_with_body_message() {
        let err = error_for(
            reqwest::StatusCode::NOT_FOUND,
            br#"{"success":false,"message":"quiz 42 does not exist"}"#,
        );
        match err {
            QuizCastError::NotFound(message) => {
                assert_eq!(message, "quiz 42 does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn server_errors_prefer_the_body_message() {
        let err = error_for(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"message":"database unavailable"}"#,
        );
        match err {
            QuizCastError::Server { message, status } => {
                assert_eq!(message, "database unavailable");
                assert_eq!(status, Some(500));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn server_errors_fall_back_to_generic_text() {
        let err = error_for(reqwest::StatusCode::BAD_GATEWAY, b"not json");
        match err {
            QuizCastError::Server { message, status } => {
                assert!(message.contains("502"));
                assert_eq!(status, Some(502));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_surfaces_connectivity() {
        // Port 1 on loopback refuses immediately.
        let backend = HttpBackend::new("http://127.0.0.1:1").unwrap();
        let err = backend.status(1).await.unwrap_err();
        assert!(err.is_transient(), "expected Connectivity, got {err:?}");
    }
}
