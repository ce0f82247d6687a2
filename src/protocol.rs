//! Wire types for the three QuizCast backend services.
//!
//! Every type here matches the JSON the auth, builder, and session services
//! exchange (camelCase field names). The backends are loose about optional
//! fields and identifier types, so all defaulting and normalization rules
//! live in this module and are applied exactly once at the deserialization
//! boundary:
//!
//! - missing `timeLimit` → 30 seconds
//! - missing `points` → 10
//! - missing `options` → four empty slots
//! - question references may arrive as JSON numbers or strings; both
//!   normalize to [`String`], and empty strings normalize to absent

use serde::{Deserialize, Deserializer, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Stable integer identifier for a quiz. Doubles as the join code.
pub type QuizId = i64;

// ── Defaults ────────────────────────────────────────────────────────

/// Default per-question time limit in seconds.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;

/// Default points awarded for a correct answer.
pub const DEFAULT_POINTS: u32 = 10;

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_points() -> u32 {
    DEFAULT_POINTS
}

fn default_options() -> Vec<String> {
    vec![String::new(); 4]
}

/// Accepts a question reference as either a JSON number or a string.
/// Empty strings normalize to `None`.
fn de_opt_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRef {
        Num(i64),
        Text(String),
    }

    let raw = Option::<RawRef>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawRef::Num(n)) => Some(n.to_string()),
        Some(RawRef::Text(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Accepts a required identifier as either a JSON number or a string.
fn de_ref<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRef {
        Num(i64),
        Text(String),
    }

    Ok(match RawRef::deserialize(deserializer)? {
        RawRef::Num(n) => n.to_string(),
        RawRef::Text(s) => s,
    })
}

// ── Session service types ───────────────────────────────────────────

/// Snapshot of a session's lifecycle state as reported by the session
/// service ("the oracle").
///
/// The flags obey `isFinished ⇒ isStarted ⇒ isOpen`; [`crate::lifecycle`]
/// derives the phase from them and enforces monotonic progression. `message`
/// is advisory display text and is never parsed for control decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Viewers may join.
    #[serde(default)]
    pub is_open: bool,
    /// Live play has begun.
    #[serde(default)]
    pub is_started: bool,
    /// The session has ended. Terminal.
    #[serde(default)]
    pub is_finished: bool,
    /// Reference to the question currently live, if any.
    #[serde(default, deserialize_with = "de_opt_ref")]
    pub current_question: Option<String>,
    /// Human-readable status line for display only.
    #[serde(default)]
    pub message: String,
    /// Title of the quiz being played, when the service includes it.
    #[serde(default)]
    pub quiz_title: Option<String>,
}

/// A question as delivered to a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveQuestion {
    /// Question identifier, normalized to a string.
    #[serde(deserialize_with = "de_ref")]
    pub id: String,
    /// Prompt text shown to participants.
    pub question: String,
    /// Ordered answer options. 2–4 are meaningful; missing options arrive
    /// as four empty slots.
    #[serde(default = "default_options")]
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    #[serde(default)]
    pub correct_answer: usize,
    /// Seconds participants have to answer.
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
    /// Points awarded for a correct answer (before speed weighting).
    #[serde(default = "default_points")]
    pub points: u32,
}

impl LiveQuestion {
    /// Options that remain non-empty after trimming, in order.
    pub fn answerable_options(&self) -> impl Iterator<Item = (usize, &str)> {
        self.options
            .iter()
            .map(|o| o.trim())
            .enumerate()
            .filter(|(_, o)| !o.is_empty())
    }

    /// The correct option's text, if the index references a non-empty option.
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer)
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
    }
}

/// Request body for joining a session as a viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Quiz the viewer is joining.
    pub quiz_id: QuizId,
    /// Display name chosen by the viewer.
    pub name: String,
}

/// Response to a viewer join request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// Whether the join was accepted.
    #[serde(default)]
    pub success: bool,
    /// Opaque participant token. This, not the display name, is the
    /// identity used for every subsequent submission.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Backend-supplied message, if any.
    #[serde(default)]
    pub message: String,
}

/// One answer submission. Ephemeral: at most one per (participant, question).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    /// Question being answered.
    pub question_id: String,
    /// Chosen option text. Empty when the timer expired with no selection.
    pub answer: String,
    /// Client clock at submission, milliseconds since the Unix epoch.
    pub submission_time: i64,
}

impl AnswerSubmission {
    /// Build a submission stamped with the current wall clock.
    pub fn now(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            submission_time: millis,
        }
    }

    /// Whether this is the automatic "no answer" submission.
    pub fn is_empty(&self) -> bool {
        self.answer.is_empty()
    }
}

/// Generic `{success, message}` envelope returned by session commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Connection state of a participant as tracked by the session service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Disconnected,
}

/// One participant in the session roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerInfo {
    /// Opaque participant token issued at join.
    #[serde(default)]
    pub session_id: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub status: ConnectionStatus,
    /// Cumulative score as the backend knows it.
    #[serde(default)]
    pub total_score: u32,
}

/// Response envelope for the participant roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewersResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub viewers: Vec<ViewerInfo>,
}

/// Request body for opening a session to viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
    /// Quiz title echoed to joining viewers.
    pub title: String,
}

// ── Auth service types ──────────────────────────────────────────────

/// Request body for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Request body for logging in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email address; the auth service accepts either.
    pub username_or_email: String,
    pub password: String,
}

/// Response to a successful login or signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    /// Bearer token for subsequent builder and session calls.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub message: String,
}

/// Account profile returned by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

// ── Builder service types ───────────────────────────────────────────

/// An authored quiz owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: QuizId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Payload for creating or updating a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl QuizDraft {
    /// Rejects drafts with an empty title before any network call.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::error::QuizCastError::Validation(
                "quiz title must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A question as stored by the builder service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredQuestion {
    /// Question identifier, normalized to a string.
    #[serde(deserialize_with = "de_ref")]
    pub id: String,
    /// Prompt text.
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_options")]
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    #[serde(default)]
    pub correct_answer: usize,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
}

impl AuthoredQuestion {
    /// Convert to the payload sent to the live session service when the host
    /// advances to this question.
    pub fn to_live(&self) -> LiveQuestion {
        LiveQuestion {
            id: self.id.clone(),
            question: self.text.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_answer,
            time_limit: self.time_limit,
            points: self.points,
        }
    }
}

/// Payload for creating or updating a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
}

impl QuestionDraft {
    /// Rejects malformed drafts before any network call: the prompt and at
    /// least two options must be non-empty after trimming, and the correct
    /// index must reference a non-empty option.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::QuizCastError;

        if self.text.trim().is_empty() {
            return Err(QuizCastError::Validation(
                "question text must not be empty".into(),
            ));
        }
        let non_empty = self.options.iter().filter(|o| !o.trim().is_empty()).count();
        if non_empty < 2 {
            return Err(QuizCastError::Validation(
                "at least two non-empty options are required".into(),
            ));
        }
        let correct_ok = self
            .options
            .get(self.correct_answer)
            .map(|o| !o.trim().is_empty())
            .unwrap_or(false);
        if !correct_ok {
            return Err(QuizCastError::Validation(
                "the correct answer must reference a non-empty option".into(),
            ));
        }
        if self.time_limit == 0 {
            return Err(QuizCastError::Validation(
                "time limit must be positive".into(),
            ));
        }
        if self.points == 0 {
            return Err(QuizCastError::Validation("points must be positive".into()));
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    fn snapshot_defaults_apply_for_sparse_payload() {
        let snap: SessionSnapshot = serde_json::from_str(r#"{"isOpen":true}"#).unwrap();
        assert!(snap.is_open);
        assert!(!snap.is_started);
        assert!(!snap.is_finished);
        assert!(snap.current_question.is_none());
        assert_eq!(snap.message, "");
    }

    #[test]
    fn snapshot_accepts_numeric_question_ref() {
        let snap: SessionSnapshot =
            serde_json::from_str(r#"{"isStarted":true,"currentQuestion":17}"#).unwrap();
        assert_eq!(snap.current_question.as_deref(), Some("17"));
    }

    #[test]
    fn snapshot_accepts_string_question_ref() {
        let snap: SessionSnapshot =
            serde_json::from_str(r#"{"isStarted":true,"currentQuestion":"q-17"}"#).unwrap();
        assert_eq!(snap.current_question.as_deref(), Some("q-17"));
    }

    #[test]
    fn snapshot_normalizes_empty_question_ref_to_none() {
        let snap: SessionSnapshot =
            serde_json::from_str(r#"{"isStarted":true,"currentQuestion":""}"#).unwrap();
        assert!(snap.current_question.is_none());
    }

    #[test]
    fn live_question_defaults_time_limit_and_points() {
        let q: LiveQuestion =
            serde_json::from_str(r#"{"id":3,"question":"2+2?","options":["3","4"]}"#).unwrap();
        assert_eq!(q.id, "3");
        assert_eq!(q.time_limit, 30);
        assert_eq!(q.points, 10);
    }

    #[test]
    fn live_question_defaults_missing_options_to_four_empty_slots() {
        let q: LiveQuestion = serde_json::from_str(r#"{"id":"a","question":"?"}"#).unwrap();
        assert_eq!(q.options.len(), 4);
        assert!(q.options.iter().all(String::is_empty));
        assert!(q.correct_option().is_none());
    }

    #[test]
    fn correct_option_ignores_whitespace_only_entries() {
        let q = LiveQuestion {
            id: "1".into(),
            question: "?".into(),
            options: vec!["  ".into(), "Paris".into()],
            correct_answer: 1,
            time_limit: 30,
            points: 10,
        };
        assert_eq!(q.correct_option(), Some("Paris"));
        assert_eq!(q.answerable_options().count(), 1);
    }

    #[test]
    fn question_draft_requires_two_options() {
        let draft = QuestionDraft {
            text: "Capital of France?".into(),
            options: vec!["Paris".into(), "  ".into(), String::new()],
            correct_answer: 0,
            points: 10,
            time_limit: 30,
        };
        assert!(matches!(
            draft.validate(),
            Err(crate::error::QuizCastError::Validation(_))
        ));
    }

    #[test]
    fn question_draft_rejects_correct_index_on_empty_option() {
        let draft = QuestionDraft {
            text: "?".into(),
            options: vec!["a".into(), "b".into(), String::new()],
            correct_answer: 2,
            points: 10,
            time_limit: 30,
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn question_draft_accepts_valid_input() {
        let draft = QuestionDraft {
            text: "?".into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: 1,
            points: 10,
            time_limit: 30,
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn quiz_draft_rejects_blank_title() {
        let draft = QuizDraft {
            title: "   ".into(),
            description: String::new(),
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn authored_question_converts_to_live_payload() {
        let authored: AuthoredQuestion = serde_json::from_str(
            r#"{"id":9,"text":"2+2?","options":["3","4"],"correctAnswer":1}"#,
        )
        .unwrap();
        let live = authored.to_live();
        assert_eq!(live.id, "9");
        assert_eq!(live.question, "2+2?");
        assert_eq!(live.correct_answer, 1);
        assert_eq!(live.time_limit, 30);
        assert_eq!(live.points, 10);
    }

    #[test]
    fn answer_submission_roundtrips_camel_case() {
        let sub = AnswerSubmission {
            question_id: "q1".into(),
            answer: "Paris".into(),
            submission_time: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&sub).unwrap();
        assert!(json.contains("\"questionId\""));
        assert!(json.contains("\"submissionTime\""));
        let back: AnswerSubmission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sub);
    }

    #[test]
    fn empty_answer_submission_is_flagged_empty() {
        let sub = AnswerSubmission::now("q1", "");
        assert!(sub.is_empty());
        assert!(sub.submission_time >= 0);
    }

    #[test]
    fn viewer_info_defaults_status_and_score() {
        let v: ViewerInfo = serde_json::from_str(r#"{"name":"Alice"}"#).unwrap();
        assert_eq!(v.status, ConnectionStatus::Connected);
        assert_eq!(v.total_score, 0);
    }

    #[test]
    fn connection_status_uses_screaming_case() {
        let json = serde_json::to_string(&ConnectionStatus::Disconnected).unwrap();
        assert_eq!(json, "\"DISCONNECTED\"");
    }
}
