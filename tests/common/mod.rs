#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for QuizCast Client integration tests.
//!
//! Provides a scripted [`MockSessionService`] and helper constructors for
//! common session snapshots and questions.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use quizcast_client::protocol::{
    AnswerSubmission, CommandResponse, JoinRequest, JoinResponse, LiveQuestion, OpenRequest,
    QuizId, SessionSnapshot, ViewerInfo,
};
use quizcast_client::{QuizCastError, SessionService};

// ── MockSessionService ──────────────────────────────────────────────

/// Host commands recorded by the mock, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    Open { title: String },
    Start,
    Advance { question_id: String },
    Finish,
}

/// A scripted session service for integration testing.
///
/// Status responses are consumed in order by `status()`; once the script is
/// exhausted, `status()` hangs forever so a polling loop stays alive until
/// shutdown. Command responses are consumed in order too, defaulting to
/// success when the script runs out. Everything the client sends is
/// recorded.
pub struct MockSessionService {
    /// Scripted status responses (consumed in order).
    statuses: StdMutex<VecDeque<Result<SessionSnapshot, QuizCastError>>>,
    /// Scripted command responses; empty means "always succeed".
    command_responses: StdMutex<VecDeque<Result<CommandResponse, QuizCastError>>>,
    /// Scripted join responses; empty means "accept as viewer-1".
    join_responses: StdMutex<VecDeque<Result<JoinResponse, QuizCastError>>>,
    /// Question content served by `current_question`, keyed by id.
    questions: StdMutex<HashMap<String, LiveQuestion>>,
    /// Fail the next N `current_question` calls with a connectivity error.
    question_fetch_failures: AtomicUsize,
    /// Roster served by `viewers`.
    roster: StdMutex<Vec<ViewerInfo>>,
    /// Recorded host commands.
    pub commands: Arc<StdMutex<Vec<RecordedCommand>>>,
    /// Recorded answer submissions as (session_id, submission).
    pub submissions: Arc<StdMutex<Vec<(String, AnswerSubmission)>>>,
    /// Recorded bearer tokens seen on host commands.
    pub tokens_seen: Arc<StdMutex<Vec<String>>>,
    /// Number of `status` calls made so far.
    pub status_calls: Arc<AtomicUsize>,
}

impl MockSessionService {
    /// Create a mock with the given scripted status responses.
    pub fn new(statuses: Vec<Result<SessionSnapshot, QuizCastError>>) -> Self {
        Self {
            statuses: StdMutex::new(VecDeque::from(statuses)),
            command_responses: StdMutex::new(VecDeque::new()),
            join_responses: StdMutex::new(VecDeque::new()),
            questions: StdMutex::new(HashMap::new()),
            question_fetch_failures: AtomicUsize::new(0),
            roster: StdMutex::new(Vec::new()),
            commands: Arc::new(StdMutex::new(Vec::new())),
            submissions: Arc::new(StdMutex::new(Vec::new())),
            tokens_seen: Arc::new(StdMutex::new(Vec::new())),
            status_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Register question content served by `current_question`.
    pub fn with_question(self, question: LiveQuestion) -> Self {
        self.questions
            .lock()
            .unwrap()
            .insert(question.id.clone(), question);
        self
    }

    /// Script the next command responses, consumed in order.
    pub fn with_command_responses(
        self,
        responses: Vec<Result<CommandResponse, QuizCastError>>,
    ) -> Self {
        *self.command_responses.lock().unwrap() = VecDeque::from(responses);
        self
    }

    /// Script the next join responses, consumed in order.
    pub fn with_join_responses(self, responses: Vec<Result<JoinResponse, QuizCastError>>) -> Self {
        *self.join_responses.lock().unwrap() = VecDeque::from(responses);
        self
    }

    /// Make the next `count` question-content fetches fail with a
    /// connectivity error before succeeding.
    pub fn with_question_fetch_failures(self, count: usize) -> Self {
        self.question_fetch_failures.store(count, Ordering::Relaxed);
        self
    }

    /// Set the roster served by `viewers`.
    pub fn with_roster(self, roster: Vec<ViewerInfo>) -> Self {
        *self.roster.lock().unwrap() = roster;
        self
    }

    /// Append further status responses after construction.
    pub fn push_status(&self, status: Result<SessionSnapshot, QuizCastError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    fn next_command_response(
        &self,
        token: &str,
        command: RecordedCommand,
    ) -> Result<CommandResponse, QuizCastError> {
        self.tokens_seen.lock().unwrap().push(token.to_owned());
        self.commands.lock().unwrap().push(command);
        self.command_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(CommandResponse {
                    success: true,
                    message: String::new(),
                })
            })
    }
}

#[async_trait]
impl SessionService for MockSessionService {
    async fn status(&self, _quiz: QuizId) -> Result<SessionSnapshot, QuizCastError> {
        self.status_calls.fetch_add(1, Ordering::Relaxed);
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            // Script exhausted — hang forever so the poll loop stays alive
            // until shutdown is called.
            None => std::future::pending().await,
        }
    }

    async fn current_question(
        &self,
        _quiz: QuizId,
        reference: &str,
    ) -> Result<LiveQuestion, QuizCastError> {
        let failures = self.question_fetch_failures.load(Ordering::Relaxed);
        if failures > 0 {
            self.question_fetch_failures
                .store(failures - 1, Ordering::Relaxed);
            return Err(QuizCastError::Connectivity("scripted failure".into()));
        }
        self.questions
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| QuizCastError::NotFound(format!("question {reference}")))
    }

    async fn join(
        &self,
        _quiz: QuizId,
        _request: &JoinRequest,
    ) -> Result<JoinResponse, QuizCastError> {
        self.join_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(JoinResponse {
                    success: true,
                    session_id: Some("viewer-1".into()),
                    message: String::new(),
                })
            })
    }

    async fn open(
        &self,
        token: &str,
        _quiz: QuizId,
        request: &OpenRequest,
    ) -> Result<CommandResponse, QuizCastError> {
        self.next_command_response(
            token,
            RecordedCommand::Open {
                title: request.title.clone(),
            },
        )
    }

    async fn start(&self, token: &str, _quiz: QuizId) -> Result<CommandResponse, QuizCastError> {
        self.next_command_response(token, RecordedCommand::Start)
    }

    async fn advance_question(
        &self,
        token: &str,
        _quiz: QuizId,
        question: &LiveQuestion,
    ) -> Result<CommandResponse, QuizCastError> {
        self.questions
            .lock()
            .unwrap()
            .insert(question.id.clone(), question.clone());
        self.next_command_response(
            token,
            RecordedCommand::Advance {
                question_id: question.id.clone(),
            },
        )
    }

    async fn finish(&self, token: &str, _quiz: QuizId) -> Result<CommandResponse, QuizCastError> {
        self.next_command_response(token, RecordedCommand::Finish)
    }

    async fn submit_answer(
        &self,
        _quiz: QuizId,
        session_id: &str,
        submission: &AnswerSubmission,
    ) -> Result<CommandResponse, QuizCastError> {
        self.submissions
            .lock()
            .unwrap()
            .push((session_id.to_owned(), submission.clone()));
        Ok(CommandResponse {
            success: true,
            message: String::new(),
        })
    }

    async fn viewers(&self, _quiz: QuizId) -> Result<Vec<ViewerInfo>, QuizCastError> {
        Ok(self.roster.lock().unwrap().clone())
    }
}

// ── Snapshot and question helpers ───────────────────────────────────

/// Snapshot for a session that has not been opened.
pub fn snap_closed() -> SessionSnapshot {
    SessionSnapshot::default()
}

/// Snapshot for a session open to joins.
pub fn snap_open() -> SessionSnapshot {
    SessionSnapshot {
        is_open: true,
        quiz_title: Some("Capitals of Europe".into()),
        ..SessionSnapshot::default()
    }
}

/// Snapshot for a started session, optionally with a live question reference.
pub fn snap_started(current_question: Option<&str>) -> SessionSnapshot {
    SessionSnapshot {
        is_open: true,
        is_started: true,
        current_question: current_question.map(str::to_owned),
        ..SessionSnapshot::default()
    }
}

/// Snapshot for a finished session.
pub fn snap_finished() -> SessionSnapshot {
    SessionSnapshot {
        is_open: true,
        is_started: true,
        is_finished: true,
        ..SessionSnapshot::default()
    }
}

/// A four-option question with the given id; "Paris" (index 2) is correct.
pub fn capital_question(id: &str, points: u32, time_limit: u32) -> LiveQuestion {
    LiveQuestion {
        id: id.into(),
        question: "What is the capital of France?".into(),
        options: vec![
            "London".into(),
            "Berlin".into(),
            "Paris".into(),
            "Madrid".into(),
        ],
        correct_answer: 2,
        time_limit,
        points,
    }
}

/// A command response with `success: false` and the given message.
pub fn rejected(message: &str) -> CommandResponse {
    CommandResponse {
        success: false,
        message: message.into(),
    }
}
