//! Viewer participation surface: join, observe, answer, score.
//!
//! The countdown is strictly local: the embedding drives [`ViewerClient::tick`]
//! once per second, and a countdown that reaches zero with no manual
//! submission produces exactly one automatic empty submission. Together with
//! the idempotence of [`ViewerClient::submit_answer`] this guarantees every
//! question yields at most one submission per participant, even on timeout.
//!
//! The locally accumulated score is an optimistic mirror of the backend's
//! authoritative ledger, speed-weighted so faster correct answers score more.

use std::sync::Arc;

use tracing::debug;

use crate::context::ViewerSession;
use crate::error::{QuizCastError, Result};
use crate::event::SessionEvent;
use crate::lifecycle::{SessionPhase, SessionState};
use crate::protocol::{AnswerSubmission, JoinRequest, LiveQuestion, QuizId, SessionSnapshot};
use crate::service::SessionService;

/// Default minimum award for a correct answer, so a last-moment correct
/// answer still scores something.
pub const DEFAULT_MINIMUM_AWARD: u32 = 1;

/// Optimistic score delta for one answer.
///
/// A correct answer is speed-weighted:
/// `max(minimum_award, floor(remaining / limit × points))`. Incorrect or
/// empty answers score zero.
pub fn score_for_answer(
    correct: bool,
    remaining_secs: u32,
    limit_secs: u32,
    points: u32,
    minimum_award: u32,
) -> u32 {
    if !correct || limit_secs == 0 {
        return 0;
    }
    let weighted = (u64::from(remaining_secs.min(limit_secs)) * u64::from(points))
        / u64::from(limit_secs);
    (weighted as u32).max(minimum_award)
}

// ── Play state machine ──────────────────────────────────────────────

/// The question currently on screen.
#[derive(Debug, Clone)]
struct ActiveQuestion {
    question: LiveQuestion,
    remaining: u32,
    selected: Option<usize>,
    submitted: bool,
}

/// Final results shown once the session finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResults {
    /// Locally accumulated (optimistic) score.
    pub final_score: u32,
    /// Questions the viewer was shown, answered or expired.
    pub questions_answered: u32,
}

/// Pure per-question state machine driving the viewer play screen.
///
/// Owns the countdown, the at-most-one-submission latch, and the optimistic
/// score. Contains no I/O; [`ViewerClient`] wires it to the session service.
#[derive(Debug, Clone)]
pub struct PlayState {
    minimum_award: u32,
    active: Option<ActiveQuestion>,
    score: u32,
    questions_seen: u32,
    finished: bool,
}

impl PlayState {
    /// New machine with the given minimum award for correct answers.
    pub fn new(minimum_award: u32) -> Self {
        Self {
            minimum_award,
            active: None,
            score: 0,
            questions_seen: 0,
            finished: false,
        }
    }

    /// Replace the active question: countdown reset to its time limit,
    /// selection cleared, input re-enabled.
    pub fn begin_question(&mut self, question: LiveQuestion) {
        if self.finished {
            return;
        }
        self.questions_seen += 1;
        self.active = Some(ActiveQuestion {
            remaining: question.time_limit,
            question,
            selected: None,
            submitted: false,
        });
    }

    /// Select an option. Ignored once this question's submission is latched.
    ///
    /// # Errors
    ///
    /// [`Validation`](QuizCastError::Validation) when the index is out of
    /// range or references an empty option.
    pub fn select(&mut self, option_index: usize) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Err(QuizCastError::Validation("no question is live".into()));
        };
        if active.submitted {
            return Ok(());
        }
        let valid = active
            .question
            .options
            .get(option_index)
            .map(|o| !o.trim().is_empty())
            .unwrap_or(false);
        if !valid {
            return Err(QuizCastError::Validation(format!(
                "option {option_index} is not answerable"
            )));
        }
        active.selected = Some(option_index);
        Ok(())
    }

    /// One-second countdown tick. Reaching zero with no submission latches
    /// the question and returns the automatic empty submission; every other
    /// tick returns `None`.
    pub fn tick(&mut self) -> Option<AnswerSubmission> {
        let active = self.active.as_mut()?;
        if active.submitted {
            return None;
        }
        active.remaining = active.remaining.saturating_sub(1);
        if active.remaining == 0 {
            active.submitted = true;
            return Some(AnswerSubmission::now(active.question.id.clone(), ""));
        }
        None
    }

    /// Latch a manual submission for the active question.
    ///
    /// Returns `None` when there is no active question or a submission was
    /// already latched (manual or automatic) — per-question idempotence.
    /// A correct answer adds the speed-weighted delta to the local score.
    pub fn submit(&mut self) -> Option<AnswerSubmission> {
        let active = self.active.as_mut()?;
        if active.submitted {
            return None;
        }
        active.submitted = true;

        let chosen = active
            .selected
            .and_then(|i| active.question.options.get(i))
            .map(|o| o.trim().to_owned())
            .unwrap_or_default();
        let correct = !chosen.is_empty()
            && active.question.correct_option() == Some(chosen.as_str());
        self.score += score_for_answer(
            correct,
            active.remaining,
            active.question.time_limit,
            active.question.points,
            self.minimum_award,
        );

        Some(AnswerSubmission::now(active.question.id.clone(), chosen))
    }

    /// Seconds remaining on the active question's countdown.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.remaining)
    }

    /// Whether the active question's submission has been latched.
    pub fn has_submitted(&self) -> bool {
        self.active.as_ref().map(|a| a.submitted).unwrap_or(false)
    }

    /// Locally accumulated optimistic score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Move to the terminal results view.
    pub fn finish(&mut self) {
        self.finished = true;
        self.active = None;
    }

    /// Final results, available once the session has finished.
    pub fn results(&self) -> Option<SessionResults> {
        self.finished.then_some(SessionResults {
            final_score: self.score,
            questions_answered: self.questions_seen,
        })
    }
}

impl Default for PlayState {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_AWARD)
    }
}

// ── Viewer client ───────────────────────────────────────────────────

/// A viewer's connection to one live quiz session.
///
/// Drives [`PlayState`] from [`SessionEvent`]s (typically produced by a
/// [`LifecycleClient`](crate::poller::LifecycleClient)) and forwards latched
/// submissions to the session service under the opaque participant token
/// issued at join.
pub struct ViewerClient<S: SessionService + ?Sized> {
    service: Arc<S>,
    quiz_id: QuizId,
    observed: SessionState,
    session: Option<ViewerSession>,
    play: PlayState,
}

impl<S: SessionService + ?Sized> ViewerClient<S> {
    /// New viewer for the given quiz, not yet joined.
    pub fn new(service: Arc<S>, quiz_id: QuizId) -> Self {
        Self {
            service,
            quiz_id,
            observed: SessionState::new(),
            session: None,
            play: PlayState::default(),
        }
    }

    /// Override the minimum award used for optimistic scoring.
    #[must_use]
    pub fn with_minimum_award(mut self, minimum_award: u32) -> Self {
        self.play = PlayState::new(minimum_award);
        self
    }

    /// Poll the session service once and fold the snapshot into the local
    /// lifecycle view.
    pub async fn check_status(&mut self) -> Result<SessionSnapshot> {
        let snapshot = self.service.status(self.quiz_id).await?;
        self.observed.observe(&snapshot);
        Ok(snapshot)
    }

    /// The lifecycle phase as last observed by this viewer.
    pub fn phase(&self) -> SessionPhase {
        self.observed.phase()
    }

    /// Join the session with a display name.
    ///
    /// Re-polls the session status first, then requires the session be open
    /// and not yet started. On success the opaque participant token is held
    /// as this viewer's identity for all submissions.
    ///
    /// # Errors
    ///
    /// [`Validation`](QuizCastError::Validation) for an empty name;
    /// [`NotJoinable`](QuizCastError::NotJoinable) when the session is
    /// closed, already started, or finished.
    pub async fn join(&mut self, name: &str) -> Result<&ViewerSession> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuizCastError::Validation(
                "please enter your name".into(),
            ));
        }

        self.check_status().await?;
        let phase = self.phase();
        if phase != SessionPhase::Open {
            return Err(QuizCastError::NotJoinable { phase });
        }

        let request = JoinRequest {
            quiz_id: self.quiz_id,
            name: name.to_owned(),
        };
        let response = self.service.join(self.quiz_id, &request).await?;
        match response.session_id.filter(|_| response.success) {
            Some(session_id) => {
                debug!(quiz_id = self.quiz_id, name, "joined session");
                Ok(self.session.insert(ViewerSession {
                    session_id,
                    quiz_id: self.quiz_id,
                    name: name.to_owned(),
                }))
            }
            None => {
                let message = if response.message.is_empty() {
                    "failed to join quiz".to_string()
                } else {
                    response.message
                };
                Err(QuizCastError::Server {
                    message,
                    status: None,
                })
            }
        }
    }

    /// Fold one lifecycle event into the play state.
    pub fn apply_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::QuestionAdvanced { question } => {
                self.play.begin_question(question.clone());
            }
            SessionEvent::SessionFinished => {
                self.play.finish();
            }
            _ => {}
        }
    }

    /// Select an option on the active question.
    pub fn select(&mut self, option_index: usize) -> Result<()> {
        self.play.select(option_index)
    }

    /// Submit the selected answer for the active question.
    ///
    /// No-op (`Ok(None)`) when no question is live or a submission was
    /// already latched. The submission is latched locally *before* the
    /// network call, so a send failure can never lead to a second attempt.
    pub async fn submit_answer(&mut self) -> Result<Option<AnswerSubmission>> {
        let Some(submission) = self.play.submit() else {
            return Ok(None);
        };
        self.send(&submission).await?;
        Ok(Some(submission))
    }

    /// Advance the local one-second countdown. When it reaches zero with no
    /// submission, the automatic empty submission is latched and sent.
    pub async fn tick(&mut self) -> Result<Option<AnswerSubmission>> {
        let Some(submission) = self.play.tick() else {
            return Ok(None);
        };
        debug!(quiz_id = self.quiz_id, question = %submission.question_id, "countdown expired, auto-submitting");
        self.send(&submission).await?;
        Ok(Some(submission))
    }

    /// Leave the session, clearing the participation context.
    pub fn leave(&mut self) {
        self.session = None;
    }

    /// The participation context, if joined.
    pub fn session(&self) -> Option<&ViewerSession> {
        self.session.as_ref()
    }

    /// Locally accumulated optimistic score.
    pub fn score(&self) -> u32 {
        self.play.score()
    }

    /// Seconds left on the active question, if one is live.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.play.remaining_secs()
    }

    /// Final results, once the session has finished.
    pub fn results(&self) -> Option<SessionResults> {
        self.play.results()
    }

    async fn send(&self, submission: &AnswerSubmission) -> Result<()> {
        let session = self.session.as_ref().ok_or_else(|| {
            QuizCastError::Validation("join the session before answering".into())
        })?;
        self.service
            .submit_answer(self.quiz_id, &session.session_id, submission)
            .await?;
        Ok(())
    }
}

impl<S: SessionService + ?Sized> std::fmt::Debug for ViewerClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerClient")
            .field("quiz_id", &self.quiz_id)
            .field("phase", &self.phase())
            .field("joined", &self.session.is_some())
            .field("score", &self.play.score())
            .finish()
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

    fn question(points: u32, time_limit: u32) -> LiveQuestion {
        LiveQuestion {
            id: "q1".into(),
            question: "Capital of France?".into(),
            options: vec!["London".into(), "Berlin".into(), "Paris".into(), "Madrid".into()],
            correct_answer: 2,
            time_limit,
            points,
        }
    }

    #[test]
    fn scoring_is_speed_weighted_with_floor() {
        // 10 points, 30 s limit, answered with 15 s remaining:
        // max(min, floor(0.5 × 10)) = 5.
        assert_eq!(score_for_answer(true, 15, 30, 10, 1), 5);
        // 20 s remaining: floor(20/30 × 10) = 6.
        assert_eq!(score_for_answer(true, 20, 30, 10, 1), 6);
        // Full time remaining: full points.
        assert_eq!(score_for_answer(true, 30, 30, 10, 1), 10);
    }

    #[test]
    fn scoring_applies_minimum_award_at_the_last_moment() {
        // 1 s remaining of 30: floor(1/30 × 10) = 0, floored to the minimum.
        assert_eq!(score_for_answer(true, 1, 30, 10, 1), 1);
        assert_eq!(score_for_answer(true, 1, 30, 10, 3), 3);
    }

    #[test]
    fn scoring_gives_zero_for_incorrect_answers() {
        assert_eq!(score_for_answer(false, 30, 30, 10, 1), 0);
        assert_eq!(score_for_answer(false, 0, 30, 10, 5), 0);
    }

    #[test]
    fn scoring_clamps_remaining_to_limit() {
        assert_eq!(score_for_answer(true, 99, 30, 10, 1), 10);
    }

    #[test]
    fn begin_question_resets_countdown_and_selection() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 30));
        play.select(2).unwrap();
        assert_eq!(play.remaining_secs(), Some(30));

        play.begin_question(question(10, 20));
        assert_eq!(play.remaining_secs(), Some(20));
        assert!(!play.has_submitted());
        // Previous selection cleared: submitting without selecting is empty.
        let sub = play.submit().unwrap();
        assert!(sub.is_empty());
    }

    #[test]
    fn correct_submission_adds_speed_weighted_delta() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 30));
        for _ in 0..10 {
            assert!(play.tick().is_none());
        }
        play.select(2).unwrap();
        let sub = play.submit().unwrap();
        assert_eq!(sub.answer, "Paris");
        // 20 s remaining: floor(20/30 × 10) = 6.
        assert_eq!(play.score(), 6);
    }

    #[test]
    fn incorrect_submission_scores_zero() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 30));
        play.select(0).unwrap();
        play.submit().unwrap();
        assert_eq!(play.score(), 0);
    }

    #[test]
    fn submission_is_idempotent_per_question() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 30));
        play.select(2).unwrap();
        assert!(play.submit().is_some());
        assert!(play.submit().is_none());
        assert!(play.submit().is_none());
        // Score counted exactly once.
        assert_eq!(play.score(), 10);
    }

    #[test]
    fn countdown_expiry_produces_exactly_one_empty_submission() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 3));

        assert!(play.tick().is_none()); // 2
        assert!(play.tick().is_none()); // 1
        let auto = play.tick().unwrap(); // 0 → auto-submit
        assert!(auto.is_empty());
        assert_eq!(play.score(), 0);

        // Further ticks and manual submissions are no-ops.
        assert!(play.tick().is_none());
        assert!(play.submit().is_none());
    }

    #[test]
    fn manual_submission_stops_the_latch_not_the_clock_state() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 5));
        play.select(2).unwrap();
        play.submit().unwrap();
        // Ticks after submission never produce a second submission.
        for _ in 0..10 {
            assert!(play.tick().is_none());
        }
    }

    #[test]
    fn select_rejects_empty_and_out_of_range_options() {
        let mut play = PlayState::default();
        let mut q = question(10, 30);
        q.options = vec!["A".into(), "  ".into()];
        q.correct_answer = 0;
        play.begin_question(q);

        assert!(play.select(1).is_err());
        assert!(play.select(5).is_err());
        assert!(play.select(0).is_ok());
    }

    #[test]
    fn select_is_ignored_after_submission() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 30));
        play.select(0).unwrap();
        play.submit().unwrap();
        // Late select is silently ignored; the latched answer stands.
        play.select(2).unwrap();
        assert_eq!(play.score(), 0);
    }

    #[test]
    fn finish_exposes_results_and_blocks_new_questions() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 30));
        play.select(2).unwrap();
        play.submit().unwrap();
        play.finish();

        let results = play.results().unwrap();
        assert_eq!(results.final_score, 10);
        assert_eq!(results.questions_answered, 1);

        // A question arriving after finish is ignored.
        play.begin_question(question(10, 30));
        assert_eq!(play.results().unwrap().questions_answered, 1);
        assert!(play.tick().is_none());
    }

    #[test]
    fn expired_question_still_counts_as_answered() {
        let mut play = PlayState::default();
        play.begin_question(question(10, 1));
        assert!(play.tick().unwrap().is_empty());
        play.finish();
        assert_eq!(play.results().unwrap().questions_answered, 1);
    }
}
