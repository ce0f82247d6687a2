//! The session lifecycle contract.
//!
//! A session moves `Closed → Open → Started → Finished`. The session service
//! owns this state; the client only observes it through status polls. This
//! module holds the observer logic every surface agrees on:
//!
//! - [`SessionPhase`] — the four lifecycle states, totally ordered.
//! - [`SessionState`] — folds oracle snapshots into a monotonic local view
//!   and reports which forward transitions each snapshot revealed. Snapshots
//!   claiming a backward transition are ignored; the kept state wins.
//! - [`PollSequencer`] — admission control for poll results when responses
//!   can resolve out of order: the most recently *initiated* poll wins, and a
//!   stale in-flight response never overwrites newer state.

use tracing::warn;

use crate::protocol::SessionSnapshot;

// ── Phase ───────────────────────────────────────────────────────────

/// Lifecycle state of a quiz session.
///
/// The ordering is the forward direction of the lifecycle; comparisons are
/// how [`SessionState`] detects and rejects backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SessionPhase {
    /// Not yet opened to viewers. Initial.
    #[default]
    Closed,
    /// Viewers may join; play has not begun.
    Open,
    /// Live play in progress.
    Started,
    /// Play has ended. Terminal: no further transitions are accepted.
    Finished,
}

impl SessionPhase {
    /// Derive the phase from snapshot flags. The flags obey
    /// `isFinished ⇒ isStarted ⇒ isOpen`, so the strongest set flag wins.
    pub fn from_snapshot(snap: &SessionSnapshot) -> Self {
        if snap.is_finished {
            Self::Finished
        } else if snap.is_started {
            Self::Started
        } else if snap.is_open {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// `true` once the session has ended.
    pub fn is_terminal(self) -> bool {
        self == Self::Finished
    }
}

// ── Transitions ─────────────────────────────────────────────────────

/// A forward lifecycle transition revealed by an oracle snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTransition {
    /// `Closed → Open`: viewers may now join.
    Opened,
    /// `Open → Started`: live play has begun.
    Started,
    /// `Started → Finished`: the session has ended.
    Finished,
}

// ── Observer ────────────────────────────────────────────────────────

/// Locally observed session state, folded from oracle snapshots.
///
/// The state only ever moves forward. When a snapshot skips phases (e.g. the
/// first poll of an already-started session), every intermediate transition
/// is still reported so observers never miss a step.
///
/// Question delivery is tracked separately from the phase: a question
/// reference only latches once [`mark_question_delivered`] is called, so a
/// failed content fetch retries on the next snapshot instead of losing the
/// question.
///
/// [`mark_question_delivered`]: SessionState::mark_question_delivered
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    phase: SessionPhase,
    delivered_question: Option<String>,
}

impl SessionState {
    /// New observer in the initial `Closed` phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently observed phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Reference of the last question delivered to the observer, if any.
    pub fn delivered_question(&self) -> Option<&str> {
        self.delivered_question.as_deref()
    }

    /// Fold one oracle snapshot into the local view.
    ///
    /// Returns the forward transitions this snapshot revealed, in lifecycle
    /// order. A snapshot claiming an earlier phase than the one already
    /// observed is ignored.
    pub fn observe(&mut self, snap: &SessionSnapshot) -> Vec<PhaseTransition> {
        let next = SessionPhase::from_snapshot(snap);
        if next < self.phase {
            warn!(
                observed = ?next,
                kept = ?self.phase,
                "oracle snapshot claims a backward transition, ignoring"
            );
            return Vec::new();
        }

        let mut transitions = Vec::new();
        if self.phase == SessionPhase::Closed && next >= SessionPhase::Open {
            transitions.push(PhaseTransition::Opened);
        }
        if self.phase <= SessionPhase::Open && next >= SessionPhase::Started {
            transitions.push(PhaseTransition::Started);
        }
        if self.phase <= SessionPhase::Started && next == SessionPhase::Finished {
            transitions.push(PhaseTransition::Finished);
        }
        self.phase = next;
        transitions
    }

    /// The question reference this snapshot advertises that has not yet been
    /// delivered, if any. Finished sessions never surface a pending question.
    pub fn pending_question<'a>(&self, snap: &'a SessionSnapshot) -> Option<&'a str> {
        if self.phase.is_terminal() {
            return None;
        }
        snap.current_question
            .as_deref()
            .filter(|r| Some(*r) != self.delivered_question.as_deref())
    }

    /// Latch a question reference as delivered, so later snapshots carrying
    /// the same reference stop reporting it as pending.
    pub fn mark_question_delivered(&mut self, reference: impl Into<String>) {
        self.delivered_question = Some(reference.into());
    }
}

// ── Poll ordering ───────────────────────────────────────────────────

/// Ticket identifying one initiated poll. Obtained from
/// [`PollSequencer::begin`] and redeemed with [`PollSequencer::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket(u64);

/// Admission control for poll results.
///
/// Polls are numbered at initiation. A result is admitted only if no later
/// initiated poll has already been admitted, giving the ordering guarantee
/// the lifecycle contract requires: the most recently initiated poll's
/// result wins, and a stale in-flight response arriving after a newer one
/// must not overwrite newer state.
#[derive(Debug, Default)]
pub struct PollSequencer {
    issued: u64,
    admitted: u64,
}

impl PollSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the initiation of a new poll.
    pub fn begin(&mut self) -> PollTicket {
        self.issued += 1;
        PollTicket(self.issued)
    }

    /// Attempt to admit a completed poll's result. Returns `true` when the
    /// result may be applied; `false` means a newer poll already won and the
    /// result must be discarded.
    pub fn admit(&mut self, ticket: PollTicket) -> bool {
        if ticket.0 > self.admitted {
            self.admitted = ticket.0;
            true
        } else {
            warn!(ticket = ticket.0, admitted = self.admitted, "discarding stale poll result");
            false
        }
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

    fn snap(open: bool, started: bool, finished: bool) -> SessionSnapshot {
        SessionSnapshot {
            is_open: open,
            is_started: started,
            is_finished: finished,
            ..SessionSnapshot::default()
        }
    }

    #[test]
    fn phase_derivation_prefers_strongest_flag() {
        assert_eq!(
            SessionPhase::from_snapshot(&snap(false, false, false)),
            SessionPhase::Closed
        );
        assert_eq!(
            SessionPhase::from_snapshot(&snap(true, false, false)),
            SessionPhase::Open
        );
        assert_eq!(
            SessionPhase::from_snapshot(&snap(true, true, false)),
            SessionPhase::Started
        );
        assert_eq!(
            SessionPhase::from_snapshot(&snap(true, true, true)),
            SessionPhase::Finished
        );
    }

    #[test]
    fn observe_reports_each_forward_step() {
        let mut state = SessionState::new();

        let t = state.observe(&snap(true, false, false));
        assert_eq!(t, vec![PhaseTransition::Opened]);

        let t = state.observe(&snap(true, true, false));
        assert_eq!(t, vec![PhaseTransition::Started]);

        let t = state.observe(&snap(true, true, true));
        assert_eq!(t, vec![PhaseTransition::Finished]);
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn observe_expands_skipped_phases() {
        // First poll of a session that is already live: both intermediate
        // transitions must be reported, in order.
        let mut state = SessionState::new();
        let t = state.observe(&snap(true, true, false));
        assert_eq!(t, vec![PhaseTransition::Opened, PhaseTransition::Started]);
    }

    #[test]
    fn observe_ignores_backward_transitions() {
        let mut state = SessionState::new();
        state.observe(&snap(true, true, true));
        assert_eq!(state.phase(), SessionPhase::Finished);

        // The oracle now claims the session never finished; keep terminal state.
        let t = state.observe(&snap(true, true, false));
        assert!(t.is_empty());
        assert_eq!(state.phase(), SessionPhase::Finished);

        let t = state.observe(&snap(false, false, false));
        assert!(t.is_empty());
        assert_eq!(state.phase(), SessionPhase::Finished);
    }

    #[test]
    fn observe_is_monotonic_for_arbitrary_sequences() {
        // Replay a noisy observation sequence and assert the phase never
        // moves backward at any step.
        let observations = [
            snap(false, false, false),
            snap(true, false, false),
            snap(false, false, false), // backward, ignored
            snap(true, true, false),
            snap(true, false, false), // backward, ignored
            snap(true, true, true),
            snap(true, true, false), // backward, ignored
            snap(false, false, false),
        ];
        let mut state = SessionState::new();
        let mut previous = state.phase();
        for obs in &observations {
            state.observe(obs);
            assert!(state.phase() >= previous);
            previous = state.phase();
        }
        assert_eq!(state.phase(), SessionPhase::Finished);
    }

    #[test]
    fn repeated_snapshot_reports_no_transitions() {
        let mut state = SessionState::new();
        state.observe(&snap(true, false, false));
        let t = state.observe(&snap(true, false, false));
        assert!(t.is_empty());
    }

    #[test]
    fn pending_question_tracks_delivery() {
        let mut state = SessionState::new();
        let mut live = snap(true, true, false);
        live.current_question = Some("q1".into());
        state.observe(&live);

        assert_eq!(state.pending_question(&live), Some("q1"));

        state.mark_question_delivered("q1");
        assert!(state.pending_question(&live).is_none());
        assert_eq!(state.delivered_question(), Some("q1"));

        live.current_question = Some("q2".into());
        assert_eq!(state.pending_question(&live), Some("q2"));
    }

    #[test]
    fn pending_question_survives_undelivered_fetch() {
        // The reference stays pending until explicitly marked delivered,
        // so a failed content fetch retries on the next snapshot.
        let mut state = SessionState::new();
        let mut live = snap(true, true, false);
        live.current_question = Some("q1".into());
        state.observe(&live);

        assert_eq!(state.pending_question(&live), Some("q1"));
        assert_eq!(state.pending_question(&live), Some("q1"));
    }

    #[test]
    fn no_pending_question_after_finish() {
        let mut state = SessionState::new();
        let mut finished = snap(true, true, true);
        finished.current_question = Some("q9".into());
        state.observe(&finished);
        assert!(state.pending_question(&finished).is_none());
    }

    #[test]
    fn sequencer_admits_in_order_results() {
        let mut seq = PollSequencer::new();
        let a = seq.begin();
        let b = seq.begin();
        assert!(seq.admit(a));
        assert!(seq.admit(b));
    }

    #[test]
    fn sequencer_discards_stale_result_after_newer_won() {
        // Poll A initiated before poll B, but B resolves first.
        let mut seq = PollSequencer::new();
        let a = seq.begin();
        let b = seq.begin();
        assert!(seq.admit(b));
        assert!(!seq.admit(a));
    }

    #[test]
    fn sequencer_rejects_double_admission() {
        let mut seq = PollSequencer::new();
        let a = seq.begin();
        assert!(seq.admit(a));
        assert!(!seq.admit(a));
    }
}
