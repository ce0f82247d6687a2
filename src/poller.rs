//! Background polling loop that turns oracle snapshots into session events.
//!
//! [`LifecycleClient`] is a thin handle over a background task that polls the
//! session service on a fixed cadence, folds snapshots through
//! [`SessionState`](crate::lifecycle::SessionState), and emits
//! [`SessionEvent`]s on a bounded channel returned from
//! [`LifecycleClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let service: Arc<dyn SessionService> = Arc::new(HttpBackend::new("http://localhost:8080"));
//! let (mut client, mut events) = LifecycleClient::start(service, 42, LifecycleConfig::new());
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::QuestionAdvanced { question } => { /* render */ }
//!         SessionEvent::SessionFinished => break,
//!         _ => {}
//!     }
//! }
//! client.shutdown().await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::error::QuizCastError;
use crate::event::SessionEvent;
use crate::lifecycle::{PhaseTransition, PollSequencer, SessionPhase, SessionState};
use crate::protocol::{QuizId, SessionSnapshot};
use crate::service::SessionService;

/// Default poll period while waiting for the session to start.
const DEFAULT_WAITING_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default poll period during live play.
const DEFAULT_LIVE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`LifecycleClient`].
///
/// All fields have sensible defaults matching the lifecycle contract:
/// 2 second polls while awaiting session start, 1 second polls during live
/// play.
///
/// # Example
///
/// ```
/// use quizcast_client::poller::LifecycleConfig;
/// use std::time::Duration;
///
/// let config = LifecycleConfig::new()
///     .with_live_poll_interval(Duration::from_millis(500))
///     .with_event_channel_capacity(128);
/// assert_eq!(config.live_poll_interval, Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Poll period before the session has started.
    pub waiting_poll_interval: Duration,
    /// Poll period once live play has begun.
    pub live_poll_interval: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up, non-terminal events are dropped
    /// (with a warning logged) rather than blocking the poll loop. The final
    /// `Stopped` event is always delivered regardless of capacity.
    pub event_channel_capacity: usize,
    /// Timeout for [`LifecycleClient::shutdown`]; the task is aborted if it
    /// does not exit in time.
    pub shutdown_timeout: Duration,
}

impl LifecycleConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            waiting_poll_interval: DEFAULT_WAITING_POLL_INTERVAL,
            live_poll_interval: DEFAULT_LIVE_POLL_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the poll period used before the session has started.
    #[must_use]
    pub fn with_waiting_poll_interval(mut self, interval: Duration) -> Self {
        self.waiting_poll_interval = interval;
        self
    }

    /// Set the poll period used during live play.
    #[must_use]
    pub fn with_live_poll_interval(mut self, interval: Duration) -> Self {
        self.live_poll_interval = interval;
        self
    }

    /// Set the event channel capacity. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to the background polling loop for one quiz session.
///
/// Created via [`LifecycleClient::start`]. Dropping the handle aborts the
/// loop; [`shutdown`](LifecycleClient::shutdown) stops it gracefully and
/// guarantees a final [`SessionEvent::Stopped`] on the channel.
pub struct LifecycleClient {
    view: watch::Receiver<ObservedView>,
    running: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

/// Latest view published by the poll loop.
#[derive(Debug, Clone, Default)]
struct ObservedView {
    phase: SessionPhase,
    snapshot: Option<SessionSnapshot>,
}

impl LifecycleClient {
    /// Start polling the session service for the given quiz.
    ///
    /// The first poll fires immediately; subsequent polls follow the
    /// configured cadence. Returns the handle plus the event receiver, which
    /// yields events until the session finishes or the client shuts down.
    #[must_use = "the event receiver must be used to receive session events"]
    pub fn start(
        service: Arc<dyn SessionService>,
        quiz_id: QuizId,
        config: LifecycleConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (view_tx, view_rx) = watch::channel(ObservedView::default());

        let running = Arc::new(AtomicBool::new(true));
        let loop_running = Arc::clone(&running);
        let loop_config = config.clone();

        let task = tokio::spawn(poll_loop(
            service,
            quiz_id,
            loop_config,
            event_tx,
            view_tx,
            shutdown_rx,
            loop_running,
        ));

        let client = Self {
            view: view_rx,
            running,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    /// The most recently observed lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.view.borrow().phase
    }

    /// The most recently admitted snapshot, if any poll has succeeded.
    pub fn latest_snapshot(&self) -> Option<SessionSnapshot> {
        self.view.borrow().snapshot.clone()
    }

    /// Returns `true` while the polling loop is alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop polling gracefully.
    ///
    /// The loop emits a final [`SessionEvent::Stopped`] and exits; if it does
    /// not exit within the configured timeout the task is aborted so no
    /// orphaned polls keep firing.
    pub async fn shutdown(&mut self) {
        debug!("LifecycleClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("poll loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("poll loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("poll loop aborted: {join_err}");
                    }
                }
            }
        }

        self.running.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for LifecycleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleClient")
            .field("phase", &self.phase())
            .field("running", &self.is_running())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for LifecycleClient {
    fn drop(&mut self) {
        // `Drop` is synchronous, so the only safe action is to abort the
        // spawned task; the loop future is then dropped immediately and no
        // further poll or event callbacks can fire.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Poll loop ───────────────────────────────────────────────────────

/// Background loop: poll, fold, emit. Exits when:
/// - the session reaches `Finished`
/// - the quiz is reported unknown (`NotFound` is terminal for the screen)
/// - the shutdown signal fires or the handle is dropped
async fn poll_loop(
    service: Arc<dyn SessionService>,
    quiz_id: QuizId,
    config: LifecycleConfig,
    event_tx: mpsc::Sender<SessionEvent>,
    view_tx: watch::Sender<ObservedView>,
    mut shutdown_rx: oneshot::Receiver<()>,
    running: Arc<AtomicBool>,
) {
    debug!(quiz_id, "poll loop started");

    let mut state = SessionState::new();
    let mut sequencer = PollSequencer::new();
    // First poll fires immediately; later iterations wait out the cadence.
    let mut delay = Duration::ZERO;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!(quiz_id, "shutdown signal received");
                emit_stopped(&event_tx, &running, Some("client shut down".into())).await;
                break;
            }

            _ = tokio::time::sleep(delay) => {
                // One poll in flight at a time: a tick that would overlap an
                // outstanding poll is simply never scheduled. The sequencer
                // still guards admission so a result observed late can never
                // overwrite newer state.
                let ticket = sequencer.begin();
                match service.status(quiz_id).await {
                    Ok(snapshot) => {
                        if sequencer.admit(ticket) {
                            let finished = apply_snapshot(
                                &service,
                                quiz_id,
                                &mut state,
                                &snapshot,
                                &event_tx,
                                &view_tx,
                            )
                            .await;
                            if finished {
                                emit_stopped(&event_tx, &running, None).await;
                                break;
                            }
                        }
                    }
                    Err(QuizCastError::NotFound(what)) => {
                        // Unknown quiz id: terminal for this screen, no retry.
                        emit_stopped(&event_tx, &running, Some(format!("not found: {what}"))).await;
                        break;
                    }
                    Err(e) => {
                        // Transient: surface as advisory, retry next tick.
                        debug!(quiz_id, error = %e, "poll failed, will retry");
                        emit_event(&event_tx, SessionEvent::PollFailed { reason: e.to_string() })
                            .await;
                    }
                }

                delay = if state.phase() == SessionPhase::Started {
                    config.live_poll_interval
                } else {
                    config.waiting_poll_interval
                };
            }
        }
    }

    debug!(quiz_id, "poll loop exited");
}

/// Fold one admitted snapshot: publish the view, emit phase events, and
/// deliver any newly advanced question. Returns `true` when the session
/// reached its terminal phase.
async fn apply_snapshot(
    service: &Arc<dyn SessionService>,
    quiz_id: QuizId,
    state: &mut SessionState,
    snapshot: &SessionSnapshot,
    event_tx: &mpsc::Sender<SessionEvent>,
    view_tx: &watch::Sender<ObservedView>,
) -> bool {
    let transitions = state.observe(snapshot);
    view_tx.send_replace(ObservedView {
        phase: state.phase(),
        snapshot: Some(snapshot.clone()),
    });

    for transition in transitions {
        let event = match transition {
            PhaseTransition::Opened => SessionEvent::SessionOpened,
            PhaseTransition::Started => SessionEvent::SessionStarted,
            PhaseTransition::Finished => SessionEvent::SessionFinished,
        };
        emit_event(event_tx, event).await;
    }

    if state.phase().is_terminal() {
        return true;
    }

    // A question reference latches only after its content arrives, so a
    // failed fetch retries on the next tick instead of losing the question.
    if let Some(reference) = state.pending_question(snapshot) {
        match service.current_question(quiz_id, reference).await {
            Ok(question) => {
                debug!(quiz_id, reference, "question advanced");
                state.mark_question_delivered(reference);
                emit_event(event_tx, SessionEvent::QuestionAdvanced { question }).await;
            }
            Err(e) => {
                debug!(quiz_id, reference, error = %e, "question fetch failed, deferring");
                emit_event(
                    event_tx,
                    SessionEvent::PollFailed {
                        reason: e.to_string(),
                    },
                )
                .await;
            }
        }
    }

    false
}

/// Emit an event. If the channel is full, log and drop rather than blocking
/// the poll loop.
async fn emit_event(event_tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit the final [`SessionEvent::Stopped`] and mark the loop stopped.
///
/// Uses a blocking `send` because `Stopped` is always the last event on the
/// channel and must never be silently dropped.
async fn emit_stopped(
    event_tx: &mpsc::Sender<SessionEvent>,
    running: &Arc<AtomicBool>,
    reason: Option<String>,
) {
    running.store(false, Ordering::Release);
    if event_tx.send(SessionEvent::Stopped { reason }).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}
