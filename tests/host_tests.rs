#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration tests for the host control surface.

mod common;

use std::sync::Arc;

use quizcast_client::protocol::UserProfile;
use quizcast_client::{AuthSession, HostController, QuizCastError, SessionPhase};

use common::{
    capital_question, rejected, snap_closed, snap_finished, snap_open, snap_started,
    MockSessionService, RecordedCommand,
};

const QUIZ: i64 = 42;

fn credential() -> AuthSession {
    AuthSession::new(
        "jwt-abc",
        UserProfile {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
        },
    )
}

fn controller(service: MockSessionService) -> HostController<MockSessionService> {
    HostController::new(Arc::new(service), QUIZ, credential())
}

#[tokio::test]
async fn open_session_sends_the_command_and_confirms_by_repoll() {
    let service = MockSessionService::new(vec![
        Ok(snap_closed()), // initial refresh
        Ok(snap_open()),   // confirmation after the command
    ]);
    let commands = Arc::clone(&service.commands);
    let mut host = controller(service);

    host.refresh().await.unwrap();
    assert_eq!(host.phase(), SessionPhase::Closed);

    let snapshot = host.open_session("Capitals of Europe").await.unwrap();
    assert!(snapshot.is_open);
    assert_eq!(host.phase(), SessionPhase::Open);
    assert_eq!(
        commands.lock().unwrap().as_slice(),
        [RecordedCommand::Open {
            title: "Capitals of Europe".into()
        }]
    );
}

#[tokio::test]
async fn open_session_refuses_when_already_open() {
    let service = MockSessionService::new(vec![Ok(snap_open())]);
    let mut host = controller(service);
    host.refresh().await.unwrap();

    let err = host.open_session("Capitals of Europe").await.unwrap_err();
    assert!(matches!(err, QuizCastError::AlreadyOpen));
}

#[tokio::test]
async fn start_requires_an_open_session_and_questions() {
    let service = MockSessionService::new(vec![Ok(snap_closed())]);
    let mut host = controller(service);
    host.refresh().await.unwrap();

    let err = host
        .start_session(vec![capital_question("q1", 10, 30)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QuizCastError::SessionState {
            expected: SessionPhase::Open,
            actual: SessionPhase::Closed,
        }
    ));
}

#[tokio::test]
async fn start_rejects_an_empty_question_sequence() {
    let service = MockSessionService::new(vec![Ok(snap_open())]);
    let mut host = controller(service);
    host.refresh().await.unwrap();

    let err = host.start_session(Vec::new()).await.unwrap_err();
    assert!(matches!(err, QuizCastError::Validation(_)));
}

#[tokio::test]
async fn advance_walks_the_authored_sequence_in_order() {
    let service = MockSessionService::new(vec![
        Ok(snap_open()),          // initial refresh
        Ok(snap_started(None)),   // confirmation after start
    ]);
    let commands = Arc::clone(&service.commands);
    let mut host = controller(service);
    host.refresh().await.unwrap();

    host.start_session(vec![
        capital_question("q1", 10, 30),
        capital_question("q2", 10, 30),
    ])
    .await
    .unwrap();
    assert_eq!(host.advancing_index(), 0);
    assert_eq!(host.questions_remaining(), 2);

    let first = host.advance_question().await.unwrap();
    assert_eq!(first.id, "q1");
    assert_eq!(host.advancing_index(), 1);

    let second = host.advance_question().await.unwrap();
    assert_eq!(second.id, "q2");
    assert_eq!(host.questions_remaining(), 0);

    let err = host.advance_question().await.unwrap_err();
    assert!(matches!(err, QuizCastError::QuestionsExhausted));

    let recorded = commands.lock().unwrap();
    assert_eq!(recorded.len(), 3); // start + two advances
    assert_eq!(
        recorded[1],
        RecordedCommand::Advance {
            question_id: "q1".into()
        }
    );
}

#[tokio::test]
async fn finish_requires_every_question_played() {
    let service = MockSessionService::new(vec![
        Ok(snap_open()),
        Ok(snap_started(None)),
        Ok(snap_finished()),
    ]);
    let mut host = controller(service);
    host.refresh().await.unwrap();
    host.start_session(vec![capital_question("q1", 10, 30)])
        .await
        .unwrap();

    let err = host.finish_session().await.unwrap_err();
    assert!(matches!(
        err,
        QuizCastError::QuestionsRemaining { remaining: 1 }
    ));

    host.advance_question().await.unwrap();
    let snapshot = host.finish_session().await.unwrap();
    assert!(snapshot.is_finished);
    assert_eq!(host.phase(), SessionPhase::Finished);
}

#[tokio::test]
async fn rejected_commands_resync_the_local_view() {
    // Believed state says open, but the oracle reports the session already
    // started; the start command is rejected and the re-poll resyncs.
    let service = MockSessionService::new(vec![
        Ok(snap_open()),
        Ok(snap_started(None)), // resync after rejection
    ])
    .with_command_responses(vec![Ok(rejected("session already started"))]);
    let mut host = controller(service);
    host.refresh().await.unwrap();

    let err = host
        .start_session(vec![capital_question("q1", 10, 30)])
        .await
        .unwrap_err();
    match err {
        QuizCastError::Server { message, .. } => {
            assert_eq!(message, "session already started");
        }
        other => panic!("expected Server, got {other:?}"),
    }
    // Remote wins: the local view now reflects the oracle.
    assert_eq!(host.phase(), SessionPhase::Started);
}

#[tokio::test]
async fn unauthorized_command_forces_logout() {
    let service = MockSessionService::new(vec![Ok(snap_closed())])
        .with_command_responses(vec![Err(QuizCastError::Unauthorized)]);
    let mut host = controller(service);
    host.refresh().await.unwrap();

    let err = host.open_session("Capitals of Europe").await.unwrap_err();
    assert!(matches!(err, QuizCastError::Unauthorized));
    assert!(host.credential().is_none());

    // Every further command fails the same way without reaching the network.
    let err = host.open_session("Capitals of Europe").await.unwrap_err();
    assert!(matches!(err, QuizCastError::Unauthorized));
}

#[tokio::test]
async fn commands_carry_the_bearer_token() {
    let service = MockSessionService::new(vec![Ok(snap_closed()), Ok(snap_open())]);
    let tokens = Arc::clone(&service.tokens_seen);
    let mut host = controller(service);
    host.refresh().await.unwrap();

    host.open_session("Capitals of Europe").await.unwrap();
    assert_eq!(tokens.lock().unwrap().as_slice(), ["jwt-abc"]);
}

#[tokio::test]
async fn participants_returns_the_roster() {
    let roster = vec![quizcast_client::protocol::ViewerInfo {
        session_id: "viewer-1".into(),
        name: "Bob".into(),
        status: quizcast_client::protocol::ConnectionStatus::Connected,
        total_score: 15,
    }];
    let service = MockSessionService::new(vec![]).with_roster(roster);
    let host = controller(service);

    let participants = host.participants().await.unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].name, "Bob");
    assert_eq!(participants[0].total_score, 15);
}
