#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end session flow: a host runs a two-question quiz while a viewer
//! plays along.

mod common;

use std::sync::Arc;

use quizcast_client::protocol::UserProfile;
use quizcast_client::{AuthSession, HostController, SessionEvent, SessionPhase, ViewerClient};

use common::{
    capital_question, snap_closed, snap_finished, snap_open, snap_started, MockSessionService,
    RecordedCommand,
};

const QUIZ: i64 = 42;

#[tokio::test]
async fn full_session_from_open_to_results() {
    let service = Arc::new(
        MockSessionService::new(vec![
            Ok(snap_closed()),        // host: initial refresh
            Ok(snap_open()),          // host: confirmation after open
            Ok(snap_open()),          // viewer: join gate check
            Ok(snap_started(None)),   // host: confirmation after start
            Ok(snap_finished()),      // host: confirmation after finish
        ]),
    );
    let commands = Arc::clone(&service.commands);
    let submissions = Arc::clone(&service.submissions);

    let credential = AuthSession::new(
        "jwt-abc",
        UserProfile {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
        },
    );
    let mut host = HostController::new(Arc::clone(&service), QUIZ, credential);
    let mut player = ViewerClient::new(Arc::clone(&service), QUIZ);

    // Host opens the session; the viewer can now join.
    host.refresh().await.unwrap();
    host.open_session("Capitals of Europe").await.unwrap();
    assert_eq!(host.phase(), SessionPhase::Open);
    player.join("Bob").await.unwrap();

    // Host begins play with two authored questions.
    host.start_session(vec![
        capital_question("q1", 10, 30),
        capital_question("q2", 10, 20),
    ])
    .await
    .unwrap();
    assert_eq!(host.phase(), SessionPhase::Started);

    // Question 1: the viewer answers correctly with 20 of 30 seconds left.
    let q1 = host.advance_question().await.unwrap();
    player.apply_event(&SessionEvent::QuestionAdvanced { question: q1 });
    for _ in 0..10 {
        assert!(player.tick().await.unwrap().is_none());
    }
    player.select(2).unwrap();
    let sent = player.submit_answer().await.unwrap().unwrap();
    assert_eq!(sent.answer, "Paris");
    // Speed-weighted: floor(20/30 × 10) = 6.
    assert_eq!(player.score(), 6);

    // Question 2: the viewer lets the clock run out.
    let q2 = host.advance_question().await.unwrap();
    player.apply_event(&SessionEvent::QuestionAdvanced { question: q2 });
    let mut auto = None;
    for _ in 0..20 {
        if let Some(submission) = player.tick().await.unwrap() {
            auto = Some(submission);
        }
    }
    let auto = auto.expect("countdown expiry should auto-submit");
    assert!(auto.is_empty());
    assert_eq!(player.score(), 6);

    // Host finishes; the viewer sees final results.
    host.finish_session().await.unwrap();
    assert_eq!(host.phase(), SessionPhase::Finished);
    player.apply_event(&SessionEvent::SessionFinished);

    let results = player.results().unwrap();
    assert_eq!(results.final_score, 6);
    assert_eq!(results.questions_answered, 2);

    // The oracle saw the whole story, in order.
    let recorded = commands.lock().unwrap();
    assert_eq!(
        recorded.as_slice(),
        [
            RecordedCommand::Open {
                title: "Capitals of Europe".into()
            },
            RecordedCommand::Start,
            RecordedCommand::Advance {
                question_id: "q1".into()
            },
            RecordedCommand::Advance {
                question_id: "q2".into()
            },
            RecordedCommand::Finish,
        ]
    );
    let sent = submissions.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "viewer-1");
    assert_eq!(sent[0].1.answer, "Paris");
    assert!(sent[1].1.is_empty());
}
