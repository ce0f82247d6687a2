//! # QuizCast Client
//!
//! Backend-agnostic Rust client for the QuizCast live quiz platform.
//!
//! This crate models the three backend collaborators (auth, quiz builder,
//! live session service) as traits and builds three surfaces on top of them:
//!
//! - **Lifecycle client** — [`LifecycleClient`] polls the session service in
//!   a background task and emits typed [`SessionEvent`]s via a channel as
//!   the session moves CLOSED → OPEN → STARTED → FINISHED.
//! - **Host control** — [`HostController`] opens, starts, advances, and
//!   finishes a session, tracking the advancing index through the authored
//!   question sequence client-side.
//! - **Viewer participation** — [`ViewerClient`] joins a session, drives the
//!   local per-question countdown, and guarantees at most one submission per
//!   question.
//!
//! ## Features
//!
//! - **Backend-agnostic** — implement the [`service`] traits for any backend
//! - **HTTP built-in** — default `backend-http` feature provides
//!   [`HttpBackend`] over `reqwest`
//! - **Event-driven** — receive typed [`SessionEvent`]s via a channel
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # #[cfg(feature = "backend-http")]
//! # async fn example() -> Result<(), quizcast_client::QuizCastError> {
//! use std::sync::Arc;
//! use quizcast_client::{HttpBackend, LifecycleClient, LifecycleConfig, SessionEvent};
//!
//! let backend = Arc::new(HttpBackend::new("http://localhost:8080")?);
//! let (mut client, mut events) =
//!     LifecycleClient::start(backend, 42, LifecycleConfig::new());
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::QuestionAdvanced { question } => {
//!             println!("now live: {}", question.question);
//!         }
//!         SessionEvent::SessionFinished => break,
//!         _ => {}
//!     }
//! }
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod context;
pub mod error;
pub mod event;
pub mod host;
pub mod lifecycle;
pub mod poller;
pub mod protocol;
pub mod service;
pub mod services;
pub mod viewer;

// Re-export primary types for ergonomic imports.
pub use context::{AuthSession, ViewerSession};
pub use error::{QuizCastError, Result};
pub use event::SessionEvent;
pub use host::HostController;
pub use lifecycle::{PhaseTransition, SessionPhase, SessionState};
pub use poller::{LifecycleClient, LifecycleConfig};
pub use protocol::{
    AnswerSubmission, AuthoredQuestion, LiveQuestion, QuizId, SessionSnapshot,
};
pub use service::{AuthService, BuilderService, SessionService};
pub use viewer::{score_for_answer, PlayState, SessionResults, ViewerClient};

#[cfg(feature = "backend-http")]
pub use services::http::HttpBackend;
