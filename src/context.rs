//! Explicit client-side session contexts.
//!
//! Credentials and participant identity are never read from ambient storage:
//! they live in these context objects, created on login/join, threaded
//! through every collaborator call, and cleared on logout/leave.

use crate::error::{QuizCastError, Result};
use crate::protocol::{AuthResponse, QuizId, UserProfile};

/// An authenticated host credential: bearer token plus the profile it
/// belongs to.
///
/// Created from a successful login via [`AuthSession::from_login`]. Host
/// surfaces drop the whole object on any 401-class response, which is the
/// uniform forced-logout rule.
#[derive(Debug, Clone)]
pub struct AuthSession {
    token: String,
    user: UserProfile,
}

impl AuthSession {
    /// Build a session from an explicit token and profile.
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Build a session from a login (or signup) response.
    ///
    /// # Errors
    ///
    /// Returns the backend's message as [`QuizCastError::Server`] when the
    /// response was not a success, and [`QuizCastError::Unauthorized`] when
    /// it succeeded without issuing a token.
    pub fn from_login(response: AuthResponse) -> Result<Self> {
        if !response.success {
            let message = if response.message.is_empty() {
                "login rejected".to_string()
            } else {
                response.message
            };
            return Err(QuizCastError::Server {
                message,
                status: None,
            });
        }
        match (response.token, response.user) {
            (Some(token), Some(user)) => Ok(Self { token, user }),
            _ => Err(QuizCastError::Unauthorized),
        }
    }

    /// The bearer token for builder and session service calls.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The authenticated account profile.
    pub fn user(&self) -> &UserProfile {
        &self.user
    }
}

/// A viewer's participation context for one session.
///
/// The opaque `session_id` issued at join — not the display name — is the
/// identity used for every submission.
#[derive(Debug, Clone)]
pub struct ViewerSession {
    /// Opaque participant token issued by the session service.
    pub session_id: String,
    /// The quiz this participation belongs to.
    pub quiz_id: QuizId,
    /// Display name supplied at join time.
    pub name: String,
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

    fn profile() -> UserProfile {
        UserProfile {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Quizmaster".into(),
        }
    }

    #[test]
    fn from_login_requires_success_flag() {
        let resp = AuthResponse {
            success: false,
            token: Some("t".into()),
            user: Some(profile()),
            message: "bad password".into(),
        };
        let err = AuthSession::from_login(resp).unwrap_err();
        assert!(matches!(err, QuizCastError::Server { message, .. } if message == "bad password"));
    }

    #[test]
    fn from_login_requires_token_and_user() {
        let resp = AuthResponse {
            success: true,
            token: None,
            user: Some(profile()),
            message: String::new(),
        };
        assert!(matches!(
            AuthSession::from_login(resp),
            Err(QuizCastError::Unauthorized)
        ));
    }

    #[test]
    fn from_login_builds_session() {
        let resp = AuthResponse {
            success: true,
            token: Some("jwt-abc".into()),
            user: Some(profile()),
            message: String::new(),
        };
        let session = AuthSession::from_login(resp).unwrap();
        assert_eq!(session.token(), "jwt-abc");
        assert_eq!(session.user().username, "alice");
    }
}
