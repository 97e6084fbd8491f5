//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between a client and the API server.
//! One connection is one client process: it owns a session, a feedback
//! repository and the route it is currently showing.

use feedback_core::domain::{FeedbackDocument, FeedbackRecord, Identity, SessionState};
use feedback_core::ports::AuthError;
use feedback_core::repository::RepositoryError;
use feedback_core::validation::ValidationError;
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SignIn { email: String, password: String },

    SignUp { email: String, password: String },

    SignOut,

    /// The client moved to another route, e.g. `"(tabs)/myFeedbacks"`.
    Navigate { segment: String },

    /// `rating` 0 means no star was picked.
    SubmitFeedback {
        #[serde(default)]
        rating: i32,
        comment: String,
    },

    /// The feedback list screen gained focus.
    ListFeedbacks,

    /// Ask the server to re-check the held auth session right now.
    RefreshSession,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Every session transition, in order.
    SessionChanged {
        state: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<Identity>,
    },

    /// The client must replace its current route.
    Redirect { route: &'static str },

    /// Token to present on the next connection to resume the session;
    /// `None` once signed out.
    AuthToken { token: Option<String> },

    FeedbackSubmitted { id: String },

    Feedbacks { seq: u64, items: Vec<FeedbackDocument> },

    /// A classified failure of the last request.
    Error { code: &'static str, message: String },
}

impl ServerMessage {
    pub fn session_changed(state: &SessionState) -> Self {
        ServerMessage::SessionChanged {
            state: state.tag(),
            user: state.identity().cloned(),
        }
    }

    pub fn feedbacks(seq: u64, records: &[FeedbackRecord]) -> Self {
        ServerMessage::Feedbacks {
            seq,
            items: records.iter().map(FeedbackDocument::from).collect(),
        }
    }

    pub fn protocol_error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: "bad_request",
            message: message.into(),
        }
    }
}

impl From<&AuthError> for ServerMessage {
    fn from(err: &AuthError) -> Self {
        let code = match err {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::EmailInUse => "email_in_use",
            AuthError::WeakPassword => "weak_password",
            AuthError::NetworkUnavailable => "network_unavailable",
            AuthError::Unknown(_) => "unknown",
        };
        ServerMessage::Error {
            code,
            message: err.to_string(),
        }
    }
}

impl From<&RepositoryError> for ServerMessage {
    fn from(err: &RepositoryError) -> Self {
        let code = match err {
            RepositoryError::Invalid(ValidationError::MissingRating) => "missing_rating",
            RepositoryError::Invalid(ValidationError::CommentTooShort) => "comment_too_short",
            RepositoryError::Unauthorized => "unauthorized",
            RepositoryError::SubmitInProgress => "submit_in_progress",
            RepositoryError::WriteFailed(_) => "write_failed",
            RepositoryError::ReadFailed(_) => "read_failed",
        };
        ServerMessage::Error {
            code,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedback_core::ports::PortError;
    use serde_json::json;

    #[test]
    fn client_messages_are_tagged_by_type() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"sign_in","email":"u@test.io","password":"pass1234"}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SignIn {
                email: "u@test.io".into(),
                password: "pass1234".into()
            }
        );

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"list_feedbacks"}"#).unwrap();
        assert_eq!(msg, ClientMessage::ListFeedbacks);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"navigate","segment":"(auth)"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Navigate { segment: "(auth)".into() });
    }

    #[test]
    fn unset_rating_defaults_to_zero() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"submit_feedback","comment":"Great service!"}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubmitFeedback {
                rating: 0,
                comment: "Great service!".into()
            }
        );
    }

    #[test]
    fn session_changed_carries_user_only_when_authenticated() {
        let signed_in = ServerMessage::session_changed(&SessionState::Authenticated(
            Identity::new("u1", "u@test.io"),
        ));
        assert_eq!(
            serde_json::to_value(&signed_in).unwrap(),
            json!({
                "type": "session_changed",
                "state": "authenticated",
                "user": { "id": "u1", "label": "u@test.io" }
            })
        );

        let loading = ServerMessage::session_changed(&SessionState::Loading);
        assert_eq!(
            serde_json::to_value(&loading).unwrap(),
            json!({ "type": "session_changed", "state": "loading" })
        );
    }

    #[test]
    fn errors_carry_a_stable_code() {
        let msg = ServerMessage::from(&AuthError::EmailInUse);
        assert!(matches!(msg, ServerMessage::Error { code: "email_in_use", .. }));

        let msg = ServerMessage::from(&RepositoryError::Invalid(ValidationError::CommentTooShort));
        assert!(matches!(msg, ServerMessage::Error { code: "comment_too_short", .. }));

        let msg = ServerMessage::from(&RepositoryError::ReadFailed(PortError::Unavailable(
            "down".into(),
        )));
        assert_eq!(
            serde_json::to_value(&msg).unwrap()["code"],
            json!("read_failed")
        );
    }

    #[test]
    fn redirect_serializes_route() {
        let msg = ServerMessage::Redirect { route: "/login" };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "redirect", "route": "/login" })
        );
    }
}
