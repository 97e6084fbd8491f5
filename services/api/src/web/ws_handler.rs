//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a client connection.
//! Each connection owns one session and one feedback repository; session
//! transitions and guard redirects are pushed to the client as they happen.

use crate::web::{
    auth::resume_token,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, ClientState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use feedback_core::domain::{FeedbackDraft, SessionState};
use feedback_core::repository::Listing;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::{Arc, PoisonError};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Query parameters accepted on connect.
#[derive(Deserialize, Debug, Default)]
pub struct ConnectParams {
    /// Auth session token from an earlier connection.
    pub token: Option<String>,
}

/// The handler for upgrading HTTP requests to client connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> Response {
    let token = resume_token(params.token, &headers);
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, token))
}

type Outbox = UnboundedSender<ServerMessage>;

/// Queues a message for the writer task.
fn push(outbox: &Outbox, msg: ServerMessage) {
    if outbox.send(msg).is_err() {
        debug!("client outbox closed; message dropped");
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, token: Option<String>) {
    info!("New client connection established");

    // Everything sent to the client goes through one ordered queue.
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {:?}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                info!("Client went away while sending.");
                break;
            }
        }
    });

    let client = Arc::new(ClientState::new(&app_state));

    // --- 1. Session Pushes and Guarding ---
    let session_subscription = {
        let outbox = outbox.clone();
        let routes = client.routes.clone();
        client.session.subscribe(Arc::new(move |state: &SessionState| {
            push(&outbox, ServerMessage::session_changed(state));
            let redirect = routes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_session(state);
            if let Some(route) = redirect {
                push(&outbox, ServerMessage::Redirect { route });
            }
        }))
    };

    // --- 2. Resume and Start the Session ---
    if let Some(token) = token.as_deref() {
        if let Err(e) = client.identity.restore(token).await {
            warn!("Failed to restore auth session: {:?}", e);
            push(&outbox, ServerMessage::from(&e));
        }
    }
    client.session.start();

    let cancel = CancellationToken::new();
    let revalidator = {
        let identity = client.identity.clone();
        let cancel = cancel.clone();
        let every = app_state.config.revalidate_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately; the session was just checked.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = identity.revalidate().await {
                            warn!("Auth session revalidation failed: {:?}", e);
                        }
                    }
                }
            }
        })
    };

    // --- 3. Main Message Loop ---
    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(text.as_str(), &client, &outbox).await;
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 4. Cleanup ---
    cancel.cancel();
    if let Err(e) = revalidator.await {
        warn!("Revalidation task ended abnormally: {:?}", e);
    }
    session_subscription.unsubscribe();
    client.session.stop();
    writer.abort();
    info!("Client connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(text: &str, client: &Arc<ClientState>, outbox: &Outbox) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse client message: {:?}", e);
            push(outbox, ServerMessage::protocol_error(e.to_string()));
            return;
        }
    };

    match client_msg {
        ClientMessage::SignIn { email, password } => {
            match client.session.sign_in(&email, &password).await {
                Ok(_) => push(outbox, ServerMessage::AuthToken { token: client.identity.token() }),
                Err(e) => push(outbox, ServerMessage::from(&e)),
            }
        }
        ClientMessage::SignUp { email, password } => {
            match client.session.sign_up(&email, &password).await {
                Ok(_) => push(outbox, ServerMessage::AuthToken { token: client.identity.token() }),
                Err(e) => push(outbox, ServerMessage::from(&e)),
            }
        }
        ClientMessage::SignOut => match client.session.sign_out().await {
            Ok(()) => push(outbox, ServerMessage::AuthToken { token: None }),
            Err(e) => push(outbox, ServerMessage::from(&e)),
        },
        ClientMessage::Navigate { segment } => {
            let redirect = {
                let mut routes = client.routes.lock().unwrap_or_else(PoisonError::into_inner);
                let state = client.session.state();
                routes.navigate(&segment, &state)
            };
            if let Some(route) = redirect {
                push(outbox, ServerMessage::Redirect { route });
            }
        }
        // Feedback operations run alongside the message loop so a second
        // submit or a newer listing can arrive while one is still pending.
        ClientMessage::SubmitFeedback { rating, comment } => {
            let client = client.clone();
            let outbox = outbox.clone();
            tokio::spawn(async move {
                match client.feedback.submit(FeedbackDraft::new(rating, comment)).await {
                    Ok(id) => push(&outbox, ServerMessage::FeedbackSubmitted { id }),
                    Err(e) => push(&outbox, ServerMessage::from(&e)),
                }
            });
        }
        ClientMessage::ListFeedbacks => {
            let client = client.clone();
            let outbox = outbox.clone();
            tokio::spawn(async move {
                match client.feedback.list_mine().await {
                    Ok(Listing::Current { seq, records }) => {
                        push(&outbox, ServerMessage::feedbacks(seq, &records));
                    }
                    Ok(Listing::Superseded { seq }) => {
                        debug!(seq, "superseded feedback listing not sent");
                    }
                    Err(e) => push(&outbox, ServerMessage::from(&e)),
                }
            });
        }
        ClientMessage::RefreshSession => {
            if let Err(e) = client.identity.revalidate().await {
                push(outbox, ServerMessage::from(&e));
            }
        }
    }
}
