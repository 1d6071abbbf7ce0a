//! WebSocket handler — bidirectional event relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID, joins the board and enters a
//! `select!` loop:
//! - Incoming client frames → parse envelope → handler table → fanout
//! - Events queued for this client by the fanout → forward to socket
//!
//! Handlers are board methods: they mutate state and return `Dispatch`
//! values. This layer owns decoding and delivery. Malformed frames are
//! dropped without a reply so one bad client cannot disrupt the session.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join → `welcome` to self, `user-join` to peers
//! 2. Client sends frames → dispatch → fanout
//! 3. Close → purge in-flight strokes → `user-left` to peers

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Frame, FrameError, ServerEvent};
use crate::services::board::Board;
use crate::services::cursor;
use crate::services::fanout::{self, Dispatch};
use crate::services::session::Outbox;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let name = params.get("name").cloned();
    ws.on_upgrade(move |socket| run_ws(socket, state, name))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, name: Option<String>) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for events routed to this client.
    let (client_tx, mut client_rx) = mpsc::channel::<Arc<ServerEvent>>(state.config.client_channel_capacity);

    connect(&state, client_id, name.as_deref(), client_tx).await;
    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => process_inbound_text(&state, client_id, &text).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            event = client_rx.recv() => {
                // Closed once the fanout detaches this client.
                let Some(event) = event else {
                    warn!(%client_id, "ws: outbound queue detached; closing connection");
                    break;
                };
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    disconnect(&state, client_id).await;
    info!(%client_id, "ws: client disconnected");
}

/// Register a connection and queue its bootstrap.
async fn connect(state: &AppState, client_id: Uuid, name: Option<&str>, client_tx: Outbox) {
    let mut board = state.board.write().await;
    let dispatches = board.join(client_id, name, client_tx);
    fanout::deliver(&mut board.registry, client_id, dispatches);
}

/// Disconnect hook: purge the leaver's in-flight strokes and announce it.
async fn disconnect(state: &AppState, client_id: Uuid) {
    let mut board = state.board.write().await;
    let dispatches = board.leave(client_id);
    fanout::deliver(&mut board.registry, client_id, dispatches);
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and apply one inbound text frame, then fan out the result.
///
/// The board lock is held from mutation through delivery, so
/// peers observe events in the order the board applied them.
async fn process_inbound_text(state: &AppState, client_id: Uuid, text: &str) {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(%client_id, error = %e, "ws: dropping malformed frame");
            return;
        }
    };

    let mut board = state.board.write().await;
    match dispatch_event(&mut board, client_id, &frame) {
        Ok(dispatches) => {
            fanout::deliver(&mut board.registry, client_id, dispatches);
        }
        Err(e) => {
            debug!(%client_id, error = %e, "ws: dropping frame");
        }
    }
}

/// Handler table keyed by event tag.
fn dispatch_event(board: &mut Board, client_id: Uuid, frame: &Frame) -> Result<Vec<Dispatch>, FrameError> {
    match frame.event.as_str() {
        "stroke" => Ok(board.stroke(client_id, frame.payload()?)),
        "undo" => Ok(board.undo(client_id)),
        "redo" => Ok(board.redo(client_id)),
        "cursor" => Ok(vec![cursor::relay(client_id, frame.payload()?)]),
        "clear" => Ok(board.clear(client_id)),
        other => Err(FrameError::UnknownEvent(other.to_owned())),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match event.to_text() {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, event = event.tag(), "ws: failed to serialize event");
            return Err(());
        }
    };
    if !matches!(event, ServerEvent::Cursor { .. }) {
        debug!(event = event.tag(), "ws: send event");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
