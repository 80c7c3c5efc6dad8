//! Owner WebSocket session: one socket per connected owner, bridging
//! `EngineCommand`s going in and `ServerMessage`s coming back out.
//!
//! The connection lifecycle never touches `SessionRegistry` directly --
//! it only ever talks to the engine through the command channel, the same
//! contract the REST handlers use.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::http::state::AppState;
use crate::simulation::action::Action;
use crate::simulation::command::EngineCommand;
use crate::simulation::ids::{CharacterId, FamilyTreeId};
use crate::simulation::session::ServerMessage;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { family_tree_id: u64 },
    SubmitAction { character_id: u64, action: Action },
}

pub async fn ws_session(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

async fn handle_session(mut socket: WebSocket, state: Arc<AppState>) {
    let owner_id = state.allocate_owner_id();
    let (respond_to, receiver) = oneshot::channel();
    if state
        .commands
        .send(EngineCommand::RegisterSession { owner_id, respond_to })
        .is_err()
    {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    let Ok(mut outbox) = receiver.await else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };
    debug!(?owner_id, "owner session registered");

    loop {
        tokio::select! {
            outgoing = outbox.recv() => {
                match outgoing {
                    Some(message) => {
                        let Ok(json) = serde_json::to_string(&message) else { continue };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&state, owner_id, &text).await {
                            let Ok(json) = serde_json::to_string(&reply) else { continue };
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(?owner_id, error = %err, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }

    let _ = state.commands.send(EngineCommand::Unregister { owner_id });
    debug!(?owner_id, "owner session closed");
}

/// Handles one inbound client frame, returning a direct reply to write back
/// to this owner's own socket (subscription acks, action outcomes). Fanned-out
/// world events still arrive exclusively through `outbox`.
async fn handle_client_message(
    state: &AppState,
    owner_id: crate::simulation::ids::OwnerId,
    text: &str,
) -> Option<ServerMessage> {
    let parsed: Result<ClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(ClientMessage::Subscribe { family_tree_id }) => {
            // The engine pushes the ack back through `outbox` once the
            // subscription is recorded, so there's nothing to return here.
            let _ = state.commands.send(EngineCommand::Subscribe {
                owner_id,
                family_tree_id: FamilyTreeId(family_tree_id),
            });
            None
        }
        Ok(ClientMessage::SubmitAction { character_id, action }) => {
            let (respond_to, receiver) = oneshot::channel();
            if state
                .commands
                .send(EngineCommand::SubmitAction {
                    character_id: CharacterId(character_id),
                    action,
                    respond_to,
                })
                .is_err()
            {
                return Some(ServerMessage::Error { message: "engine unavailable".to_string() });
            }
            match receiver.await {
                Ok(Ok(outcome)) => Some(ServerMessage::Ack { message: outcome.narrative }),
                Ok(Err(err)) => Some(ServerMessage::Error { message: format!("{err:?}") }),
                Err(_) => Some(ServerMessage::Error { message: "engine unavailable".to_string() }),
            }
        }
        Err(err) => {
            warn!(?owner_id, error = %err, "failed to parse client message");
            Some(ServerMessage::Error { message: format!("malformed message: {err}") })
        }
    }
}
