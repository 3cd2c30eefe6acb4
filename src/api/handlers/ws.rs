use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::api::models::ClientRequest;
use crate::api::state::AppState;
use crate::application::GameError;
use crate::domain::models::{PlayerId, RoomId};
use crate::infrastructure::persistence::RoomRepository;
use crate::infrastructure::transport::{GameEvent, GameTransport};

/// Upgrades to the per-room WebSocket channel carrying the game protocol as
/// JSON frames.
pub async fn room_channel(
    ws: WebSocketUpgrade,
    Path((room_id, player_id)): Path<(RoomId, PlayerId)>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, player_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, room_id: RoomId, player_id: PlayerId) {
    let _ = state.rooms.set_connected(room_id, player_id, true).await;
    let mut rx = state.transport.subscribe(room_id);
    let (mut sender, mut receiver) = socket.split();

    // Outbound: forward room frames addressed to everyone or to this player.
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => {
                    if !frame.is_for(player_id) {
                        continue;
                    }
                    let Ok(text) = serde_json::to_string(&frame.event) else {
                        continue;
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%room_id, %player_id, skipped, "slow consumer, frames dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Inbound: parse requests and dispatch them to the coordinator.
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match serde_json::from_str::<ClientRequest>(&text) {
                Ok(request) => dispatch(&recv_state, room_id, player_id, request).await,
                Err(err) => {
                    debug!(%room_id, %player_id, error = %err, "unparseable client frame");
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // The connection is gone, whatever the reason; let the coordinator
    // resolve any forfeit.
    if let Err(err) = state.service.handle_disconnect(room_id, player_id).await {
        warn!(%room_id, %player_id, error = %err, "disconnect handling failed");
    }
}

async fn dispatch(state: &AppState, room_id: RoomId, player_id: PlayerId, request: ClientRequest) {
    let service = &state.service;
    match request {
        ClientRequest::MakeMove { x, y } => {
            if let Err(err) = service.apply_move(room_id, player_id, x, y).await {
                reject(state, room_id, player_id, move_error(&err), &err).await;
            }
        }
        ClientRequest::RequestDraw => {
            if let Err(err) = service.request_draw(room_id, player_id).await {
                reject(state, room_id, player_id, draw_error(&err), &err).await;
            }
        }
        ClientRequest::CancelDraw => {
            if let Err(err) = service.cancel_draw(room_id, player_id).await {
                reject(state, room_id, player_id, draw_error(&err), &err).await;
            }
        }
        ClientRequest::RespondDraw { accept } => {
            if let Err(err) = service.respond_draw(room_id, player_id, accept).await {
                reject(state, room_id, player_id, draw_error(&err), &err).await;
            }
        }
        ClientRequest::SurrenderGame => {
            if let Err(err) = service.surrender(room_id, player_id).await {
                let event = GameEvent::SurrenderError {
                    reason: err.kind(),
                    message: err.to_string(),
                };
                reject(state, room_id, player_id, event, &err).await;
            }
        }
        ClientRequest::PingRoom => {
            if let Ok(Some(remaining)) = service.record_liveness(room_id, player_id).await {
                state.transport.unicast(
                    room_id,
                    player_id,
                    GameEvent::RoomPong {
                        time_remaining_ms: remaining,
                    },
                );
            }
        }
        ClientRequest::UndoMove => {
            if let Err(err) = service.undo_move(room_id, player_id).await {
                let event = GameEvent::UndoError {
                    reason: err.kind(),
                    message: err.to_string(),
                };
                reject(state, room_id, player_id, event, &err).await;
            }
        }
        ClientRequest::ResetGame => {
            if let Err(err) = service.reset_game(room_id, player_id).await {
                let event = GameEvent::ResetError {
                    reason: err.kind(),
                    message: err.to_string(),
                };
                reject(state, room_id, player_id, event, &err).await;
            }
        }
        ClientRequest::StartGame => {
            if let Err(err) = service.start_game(room_id, player_id).await {
                let event = GameEvent::StartError {
                    reason: err.kind(),
                    message: err.to_string(),
                };
                reject(state, room_id, player_id, event, &err).await;
            }
        }
        ClientRequest::KickPlayer { player_id: target } => {
            if let Err(err) = service.kick_player(room_id, player_id, target).await {
                let event = GameEvent::KickError {
                    reason: err.kind(),
                    message: err.to_string(),
                };
                reject(state, room_id, player_id, event, &err).await;
            }
        }
    }
}

fn move_error(err: &GameError) -> GameEvent {
    GameEvent::MoveError {
        reason: err.kind(),
        message: err.to_string(),
    }
}

fn draw_error(err: &GameError) -> GameEvent {
    GameEvent::DrawError {
        reason: err.kind(),
        message: err.to_string(),
    }
}

/// Rejections go to the requester alone; the ones flagged for resync are
/// followed by an authoritative `game_state_sync` broadcast.
async fn reject(
    state: &AppState,
    room_id: RoomId,
    player_id: PlayerId,
    event: GameEvent,
    err: &GameError,
) {
    state.transport.unicast(room_id, player_id, event);
    if err.wants_state_sync() {
        let _ = state.service.broadcast_state_sync(room_id).await;
    }
}
