use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::models::{CreateRoomRequest, CreateRoomResponse};
use crate::api::state::AppState;
use crate::domain::models::{Mark, PlayerEntry, Room, RoomStatus, BOT_PLAYER_ID};

pub async fn create_room(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoomRequest>,
) -> impl IntoResponse {
    if !payload.vs_bot && payload.guest_name.is_none() {
        return (StatusCode::BAD_REQUEST, "guest_name or vs_bot required").into_response();
    }

    let host_id = Uuid::new_v4();
    let host = PlayerEntry {
        id: host_id,
        display_name: payload.host_name,
        is_host: true,
        is_ready: true,
        is_connected: true,
        is_bot: false,
    };
    let guest = if payload.vs_bot {
        PlayerEntry {
            id: BOT_PLAYER_ID,
            display_name: "Bot".to_string(),
            is_host: false,
            is_ready: true,
            is_connected: true,
            is_bot: true,
        }
    } else {
        PlayerEntry {
            id: Uuid::new_v4(),
            display_name: payload.guest_name.unwrap_or_default(),
            is_host: false,
            is_ready: true,
            is_connected: true,
            is_bot: false,
        }
    };

    let mut marks = HashMap::new();
    marks.insert(host.id, Mark::X);
    marks.insert(guest.id, Mark::O);

    let room = Room {
        id: Uuid::new_v4(),
        players: vec![host, guest],
        status: RoomStatus::Waiting,
        turn_time_limit: payload.turn_time_limit,
        board_size: payload.board_size,
        win_length: payload.win_length,
        marks,
        first_turn: Mark::X,
        bot_difficulty: None,
    };
    state.rooms.insert_room(room.clone());

    (StatusCode::CREATED, Json(CreateRoomResponse { room })).into_response()
}
