use crate::domain::models::{PlayerId, Room};
use serde::{Deserialize, Serialize};

/// Requests a client can send on its room channel, as
/// `{"op": ..., "data": {...}}` frames. The room and sender come from the
/// channel itself.
#[derive(Deserialize, Debug)]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum ClientRequest {
    MakeMove { x: usize, y: usize },
    RequestDraw,
    CancelDraw,
    RespondDraw { accept: bool },
    SurrenderGame,
    PingRoom,
    UndoMove,
    ResetGame,
    StartGame,
    KickPlayer { player_id: PlayerId },
}

/// Seeds a room into the bundled in-memory store. This is a stand-in for
/// the external room service, not a room-management API: two fixed slots,
/// host plus either a named guest or the bot.
#[derive(Deserialize, Debug)]
pub struct CreateRoomRequest {
    pub host_name: String,
    #[serde(default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub vs_bot: bool,
    #[serde(default)]
    pub turn_time_limit: Option<u64>,
    #[serde(default)]
    pub board_size: Option<usize>,
    #[serde(default)]
    pub win_length: Option<usize>,
}

#[derive(Serialize, Debug)]
pub struct CreateRoomResponse {
    pub room: Room,
}
