use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;

/// Reserved identity of the automated player. A room with a bot carries a
/// `PlayerEntry` with this id and `is_bot` set.
pub const BOT_PLAYER_ID: PlayerId = Uuid::nil();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(&self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One participant slot in a room, as mirrored from the room repository.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub display_name: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub is_connected: bool,
    pub is_bot: bool,
}

/// Room snapshot. Owned by the repository; the coordinator only reads it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub players: Vec<PlayerEntry>,
    pub status: RoomStatus,
    /// Per-room overrides; `None` falls back to the configured defaults.
    pub turn_time_limit: Option<u64>,
    pub board_size: Option<usize>,
    pub win_length: Option<usize>,
    pub marks: HashMap<PlayerId, Mark>,
    pub first_turn: Mark,
    pub bot_difficulty: Option<Difficulty>,
}

impl Room {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerEntry> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The other participant, from a two-player room.
    pub fn opponent_of(&self, id: PlayerId) -> Option<&PlayerEntry> {
        self.players.iter().find(|p| p.id != id)
    }

    pub fn host(&self) -> Option<&PlayerEntry> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn bot(&self) -> Option<&PlayerEntry> {
        self.players.iter().find(|p| p.is_bot)
    }

    pub fn has_bot(&self) -> bool {
        self.bot().is_some()
    }

    pub fn mark_of(&self, id: PlayerId) -> Option<Mark> {
        self.marks.get(&id).copied()
    }

    /// Index of the player holding the first-turn mark; the first slot when
    /// the assignment is incomplete.
    pub fn first_player_index(&self) -> usize {
        self.players
            .iter()
            .position(|p| self.marks.get(&p.id) == Some(&self.first_turn))
            .unwrap_or(0)
    }
}

/// Board coordinate. `x` is the row, `y` the column, as on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoveRecord {
    pub x: usize,
    pub y: usize,
    pub mark: Mark,
    pub player_id: PlayerId,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    FiveInRow,
    BoardFull,
    DrawAgreed,
    Surrender,
    TurnTimeout,
    LivenessTimeout,
    Disconnect,
    Kick,
}

/// Terminal result of a match, broadcast with `game_end` and handed to the
/// repository for best-effort recording.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Option<PlayerId>,
    pub loser: Option<PlayerId>,
    pub reason: EndReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_line: Option<Vec<Point>>,
}

impl GameOutcome {
    pub fn forfeit(winner: Option<PlayerId>, loser: PlayerId, reason: EndReason) -> Self {
        Self {
            winner,
            loser: Some(loser),
            reason,
            winning_line: None,
        }
    }

    pub fn draw(reason: EndReason) -> Self {
        Self {
            winner: None,
            loser: None,
            reason,
            winning_line: None,
        }
    }
}

/// Milliseconds since the unix epoch, the timestamp format used on the wire.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
