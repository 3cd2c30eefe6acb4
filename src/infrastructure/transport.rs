use crate::domain::models::{
    GameOutcome, Mark, MoveRecord, PlayerEntry, PlayerId, RoomId,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Nested-row board snapshot as sent to clients.
pub type BoardRows = Vec<Vec<Option<Mark>>>;

/// Error taxonomy exposed on the wire with every `*_error` event. Busy is
/// transient and safe to retry; a state conflict is followed by a
/// `game_state_sync` broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Busy,
    NotFound,
    StateConflict,
}

/// Everything the coordinator pushes towards clients. Serialized as
/// `{"event": ..., "data": {...}}` frames on the room channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GameEvent {
    GameStart {
        players: Vec<PlayerEntry>,
        board: BoardRows,
        turn: Mark,
        current_player_index: usize,
        marks: HashMap<PlayerId, Mark>,
        turn_time_limit: u64,
        turn_start_time: u64,
    },
    MoveMade {
        x: usize,
        y: usize,
        mark: Mark,
        player_id: PlayerId,
        board: BoardRows,
        turn: Mark,
        current_player_index: usize,
        history: Vec<MoveRecord>,
        turn_time_limit: u64,
    },
    TurnStarted {
        turn_start_time: u64,
        turn_time_limit: u64,
        current_player_index: usize,
        turn: Mark,
    },
    GameEnd {
        result: GameOutcome,
        board: BoardRows,
    },
    DrawRequested {
        requester_id: PlayerId,
    },
    DrawCancelled {
        requester_id: PlayerId,
    },
    DrawAccepted {
        responder_id: PlayerId,
    },
    DrawRejected {
        responder_id: PlayerId,
    },
    MoveUndone {
        board: BoardRows,
        turn: Mark,
        current_player_index: usize,
        history: Vec<MoveRecord>,
        undone: Vec<MoveRecord>,
    },
    GameReset {
        board: BoardRows,
        turn: Mark,
        current_player_index: usize,
    },
    GameStateSync {
        board: BoardRows,
        turn: Mark,
        current_player_index: usize,
        history: Vec<MoveRecord>,
        turn_start_time: u64,
        turn_time_limit: u64,
    },
    RoomPong {
        time_remaining_ms: u64,
    },
    PlayerKicked {
        player_id: PlayerId,
    },
    RoomDeleted,
    MoveError {
        reason: ErrorKind,
        message: String,
    },
    DrawError {
        reason: ErrorKind,
        message: String,
    },
    UndoError {
        reason: ErrorKind,
        message: String,
    },
    StartError {
        reason: ErrorKind,
        message: String,
    },
    ResetError {
        reason: ErrorKind,
        message: String,
    },
    SurrenderError {
        reason: ErrorKind,
        message: String,
    },
    KickError {
        reason: ErrorKind,
        message: String,
    },
}

/// Who a frame is addressed to within the room channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Room,
    Player(PlayerId),
}

#[derive(Clone, Debug)]
pub struct TransportFrame {
    pub audience: Audience,
    pub event: GameEvent,
}

impl TransportFrame {
    pub fn is_for(&self, player: PlayerId) -> bool {
        match self.audience {
            Audience::Room => true,
            Audience::Player(target) => target == player,
        }
    }
}

/// Output boundary of the coordinator. The core writes events here and is
/// agnostic to how they reach clients. Sends never block the game path.
pub trait GameTransport: Send + Sync {
    fn broadcast(&self, room: RoomId, event: GameEvent);
    fn unicast(&self, room: RoomId, player: PlayerId, event: GameEvent);
    /// Tears down the room channel once the room itself is gone.
    fn drop_room(&self, room: RoomId);
}

/// In-process transport: one tokio broadcast channel per room. The WebSocket
/// layer subscribes per connection and filters unicast frames by player.
pub struct ChannelTransport {
    channels: DashMap<RoomId, broadcast::Sender<TransportFrame>>,
    capacity: usize,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            capacity: 256,
        }
    }

    pub fn subscribe(&self, room: RoomId) -> broadcast::Receiver<TransportFrame> {
        self.sender(room).subscribe()
    }

    fn sender(&self, room: RoomId) -> broadcast::Sender<TransportFrame> {
        self.channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn send(&self, room: RoomId, frame: TransportFrame) {
        if let Some(tx) = self.channels.get(&room) {
            // A send with no live subscribers is fine; nobody is listening.
            let _ = tx.send(frame);
        }
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTransport for ChannelTransport {
    fn broadcast(&self, room: RoomId, event: GameEvent) {
        self.send(
            room,
            TransportFrame {
                audience: Audience::Room,
                event,
            },
        );
    }

    fn unicast(&self, room: RoomId, player: PlayerId, event: GameEvent) {
        self.send(
            room,
            TransportFrame {
                audience: Audience::Player(player),
                event,
            },
        );
    }

    fn drop_room(&self, room: RoomId) {
        self.channels.remove(&room);
    }
}
