#![allow(dead_code)]

use caro::application::GameService;
use caro::config::AppConfig;
use caro::domain::board::Board;
use caro::domain::models::{
    Difficulty, GameOutcome, Mark, PlayerEntry, PlayerId, Point, Room, RoomId, RoomStatus,
    BOT_PLAYER_ID,
};
use caro::infrastructure::oracle::{MoveOracle, OracleError, PatternOracle};
use caro::infrastructure::persistence::{InMemoryRoomStore, RoomRepository};
use caro::infrastructure::transport::{ChannelTransport, TransportFrame};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Everything a coordinator test needs wired together, with the in-memory
/// repository and channel transport exposed for assertions.
pub struct Harness {
    pub service: Arc<GameService>,
    pub rooms: Arc<InMemoryRoomStore>,
    pub transport: Arc<ChannelTransport>,
}

impl Harness {
    pub fn new(config: AppConfig) -> Self {
        Self::with_oracle(config, Arc::new(PatternOracle::new()))
    }

    pub fn with_oracle(config: AppConfig, oracle: Arc<dyn MoveOracle>) -> Self {
        let rooms = Arc::new(InMemoryRoomStore::new());
        let transport = Arc::new(ChannelTransport::new());
        let service = GameService::new(config, rooms.clone(), oracle, transport.clone());
        Self {
            service,
            rooms,
            transport,
        }
    }

    /// Two connected, ready humans; host holds X and moves first.
    pub fn seed_two_player_room(&self) -> (RoomId, PlayerId, PlayerId) {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let room = make_room(vec![
            human(host, "host", true),
            human(guest, "guest", false),
        ]);
        let id = room.id;
        self.rooms.insert_room(room);
        (id, host, guest)
    }

    /// One human host plus the bot; `bot_first` gives the bot mark X and
    /// with it the first turn.
    pub fn seed_bot_room(&self, bot_first: bool) -> (RoomId, PlayerId) {
        let host = Uuid::new_v4();
        let mut room = make_room(vec![human(host, "host", true), bot_entry()]);
        if bot_first {
            room.marks.insert(host, Mark::O);
            room.marks.insert(BOT_PLAYER_ID, Mark::X);
        }
        let id = room.id;
        self.rooms.insert_room(room);
        (id, host)
    }

    pub fn subscribe(&self, room: RoomId) -> broadcast::Receiver<TransportFrame> {
        self.transport.subscribe(room)
    }

    pub async fn status(&self, room: RoomId) -> Option<RoomStatus> {
        self.rooms.get_room(room).await.ok().map(|r| r.status)
    }

    pub fn outcomes(&self, room: RoomId) -> Vec<GameOutcome> {
        self.rooms.recorded_outcomes(room)
    }

    pub async fn board_snapshot(&self, room: RoomId) -> Option<Board> {
        let session = self.service.registry().get(&room)?;
        let guard = session.state.lock().await;
        Some(guard.board().clone())
    }

    pub async fn history_len(&self, room: RoomId) -> usize {
        match self.service.registry().get(&room) {
            Some(session) => session.state.lock().await.history().len(),
            None => 0,
        }
    }
}

pub fn fast_config(turn_seconds: u64, liveness_seconds: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.timers.turn_seconds = turn_seconds;
    config.timers.liveness_seconds = liveness_seconds;
    config.bot.think_millis = 10;
    config
}

pub fn human(id: PlayerId, name: &str, is_host: bool) -> PlayerEntry {
    PlayerEntry {
        id,
        display_name: name.to_string(),
        is_host,
        is_ready: true,
        is_connected: true,
        is_bot: false,
    }
}

pub fn bot_entry() -> PlayerEntry {
    PlayerEntry {
        id: BOT_PLAYER_ID,
        display_name: "Bot".to_string(),
        is_host: false,
        is_ready: true,
        is_connected: true,
        is_bot: true,
    }
}

/// Waiting room with default config overrides; first player gets X.
pub fn make_room(players: Vec<PlayerEntry>) -> Room {
    let mut marks = HashMap::new();
    for (i, p) in players.iter().enumerate() {
        marks.insert(p.id, if i == 0 { Mark::X } else { Mark::O });
    }
    Room {
        id: Uuid::new_v4(),
        players,
        status: RoomStatus::Waiting,
        turn_time_limit: None,
        board_size: None,
        win_length: None,
        marks,
        first_turn: Mark::X,
        bot_difficulty: Some(Difficulty::Medium),
    }
}

/// Oracle that plays back a fixed move list, then reports failure.
pub struct ScriptedOracle {
    moves: Mutex<VecDeque<Point>>,
}

impl ScriptedOracle {
    pub fn new(moves: impl IntoIterator<Item = (usize, usize)>) -> Arc<Self> {
        Arc::new(Self {
            moves: Mutex::new(moves.into_iter().map(|(x, y)| Point::new(x, y)).collect()),
        })
    }
}

impl MoveOracle for ScriptedOracle {
    fn choose_move(
        &self,
        _board: &Board,
        _mark: Mark,
        _difficulty: Difficulty,
        _last_move: Option<Point>,
    ) -> Result<Point, OracleError> {
        self.moves
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(OracleError::NoCandidate)
    }
}

/// Drains everything currently buffered on a room channel.
pub fn drain(rx: &mut broadcast::Receiver<TransportFrame>) -> Vec<TransportFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}
