use crate::application::error::GameError;
use crate::application::registry::{RoomSession, SessionRegistry};
use crate::config::AppConfig;
use crate::domain::board::Board;
use crate::domain::game::MatchState;
use crate::domain::models::{
    EndReason, GameOutcome, PlayerId, Room, RoomId, RoomStatus,
};
use crate::infrastructure::oracle::MoveOracle;
use crate::infrastructure::persistence::RoomRepository;
use crate::infrastructure::transport::{GameEvent, GameTransport};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{error, info, warn};

/// The session coordinator. Owns the registry of active matches and drives
/// every state transition; the repository, oracle, and transport are handed
/// in at construction so nothing reaches for globals.
pub struct GameService {
    registry: SessionRegistry,
    rooms: Arc<dyn RoomRepository>,
    oracle: Arc<dyn MoveOracle>,
    transport: Arc<dyn GameTransport>,
    config: AppConfig,
    /// Back-reference handed to spawned timer and bot tasks.
    self_ref: Weak<GameService>,
}

impl GameService {
    pub fn new(
        config: AppConfig,
        rooms: Arc<dyn RoomRepository>,
        oracle: Arc<dyn MoveOracle>,
        transport: Arc<dyn GameTransport>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            registry: SessionRegistry::new(),
            rooms,
            oracle,
            transport,
            config,
            self_ref: self_ref.clone(),
        })
    }

    /// Owning handle for spawned tasks; `None` only during teardown, in
    /// which case there is nothing left to schedule for.
    pub(crate) fn shared(&self) -> Option<Arc<Self>> {
        self.self_ref.upgrade()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &Arc<dyn RoomRepository> {
        &self.rooms
    }

    pub(crate) fn oracle(&self) -> &Arc<dyn MoveOracle> {
        &self.oracle
    }

    pub(crate) fn transport(&self) -> &Arc<dyn GameTransport> {
        &self.transport
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn turn_limit(&self, room: &Room) -> u64 {
        room.turn_time_limit.unwrap_or(self.config.timers.turn_seconds)
    }

    fn board_size(&self, room: &Room) -> usize {
        room.board_size.unwrap_or(self.config.game.board_size)
    }

    fn win_length(&self, room: &Room) -> usize {
        room.win_length.unwrap_or(self.config.game.win_length)
    }

    /// Starts the match. Host-only; needs two participants (a bot counts)
    /// and every non-host connected human ready. Creates the match state,
    /// flips the room to playing, arms the timers, and kicks the bot if it
    /// holds the first turn.
    pub async fn start_game(
        &self,
        room_id: RoomId,
        requester: PlayerId,
    ) -> Result<(), GameError> {
        let room = self.rooms.get_room(room_id).await?;
        let entry = room.player(requester).ok_or(GameError::NotInRoom)?;
        if !entry.is_host {
            return Err(GameError::NotHost);
        }
        if room.status == RoomStatus::Playing {
            return Err(GameError::AlreadyPlaying);
        }
        if room.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }
        let all_ready = room
            .players
            .iter()
            .filter(|p| !p.is_host && !p.is_bot && p.is_connected)
            .all(|p| p.is_ready);
        if !all_ready {
            return Err(GameError::PlayersNotReady);
        }

        let first_index = room.first_player_index();
        let state = MatchState::new(
            self.board_size(&room),
            self.win_length(&room),
            room.first_turn,
            first_index,
        );
        let session = self.registry.create(room_id, state);
        if let Err(err) = self.rooms.update_room_status(room_id, RoomStatus::Playing).await {
            self.registry.remove(&room_id);
            return Err(err.into());
        }

        let now = Instant::now();
        {
            let mut seen = session.last_seen.lock().unwrap();
            for p in room.players.iter().filter(|p| !p.is_bot && p.is_connected) {
                seen.insert(p.id, now);
            }
        }
        let window = self.liveness_window();
        for p in room.players.iter().filter(|p| !p.is_bot && p.is_connected) {
            self.arm_liveness(&session, p.id, window);
        }
        let turn_limit = self.turn_limit(&room);
        self.arm_turn_timer(&session, turn_limit);

        let guard = session.state.lock().await;
        info!(%room_id, host = %requester, "game started");
        self.transport.broadcast(
            room_id,
            GameEvent::GameStart {
                players: room.players.clone(),
                board: guard.board().to_rows(),
                turn: guard.turn(),
                current_player_index: guard.current_player_index(),
                marks: room.marks.clone(),
                turn_time_limit: turn_limit,
                turn_start_time: guard.turn_started_at_ms(),
            },
        );
        drop(guard);

        if room.players.get(first_index).is_some_and(|p| p.is_bot) {
            self.schedule_bot_move(room_id);
        }
        Ok(())
    }

    /// Gives up the match; the opponent wins.
    pub async fn surrender(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), GameError> {
        let Some(session) = self.registry.get(&room_id) else {
            return Err(self.missing_session_error(room_id).await);
        };
        let guard = session.state.try_lock().map_err(|_| GameError::Busy)?;
        let room = self.rooms.get_room(room_id).await?;
        if room.status != RoomStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        room.player(player_id).ok_or(GameError::NotInRoom)?;

        let winner = room.opponent_of(player_id).map(|p| p.id);
        info!(%room_id, loser = %player_id, "player surrendered");
        let outcome = GameOutcome::forfeit(winner, player_id, EndReason::Surrender);
        self.end_match(&room, &session, &guard, outcome).await;
        Ok(())
    }

    /// Explicit teardown of a player's connection. During play the match
    /// ends immediately in the opponent's favor; a waiting room whose last
    /// connected occupant leaves is discarded.
    pub async fn handle_disconnect(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), GameError> {
        let room = match self.rooms.get_room(room_id).await {
            Ok(room) => room,
            Err(_) => return Ok(()),
        };
        if room.player(player_id).is_none() {
            return Ok(());
        }

        match room.status {
            RoomStatus::Playing => {
                if let Some(session) = self.registry.get(&room_id) {
                    // A system event, not a client request: wait for the
                    // exclusivity instead of bouncing. Whichever forfeit
                    // path locks first ends the match; the rest see the
                    // status flip and no-op.
                    let guard = session.state.lock().await;
                    let room = self.rooms.get_room(room_id).await?;
                    if room.status == RoomStatus::Playing {
                        self.stop_liveness(&session, player_id);
                        let winner = room.opponent_of(player_id).map(|p| p.id);
                        warn!(%room_id, loser = %player_id, "player disconnected mid-game");
                        let outcome =
                            GameOutcome::forfeit(winner, player_id, EndReason::Disconnect);
                        self.end_match(&room, &session, &guard, outcome).await;
                    }
                }
                let _ = self.rooms.set_connected(room_id, player_id, false).await;
            }
            RoomStatus::Waiting => {
                let others_connected = room
                    .players
                    .iter()
                    .any(|p| p.id != player_id && p.is_connected);
                if others_connected {
                    let _ = self.rooms.set_connected(room_id, player_id, false).await;
                } else {
                    info!(%room_id, "last occupant disconnected, discarding room");
                    let _ = self.rooms.delete_room(room_id).await;
                    self.transport.broadcast(room_id, GameEvent::RoomDeleted);
                    self.transport.drop_room(room_id);
                }
            }
            RoomStatus::Ended => {
                let _ = self.rooms.set_connected(room_id, player_id, false).await;
            }
        }
        Ok(())
    }

    /// Host removes a player. Kicking mid-game forfeits the kicked player.
    pub async fn kick_player(
        &self,
        room_id: RoomId,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<(), GameError> {
        let room = self.rooms.get_room(room_id).await?;
        let host = room.player(requester).ok_or(GameError::NotInRoom)?;
        if !host.is_host {
            return Err(GameError::NotHost);
        }
        let target_entry = room.player(target).ok_or(GameError::NotInRoom)?;
        if target_entry.is_host {
            return Err(GameError::CannotKickHost);
        }

        if room.status == RoomStatus::Playing {
            if let Some(session) = self.registry.get(&room_id) {
                let guard = session.state.lock().await;
                let room = self.rooms.get_room(room_id).await?;
                if room.status == RoomStatus::Playing {
                    self.stop_liveness(&session, target);
                    let winner = room.opponent_of(target).map(|p| p.id);
                    let outcome = GameOutcome::forfeit(winner, target, EndReason::Kick);
                    self.end_match(&room, &session, &guard, outcome).await;
                }
            }
        }

        if let Err(err) = self.rooms.remove_player(room_id, target).await {
            warn!(%room_id, %target, error = %err, "failed to remove kicked player");
        }
        info!(%room_id, %target, "player kicked");
        self.transport
            .broadcast(room_id, GameEvent::PlayerKicked { player_id: target });
        Ok(())
    }

    /// Host-only, allowed from any status: throws away the match, cancels
    /// every timer, and returns the room to waiting with ready flags
    /// cleared.
    pub async fn reset_game(
        &self,
        room_id: RoomId,
        requester: PlayerId,
    ) -> Result<(), GameError> {
        let room = self.rooms.get_room(room_id).await?;
        let entry = room.player(requester).ok_or(GameError::NotInRoom)?;
        if !entry.is_host {
            return Err(GameError::NotHost);
        }

        if let Some(session) = self.registry.get(&room_id) {
            // Serialize with any in-flight transition, and keep the
            // exclusivity through the status flip so no move can sneak into
            // the half-torn-down match.
            let _guard = session.state.lock().await;
            session.cancel_all_timers();
            *session.draw.lock().unwrap() = None;
            self.registry.remove(&room_id);
            self.rooms
                .update_room_status(room_id, RoomStatus::Waiting)
                .await?;
        } else {
            self.rooms
                .update_room_status(room_id, RoomStatus::Waiting)
                .await?;
        }
        if let Err(err) = self.rooms.clear_ready_flags(room_id).await {
            warn!(%room_id, error = %err, "failed to clear ready flags on reset");
        }

        info!(%room_id, host = %requester, "game reset");
        self.transport.broadcast(
            room_id,
            GameEvent::GameReset {
                board: Board::new(self.board_size(&room)).to_rows(),
                turn: room.first_turn,
                current_player_index: room.first_player_index(),
            },
        );
        Ok(())
    }

    /// Re-broadcasts the authoritative match state so a desynchronized
    /// client can catch up. Skipped quietly when the room is idle or busy.
    pub async fn broadcast_state_sync(&self, room_id: RoomId) -> Result<(), GameError> {
        let Ok(room) = self.rooms.get_room(room_id).await else {
            return Ok(());
        };
        let Some(session) = self.registry.get(&room_id) else {
            return Ok(());
        };
        let Ok(guard) = session.state.try_lock() else {
            // Mid-transition; the follow-up broadcast will resync anyway.
            return Ok(());
        };
        self.transport.broadcast(
            room_id,
            GameEvent::GameStateSync {
                board: guard.board().to_rows(),
                turn: guard.turn(),
                current_player_index: guard.current_player_index(),
                history: guard.history().to_vec(),
                turn_start_time: guard.turn_started_at_ms(),
                turn_time_limit: self.turn_limit(&room),
            },
        );
        Ok(())
    }

    /// The one and only terminal transition. Callers hold the room
    /// exclusivity and have re-checked that the room is still playing, so
    /// this runs at most once per match no matter how many forfeit paths
    /// race for it.
    pub(crate) async fn end_match(
        &self,
        room: &Room,
        session: &Arc<RoomSession>,
        state: &MatchState,
        outcome: GameOutcome,
    ) {
        if let Err(err) = self
            .rooms
            .update_room_status(room.id, RoomStatus::Ended)
            .await
        {
            // Gameplay never depends on persistence; finish the in-memory
            // teardown regardless.
            error!(room_id = %room.id, error = %err, "failed to persist room status");
        }

        // Cancelling may abort the very timer task that is running this
        // function, which takes effect at its next yield; everything from
        // here on must stay synchronous.
        session.cancel_all_timers();
        *session.draw.lock().unwrap() = None;
        self.registry.remove(&room.id);

        info!(
            room_id = %room.id,
            winner = ?outcome.winner,
            reason = ?outcome.reason,
            "match ended"
        );
        self.transport.broadcast(
            room.id,
            GameEvent::GameEnd {
                result: outcome.clone(),
                board: state.board().to_rows(),
            },
        );

        let rooms = Arc::clone(&self.rooms);
        let room_id = room.id;
        tokio::spawn(async move {
            if let Err(err) = rooms.record_outcome(room_id, &outcome).await {
                warn!(%room_id, error = %err, "failed to record match outcome");
            }
        });
    }
}
