use crate::application::error::GameError;
use crate::application::lifecycle::GameService;
use crate::application::registry::RoomSession;
use crate::domain::game::{MatchState, MoveOutcome, PlaceError, UndoError};
use crate::domain::models::{EndReason, GameOutcome, PlayerId, Point, Room, RoomId, RoomStatus};
use crate::infrastructure::transport::GameEvent;
use std::sync::Arc;
use tracing::info;

/// What a successful move request did, as seen by the caller. The detailed
/// results travel over the transport broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDisposition {
    Continued,
    Ended(EndReason),
}

impl GameService {
    /// Applies one move. The preconditions are checked in order and each
    /// yields its own rejection: per-room exclusivity (busy bounce), room
    /// exists and is playing, the mover is the player on turn, the cell is
    /// on the board and empty. Exactly one caller can get past the first
    /// check at a time, which is what makes move application exactly-once.
    pub async fn apply_move(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        x: usize,
        y: usize,
    ) -> Result<MoveDisposition, GameError> {
        let Some(session) = self.registry().get(&room_id) else {
            return Err(self.missing_session_error(room_id).await);
        };
        let mut guard = session.state.try_lock().map_err(|_| GameError::Busy)?;
        let room = self.rooms().get_room(room_id).await?;
        if room.status != RoomStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        self.apply_move_locked(&room, &session, &mut guard, player_id, Point::new(x, y))
            .await
    }

    /// The write path proper, entered with the room exclusivity held. Shared
    /// by client moves and the bot trigger.
    pub(crate) async fn apply_move_locked(
        &self,
        room: &Room,
        session: &Arc<RoomSession>,
        state: &mut MatchState,
        player_id: PlayerId,
        p: Point,
    ) -> Result<MoveDisposition, GameError> {
        let player = room.player(player_id).ok_or(GameError::NotInRoom)?.clone();
        let on_turn = room
            .players
            .get(state.current_player_index())
            .ok_or_else(|| GameError::Inconsistent("player index out of range".into()))?;
        if on_turn.id != player_id {
            return Err(GameError::NotYourTurn);
        }

        let mark = state.turn();
        let outcome = state
            .apply(p, player_id, room.players.len())
            .map_err(|err| match err {
                PlaceError::OutOfBounds(x, y) => GameError::OutOfBounds(x, y),
                PlaceError::Occupied(x, y) => GameError::CellOccupied(x, y),
                PlaceError::Inconsistent(msg) => GameError::Inconsistent(msg),
            })?;

        let turn_limit = self.turn_limit(room);
        info!(room_id = %room.id, player_id = %player_id, x = p.x, y = p.y, "move applied");

        // Everyone sees the stone land before any result is announced.
        self.transport().broadcast(
            room.id,
            GameEvent::MoveMade {
                x: p.x,
                y: p.y,
                mark,
                player_id,
                board: state.board().to_rows(),
                turn: state.turn(),
                current_player_index: state.current_player_index(),
                history: state.history().to_vec(),
                turn_time_limit: turn_limit,
            },
        );

        match outcome {
            MoveOutcome::Win { line } => {
                let loser = room.opponent_of(player_id).map(|p| p.id);
                let result = GameOutcome {
                    winner: Some(player_id),
                    loser,
                    reason: EndReason::FiveInRow,
                    winning_line: Some(line.into_vec()),
                };
                self.end_match(room, session, state, result).await;
                Ok(MoveDisposition::Ended(EndReason::FiveInRow))
            }
            MoveOutcome::Draw => {
                self.end_match(room, session, state, GameOutcome::draw(EndReason::BoardFull))
                    .await;
                Ok(MoveDisposition::Ended(EndReason::BoardFull))
            }
            MoveOutcome::Continue {
                next_turn,
                next_index,
            } => {
                self.arm_turn_timer(session, turn_limit);
                self.transport().broadcast(
                    room.id,
                    GameEvent::TurnStarted {
                        turn_start_time: state.turn_started_at_ms(),
                        turn_time_limit: turn_limit,
                        current_player_index: next_index,
                        turn: next_turn,
                    },
                );
                // At most one bot reply per human move; a bot's own move
                // never re-triggers it.
                if !player.is_bot {
                    if let Some(next) = room.players.get(next_index) {
                        if next.is_bot {
                            self.schedule_bot_move(room.id);
                        }
                    }
                }
                Ok(MoveDisposition::Continued)
            }
        }
    }

    /// Reverts the most recent move (two plies in a bot room, so the human
    /// gets their own stone back). The host may undo anything; a player only
    /// their own last move.
    pub async fn undo_move(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), GameError> {
        let Some(session) = self.registry().get(&room_id) else {
            return Err(self.missing_session_error(room_id).await);
        };
        let mut guard = session.state.try_lock().map_err(|_| GameError::Busy)?;
        let room = self.rooms().get_room(room_id).await?;
        if room.status != RoomStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        let requester = room.player(player_id).ok_or(GameError::NotInRoom)?;

        let last = guard.last_move().ok_or(GameError::NothingToUndo)?;
        if !requester.is_host && last.player_id != player_id && !last_is_bot(&room, last.player_id)
        {
            return Err(GameError::UndoNotAllowed);
        }

        let plies = if room.has_bot() { 2 } else { 1 };
        let undone = guard
            .undo(plies, room.players.len())
            .map_err(|err| match err {
                UndoError::EmptyHistory | UndoError::NotEnoughMoves { .. } => {
                    GameError::NothingToUndo
                }
            })?;

        let turn_limit = self.turn_limit(&room);
        self.arm_turn_timer(&session, turn_limit);
        info!(room_id = %room.id, player_id = %player_id, plies, "moves undone");

        self.transport().broadcast(
            room.id,
            GameEvent::MoveUndone {
                board: guard.board().to_rows(),
                turn: guard.turn(),
                current_player_index: guard.current_player_index(),
                history: guard.history().to_vec(),
                undone,
            },
        );
        self.transport().broadcast(
            room.id,
            GameEvent::TurnStarted {
                turn_start_time: guard.turn_started_at_ms(),
                turn_time_limit: turn_limit,
                current_player_index: guard.current_player_index(),
                turn: guard.turn(),
            },
        );
        Ok(())
    }

    /// Accurate rejection for requests hitting a room with no live session.
    pub(crate) async fn missing_session_error(&self, room_id: RoomId) -> GameError {
        match self.rooms().get_room(room_id).await {
            Ok(_) => GameError::NotPlaying,
            Err(_) => GameError::RoomNotFound,
        }
    }
}

/// In a bot room the last ply is usually the bot's reply; undoing it on the
/// human's behalf is allowed since the pair is taken back together.
fn last_is_bot(room: &Room, mover: PlayerId) -> bool {
    room.player(mover).is_some_and(|p| p.is_bot)
}
