use crate::application::error::GameError;
use crate::application::lifecycle::GameService;
use crate::domain::models::{Point, RoomId, RoomStatus};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

impl GameService {
    /// Queues one bot move for the room after the configured think delay.
    /// Called when a human move (or game start) leaves the bot on turn.
    pub(crate) fn schedule_bot_move(&self, room_id: RoomId) {
        let Some(svc) = self.shared() else { return };
        let delay = Duration::from_millis(svc.config().bot.think_millis);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(err) = svc.run_bot_move(room_id).await {
                warn!(%room_id, error = %err, "bot move failed");
            }
        });
    }

    /// Computes and applies the bot's reply. The board is snapshotted under
    /// the room exclusivity, the oracle thinks outside it, and the result is
    /// applied only after re-validating that it is still the bot's turn in a
    /// playing room. An unplayable oracle answer is logged and dropped; the
    /// turn stays with the bot.
    pub(crate) async fn run_bot_move(&self, room_id: RoomId) -> Result<(), GameError> {
        let Some(session) = self.registry().get(&room_id) else {
            return Ok(());
        };

        let (board, mark, last_move, bot_id, difficulty) = {
            let guard = session.state.lock().await;
            let room = self.rooms().get_room(room_id).await?;
            if room.status != RoomStatus::Playing {
                return Ok(());
            }
            let on_turn = room.players.get(guard.current_player_index());
            let bot = match on_turn {
                Some(p) if p.is_bot => p.clone(),
                _ => {
                    debug!(%room_id, "bot trigger fired but it is not the bot's turn");
                    return Ok(());
                }
            };
            let difficulty = room
                .bot_difficulty
                .unwrap_or(self.config().bot.difficulty);
            let last = guard.last_move().map(|m| Point::new(m.x, m.y));
            (guard.board().clone(), guard.turn(), last, bot.id, difficulty)
        };

        let choice = match self
            .oracle()
            .choose_move(&board, mark, difficulty, last_move)
        {
            Ok(p) => p,
            Err(err) => {
                warn!(%room_id, error = %err, "oracle returned no move, turn stays with the bot");
                return Ok(());
            }
        };

        let mut guard = session.state.lock().await;
        let room = self.rooms().get_room(room_id).await?;
        if room.status != RoomStatus::Playing {
            return Ok(());
        }
        match room.players.get(guard.current_player_index()) {
            Some(p) if p.is_bot && p.id == bot_id => {}
            _ => return Ok(()),
        }

        match self
            .apply_move_locked(&room, &session, &mut guard, bot_id, choice)
            .await
        {
            Ok(_) => Ok(()),
            Err(err @ (GameError::OutOfBounds(..) | GameError::CellOccupied(..))) => {
                warn!(%room_id, error = %err, "oracle chose an unplayable cell, move dropped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
