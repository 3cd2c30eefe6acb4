use crate::application::error::GameError;
use crate::application::lifecycle::GameService;
use crate::application::registry::RoomSession;
use crate::domain::models::{EndReason, GameOutcome, PlayerId, RoomId, RoomStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// A scheduled forfeit callback. Dropping the handle aborts the task, so
/// replacing a map entry is all it takes to re-arm, and cancelling an
/// already-fired timer is a no-op.
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl GameService {
    /// Schedules the turn-timeout forfeit for the player on turn, replacing
    /// (and thereby aborting) any previously armed handle for the room.
    pub(crate) fn arm_turn_timer(&self, session: &Arc<RoomSession>, seconds: u64) {
        let Some(svc) = self.shared() else { return };
        let room_id = session.room_id;
        let handle = tokio::spawn(async move {
            sleep(Duration::from_secs(seconds)).await;
            svc.turn_timer_fired(room_id).await;
        });
        *session.turn_timer.lock().unwrap() = Some(TimerHandle::new(handle));
    }

    /// Clears the room's turn-timer handle unconditionally; cancelling an
    /// already-cancelled or already-fired timer is a no-op.
    pub fn cancel_turn_timer(&self, session: &RoomSession) {
        session.turn_timer.lock().unwrap().take();
    }

    /// Turn timer expired: the player on turn forfeits, unless the match
    /// already ended between scheduling and firing.
    async fn turn_timer_fired(self: Arc<Self>, room_id: RoomId) {
        let Some(session) = self.registry().get(&room_id) else {
            return;
        };
        let guard = session.state.lock().await;
        let room = match self.rooms().get_room(room_id).await {
            Ok(room) => room,
            Err(err) => {
                debug!(%room_id, error = %err, "turn timer fired for a vanished room");
                return;
            }
        };
        if room.status != RoomStatus::Playing {
            return;
        }
        let Some(loser) = room.players.get(guard.current_player_index()).cloned() else {
            return;
        };
        let winner = room.opponent_of(loser.id).map(|p| p.id);
        warn!(%room_id, loser = %loser.id, "turn time limit exceeded");
        let outcome = GameOutcome::forfeit(winner, loser.id, EndReason::TurnTimeout);
        self.end_match(&room, &session, &guard, outcome).await;
    }

    /// Liveness signal from a player. Refreshes the last-seen stamp and
    /// re-arms that player's window; returns the full window in millis for
    /// the pong, or `None` when the room is not being monitored.
    pub async fn record_liveness(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<Option<u64>, GameError> {
        let Ok(room) = self.rooms().get_room(room_id).await else {
            return Ok(None);
        };
        if room.status != RoomStatus::Playing {
            return Ok(None);
        }
        let Some(session) = self.registry().get(&room_id) else {
            return Ok(None);
        };
        match room.player(player_id) {
            Some(entry) if !entry.is_bot => {}
            _ => return Ok(None),
        }

        session
            .last_seen
            .lock()
            .unwrap()
            .insert(player_id, Instant::now());
        let window = self.liveness_window();
        self.arm_liveness(&session, player_id, window);
        Ok(Some(window.as_millis() as u64))
    }

    pub(crate) fn arm_liveness(
        &self,
        session: &Arc<RoomSession>,
        player_id: PlayerId,
        window: Duration,
    ) {
        let Some(svc) = self.shared() else { return };
        let room_id = session.room_id;
        let handle = tokio::spawn(async move {
            sleep(window).await;
            svc.liveness_fired(room_id, player_id).await;
        });
        session
            .liveness
            .lock()
            .unwrap()
            .insert(player_id, TimerHandle::new(handle));
    }

    pub(crate) fn stop_liveness(&self, session: &RoomSession, player_id: PlayerId) {
        session.liveness.lock().unwrap().remove(&player_id);
        session.last_seen.lock().unwrap().remove(&player_id);
    }

    /// Liveness window expired for a player. A signal may have landed while
    /// this callback was queued, so staleness is re-checked under the room
    /// exclusivity before anyone forfeits; a fresh stamp re-arms the
    /// remainder instead.
    async fn liveness_fired(self: Arc<Self>, room_id: RoomId, player_id: PlayerId) {
        let Some(session) = self.registry().get(&room_id) else {
            return;
        };
        let guard = session.state.lock().await;
        let room = match self.rooms().get_room(room_id).await {
            Ok(room) => room,
            Err(_) => return,
        };
        if room.status != RoomStatus::Playing {
            return;
        }
        if room.player(player_id).is_none() {
            return;
        }

        let window = self.liveness_window();
        let last = session.last_seen.lock().unwrap().get(&player_id).copied();
        if let Some(last) = last {
            let elapsed = last.elapsed();
            if elapsed < window {
                debug!(%room_id, %player_id, "liveness window refreshed in flight, re-arming");
                self.arm_liveness(&session, player_id, window - elapsed);
                return;
            }
        }

        warn!(%room_id, %player_id, "liveness window expired, player forfeits");
        let winner = room.opponent_of(player_id).map(|p| p.id);
        let outcome = GameOutcome::forfeit(winner, player_id, EndReason::LivenessTimeout);
        self.end_match(&room, &session, &guard, outcome).await;
    }

    pub(crate) fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.config().timers.liveness_seconds)
    }
}
