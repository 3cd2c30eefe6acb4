use crate::application::draw::DrawRequest;
use crate::application::timers::TimerHandle;
use crate::domain::game::MatchState;
use crate::domain::models::{PlayerId, RoomId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Instant;
use tokio::sync::Mutex;

/// Everything the coordinator owns for one playing room: the match state
/// behind the per-room exclusivity mutex, the live timer handles, liveness
/// bookkeeping, and the draw-negotiation slot.
pub struct RoomSession {
    pub room_id: RoomId,
    /// The per-room exclusivity. Client events `try_lock` and bounce with a
    /// busy rejection; timer callbacks and system events wait.
    pub state: Mutex<MatchState>,
    pub(crate) turn_timer: StdMutex<Option<TimerHandle>>,
    pub(crate) liveness: StdMutex<HashMap<PlayerId, TimerHandle>>,
    pub(crate) last_seen: StdMutex<HashMap<PlayerId, Instant>>,
    pub(crate) draw: StdMutex<Option<DrawRequest>>,
}

impl RoomSession {
    fn new(room_id: RoomId, state: MatchState) -> Self {
        Self {
            room_id,
            state: Mutex::new(state),
            turn_timer: StdMutex::new(None),
            liveness: StdMutex::new(HashMap::new()),
            last_seen: StdMutex::new(HashMap::new()),
            draw: StdMutex::new(None),
        }
    }

    /// Aborts the turn timer and every liveness timer. Idempotent; dropping
    /// a handle aborts its task.
    pub fn cancel_all_timers(&self) {
        self.turn_timer.lock().unwrap().take();
        self.liveness.lock().unwrap().clear();
    }

    pub fn pending_draw(&self) -> Option<DrawRequest> {
        self.draw.lock().unwrap().clone()
    }

    pub fn has_turn_timer(&self) -> bool {
        self.turn_timer.lock().unwrap().is_some()
    }
}

/// Owns every active match, keyed by room. Insertion and removal are the
/// only cross-room synchronization points; everything per-room lives inside
/// the session entry.
pub struct SessionRegistry {
    sessions: DashMap<RoomId, Arc<RoomSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Installs a fresh session for the room, replacing any stale entry left
    /// over from an earlier match.
    pub fn create(&self, room_id: RoomId, state: MatchState) -> Arc<RoomSession> {
        let session = Arc::new(RoomSession::new(room_id, state));
        if let Some(stale) = self.sessions.insert(room_id, Arc::clone(&session)) {
            stale.cancel_all_timers();
        }
        session
    }

    pub fn get(&self, room_id: &RoomId) -> Option<Arc<RoomSession>> {
        self.sessions.get(room_id).map(|s| Arc::clone(&s))
    }

    pub fn remove(&self, room_id: &RoomId) -> Option<Arc<RoomSession>> {
        self.sessions.remove(room_id).map(|(_, s)| s)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.sessions.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Mark;
    use uuid::Uuid;

    #[test]
    fn test_one_session_per_room() {
        let registry = SessionRegistry::new();
        let room = Uuid::new_v4();
        registry.create(room, MatchState::new(20, 5, Mark::X, 0));
        assert!(registry.contains(&room));
        assert_eq!(registry.len(), 1);

        // Re-creating replaces rather than duplicates.
        registry.create(room, MatchState::new(20, 5, Mark::O, 1));
        assert_eq!(registry.len(), 1);

        registry.remove(&room);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_missing_room_is_none() {
        let registry = SessionRegistry::new();
        assert!(registry.remove(&Uuid::new_v4()).is_none());
    }
}
