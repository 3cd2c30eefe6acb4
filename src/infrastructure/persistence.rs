use crate::domain::models::{GameOutcome, PlayerId, Room, RoomId, RoomStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room not found")]
    RoomNotFound,
    #[error("player not found in room")]
    PlayerNotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Boundary to the system that owns rooms and match outcomes. The
/// coordinator reads room snapshots through it and reports transitions back;
/// outcome recording is best-effort and never blocks gameplay.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn get_room(&self, id: RoomId) -> Result<Room, RepositoryError>;
    async fn update_room_status(&self, id: RoomId, status: RoomStatus)
        -> Result<(), RepositoryError>;
    async fn record_outcome(&self, id: RoomId, outcome: &GameOutcome)
        -> Result<(), RepositoryError>;
    /// Clears every player's ready flag, used when a room returns to waiting.
    async fn clear_ready_flags(&self, id: RoomId) -> Result<(), RepositoryError>;
    async fn set_connected(
        &self,
        id: RoomId,
        player: PlayerId,
        connected: bool,
    ) -> Result<(), RepositoryError>;
    async fn remove_player(&self, id: RoomId, player: PlayerId) -> Result<(), RepositoryError>;
    async fn delete_room(&self, id: RoomId) -> Result<(), RepositoryError>;
}

/// In-process room store. Stands in for the external room service in the
/// bundled server binary and in tests.
pub struct InMemoryRoomStore {
    rooms: DashMap<RoomId, Room>,
    outcomes: DashMap<RoomId, Vec<GameOutcome>>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            outcomes: DashMap::new(),
        }
    }

    pub fn insert_room(&self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    pub fn recorded_outcomes(&self, id: RoomId) -> Vec<GameOutcome> {
        self.outcomes
            .get(&id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: RoomId) -> bool {
        self.rooms.contains_key(&id)
    }
}

impl Default for InMemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomStore {
    async fn get_room(&self, id: RoomId) -> Result<Room, RepositoryError> {
        self.rooms
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(RepositoryError::RoomNotFound)
    }

    async fn update_room_status(
        &self,
        id: RoomId,
        status: RoomStatus,
    ) -> Result<(), RepositoryError> {
        let mut room = self.rooms.get_mut(&id).ok_or(RepositoryError::RoomNotFound)?;
        room.status = status;
        Ok(())
    }

    async fn record_outcome(
        &self,
        id: RoomId,
        outcome: &GameOutcome,
    ) -> Result<(), RepositoryError> {
        self.outcomes.entry(id).or_default().push(outcome.clone());
        Ok(())
    }

    async fn clear_ready_flags(&self, id: RoomId) -> Result<(), RepositoryError> {
        let mut room = self.rooms.get_mut(&id).ok_or(RepositoryError::RoomNotFound)?;
        for player in &mut room.players {
            player.is_ready = false;
        }
        Ok(())
    }

    async fn set_connected(
        &self,
        id: RoomId,
        player: PlayerId,
        connected: bool,
    ) -> Result<(), RepositoryError> {
        let mut room = self.rooms.get_mut(&id).ok_or(RepositoryError::RoomNotFound)?;
        let entry = room
            .players
            .iter_mut()
            .find(|p| p.id == player)
            .ok_or(RepositoryError::PlayerNotFound)?;
        entry.is_connected = connected;
        Ok(())
    }

    async fn remove_player(&self, id: RoomId, player: PlayerId) -> Result<(), RepositoryError> {
        let mut room = self.rooms.get_mut(&id).ok_or(RepositoryError::RoomNotFound)?;
        let before = room.players.len();
        room.players.retain(|p| p.id != player);
        if room.players.len() == before {
            return Err(RepositoryError::PlayerNotFound);
        }
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<(), RepositoryError> {
        self.rooms
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::RoomNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Mark, PlayerEntry};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn sample_room() -> Room {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut marks = HashMap::new();
        marks.insert(host, Mark::X);
        marks.insert(guest, Mark::O);
        Room {
            id: Uuid::new_v4(),
            players: vec![
                PlayerEntry {
                    id: host,
                    display_name: "host".into(),
                    is_host: true,
                    is_ready: true,
                    is_connected: true,
                    is_bot: false,
                },
                PlayerEntry {
                    id: guest,
                    display_name: "guest".into(),
                    is_host: false,
                    is_ready: true,
                    is_connected: true,
                    is_bot: false,
                },
            ],
            status: RoomStatus::Waiting,
            turn_time_limit: None,
            board_size: None,
            win_length: None,
            marks,
            first_turn: Mark::X,
            bot_difficulty: None,
        }
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let store = InMemoryRoomStore::new();
        let room = sample_room();
        let id = room.id;
        store.insert_room(room);

        store
            .update_room_status(id, RoomStatus::Playing)
            .await
            .unwrap();
        assert_eq!(store.get_room(id).await.unwrap().status, RoomStatus::Playing);
    }

    #[tokio::test]
    async fn test_missing_room_is_an_error() {
        let store = InMemoryRoomStore::new();
        assert_eq!(
            store.get_room(Uuid::new_v4()).await.unwrap_err(),
            RepositoryError::RoomNotFound
        );
    }

    #[tokio::test]
    async fn test_clear_ready_flags() {
        let store = InMemoryRoomStore::new();
        let room = sample_room();
        let id = room.id;
        store.insert_room(room);

        store.clear_ready_flags(id).await.unwrap();
        let room = store.get_room(id).await.unwrap();
        assert!(room.players.iter().all(|p| !p.is_ready));
    }
}
