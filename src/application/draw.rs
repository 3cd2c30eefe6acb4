use crate::application::error::GameError;
use crate::application::lifecycle::GameService;
use crate::domain::models::{now_ms, EndReason, GameOutcome, PlayerId, RoomId, RoomStatus};
use crate::infrastructure::transport::GameEvent;
use tracing::info;

/// The single outstanding draw offer a room can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRequest {
    pub requester: PlayerId,
    pub requested_at_ms: u64,
}

impl GameService {
    /// Offers a draw to the opponent. One offer at a time per room.
    pub async fn request_draw(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), GameError> {
        let room = self.rooms().get_room(room_id).await?;
        if room.status != RoomStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        room.player(player_id).ok_or(GameError::NotInRoom)?;
        let session = self.registry().get(&room_id).ok_or(GameError::MatchNotFound)?;

        {
            let mut slot = session.draw.lock().unwrap();
            if slot.is_some() {
                return Err(GameError::DrawAlreadyPending);
            }
            *slot = Some(DrawRequest {
                requester: player_id,
                requested_at_ms: now_ms(),
            });
        }

        info!(room_id = %room_id, requester = %player_id, "draw requested");
        self.transport().broadcast(
            room_id,
            GameEvent::DrawRequested {
                requester_id: player_id,
            },
        );
        Ok(())
    }

    /// Withdraws a pending offer. Only the original requester may cancel.
    pub async fn cancel_draw(&self, room_id: RoomId, player_id: PlayerId) -> Result<(), GameError> {
        self.rooms().get_room(room_id).await?;
        let session = self.registry().get(&room_id).ok_or(GameError::MatchNotFound)?;

        {
            let mut slot = session.draw.lock().unwrap();
            match &*slot {
                None => return Err(GameError::NoDrawPending),
                Some(req) if req.requester != player_id => {
                    return Err(GameError::NotDrawRequester);
                }
                Some(_) => *slot = None,
            }
        }

        info!(room_id = %room_id, requester = %player_id, "draw request cancelled");
        self.transport().broadcast(
            room_id,
            GameEvent::DrawCancelled {
                requester_id: player_id,
            },
        );
        Ok(())
    }

    /// Answers the opponent's offer. Accepting ends the match as an agreed
    /// draw; rejecting clears the offer and play continues untouched.
    pub async fn respond_draw(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        accept: bool,
    ) -> Result<(), GameError> {
        let room = self.rooms().get_room(room_id).await?;
        if room.status != RoomStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        room.player(player_id).ok_or(GameError::NotInRoom)?;
        let session = self.registry().get(&room_id).ok_or(GameError::MatchNotFound)?;

        {
            let slot = session.draw.lock().unwrap();
            match &*slot {
                None => return Err(GameError::NoDrawPending),
                Some(req) if req.requester == player_id => {
                    return Err(GameError::OwnDrawRequest);
                }
                Some(_) => {}
            }
        }

        if !accept {
            // The offer may have been withdrawn while we looked at it.
            session
                .draw
                .lock()
                .unwrap()
                .take()
                .ok_or(GameError::NoDrawPending)?;
            info!(room_id = %room_id, responder = %player_id, "draw rejected");
            self.transport().broadcast(
                room_id,
                GameEvent::DrawRejected {
                    responder_id: player_id,
                },
            );
            return Ok(());
        }

        // Accepting is a terminal transition, so it takes the room
        // exclusivity like any other. The offer stays pending on a busy
        // bounce so the responder can simply retry.
        let guard = session.state.try_lock().map_err(|_| GameError::Busy)?;
        let room = self.rooms().get_room(room_id).await?;
        if room.status != RoomStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        session
            .draw
            .lock()
            .unwrap()
            .take()
            .ok_or(GameError::NoDrawPending)?;

        info!(room_id = %room_id, responder = %player_id, "draw accepted");
        self.transport().broadcast(
            room_id,
            GameEvent::DrawAccepted {
                responder_id: player_id,
            },
        );
        self.end_match(&room, &session, &guard, GameOutcome::draw(EndReason::DrawAgreed))
            .await;
        Ok(())
    }
}
