use crate::infrastructure::persistence::RepositoryError;
use crate::infrastructure::transport::ErrorKind;
use thiserror::Error;

/// Everything a coordination request can be rejected with. Rejections leave
/// the match state untouched; only `Busy` is worth an immediate retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("another action for this room is still being processed")]
    Busy,
    #[error("room not found")]
    RoomNotFound,
    #[error("no active match for this room")]
    MatchNotFound,
    #[error("you are not in this room")]
    NotInRoom,
    #[error("the game has not started or is already over")]
    NotPlaying,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("coordinates ({0}, {1}) are outside the board")]
    OutOfBounds(usize, usize),
    #[error("cell ({0}, {1}) is already occupied")]
    CellOccupied(usize, usize),
    #[error("only the host may do this")]
    NotHost,
    #[error("the game has already started")]
    AlreadyPlaying,
    #[error("at least two participants are needed to start")]
    NotEnoughPlayers,
    #[error("all non-host players must be ready")]
    PlayersNotReady,
    #[error("a draw request is already pending")]
    DrawAlreadyPending,
    #[error("no draw request is pending")]
    NoDrawPending,
    #[error("you cannot respond to your own draw request")]
    OwnDrawRequest,
    #[error("only the requester may cancel a draw request")]
    NotDrawRequester,
    #[error("no moves to undo")]
    NothingToUndo,
    #[error("you may only undo your own last move")]
    UndoNotAllowed,
    #[error("the host cannot be kicked")]
    CannotKickHost,
    #[error("board state inconsistent: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl GameError {
    /// Wire-level taxonomy of this rejection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::Busy => ErrorKind::Busy,
            GameError::RoomNotFound
            | GameError::MatchNotFound
            | GameError::Repository(RepositoryError::RoomNotFound)
            | GameError::Repository(RepositoryError::PlayerNotFound) => ErrorKind::NotFound,
            GameError::NoDrawPending => ErrorKind::StateConflict,
            _ => ErrorKind::Validation,
        }
    }

    /// Rejections after which the authoritative state is re-broadcast so the
    /// caller can resynchronize.
    pub fn wants_state_sync(&self) -> bool {
        matches!(
            self,
            GameError::NoDrawPending | GameError::NotYourTurn | GameError::NotPlaying
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_mapping() {
        assert_eq!(GameError::Busy.kind(), ErrorKind::Busy);
        assert_eq!(GameError::RoomNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(GameError::NoDrawPending.kind(), ErrorKind::StateConflict);
        assert_eq!(GameError::NotYourTurn.kind(), ErrorKind::Validation);
        assert_eq!(GameError::CellOccupied(3, 4).kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_state_sync_rejections() {
        assert!(GameError::NotYourTurn.wants_state_sync());
        assert!(GameError::NoDrawPending.wants_state_sync());
        assert!(!GameError::Busy.wants_state_sync());
        assert!(!GameError::CellOccupied(0, 0).wants_state_sync());
    }
}
