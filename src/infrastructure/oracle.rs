pub mod pattern;

use crate::domain::board::Board;
use crate::domain::models::{Difficulty, Mark, Point};
use thiserror::Error;

pub use pattern::PatternOracle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("no playable cell on the board")]
    NoCandidate,
    #[error("oracle failed: {0}")]
    Failed(String),
}

/// Chooses a move for the automated player. Implementations are pure over
/// the given board snapshot; the coordinator validates whatever comes back
/// before applying it, so a sloppy oracle cannot corrupt a match.
pub trait MoveOracle: Send + Sync {
    fn choose_move(
        &self,
        board: &Board,
        mark: Mark,
        difficulty: Difficulty,
        last_move: Option<Point>,
    ) -> Result<Point, OracleError>;
}
