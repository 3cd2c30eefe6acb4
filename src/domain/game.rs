use crate::domain::board::Board;
use crate::domain::models::{now_ms, Mark, MoveRecord, PlayerId, Point};
use crate::domain::rules::{self, WinLine};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceError {
    #[error("coordinates ({0}, {1}) are outside the board")]
    OutOfBounds(usize, usize),
    #[error("cell ({0}, {1}) is already occupied")]
    Occupied(usize, usize),
    #[error("board state inconsistent: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    #[error("no moves to undo")]
    EmptyHistory,
    #[error("history holds {available} moves, {requested} requested")]
    NotEnoughMoves { available: usize, requested: usize },
}

/// What a successfully applied move did to the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move completed a winning line.
    Win { line: WinLine },
    /// The board filled up without a winner.
    Draw,
    /// Play continues with the next player.
    Continue { next_turn: Mark, next_index: usize },
}

/// The in-memory aggregate for one active match. Exists only while its room
/// is playing and is mutated exclusively through [`apply`](Self::apply) and
/// [`undo`](Self::undo); the coordinator serializes access per room.
#[derive(Debug, Clone)]
pub struct MatchState {
    board: Board,
    turn: Mark,
    current_player_index: usize,
    history: Vec<MoveRecord>,
    turn_started_at_ms: u64,
    win_length: usize,
}

impl MatchState {
    pub fn new(board_size: usize, win_length: usize, first_turn: Mark, first_index: usize) -> Self {
        Self {
            board: Board::new(board_size),
            turn: first_turn,
            current_player_index: first_index,
            history: Vec::new(),
            turn_started_at_ms: now_ms(),
            win_length,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Mark {
        self.turn
    }

    pub fn current_player_index(&self) -> usize {
        self.current_player_index
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.history.last()
    }

    pub fn turn_started_at_ms(&self) -> u64 {
        self.turn_started_at_ms
    }

    pub fn win_length(&self) -> usize {
        self.win_length
    }

    pub fn stamp_turn_start(&mut self) {
        self.turn_started_at_ms = now_ms();
    }

    /// Applies the current player's move at `p`. Turn ownership has already
    /// been checked by the coordinator; this validates the board geometry,
    /// writes the mark, and resolves the outcome. If outcome resolution
    /// fails, the write is rolled back so the state is exactly what it was
    /// before the call.
    pub fn apply(
        &mut self,
        p: Point,
        player_id: PlayerId,
        player_count: usize,
    ) -> Result<MoveOutcome, PlaceError> {
        if !self.board.in_bounds(p.x, p.y) {
            return Err(PlaceError::OutOfBounds(p.x, p.y));
        }
        if !self.board.is_empty_cell(p.x, p.y) {
            return Err(PlaceError::Occupied(p.x, p.y));
        }

        let mark = self.turn;
        self.board.set(p.x, p.y, mark);
        self.history.push(MoveRecord {
            x: p.x,
            y: p.y,
            mark,
            player_id,
            timestamp_ms: now_ms(),
        });

        let line = match rules::check_win(&self.board, p, self.win_length) {
            Ok(line) => line,
            Err(err) => {
                // Roll back the write; the move is reported as failed.
                self.board.clear(p.x, p.y);
                self.history.pop();
                return Err(PlaceError::Inconsistent(err.to_string()));
            }
        };

        if let Some(line) = line {
            return Ok(MoveOutcome::Win { line });
        }
        if rules::is_draw(&self.board) {
            return Ok(MoveOutcome::Draw);
        }

        self.turn = self.turn.opponent();
        self.current_player_index = (self.current_player_index + 1) % player_count;
        self.stamp_turn_start();
        Ok(MoveOutcome::Continue {
            next_turn: self.turn,
            next_index: self.current_player_index,
        })
    }

    /// Reverts the last `plies` moves, stepping turn and player index back
    /// with each one. Returns the undone records, most recent first.
    pub fn undo(&mut self, plies: usize, player_count: usize) -> Result<Vec<MoveRecord>, UndoError> {
        if self.history.is_empty() {
            return Err(UndoError::EmptyHistory);
        }
        if self.history.len() < plies {
            return Err(UndoError::NotEnoughMoves {
                available: self.history.len(),
                requested: plies,
            });
        }

        let mut undone = Vec::with_capacity(plies);
        for _ in 0..plies {
            let record = self.history.pop().expect("length checked above");
            self.board.clear(record.x, record.y);
            // The player who made the undone move is on turn again.
            self.turn = record.mark;
            self.current_player_index =
                (self.current_player_index + player_count - 1) % player_count;
            undone.push(record);
        }
        self.stamp_turn_start();
        Ok(undone)
    }
}
