use crate::domain::board::Board;
use crate::domain::models::Point;
use smallvec::SmallVec;
use thiserror::Error;

/// The four scan axes: horizontal, vertical, and both diagonals. Each axis is
/// walked in both directions from the seed cell.
pub const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Cells forming a winning line, in board order along the axis.
pub type WinLine = SmallVec<[Point; 8]>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("win scan seeded at an empty cell ({0}, {1})")]
    EmptySeed(usize, usize),
    #[error("win scan seeded outside the board ({0}, {1})")]
    SeedOutOfBounds(usize, usize),
}

/// Checks whether the move just played at `seed` completes a line of
/// `win_length` same-mark cells. Only lines through the seed can have been
/// created by the move, so the scan stays local: for each axis it extends
/// from the seed in both directions, counting consecutive cells of the
/// seed's mark.
///
/// Returns the first `win_length` cells of the completed line, or `None`.
pub fn check_win(board: &Board, seed: Point, win_length: usize) -> Result<Option<WinLine>, RulesError> {
    if !board.in_bounds(seed.x, seed.y) {
        return Err(RulesError::SeedOutOfBounds(seed.x, seed.y));
    }
    let mark = board
        .get(seed.x, seed.y)
        .ok_or(RulesError::EmptySeed(seed.x, seed.y))?;

    let sx = seed.x as isize;
    let sy = seed.y as isize;
    let reach = win_length as isize - 1;

    for (dx, dy) in AXES {
        let mut cells: WinLine = SmallVec::new();

        // Walk backwards first so the line comes out in board order.
        for i in (1..=reach).rev() {
            let (nx, ny) = (sx - dx * i, sy - dy * i);
            if board.mark_at(nx, ny) == Some(mark) {
                // Only a contiguous run counts; restart on the first gap.
                cells.push(Point::new(nx as usize, ny as usize));
            } else {
                cells.clear();
            }
        }
        cells.push(seed);
        for i in 1..=reach {
            let (nx, ny) = (sx + dx * i, sy + dy * i);
            if board.mark_at(nx, ny) == Some(mark) {
                cells.push(Point::new(nx as usize, ny as usize));
            } else {
                break;
            }
        }

        if cells.len() >= win_length {
            cells.truncate(win_length);
            return Ok(Some(cells));
        }
    }

    Ok(None)
}

/// A full board without a completed line is a draw.
pub fn is_draw(board: &Board) -> bool {
    board.is_full()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Mark;

    fn board_with(marks: &[(usize, usize, Mark)]) -> Board {
        let mut board = Board::new(20);
        for &(x, y, mark) in marks {
            board.set(x, y, mark);
        }
        board
    }

    #[test]
    fn test_no_win_on_sparse_board() {
        let board = board_with(&[(0, 0, Mark::X), (5, 5, Mark::X)]);
        assert_eq!(check_win(&board, Point::new(5, 5), 5).unwrap(), None);
    }

    #[test]
    fn test_horizontal_win_any_seed() {
        let board = board_with(&[
            (10, 10, Mark::X),
            (10, 11, Mark::X),
            (10, 12, Mark::X),
            (10, 13, Mark::X),
            (10, 14, Mark::X),
        ]);
        for y in 10..=14 {
            let line = check_win(&board, Point::new(10, y), 5)
                .unwrap()
                .expect("line through every cell of the run");
            assert_eq!(line.len(), 5);
            assert_eq!(line[0], Point::new(10, 10));
            assert_eq!(line[4], Point::new(10, 14));
        }
    }

    #[test]
    fn test_anti_diagonal_win() {
        let board = board_with(&[
            (4, 10, Mark::O),
            (5, 9, Mark::O),
            (6, 8, Mark::O),
            (7, 7, Mark::O),
            (8, 6, Mark::O),
        ]);
        let line = check_win(&board, Point::new(6, 8), 5).unwrap().unwrap();
        assert_eq!(line.len(), 5);
    }

    #[test]
    fn test_gap_does_not_win() {
        let board = board_with(&[
            (3, 3, Mark::X),
            (3, 4, Mark::X),
            (3, 6, Mark::X),
            (3, 7, Mark::X),
            (3, 8, Mark::X),
        ]);
        assert_eq!(check_win(&board, Point::new(3, 8), 5).unwrap(), None);
    }

    #[test]
    fn test_opponent_mark_breaks_run() {
        let board = board_with(&[
            (0, 0, Mark::X),
            (0, 1, Mark::X),
            (0, 2, Mark::O),
            (0, 3, Mark::X),
            (0, 4, Mark::X),
        ]);
        assert_eq!(check_win(&board, Point::new(0, 4), 5).unwrap(), None);
    }

    #[test]
    fn test_overlong_run_reports_first_five() {
        let board = board_with(&[
            (2, 2, Mark::X),
            (3, 3, Mark::X),
            (4, 4, Mark::X),
            (5, 5, Mark::X),
            (6, 6, Mark::X),
            (7, 7, Mark::X),
        ]);
        let line = check_win(&board, Point::new(4, 4), 5).unwrap().unwrap();
        assert_eq!(line.len(), 5);
        assert_eq!(line[0], Point::new(2, 2));
    }

    #[test]
    fn test_configurable_win_length() {
        let board = board_with(&[(1, 1, Mark::O), (2, 1, Mark::O), (3, 1, Mark::O)]);
        assert!(check_win(&board, Point::new(2, 1), 3).unwrap().is_some());
        assert_eq!(check_win(&board, Point::new(2, 1), 4).unwrap(), None);
    }

    #[test]
    fn test_empty_seed_is_an_error() {
        let board = Board::new(20);
        assert_eq!(
            check_win(&board, Point::new(0, 0), 5),
            Err(RulesError::EmptySeed(0, 0))
        );
    }
}
