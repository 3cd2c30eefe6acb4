use crate::domain::board::Board;
use crate::domain::models::{Difficulty, Mark, Point};
use crate::domain::rules::AXES;
use crate::infrastructure::oracle::{MoveOracle, OracleError};
use rand::Rng;
use rustc_hash::FxHashSet;

/// Raw pattern tables, written from the mover's perspective: `X` is the
/// mover, `O` the opponent, `_` an empty cell. Reversed forms are generated
/// at construction.
const PATTERNS: &[(&[&str], f64)] = &[
    (&["_XXXX", "X_XXX", "XX_XX"], 100_000.0),
    (
        &["__XXX", "_X_XX", "_XX_X", "_XXX_", "X__XX", "X_X_X"],
        10_000.0,
    ),
    (
        &["___XX", "__X_X", "__XX_", "_X__X", "_X_X_", "X___X"],
        500.0,
    ),
    (&["X____", "_X___", "__X__"], 50.0),
];

/// A pattern score at or above this means the cell wins on the spot (or
/// stops an immediate loss); hard mode plays it without looking deeper.
const WINNING_THRESHOLD: f64 = 50_000.0;

/// How much of the opponent's best reply is subtracted during the hard-mode
/// lookahead.
const RESPONSE_WEIGHT: f64 = 0.8;

const ATTACK_WEIGHT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct CellScore {
    total: f64,
    attack: f64,
    defense: f64,
}

/// Pattern-scoring move oracle. For every empty cell bordering the existing
/// stones it scores the four lines through the cell twice: once from the
/// bot's perspective (attack, weighted 1.5) and once from the opponent's
/// (defense), then picks per the configured difficulty.
pub struct PatternOracle {
    patterns: Vec<(String, f64)>,
}

impl PatternOracle {
    pub fn new() -> Self {
        let mut patterns = Vec::new();
        for (group, score) in PATTERNS {
            for &p in *group {
                patterns.push((p.to_string(), *score));
                let reversed: String = p.chars().rev().collect();
                if reversed != p {
                    patterns.push((reversed, *score));
                }
            }
        }
        Self { patterns }
    }

    /// Nine-cell line through `p` along `d`, rendered from the given
    /// perspective. Off-board cells read as empty.
    fn line_pattern(board: &Board, p: Point, d: (isize, isize), perspective: Mark) -> String {
        let mut s = String::with_capacity(9);
        for i in -4..=4_isize {
            let nx = p.x as isize + d.0 * i;
            let ny = p.y as isize + d.1 * i;
            s.push(match board.mark_at(nx, ny) {
                Some(mark) if mark == perspective => 'X',
                Some(_) => 'O',
                None => '_',
            });
        }
        s
    }

    fn evaluate_cell(&self, board: &Board, p: Point, perspective: Mark, multiplier: f64) -> f64 {
        let mut score = 0.0;
        for d in AXES {
            let line = Self::line_pattern(board, p, d, perspective);
            for (pattern, value) in &self.patterns {
                if line.contains(pattern.as_str()) {
                    score += value * multiplier;
                }
            }
        }
        score
    }

    /// Empty cells within one step of any stone, in row-major order.
    fn border_cells(board: &Board) -> Vec<Point> {
        let mut seen = FxHashSet::default();
        let mut cells = Vec::new();
        let size = board.size() as isize;
        for (p, _) in board.occupied_points() {
            for dx in -1..=1_isize {
                for dy in -1..=1_isize {
                    let nx = p.x as isize + dx;
                    let ny = p.y as isize + dy;
                    if nx < 0 || ny < 0 || nx >= size || ny >= size {
                        continue;
                    }
                    let candidate = Point::new(nx as usize, ny as usize);
                    if board.is_empty_cell(candidate.x, candidate.y) && seen.insert(candidate) {
                        cells.push(candidate);
                    }
                }
            }
        }
        cells.sort_by_key(|p| (p.x, p.y));
        cells
    }

    fn evaluate_board(&self, board: &Board, mark: Mark) -> Vec<(Point, CellScore)> {
        let opponent = mark.opponent();
        Self::border_cells(board)
            .into_iter()
            .map(|p| {
                let attack = self.evaluate_cell(board, p, mark, ATTACK_WEIGHT);
                let defense = self.evaluate_cell(board, p, opponent, 1.0);
                (
                    p,
                    CellScore {
                        total: attack + defense,
                        attack,
                        defense,
                    },
                )
            })
            .collect()
    }

    fn best_move(&self, board: &Board, mark: Mark) -> Option<(Point, CellScore)> {
        let mut best: Option<(Point, CellScore)> = None;
        for (p, score) in self.evaluate_board(board, mark) {
            match best {
                Some((_, current)) if score.total <= current.total => {}
                _ => best = Some((p, score)),
            }
        }
        best
    }

    fn choose_easy(&self, board: &Board, mark: Mark, candidates: &[Point]) -> Option<Point> {
        let mut rng = rand::thread_rng();
        // Mostly random, with an occasional real move so the bot is not a pushover.
        if rng.gen_bool(0.3) {
            return self.best_move(board, mark).map(|(p, _)| p);
        }
        candidates.get(rng.gen_range(0..candidates.len())).copied()
    }

    fn choose_hard(&self, board: &Board, mark: Mark) -> Option<Point> {
        let (best_point, best_score) = self.best_move(board, mark)?;
        if best_score.total >= WINNING_THRESHOLD {
            return Some(best_point);
        }

        // One-ply lookahead over the top candidates: play the cell, let the
        // opponent answer with its best reply, discount accordingly.
        let mut scored = self.evaluate_board(board, mark);
        scored.sort_by(|a, b| b.1.total.partial_cmp(&a.1.total).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(5);

        let opponent = mark.opponent();
        let mut chosen: Option<(Point, f64)> = None;
        for (p, score) in scored {
            let mut probe = board.clone();
            probe.set(p.x, p.y, mark);
            let final_score = match self.best_move(&probe, opponent) {
                Some((_, reply)) => score.total - reply.total * RESPONSE_WEIGHT,
                None => score.total,
            };
            match chosen {
                Some((_, current)) if final_score <= current => {}
                _ => chosen = Some((p, final_score)),
            }
        }
        chosen.map(|(p, _)| p).or(Some(best_point))
    }
}

impl Default for PatternOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveOracle for PatternOracle {
    fn choose_move(
        &self,
        board: &Board,
        mark: Mark,
        difficulty: Difficulty,
        _last_move: Option<Point>,
    ) -> Result<Point, OracleError> {
        let candidates = Self::border_cells(board);
        if candidates.is_empty() {
            if board.is_full() {
                return Err(OracleError::NoCandidate);
            }
            // Empty board: open in the center.
            let center = board.size() / 2;
            return Ok(Point::new(center, center));
        }

        let choice = match difficulty {
            Difficulty::Easy => self.choose_easy(board, mark, &candidates),
            Difficulty::Medium => self.best_move(board, mark).map(|(p, _)| p),
            Difficulty::Hard => self.choose_hard(board, mark),
        };
        choice.ok_or(OracleError::NoCandidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(size: usize, marks: &[(usize, usize, Mark)]) -> Board {
        let mut board = Board::new(size);
        for &(x, y, mark) in marks {
            board.set(x, y, mark);
        }
        board
    }

    #[test]
    fn test_center_opening_on_empty_board() {
        let oracle = PatternOracle::new();
        let board = Board::new(15);
        let p = oracle
            .choose_move(&board, Mark::X, Difficulty::Medium, None)
            .unwrap();
        assert_eq!(p, Point::new(7, 7));
    }

    #[test]
    fn test_completes_an_open_four() {
        let oracle = PatternOracle::new();
        let board = board_with(
            15,
            &[
                (7, 3, Mark::X),
                (7, 4, Mark::X),
                (7, 5, Mark::X),
                (7, 6, Mark::X),
                (0, 0, Mark::O),
                (1, 0, Mark::O),
                (2, 0, Mark::O),
            ],
        );
        let p = oracle
            .choose_move(&board, Mark::X, Difficulty::Medium, None)
            .unwrap();
        assert!(
            p == Point::new(7, 2) || p == Point::new(7, 7),
            "expected a completion of the four, got {p:?}"
        );
    }

    #[test]
    fn test_blocks_an_opponent_four() {
        let oracle = PatternOracle::new();
        let board = board_with(
            15,
            &[
                (5, 5, Mark::O),
                (5, 6, Mark::O),
                (5, 7, Mark::O),
                (5, 8, Mark::O),
                (10, 10, Mark::X),
            ],
        );
        let p = oracle
            .choose_move(&board, Mark::X, Difficulty::Hard, None)
            .unwrap();
        assert!(
            p == Point::new(5, 4) || p == Point::new(5, 9),
            "expected a block at either end, got {p:?}"
        );
    }

    #[test]
    fn test_easy_picks_a_border_cell() {
        let oracle = PatternOracle::new();
        let board = board_with(15, &[(7, 7, Mark::O)]);
        for _ in 0..20 {
            let p = oracle
                .choose_move(&board, Mark::X, Difficulty::Easy, None)
                .unwrap();
            assert!(board.is_empty_cell(p.x, p.y));
            let dx = (p.x as isize - 7).abs();
            let dy = (p.y as isize - 7).abs();
            assert!(dx <= 1 && dy <= 1, "easy move should hug the stones");
        }
    }

    #[test]
    fn test_full_board_has_no_candidate() {
        let oracle = PatternOracle::new();
        let mut board = Board::new(2);
        for x in 0..2 {
            for y in 0..2 {
                board.set(x, y, Mark::X);
            }
        }
        assert_eq!(
            oracle.choose_move(&board, Mark::O, Difficulty::Medium, None),
            Err(OracleError::NoCandidate)
        );
    }
}
