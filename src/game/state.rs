use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{Board, Direction, Environment, StepOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("game is over")]
    GameOver,
    #[error("moving {0} does not change the board")]
    NoMovement(Direction),
}

/// A single-player game: board, cumulative score and tile-spawn RNG.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    size: usize,
    start_tiles: usize,
    score: u64,
    over: bool,
    rng: StdRng,
}

impl Game {
    /// New game with `start_tiles` random tiles. `seed` makes tile spawns reproducible.
    pub fn new(size: usize, start_tiles: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut game = Game {
            board: Board::new(size),
            size,
            start_tiles,
            score: 0,
            over: false,
            rng,
        };
        game.reset();
        game
    }

    /// Start from a given board instead of random tiles.
    pub fn from_board(board: Board, seed: u64) -> Self {
        let size = board.size();
        let over = !board.moves_available();
        Game {
            board,
            size,
            start_tiles: 2,
            score: 0,
            over,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn is_terminal(&self) -> bool {
        self.over
    }

    /// Legal directions in priority order.
    pub fn legal_moves(&self) -> Vec<Direction> {
        if self.over {
            return Vec::new();
        }
        Direction::PRIORITY
            .into_iter()
            .filter(|&dir| self.board.can_shift(dir))
            .collect()
    }

    /// Slide, score, spawn a tile, and check for game over.
    pub fn apply_move(&mut self, direction: Direction) -> Result<StepOutcome, MoveError> {
        if self.over {
            return Err(MoveError::GameOver);
        }

        let shifted = self.board.shift(direction);
        if !shifted.moved {
            return Err(MoveError::NoMovement(direction));
        }

        self.board = shifted.board;
        self.score += shifted.score_gained;
        self.board.insert_random_tile(&mut self.rng);
        self.over = !self.board.moves_available();

        Ok(StepOutcome {
            score_delta: shifted.score_gained,
            score: self.score,
            is_terminal: self.over,
        })
    }

    /// Clear the board and place the start tiles. The RNG keeps its stream.
    pub fn reset(&mut self) {
        self.board = Board::new(self.size);
        self.score = 0;
        for _ in 0..self.start_tiles {
            self.board.insert_random_tile(&mut self.rng);
        }
        self.over = !self.board.moves_available();
    }
}

impl Environment for Game {
    fn reset(&mut self) {
        Game::reset(self);
    }

    fn legal_moves(&self) -> Vec<Direction> {
        Game::legal_moves(self)
    }

    fn step(&mut self, direction: Direction) -> Result<StepOutcome, MoveError> {
        self.apply_move(direction)
    }

    fn snapshot(&self) -> Vec<f64> {
        self.board.to_vector()
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn is_terminal(&self) -> bool {
        self.over
    }
}
