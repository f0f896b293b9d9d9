use super::{Direction, MoveError};

/// What the simulator reports after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Points earned by merges during this move.
    pub score_delta: u64,
    /// Cumulative score after the move.
    pub score: u64,
    pub is_terminal: bool,
}

/// The grid simulator as seen by the learning engine.
///
/// The training loop only needs to enumerate legal moves, apply one, and read
/// back a fixed-layout numeric snapshot of the board.
pub trait Environment {
    /// Start a fresh game.
    fn reset(&mut self);

    /// Directions that change the board, in [`Direction::PRIORITY`] order.
    fn legal_moves(&self) -> Vec<Direction>;

    /// Apply `direction`, spawning the next tile.
    fn step(&mut self, direction: Direction) -> Result<StepOutcome, MoveError>;

    /// Board cell values in a fixed layout.
    fn snapshot(&self) -> Vec<f64>;

    fn score(&self) -> u64;

    fn is_terminal(&self) -> bool;
}
