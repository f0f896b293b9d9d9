//! Tile-merging grid simulator: board representation, move directions, the
//! game state machine, and the [`Environment`] seam the learner talks to.

mod board;
mod direction;
mod environment;
mod state;

pub use board::{Board, Shifted, DEFAULT_SIZE};
pub use direction::Direction;
pub use environment::{Environment, StepOutcome};
pub use state::{Game, MoveError};
