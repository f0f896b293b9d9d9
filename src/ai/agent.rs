use ndarray::Array1;

use crate::game::Direction;

/// One observed move, as stored in replay memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub phi: Array1<f64>,
    pub action: Direction,
    pub reward: f64,
    pub next_phi: Array1<f64>,
    pub done: bool,
    /// Legal moves from the successor board; empty when `done`.
    pub next_legal: Vec<Direction>,
}

/// Metrics returned from a training update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateMetrics {
    /// `(target - prediction)^2 / 2` for the replayed transition.
    pub loss: f64,
    pub prediction: f64,
    pub target: f64,
}

/// Universal interface for move-selecting agents.
pub trait Agent {
    /// Pick one of `legal` for the board encoded as `phi`.
    /// When `training` is true, the agent may explore; otherwise it exploits.
    /// Returns `None` only when `legal` is empty.
    fn select_action(
        &mut self,
        phi: &Array1<f64>,
        legal: &[Direction],
        training: bool,
    ) -> Option<Direction>;

    /// Called before each new game. Agents with per-game state reset it here.
    fn begin_game(&mut self) {}

    /// Return the agent's display name.
    fn name(&self) -> &str;
}
