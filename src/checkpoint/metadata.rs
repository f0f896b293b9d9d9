use serde::{Deserialize, Serialize};

use crate::ai::RewardSignal;

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Greedy evaluation average; the pruning key.
    pub average_score: f64,
    pub best_score: u64,
    pub best_tile: u32,
    pub average_game_length: f64,
    pub current_loss: f64,
    pub training_steps: usize,
}

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub network_shape: Vec<usize>,
    pub sequence_length: usize,
    pub learning_rate: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    pub epsilon_decay_episodes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_capacity: Option<usize>,
    #[serde(default)]
    pub reward_signal: RewardSignal,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub algorithm: String,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: CheckpointHyperparameters,
}

/// Q-learning training state written to training_state.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QLearningTrainingState {
    pub epsilon: f64,
    pub step_count: usize,
    pub episode_count: usize,
    pub learning_rate: f64,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    pub epsilon_decay_episodes: usize,
    pub sequence_length: usize,
    #[serde(default)]
    pub reward_signal: RewardSignal,
}
