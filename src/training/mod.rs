//! Training infrastructure: the per-move Q-learning loop, replay memory,
//! metrics collection and the episode driver.

pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod session;
pub mod trainer;

pub use trainer::{train, Baselines, Trainer, TrainerConfig, TrainingSummary};
