mod backprop;
mod q_learning;

pub use backprop::Backprop;
pub use q_learning::{QLearningAgent, QLearningConfig, RewardSignal};
