mod agent;
pub mod algorithms;
mod entropy;
pub mod networks;
mod random;
pub mod state_encoding;

pub use agent::{Agent, Transition, UpdateMetrics};
pub use algorithms::{Backprop, QLearningAgent, QLearningConfig, RewardSignal};
pub use entropy::{entropy, EntropyAgent, EntropySearch, EntropyTerms};
pub use networks::{FeedforwardNetwork, LayerShape};
pub use random::RandomAgent;
pub use state_encoding::{BoardHistory, BoardVector};
