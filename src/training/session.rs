use crate::ai::networks::FeedforwardNetwork;
use crate::training::replay_buffer::ReplayMemory;

/// The learning state that persists across episodes of one training run:
/// the value network and the replay memory feeding it.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    pub network: FeedforwardNetwork,
    pub memory: ReplayMemory,
}

impl TrainingSession {
    pub fn new(network: FeedforwardNetwork, memory: ReplayMemory) -> Self {
        TrainingSession { network, memory }
    }

    pub fn into_parts(self) -> (FeedforwardNetwork, ReplayMemory) {
        (self.network, self.memory)
    }
}
