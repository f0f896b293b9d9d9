//! On-disk checkpoints: network parameters, training state and metadata in
//! one directory per save.

mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{
    CheckpointHyperparameters, CheckpointMetadata, CheckpointMetrics, QLearningTrainingState,
};
