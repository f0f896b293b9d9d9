//! Value networks and their activation functions.

pub mod activation;
mod feedforward;

pub use feedforward::{DenseLayer, FeedforwardNetwork, LayerShape, NetworkRecord, ACTION_SLOTS};
