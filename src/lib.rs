//! # ML 2048
//!
//! The 2048 sliding-tile game played by an online Q-learning agent.
//! A small fully connected value network scores (board history, move) pairs
//! and is trained one replayed transition per executed move.
//!
//! ## Modules
//!
//! - [`game`]: board, moves, merging and the `Environment` seam
//! - [`ai`]: agents, board encoding, the value network and its trainer
//! - [`training`]: replay memory, episode loop, trainer, metrics
//! - [`checkpoint`]: network persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;

pub use training::train;
