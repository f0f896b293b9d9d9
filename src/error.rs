use std::path::PathBuf;

use crate::game::{Direction, MoveError};

/// Invalid network geometry. Fatal at construction or checkpoint load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("network needs at least 2 layers, got {0}")]
    TooFewLayers(usize),

    #[error("layer {layer} has zero width")]
    ZeroWidth { layer: usize },

    #[error("output layer must have width 1, got {0}")]
    OutputWidth(usize),

    #[error("expected {expected} parameter layers, got {actual}")]
    LayerCount { expected: usize, actual: usize },

    #[error("input width {width} cannot hold the {slots} action slots")]
    InputTooNarrow { width: usize, slots: usize },

    #[error(
        "layer {layer} parameters are {rows}x{cols} (bias {bias}), expected {expected_rows}x{expected_cols}"
    )]
    LayerMismatch {
        layer: usize,
        rows: usize,
        cols: usize,
        bias: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("board encoder produces {encoded} values but the network expects {expected}")]
    EncoderMismatch { encoded: usize, expected: usize },
}

/// Errors raised by the replay memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("cannot sample from an empty replay memory")]
    EmptyMemory,
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("stored network does not match its shape: {0}")]
    InvalidNetwork(#[from] ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("agent selected illegal move {direction} (legal: {legal:?})")]
    IllegalMove {
        direction: Direction,
        legal: Vec<Direction>,
    },

    #[error("simulator rejected move: {0}")]
    Move(#[from] MoveError),

    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("network shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::NoLatestSymlink(PathBuf::from("checkpoints"));
        assert_eq!(err.to_string(), "no 'latest' symlink found in checkpoints");
    }

    #[test]
    fn test_shape_error_display() {
        assert_eq!(
            ShapeError::TooFewLayers(1).to_string(),
            "network needs at least 2 layers, got 1"
        );
        assert_eq!(
            ShapeError::OutputWidth(4).to_string(),
            "output layer must have width 1, got 4"
        );
    }

    #[test]
    fn test_training_error_display() {
        let err = TrainingError::IllegalMove {
            direction: Direction::Up,
            legal: vec![Direction::Left, Direction::Down],
        };
        assert_eq!(
            err.to_string(),
            "agent selected illegal move up (legal: [Left, Down])"
        );
    }

    #[test]
    fn test_replay_error_converts() {
        let err: TrainingError = ReplayError::EmptyMemory.into();
        assert!(matches!(err, TrainingError::Replay(ReplayError::EmptyMemory)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("learning_rate must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: learning_rate must be > 0"
        );
    }
}
