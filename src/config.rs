use std::path::Path;

use crate::ai::networks::{LayerShape, ACTION_SLOTS};
use crate::ai::QLearningConfig;
use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::game::DEFAULT_SIZE;
use crate::training::TrainerConfig;

/// Board geometry and tile spawning.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub board_size: usize,
    pub start_tiles: usize,
    /// Seeds tile spawns. Unset means a fresh OS seed.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            board_size: DEFAULT_SIZE,
            start_tiles: 2,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn cells(&self) -> usize {
        self.board_size * self.board_size
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameConfig,
    pub q_learning: QLearningConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.q_learning;

        if self.game.board_size < 2 {
            return Err(ConfigError::Validation(
                "game.board_size must be >= 2".into(),
            ));
        }
        if self.game.start_tiles > self.game.cells() {
            return Err(ConfigError::Validation(
                "game.start_tiles must fit on the board".into(),
            ));
        }

        if q.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "q_learning.learning_rate must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&q.gamma) {
            return Err(ConfigError::Validation(
                "q_learning.gamma must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&q.epsilon_start) {
            return Err(ConfigError::Validation(
                "q_learning.epsilon_start must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&q.epsilon_end) {
            return Err(ConfigError::Validation(
                "q_learning.epsilon_end must be in [0, 1]".into(),
            ));
        }
        if q.epsilon_end > q.epsilon_start {
            return Err(ConfigError::Validation(
                "q_learning.epsilon_end must be <= q_learning.epsilon_start".into(),
            ));
        }
        if q.sequence_length == 0 {
            return Err(ConfigError::Validation(
                "q_learning.sequence_length must be >= 1".into(),
            ));
        }
        if q.replay_capacity == Some(0) {
            return Err(ConfigError::Validation(
                "q_learning.replay_capacity must be > 0 when set".into(),
            ));
        }
        let shape = LayerShape::new(q.network_shape.clone()).map_err(|e| {
            ConfigError::Validation(format!("q_learning.network_shape: {e}"))
        })?;
        let expected = q.sequence_length * self.game.cells() + ACTION_SLOTS;
        if shape.input_width() != expected {
            return Err(ConfigError::Validation(format!(
                "q_learning.network_shape[0] must be sequence_length * board_size^2 + {} = {}, got {}",
                ACTION_SLOTS,
                expected,
                shape.input_width()
            )));
        }

        if self.training.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "training.num_episodes must be > 0".into(),
            ));
        }
        if self.training.log_interval == 0
            || self.training.eval_interval == 0
            || self.training.checkpoint_interval == 0
        {
            return Err(ConfigError::Validation(
                "training intervals must be > 0".into(),
            ));
        }
        if self.training.max_moves_per_episode == Some(0) {
            return Err(ConfigError::Validation(
                "training.max_moves_per_episode must be > 0 when set".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&AppConfig::default())
    }
}
