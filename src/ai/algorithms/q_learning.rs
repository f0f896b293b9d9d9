use std::fs;
use std::path::Path;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::backprop::Backprop;
use crate::ai::agent::{Agent, Transition, UpdateMetrics};
use crate::ai::networks::{FeedforwardNetwork, LayerShape, NetworkRecord};
use crate::ai::state_encoding::{BoardHistory, BoardVector};
use crate::checkpoint::{
    CheckpointHyperparameters, CheckpointMetadata, CheckpointMetrics, QLearningTrainingState,
};
use crate::error::{CheckpointError, ReplayError, ShapeError};
use crate::game::{Direction, StepOutcome};
use crate::training::episode::episode_seed;
use crate::training::replay_buffer::ReplayMemory;
use crate::training::session::TrainingSession;

const NETWORK_FILE: &str = "network.json";

/// Which score the agent is rewarded with after each move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardSignal {
    /// Total score after the move.
    #[default]
    CumulativeScore,
    /// Points earned by the move alone.
    ScoreDelta,
}

impl RewardSignal {
    pub fn reward(self, outcome: &StepOutcome) -> f64 {
        match self {
            RewardSignal::CumulativeScore => outcome.score as f64,
            RewardSignal::ScoreDelta => outcome.score_delta as f64,
        }
    }
}

/// Q-learning hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    /// Layer widths; the first must equal `sequence_length * cells + 4`.
    pub network_shape: Vec<usize>,
    /// Board snapshots per encoding.
    pub sequence_length: usize,
    pub learning_rate: f64,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    pub epsilon_decay_episodes: usize,
    /// `None` keeps every transition.
    pub replay_capacity: Option<usize>,
    pub reward_signal: RewardSignal,
    /// Seeds network init, exploration and replay sampling.
    pub seed: Option<u64>,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        QLearningConfig {
            network_shape: vec![260, 500, 1],
            sequence_length: 16,
            learning_rate: 1e-4,
            gamma: 0.9,
            epsilon_start: 0.1,
            epsilon_end: 0.1,
            epsilon_decay_episodes: 0,
            replay_capacity: None,
            reward_signal: RewardSignal::CumulativeScore,
            seed: None,
        }
    }
}

/// Online Q-learning agent with experience replay.
///
/// Every executed move is appended to replay memory, then one uniformly
/// sampled transition drives a single backprop step towards
/// `reward + gamma * max_a Q(next, a)` (or `reward` when terminal).
pub struct QLearningAgent {
    session: TrainingSession,
    backprop: Backprop,
    encoder: BoardVector,
    config: QLearningConfig,
    epsilon: f64,
    step_count: usize,
    episode_count: usize,
    rng: StdRng,
}

impl QLearningAgent {
    /// Fresh agent with a randomly initialised network.
    pub fn new(config: QLearningConfig, cells_per_board: usize) -> Result<Self, ShapeError> {
        let shape = LayerShape::new(config.network_shape.clone())?;
        let network = match config.seed {
            Some(seed) => {
                FeedforwardNetwork::with_rng(shape, &mut StdRng::seed_from_u64(episode_seed(seed, 0)))
            }
            None => FeedforwardNetwork::new(shape),
        };
        Self::with_network(config, network, cells_per_board)
    }

    /// Agent around an existing network. `config.network_shape` is replaced
    /// by the network's own shape.
    pub fn with_network(
        mut config: QLearningConfig,
        network: FeedforwardNetwork,
        cells_per_board: usize,
    ) -> Result<Self, ShapeError> {
        let encoder = BoardVector::new(config.sequence_length, cells_per_board);
        let expected = network.shape().phi_width();
        if encoder.width() != expected {
            return Err(ShapeError::EncoderMismatch {
                encoded: encoder.width(),
                expected,
            });
        }
        config.network_shape = network.shape().widths().to_vec();

        let (memory_rng, rng) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(episode_seed(seed, 1)),
                StdRng::seed_from_u64(episode_seed(seed, 2)),
            ),
            None => (StdRng::from_os_rng(), StdRng::from_os_rng()),
        };
        let memory = ReplayMemory::with_rng(config.replay_capacity, memory_rng);

        Ok(QLearningAgent {
            session: TrainingSession::new(network, memory),
            backprop: Backprop::new(config.learning_rate),
            encoder,
            epsilon: config.epsilon_start,
            config,
            step_count: 0,
            episode_count: 0,
            rng,
        })
    }

    /// Epsilon-greedy when `training`, greedy otherwise.
    pub fn pick_action(
        &mut self,
        phi: &Array1<f64>,
        legal: &[Direction],
        training: bool,
    ) -> Option<Direction> {
        if legal.is_empty() {
            return None;
        }
        if training && self.rng.random::<f64>() < self.epsilon {
            return Some(legal[self.rng.random_range(0..legal.len())]);
        }
        self.select_move(phi, legal)
    }

    /// Highest-valued legal move; ties go to the earliest in
    /// [`Direction::PRIORITY`].
    pub fn select_move(&mut self, phi: &Array1<f64>, legal: &[Direction]) -> Option<Direction> {
        self.best_move(phi, legal).map(|(dir, _)| dir)
    }

    /// Encode `history` and pick the greedy move.
    pub fn select_move_from_history(
        &mut self,
        history: &BoardHistory,
        legal: &[Direction],
    ) -> Option<Direction> {
        let phi = self.encoder.encode(history);
        self.select_move(&phi, legal)
    }

    /// Greedy move and its estimated value.
    pub fn best_move(&mut self, phi: &Array1<f64>, legal: &[Direction]) -> Option<(Direction, f64)> {
        let mut best: Option<(Direction, f64)> = None;
        for dir in Direction::PRIORITY {
            if !legal.contains(&dir) {
                continue;
            }
            let value = self.session.network.score(phi, dir);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((dir, value)),
            }
        }
        best
    }

    /// Store `transition`, replay one uniformly sampled transition, and take
    /// one gradient step on it.
    pub fn learn(&mut self, transition: Transition) -> Result<UpdateMetrics, ReplayError> {
        self.session.memory.push(transition);
        let sample = self.session.memory.sample_uniform()?.clone();
        let target = self.target_for(&sample);

        self.backprop
            .step(&mut self.session.network, &sample.phi, sample.action, target);
        let prediction = self.session.network.output();
        self.step_count += 1;

        Ok(UpdateMetrics {
            loss: 0.5 * (target - prediction).powi(2),
            prediction,
            target,
        })
    }

    /// Bellman target for a replayed transition.
    pub fn target_for(&mut self, transition: &Transition) -> f64 {
        if transition.done {
            return transition.reward;
        }
        match self.best_move(&transition.next_phi, &transition.next_legal) {
            Some((_, next_value)) => transition.reward + self.config.gamma * next_value,
            None => transition.reward,
        }
    }

    /// Book-keeping after an episode ends: count it and decay epsilon.
    pub fn end_episode(&mut self) {
        self.episode_count += 1;
        self.decay_epsilon();
    }

    /// Decay epsilon linearly over configured episodes.
    fn decay_epsilon(&mut self) {
        if self.config.epsilon_decay_episodes == 0 {
            self.epsilon = self.config.epsilon_end;
            return;
        }
        let progress =
            (self.episode_count as f64 / self.config.epsilon_decay_episodes as f64).min(1.0);
        self.epsilon = self.config.epsilon_start
            + (self.config.epsilon_end - self.config.epsilon_start) * progress;
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Set epsilon directly (e.g. 0.0 for pure greedy inference).
    pub fn set_epsilon(&mut self, eps: f64) {
        self.epsilon = eps;
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    pub fn encoder(&self) -> &BoardVector {
        &self.encoder
    }

    pub fn reward_signal(&self) -> RewardSignal {
        self.config.reward_signal
    }

    pub fn network(&self) -> &FeedforwardNetwork {
        &self.session.network
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.session.memory
    }

    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    pub fn into_session(self) -> TrainingSession {
        self.session
    }

    /// Write the network parameters to `dir/network.json`.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), CheckpointError> {
        let json = serde_json::to_string(&self.session.network.to_record())?;
        fs::write(dir.join(NETWORK_FILE), json)?;
        Ok(())
    }

    /// Replace the network with the one stored in `dir/network.json`.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        let json = fs::read_to_string(dir.join(NETWORK_FILE))?;
        let record: NetworkRecord = serde_json::from_str(&json)?;
        let network = FeedforwardNetwork::from_record(record)?;
        let expected = network.shape().phi_width();
        if expected != self.encoder.width() {
            return Err(ShapeError::EncoderMismatch {
                encoded: self.encoder.width(),
                expected,
            }
            .into());
        }
        self.config.network_shape = network.shape().widths().to_vec();
        self.session.network = network;
        Ok(())
    }

    /// Export current training state for checkpointing.
    pub fn training_state(&self) -> QLearningTrainingState {
        QLearningTrainingState {
            epsilon: self.epsilon,
            step_count: self.step_count,
            episode_count: self.episode_count,
            learning_rate: self.config.learning_rate,
            gamma: self.config.gamma,
            epsilon_start: self.config.epsilon_start,
            epsilon_end: self.config.epsilon_end,
            epsilon_decay_episodes: self.config.epsilon_decay_episodes,
            sequence_length: self.config.sequence_length,
            reward_signal: self.config.reward_signal,
        }
    }

    /// Restore training state from a checkpoint. The sequence length is fixed
    /// by the encoder and is not restored.
    pub fn restore_training_state(&mut self, state: &QLearningTrainingState) {
        self.epsilon = state.epsilon;
        self.step_count = state.step_count;
        self.episode_count = state.episode_count;
        self.config.learning_rate = state.learning_rate;
        self.config.gamma = state.gamma;
        self.config.epsilon_start = state.epsilon_start;
        self.config.epsilon_end = state.epsilon_end;
        self.config.epsilon_decay_episodes = state.epsilon_decay_episodes;
        self.config.reward_signal = state.reward_signal;
        self.backprop = Backprop::new(state.learning_rate);
    }

    pub fn training_state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.training_state())
    }

    pub fn restore_training_state_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let state: QLearningTrainingState = serde_json::from_str(json)?;
        self.restore_training_state(&state);
        Ok(())
    }

    /// Build checkpoint metadata for the current state.
    pub fn build_checkpoint_metadata(
        &self,
        metrics: &CheckpointMetrics,
        episode: usize,
        timestamp: u64,
    ) -> CheckpointMetadata {
        CheckpointMetadata {
            episode,
            timestamp,
            algorithm: self.name().to_string(),
            metrics: metrics.clone(),
            hyperparameters: CheckpointHyperparameters {
                network_shape: self.config.network_shape.clone(),
                sequence_length: self.config.sequence_length,
                learning_rate: self.config.learning_rate,
                gamma: self.config.gamma,
                epsilon: self.epsilon,
                epsilon_start: self.config.epsilon_start,
                epsilon_end: self.config.epsilon_end,
                epsilon_decay_episodes: self.config.epsilon_decay_episodes,
                replay_capacity: self.config.replay_capacity,
                reward_signal: self.config.reward_signal,
            },
        }
    }
}

impl Agent for QLearningAgent {
    fn select_action(
        &mut self,
        phi: &Array1<f64>,
        legal: &[Direction],
        training: bool,
    ) -> Option<Direction> {
        self.pick_action(phi, legal, training)
    }

    fn name(&self) -> &str {
        "Q-learning"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::networks::DenseLayer;
    use crate::ai::RandomAgent;
    use crate::game::{Environment, Game};
    use ndarray::{array, Array2};

    fn toy_config() -> QLearningConfig {
        QLearningConfig {
            network_shape: vec![8, 4, 1],
            sequence_length: 1,
            learning_rate: 0.01,
            gamma: 0.5,
            seed: Some(42),
            ..Default::default()
        }
    }

    fn toy_agent() -> QLearningAgent {
        QLearningAgent::new(toy_config(), 4).unwrap()
    }

    /// Single-layer network whose only non-zero weight sits on the `favored`
    /// action slot, so that move always scores strictly highest.
    fn favoring(favored: Direction, phi_width: usize) -> FeedforwardNetwork {
        let mut weights = Array2::zeros((1, phi_width + 4));
        weights[[0, phi_width + favored.index()]] = 5.0;
        FeedforwardNetwork::from_layers(vec![DenseLayer {
            weights,
            bias: Array1::zeros(1),
        }])
        .unwrap()
    }

    fn transition(reward: f64, done: bool) -> Transition {
        Transition {
            phi: array![2.0, 0.0, 0.0, 2.0],
            action: Direction::Left,
            reward,
            next_phi: array![4.0, 0.0, 2.0, 0.0],
            done,
            next_legal: if done {
                vec![]
            } else {
                vec![Direction::Up, Direction::Down, Direction::Right]
            },
        }
    }

    #[test]
    fn test_encoder_mismatch_is_rejected() {
        let err = QLearningAgent::new(toy_config(), 16).err().unwrap();
        assert_eq!(
            err,
            ShapeError::EncoderMismatch {
                encoded: 16,
                expected: 4
            }
        );
    }

    #[test]
    fn test_invalid_shape_is_rejected() {
        let config = QLearningConfig {
            network_shape: vec![8, 4, 2],
            ..toy_config()
        };
        assert_eq!(
            QLearningAgent::new(config, 4).err(),
            Some(ShapeError::OutputWidth(2))
        );
    }

    #[test]
    fn test_select_move_from_history_uses_newest_snapshots() {
        let config = QLearningConfig {
            sequence_length: 2,
            ..Default::default()
        };
        let mut agent =
            QLearningAgent::with_network(config, favoring(Direction::Right, 8), 4).unwrap();
        let mut history = BoardHistory::new(2);
        history.push(vec![2.0, 0.0, 0.0, 0.0]);
        history.push(vec![2.0, 0.0, 0.0, 4.0]);

        let legal = [Direction::Up, Direction::Right];
        assert_eq!(
            agent.select_move_from_history(&history, &legal),
            Some(Direction::Right)
        );
        assert_eq!(
            agent.select_move_from_history(&history, &[Direction::Up]),
            Some(Direction::Up)
        );
        assert_eq!(agent.select_move_from_history(&history, &[]), None);
    }

    #[test]
    fn test_greedy_prefers_highest_score() {
        let network = favoring(Direction::Down, 16);
        let config = QLearningConfig {
            sequence_length: 1,
            ..Default::default()
        };
        let mut agent = QLearningAgent::with_network(config, network, 16).unwrap();
        let mut random = RandomAgent::with_seed(9);

        for seed in 0..5 {
            let mut game = Game::new(4, 2, Some(seed));
            while !game.is_terminal() {
                let legal = game.legal_moves();
                let phi = agent.encoder().preprocess(&[game.snapshot()]);
                let chosen = agent.select_move(&phi, &legal).unwrap();
                if legal.contains(&Direction::Down) {
                    assert_eq!(chosen, Direction::Down);
                } else {
                    assert!(legal.contains(&chosen));
                }
                let step = random.select_action(&phi, &legal, false).unwrap();
                game.step(step).unwrap();
            }
        }
    }

    #[test]
    fn test_ties_break_in_priority_order() {
        let network = FeedforwardNetwork::from_layers(vec![DenseLayer {
            weights: Array2::zeros((1, 8)),
            bias: Array1::zeros(1),
        }])
        .unwrap();
        let mut agent = QLearningAgent::with_network(toy_config(), network, 4).unwrap();
        let phi = array![2.0, 2.0, 0.0, 0.0];

        assert_eq!(
            agent.select_move(&phi, &[Direction::Right, Direction::Down]),
            Some(Direction::Down)
        );
        assert_eq!(
            agent.select_move(&phi, &[Direction::Right, Direction::Left, Direction::Up]),
            Some(Direction::Up)
        );
        assert_eq!(agent.select_move(&phi, &[]), None);
    }

    #[test]
    fn test_full_exploration_stays_legal_and_varies() {
        let mut agent = toy_agent();
        agent.set_epsilon(1.0);
        let phi = array![2.0, 4.0, 0.0, 0.0];
        let legal = [Direction::Left, Direction::Down, Direction::Right];
        let mut seen = Vec::new();

        for _ in 0..100 {
            let dir = agent.pick_action(&phi, &legal, true).unwrap();
            assert!(legal.contains(&dir));
            if !seen.contains(&dir) {
                seen.push(dir);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_training_flag_off_is_greedy() {
        let network = favoring(Direction::Left, 4);
        let mut agent = QLearningAgent::with_network(toy_config(), network, 4).unwrap();
        agent.set_epsilon(1.0);
        let phi = array![0.0, 0.0, 2.0, 2.0];
        for _ in 0..20 {
            assert_eq!(
                agent.select_action(&phi, &Direction::ALL, false),
                Some(Direction::Left)
            );
        }
    }

    #[test]
    fn test_terminal_target_is_reward() {
        let mut agent = toy_agent();
        let metrics = agent.learn(transition(36.0, true)).unwrap();
        assert_eq!(metrics.target, 36.0);
        assert_eq!(agent.memory().len(), 1);
        assert_eq!(agent.step_count(), 1);
    }

    #[test]
    fn test_non_terminal_target_bootstraps_from_best_next_move() {
        let mut agent = toy_agent();
        let t = transition(8.0, false);

        let mut scorer = agent.network().clone();
        let best_next = t
            .next_legal
            .iter()
            .map(|&dir| scorer.score(&t.next_phi, dir))
            .fold(f64::NEG_INFINITY, f64::max);

        let metrics = agent.learn(t).unwrap();
        assert!((metrics.target - (8.0 + 0.5 * best_next)).abs() < 1e-9);
        assert!(metrics.loss >= 0.0);
        assert!((metrics.loss - 0.5 * (metrics.target - metrics.prediction).powi(2)).abs() < 1e-9);
    }

    #[test]
    fn test_learn_updates_network() {
        let mut agent = toy_agent();
        let before = agent.network().layer(1).clone();
        agent.learn(transition(1000.0, true)).unwrap();
        assert_ne!(agent.network().layer(1), &before);
    }

    #[test]
    fn test_memory_grows_once_per_learn() {
        let mut agent = toy_agent();
        for i in 0..10 {
            agent.learn(transition(i as f64, i % 3 == 0)).unwrap();
        }
        assert_eq!(agent.memory().len(), 10);
        assert_eq!(agent.step_count(), 10);
    }

    #[test]
    fn test_epsilon_decay() {
        let mut agent = QLearningAgent::new(
            QLearningConfig {
                epsilon_start: 1.0,
                epsilon_end: 0.1,
                epsilon_decay_episodes: 100,
                ..toy_config()
            },
            4,
        )
        .unwrap();

        for _ in 0..50 {
            agent.end_episode();
        }

        let expected = 1.0 + (0.1 - 1.0) * 0.5;
        assert!(
            (agent.epsilon() - expected).abs() < 1e-9,
            "epsilon {} not close to {}",
            agent.epsilon(),
            expected
        );
        assert_eq!(agent.episode_count(), 50);
    }

    #[test]
    fn test_epsilon_decay_zero_episodes() {
        let mut agent = QLearningAgent::new(
            QLearningConfig {
                epsilon_start: 1.0,
                epsilon_end: 0.05,
                epsilon_decay_episodes: 0,
                ..toy_config()
            },
            4,
        )
        .unwrap();

        agent.end_episode();
        assert!(
            (agent.epsilon() - 0.05).abs() < 1e-12,
            "epsilon should jump to epsilon_end, got {}",
            agent.epsilon()
        );
    }

    #[test]
    fn test_default_epsilon_is_constant() {
        let mut agent = QLearningAgent::new(
            QLearningConfig {
                network_shape: vec![260, 500, 1],
                ..Default::default()
            },
            16,
        )
        .unwrap();
        for _ in 0..5 {
            assert!((agent.epsilon() - 0.1).abs() < 1e-12);
            agent.end_episode();
        }
    }

    #[test]
    fn test_seeded_agents_match() {
        let mut a = toy_agent();
        let mut b = toy_agent();
        let phi = array![2.0, 0.0, 4.0, 0.0];
        assert_eq!(a.network().layer(1), b.network().layer(1));
        for _ in 0..5 {
            let ma = a.learn(transition(4.0, false)).unwrap();
            let mb = b.learn(transition(4.0, false)).unwrap();
            assert_eq!(ma, mb);
        }
        assert_eq!(
            a.best_move(&phi, &Direction::ALL),
            b.best_move(&phi, &Direction::ALL)
        );
    }

    #[test]
    fn test_training_state_roundtrip() {
        let mut agent = QLearningAgent::new(
            QLearningConfig {
                learning_rate: 0.001,
                gamma: 0.95,
                epsilon_start: 0.8,
                epsilon_end: 0.05,
                reward_signal: RewardSignal::ScoreDelta,
                ..toy_config()
            },
            4,
        )
        .unwrap();
        agent.set_epsilon(0.42);

        let json = agent.training_state_json().unwrap();
        let mut restored = toy_agent();
        restored.restore_training_state_json(&json).unwrap();
        assert!((restored.epsilon() - 0.42).abs() < 1e-12);
        assert!((restored.config().gamma - 0.95).abs() < 1e-12);
        assert_eq!(restored.reward_signal(), RewardSignal::ScoreDelta);
    }

    #[test]
    fn test_weights_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = toy_agent();
        agent.learn(transition(16.0, true)).unwrap();
        agent.save_to_dir(dir.path()).unwrap();

        let mut restored = QLearningAgent::new(
            QLearningConfig {
                seed: Some(7),
                ..toy_config()
            },
            4,
        )
        .unwrap();
        restored.load_from_dir(dir.path()).unwrap();
        assert_eq!(restored.network().layer(1), agent.network().layer(1));
        assert_eq!(restored.network().layer(2), agent.network().layer(2));
    }

    #[test]
    fn test_load_rejects_incompatible_network() {
        let dir = tempfile::tempdir().unwrap();
        let wide = QLearningAgent::new(
            QLearningConfig {
                network_shape: vec![12, 4, 1],
                sequence_length: 2,
                ..toy_config()
            },
            4,
        )
        .unwrap();
        wide.save_to_dir(dir.path()).unwrap();

        let mut narrow = toy_agent();
        let err = narrow.load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::InvalidNetwork(ShapeError::EncoderMismatch { .. })
        ));
    }

    #[test]
    fn test_reward_signal() {
        let outcome = StepOutcome {
            score_delta: 8,
            score: 120,
            is_terminal: false,
        };
        assert_eq!(RewardSignal::CumulativeScore.reward(&outcome), 120.0);
        assert_eq!(RewardSignal::ScoreDelta.reward(&outcome), 8.0);
        assert_eq!(RewardSignal::default(), RewardSignal::CumulativeScore);
    }
}
