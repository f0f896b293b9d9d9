use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::ai::{EntropyAgent, EntropySearch, QLearningAgent, QLearningConfig, RandomAgent};
use crate::checkpoint::{CheckpointManager, CheckpointManagerConfig, CheckpointMetrics};
use crate::error::TrainingError;
use crate::game::Environment;
use crate::training::episode::{episode_seed, evaluate, play_training_episode, EvalReport};
use crate::training::metrics::{TimingMetrics, TrainingMetrics};

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub log_interval: usize,
    pub eval_interval: usize,
    pub eval_games: usize,
    pub checkpoint_interval: usize,
    /// Cut an episode short after this many moves.
    pub max_moves_per_episode: Option<usize>,
    /// Also evaluate the entropy heuristic as a stronger baseline.
    pub entropy_baseline: bool,
    /// Lookahead depth of the entropy baseline.
    pub entropy_depth: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 1000,
            log_interval: 100,
            eval_interval: 500,
            eval_games: 20,
            checkpoint_interval: 1000,
            max_moves_per_episode: None,
            entropy_baseline: true,
            entropy_depth: 2,
        }
    }
}

/// What a finished (or stopped) run achieved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub average_score: f64,
    pub best_score: u64,
    pub best_tile: u32,
    /// True when the stop flag ended the run early.
    pub stopped: bool,
}

/// Players the greedy agent is measured against during evaluation.
pub struct Baselines {
    pub random: RandomAgent,
    pub entropy: Option<EntropyAgent>,
}

/// Drives Q-learning episodes, with periodic logging, evaluation and
/// checkpoints.
pub struct Trainer {
    config: TrainerConfig,
    checkpoint_manager: Option<CheckpointManager>,
}

impl Trainer {
    /// Trainer that never writes checkpoints.
    pub fn new(config: TrainerConfig) -> Self {
        Trainer {
            config,
            checkpoint_manager: None,
        }
    }

    pub fn with_checkpoints(config: TrainerConfig, checkpoint: CheckpointManagerConfig) -> Self {
        Trainer {
            config,
            checkpoint_manager: Some(CheckpointManager::new(checkpoint)),
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the full training loop.
    pub fn train<E: Environment + ?Sized>(
        &self,
        agent: &mut QLearningAgent,
        env: &mut E,
    ) -> Result<TrainingSummary, TrainingError> {
        self.train_until(agent, env, &AtomicBool::new(false))
    }

    /// Run the training loop until all episodes finish or `stop` is raised.
    /// A stop request takes effect between moves.
    pub fn train_until<E: Environment + ?Sized>(
        &self,
        agent: &mut QLearningAgent,
        env: &mut E,
        stop: &AtomicBool,
    ) -> Result<TrainingSummary, TrainingError> {
        let mut metrics = TrainingMetrics::new();
        let mut timing = TimingMetrics::new();
        let random = match agent.config().seed {
            Some(seed) => RandomAgent::with_seed(episode_seed(seed, 3)),
            None => RandomAgent::new(),
        };
        let mut baselines = Baselines {
            random,
            entropy: self.entropy_baseline(agent),
        };

        let start_episode = agent.episode_count() + 1;
        let end_episode = agent.episode_count() + self.config.num_episodes;
        let max_moves = self.config.max_moves_per_episode;
        let mut stopped = false;

        log::info!(
            "Starting Q-learning for {} episodes (episodes {}..{}), network {:?}",
            self.config.num_episodes,
            start_episode,
            end_episode,
            agent.network().shape().widths()
        );

        for episode in start_episode..=end_episode {
            if stop.load(Ordering::Relaxed) {
                stopped = true;
                break;
            }

            let started = Instant::now();
            let result = play_training_episode(agent, env, max_moves, stop)?;
            timing.record_episode_time(started.elapsed());
            if result.moves > 0 {
                metrics.record_update(result.average_loss);
            }
            metrics.record_episode(result);

            if !result.terminated && stop.load(Ordering::Relaxed) {
                stopped = true;
                break;
            }

            if due(episode, self.config.log_interval) {
                let window = self.config.log_interval;
                log::info!(
                    "Episode {}/{} | eps: {:.3} | loss: {:.4} | avg_score({}): {:.1} | best: {} | max_tile: {} | avg_len: {:.1} | {:.1} ep/s",
                    episode,
                    end_episode,
                    agent.epsilon(),
                    metrics.average_loss(window),
                    window,
                    metrics.average_score(window),
                    metrics.best_score(),
                    metrics.recent_max_tile(window),
                    metrics.average_game_length(window),
                    timing.episodes_per_sec(),
                );
                timing.reset_window();
            }

            if due(episode, self.config.eval_interval) {
                let started = Instant::now();
                let report = self.evaluate(agent, env, &mut baselines)?;
                log_eval(&report);
                timing.record_overhead(started.elapsed());
            }

            if due(episode, self.config.checkpoint_interval) {
                let started = Instant::now();
                self.checkpoint(agent, env, &mut baselines, &metrics, episode)?;
                timing.record_overhead(started.elapsed());
            }
        }

        let window = self.config.log_interval;
        if stopped {
            log::warn!(
                "Training stopped after {} episodes",
                agent.episode_count() + 1 - start_episode
            );
        } else {
            log::info!(
                "Training complete. Total episodes: {}",
                metrics.total_episodes()
            );
        }

        Ok(TrainingSummary {
            episodes: metrics.total_episodes(),
            average_score: metrics.average_score(window),
            best_score: metrics.best_score(),
            best_tile: metrics.best_tile(),
            stopped,
        })
    }

    /// Greedy evaluation against the baselines.
    pub fn evaluate<E: Environment + ?Sized>(
        &self,
        agent: &mut QLearningAgent,
        env: &mut E,
        baselines: &mut Baselines,
    ) -> Result<EvalReport, TrainingError> {
        evaluate(
            agent,
            env,
            self.config.eval_games,
            self.config.max_moves_per_episode,
            &mut baselines.random,
            baselines.entropy.as_mut(),
        )
    }

    fn entropy_baseline(&self, agent: &QLearningAgent) -> Option<EntropyAgent> {
        if !self.config.entropy_baseline {
            return None;
        }
        let size = board_side(agent.encoder().cells_per_board());
        let search = EntropySearch::Lookahead {
            depth: self.config.entropy_depth,
        };
        Some(match agent.config().seed {
            Some(seed) => EntropyAgent::with_seed(size, search, episode_seed(seed, 4)),
            None => EntropyAgent::new(size, search),
        })
    }

    /// Evaluate and save a checkpoint. A failed save is logged, not fatal.
    fn checkpoint<E: Environment + ?Sized>(
        &self,
        agent: &mut QLearningAgent,
        env: &mut E,
        baselines: &mut Baselines,
        metrics: &TrainingMetrics,
        episode: usize,
    ) -> Result<(), TrainingError> {
        let Some(manager) = &self.checkpoint_manager else {
            return Ok(());
        };
        let report = self.evaluate(agent, env, baselines)?;
        let window = self.config.log_interval;
        let ckpt_metrics = CheckpointMetrics {
            average_score: report.agent_average_score,
            best_score: metrics.best_score(),
            best_tile: metrics.best_tile().max(report.agent_best_tile),
            average_game_length: metrics.average_game_length(window),
            current_loss: metrics.average_loss(window),
            training_steps: agent.step_count(),
        };
        match manager.save_checkpoint(agent, &ckpt_metrics, episode) {
            Ok(path) => log::info!("  >> Checkpoint saved: {}", path.display()),
            Err(e) => log::warn!("  >> Checkpoint failed: {}", e),
        }
        Ok(())
    }
}

fn due(episode: usize, interval: usize) -> bool {
    interval > 0 && episode % interval == 0
}

fn board_side(cells: usize) -> usize {
    (cells as f64).sqrt().round() as usize
}

fn log_eval(report: &EvalReport) {
    log::info!(
        "  >> Eval ({} games): greedy avg {:.1} (max tile {}) vs random avg {:.1} (max tile {})",
        report.games,
        report.agent_average_score,
        report.agent_best_tile,
        report.random_average_score,
        report.random_best_tile,
    );
    if let (Some(average), Some(best)) = (report.entropy_average_score, report.entropy_best_tile) {
        log::info!("  >> Eval: entropy heuristic avg {:.1} (max tile {})", average, best);
    }
}

/// Train a fresh agent on `env` for `episodes` episodes and return it.
///
/// The network and replay memory persist across episodes; the environment is
/// reset at the start of each one.
pub fn train<E: Environment + ?Sized>(
    env: &mut E,
    episodes: usize,
    config: &QLearningConfig,
) -> Result<QLearningAgent, TrainingError> {
    let mut agent = QLearningAgent::new(config.clone(), env.snapshot().len())?;
    let trainer = Trainer::new(TrainerConfig {
        num_episodes: episodes,
        log_interval: episodes.max(1),
        eval_interval: usize::MAX,
        checkpoint_interval: usize::MAX,
        ..Default::default()
    });
    trainer.train(&mut agent, env)?;
    Ok(agent)
}
