use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use ml_2048::ai::QLearningAgent;
use ml_2048::checkpoint::CheckpointManager;
use ml_2048::config::AppConfig;
use ml_2048::game::Game;
use ml_2048::training::Trainer;

/// Train a 2048 agent with online Q-learning.
#[derive(Parser)]
#[command(name = "train", about = "Train a 2048 Q-learning agent")]
struct Cli {
    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Use a constant exploration rate
    #[arg(long)]
    epsilon: Option<f64>,

    /// Seed the agent and the tile spawns
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds, finishing the current move
    #[arg(long)]
    time_limit_secs: Option<u64>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml().context("serializing default config")?);
        return Ok(());
    }

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.q_learning.learning_rate = lr;
    }
    if let Some(epsilon) = cli.epsilon {
        app_config.q_learning.epsilon_start = epsilon;
        app_config.q_learning.epsilon_end = epsilon;
    }
    if let Some(seed) = cli.seed {
        app_config.q_learning.seed = Some(seed);
        app_config.game.seed = Some(seed);
    }
    app_config.validate().context("validating configuration")?;

    let mut agent = QLearningAgent::new(app_config.q_learning.clone(), app_config.game.cells())
        .context("building agent")?;
    if cli.resume {
        resume_agent(&mut agent, &app_config)?;
    }

    let mut env = Game::new(
        app_config.game.board_size,
        app_config.game.start_tiles,
        app_config.game.seed,
    );

    let stop = Arc::new(AtomicBool::new(false));
    if let Some(secs) = cli.time_limit_secs {
        let flag = Arc::clone(&stop);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            flag.store(true, Ordering::Relaxed);
        });
    }

    let trainer = Trainer::with_checkpoints(
        app_config.training.clone(),
        app_config.checkpoint.clone(),
    );
    let summary = trainer
        .train_until(&mut agent, &mut env, &stop)
        .context("training")?;

    log::info!(
        "Trained {} episodes | avg score {:.1} | best score {} | best tile {}",
        summary.episodes,
        summary.average_score,
        summary.best_score,
        summary.best_tile
    );
    Ok(())
}

/// Resume an agent from the latest checkpoint, or start fresh if none exists.
fn resume_agent(agent: &mut QLearningAgent, config: &AppConfig) -> Result<()> {
    let manager = CheckpointManager::new(config.checkpoint.clone());
    match manager.load_latest() {
        Ok(data) => {
            manager
                .restore(&data, agent)
                .with_context(|| format!("restoring checkpoint {}", data.path.display()))?;
            log::info!("Resumed from episode {}", data.metadata.episode);
        }
        Err(e) => {
            log::warn!("No checkpoint found ({}), starting fresh", e);
        }
    }
    Ok(())
}
