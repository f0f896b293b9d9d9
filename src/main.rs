use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use ml_2048::ai::{Agent, BoardHistory, BoardVector, EntropyAgent, EntropySearch, QLearningAgent};
use ml_2048::checkpoint::CheckpointManager;
use ml_2048::config::AppConfig;
use ml_2048::game::{Environment, Game};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Player {
    /// Greedy moves from a trained checkpoint
    QLearning,
    /// Entropy-minimising lookahead with annealed acceptance
    Entropy,
    /// One-ply entropy minimisation with linear cooling
    Annealing,
}

/// Watch an agent play one game of 2048.
#[derive(Parser)]
#[command(name = "ml_2048", about = "Autoplay 2048 with a trained agent or the entropy heuristic")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Who picks the moves
    #[arg(long, value_enum, default_value_t = Player::QLearning)]
    player: Player,

    /// Checkpoint directory to load instead of the latest one
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Delay between moves in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Seed for tile spawns
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let (mut agent, encoder): (Box<dyn Agent>, BoardVector) = match cli.player {
        Player::QLearning => {
            let agent = load_agent(&config, cli.checkpoint.as_deref())?;
            let encoder = *agent.encoder();
            (Box::new(agent), encoder)
        }
        Player::Entropy | Player::Annealing => {
            let search = match cli.player {
                Player::Annealing => EntropySearch::Annealing,
                _ => EntropySearch::default(),
            };
            let size = config.game.board_size;
            let agent = match cli.seed {
                Some(seed) => EntropyAgent::with_seed(size, search, seed),
                None => EntropyAgent::new(size, search),
            };
            (Box::new(agent), BoardVector::new(1, config.game.cells()))
        }
    };

    let mut game = Game::new(
        config.game.board_size,
        config.game.start_tiles,
        cli.seed.or(config.game.seed),
    );
    let mut history = BoardHistory::new(encoder.sequence_length());
    history.push(game.snapshot());
    println!("{}", game.board());
    log::info!("Playing as {}", agent.name());
    agent.begin_game();

    let interval = Duration::from_millis(cli.interval_ms);
    let mut moves = 0;
    while let Some(direction) =
        agent.select_action(&encoder.encode(&history), &game.legal_moves(), false)
    {
        thread::sleep(interval);
        let outcome = game.apply_move(direction)?;
        history.push(game.snapshot());
        moves += 1;
        println!("Move {moves}: {direction} | score {}", outcome.score);
        println!("{}", game.board());
    }

    println!(
        "Game over after {} moves. Score: {}, max tile: {}",
        moves,
        game.score(),
        game.board().max_tile()
    );
    Ok(())
}

/// Rebuild the Q-learning agent from `checkpoint`, or the latest one.
fn load_agent(config: &AppConfig, checkpoint: Option<&Path>) -> Result<QLearningAgent> {
    let manager = CheckpointManager::new(config.checkpoint.clone());
    let data = match checkpoint {
        Some(dir) => manager.load_checkpoint(dir),
        None => manager.load_latest(),
    }
    .context("loading checkpoint")?;

    // The stored network decides the encoder, not the config file.
    let hyper = &data.metadata.hyperparameters;
    let mut q_config = config.q_learning.clone();
    q_config.network_shape = hyper.network_shape.clone();
    q_config.sequence_length = hyper.sequence_length;
    let mut agent = QLearningAgent::new(q_config, config.game.cells())
        .context("checkpoint network does not fit the configured board")?;
    manager
        .restore(&data, &mut agent)
        .context("restoring checkpoint")?;
    log::info!(
        "Loaded checkpoint from episode {} ({})",
        data.metadata.episode,
        data.path.display()
    );
    Ok(agent)
}
