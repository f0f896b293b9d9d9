use std::sync::atomic::{AtomicBool, Ordering};

use crate::ai::{
    Agent, BoardHistory, BoardVector, EntropyAgent, QLearningAgent, RandomAgent, Transition,
};
use crate::error::TrainingError;
use crate::game::Environment;
use crate::training::metrics::EpisodeResult;

/// Greedy evaluation summary: the agent against a uniform random baseline
/// and, when one was played, the entropy heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub games: usize,
    pub agent_average_score: f64,
    pub agent_best_tile: u32,
    pub random_average_score: f64,
    pub random_best_tile: u32,
    pub entropy_average_score: Option<f64>,
    pub entropy_best_tile: Option<u32>,
}

/// Play one training episode: every executed move is stored and followed by
/// one replayed update.
///
/// The episode ends when the board has no legal move, after `max_moves`
/// moves, or once `stop` is raised (checked before each move).
pub fn play_training_episode<E: Environment + ?Sized>(
    agent: &mut QLearningAgent,
    env: &mut E,
    max_moves: Option<usize>,
    stop: &AtomicBool,
) -> Result<EpisodeResult, TrainingError> {
    env.reset();
    let encoder = *agent.encoder();
    let mut history = BoardHistory::new(encoder.sequence_length());
    history.push(env.snapshot());

    let mut moves = 0;
    let mut loss_sum = 0.0;
    let mut terminated = false;

    loop {
        if stop.load(Ordering::Relaxed) || max_moves.is_some_and(|cap| moves >= cap) {
            break;
        }
        let legal = env.legal_moves();
        let phi = encoder.encode(&history);
        let Some(action) = agent.pick_action(&phi, &legal, true) else {
            // No legal move is a normal end of game.
            terminated = true;
            break;
        };
        if !legal.contains(&action) {
            return Err(TrainingError::IllegalMove {
                direction: action,
                legal,
            });
        }

        let outcome = env.step(action)?;
        history.push(env.snapshot());
        let next_legal = if outcome.is_terminal {
            Vec::new()
        } else {
            env.legal_moves()
        };
        let done = outcome.is_terminal || next_legal.is_empty();
        let reward = agent.reward_signal().reward(&outcome);

        let update = agent.learn(Transition {
            phi,
            action,
            reward,
            next_phi: encoder.encode(&history),
            done,
            next_legal,
        })?;
        loss_sum += update.loss;
        moves += 1;

        if done {
            terminated = true;
            break;
        }
    }

    agent.end_episode();
    log::debug!(
        "episode {} finished: score {} after {} moves",
        agent.episode_count(),
        env.score(),
        moves
    );

    Ok(EpisodeResult {
        score: env.score(),
        max_tile: max_cell(&env.snapshot()),
        moves,
        terminated,
        average_loss: if moves == 0 {
            0.0
        } else {
            loss_sum / moves as f64
        },
    })
}

/// Play one game without learning. `agent` picks greedily.
pub fn play_eval_game<E: Environment + ?Sized>(
    agent: &mut dyn Agent,
    env: &mut E,
    encoder: &BoardVector,
    max_moves: Option<usize>,
) -> Result<EpisodeResult, TrainingError> {
    env.reset();
    agent.begin_game();
    let mut history = BoardHistory::new(encoder.sequence_length());
    history.push(env.snapshot());
    let mut moves = 0;

    while !env.is_terminal() && !max_moves.is_some_and(|cap| moves >= cap) {
        let legal = env.legal_moves();
        let phi = encoder.encode(&history);
        let Some(action) = agent.select_action(&phi, &legal, false) else {
            break;
        };
        env.step(action)?;
        history.push(env.snapshot());
        moves += 1;
    }

    Ok(EpisodeResult {
        score: env.score(),
        max_tile: max_cell(&env.snapshot()),
        moves,
        terminated: env.is_terminal() || env.legal_moves().is_empty(),
        average_loss: 0.0,
    })
}

/// Evaluate the greedy agent and the baselines over `games` games each.
pub fn evaluate<E: Environment + ?Sized>(
    agent: &mut QLearningAgent,
    env: &mut E,
    games: usize,
    max_moves: Option<usize>,
    random: &mut RandomAgent,
    mut entropy: Option<&mut EntropyAgent>,
) -> Result<EvalReport, TrainingError> {
    let encoder = *agent.encoder();
    let mut report = EvalReport {
        games,
        agent_average_score: 0.0,
        agent_best_tile: 0,
        random_average_score: 0.0,
        random_best_tile: 0,
        entropy_average_score: None,
        entropy_best_tile: None,
    };
    if games == 0 {
        return Ok(report);
    }

    let mut agent_total = 0;
    let mut random_total = 0;
    let mut entropy_total = 0;
    let mut entropy_best = 0;
    for _ in 0..games {
        let ours = play_eval_game(&mut *agent, env, &encoder, max_moves)?;
        agent_total += ours.score;
        report.agent_best_tile = report.agent_best_tile.max(ours.max_tile);

        let theirs = play_eval_game(&mut *random, env, &encoder, max_moves)?;
        random_total += theirs.score;
        report.random_best_tile = report.random_best_tile.max(theirs.max_tile);

        if let Some(heuristic) = entropy.as_deref_mut() {
            let theirs = play_eval_game(heuristic, env, &encoder, max_moves)?;
            entropy_total += theirs.score;
            entropy_best = entropy_best.max(theirs.max_tile);
        }
    }
    report.agent_average_score = agent_total as f64 / games as f64;
    report.random_average_score = random_total as f64 / games as f64;
    if entropy.is_some() {
        report.entropy_average_score = Some(entropy_total as f64 / games as f64);
        report.entropy_best_tile = Some(entropy_best);
    }
    Ok(report)
}

/// Derive a deterministic seed for a given episode index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}

fn max_cell(snapshot: &[f64]) -> u32 {
    snapshot.iter().fold(0.0_f64, |acc, &v| acc.max(v)) as u32
}
