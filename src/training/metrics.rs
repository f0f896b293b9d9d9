use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Result of a single episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    pub score: u64,
    pub max_tile: u32,
    pub moves: usize,
    /// Whether the game reached a position with no legal moves, as opposed
    /// to being cut off by the move cap or a stop request.
    pub terminated: bool,
    /// Mean update loss over the episode; 0 when nothing was learned.
    pub average_loss: f64,
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    update_losses: VecDeque<f64>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
    best_score: u64,
    best_tile: u32,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            update_losses: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
            best_score: 0,
            best_tile: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.best_score = self.best_score.max(result.score);
        self.best_tile = self.best_tile.max(result.max_tile);
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    pub fn record_update(&mut self, loss: f64) {
        self.update_losses.push_back(loss);
        if self.update_losses.len() > self.capacity {
            self.update_losses.pop_front();
        }
    }

    fn recent(&self, last_n: usize) -> impl Iterator<Item = &EpisodeResult> {
        self.episode_results.iter().rev().take(last_n)
    }

    /// Average final score over the last N episodes.
    pub fn average_score(&self, last_n: usize) -> f64 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: u64 = self.recent(n).map(|r| r.score).sum();
        total as f64 / n as f64
    }

    /// Average game length over the last N episodes.
    pub fn average_game_length(&self, last_n: usize) -> f64 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.recent(n).map(|r| r.moves).sum();
        total as f64 / n as f64
    }

    /// Average loss over the last N updates.
    pub fn average_loss(&self, last_n: usize) -> f64 {
        let n = self.update_losses.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = self.update_losses.iter().rev().take(n).sum();
        sum / n as f64
    }

    /// Largest tile reached in the last N episodes.
    pub fn recent_max_tile(&self, last_n: usize) -> u32 {
        self.recent(last_n).map(|r| r.max_tile).max().unwrap_or(0)
    }

    /// Best final score over the whole run.
    pub fn best_score(&self) -> u64 {
        self.best_score
    }

    /// Largest tile over the whole run.
    pub fn best_tile(&self) -> u32 {
        self.best_tile
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Throughput tracker for the training loop.
pub struct TimingMetrics {
    episode_micros: VecDeque<u64>,
    capacity: usize,
    window_start: Instant,
    window_count: usize,
    window_overhead_micros: u128, // eval/checkpoint time excluded from throughput
}

impl TimingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TimingMetrics {
            episode_micros: VecDeque::with_capacity(capacity),
            capacity,
            window_start: Instant::now(),
            window_count: 0,
            window_overhead_micros: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode_time(&mut self, d: Duration) {
        self.episode_micros.push_back(d.as_micros() as u64);
        if self.episode_micros.len() > self.capacity {
            self.episode_micros.pop_front();
        }
        self.window_count += 1;
    }

    /// Record time spent in eval or checkpoint saving so it is excluded from
    /// the throughput window.
    pub fn record_overhead(&mut self, d: Duration) {
        self.window_overhead_micros += d.as_micros();
    }

    /// Mean of the last `last_n` episode times in milliseconds.
    pub fn avg_episode_ms(&self, last_n: usize) -> f64 {
        let n = self.episode_micros.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let mean = self
            .episode_micros
            .iter()
            .rev()
            .take(n)
            .map(|&v| v as f64)
            .sum::<f64>()
            / n as f64;
        mean / 1000.0
    }

    /// Episodes per second since the last `reset_window` call.
    pub fn episodes_per_sec(&self) -> f64 {
        let total_micros = self.window_start.elapsed().as_micros();
        let net_micros = total_micros.saturating_sub(self.window_overhead_micros);
        if net_micros == 0 {
            return 0.0;
        }
        self.window_count as f64 / (net_micros as f64 / 1_000_000.0)
    }

    /// Reset the throughput window (call after each log interval).
    pub fn reset_window(&mut self) {
        self.window_start = Instant::now();
        self.window_count = 0;
        self.window_overhead_micros = 0;
    }
}

impl Default for TimingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: u64, max_tile: u32, moves: usize) -> EpisodeResult {
        EpisodeResult {
            score,
            max_tile,
            moves,
            terminated: true,
            average_loss: 0.0,
        }
    }

    #[test]
    fn test_average_score() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(100, 16, 40));
        m.record_episode(result(300, 32, 60));
        assert!((m.average_score(10) - 200.0).abs() < 1e-9);
        assert!((m.average_score(1) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_values_survive_window() {
        let mut m = TrainingMetrics::with_capacity(2);
        m.record_episode(result(5000, 512, 300));
        m.record_episode(result(100, 16, 40));
        m.record_episode(result(120, 16, 45));

        assert_eq!(m.best_score(), 5000);
        assert_eq!(m.best_tile(), 512);
        assert_eq!(m.recent_max_tile(10), 16);
        assert_eq!(m.total_episodes(), 3);
    }

    #[test]
    fn test_average_loss() {
        let mut m = TrainingMetrics::new();
        m.record_update(1.0);
        m.record_update(3.0);
        assert!((m.average_loss(10) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_game_length() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(0, 4, 20));
        m.record_episode(result(0, 4, 30));
        assert!((m.average_game_length(10) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let m = TrainingMetrics::new();
        assert_eq!(m.average_score(10), 0.0);
        assert_eq!(m.average_loss(10), 0.0);
        assert_eq!(m.recent_max_tile(10), 0);
    }

    #[test]
    fn test_timing_avg_episode_ms_last_n() {
        let mut t = TimingMetrics::new();
        t.record_episode_time(Duration::from_micros(1000));
        t.record_episode_time(Duration::from_micros(9000));
        t.record_episode_time(Duration::from_micros(5000));
        assert!((t.avg_episode_ms(1) - 5.0).abs() < 1e-6);
        assert!((t.avg_episode_ms(100) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_overhead_excluded_from_eps_per_sec() {
        let mut t = TimingMetrics::new();
        for _ in 0..10 {
            t.record_episode_time(Duration::from_micros(1000));
        }
        t.record_overhead(Duration::from_secs(9999));
        assert_eq!(t.episodes_per_sec(), 0.0);

        t.reset_window();
        t.record_episode_time(Duration::from_micros(1000));
        std::thread::sleep(Duration::from_millis(5));
        assert!(t.episodes_per_sec() > 0.0);
    }
}
