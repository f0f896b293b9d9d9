use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::agent::Agent;
use crate::game::{Board, Direction};

/// Temperature at the start of every game.
pub const START_TEMPERATURE: f64 = 100.0;
/// Plies searched below the immediate children by default.
pub const DEFAULT_DEPTH: usize = 5;
/// Per-move geometric cooling of the lookahead player.
const LOOKAHEAD_COOLING: f64 = 0.95;

/// How the heuristic player turns board entropies into a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropySearch {
    /// Search `depth` plies below the immediate children for the lowest
    /// entropy reachable, then accept the move leading there by the
    /// Metropolis rule. Temperature cools by 5% per move. A rejected move is
    /// replaced by the first legal move in priority order.
    Lookahead { depth: usize },
    /// Pick the child with the lowest entropy and accept it by the Metropolis
    /// rule, cooling linearly by 1 per attempt until it is accepted.
    Annealing,
}

impl Default for EntropySearch {
    fn default() -> Self {
        EntropySearch::Lookahead {
            depth: DEFAULT_DEPTH,
        }
    }
}

/// The quantities an entropy score is built from.
///
/// Smoothness counts every ordered pair of occupied neighbours, so each
/// adjacent pair adds twice its squared difference. Monotonicity only
/// counts a neighbour below or to the right that is larger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyTerms {
    pub smoothness: f64,
    pub monotonicity: f64,
    pub count: f64,
    pub total: f64,
    pub max_tile: u32,
    /// Whether the largest tile sits in the top-left cell.
    pub max_in_corner: bool,
}

impl EntropyTerms {
    pub fn of(board: &Board) -> Self {
        let size = board.size();
        let mut terms = EntropyTerms {
            smoothness: 0.0,
            monotonicity: 0.0,
            count: 0.0,
            total: 0.0,
            max_tile: 0,
            max_in_corner: false,
        };

        for y in 0..size {
            for x in 0..size {
                let value = board.get(x, y);
                if value == 0 {
                    continue;
                }
                let v = value as f64;
                terms.total += v * v;
                terms.count += 1.0;
                terms.max_tile = terms.max_tile.max(value);

                // Below and to the right: smoothness and monotonicity.
                for (nx, ny) in [(x, y + 1), (x + 1, y)] {
                    if nx < size && ny < size && board.get(nx, ny) != 0 {
                        let diff = board.get(nx, ny) as f64 - v;
                        terms.smoothness += diff * diff;
                        if diff > 0.0 {
                            terms.monotonicity += diff * diff;
                        }
                    }
                }
                // Above and to the left: smoothness only.
                for (nx, ny) in [(x, y.wrapping_sub(1)), (x.wrapping_sub(1), y)] {
                    if nx < size && ny < size && board.get(nx, ny) != 0 {
                        let diff = v - board.get(nx, ny) as f64;
                        terms.smoothness += diff * diff;
                    }
                }
            }
        }

        terms.max_in_corner = terms.max_tile > 0 && board.get(0, 0) == terms.max_tile;
        terms
    }

    /// `(smoothness + monotonicity + count - max^4 - total) / max(terms)`,
    /// or infinity when the largest tile has left the top-left corner.
    pub fn entropy(&self) -> f64 {
        if !self.max_in_corner {
            return f64::INFINITY;
        }
        let max_pow = (self.max_tile as f64).powi(4);
        let sum = self.smoothness + self.monotonicity + self.count - max_pow - self.total;
        let scale = [self.smoothness, self.monotonicity, self.count, max_pow, self.total]
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        sum / scale
    }
}

/// Entropy of `board`; lower is better.
pub fn entropy(board: &Board) -> f64 {
    EntropyTerms::of(board).entropy()
}

/// Hand-written heuristic player that keeps the largest tile in the top-left
/// corner by minimising board entropy.
///
/// Candidate boards get a pessimistic spawn: the new tile lands in the
/// top-left cell if free, else the cell to its right, else anywhere.
pub struct EntropyAgent {
    size: usize,
    search: EntropySearch,
    temperature: f64,
    rng: StdRng,
}

impl EntropyAgent {
    pub fn new(size: usize, search: EntropySearch) -> Self {
        Self::with_rng(size, search, StdRng::from_os_rng())
    }

    pub fn with_seed(size: usize, search: EntropySearch, seed: u64) -> Self {
        Self::with_rng(size, search, StdRng::seed_from_u64(seed))
    }

    fn with_rng(size: usize, search: EntropySearch, rng: StdRng) -> Self {
        EntropyAgent {
            size,
            search,
            temperature: START_TEMPERATURE,
            rng,
        }
    }

    pub fn search(&self) -> EntropySearch {
        self.search
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Pick a move for `board` from `legal`.
    pub fn choose(&mut self, board: &Board, legal: &[Direction]) -> Option<Direction> {
        let fallback = first_legal(legal)?;
        let children = self.children(board, legal);

        match self.search {
            EntropySearch::Lookahead { depth } => {
                let (least, best) = self.least_entropy(&children, depth);
                let Some(best) = best else {
                    return Some(fallback);
                };
                let accepted = self.accepts(least, entropy(board));
                self.temperature *= LOOKAHEAD_COOLING;
                Some(if accepted { best } else { fallback })
            }
            EntropySearch::Annealing => {
                let mut least = f64::INFINITY;
                let mut best = None;
                for (direction, child) in &children {
                    let e = entropy(child);
                    if e < least {
                        least = e;
                        best = Some(*direction);
                    }
                }
                let current = entropy(board);
                let Some(best) = best else {
                    self.cool_linearly();
                    return Some(fallback);
                };
                loop {
                    let accepted = self.accepts(least, current);
                    self.cool_linearly();
                    if accepted || self.temperature == 0.0 {
                        return Some(best);
                    }
                }
            }
        }
    }

    /// Boards reachable from `board` by each legal move, in action-id order.
    fn children(&mut self, board: &Board, legal: &[Direction]) -> Vec<(Direction, Board)> {
        Direction::ALL
            .into_iter()
            .filter(|d| legal.contains(d))
            .filter_map(|direction| {
                let shifted = board.shift(direction);
                if !shifted.moved {
                    return None;
                }
                let mut child = shifted.board;
                spawn_pessimistic(&mut child, &mut self.rng);
                Some((direction, child))
            })
            .collect()
    }

    /// Lowest entropy among `children` and, `depth` plies further down, their
    /// descendants, together with the first move towards it.
    fn least_entropy(
        &mut self,
        children: &[(Direction, Board)],
        depth: usize,
    ) -> (f64, Option<Direction>) {
        let mut least = f64::INFINITY;
        let mut best = None;
        for (direction, child) in children {
            let e = entropy(child);
            if e < least {
                least = e;
                best = Some(*direction);
            }
        }
        if depth == 0 {
            return (least, best);
        }

        for direction in Direction::PRIORITY {
            let Some((_, child)) = children.iter().find(|(d, _)| *d == direction) else {
                continue;
            };
            let grandchildren = self.children(child, &Direction::ALL);
            let (below, _) = self.least_entropy(&grandchildren, depth - 1);
            if below < least {
                least = below;
                best = Some(direction);
            }
        }
        (least, best)
    }

    /// Metropolis rule: always take a lower entropy, take a higher one with
    /// probability `exp(-delta / temperature)`.
    fn accepts(&mut self, candidate: f64, current: f64) -> bool {
        candidate < current
            || self.rng.random::<f64>() < (-(candidate - current) / self.temperature).exp()
    }

    fn cool_linearly(&mut self) {
        self.temperature = (self.temperature - 1.0).max(0.0);
    }

    /// Rebuild the current board from the newest block of `phi`.
    fn board_from_phi(&self, phi: &Array1<f64>) -> Board {
        let cells = self.size * self.size;
        let newest: Vec<f64> = phi
            .iter()
            .skip(phi.len().saturating_sub(cells))
            .copied()
            .collect();
        let mut board = Board::new(self.size);
        let offset = cells - newest.len();
        for (i, &value) in newest.iter().enumerate() {
            let cell = offset + i;
            board.set(cell % self.size, cell / self.size, value as u32);
        }
        board
    }
}

impl Agent for EntropyAgent {
    fn select_action(
        &mut self,
        phi: &Array1<f64>,
        legal: &[Direction],
        _training: bool,
    ) -> Option<Direction> {
        let board = self.board_from_phi(phi);
        self.choose(&board, legal)
    }

    fn begin_game(&mut self) {
        self.temperature = START_TEMPERATURE;
    }

    fn name(&self) -> &str {
        "Entropy"
    }
}

/// First legal move in priority order.
fn first_legal(legal: &[Direction]) -> Option<Direction> {
    Direction::PRIORITY.into_iter().find(|d| legal.contains(d))
}

fn spawn_pessimistic<R: Rng + ?Sized>(board: &mut Board, rng: &mut R) {
    let value = if rng.random_bool(0.9) { 2 } else { 4 };
    if board.get(0, 0) == 0 {
        board.set(0, 0, value);
    } else if board.size() > 1 && board.get(1, 0) == 0 {
        board.set(1, 0, value);
    } else {
        board.insert_random_tile(rng);
    }
}
