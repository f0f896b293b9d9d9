use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::ai::Transition;
use crate::error::ReplayError;

/// Append-only log of observed transitions with uniform sampling.
///
/// Unbounded by default. With a capacity it becomes a ring buffer that
/// overwrites the oldest transition once full.
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    buffer: Vec<Transition>,
    capacity: Option<usize>,
    position: usize,
    rng: StdRng,
}

impl ReplayMemory {
    pub fn new() -> Self {
        Self::with_rng(None, StdRng::from_os_rng())
    }

    /// `capacity` of `None` or `Some(0)` means unbounded, so a push always
    /// stores the transition.
    pub fn with_rng(capacity: Option<usize>, rng: StdRng) -> Self {
        ReplayMemory {
            buffer: Vec::new(),
            capacity: capacity.filter(|&c| c > 0),
            position: 0,
            rng,
        }
    }

    /// Add a transition. Overwrites the oldest when bounded and full.
    pub fn push(&mut self, transition: Transition) {
        match self.capacity {
            Some(capacity) if self.buffer.len() >= capacity => {
                self.buffer[self.position] = transition;
                self.position = (self.position + 1) % capacity;
            }
            _ => self.buffer.push(transition),
        }
    }

    /// Pick one stored transition with uniform probability.
    pub fn sample_uniform(&mut self) -> Result<&Transition, ReplayError> {
        if self.buffer.is_empty() {
            return Err(ReplayError::EmptyMemory);
        }
        let index = self.rng.random_range(0..self.buffer.len());
        Ok(&self.buffer[index])
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

impl Default for ReplayMemory {
    fn default() -> Self {
        Self::new()
    }
}
