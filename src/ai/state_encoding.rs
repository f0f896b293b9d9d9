use std::collections::VecDeque;

use ndarray::Array1;

/// Flattens the most recent board snapshots into a fixed-length vector.
///
/// Output layout: `sequence_length` blocks of `cells_per_board` values, oldest
/// first. Missing history is zero-padded on the left, older snapshots are
/// dropped, and each snapshot is truncated or zero-padded to
/// `cells_per_board`, so the width never varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardVector {
    sequence_length: usize,
    cells_per_board: usize,
}

impl BoardVector {
    pub fn new(sequence_length: usize, cells_per_board: usize) -> Self {
        BoardVector {
            sequence_length,
            cells_per_board,
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn cells_per_board(&self) -> usize {
        self.cells_per_board
    }

    /// Length of every encoding this produces.
    pub fn width(&self) -> usize {
        self.sequence_length * self.cells_per_board
    }

    /// Encode `history` (oldest first).
    pub fn preprocess<S: AsRef<[f64]>>(&self, history: &[S]) -> Array1<f64> {
        let mut phi = Array1::zeros(self.width());
        let kept = history.len().min(self.sequence_length);
        let first_block = self.sequence_length - kept;

        for (block, snapshot) in history[history.len() - kept..].iter().enumerate() {
            let offset = (first_block + block) * self.cells_per_board;
            for (i, &value) in snapshot
                .as_ref()
                .iter()
                .take(self.cells_per_board)
                .enumerate()
            {
                phi[offset + i] = value;
            }
        }
        phi
    }

    /// Encode a bounded [`BoardHistory`].
    pub fn encode(&self, history: &BoardHistory) -> Array1<f64> {
        let snapshots: Vec<&[f64]> = history.iter().collect();
        self.preprocess(&snapshots)
    }
}

/// Rolling window of the most recent board snapshots.
#[derive(Debug, Clone, Default)]
pub struct BoardHistory {
    snapshots: VecDeque<Vec<f64>>,
    capacity: usize,
}

impl BoardHistory {
    pub fn new(capacity: usize) -> Self {
        BoardHistory {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a snapshot, dropping the oldest when full.
    pub fn push(&mut self, snapshot: Vec<f64>) {
        if self.capacity == 0 {
            return;
        }
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.snapshots.iter().map(|s| s.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_empty_history_is_all_zero() {
        let encoder = BoardVector::new(3, 4);
        let phi = encoder.preprocess::<Vec<f64>>(&[]);
        assert_eq!(phi.len(), 12);
        assert!(phi.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_short_history_is_left_padded() {
        let encoder = BoardVector::new(3, 2);
        let phi = encoder.preprocess(&[vec![2.0, 4.0]]);
        assert_eq!(phi, array![0.0, 0.0, 0.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_long_history_keeps_most_recent() {
        let encoder = BoardVector::new(2, 2);
        let history = vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        let phi = encoder.preprocess(&history);
        assert_eq!(phi, array![2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn test_single_snapshot_variant_flattens_board() {
        let encoder = BoardVector::new(1, 4);
        let phi = encoder.preprocess(&[vec![2.0, 0.0, 8.0, 4.0]]);
        assert_eq!(phi, array![2.0, 0.0, 8.0, 4.0]);
    }

    #[test]
    fn test_snapshots_are_fitted_to_board_size() {
        let encoder = BoardVector::new(2, 3);
        let history = vec![vec![1.0], vec![2.0, 4.0, 8.0, 16.0]];
        let phi = encoder.preprocess(&history);
        assert_eq!(phi, array![1.0, 0.0, 0.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn test_width_is_fixed_for_any_history_length() {
        let encoder = BoardVector::new(4, 16);
        for n in 0..10 {
            let history: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64; 16]).collect();
            assert_eq!(encoder.preprocess(&history).len(), 64);
        }
    }

    #[test]
    fn test_history_window_drops_oldest() {
        let mut history = BoardHistory::new(2);
        history.push(vec![1.0]);
        history.push(vec![2.0]);
        history.push(vec![3.0]);
        assert_eq!(history.len(), 2);
        let kept: Vec<&[f64]> = history.iter().collect();
        assert_eq!(kept, vec![&[2.0][..], &[3.0][..]]);
    }

    #[test]
    fn test_encode_history_matches_preprocess() {
        let encoder = BoardVector::new(2, 2);
        let mut history = BoardHistory::new(2);
        history.push(vec![2.0, 4.0]);
        assert_eq!(encoder.encode(&history), array![0.0, 0.0, 2.0, 4.0]);
        history.clear();
        assert!(history.is_empty());
    }
}
