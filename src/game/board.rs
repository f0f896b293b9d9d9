use std::fmt;

use rand::Rng;

use super::Direction;

pub const DEFAULT_SIZE: usize = 4;

/// Square grid of tiles stored row-major. `0` marks an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    size: usize,
    cells: Vec<u32>,
}

/// Result of sliding a board without spawning a new tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shifted {
    pub board: Board,
    pub score_gained: u64,
    pub moved: bool,
}

impl Board {
    /// Create an empty `size` x `size` board.
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Build a board from rows, top row first. Panics if the rows are not square.
    pub fn from_rows(rows: &[&[u32]]) -> Self {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for row in rows {
            assert_eq!(row.len(), size, "board rows must form a square");
            cells.extend_from_slice(row);
        }
        Board { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major tile values.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Tile at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.cells[y * self.size + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u32) {
        self.cells[y * self.size + x] = value;
    }

    /// Indices of empty cells in row-major order.
    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Cell values as floats, row-major, zero for empty.
    pub fn to_vector(&self) -> Vec<f64> {
        self.cells.iter().map(|&v| v as f64).collect()
    }

    /// Slide every tile towards `direction`, merging equal neighbours once.
    pub fn shift(&self, direction: Direction) -> Shifted {
        let mut board = self.clone();
        let mut score_gained = 0;
        let mut moved = false;

        for line in 0..self.size {
            let positions = self.line_positions(direction, line);
            let tiles: Vec<u32> = positions
                .iter()
                .map(|&i| self.cells[i])
                .filter(|&v| v != 0)
                .collect();

            let mut merged = Vec::with_capacity(self.size);
            let mut i = 0;
            while i < tiles.len() {
                if i + 1 < tiles.len() && tiles[i] == tiles[i + 1] {
                    let value = tiles[i] * 2;
                    score_gained += value as u64;
                    merged.push(value);
                    i += 2;
                } else {
                    merged.push(tiles[i]);
                    i += 1;
                }
            }
            merged.resize(self.size, 0);

            for (&pos, &value) in positions.iter().zip(merged.iter()) {
                if board.cells[pos] != value {
                    moved = true;
                }
                board.cells[pos] = value;
            }
        }

        Shifted {
            board,
            score_gained,
            moved,
        }
    }

    /// A direction is legal iff sliding changes the board.
    pub fn can_shift(&self, direction: Direction) -> bool {
        self.shift(direction).moved
    }

    /// True if any cell is empty or two adjacent tiles are equal.
    pub fn moves_available(&self) -> bool {
        if self.cells.contains(&0) {
            return true;
        }
        for y in 0..self.size {
            for x in 0..self.size {
                let v = self.get(x, y);
                if x + 1 < self.size && self.get(x + 1, y) == v {
                    return true;
                }
                if y + 1 < self.size && self.get(x, y + 1) == v {
                    return true;
                }
            }
        }
        false
    }

    /// Place a 2 (90%) or 4 (10%) in a random empty cell. Returns false if the board is full.
    pub fn insert_random_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return false;
        }
        let cell = empty[rng.random_range(0..empty.len())];
        self.cells[cell] = if rng.random_bool(0.9) { 2 } else { 4 };
        true
    }

    /// Cell indices of one row or column, starting at the edge tiles slide towards.
    fn line_positions(&self, direction: Direction, line: usize) -> Vec<usize> {
        let n = self.size;
        match direction {
            Direction::Left => (0..n).map(|x| line * n + x).collect(),
            Direction::Right => (0..n).rev().map(|x| line * n + x).collect(),
            Direction::Up => (0..n).map(|y| y * n + line).collect(),
            Direction::Down => (0..n).rev().map(|y| y * n + line).collect(),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new(DEFAULT_SIZE)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.size {
            for x in 0..self.size {
                match self.get(x, y) {
                    0 => write!(f, "{:>6}", ".")?,
                    v => write!(f, "{:>6}", v)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
