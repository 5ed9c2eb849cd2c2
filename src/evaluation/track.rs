use crate::sim::grid::{HEIGHT, WIDTH};

/// Per-cell record of the step at which an agent last occupied the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMap {
    cells: Vec<Option<u32>>,
}

impl Default for TrackMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackMap {
    pub fn new() -> Self {
        Self {
            cells: vec![None; HEIGHT * WIDTH],
        }
    }

    /// Marks the cell containing `(row, col)` with `step`. Positions off the grid are ignored.
    pub fn record(&mut self, row: f64, col: f64, step: u32) {
        if let Some(index) = index_of(row as i64, col as i64) {
            self.cells[index] = Some(step);
        }
    }

    pub fn visited_at(&self, row: i64, col: i64) -> Option<u32> {
        index_of(row, col).and_then(|index| self.cells[index])
    }

    /// Number of distinct cells visited.
    pub fn coverage(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }
}

fn index_of(row: i64, col: i64) -> Option<usize> {
    if (0..HEIGHT as i64).contains(&row) && (0..WIDTH as i64).contains(&col) {
        Some(row as usize * WIDTH + col as usize)
    } else {
        None
    }
}

/// Trajectories of both agents during one tracked run.
#[derive(Debug, Clone, Default)]
pub struct Tracks {
    pub robot: TrackMap,
    pub ball: TrackMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_latest_step() {
        let mut track = TrackMap::new();
        track.record(10.7, 20.2, 3);
        track.record(10.1, 20.9, 8);
        assert_eq!(track.visited_at(10, 20), Some(8));
        assert_eq!(track.visited_at(10, 21), None);
        assert_eq!(track.coverage(), 1);
    }

    #[test]
    fn test_off_grid_positions_are_ignored() {
        let mut track = TrackMap::new();
        track.record(-3.0, 5.0, 1);
        track.record(5.0, 250.0, 1);
        assert_eq!(track.coverage(), 0);
        assert_eq!(track.visited_at(-1, 0), None);
    }

    #[test]
    fn test_clear() {
        let mut track = TrackMap::new();
        track.record(1.0, 1.0, 0);
        track.clear();
        assert_eq!(track.coverage(), 0);
    }
}
