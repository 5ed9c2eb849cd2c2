use crate::sim::geometry::displacement;

pub const HEIGHT: usize = 200;
pub const WIDTH: usize = 200;

/// Side of every square obstacle block
pub const OBSTACLE_SIZE: usize = 16;
/// Row and column anchors of the 3x3 obstacle layout
pub const OBSTACLE_ANCHORS: [usize; 3] = [25, 91, 160];

/// State of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Border,
    Obstacle,
    /// Transient mark of the robot's current cell
    Robot,
    /// Transient mark of the ball's current cell
    Ball,
    /// Returned for reads outside the grid
    Invalid,
}

impl Cell {
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// Axis-aligned rectangle in continuous (row, col) space, `bottom` and `right` exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Rect {
    pub fn contains(&self, row: f64, col: f64) -> bool {
        row >= self.top && row < self.bottom && col >= self.left && col < self.right
    }

    /// The region a ball may occupy: everything inside the border ring.
    pub fn interior() -> Self {
        Self {
            top: 1.0,
            left: 1.0,
            bottom: (HEIGHT - 1) as f64,
            right: (WIDTH - 1) as f64,
        }
    }

    fn block(row_anchor: usize, col_anchor: usize) -> Self {
        Self {
            top: row_anchor as f64,
            left: col_anchor as f64,
            bottom: (row_anchor + OBSTACLE_SIZE) as f64,
            right: (col_anchor + OBSTACLE_SIZE) as f64,
        }
    }
}

/// Returns the obstacle block containing the continuous point, if any.
pub fn obstacle_block_at(row: f64, col: f64) -> Option<Rect> {
    let anchor_of = |value: f64| {
        OBSTACLE_ANCHORS
            .iter()
            .copied()
            .find(|&anchor| value >= anchor as f64 && value < (anchor + OBSTACLE_SIZE) as f64)
    };
    Some(Rect::block(anchor_of(row)?, anchor_of(col)?))
}

/// Fixed-size occupancy map of the arena.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Cell>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    /// Creates an initialized grid.
    pub fn new() -> Self {
        let mut grid = Self {
            cells: vec![Cell::Empty; HEIGHT * WIDTH],
        };
        grid.initialize();
        grid
    }

    /// Paints the border ring and the nine obstacle blocks, clears everything else.
    pub fn initialize(&mut self) {
        for row in 0..HEIGHT {
            for col in 0..WIDTH {
                let border = row == 0 || row == HEIGHT - 1 || col == 0 || col == WIDTH - 1;
                self.cells[row * WIDTH + col] = if border { Cell::Border } else { Cell::Empty };
            }
        }

        for &row_anchor in &OBSTACLE_ANCHORS {
            for &col_anchor in &OBSTACLE_ANCHORS {
                for row in row_anchor..row_anchor + OBSTACLE_SIZE {
                    for col in col_anchor..col_anchor + OBSTACLE_SIZE {
                        self.cells[row * WIDTH + col] = Cell::Obstacle;
                    }
                }
            }
        }
    }

    /// Writes a cell, writes outside the grid are ignored.
    pub fn set_cell(&mut self, row: i64, col: i64, value: Cell) {
        if let Some(idx) = Self::index(row, col) {
            self.cells[idx] = value;
        }
    }

    /// Reads a cell, reads outside the grid return `Cell::Invalid`.
    pub fn get_cell(&self, row: i64, col: i64) -> Cell {
        Self::index(row, col)
            .map(|idx| self.cells[idx])
            .unwrap_or(Cell::Invalid)
    }

    /// Cell under a continuous position (truncated towards zero like the occupancy marks).
    pub fn cell_at(&self, row: f64, col: f64) -> Cell {
        self.get_cell(row as i64, col as i64)
    }

    /// Projects `steps` units along `heading` and reports whether the landing point is an
    /// empty interior cell.
    pub fn is_path_clear(&self, row: f64, col: f64, heading: f64, steps: u32) -> bool {
        let (d_row, d_col) = displacement(heading, steps as f64);
        let test_row = row + d_row;
        let test_col = col + d_col;

        if test_row < 1.0
            || test_row > (HEIGHT - 2) as f64
            || test_col < 1.0
            || test_col > (WIDTH - 2) as f64
        {
            return false;
        }

        self.cell_at(test_row, test_col).is_empty()
    }

    fn index(row: i64, col: i64) -> Option<usize> {
        if row >= 0 && (row as usize) < HEIGHT && col >= 0 && (col as usize) < WIDTH {
            Some(row as usize * WIDTH + col as usize)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_layout() {
        let grid = Grid::new();
        assert_eq!(grid.get_cell(0, 0), Cell::Border);
        assert_eq!(grid.get_cell(199, 50), Cell::Border);
        assert_eq!(grid.get_cell(50, 199), Cell::Border);
        assert_eq!(grid.get_cell(30, 30), Cell::Obstacle);
        // the centre block spans rows and columns [91, 107)
        assert_eq!(grid.get_cell(100, 100), Cell::Obstacle);
        assert_eq!(grid.get_cell(130, 130), Cell::Empty);
        assert_eq!(grid.get_cell(1, 1), Cell::Empty);

        // block corners are inclusive at the anchor and exclusive at anchor + 16
        assert_eq!(grid.get_cell(160, 91), Cell::Obstacle);
        assert_eq!(grid.get_cell(175, 106), Cell::Obstacle);
        assert_eq!(grid.get_cell(176, 106), Cell::Empty);
        assert_eq!(grid.get_cell(24, 25), Cell::Empty);
    }

    #[test]
    fn test_obstacle_count() {
        let grid = Grid::new();
        let obstacles = grid.cells.iter().filter(|&&c| c == Cell::Obstacle).count();
        assert_eq!(obstacles, 9 * OBSTACLE_SIZE * OBSTACLE_SIZE);
    }

    #[test]
    fn test_initialize_is_idempotent_and_clears_marks() {
        let mut grid = Grid::new();
        grid.set_cell(130, 130, Cell::Robot);
        grid.set_cell(0, 0, Cell::Empty);
        grid.initialize();
        let fresh = Grid::new();
        assert_eq!(grid.cells, fresh.cells);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut grid = Grid::new();
        assert_eq!(grid.get_cell(-1, 5), Cell::Invalid);
        assert_eq!(grid.get_cell(5, 200), Cell::Invalid);
        grid.set_cell(-3, 7, Cell::Robot);
        grid.set_cell(200, 200, Cell::Robot);
        assert_eq!(grid.cells, Grid::new().cells);
    }

    #[test]
    fn test_path_clear_on_fresh_grid() {
        let grid = Grid::new();
        assert!(grid.is_path_clear(130.0, 130.0, 0.0, 1));
        assert!(!grid.is_path_clear(100.0, 89.0, 0.0, 2));
        // projected into the (25, 25) block
        assert!(!grid.is_path_clear(24.0, 30.0, 270.0, 2));
        // projected past the border ring
        assert!(!grid.is_path_clear(1.5, 100.0, 90.0, 1));
        assert!(!grid.is_path_clear(100.0, 198.0, 0.0, 1));
    }

    #[test]
    fn test_path_blocked_by_agent_mark() {
        let mut grid = Grid::new();
        assert!(grid.is_path_clear(130.0, 130.0, 0.0, 1));
        grid.set_cell(130, 131, Cell::Ball);
        assert!(!grid.is_path_clear(130.0, 130.0, 0.0, 1));
    }

    #[test]
    fn test_obstacle_block_lookup() {
        let block = obstacle_block_at(30.0, 100.0).unwrap();
        assert_eq!(block.top, 25.0);
        assert_eq!(block.left, 91.0);
        assert_eq!(block.bottom, 41.0);
        assert_eq!(block.right, 107.0);
        assert!(obstacle_block_at(41.0, 100.0).is_none());
        assert!(obstacle_block_at(100.0, 60.0).is_none());
    }
}
