use crate::sim::geometry::{angular_difference, bearing, displacement, normalize_heading};
use crate::sim::grid::{Cell, Grid, HEIGHT, WIDTH};
use crate::sim::{SimError, MAX_PLACEMENT_ATTEMPTS};
use rand::Rng;

/// The point robot driven by an evolved program.
#[derive(Debug, Clone)]
pub struct Robot {
    row: f64,
    col: f64,
    heading: i32,
    turn_angle: i32,
    view_angle: f64,
}

impl Robot {
    pub fn new(turn_angle: i32, view_angle: i32) -> Self {
        Self {
            row: 0.0,
            col: 0.0,
            heading: 0,
            turn_angle,
            view_angle: view_angle as f64,
        }
    }

    /// Places the robot on a random empty interior cell with a heading that is a multiple of
    /// the turn angle, and marks that cell.
    pub fn initialize<R: Rng>(&mut self, grid: &mut Grid, rng: &mut R) -> Result<(), SimError> {
        let headings = 360 / self.turn_angle;
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let heading = self.turn_angle * rng.random_range(0..headings);
            let row = rng.random_range(1..HEIGHT - 1) as i64;
            let col = rng.random_range(1..WIDTH - 1) as i64;
            if grid.get_cell(row, col).is_empty() {
                self.row = row as f64;
                self.col = col as f64;
                self.heading = heading;
                grid.set_cell(row, col, Cell::Robot);
                return Ok(());
            }
        }
        Err(SimError::NoEmptyCell {
            agent: "robot",
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    pub fn row(&self) -> f64 {
        self.row
    }

    pub fn col(&self) -> f64 {
        self.col
    }

    pub fn heading(&self) -> i32 {
        self.heading
    }

    /// Puts the robot at an exact pose and marks its cell.
    pub fn place(&mut self, grid: &mut Grid, row: f64, col: f64, heading: i32) {
        self.row = row;
        self.col = col;
        self.heading = normalize_heading(heading);
        grid.set_cell(row as i64, col as i64, Cell::Robot);
    }

    /// One unit step forward, returns whether the robot moved.
    pub fn walk_front(&mut self, grid: &mut Grid) -> bool {
        self.step(grid, self.heading)
    }

    /// One unit step backward, returns whether the robot moved.
    pub fn walk_back(&mut self, grid: &mut Grid) -> bool {
        self.step(grid, self.heading + 180)
    }

    pub fn turn_left(&mut self) {
        self.heading = normalize_heading(self.heading + self.turn_angle);
    }

    pub fn turn_right(&mut self) {
        self.heading = normalize_heading(self.heading - self.turn_angle);
    }

    /// Snaps the heading onto the bearing of the target, but only when the target lies inside
    /// the view cone and the first unit step along the bearing is free.
    ///
    /// # Returns
    /// * `bool` - `true` if the heading was snapped
    pub fn align(&mut self, grid: &Grid, target_row: f64, target_col: f64) -> bool {
        let target_bearing = bearing(self.row, self.col, target_row, target_col);
        if angular_difference(target_bearing, self.heading as f64) > self.view_angle {
            return false;
        }
        if !grid.is_path_clear(self.row, self.col, target_bearing, 1) {
            return false;
        }
        self.heading = normalize_heading(target_bearing.round() as i32);
        true
    }

    /// True when the point two units ahead is not a free interior cell.
    pub fn is_near_wall(&self, grid: &Grid) -> bool {
        !grid.is_path_clear(self.row, self.col, self.heading as f64, 2)
    }

    /// Inside the view cone the target is always visible. Outside of it the target counts as
    /// visible only when the first unit step towards it is free.
    pub fn can_see_ball(&self, grid: &Grid, target_row: f64, target_col: f64) -> bool {
        let target_bearing = bearing(self.row, self.col, target_row, target_col);
        if angular_difference(target_bearing, self.heading as f64) > self.view_angle {
            return grid.is_path_clear(self.row, self.col, target_bearing, 1);
        }
        true
    }

    fn step(&mut self, grid: &mut Grid, heading: i32) -> bool {
        let (d_row, d_col) = displacement(heading as f64, 1.0);
        let next_row = self.row + d_row;
        let next_col = self.col + d_col;

        if !grid.cell_at(next_row, next_col).is_empty() {
            return false;
        }

        if grid.cell_at(self.row, self.col) == Cell::Robot {
            grid.set_cell(self.row as i64, self.col as i64, Cell::Empty);
        }
        self.row = next_row;
        self.col = next_col;
        grid.set_cell(self.row as i64, self.col as i64, Cell::Robot);
        true
    }
}
