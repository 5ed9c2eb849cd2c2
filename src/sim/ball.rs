use crate::sim::geometry::{displacement, normalize_heading};
use crate::sim::grid::{obstacle_block_at, Cell, Grid, Rect, HEIGHT, WIDTH};
use crate::sim::{SimError, MAX_PLACEMENT_ATTEMPTS};
use log::warn;
use rand::Rng;

/// Ticks of forced motion after a hit
pub const BALL_BURST: u32 = 40;
/// Distance covered per tick while moving
pub const BALL_SPEED: f64 = 2.0;
/// Upper bound on reflections resolved within one tick
const MAX_BOUNCES: usize = 16;
/// Distance kept between a reflection point and the edge it reflects off
const EDGE_EPSILON: f64 = 1e-6;

/// Which side of a rectangle the ball has to stay on.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Inside,
    Outside,
}

/// Orientation of the rectangle edge the ball ran into.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Edge {
    /// An edge of constant row
    Horizontal,
    /// An edge of constant column
    Vertical,
}

impl Edge {
    fn mirror(self, heading: i32) -> i32 {
        match self {
            Edge::Horizontal => normalize_heading(360 - heading),
            Edge::Vertical => normalize_heading(180 - heading),
        }
    }
}

/// The target. Idle until hit, then travels `BALL_BURST` ticks bouncing off the border and the
/// obstacle blocks.
#[derive(Debug, Clone)]
pub struct Ball {
    row: f64,
    col: f64,
    heading: i32,
    burst: u32,
}

impl Default for Ball {
    fn default() -> Self {
        Self::new()
    }
}

impl Ball {
    pub fn new() -> Self {
        Self {
            row: 0.0,
            col: 0.0,
            heading: 0,
            burst: 0,
        }
    }

    /// Places an idle ball on a random empty interior cell and marks that cell.
    pub fn initialize<R: Rng>(&mut self, grid: &mut Grid, rng: &mut R) -> Result<(), SimError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let row = rng.random_range(1..HEIGHT - 1) as i64;
            let col = rng.random_range(1..WIDTH - 1) as i64;
            if grid.get_cell(row, col).is_empty() {
                self.place(grid, row as f64, col as f64);
                return Ok(());
            }
        }
        Err(SimError::NoEmptyCell {
            agent: "ball",
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    /// Puts an idle ball at an exact position and marks its cell.
    pub fn place(&mut self, grid: &mut Grid, row: f64, col: f64) {
        self.row = row;
        self.col = col;
        self.heading = 0;
        self.burst = 0;
        grid.set_cell(row as i64, col as i64, Cell::Ball);
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

    pub fn burst(&self) -> u32 {
        self.burst
    }

    pub fn is_moving(&self) -> bool {
        self.burst > 0
    }

    /// Kicks the ball along `heading` for the next `BALL_BURST` ticks.
    pub fn launch(&mut self, heading: i32) {
        self.heading = normalize_heading(heading);
        self.burst = BALL_BURST;
    }

    /// Advances the ball by one tick. Returns whether it moved.
    pub fn tick(&mut self, grid: &mut Grid) -> bool {
        if self.burst == 0 {
            return false;
        }
        self.burst -= 1;

        let (old_row, old_col) = (self.row, self.col);
        self.advance(BALL_SPEED);
        self.keep_off_border();

        if grid.cell_at(old_row, old_col) == Cell::Ball {
            grid.set_cell(old_row as i64, old_col as i64, Cell::Empty);
        }
        if grid.cell_at(self.row, self.col).is_empty() {
            grid.set_cell(self.row as i64, self.col as i64, Cell::Ball);
        }
        true
    }

    /// Moves `distance` along the heading, reflecting off the border ring and any obstacle
    /// block the path would end in, until the remaining distance lands on free space.
    fn advance(&mut self, distance: f64) {
        let interior = Rect::interior();
        let mut rest = distance;

        for _ in 0..MAX_BOUNCES {
            let (d_row, d_col) = displacement(self.heading as f64, 1.0);
            let target_row = self.row + d_row * rest;
            let target_col = self.col + d_col * rest;

            let crossing = if !interior.contains(target_row, target_col) {
                first_crossing(&interior, Side::Inside, self.row, self.col, d_row, d_col)
            } else {
                obstacle_block_at(target_row, target_col).and_then(|block| {
                    first_crossing(&block, Side::Outside, self.row, self.col, d_row, d_col)
                })
            };

            match crossing {
                Some((t, edge)) => {
                    let travelled = (t - EDGE_EPSILON).min(rest);
                    self.row += d_row * travelled;
                    self.col += d_col * travelled;
                    self.heading = edge.mirror(self.heading);
                    rest = (rest - travelled).max(0.0);
                }
                None => {
                    self.row = target_row;
                    self.col = target_col;
                    return;
                }
            }
        }

        warn!(
            "Ball reflection limit reached at ({:.3}, {:.3}), heading {}",
            self.row, self.col, self.heading
        );
    }

    /// Nudges the ball one unit inwards if it ended up on the outer border ring.
    fn keep_off_border(&mut self) {
        let max_row = (HEIGHT - 1) as i64;
        let max_col = (WIDTH - 1) as i64;
        if self.row as i64 <= 0 {
            self.row += 1.0;
        } else if self.row as i64 >= max_row {
            self.row -= 1.0;
        }
        if self.col as i64 <= 0 {
            self.col += 1.0;
        } else if self.col as i64 >= max_col {
            self.col -= 1.0;
        }
    }
}

/// Distance along the unit direction `(d_row, d_col)` at which a ray starting at
/// `(row, col)` first crosses an edge of `rect`, together with that edge.
///
/// For `Side::Inside` the ray starts inside and the exit edge is returned; for
/// `Side::Outside` the ray starts outside and the entry edge is returned.
fn first_crossing(
    rect: &Rect,
    side: Side,
    row: f64,
    col: f64,
    d_row: f64,
    d_col: f64,
) -> Option<(f64, Edge)> {
    let row_t = axis_crossing(side, row, d_row, rect.top, rect.bottom);
    let col_t = axis_crossing(side, col, d_col, rect.left, rect.right);

    let (t, edge) = match side {
        // leaving through whichever slab is exited first
        Side::Inside => {
            if row_t <= col_t {
                (row_t, Edge::Horizontal)
            } else {
                (col_t, Edge::Vertical)
            }
        }
        // entering through whichever slab is entered last
        Side::Outside => {
            if row_t >= col_t {
                (row_t, Edge::Horizontal)
            } else {
                (col_t, Edge::Vertical)
            }
        }
    };
    t.is_finite().then_some((t.max(0.0), edge))
}

/// Crossing parameter of one axis slab `[low, high)`. Exiting returns `+inf` and entering
/// returns `-inf` when the ray does not move along the axis.
fn axis_crossing(side: Side, start: f64, delta: f64, low: f64, high: f64) -> f64 {
    if delta == 0.0 {
        return match side {
            Side::Inside => f64::INFINITY,
            Side::Outside => f64::NEG_INFINITY,
        };
    }
    let boundary = match (side, delta > 0.0) {
        (Side::Inside, true) | (Side::Outside, false) => high,
        (Side::Inside, false) | (Side::Outside, true) => low,
    };
    (boundary - start) / delta
}
