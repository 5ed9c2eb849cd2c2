pub mod ball;
pub mod geometry;
pub mod grid;
pub mod robot;

use crate::config::SimConfig;
use crate::sim::ball::Ball;
use crate::sim::geometry::distance;
use crate::sim::grid::Grid;
use crate::sim::robot::Robot;
use rand::Rng;
use thiserror::Error;

/// Random cell draws allowed before placement is declared impossible
pub const MAX_PLACEMENT_ATTEMPTS: usize = 100_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("No empty cell found for the {agent} after {attempts} attempts")]
    NoEmptyCell { agent: &'static str, attempts: usize },
}

/// Everything one simulated run mutates: the arena and both agents.
#[derive(Debug, Clone)]
pub struct SimContext {
    pub grid: Grid,
    pub robot: Robot,
    pub ball: Ball,
}

impl SimContext {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            grid: Grid::new(),
            robot: Robot::new(config.turn_angle, config.view_angle),
            ball: Ball::new(),
        }
    }

    /// Restores the arena and places the robot, then the ball, on random empty cells.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) -> Result<(), SimError> {
        self.grid.initialize();
        self.robot.initialize(&mut self.grid, rng)?;
        self.ball.initialize(&mut self.grid, rng)?;
        Ok(())
    }

    pub fn robot_ball_distance(&self) -> f64 {
        distance(
            self.robot.row(),
            self.robot.col(),
            self.ball.row(),
            self.ball.col(),
        )
    }
}
