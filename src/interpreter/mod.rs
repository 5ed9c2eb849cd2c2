use crate::evaluation::track::TrackMap;
use crate::program::{Command, Node};
use crate::sim::SimContext;

/// Tallies of one run, read by the fitness function once the run is over.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunStats {
    /// Terminals executed so far
    pub steps: u32,
    pub hits: u32,
    /// Accumulated efficiency penalty
    pub penalty: f64,
}

/// Tree-walking executor for robot programs.
///
/// One call to `execute` evaluates a program from the given node downwards. The interpreter
/// keeps the step counter and the hit bookkeeping across calls, so a run evaluates the root
/// once per tick against the same interpreter.
pub struct Interpreter<'t> {
    hit_distance: f64,
    stats: RunStats,
    last_hit_step: u32,
    /// Robot to ball distance the next hit is measured against
    reference_distance: f64,
    track: Option<&'t mut TrackMap>,
}

impl<'t> Interpreter<'t> {
    /// # Arguments
    /// * `hit_distance` - Robot to ball distance at or below which a hit is registered
    /// * `initial_distance` - Robot to ball distance right after placement
    pub fn new(hit_distance: f64, initial_distance: f64) -> Self {
        Self {
            hit_distance,
            stats: RunStats::default(),
            last_hit_step: 0,
            reference_distance: initial_distance,
            track: None,
        }
    }

    /// Records the robot's cell after every executed terminal.
    pub fn with_track(mut self, track: &'t mut TrackMap) -> Self {
        self.track = Some(track);
        self
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Executes the subtree rooted at `node` against the simulation.
    ///
    /// Recursion depth equals the depth of the tree, which the evolution engine bounds by
    /// `max_depth`.
    pub fn execute(&mut self, node: &Node, sim: &mut SimContext) {
        let children = node.children();
        match node.command() {
            Command::Progn3 | Command::Progn2 => {
                for child in children {
                    self.execute(child, sim);
                }
            }
            Command::IfWall => {
                let branch = if sim.robot.is_near_wall(&sim.grid) { 0 } else { 1 };
                self.execute(&children[branch], sim);
            }
            Command::IfBall => {
                let visible = sim
                    .robot
                    .can_see_ball(&sim.grid, sim.ball.row(), sim.ball.col());
                let branch = if visible { 0 } else { 1 };
                self.execute(&children[branch], sim);
            }
            terminal => self.run_terminal(terminal, sim),
        }
    }

    fn run_terminal(&mut self, command: Command, sim: &mut SimContext) {
        let walked = match command {
            Command::WalkFront => {
                sim.robot.walk_front(&mut sim.grid);
                true
            }
            Command::WalkBack => {
                sim.robot.walk_back(&mut sim.grid);
                true
            }
            Command::Left => {
                sim.robot.turn_left();
                false
            }
            Command::Right => {
                sim.robot.turn_right();
                false
            }
            Command::Align => {
                sim.robot.align(&sim.grid, sim.ball.row(), sim.ball.col());
                false
            }
            _ => unreachable!("{} is not a terminal", command),
        };

        if let Some(track) = self.track.as_deref_mut() {
            track.record(sim.robot.row(), sim.robot.col(), self.stats.steps);
        }
        self.stats.steps += 1;

        // A blocked walk still counts: the ball's own mark stops a robot that is touching it.
        if walked {
            self.verify_hit(sim);
        }
    }

    /// Registers a hit when the robot is within reach of the ball and kicks the ball along the
    /// robot's heading, restarting its burst if it was already travelling.
    fn verify_hit(&mut self, sim: &mut SimContext) {
        let distance = sim.robot_ball_distance();
        if distance > self.hit_distance {
            return;
        }

        let steps_taken = self.stats.steps - self.last_hit_step;
        self.stats.hits += 1;
        self.stats.penalty += steps_taken as f64 / self.reference_distance.max(f64::EPSILON);
        self.last_hit_step = self.stats.steps;
        self.reference_distance = distance;
        sim.ball.launch(sim.robot.heading());
    }
}
