use crate::config::SimConfig;
use crate::evaluation::track::Tracks;
use crate::interpreter::Interpreter;
use crate::program::Program;
use crate::rng::create_rng;
use crate::sim::{SimContext, SimError};
use log::debug;
use rand::Rng;

/// Reward granted per registered hit
pub const HIT_REWARD: f64 = 1500.0;

/// Outcome of one simulated run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub hits: u32,
    pub penalty: f64,
    /// Terminals executed during the run
    pub steps: u32,
    /// Robot to ball distance right after placement
    pub initial_distance: f64,
    pub fitness: f64,
}

/// Fitness of a program averaged over `runs_per_evaluation` runs.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessReport {
    pub fitness: f64,
    pub runs: Vec<RunReport>,
}

impl FitnessReport {
    pub fn total_hits(&self) -> u32 {
        self.runs.iter().map(|r| r.hits).sum()
    }
}

/// Scores programs by how often and how efficiently the robot they drive hits the ball.
///
/// Every run starts from a freshly initialized arena with both agents on random empty cells.
/// Each tick first advances the ball and then evaluates the program once from its root.
/// A run scores `HIT_REWARD * hits - penalty`.
pub struct FitnessEvaluator<'a> {
    config: &'a SimConfig,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(config: &'a SimConfig) -> Self {
        Self { config }
    }

    /// Evaluates a program over `runs_per_evaluation` runs drawing placements from `rng`.
    ///
    /// # Arguments
    /// * `program` - The program driving the robot
    /// * `rng` - Source of every placement, so equal seeds give bit-identical fitness
    ///
    /// # Returns
    /// * `Result<FitnessReport, SimError>` - The averaged fitness and the report of each run,
    ///   or the placement failure that aborted a run
    pub fn evaluate<R: Rng>(
        &self,
        program: &Program,
        rng: &mut R,
    ) -> Result<FitnessReport, SimError> {
        let mut sim = SimContext::new(self.config);
        let runs = (0..self.config.runs_per_evaluation)
            .map(|_| self.run_once(program, &mut sim, rng, None))
            .collect::<Result<Vec<RunReport>, SimError>>()?;

        let fitness = runs.iter().map(|r| r.fitness).sum::<f64>() / runs.len().max(1) as f64;
        debug!(
            "Fitness {:.4} over {} run(s): hits={:?}, penalty={:?}",
            fitness,
            runs.len(),
            runs.iter().map(|r| r.hits).collect::<Vec<_>>(),
            runs.iter().map(|r| r.penalty).collect::<Vec<_>>()
        );
        Ok(FitnessReport { fitness, runs })
    }

    /// Runs a program once with tracking enabled, placing the agents from `seed`.
    pub fn replay(&self, program: &Program, seed: u64) -> Result<(RunReport, Tracks), SimError> {
        let mut sim = SimContext::new(self.config);
        let mut rng = create_rng(seed);
        let mut tracks = Tracks::default();
        let report = self.run_once(program, &mut sim, &mut rng, Some(&mut tracks))?;
        Ok((report, tracks))
    }

    fn run_once<R: Rng>(
        &self,
        program: &Program,
        sim: &mut SimContext,
        rng: &mut R,
        tracks: Option<&mut Tracks>,
    ) -> Result<RunReport, SimError> {
        sim.reset(rng)?;
        let initial_distance = sim.robot_ball_distance();

        let (robot_track, mut ball_track) = match tracks {
            Some(tracks) => (Some(&mut tracks.robot), Some(&mut tracks.ball)),
            None => (None, None),
        };
        let mut interpreter = Interpreter::new(self.config.hit_distance, initial_distance);
        if let Some(track) = robot_track {
            interpreter = interpreter.with_track(track);
        }

        for tick in 0..self.config.ticks_per_run {
            if sim.ball.tick(&mut sim.grid) {
                if let Some(track) = ball_track.as_deref_mut() {
                    track.record(sim.ball.row(), sim.ball.col(), tick as u32);
                }
            }
            interpreter.execute(program.root(), sim);
        }

        let stats = interpreter.stats();
        Ok(RunReport {
            hits: stats.hits,
            penalty: stats.penalty,
            steps: stats.steps,
            initial_distance,
            fitness: HIT_REWARD * stats.hits as f64 - stats.penalty,
        })
    }
}
