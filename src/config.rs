use crate::program::codec::MAX_DECODE_DEPTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Top level configuration of an evolution run, read from a TOML file.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub ga: GaConfig,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters of the genetic programming engine.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GaConfig {
    /// Number of individuals, constant across generations
    pub population_size: usize,
    /// Number of evaluate/rank/breed cycles
    pub num_generations: usize,
    /// Probability that a selected pair of parents is recombined
    pub crossover_rate: f64,
    /// Probability that an offspring goes through one mutation operator
    pub mutation_rate: f64,
    /// Number of contestants sampled (with replacement) per tournament
    pub tournament_size: usize,
    /// Maximum tree depth, a lone root has depth 1
    pub max_depth: usize,
    /// Seed of every random stream of the run, drawn from entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Population export of a previous run used as generation zero
    #[serde(default)]
    pub initial_population: Option<String>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 500,
            num_generations: 51,
            crossover_rate: 0.7,
            mutation_rate: 0.1,
            tournament_size: 5,
            max_depth: 17,
            seed: None,
            initial_population: None,
        }
    }
}

/// Parameters of a single simulated run of a program.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per run, every tick evaluates the program from its root once
    pub ticks_per_run: usize,
    /// Runs averaged into one fitness value
    pub runs_per_evaluation: usize,
    /// Degrees turned by LEFT and RIGHT, also the heading quantum at placement
    pub turn_angle: i32,
    /// Robot to ball distance at or below which the ball is hit
    pub hit_distance: f64,
    /// Half-angle of the robot's view cone in degrees
    pub view_angle: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_run: 2000,
            runs_per_evaluation: 1,
            turn_angle: 5,
            hit_distance: 1.0,
            view_angle: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the population export and the track image
    pub directory: String,
    /// Number of top ranked individuals written to the export
    pub council_size: usize,
    /// Replay the champion with tracking enabled and save its trajectory
    pub render_best_track: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "runs".to_string(),
            council_size: 100,
            render_best_track: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Checks every parameter the engine and the simulator rely on.
    ///
    /// # Returns
    /// * `Result<(), ConfigError>` - unit when the configuration is usable, the first offending
    ///   field otherwise
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ga = &self.ga;
        let sim = &self.sim;

        if ga.population_size == 0 {
            return Err(invalid("ga.population_size", "must be at least 1"));
        }
        if ga.num_generations == 0 {
            return Err(invalid("ga.num_generations", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&ga.crossover_rate) {
            return Err(invalid("ga.crossover_rate", "must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&ga.mutation_rate) {
            return Err(invalid("ga.mutation_rate", "must lie in [0, 1]"));
        }
        if ga.tournament_size == 0 {
            return Err(invalid("ga.tournament_size", "must be at least 1"));
        }
        // The root of a generated tree is always a function node.
        if ga.max_depth < 2 {
            return Err(invalid("ga.max_depth", "must be at least 2"));
        }
        // Saved programs must stay loadable.
        if ga.max_depth > MAX_DECODE_DEPTH {
            return Err(invalid(
                "ga.max_depth",
                &format!("must be at most {}", MAX_DECODE_DEPTH),
            ));
        }
        if sim.ticks_per_run == 0 {
            return Err(invalid("sim.ticks_per_run", "must be at least 1"));
        }
        if sim.runs_per_evaluation == 0 {
            return Err(invalid("sim.runs_per_evaluation", "must be at least 1"));
        }
        if sim.turn_angle <= 0 || 360 % sim.turn_angle != 0 {
            return Err(invalid(
                "sim.turn_angle",
                "must be a positive divisor of 360",
            ));
        }
        if !(sim.hit_distance > 0.0) {
            return Err(invalid("sim.hit_distance", "must be positive"));
        }
        if !(0..=180).contains(&sim.view_angle) {
            return Err(invalid("sim.view_angle", "must lie in [0, 180]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_with_missing_sections_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "[ga]\npopulation_size = 20\nnum_generations = 3\ncrossover_rate = 0.5\n\
             mutation_rate = 0.2\ntournament_size = 2\nmax_depth = 6\nseed = 7\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ga.population_size, 20);
        assert_eq!(config.ga.seed, Some(7));
        assert_eq!(config.ga.initial_population, None);
        assert_eq!(config.sim.ticks_per_run, 2000);
        assert_eq!(config.sim.view_angle, 30);
        assert_eq!(config.output.council_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[ga]\npopulation_size = \"many\"\n").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.ga.max_depth = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "ga.max_depth", .. })
        ));

        let mut config = Config::default();
        config.ga.max_depth = MAX_DECODE_DEPTH + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "ga.max_depth", .. })
        ));

        let mut config = Config::default();
        config.ga.crossover_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sim.turn_angle = 7;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "sim.turn_angle", .. })
        ));

        let mut config = Config::default();
        config.sim.hit_distance = 0.0;
        assert!(config.validate().is_err());
    }
}
