//! Population export for inspecting a finished run and restarting evolution from it.
//!
//! A run is saved as one JSON document holding the configuration and seed it was produced
//! with, the per-generation statistics, and the top ranked programs in their preorder
//! character encoding.

pub mod render;

use crate::config::{GaConfig, SimConfig};
use crate::evolution::{EvolutionReport, GenerationStats};
use crate::program::{Program, ProgramError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to access export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize export: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid program at rank {rank}: {source}")]
    InvalidProgram { rank: usize, source: ProgramError },
    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// Snapshot of a finished run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PopulationExport {
    /// Schema version for forward/backward compatibility
    pub schema_version: String,
    /// Unix timestamp when the export was generated
    pub generated_at: u64,
    /// Seed the run was started from
    pub seed: u64,
    pub config: ExportConfig,
    pub history: Vec<GenerationStats>,
    /// Top ranked individuals, best first
    pub individuals: Vec<IndividualData>,
}

/// Subset of configuration needed to reproduce the run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportConfig {
    pub ga: GaConfig,
    pub sim: SimConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndividualData {
    /// Rank within the final population (1 = best)
    pub rank: usize,
    /// `None` when the individual could not be evaluated
    pub fitness: Option<f64>,
    pub size: usize,
    pub depth: usize,
    /// Preorder encoding, see `program::codec`
    pub program: String,
}

impl PopulationExport {
    /// Builds an export of the best `council_size` individuals of a finished run.
    ///
    /// # Arguments
    /// * `report` - Result of `EvolutionEngine::evolve`, population already ranked
    /// * `config` - Configuration snapshot stored alongside the programs
    /// * `council_size` - Number of top individuals kept
    pub fn new(report: &EvolutionReport, config: ExportConfig, council_size: usize) -> Self {
        let individuals = report
            .population
            .iter()
            .take(council_size)
            .enumerate()
            .map(|(i, ind)| IndividualData {
                rank: i + 1,
                fitness: ind.fitness.is_finite().then_some(ind.fitness),
                size: ind.program.size(),
                depth: ind.program.depth(),
                program: ind.program.encode(),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().timestamp() as u64,
            seed: report.seed,
            config,
            history: report.history.clone(),
            individuals,
        }
    }

    /// Decodes every stored program, in rank order.
    ///
    /// # Errors
    /// * `InvalidProgram` - for the first program whose encoding does not decode
    pub fn programs(&self) -> Result<Vec<Program>, ExportError> {
        self.individuals
            .iter()
            .map(|ind| {
                ind.program
                    .parse::<Program>()
                    .map_err(|source| ExportError::InvalidProgram {
                        rank: ind.rank,
                        source,
                    })
            })
            .collect()
    }
}

/// Writes a population export to a JSON file.
pub fn write_export_to_json(
    export: &PopulationExport,
    output_path: &Path,
) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(output_path, json)?;
    Ok(())
}

/// Reads a population export from a JSON file.
pub fn read_export_from_json(input_path: &Path) -> Result<PopulationExport, ExportError> {
    let content = std::fs::read_to_string(input_path)?;
    let export: PopulationExport = serde_json::from_str(&content)?;
    Ok(export)
}
