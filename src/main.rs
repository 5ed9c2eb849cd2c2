use robot_follower::config::Config;
use robot_follower::evaluation::FitnessEvaluator;
use robot_follower::evolution::{EvolutionEngine, EvolutionReport};
use robot_follower::export::render::save_track_image;
use robot_follower::export::{
    read_export_from_json, write_export_to_json, ExportConfig, ExportError, PopulationExport,
};
use robot_follower::program::Program;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// Loads the programs of a previous run to start evolution from.
///
/// # Arguments
/// * `path` - Path to a population export written by an earlier run
///
/// # Returns
/// * `Ok(Vec<Program>)` - The saved programs, best first
/// * `Err(ExportError)` - If the file cannot be read or holds an invalid program
fn load_seed_population(path: &Path) -> Result<Vec<Program>, ExportError> {
    log::info!("Loading initial population from '{}'...", path.display());
    let export = read_export_from_json(path)?;
    let programs = export.programs()?;
    log::info!(
        "Loaded {} programs (schema {}, seed {}).",
        programs.len(),
        export.schema_version,
        export.seed
    );
    Ok(programs)
}

/// Writes the population export and, if enabled, the champion's replayed trajectory.
fn save_outputs(config: &Config, report: &EvolutionReport) -> Result<(), ExportError> {
    let directory = PathBuf::from(&config.output.directory);
    fs::create_dir_all(&directory)?;
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    let export = PopulationExport::new(
        report,
        ExportConfig {
            ga: config.ga.clone(),
            sim: config.sim.clone(),
        },
        config.output.council_size,
    );
    let export_path = directory.join(format!("population_{}.json", stamp));
    write_export_to_json(&export, &export_path)?;
    log::info!(
        "Exported {} individuals to '{}'.",
        export.individuals.len(),
        export_path.display()
    );

    if !config.output.render_best_track {
        return Ok(());
    }
    let Some(champion) = report.population.first() else {
        return Ok(());
    };
    let evaluator = FitnessEvaluator::new(&config.sim);
    match evaluator.replay(&champion.program, report.seed) {
        Ok((run, tracks)) => {
            let image_path = directory.join(format!("best_track_{}.png", stamp));
            save_track_image(&tracks, &image_path)?;
            log::info!(
                "Champion replay: {} hit(s), penalty {:.4}, {} steps. Track saved to '{}'.",
                run.hits,
                run.penalty,
                run.steps,
                image_path.display()
            );
        }
        Err(e) => log::warn!("Champion replay could not be set up: {}", e),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Booting robot follower...");

    // 1. Load and Validate Configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = match Config::load(Path::new(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load configuration '{}': {}", config_path, e);
            process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    log::info!("Configuration loaded and validated.");

    // 2. Prepare the engine, optionally from a saved population
    let mut engine = EvolutionEngine::new(&config.ga, &config.sim);
    log::info!("Run seed: {}", engine.seed());
    if let Some(path) = &config.ga.initial_population {
        match load_seed_population(Path::new(path)) {
            Ok(programs) => engine.seed_population(programs),
            Err(e) => {
                log::error!("Failed to load initial population: {}", e);
                process::exit(1);
            }
        }
    }

    // 3. Run the Evolution
    log::info!("--- Starting Evolution ---");
    let report = engine.evolve();

    log::info!("Top 5 Champions:");
    for (i, champion) in report.population.iter().take(5).enumerate() {
        println!(
            "\n[Rank {}] Fitness: {:.4} | Size: {} | Depth: {}",
            i + 1,
            champion.fitness,
            champion.program.size(),
            champion.program.depth()
        );
        println!("{}", champion.program);
    }

    // 4. Persist the results
    if let Err(e) = save_outputs(&config, &report) {
        log::error!("Failed to save results: {}", e);
        process::exit(1);
    }
}
