use crate::config::{GaConfig, SimConfig};
use crate::evaluation::FitnessEvaluator;
use crate::program::generator::{same_arity_alternative, TreeGenerator};
use crate::program::Program;
use crate::rng::{create_rng, derive_seed};
use log::{debug, info, warn};
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Fitness of an individual that has not been evaluated yet, or whose simulation could not
/// even be set up
const UNEVALUATED: f64 = f64::NEG_INFINITY;

/// One program born during the evolution process together with its fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub program: Program,
    /// Averaged run score, `f64::NEG_INFINITY` until evaluated
    pub fitness: f64,
}

impl Individual {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            fitness: UNEVALUATED,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness != UNEVALUATED
    }
}

/// Summary of one generation, logged and kept in the run history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    /// Mean over the individuals whose simulation could be run
    pub average_fitness: f64,
    pub worst_fitness: f64,
    pub average_size: f64,
    pub average_depth: f64,
    pub placement_failures: usize,
}

/// Struct associated with the `evaluate_population` function, counting the individuals that
/// were simulated and those whose agents could not be placed.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PopulationEvaluationReport {
    pub evaluated: usize,
    pub placement_failures: usize,
}

/// Final population, ranked best first, and the statistics of every generation.
#[derive(Debug, Clone)]
pub struct EvolutionReport {
    pub population: Vec<Individual>,
    pub history: Vec<GenerationStats>,
    /// Seed the whole run can be reproduced from
    pub seed: u64,
}

/// Variation operators available to `mutate`, picked uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mutation {
    /// Swap a node's command for another of the same arity
    Point,
    /// Regrow the subtree below a node within the remaining depth
    Subtree,
    /// Replace a function node by one of its own children
    Shrink,
}

const MUTATIONS: [Mutation; 3] = [Mutation::Point, Mutation::Subtree, Mutation::Shrink];

/// Orchestrates the generational loop: evaluate, rank, keep the elite, then fill the next
/// generation through tournament selection, subtree crossover and mutation.
#[derive(Clone)]
pub struct EvolutionEngine<'a> {
    /// Reference to the user-defined config of the evolution run
    config: &'a GaConfig,
    /// Reference to the simulation parameters every individual is scored under
    sim_config: &'a SimConfig,
    generator: TreeGenerator,
    /// Owned population, replaced wholesale after every generation
    population: Vec<Individual>,
    /// Drives generation, selection, crossover and mutation
    rng: ChaCha12Rng,
    seed: u64,
    history: Vec<GenerationStats>,
}

impl<'a> EvolutionEngine<'a> {
    /// Creates a new EvolutionEngine instance
    ///
    /// # Arguments
    /// * `config` - Reference to a `GaConfig` holding the parameters of the evolution
    /// * `sim_config` - Reference to the `SimConfig` every fitness evaluation runs under
    ///
    /// # Returns
    /// * `Self` - An engine with an empty population. The run seed is `config.seed`, or a
    ///   fresh one drawn from the OS when the config leaves it out.
    pub fn new(config: &'a GaConfig, sim_config: &'a SimConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| {
            let seed = rand::rng().random::<u64>();
            info!("No seed configured, drew {} for this run", seed);
            seed
        });

        Self {
            config,
            sim_config,
            generator: TreeGenerator::new(config.max_depth),
            population: Vec::with_capacity(config.population_size),
            rng: create_rng(seed),
            seed,
            history: Vec::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Runs the evolution process
    ///
    /// The population is generated at random unless `seed_population` was called before.
    /// After the last generation the final population is evaluated once more and sorted.
    ///
    /// # Returns
    /// * `EvolutionReport` - The final population ranked best first and the per-generation
    ///   statistics
    pub fn evolve(&mut self) -> EvolutionReport {
        if self.population.is_empty() {
            info!(
                "Initializing population of size {}...",
                self.config.population_size
            );
            self.initialize_population();
        }

        for generation in 0..self.config.num_generations {
            info!(
                "--- Starting Generation {}/{} ---",
                generation + 1,
                self.config.num_generations
            );
            let report = self.evaluate_population(generation);
            self.rank();
            self.record_stats(generation, report);
            self.population = self.next_generation();
        }

        info!("--- Final Evaluation of Last Generation ---");
        let report = self.evaluate_population(self.config.num_generations);
        self.rank();
        self.record_stats(self.config.num_generations, report);

        info!("Evolution complete.");
        EvolutionReport {
            population: self.population.clone(),
            history: self.history.clone(),
            seed: self.seed,
        }
    }

    /// Fills the population with random programs bounded by `max_depth`.
    pub fn initialize_population(&mut self) {
        self.population = (0..self.config.population_size)
            .map(|_| Individual::new(self.generator.generate_tree(&mut self.rng)))
            .collect();
    }

    /// Uses previously saved programs as the starting population.
    ///
    /// Programs deeper than `max_depth` are dropped. A list longer than `population_size` is
    /// truncated, a shorter one is topped up with random programs. Every individual starts
    /// unevaluated.
    pub fn seed_population(&mut self, programs: Vec<Program>) {
        let max_depth = self.config.max_depth;
        let loaded = programs.len();
        let programs: Vec<Program> = programs
            .into_iter()
            .filter(|program| program.depth() <= max_depth)
            .collect();
        if programs.len() < loaded {
            warn!(
                "Dropped {} seed program(s) deeper than max_depth {}",
                loaded - programs.len(),
                max_depth
            );
        }

        let wanted = self.config.population_size;
        if programs.len() != wanted {
            warn!(
                "Seed population holds {} programs but population_size is {}; {}",
                programs.len(),
                wanted,
                if programs.len() > wanted {
                    "truncating"
                } else {
                    "topping up with random programs"
                }
            );
        }

        self.population = programs
            .into_iter()
            .take(wanted)
            .map(Individual::new)
            .collect();
        while self.population.len() < wanted {
            let program = self.generator.generate_tree(&mut self.rng);
            self.population.push(Individual::new(program));
        }
    }

    /// Evaluates every individual without a fitness yet, in parallel.
    ///
    /// Each individual draws its placements from its own stream seeded by the run seed, the
    /// generation and its slot, so results do not depend on thread scheduling.
    pub fn evaluate_population(&mut self, generation: usize) -> PopulationEvaluationReport {
        let work_items: Vec<(usize, Program)> = self
            .population
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.is_evaluated())
            .map(|(i, ind)| (i, ind.program.clone()))
            .collect();

        if work_items.is_empty() {
            return PopulationEvaluationReport::default();
        }

        let evaluator = FitnessEvaluator::new(self.sim_config);
        let seed = self.seed;
        let results: Vec<(usize, Option<f64>)> = work_items
            .par_iter()
            .map(|(i, program)| {
                let mut rng = create_rng(derive_seed(seed, generation, *i));
                match evaluator.evaluate(program, &mut rng) {
                    Ok(report) => (*i, Some(report.fitness)),
                    Err(e) => {
                        debug!("Simulation setup failed for slot {}: {}", i, e);
                        (*i, None)
                    }
                }
            })
            .collect();

        let mut report = PopulationEvaluationReport::default();
        for (i, fitness) in results {
            report.evaluated += 1;
            match fitness {
                Some(fitness) => self.population[i].fitness = fitness,
                None => {
                    self.population[i].fitness = UNEVALUATED;
                    report.placement_failures += 1;
                }
            }
        }
        report
    }

    /// Stable sort, best first.
    fn rank(&mut self) {
        self.population.sort_by(|a, b| {
            b.fitness
                .partial_cmp(&a.fitness)
                .unwrap_or(Ordering::Equal)
        });
    }

    fn record_stats(&mut self, generation: usize, report: PopulationEvaluationReport) {
        let stats = self.stats(generation, report.placement_failures);
        info!(
            "Gen {}: Best Fitness={:.4} | Avg Fitness={:.4} | Worst Fitness={:.4} | Avg Size={:.1} | Avg Depth={:.1} | Placement Fails={}",
            generation + 1,
            stats.best_fitness,
            stats.average_fitness,
            stats.worst_fitness,
            stats.average_size,
            stats.average_depth,
            stats.placement_failures
        );
        self.history.push(stats);
    }

    fn stats(&self, generation: usize, placement_failures: usize) -> GenerationStats {
        let count = self.population.len().max(1) as f64;
        let scored: Vec<f64> = self
            .population
            .iter()
            .map(|ind| ind.fitness)
            .filter(|f| f.is_finite())
            .collect();
        let average_fitness = if scored.is_empty() {
            UNEVALUATED
        } else {
            scored.iter().sum::<f64>() / scored.len() as f64
        };

        GenerationStats {
            generation,
            best_fitness: scored.iter().copied().fold(UNEVALUATED, f64::max),
            average_fitness,
            worst_fitness: scored.iter().copied().reduce(f64::min).unwrap_or(UNEVALUATED),
            average_size: self
                .population
                .iter()
                .map(|ind| ind.program.size())
                .sum::<usize>() as f64
                / count,
            average_depth: self
                .population
                .iter()
                .map(|ind| ind.program.depth())
                .sum::<usize>() as f64
                / count,
            placement_failures,
        }
    }

    /// Builds the next generation from a ranked population.
    ///
    /// The rank-0 individual is carried over unchanged. The remaining slots are filled pair by
    /// pair from tournament winners, recombined with probability `crossover_rate` and each
    /// mutated with probability `mutation_rate`. Offspring that come out structurally unchanged
    /// keep their parent's fitness.
    fn next_generation(&mut self) -> Vec<Individual> {
        let mut next_generation = Vec::with_capacity(self.config.population_size);
        if let Some(best) = self.population.first() {
            // Preserve it for next generation (exploitation)
            next_generation.push(best.clone());
        }

        while next_generation.len() < self.config.population_size {
            let first = self.select_parent();
            let second = self.select_parent();
            let parent1 = self.population[first].clone();
            let parent2 = self.population[second].clone();

            let mut children = if self.rng.random::<f64>() < self.config.crossover_rate {
                match self.crossover(&parent1.program, &parent2.program) {
                    Some((child1, child2)) => [Individual::new(child1), Individual::new(child2)],
                    None => [parent1, parent2],
                }
            } else {
                [parent1, parent2]
            };

            for child in children.iter_mut() {
                if self.rng.random::<f64>() < self.config.mutation_rate
                    && self.mutate(&mut child.program)
                {
                    child.fitness = UNEVALUATED;
                }
            }

            // Add the children to the next generation, up to capacity.
            let remaining_slots = self.config.population_size - next_generation.len();
            next_generation.extend(children.into_iter().take(remaining_slots));
        }
        next_generation
    }

    /// Tournament selection with replacement.
    ///
    /// Samples `tournament_size` slots uniformly and returns the fittest; on equal fitness the
    /// contestant drawn first wins.
    fn select_parent(&mut self) -> usize {
        let len = self.population.len();
        let mut winner = self.rng.random_range(0..len);
        for _ in 1..self.config.tournament_size {
            let contestant = self.rng.random_range(0..len);
            if self.population[contestant].fitness > self.population[winner].fitness {
                winner = contestant;
            }
        }
        winner
    }

    /// Subtree crossover
    ///
    /// Picks one node in each parent independently and swaps the subtrees rooted there.
    ///
    /// # Returns
    /// * `Option<(Program, Program)>` - The two offspring, or `None` when either would exceed
    ///   `max_depth`, in which case the caller keeps the parents unchanged
    fn crossover(&mut self, parent1: &Program, parent2: &Program) -> Option<(Program, Program)> {
        let mut child1 = parent1.clone();
        let mut child2 = parent2.clone();
        let point1 = self.rng.random_range(0..child1.size());
        let point2 = self.rng.random_range(0..child2.size());

        let subtree1 = child1.subtree(point1)?.clone();
        let subtree2 = child2.subtree(point2)?.clone();
        child1.replace_subtree(point1, subtree2)?;
        child2.replace_subtree(point2, subtree1)?;

        if child1.depth() > self.config.max_depth || child2.depth() > self.config.max_depth {
            return None;
        }
        Some((child1, child2))
    }

    /// Applies one mutation operator, picked uniformly, at a random node.
    ///
    /// # Returns
    /// * `bool` - whether the program changed. Point mutation of PROGN3 and shrink mutation
    ///   of a terminal leave it as it was.
    fn mutate(&mut self, program: &mut Program) -> bool {
        let index = self.rng.random_range(0..program.size());
        let Some(node) = program.subtree(index) else {
            return false;
        };

        match MUTATIONS[self.rng.random_range(0..MUTATIONS.len())] {
            Mutation::Point => match same_arity_alternative(&mut self.rng, node.command()) {
                Some(command) => program.set_command(index, command),
                None => false,
            },
            Mutation::Subtree => {
                if index == 0 {
                    *program = self.generator.generate_tree(&mut self.rng);
                    return true;
                }
                let level = program.level_of(index).unwrap_or(self.config.max_depth);
                let levels = self.config.max_depth.saturating_sub(level) + 1;
                let subtree = self.generator.grow(&mut self.rng, levels);
                program.replace_subtree(index, subtree).is_some()
            }
            Mutation::Shrink => {
                let children = node.children();
                if children.is_empty() {
                    return false;
                }
                let child = children[self.rng.random_range(0..children.len())].clone();
                program.replace_subtree(index, child).is_some()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::tests::arity_holds;

    fn test_config() -> GaConfig {
        GaConfig {
            population_size: 12,
            num_generations: 3,
            crossover_rate: 0.8,
            mutation_rate: 0.2,
            tournament_size: 3,
            max_depth: 6,
            seed: Some(1234),
            initial_population: None,
        }
    }

    fn sim_config() -> SimConfig {
        SimConfig {
            ticks_per_run: 150,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_initialize_population() {
        let config = test_config();
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        engine.initialize_population();

        assert_eq!(engine.population.len(), config.population_size);
        for individual in &engine.population {
            assert!(!individual.is_evaluated());
            assert!(individual.program.depth() <= config.max_depth);
            assert!(arity_holds(&individual.program));
        }
    }

    #[test]
    fn test_evaluate_population_scores_only_unevaluated() {
        let config = test_config();
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        engine.initialize_population();

        let report = engine.evaluate_population(0);
        assert_eq!(report.evaluated, config.population_size);
        assert_eq!(report.placement_failures, 0);
        assert!(engine.population.iter().all(Individual::is_evaluated));

        let again = engine.evaluate_population(1);
        assert_eq!(again.evaluated, 0);
    }

    #[test]
    fn test_crossover_conserves_nodes() {
        let config = test_config();
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        let generator = TreeGenerator::new(config.max_depth);
        let mut rng = create_rng(8);

        let mut swapped = 0;
        for _ in 0..200 {
            let parent1 = generator.generate_tree(&mut rng);
            let parent2 = generator.generate_tree(&mut rng);
            if let Some((child1, child2)) = engine.crossover(&parent1, &parent2) {
                swapped += 1;
                assert_eq!(child1.size() + child2.size(), parent1.size() + parent2.size());
                assert!(child1.depth() <= config.max_depth);
                assert!(child2.depth() <= config.max_depth);
                assert!(arity_holds(&child1) && arity_holds(&child2));
            }
        }
        assert!(swapped > 0);
    }

    #[test]
    fn test_crossover_rejects_too_deep_offspring() {
        let config = GaConfig {
            max_depth: 3,
            ..test_config()
        };
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        // depth 3 each; swapping the deep branch of one into the leaf of the other goes past 3
        let parent1: Program = "2F2LR".parse().unwrap();
        let parent2: Program = "2A2LR".parse().unwrap();
        for _ in 0..100 {
            if let Some((child1, child2)) = engine.crossover(&parent1, &parent2) {
                assert!(child1.depth() <= 3 && child2.depth() <= 3);
            }
        }
    }

    #[test]
    fn test_mutation_keeps_arity_and_depth() {
        let config = test_config();
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        let generator = TreeGenerator::new(config.max_depth);
        let mut rng = create_rng(17);

        let mut changed = 0;
        for _ in 0..300 {
            let mut program = generator.generate_tree(&mut rng);
            if engine.mutate(&mut program) {
                changed += 1;
            }
            assert!(arity_holds(&program));
            assert!(program.depth() <= config.max_depth);
        }
        assert!(changed > 0);
    }

    #[test]
    fn test_tournament_prefers_fitter_and_first_on_ties() {
        let config = GaConfig {
            tournament_size: 500,
            ..test_config()
        };
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        engine.initialize_population();
        for (i, individual) in engine.population.iter_mut().enumerate() {
            individual.fitness = i as f64;
        }
        // 500 draws over 12 slots sample the best one with overwhelming probability
        let last = config.population_size - 1;
        assert_eq!(engine.select_parent(), last);

        for individual in engine.population.iter_mut() {
            individual.fitness = 7.0;
        }
        let mut replay = engine.rng.clone();
        let first_drawn = replay.random_range(0..config.population_size);
        assert_eq!(engine.select_parent(), first_drawn);
    }

    #[test]
    fn test_next_generation_keeps_size_and_elite() {
        let config = test_config();
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        engine.initialize_population();
        engine.evaluate_population(0);
        engine.rank();

        let elite = engine.population[0].clone();
        let next = engine.next_generation();
        assert_eq!(next.len(), config.population_size);
        assert_eq!(next[0], elite);
    }

    #[test]
    fn test_without_variation_the_best_persists() {
        let config = GaConfig {
            crossover_rate: 0.0,
            mutation_rate: 0.0,
            num_generations: 4,
            ..test_config()
        };
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);
        engine.initialize_population();
        engine.evaluate_population(0);
        engine.rank();
        let champion = engine.population[0].clone();

        let report = engine.evolve();
        assert_eq!(report.history.len(), config.num_generations + 1);
        assert!(report
            .history
            .iter()
            .all(|stats| stats.best_fitness == champion.fitness));
        assert_eq!(report.population[0].program, champion.program);
        assert_eq!(report.population[0].fitness, champion.fitness);
    }

    #[test]
    fn test_evolve_is_reproducible_per_seed() {
        let config = test_config();
        let sim = sim_config();
        let first = EvolutionEngine::new(&config, &sim).evolve();
        let second = EvolutionEngine::new(&config, &sim).evolve();

        assert_eq!(first.seed, 1234);
        assert_eq!(first.population, second.population);
        assert_eq!(first.history, second.history);
        assert_eq!(first.population.len(), config.population_size);
        assert!(first
            .population
            .windows(2)
            .all(|w| w[0].fitness >= w[1].fitness));
    }

    #[test]
    fn test_seed_population_pads_and_truncates() {
        let config = test_config();
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);

        engine.seed_population(vec!["2FA".parse().unwrap(); 3]);
        assert_eq!(engine.population.len(), config.population_size);
        assert_eq!(engine.population[0].program.encode(), "2FA");

        engine.seed_population(vec!["2FA".parse().unwrap(); 30]);
        assert_eq!(engine.population.len(), config.population_size);
        assert!(engine.population.iter().all(|i| i.program.encode() == "2FA"));
    }

    #[test]
    fn test_seed_population_drops_too_deep_programs() {
        let config = test_config();
        let sim = sim_config();
        let mut engine = EvolutionEngine::new(&config, &sim);

        let functions = config.max_depth;
        let too_deep: Program = format!("{}F{}", "2".repeat(functions), "L".repeat(functions))
            .parse()
            .unwrap();
        assert!(too_deep.depth() > config.max_depth);

        engine.seed_population(vec![too_deep, "2FA".parse().unwrap()]);
        assert_eq!(engine.population.len(), config.population_size);
        assert_eq!(engine.population[0].program.encode(), "2FA");
        assert!(engine
            .population
            .iter()
            .all(|i| i.program.depth() <= config.max_depth));
    }
}
