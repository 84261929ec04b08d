//! Generational genetic algorithm over controller genomes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::prelude::*;

use crate::compute::episode::{EpisodeOptions, EpisodeSummary, evaluate_genomes};
use crate::compute::network::FeedForwardFactory;
use crate::schema::{
    CandidateSnapshot, EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionPhase,
    EvolutionProgress, EvolutionResult, EvolutionStats, Genome, SelectionMethod, StopReason,
};

use super::archive::ChampionArchive;
use super::genome::{GenomeRng, genome_distance};
use super::{EvolutionDriver, EvolutionError};

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// The genome.
    pub genome: Genome,
    /// Fitness from the last evaluation; `None` until evaluated.
    pub fitness: Option<f32>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Candidate {
    pub fn new(id: u64, genome: Genome) -> Self {
        Self {
            id,
            genome,
            fitness: None,
            generation: 0,
            parents: Vec::new(),
        }
    }

    /// Fitness, reading an unevaluated candidate as zero.
    #[inline]
    pub fn score(&self) -> f32 {
        self.fitness.unwrap_or(0.0)
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> CandidateSnapshot {
        CandidateSnapshot {
            id: self.id,
            fitness: self.score(),
            genome: self.genome.clone(),
            generation: self.generation,
            parents: self.parents.clone(),
        }
    }
}

/// Outcome of [`EvolutionEngine::train`].
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub result: EvolutionResult,
    /// One summary per generation.
    pub episodes: Vec<EpisodeSummary>,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    rng: GenomeRng,
    population: Vec<Candidate>,
    archive: ChampionArchive,
    history: EvolutionHistory,
    generation: usize,
    best: Option<Candidate>,
    best_fitness: f32,
    stagnation_count: usize,
    evaluations: u64,
    next_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine. The configuration is validated here so
    /// nothing is evaluated with a broken setup.
    pub fn new(config: EvolutionConfig) -> Result<Self, EvolutionError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let archive = ChampionArchive::new(
            config.archive.max_size,
            config.network.clone(),
            config.game.clone(),
        );

        Ok(Self {
            config,
            rng: GenomeRng::new(seed),
            population: Vec::new(),
            archive,
            history: EvolutionHistory::default(),
            generation: 0,
            best: None,
            best_fitness: f32::NEG_INFINITY,
            stagnation_count: 0,
            evaluations: 0,
            next_id: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    pub fn archive(&self) -> &ChampionArchive {
        &self.archive
    }

    pub fn archive_mut(&mut self) -> &mut ChampionArchive {
        &mut self.archive
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Initialize the population.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.history = EvolutionHistory::default();
        self.generation = 0;
        self.best = None;
        self.best_fitness = f32::NEG_INFINITY;
        self.stagnation_count = 0;
        self.evaluations = 0;

        for _ in 0..self.config.population.size {
            let genome = self
                .rng
                .random_genome(&self.config.network, &self.config.constraints);
            let id = self.next_id();
            self.population.push(Candidate::new(id, genome));
        }
    }

    /// Run the fitness callback on the whole population and check that every
    /// candidate came back with a fitness.
    fn evaluate_population<E>(&mut self, evaluate: &mut E) -> Result<(), EvolutionError>
    where
        E: FnMut(&mut [Candidate], &EvolutionConfig) -> Result<(), EvolutionError>,
    {
        for candidate in &mut self.population {
            candidate.fitness = None;
        }

        evaluate(&mut self.population, &self.config)?;

        if let Some(missing) = self.population.iter().find(|c| c.fitness.is_none()) {
            return Err(EvolutionError::MissingFitness { id: missing.id });
        }
        self.evaluations += self.population.len() as u64;
        Ok(())
    }

    /// Rank the evaluated population and update statistics.
    fn record_generation(&mut self) {
        self.population.sort_by(|a, b| b.score().total_cmp(&a.score()));

        let gen_best = self.population.first().map_or(0.0, Candidate::score);
        if gen_best > self.best_fitness {
            self.best_fitness = gen_best;
            self.best = self.population.first().cloned();
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        let avg_fitness = self.average_fitness();
        let variance: f32 = self
            .population
            .iter()
            .map(|c| (c.score() - avg_fitness).powi(2))
            .sum::<f32>()
            / self.population.len().max(1) as f32;

        let diversity = self.compute_diversity();
        self.history.best_fitness.push(gen_best);
        self.history.avg_fitness.push(avg_fitness);
        self.history.fitness_std.push(variance.sqrt());
        self.history.diversity.push(diversity);

        if let Some(champion) = self.population.first() {
            self.archive.add(champion.to_snapshot());
        }

        log::info!(
            "Generation {}: best {:.2}, avg {:.2}, std {:.2}",
            self.generation,
            gen_best,
            avg_fitness,
            variance.sqrt()
        );
    }

    fn average_fitness(&self) -> f32 {
        if self.population.is_empty() {
            0.0
        } else {
            self.population.iter().map(Candidate::score).sum::<f32>()
                / self.population.len() as f32
        }
    }

    /// Create the next generation from the ranked population.
    fn reproduce(&mut self) {
        let ga_config = self.config.algorithm.clone();
        let size = self.config.population.size;
        let mut next_gen = Vec::with_capacity(size);

        // Elitism: keep best individuals
        for elite in self.population.iter().take(ga_config.elitism) {
            next_gen.push(elite.clone());
        }

        while next_gen.len() < size {
            let idx1 = self.select_index(&ga_config.selection);
            let idx2 = self.select_index(&ga_config.selection);
            let parent1 = &self.population[idx1];
            let parent2 = &self.population[idx2];
            let parents = vec![parent1.id, parent2.id];

            let mut child = if self.rng.unit() < ga_config.crossover_rate {
                self.rng.crossover(&parent1.genome, &parent2.genome)
            } else {
                parent1.genome.clone()
            };

            self.rng.mutate(
                &mut child,
                ga_config.mutation_rate,
                ga_config.mutation_strength,
                ga_config.replace_rate,
                &self.config.constraints,
            );

            let id = self.next_id();
            next_gen.push(Candidate {
                id,
                genome: child,
                fitness: None,
                generation: self.generation + 1,
                parents,
            });
        }

        self.population = next_gen;
        self.generation += 1;
    }

    /// Select a parent index from the ranked population.
    fn select_index(&mut self, method: &SelectionMethod) -> usize {
        let len = self.population.len();
        match method {
            SelectionMethod::Tournament { size } => (0..*size)
                .map(|_| self.rng.index(len))
                .min()
                .unwrap_or(0),
            SelectionMethod::RankBased => {
                // Probability proportional to rank
                let total_rank = len * (len + 1) / 2;
                let mut target = (self.rng.unit() * total_rank as f32) as usize;
                for i in 0..len {
                    let rank = len - i;
                    if target < rank {
                        return i;
                    }
                    target -= rank;
                }
                0
            }
            SelectionMethod::RouletteWheel => {
                let total: f32 = self.population.iter().map(|c| c.score().max(0.0)).sum();
                if total <= 0.0 {
                    return self.rng.index(len);
                }

                let target = self.rng.unit() * total;
                let mut cumulative = 0.0;
                for (i, candidate) in self.population.iter().enumerate() {
                    cumulative += candidate.score().max(0.0);
                    if cumulative >= target {
                        return i;
                    }
                }
                len - 1
            }
        }
    }

    /// Mean pairwise genome distance.
    fn compute_diversity(&self) -> f32 {
        let mut total_distance = 0.0f32;
        let mut count = 0;

        for (i, a) in self.population.iter().enumerate() {
            for b in &self.population[i + 1..] {
                total_distance += genome_distance(&a.genome, &b.genome);
                count += 1;
            }
        }

        if count > 0 {
            total_distance / count as f32
        } else {
            0.0
        }
    }

    /// Get current progress.
    pub fn progress(&self, phase: EvolutionPhase) -> EvolutionProgress {
        let gen_best = self
            .population
            .iter()
            .map(Candidate::score)
            .fold(f32::NEG_INFINITY, f32::max);

        let mut ranked: Vec<_> = self.population.iter().collect();
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));

        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.population.max_generations,
            best_fitness: self.best_fitness,
            avg_fitness: self.average_fitness(),
            generation_best: gen_best,
            stagnation_count: self.stagnation_count,
            best_candidate: self.best.as_ref().map(Candidate::to_snapshot),
            top_candidates: ranked.into_iter().take(5).map(Candidate::to_snapshot).collect(),
            history: self.history.clone(),
            phase,
        }
    }

    /// Check if evolution should stop after the current generation.
    fn should_stop(&self, max_generations: usize) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(target) = self.config.population.fitness_threshold
            && self.best_fitness >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        if self.generation + 1 >= max_generations {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Run evolution with an arbitrary fitness callback.
    ///
    /// Every generation the callback must assign a fitness to every
    /// candidate; one left unset aborts the run with
    /// [`EvolutionError::MissingFitness`]. A `max_generations` of zero is
    /// rejected before the callback is ever invoked.
    pub fn evolve<E, P>(
        &mut self,
        mut evaluate: E,
        max_generations: usize,
        mut on_progress: P,
    ) -> Result<EvolutionResult, EvolutionError>
    where
        E: FnMut(&mut [Candidate], &EvolutionConfig) -> Result<(), EvolutionError>,
        P: FnMut(&EvolutionProgress),
    {
        if max_generations == 0 {
            return Err(EvolutionConfigError::NoGenerations.into());
        }
        let start_time = Instant::now();

        self.initialize();
        on_progress(&self.progress(EvolutionPhase::Initializing));

        let stop_reason = loop {
            self.evaluate_population(&mut evaluate)?;
            self.record_generation();
            on_progress(&self.progress(EvolutionPhase::Evaluating));

            if let Some(reason) = self.should_stop(max_generations) {
                break reason;
            }

            on_progress(&self.progress(EvolutionPhase::Reproducing));
            self.reproduce();
        };

        let phase = match stop_reason {
            StopReason::Cancelled => EvolutionPhase::Stopped,
            _ => EvolutionPhase::Complete,
        };
        on_progress(&self.progress(phase));

        let best = self
            .best
            .as_ref()
            .map(Candidate::to_snapshot)
            .ok_or(EvolutionError::EmptyPopulation)?;

        log::info!(
            "Evolution stopped after {} generations ({:?}): best fitness {:.2}",
            self.generation + 1,
            stop_reason,
            best.fitness
        );

        Ok(EvolutionResult {
            best,
            champions: self.archive.snapshots(),
            stats: EvolutionStats {
                generations: self.generation + 1,
                total_evaluations: self.evaluations,
                best_fitness: self.best_fitness,
                final_avg_fitness: self.average_fitness(),
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Train feed-forward controllers in the configured game.
    ///
    /// Each generation plays one episode on a fresh course; the cancel handle
    /// also aborts a running episode at the next tick.
    pub fn train<P>(&mut self, on_progress: P) -> Result<TrainingRun, EvolutionError>
    where
        P: FnMut(&EvolutionProgress),
    {
        let factory = FeedForwardFactory::new(self.config.network.clone());
        let max_ticks = self.config.evaluation.max_ticks;
        let max_generations = self.config.population.max_generations;
        let cancel = self.cancel_handle();
        let mut courses = StdRng::seed_from_u64(self.rng.next_seed());
        let mut episodes = Vec::new();

        let evaluate = |candidates: &mut [Candidate],
                        config: &EvolutionConfig|
         -> Result<(), EvolutionError> {
            let options = EpisodeOptions {
                max_ticks,
                seed: courses.r#gen(),
                cancel: Some(Arc::clone(&cancel)),
            };
            let summary = evaluate_genomes(candidates, &factory, &config.game, options)?;
            log::debug!(
                "episode: {} ticks, score {}, {:?}",
                summary.ticks,
                summary.score,
                summary.termination
            );
            episodes.push(summary);
            Ok(())
        };

        let result = self.evolve(evaluate, max_generations, on_progress)?;
        Ok(TrainingRun { result, episodes })
    }
}

impl EvolutionDriver for EvolutionEngine {
    fn run<E>(
        &mut self,
        evaluate: E,
        max_generations: usize,
    ) -> Result<CandidateSnapshot, EvolutionError>
    where
        E: FnMut(&mut [Candidate], &EvolutionConfig) -> Result<(), EvolutionError>,
    {
        Ok(self.evolve(evaluate, max_generations, |_| {})?.best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EvaluationConfig, PopulationConfig};

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            population: PopulationConfig {
                size: 8,
                max_generations: 4,
                fitness_threshold: None,
                stagnation_limit: None,
            },
            evaluation: EvaluationConfig {
                max_ticks: Some(300),
            },
            random_seed: Some(11),
            ..Default::default()
        }
    }

    /// Fitness is the sum of genes; easy to climb.
    fn gene_sum(candidates: &mut [Candidate], _: &EvolutionConfig) -> Result<(), EvolutionError> {
        for candidate in candidates {
            candidate.fitness = Some(candidate.genome.genes.iter().sum());
        }
        Ok(())
    }

    #[test]
    fn test_evolution_engine_creation() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        engine.initialize();

        assert_eq!(engine.population().len(), 8);
        assert!(engine.population().iter().all(|c| c.fitness.is_none()));
        assert!(engine.population().iter().all(|c| c.genome.len() == 4));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.population.size = 1;
        assert!(matches!(
            EvolutionEngine::new(config),
            Err(EvolutionError::Config(_))
        ));
    }

    #[test]
    fn test_evolve_runs_all_generations() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        let mut phases = Vec::new();
        let result = engine
            .evolve(gene_sum, 4, |p| phases.push(p.phase.clone()))
            .unwrap();

        assert_eq!(result.stats.generations, 4);
        assert_eq!(result.stats.total_evaluations, 32);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.history.best_fitness.len(), 4);
        assert_eq!(phases.first(), Some(&EvolutionPhase::Initializing));
        assert_eq!(phases.last(), Some(&EvolutionPhase::Complete));
        assert!(!result.champions.is_empty());
    }

    #[test]
    fn test_elitism_keeps_best_fitness_monotone() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        let result = engine.evolve(gene_sum, 4, |_| {}).unwrap();

        let best = &result.history.best_fitness;
        assert!(best.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(result.best.fitness, result.stats.best_fitness);
    }

    #[test]
    fn test_missing_fitness_is_fatal() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        let err = engine
            .evolve(
                |candidates: &mut [Candidate], _: &EvolutionConfig| {
                    for candidate in candidates.iter_mut().skip(1) {
                        candidate.fitness = Some(1.0);
                    }
                    Ok(())
                },
                4,
                |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, EvolutionError::MissingFitness { .. }));
    }

    #[test]
    fn test_target_reached() {
        let mut config = small_config();
        config.population.fitness_threshold = Some(-100.0);
        let mut engine = EvolutionEngine::new(config).unwrap();
        let result = engine.evolve(gene_sum, 4, |_| {}).unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 1);
    }

    #[test]
    fn test_stagnation_stop() {
        let mut config = small_config();
        config.population.stagnation_limit = Some(2);
        let mut engine = EvolutionEngine::new(config).unwrap();
        let flat = |candidates: &mut [Candidate], _: &EvolutionConfig| {
            for candidate in candidates {
                candidate.fitness = Some(1.0);
            }
            Ok::<_, EvolutionError>(())
        };
        let result = engine.evolve(flat, 10, |_| {}).unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::Stagnation);
        assert_eq!(result.stats.generations, 3);
    }

    #[test]
    fn test_cancellation() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let run = engine.train(|_| {}).unwrap();
        assert_eq!(run.result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(run.result.stats.generations, 1);
        assert_eq!(run.episodes[0].ticks, 0);
    }

    #[test]
    fn test_train_plays_one_episode_per_generation() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        let run = engine.train(|_| {}).unwrap();

        assert_eq!(run.episodes.len(), run.result.stats.generations);
        assert!(run.episodes.iter().all(|e| e.ticks <= 300));
        assert!(run.result.best.fitness > 0.0);
    }

    #[test]
    fn test_driver_returns_best() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        let best = EvolutionDriver::run(&mut engine, gene_sum, 3).unwrap();
        assert_eq!(best.genome.len(), 4);
    }

    #[test]
    fn test_driver_rejects_zero_generations() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        let mut calls = 0;
        let counting = |candidates: &mut [Candidate], config: &EvolutionConfig| {
            calls += 1;
            gene_sum(candidates, config)
        };

        let err = EvolutionDriver::run(&mut engine, counting, 0).unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::Config(EvolutionConfigError::NoGenerations)
        ));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_selection_prefers_fitter() {
        let mut engine = EvolutionEngine::new(small_config()).unwrap();
        engine.initialize();
        for (i, candidate) in engine.population.iter_mut().enumerate() {
            candidate.fitness = Some(10.0 - i as f32);
        }

        let method = SelectionMethod::Tournament { size: 8 };
        let picks: Vec<usize> = (0..50).map(|_| engine.select_index(&method)).collect();
        let mean = picks.iter().sum::<usize>() as f32 / picks.len() as f32;
        assert!(mean < 3.5);

        let roulette: Vec<usize> = (0..50)
            .map(|_| engine.select_index(&SelectionMethod::RouletteWheel))
            .collect();
        assert!(roulette.iter().all(|&i| i < 8));
    }
}
