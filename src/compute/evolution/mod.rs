//! Neuroevolution of game controllers.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): random generation, crossover, and mutation
//! - **Search** (`search`): the generational genetic algorithm
//! - **Champion Archive** (`archive`): storage and export of the best controllers
//!
//! The engine only sees genomes and fitness values. Fitness comes from a
//! callback that must assign a value to every candidate each generation;
//! [`EvolutionEngine::train`] wires it to
//! [`evaluate_genomes`](crate::compute::evaluate_genomes).
//!
//! # Example
//!
//! ```rust,no_run
//! use flappy_neuro::compute::evolution::EvolutionEngine;
//! use flappy_neuro::schema::EvolutionConfig;
//!
//! let config = EvolutionConfig::default();
//! let mut engine = EvolutionEngine::new(config).unwrap();
//! let run = engine
//!     .train(|progress| {
//!         println!(
//!             "Generation {}: best fitness = {:.2}",
//!             progress.generation, progress.best_fitness
//!         );
//!     })
//!     .unwrap();
//!
//! println!("Best controller fitness: {:.2}", run.result.best.fitness);
//! ```

mod archive;
mod genome;
mod search;

pub use archive::{
    ArchiveError, ArchivedChampion, ChampionArchive, ChampionExport, ChampionMetadata,
    load_champion, load_from_dir,
};
pub use genome::{GenomeRng, genome_distance};
pub use search::{Candidate, EvolutionEngine, TrainingRun};

use crate::compute::episode::EpisodeError;
use crate::schema::{CandidateSnapshot, EvolutionConfig, EvolutionConfigError};

/// Evolution errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid evolution config: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EpisodeError),
    #[error("Genome {id} was not assigned a fitness")]
    MissingFitness { id: u64 },
    #[error("Population is empty")]
    EmptyPopulation,
}

/// Drives generations of genomes through a fitness callback.
pub trait EvolutionDriver {
    /// Evolve for at most `max_generations` and return the best candidate.
    fn run<E>(
        &mut self,
        evaluate: E,
        max_generations: usize,
    ) -> Result<CandidateSnapshot, EvolutionError>
    where
        E: FnMut(&mut [Candidate], &EvolutionConfig) -> Result<(), EvolutionError>;
}
