//! Evolution configuration types for training game controllers.
//!
//! This module configures the neuroevolution loop: network topology, genetic
//! algorithm hyperparameters, population settings and the per-episode budget.
//! The game configuration is carried through unmodified.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, GameConfig, SENSOR_INPUTS};

/// Top-level configuration for a training run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionConfig {
    /// Game the population is evaluated in.
    #[serde(default)]
    pub game: GameConfig,
    /// Controller network topology.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Genetic algorithm hyperparameters.
    #[serde(default)]
    pub algorithm: GeneticAlgorithmConfig,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Episode budget.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Genome constraints (weight bounds).
    #[serde(default)]
    pub constraints: GenomeConstraints,
    /// Champion archive configuration.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Activation applied at every non-input neuron.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Activation {
    Sigmoid,
    #[default]
    Tanh,
    Relu,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Relu => x.max(0.0),
        }
    }
}

/// Feed-forward controller topology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Number of inputs (must match the sensor vector).
    #[serde(default = "default_inputs")]
    pub inputs: usize,
    /// Number of outputs. Output 0 drives the flap decision.
    #[serde(default = "default_outputs")]
    pub outputs: usize,
    /// Hidden layer widths, input side first. Empty = direct connections.
    #[serde(default)]
    pub hidden_layers: Vec<usize>,
    /// Activation function.
    #[serde(default)]
    pub activation: Activation,
    /// Output 0 above this value means flap.
    #[serde(default = "default_flap_threshold")]
    pub flap_threshold: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            inputs: default_inputs(),
            outputs: default_outputs(),
            hidden_layers: Vec::new(),
            activation: Activation::default(),
            flap_threshold: default_flap_threshold(),
        }
    }
}

fn default_inputs() -> usize {
    SENSOR_INPUTS
}
fn default_outputs() -> usize {
    1
}
fn default_flap_threshold() -> f32 {
    0.5
}

impl NetworkConfig {
    /// Layer widths from input to output.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(self.inputs);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(self.outputs);
        sizes
    }

    /// Number of genes needed: weights plus one bias per non-input neuron.
    pub fn genome_len(&self) -> usize {
        self.layer_sizes()
            .windows(2)
            .map(|pair| pair[0] * pair[1] + pair[1])
            .sum()
    }
}

/// Genetic algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f32,
    /// Mutation probability per gene (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    /// Standard deviation of Gaussian weight perturbation.
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f32,
    /// Probability per gene of replacing it with a fresh random value.
    #[serde(default = "default_replace_rate")]
    pub replace_rate: f32,
    /// Number of best individuals copied unchanged into the next generation.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::default(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            mutation_strength: default_mutation_strength(),
            replace_rate: default_replace_rate(),
            elitism: default_elitism(),
        }
    }
}

fn default_crossover_rate() -> f32 {
    0.75
}
fn default_mutation_rate() -> f32 {
    0.2
}
fn default_mutation_strength() -> f32 {
    0.5
}
fn default_replace_rate() -> f32 {
    0.02
}
fn default_elitism() -> usize {
    2
}

/// Selection method for genetic algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Rank-based selection.
    RankBased,
    /// Roulette wheel (fitness-proportionate) selection.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of genomes (and agents per episode).
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations evaluated.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once the best genome reaches this fitness.
    #[serde(default = "default_fitness_threshold")]
    pub fitness_threshold: Option<f32>,
    /// Stop if no improvement for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            fitness_threshold: default_fitness_threshold(),
            stagnation_limit: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    50
}
fn default_fitness_threshold() -> Option<f32> {
    Some(100.0)
}

/// Per-episode budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Stop an episode after this many ticks even if agents survive.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: Option<u64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
        }
    }
}

fn default_max_ticks() -> Option<u64> {
    Some(20_000)
}

/// Genome constraints (parameter bounds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConstraints {
    /// Range fresh genes are drawn from.
    #[serde(default = "default_init_bounds")]
    pub init_bounds: (f32, f32),
    /// Hard clamp applied after mutation.
    #[serde(default = "default_weight_bounds")]
    pub weight_bounds: (f32, f32),
}

impl Default for GenomeConstraints {
    fn default() -> Self {
        Self {
            init_bounds: default_init_bounds(),
            weight_bounds: default_weight_bounds(),
        }
    }
}

fn default_init_bounds() -> (f32, f32) {
    (-1.0, 1.0)
}
fn default_weight_bounds() -> (f32, f32) {
    (-30.0, 30.0)
}

/// Champion archive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Maximum number of champions kept.
    #[serde(default = "default_archive_size")]
    pub max_size: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_size: default_archive_size(),
        }
    }
}

fn default_archive_size() -> usize {
    10
}

/// Flat weight genome for a feed-forward controller.
///
/// Layout, layer by layer from the input side: the `inputs x outputs`
/// weights in row-major order (one row per target neuron), then one bias per
/// target neuron.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Genome {
    pub genes: Vec<f32>,
}

impl Genome {
    pub fn new(genes: Vec<f32>) -> Self {
        Self { genes }
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Progress update emitted once per generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number (0-based).
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best fitness seen so far.
    pub best_fitness: f32,
    /// Average fitness of current population.
    pub avg_fitness: f32,
    /// Best fitness this generation.
    pub generation_best: f32,
    /// Generations since last improvement.
    pub stagnation_count: usize,
    /// Current best candidate.
    pub best_candidate: Option<CandidateSnapshot>,
    /// Top N candidates for display.
    pub top_candidates: Vec<CandidateSnapshot>,
    /// Statistics history for plotting.
    pub history: EvolutionHistory,
    /// Current phase of the algorithm.
    pub phase: EvolutionPhase,
}

/// Snapshot of an evaluated candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Fitness score.
    pub fitness: f32,
    /// Controller weights.
    pub genome: Genome,
    /// Generation this candidate was created.
    pub generation: usize,
    /// Parent IDs (for genealogy).
    pub parents: Vec<u64>,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f32>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f32>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f32>,
    /// Diversity metric per generation.
    pub diversity: Vec<f32>,
}

/// Current phase of evolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Initializing population.
    #[default]
    Initializing,
    /// Evaluating candidates.
    Evaluating,
    /// Creating offspring.
    Reproducing,
    /// Evolution complete.
    Complete,
    /// Evolution stopped early.
    Stopped,
}

/// Final result of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best candidate found.
    pub best: CandidateSnapshot,
    /// Best-first champions from the archive.
    pub champions: Vec<CandidateSnapshot>,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations evaluated.
    pub generations: usize,
    /// Total genome evaluations performed.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f32,
    /// Average fitness of final population.
    pub final_avg_fitness: f32,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached the fitness threshold.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// Quit signal raised.
    Cancelled,
}

// ============================================================================
// Validation and loading
// ============================================================================

/// Evolution configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Maximum generations must be positive")]
    NoGenerations,
    #[error("Invalid rate: {0}")]
    InvalidRate(String),
    #[error("Invalid parameter bounds: {0}")]
    InvalidBounds(String),
    #[error("Invalid network topology: {0}")]
    InvalidTopology(String),
    #[error("Elitism ({elitism}) must be smaller than population size ({size})")]
    ElitismTooLarge { elitism: usize, size: usize },
    #[error("Game config validation failed: {0}")]
    GameConfigError(#[from] ConfigError),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl EvolutionConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, EvolutionConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EvolutionConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.game.validate()?;

        if self.population.size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if self.population.max_generations == 0 {
            return Err(EvolutionConfigError::NoGenerations);
        }
        if self.algorithm.elitism >= self.population.size {
            return Err(EvolutionConfigError::ElitismTooLarge {
                elitism: self.algorithm.elitism,
                size: self.population.size,
            });
        }
        if let SelectionMethod::Tournament { size: 0 } = self.algorithm.selection {
            return Err(EvolutionConfigError::InvalidRate(
                "tournament size must be positive".to_string(),
            ));
        }

        let check_rate = |rate: f32, name: &str| {
            if (0.0..=1.0).contains(&rate) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidRate(format!(
                    "{} ({}) must lie in [0, 1]",
                    name, rate
                )))
            }
        };
        check_rate(self.algorithm.crossover_rate, "crossover_rate")?;
        check_rate(self.algorithm.mutation_rate, "mutation_rate")?;
        check_rate(self.algorithm.replace_rate, "replace_rate")?;
        if self.algorithm.mutation_strength < 0.0 {
            return Err(EvolutionConfigError::InvalidRate(format!(
                "mutation_strength ({}) must be non-negative",
                self.algorithm.mutation_strength
            )));
        }

        let check_bounds = |bounds: (f32, f32), name: &str| {
            if bounds.0 > bounds.1 {
                Err(EvolutionConfigError::InvalidBounds(format!(
                    "{} min ({}) > max ({})",
                    name, bounds.0, bounds.1
                )))
            } else {
                Ok(())
            }
        };
        check_bounds(self.constraints.init_bounds, "init")?;
        check_bounds(self.constraints.weight_bounds, "weight")?;

        if self.network.inputs != SENSOR_INPUTS {
            return Err(EvolutionConfigError::InvalidTopology(format!(
                "expected {} inputs, got {}",
                SENSOR_INPUTS, self.network.inputs
            )));
        }
        if self.network.outputs == 0 {
            return Err(EvolutionConfigError::InvalidTopology(
                "at least one output is required".to_string(),
            ));
        }
        if self.network.hidden_layers.contains(&0) {
            return Err(EvolutionConfigError::InvalidTopology(
                "hidden layers must be non-empty".to_string(),
            ));
        }

        Ok(())
    }
}
