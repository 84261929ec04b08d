//! Population evaluation loop.
//!
//! An [`Episode`] owns the obstacle course and one live agent per genome. Each
//! [`Episode::step`] advances the whole population by a single tick in a fixed
//! order, so a given seed and set of controllers always replays identically.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::schema::{GameConfig, Genome, PassTracking};

use super::agent::Agent;
use super::collision::{PassTracker, check_death, check_pass_shared};
use super::evolution::Candidate;
use super::network::{DecisionFunction, NetworkError, NetworkFactory, wants_flap};
use super::obstacle::ObstacleStream;
use super::sensor::{encode, nearest_unpassed};

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Every agent died.
    AllDead,
    /// The tick budget ran out with agents still alive.
    TickBudget,
    /// The quit signal was raised.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    Running,
    Terminated(Termination),
}

/// Outcome of a finished episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Obstacles cleared by at least one agent.
    pub score: u32,
    pub termination: Termination,
    /// Highest fitness among all genomes.
    pub best_fitness: f32,
}

/// Per-episode options that are not part of the game itself.
#[derive(Debug, Clone, Default)]
pub struct EpisodeOptions {
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Seed for the obstacle course.
    pub seed: u64,
    /// Quit signal, checked once per tick.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Episode errors.
#[derive(Debug, thiserror::Error)]
pub enum EpisodeError {
    #[error("Failed to build controller for genome {id}: {source}")]
    Network {
        id: u64,
        #[source]
        source: NetworkError,
    },
}

/// A live agent paired with its controller.
struct Contestant<D> {
    genome_index: usize,
    agent: Agent,
    decision: D,
    tracker: PassTracker,
}

/// One simulated playthrough for a whole population.
pub struct Episode<D: DecisionFunction> {
    config: GameConfig,
    stream: ObstacleStream,
    live: Vec<Contestant<D>>,
    fitness: Vec<f32>,
    flap_threshold: f32,
    tick: u64,
    score: u32,
    options: EpisodeOptions,
    state: EpisodeState,
}

impl<D: DecisionFunction> Episode<D> {
    /// Start an episode on a freshly seeded obstacle course.
    pub fn new(
        config: &GameConfig,
        decisions: impl IntoIterator<Item = D>,
        flap_threshold: f32,
        options: EpisodeOptions,
    ) -> Self {
        let stream = ObstacleStream::new(config, options.seed);
        Self::with_stream(config, stream, decisions, flap_threshold, options)
    }

    /// Start an episode on a prepared obstacle course.
    pub fn with_stream(
        config: &GameConfig,
        stream: ObstacleStream,
        decisions: impl IntoIterator<Item = D>,
        flap_threshold: f32,
        options: EpisodeOptions,
    ) -> Self {
        let live: Vec<_> = decisions
            .into_iter()
            .enumerate()
            .map(|(genome_index, decision)| Contestant {
                genome_index,
                agent: Agent::spawn(config),
                decision,
                tracker: PassTracker::default(),
            })
            .collect();
        let fitness = vec![0.0; live.len()];
        let state = if live.is_empty() {
            EpisodeState::Terminated(Termination::AllDead)
        } else {
            EpisodeState::Running
        };

        Self {
            config: config.clone(),
            stream,
            live,
            fitness,
            flap_threshold,
            tick: 0,
            score: 0,
            options,
            state,
        }
    }

    fn cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn budget_spent(&self) -> bool {
        self.options.max_ticks.is_some_and(|max| self.tick >= max)
    }

    fn stop_on_budget(&mut self) {
        log::warn!(
            "tick budget of {} reached with {} agents alive",
            self.tick,
            self.live.len()
        );
        self.state = EpisodeState::Terminated(Termination::TickBudget);
    }

    /// Advance one tick.
    pub fn step(&mut self) -> EpisodeState {
        if self.state != EpisodeState::Running {
            return self.state;
        }
        if self.cancelled() {
            log::debug!("episode cancelled at tick {}", self.tick);
            self.state = EpisodeState::Terminated(Termination::Cancelled);
            return self.state;
        }
        if self.budget_spent() {
            self.stop_on_budget();
            return self.state;
        }

        self.stream.step();

        let Self {
            config,
            stream,
            live,
            fitness,
            flap_threshold,
            score,
            tick,
            ..
        } = self;
        let physics = &config.physics;
        let scoring = &config.scoring;

        for contestant in live.iter_mut() {
            let agent = &mut contestant.agent;
            let slot = &mut fitness[contestant.genome_index];

            agent.apply_gravity_step(physics);
            *slot += scoring.survival_reward;

            if let Some(cause) = check_death(agent, stream.iter(), config, config.ceiling_kills) {
                agent.alive = false;
                log::debug!(
                    "genome {} died at tick {} ({:?}), fitness {:.2}",
                    contestant.genome_index,
                    *tick + 1,
                    cause,
                    *slot
                );
                continue;
            }

            match config.pass_tracking {
                PassTracking::PerAgent => {
                    for obstacle in stream.iter_mut() {
                        if contestant.tracker.check_pass(agent, obstacle) {
                            *slot += scoring.pass_bonus;
                            if !obstacle.passed {
                                obstacle.passed = true;
                                *score += 1;
                            }
                        }
                    }
                }
                PassTracking::SharedObstacle => {
                    for obstacle in stream.iter_mut() {
                        if check_pass_shared(agent, obstacle) {
                            *slot += scoring.pass_bonus;
                            *score += 1;
                        }
                    }
                }
            }

            let tracker = &contestant.tracker;
            let target = match config.pass_tracking {
                PassTracking::PerAgent => {
                    nearest_unpassed(stream.iter(), |o| tracker.is_passed(o.id))
                }
                PassTracking::SharedObstacle => nearest_unpassed(stream.iter(), |o| o.passed),
            };
            if let Some(obstacle) = target {
                let inputs = encode(agent, obstacle, config);
                let outputs = contestant.decision.activate(&inputs);
                if wants_flap(&outputs, *flap_threshold) {
                    agent.apply_flap(physics);
                }
            }
        }

        live.retain(|contestant| contestant.agent.alive);
        *tick += 1;

        if self.live.is_empty() {
            self.state = EpisodeState::Terminated(Termination::AllDead);
        } else if self.budget_spent() {
            self.stop_on_budget();
        }
        self.state
    }

    /// Step until the episode terminates.
    pub fn run(&mut self) -> EpisodeSummary {
        let termination = loop {
            if let EpisodeState::Terminated(reason) = self.step() {
                break reason;
            }
        };
        log::debug!(
            "episode finished after {} ticks: score {}, {:?}",
            self.tick,
            self.score,
            termination
        );
        EpisodeSummary {
            ticks: self.tick,
            score: self.score,
            termination,
            best_fitness: self.fitness.iter().copied().fold(0.0, f32::max),
        }
    }

    /// Fitness per genome, in the order the controllers were supplied.
    pub fn fitness(&self) -> &[f32] {
        &self.fitness
    }

    /// Live agents with the index of the genome driving each.
    pub fn agents(&self) -> impl Iterator<Item = (usize, &Agent)> {
        self.live.iter().map(|c| (c.genome_index, &c.agent))
    }

    pub fn obstacles(&self) -> &ObstacleStream {
        &self.stream
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }
}

/// Fitness-evaluation callback: run one episode with every candidate and
/// assign each its fitness.
///
/// All controllers are built before the first tick, so a bad genome fails the
/// whole call and leaves every fitness unset.
pub fn evaluate_genomes<F: NetworkFactory>(
    candidates: &mut [Candidate],
    factory: &F,
    config: &GameConfig,
    options: EpisodeOptions,
) -> Result<EpisodeSummary, EpisodeError> {
    for candidate in candidates.iter_mut() {
        candidate.fitness = None;
    }

    let networks = candidates
        .iter()
        .map(|candidate| {
            factory
                .create_network(&candidate.genome)
                .map_err(|source| EpisodeError::Network {
                    id: candidate.id,
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut episode = Episode::new(config, networks, factory.flap_threshold(), options);
    let summary = episode.run();

    for (candidate, &fitness) in candidates.iter_mut().zip(episode.fitness()) {
        candidate.fitness = Some(fitness);
    }
    Ok(summary)
}

/// Run a single genome through one episode.
pub fn replay<F: NetworkFactory>(
    genome: &Genome,
    factory: &F,
    config: &GameConfig,
    options: EpisodeOptions,
) -> Result<EpisodeSummary, EpisodeError> {
    let network = factory
        .create_network(genome)
        .map_err(|source| EpisodeError::Network { id: 0, source })?;
    let mut episode = Episode::new(config, [network], factory.flap_threshold(), options);
    Ok(episode.run())
}
