//! Flappy Neuro - Headless Flappy Bird with neuroevolved controllers.
//!
//! This crate simulates the side-scrolling Flappy Bird game without any
//! rendering and trains populations of feed-forward network controllers to
//! play it with a genetic algorithm.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, genome and result types
//! - `compute`: Game simulation (physics, obstacles, collision, episodes) and
//!   evolution
//!
//! # Example
//!
//! ```rust,no_run
//! use flappy_neuro::{
//!     compute::{EpisodeOptions, FeedForwardFactory, evolution::EvolutionEngine, replay},
//!     schema::EvolutionConfig,
//! };
//!
//! // Load and validate configuration
//! let config = EvolutionConfig::load("flappy.json").unwrap();
//!
//! // Train a population
//! let mut engine = EvolutionEngine::new(config.clone()).unwrap();
//! let run = engine.train(|_| {}).unwrap();
//!
//! // Watch the champion play one more course
//! let factory = FeedForwardFactory::new(config.network.clone());
//! let summary = replay(
//!     &run.result.best.genome,
//!     &factory,
//!     &config.game,
//!     EpisodeOptions::default(),
//! )
//! .unwrap();
//!
//! println!("Champion cleared {} pipes", summary.score);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{Episode, EpisodeSummary, Game};
pub use schema::{EvolutionConfig, GameConfig, Genome};
