//! Single-player game.
//!
//! One agent driven by an external flap input. Passage is credited through the
//! obstacle's own `passed` flag and only the floor kills.

use crate::schema::GameConfig;

use super::agent::Agent;
use super::collision::{DeathCause, check_death, check_pass_shared};
use super::obstacle::ObstacleStream;

/// A single-player playthrough.
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    agent: Agent,
    stream: ObstacleStream,
    score: u32,
    ticks: u64,
    death: Option<DeathCause>,
}

impl Game {
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        Self {
            config: config.clone(),
            agent: Agent::spawn(config),
            stream: ObstacleStream::new(config, seed),
            score: 0,
            ticks: 0,
            death: None,
        }
    }

    /// Advance one tick. `flap` is the player's input for this tick.
    ///
    /// Returns false once the game is over.
    pub fn step(&mut self, flap: bool) -> bool {
        if self.is_over() {
            return false;
        }

        if flap {
            self.agent.apply_flap(&self.config.physics);
        }
        self.stream.step();
        self.agent.apply_gravity_step(&self.config.physics);

        if let Some(cause) = check_death(&self.agent, self.stream.iter(), &self.config, false) {
            self.agent.alive = false;
            self.death = Some(cause);
            log::debug!("game over at tick {}: {:?}", self.ticks + 1, cause);
        } else {
            for obstacle in self.stream.iter_mut() {
                if check_pass_shared(&self.agent, obstacle) {
                    self.score += 1;
                }
            }
        }

        self.ticks += 1;
        !self.is_over()
    }

    pub fn is_over(&self) -> bool {
        self.death.is_some()
    }

    pub fn death(&self) -> Option<DeathCause> {
        self.death
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn obstacles(&self) -> &ObstacleStream {
        &self.stream
    }
}
