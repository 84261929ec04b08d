//! Collision and scoring oracle.
//!
//! Pure functions of agent and obstacle geometry; nothing here depends on
//! whether a frame is rendered.

use crate::schema::GameConfig;

use super::agent::Agent;
use super::obstacle::{Obstacle, ObstacleId, Rect};

/// Why an agent died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Floor,
    Ceiling,
    Obstacle(ObstacleId),
}

/// Agent bounding box.
#[inline]
pub fn agent_rect(agent: &Agent, config: &GameConfig) -> Rect {
    let (x, y, w, h) = agent.bounds(config);
    Rect::new(x, y, w, h)
}

/// True if the agent overlaps either segment of the obstacle.
pub fn check_collision(agent: &Agent, obstacle: &Obstacle, config: &GameConfig) -> bool {
    let rect = agent_rect(agent, config);
    rect.intersects(&obstacle.top_rect(&config.obstacles))
        || rect.intersects(&obstacle.bottom_rect(&config.obstacles))
}

/// Floor or (optionally) ceiling breach.
pub fn breaches_bounds(
    agent: &Agent,
    config: &GameConfig,
    ceiling_kills: bool,
) -> Option<DeathCause> {
    if agent.y + config.agent_size.1 >= config.ground_y {
        Some(DeathCause::Floor)
    } else if ceiling_kills && agent.y < 0.0 {
        Some(DeathCause::Ceiling)
    } else {
        None
    }
}

/// Full death check against the field and every live obstacle.
pub fn check_death<'a>(
    agent: &Agent,
    obstacles: impl IntoIterator<Item = &'a Obstacle>,
    config: &GameConfig,
    ceiling_kills: bool,
) -> Option<DeathCause> {
    breaches_bounds(agent, config, ceiling_kills).or_else(|| {
        obstacles
            .into_iter()
            .find(|obstacle| check_collision(agent, obstacle, config))
            .map(|obstacle| DeathCause::Obstacle(obstacle.id))
    })
}

/// The obstacle's left edge has reached the agent.
#[inline]
pub fn has_cleared(agent: &Agent, obstacle: &Obstacle) -> bool {
    obstacle.x <= agent.x
}

/// Per-agent record of the obstacles already credited.
///
/// Obstacles are cleared in spawn order, so a high-water mark over
/// [`ObstacleId`] is enough to remember every (agent, obstacle) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTracker {
    next: ObstacleId,
}

impl Default for PassTracker {
    fn default() -> Self {
        Self {
            next: ObstacleId(0),
        }
    }
}

impl PassTracker {
    /// True exactly once per obstacle: the first call after it is cleared.
    pub fn check_pass(&mut self, agent: &Agent, obstacle: &Obstacle) -> bool {
        if self.is_passed(obstacle.id) || !has_cleared(agent, obstacle) {
            return false;
        }
        self.next = obstacle.id.next();
        true
    }

    #[inline]
    pub fn is_passed(&self, id: ObstacleId) -> bool {
        id < self.next
    }
}

/// Shared-flag variant: the first agent to clear an obstacle takes the credit
/// and blocks everyone else.
pub fn check_pass_shared(agent: &Agent, obstacle: &mut Obstacle) -> bool {
    if obstacle.passed || !has_cleared(agent, obstacle) {
        return false;
    }
    obstacle.passed = true;
    true
}
