//! Sensor encoder: game state to the controller's input vector.

use crate::schema::{GameConfig, SENSOR_INPUTS};

use super::agent::Agent;
use super::obstacle::Obstacle;

/// Normalised inputs for one agent against one obstacle:
/// vertical offset to the gap centre, horizontal distance, velocity.
pub fn encode(agent: &Agent, obstacle: &Obstacle, config: &GameConfig) -> [f32; SENSOR_INPUTS] {
    [
        (obstacle.gap_center(&config.obstacles) - agent.y) / config.field_height,
        (obstacle.x - agent.x) / config.field_width,
        agent.velocity / config.velocity_normalizer,
    ]
}

/// First obstacle in spawn order the agent has not yet passed.
pub fn nearest_unpassed<'a, P>(
    obstacles: impl IntoIterator<Item = &'a Obstacle>,
    mut is_passed: P,
) -> Option<&'a Obstacle>
where
    P: FnMut(&Obstacle) -> bool,
{
    obstacles.into_iter().find(|obstacle| !is_passed(obstacle))
}
