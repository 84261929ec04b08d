//! Configuration types for the Flappy Bird game simulation.
//!
//! [`GameConfig`] is the simulation context: field geometry, physics and
//! obstacle constants, and the fitness rewards handed out by the scoring
//! oracle. It holds nothing related to rendering.

use serde::{Deserialize, Serialize};

/// Width of the sensor vector fed to every controller.
pub const SENSOR_INPUTS: usize = 3;

/// How obstacle passage is credited when several agents share a course.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PassTracking {
    /// Every agent earns the pass bonus once for every obstacle it clears.
    #[default]
    PerAgent,
    /// A single `passed` flag lives on the obstacle: only the first agent to
    /// clear it is credited.
    SharedObstacle,
}

/// Top-level game configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Width of the visible field (obstacles spawn at this x).
    #[serde(default = "default_field_width")]
    pub field_width: f32,
    /// Height of the visible field.
    #[serde(default = "default_field_height")]
    pub field_height: f32,
    /// Y coordinate of the ground line.
    #[serde(default = "default_ground_y")]
    pub ground_y: f32,
    /// Starting position of every agent (x, y).
    #[serde(default = "default_agent_start")]
    pub agent_start: (f32, f32),
    /// Agent bounding box (width, height).
    #[serde(default = "default_agent_size")]
    pub agent_size: (f32, f32),
    /// Physics constants.
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Obstacle stream constants.
    #[serde(default)]
    pub obstacles: ObstacleConfig,
    /// Fitness rewards.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Scale applied to agent velocity in the sensor vector.
    #[serde(default = "default_velocity_normalizer")]
    pub velocity_normalizer: f32,
    /// Whether leaving the top of the field kills an agent.
    #[serde(default = "default_ceiling_kills")]
    pub ceiling_kills: bool,
    /// Pass crediting mode.
    #[serde(default)]
    pub pass_tracking: PassTracking,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            field_width: default_field_width(),
            field_height: default_field_height(),
            ground_y: default_ground_y(),
            agent_start: default_agent_start(),
            agent_size: default_agent_size(),
            physics: PhysicsConfig::default(),
            obstacles: ObstacleConfig::default(),
            scoring: ScoringConfig::default(),
            velocity_normalizer: default_velocity_normalizer(),
            ceiling_kills: default_ceiling_kills(),
            pass_tracking: PassTracking::default(),
        }
    }
}

fn default_field_width() -> f32 {
    600.0
}
fn default_field_height() -> f32 {
    800.0
}
fn default_ground_y() -> f32 {
    730.0
}
fn default_agent_start() -> (f32, f32) {
    (200.0, 350.0)
}
fn default_agent_size() -> (f32, f32) {
    (68.0, 48.0)
}
fn default_velocity_normalizer() -> f32 {
    16.0
}
fn default_ceiling_kills() -> bool {
    true
}

/// Vertical motion constants.
///
/// Displacement per tick is `velocity * t + 0.5 * gravity * t^2`, where `t`
/// is the time since the last flap, clamped from above by `max_fall_speed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Amount `tick_count` advances per simulated tick.
    #[serde(default = "default_tick_increment")]
    pub tick_increment: f32,
    /// Downward acceleration.
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Magnitude of the upward velocity set by a flap.
    #[serde(default = "default_impulse")]
    pub impulse: f32,
    /// Upper clamp on downward displacement per tick.
    #[serde(default = "default_max_fall_speed")]
    pub max_fall_speed: f32,
    /// Tilt (degrees) while rising.
    #[serde(default = "default_max_rotation")]
    pub max_rotation: f32,
    /// Tilt decrease per tick while falling.
    #[serde(default = "default_rotation_velocity")]
    pub rotation_velocity: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tick_increment: default_tick_increment(),
            gravity: default_gravity(),
            impulse: default_impulse(),
            max_fall_speed: default_max_fall_speed(),
            max_rotation: default_max_rotation(),
            rotation_velocity: default_rotation_velocity(),
        }
    }
}

fn default_tick_increment() -> f32 {
    1.0
}
fn default_gravity() -> f32 {
    3.0
}
fn default_impulse() -> f32 {
    10.5
}
fn default_max_fall_speed() -> f32 {
    16.0
}
fn default_max_rotation() -> f32 {
    25.0
}
fn default_rotation_velocity() -> f32 {
    20.0
}

/// Obstacle (pipe pair) constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Horizontal distance every obstacle travels per tick.
    #[serde(default = "default_obstacle_velocity")]
    pub velocity: f32,
    /// Width of both segments.
    #[serde(default = "default_obstacle_width")]
    pub width: f32,
    /// Height of each segment.
    #[serde(default = "default_obstacle_height")]
    pub height: f32,
    /// Vertical opening between the two segments.
    #[serde(default = "default_gap_size")]
    pub gap_size: f32,
    /// Range the top segment's y is drawn from (inclusive).
    #[serde(default = "default_spawn_range")]
    pub spawn_range: (f32, f32),
    /// Ticks between spawns.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: u32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            velocity: default_obstacle_velocity(),
            width: default_obstacle_width(),
            height: default_obstacle_height(),
            gap_size: default_gap_size(),
            spawn_range: default_spawn_range(),
            spawn_interval: default_spawn_interval(),
        }
    }
}

fn default_obstacle_velocity() -> f32 {
    2.5
}
fn default_obstacle_width() -> f32 {
    104.0
}
fn default_obstacle_height() -> f32 {
    640.0
}
fn default_gap_size() -> f32 {
    175.0
}
fn default_spawn_range() -> (f32, f32) {
    (-500.0, -300.0)
}
fn default_spawn_interval() -> u32 {
    100
}

/// Fitness rewards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Fitness accrued per tick survived.
    #[serde(default = "default_survival_reward")]
    pub survival_reward: f32,
    /// One-time bonus for clearing an obstacle.
    #[serde(default = "default_pass_bonus")]
    pub pass_bonus: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            survival_reward: default_survival_reward(),
            pass_bonus: default_pass_bonus(),
        }
    }
}

fn default_survival_reward() -> f32 {
    0.1
}
fn default_pass_bonus() -> f32 {
    5.0
}

impl GameConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_width <= 0.0 || self.field_height <= 0.0 {
            return Err(ConfigError::InvalidField);
        }
        if self.ground_y <= 0.0 || self.ground_y > self.field_height {
            return Err(ConfigError::InvalidGround(self.ground_y));
        }
        let (w, h) = self.agent_size;
        if w <= 0.0 || h <= 0.0 {
            return Err(ConfigError::InvalidAgentSize);
        }
        let (x, y) = self.agent_start;
        if x < 0.0 || x + w > self.field_width || y < 0.0 || y + h >= self.ground_y {
            return Err(ConfigError::AgentOutOfField { x, y });
        }

        let p = &self.physics;
        if p.tick_increment <= 0.0 {
            return Err(ConfigError::NonPositive("physics.tick_increment"));
        }
        if p.gravity <= 0.0 {
            return Err(ConfigError::NonPositive("physics.gravity"));
        }
        if p.impulse <= 0.0 {
            return Err(ConfigError::NonPositive("physics.impulse"));
        }
        if p.max_fall_speed <= 0.0 {
            return Err(ConfigError::NonPositive("physics.max_fall_speed"));
        }

        let o = &self.obstacles;
        if o.velocity <= 0.0 {
            return Err(ConfigError::NonPositive("obstacles.velocity"));
        }
        if o.width <= 0.0 || o.height <= 0.0 {
            return Err(ConfigError::InvalidObstacleSize);
        }
        if o.gap_size <= 0.0 {
            return Err(ConfigError::NonPositive("obstacles.gap_size"));
        }
        if o.spawn_range.0 > o.spawn_range.1 {
            return Err(ConfigError::InvalidSpawnRange {
                min: o.spawn_range.0,
                max: o.spawn_range.1,
            });
        }
        if o.spawn_interval == 0 {
            return Err(ConfigError::InvalidSpawnInterval);
        }

        if self.scoring.survival_reward < 0.0 || self.scoring.pass_bonus < 0.0 {
            return Err(ConfigError::NegativeReward);
        }
        if self.velocity_normalizer <= 0.0 {
            return Err(ConfigError::NonPositive("velocity_normalizer"));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Field dimensions must be positive")]
    InvalidField,
    #[error("Ground line {0} must lie inside the field")]
    InvalidGround(f32),
    #[error("Agent size must be positive")]
    InvalidAgentSize,
    #[error("Agent start ({x}, {y}) lies outside the playable field")]
    AgentOutOfField { x: f32, y: f32 },
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("Obstacle width and height must be positive")]
    InvalidObstacleSize,
    #[error("Spawn range min ({min}) > max ({max})")]
    InvalidSpawnRange { min: f32, max: f32 },
    #[error("Spawn interval must be non-zero")]
    InvalidSpawnInterval,
    #[error("Fitness rewards must be non-negative")]
    NegativeReward,
}
