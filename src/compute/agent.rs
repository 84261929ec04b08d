//! Agent physics: vertical motion under gravity and the flap impulse.

use serde::{Deserialize, Serialize};

use crate::schema::{GameConfig, PhysicsConfig};

/// Tilt never drops below this (nose straight down).
const MIN_TILT: f32 = -90.0;

/// Agents keep their raised tilt until they fall this far below the flap height.
const TILT_HOLD_DISTANCE: f32 = 50.0;

/// A single bird.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    /// Horizontal position (fixed for the whole episode).
    pub x: f32,
    /// Vertical position of the top edge (y grows downward).
    pub y: f32,
    /// Velocity set by the last flap (0 before any flap).
    pub velocity: f32,
    /// Time since the last flap, in physics units.
    pub tick_count: f32,
    /// False once the agent has died.
    pub alive: bool,
    /// Cosmetic tilt in degrees.
    pub tilt: f32,
    /// Height at which the last flap happened.
    pub flap_height: f32,
}

impl Agent {
    /// Create an agent at rest.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            velocity: 0.0,
            tick_count: 0.0,
            alive: true,
            tilt: 0.0,
            flap_height: y,
        }
    }

    /// Create an agent at the configured start position.
    pub fn spawn(config: &GameConfig) -> Self {
        Self::new(config.agent_start.0, config.agent_start.1)
    }

    /// Advance one tick and return the vertical displacement applied.
    ///
    /// Displacement is clamped from above only: an agent falls at most
    /// `max_fall_speed` per tick but may rise arbitrarily fast.
    pub fn apply_gravity_step(&mut self, physics: &PhysicsConfig) -> f32 {
        self.tick_count += physics.tick_increment;
        let d = displacement(self.velocity, self.tick_count, physics);
        self.y += d;

        if d < 0.0 || self.y < self.flap_height + TILT_HOLD_DISTANCE {
            self.tilt = physics.max_rotation;
        } else if self.tilt > MIN_TILT {
            self.tilt = (self.tilt - physics.rotation_velocity).max(MIN_TILT);
        }

        d
    }

    /// Flap: set an upward velocity, restart the fall clock and raise the nose.
    ///
    /// No cooldown; a second flap before the next tick just resets again.
    pub fn apply_flap(&mut self, physics: &PhysicsConfig) {
        self.velocity = -physics.impulse;
        self.tick_count = 0.0;
        self.flap_height = self.y;
        self.tilt = physics.max_rotation;
    }

    /// Axis-aligned bounding box (x, y, width, height).
    #[inline]
    pub fn bounds(&self, config: &GameConfig) -> (f32, f32, f32, f32) {
        (self.x, self.y, config.agent_size.0, config.agent_size.1)
    }
}

/// Displacement for a given velocity and time since flap.
#[inline]
pub fn displacement(velocity: f32, t: f32, physics: &PhysicsConfig) -> f32 {
    (velocity * t + 0.5 * physics.gravity * t * t).min(physics.max_fall_speed)
}
