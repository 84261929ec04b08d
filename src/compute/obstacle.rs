//! Obstacle stream: pipe pairs that spawn on a fixed cadence, scroll left and
//! expire once fully off-screen.

use std::collections::VecDeque;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{GameConfig, ObstacleConfig};

/// Spawn-order identifier. Larger ids were spawned later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObstacleId(pub u64);

impl ObstacleId {
    #[inline]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A pipe pair.
///
/// `top` is the y of the upper segment's top edge, so the gap opens at
/// `top + height`; `bottom` is the y of the lower segment's top edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obstacle {
    pub id: ObstacleId,
    /// Left edge.
    pub x: f32,
    pub top: f32,
    pub bottom: f32,
    /// Set once any agent has cleared this obstacle.
    pub passed: bool,
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Open-interval overlap test: rectangles that only touch do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

impl Obstacle {
    /// Upper segment rectangle.
    pub fn top_rect(&self, config: &ObstacleConfig) -> Rect {
        Rect::new(self.x, self.top, config.width, config.height)
    }

    /// Lower segment rectangle.
    pub fn bottom_rect(&self, config: &ObstacleConfig) -> Rect {
        Rect::new(self.x, self.bottom, config.width, config.height)
    }

    /// Vertical centre of the gap.
    #[inline]
    pub fn gap_center(&self, config: &ObstacleConfig) -> f32 {
        (self.top + config.height + self.bottom) * 0.5
    }

    /// Right edge.
    #[inline]
    pub fn trailing_edge(&self, config: &ObstacleConfig) -> f32 {
        self.x + config.width
    }
}

/// FIFO of live obstacles plus the spawn timer.
///
/// Obstacles are appended at the right edge and all move at the same speed,
/// so the sequence is ordered by id and by ascending x at all times.
#[derive(Debug, Clone)]
pub struct ObstacleStream {
    config: ObstacleConfig,
    spawn_x: f32,
    obstacles: VecDeque<Obstacle>,
    spawn_timer: u32,
    next_id: ObstacleId,
    rng: StdRng,
}

impl ObstacleStream {
    /// Create a stream seeded with one obstacle at the right edge.
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        let mut stream = Self::empty(config, seed);
        stream.spawn();
        stream
    }

    /// Create a stream with no obstacles.
    pub fn empty(config: &GameConfig, seed: u64) -> Self {
        Self {
            config: config.obstacles.clone(),
            spawn_x: config.field_width,
            obstacles: VecDeque::new(),
            spawn_timer: 0,
            next_id: ObstacleId(0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Append an obstacle at the right edge with a random gap.
    pub fn spawn(&mut self) -> ObstacleId {
        let (lo, hi) = self.config.spawn_range;
        let top = if lo < hi {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        };
        self.spawn_at(self.spawn_x, top)
    }

    /// Append an obstacle at a given position.
    ///
    /// `x` must not lie left of the current tail.
    pub fn spawn_at(&mut self, x: f32, top: f32) -> ObstacleId {
        debug_assert!(self.obstacles.back().is_none_or(|tail| tail.x <= x));
        let id = self.next_id;
        self.next_id = id.next();
        self.obstacles.push_back(Obstacle {
            id,
            x,
            top,
            bottom: top + self.config.height + self.config.gap_size,
            passed: false,
        });
        id
    }

    /// Advance the spawn timer; spawn when it reaches the interval.
    ///
    /// Returns the id of the spawned obstacle, if any.
    pub fn tick_spawn(&mut self) -> Option<ObstacleId> {
        self.spawn_timer += 1;
        if self.spawn_timer >= self.config.spawn_interval {
            self.spawn_timer = 0;
            Some(self.spawn())
        } else {
            None
        }
    }

    /// Move every obstacle left by the configured velocity.
    pub fn advance_all(&mut self) {
        let v = self.config.velocity;
        for obstacle in &mut self.obstacles {
            obstacle.x -= v;
        }
    }

    /// Drop the head if its trailing edge has left the field.
    ///
    /// Only the head is examined; at most one obstacle is removed per call.
    pub fn expire(&mut self) -> Option<Obstacle> {
        let expired = self
            .obstacles
            .front()
            .is_some_and(|head| head.trailing_edge(&self.config) < 0.0);
        if expired {
            self.obstacles.pop_front()
        } else {
            None
        }
    }

    /// Spawn step, movement and expiry for one tick.
    pub fn step(&mut self) {
        self.tick_spawn();
        self.advance_all();
        if let Some(gone) = self.expire() {
            log::trace!("obstacle {:?} expired", gone.id);
        }
    }

    /// Obstacles in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Obstacle> {
        self.obstacles.iter_mut()
    }

    /// Oldest live obstacle.
    pub fn head(&self) -> Option<&Obstacle> {
        self.obstacles.front()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.obstacles.spawn_interval = u32::MAX;
        config
    }

    #[test]
    fn test_seeded_with_one_obstacle() {
        let config = GameConfig::default();
        let stream = ObstacleStream::new(&config, 7);
        assert_eq!(stream.len(), 1);

        let head = stream.head().unwrap();
        assert_eq!(head.x, config.field_width);
        assert!(head.top >= config.obstacles.spawn_range.0);
        assert!(head.top <= config.obstacles.spawn_range.1);
        assert_eq!(
            head.bottom,
            head.top + config.obstacles.height + config.obstacles.gap_size
        );
    }

    #[test]
    fn test_expiry_after_trailing_edge_leaves() {
        let config = quiet_config();
        let mut stream = ObstacleStream::new(&config, 1);

        for _ in 0..240 {
            stream.step();
        }
        // 600 - 2.5 * 240 = 0: left edge on the boundary, body still visible.
        assert_eq!(stream.head().unwrap().x, 0.0);

        // Trailing edge crosses 0 once x < -104, i.e. after tick 282.
        for _ in 240..281 {
            stream.step();
        }
        assert_eq!(stream.len(), 1);
        stream.step();
        assert!(stream.is_empty());
    }

    #[test]
    fn test_spawn_cadence() {
        let config = GameConfig::default();
        let mut stream = ObstacleStream::new(&config, 3);

        let mut spawned = Vec::new();
        for tick in 1..=300u32 {
            if stream.tick_spawn().is_some() {
                spawned.push(tick);
            }
        }
        assert_eq!(spawned, vec![100, 200, 300]);
        assert_eq!(stream.len(), 4);
    }

    #[test]
    fn test_ids_follow_spawn_order() {
        let config = GameConfig::default();
        let mut stream = ObstacleStream::new(&config, 3);
        stream.spawn();
        stream.spawn();
        let ids: Vec<u64> = stream.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_same_seed_same_course() {
        let config = GameConfig::default();
        let mut a = ObstacleStream::new(&config, 99);
        let mut b = ObstacleStream::new(&config, 99);
        for _ in 0..500 {
            a.step();
            b.step();
        }
        let tops_a: Vec<f32> = a.iter().map(|o| o.top).collect();
        let tops_b: Vec<f32> = b.iter().map(|o| o.top).collect();
        assert_eq!(tops_a, tops_b);
    }

    #[test]
    fn test_rect_touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(9.0, 9.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    proptest! {
        #[test]
        fn prop_expiry_is_fifo(
            interval in 1u32..150,
            ticks in 1usize..800,
            seed in any::<u64>(),
        ) {
            let mut config = GameConfig::default();
            config.obstacles.spawn_interval = interval;
            let mut stream = ObstacleStream::new(&config, seed);

            for _ in 0..ticks {
                let before: Vec<ObstacleId> = stream.iter().map(|o| o.id).collect();
                stream.tick_spawn();
                stream.advance_all();
                let removed = stream.expire();
                let after: Vec<ObstacleId> = stream.iter().map(|o| o.id).collect();

                if let Some(gone) = removed {
                    prop_assert_eq!(Some(&gone.id), before.first());
                    prop_assert!(after.iter().all(|id| *id > gone.id));
                }
                prop_assert!(after.windows(2).all(|w| w[0] < w[1]));
                let xs: Vec<f32> = stream.iter().map(|o| o.x).collect();
                prop_assert!(xs.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
