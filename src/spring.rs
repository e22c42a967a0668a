//! Damped spring integrators used by the cursor overlay.
//!
//! A spring pulls `value` toward `target` with force `-k·(x - target) - c·v`.
//! Damping below `2·sqrt(k·m)` is under-damped and overshoots slightly, which
//! is what gives the cursor dot and ring their elastic follow.
//!
//! Integration is semi-implicit Euler over fixed sub-steps, so the result is
//! stable at any frame rate the host produces.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Largest integration step, in seconds.
const SUBSTEP: f32 = 1.0 / 240.0;

/// Largest frame delta a single step will integrate.
const MAX_STEP: f32 = 0.1;

/// Distance under which a spring may come to rest.
const REST_DELTA: f32 = 0.001;

/// Speed under which a spring may come to rest.
const REST_SPEED: f32 = 0.01;

/// Spring constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringParams {
    pub stiffness: f32,
    pub damping: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
}

fn default_mass() -> f32 {
    1.0
}

impl SpringParams {
    pub const fn new(stiffness: f32, damping: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass: 1.0,
        }
    }

    /// ζ = c / (2·sqrt(k·m)). Below 1 the spring overshoots.
    pub fn damping_ratio(&self) -> f32 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }

    /// Whether all constants are finite and physically meaningful.
    pub fn is_valid(&self) -> bool {
        self.stiffness.is_finite()
            && self.damping.is_finite()
            && self.mass.is_finite()
            && self.stiffness > 0.0
            && self.damping >= 0.0
            && self.mass > 0.0
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        Self::new(100.0, 10.0)
    }
}

/// One-dimensional spring.
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    value: f32,
    velocity: f32,
    target: f32,
    params: SpringParams,
}

impl Spring {
    /// A spring at rest on `value`.
    pub fn new(params: SpringParams, value: f32) -> Self {
        Self {
            value,
            velocity: 0.0,
            target: value,
            params,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Advance by `dt` seconds. Returns `true` once the spring is at rest.
    pub fn step(&mut self, dt: f32) -> bool {
        if !dt.is_finite() || dt <= 0.0 {
            return self.is_settled();
        }

        let SpringParams {
            stiffness,
            damping,
            mass,
        } = self.params;

        let mut remaining = dt.min(MAX_STEP);
        while remaining > 0.0 {
            let h = remaining.min(SUBSTEP);
            let force = -stiffness * (self.value - self.target) - damping * self.velocity;
            self.velocity += force / mass * h;
            self.value += self.velocity * h;
            remaining -= h;
        }

        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
            return true;
        }
        false
    }

    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() < REST_DELTA && self.velocity.abs() < REST_SPEED
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Two independent springs driving a screen position.
#[derive(Clone, Copy, Debug)]
pub struct Spring2 {
    x: Spring,
    y: Spring,
}

impl Spring2 {
    pub fn new(params: SpringParams, value: Vec2) -> Self {
        Self {
            x: Spring::new(params, value.x),
            y: Spring::new(params, value.y),
        }
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.x.set_target(target.x);
        self.y.set_target(target.y);
    }

    pub fn step(&mut self, dt: f32) -> bool {
        let x = self.x.step(dt);
        let y = self.y.step(dt);
        x && y
    }

    pub fn value(&self) -> Vec2 {
        Vec2::new(self.x.value(), self.y.value())
    }

    pub fn target(&self) -> Vec2 {
        Vec2::new(self.x.target(), self.y.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(spring: &mut Spring, seconds: f32) -> (f32, f32) {
        // Returns (max value seen, final value)
        let mut max = spring.value();
        let frames = (seconds * 60.0) as usize;
        for _ in 0..frames {
            spring.step(1.0 / 60.0);
            max = max.max(spring.value());
        }
        (max, spring.value())
    }

    #[test]
    fn test_damping_ratio() {
        assert!((SpringParams::new(100.0, 10.0).damping_ratio() - 0.5).abs() < 1e-6);
        assert!((SpringParams::new(100.0, 20.0).damping_ratio() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_spring_converges_to_target() {
        let mut spring = Spring::new(SpringParams::new(100.0, 15.0), 0.0);
        spring.set_target(100.0);
        let (_, end) = run(&mut spring, 3.0);
        assert_eq!(end, 100.0);
        assert!(spring.is_settled());
    }

    #[test]
    fn test_under_damped_spring_overshoots() {
        let mut spring = Spring::new(SpringParams::new(100.0, 10.0), 0.0);
        spring.set_target(100.0);
        let (max, _) = run(&mut spring, 2.0);
        assert!(max > 100.0, "expected overshoot, max was {}", max);
    }

    #[test]
    fn test_critically_damped_spring_does_not_overshoot() {
        let mut spring = Spring::new(SpringParams::new(100.0, 20.0), 0.0);
        spring.set_target(100.0);
        let (max, _) = run(&mut spring, 2.0);
        assert!(max <= 100.0 + REST_DELTA);
    }

    #[test]
    fn test_spring_does_not_snap_instantly() {
        let mut spring = Spring2::new(SpringParams::default(), Vec2::ZERO);
        spring.set_target(Vec2::new(200.0, 50.0));
        spring.step(1.0 / 60.0);
        let v = spring.value();
        assert!(v.x > 0.0 && v.x < 200.0);
        assert!(v.y > 0.0 && v.y < 50.0);
    }

    #[test]
    fn test_zero_dt_is_a_no_op() {
        let mut spring = Spring::new(SpringParams::default(), 1.0);
        spring.set_target(2.0);
        spring.step(0.0);
        assert_eq!(spring.value(), 1.0);
    }

    #[test]
    fn test_invalid_params() {
        assert!(!SpringParams::new(0.0, 10.0).is_valid());
        assert!(!SpringParams::new(100.0, -1.0).is_valid());
        assert!(SpringParams::new(100.0, 0.0).is_valid());
    }
}
