//! The mounted effects layer.
//!
//! [`EffectsLayer`] owns every piece of simulation state: the clock, the
//! terrain time, the particle field, the starfield, the camera and the
//! cursor trail. The host drives it with three kinds of calls:
//!
//! ```ignore
//! let mut layer = EffectsLayer::mount(EffectsConfig::default())?;
//!
//! // pointer events
//! layer.handle_pointer_move(x, y);
//! layer.handle_pointer_over(hit_test.target_at(pos));
//!
//! // event loop wakeups
//! layer.poll_timers(Instant::now());
//!
//! // once per frame, from the wall clock or an explicit delta
//! layer.tick();
//! layer.update(dt);
//!
//! // navigation away
//! layer.dispose();
//! ```
//!
//! Nothing is drawn here; the renderer reads the layer through its getters.

use std::time::Instant;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::camera::{Camera, OrbitControls};
use crate::config::EffectsConfig;
use crate::cursor::{CursorTrail, ElementRole};
use crate::error::ConfigError;
use crate::particles::ParticleField;
use crate::starfield::Starfield;
use crate::terrain::Terrain;
use crate::time::{Clock, IntervalTimer};

/// One mounted instance of the ambient effects layer.
#[derive(Debug)]
pub struct EffectsLayer {
    config: EffectsConfig,
    clock: Clock,
    terrain: Terrain,
    particles: ParticleField,
    starfield: Starfield,
    camera: Camera,
    controls: OrbitControls,
    cursor: CursorTrail,
    decay_timer: IntervalTimer,
    mounted: bool,
}

impl EffectsLayer {
    /// Validate `config` and build a fresh layer. The decay timer starts now.
    pub fn mount(config: EffectsConfig) -> Result<Self, ConfigError> {
        Self::mount_at(config, Instant::now())
    }

    /// Like [`mount`](Self::mount) with an explicit start instant for the
    /// decay timer.
    pub fn mount_at(config: EffectsConfig, now: Instant) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let particles = ParticleField::new(&config.particles, &mut rng);
        let starfield = Starfield::generate(&config.stars, &mut rng);
        let terrain = Terrain::new(&config.terrain, &config.theme);
        let camera = Camera::from_config(&config.camera);
        let controls = OrbitControls::new(config.scene.interactable, config.camera.rotate_speed);
        let cursor = CursorTrail::new(&config.cursor, &config.theme);
        let decay_timer = IntervalTimer::start(config.cursor.decay_period(), now);

        log::info!(
            "Mounted effects layer: {} particles, {} stars, interactable={}",
            particles.len(),
            starfield.len(),
            config.scene.interactable
        );

        Ok(Self {
            config,
            clock: Clock::new(),
            terrain,
            particles,
            starfield,
            camera,
            controls,
            cursor,
            decay_timer,
            mounted: true,
        })
    }

    /// Advance one frame by `dt` seconds: clock, terrain, particles, then the
    /// cursor springs. Non-positive deltas are ignored.
    pub fn update(&mut self, dt: f32) {
        if !self.mounted || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let (elapsed, delta) = self.clock.advance(dt);
        self.step(elapsed, delta);
    }

    /// Advance one frame by the wall-clock time since the previous tick.
    pub fn tick(&mut self) {
        if !self.mounted {
            return;
        }
        let (elapsed, delta) = self.clock.update();
        self.step(elapsed, delta);
    }

    fn step(&mut self, elapsed: f32, delta: f32) {
        if delta <= 0.0 {
            return;
        }
        self.terrain.update(elapsed);
        self.particles.update(elapsed);
        self.cursor.update(delta);
    }

    /// Freeze the animation clock. Pointer input and trail decay keep
    /// running; terrain, particles and the cursor springs hold still.
    pub fn pause(&mut self) {
        if self.mounted && !self.clock.is_paused() {
            self.clock.pause();
            log::debug!("Animation paused at {:.2}s", self.clock.elapsed());
        }
    }

    /// Resume after [`pause`](Self::pause). The paused interval is skipped.
    pub fn resume(&mut self) {
        if self.mounted && self.clock.is_paused() {
            self.clock.resume();
            log::debug!("Animation resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Animation speed multiplier. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        if !self.mounted {
            return;
        }
        self.clock.set_time_scale(scale);
        log::debug!("Time scale set to {}", self.clock.time_scale());
    }

    /// Step every frame by `delta` seconds regardless of the measured frame
    /// time. `None` returns to measured timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        if self.mounted {
            self.clock.set_fixed_delta(delta);
        }
    }

    /// Pointer moved to `(x, y)` logical pixels.
    pub fn handle_pointer_move(&mut self, x: f32, y: f32) {
        if !self.mounted {
            return;
        }
        self.cursor.handle_pointer_move(x, y);
        if self.config.scene.interactable {
            self.controls.handle_move(&mut self.camera, Vec2::new(x, y));
        }
    }

    /// The element under the pointer changed.
    pub fn handle_pointer_over(&mut self, chain: &[ElementRole]) {
        if !self.mounted {
            return;
        }
        self.cursor.handle_pointer_over(chain);
    }

    /// Primary button pressed or released. Only reaches the scene in
    /// interactable mode.
    pub fn handle_pointer_button(&mut self, pressed: bool) {
        if !self.mounted || !self.config.scene.interactable {
            return;
        }
        self.controls.handle_button(pressed);
    }

    /// Wheel input. Returns `true` if the camera changed, which it never
    /// does while zoom is disabled.
    pub fn handle_scroll(&mut self, delta: f32) -> bool {
        if !self.mounted || !self.config.scene.interactable {
            return false;
        }
        self.controls.handle_scroll(&mut self.camera, delta)
    }

    /// Run every decay period that ended at or before `now`. Returns the
    /// number of ticks applied.
    pub fn poll_timers(&mut self, now: Instant) -> u32 {
        if !self.mounted {
            return 0;
        }
        let ticks = self.decay_timer.poll(now);
        for _ in 0..ticks {
            self.cursor.decay_tick();
        }
        ticks
    }

    /// Earliest instant at which [`poll_timers`](Self::poll_timers) has work.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        if self.mounted {
            self.decay_timer.next_deadline()
        } else {
            None
        }
    }

    /// Tear down: cancel the decay timer, drop the trail and ignore every
    /// later call. Idempotent.
    pub fn dispose(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.decay_timer.cancel();
        self.cursor.dispose();
        self.controls.set_enabled(false);
        log::info!("Disposed effects layer after {} frames", self.clock.frame());
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Switch interactable mode (orbit drag and pointer routing).
    pub fn set_interactable(&mut self, interactable: bool) {
        if !self.mounted {
            return;
        }
        self.config.scene.interactable = interactable;
        self.controls.set_enabled(interactable);
        log::debug!("Interactable mode set to {}", interactable);
    }

    pub fn is_interactable(&self) -> bool {
        self.config.scene.interactable
    }

    /// Whether pointer input should reach the 3D surface. When `false` the
    /// surface is decorative and every event belongs to the page content.
    pub fn routes_pointer_to_surface(&self) -> bool {
        self.mounted && self.config.scene.interactable
    }

    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn starfield(&self) -> &Starfield {
        &self.starfield
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn cursor(&self) -> &CursorTrail {
        &self.cursor
    }
}

impl Drop for EffectsLayer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn layer() -> EffectsLayer {
        EffectsLayer::mount(EffectsConfig::default().with_seed(1)).unwrap()
    }

    #[test]
    fn test_mount_rejects_invalid_config() {
        let err = EffectsLayer::mount(EffectsConfig::default().with_particle_count(0)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "particles.count", .. }));
    }

    #[test]
    fn test_update_orders_subsystems() {
        let mut layer = layer();
        layer.update(1.0);
        assert!((layer.elapsed() - 0.25).abs() < 1e-6);
        assert!((layer.terrain().time() - 0.075).abs() < 1e-6);
    }

    #[test]
    fn test_pause_holds_animation_but_not_decay() {
        let start = Instant::now();
        let mut layer = EffectsLayer::mount_at(EffectsConfig::default().with_seed(1), start).unwrap();
        layer.update(0.1);
        layer.handle_pointer_move(10.0, 10.0);
        layer.pause();
        assert!(layer.is_paused());

        let time = layer.terrain().time();
        let particles: Vec<_> = layer.particles().positions().collect();
        layer.update(0.1);
        layer.tick();
        assert_eq!(layer.terrain().time(), time);
        assert_eq!(layer.particles().positions().collect::<Vec<_>>(), particles);

        assert_eq!(layer.poll_timers(start + Duration::from_millis(50)), 1);
        assert!(layer.cursor().trail().next().unwrap().opacity < 1.0);

        layer.resume();
        assert!(!layer.is_paused());
        layer.update(0.1);
        assert!(layer.terrain().time() > time);
    }

    #[test]
    fn test_time_scale_and_fixed_delta() {
        let mut layer = layer();
        layer.set_time_scale(0.5);
        layer.update(0.2);
        assert!((layer.elapsed() - 0.1).abs() < 1e-6);

        layer.set_time_scale(1.0);
        layer.set_fixed_delta(Some(0.05));
        layer.update(0.2);
        assert!((layer.elapsed() - 0.15).abs() < 1e-6);

        layer.set_fixed_delta(None);
        layer.update(0.2);
        assert!((layer.elapsed() - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_tick_uses_wall_clock() {
        let mut layer = layer();
        std::thread::sleep(Duration::from_millis(5));
        layer.tick();
        assert!(layer.elapsed() > 0.0);
        assert!(layer.elapsed() <= crate::time::MAX_FRAME_DELTA);
        assert_eq!(layer.clock().frame(), 1);
    }

    #[test]
    fn test_poll_timers_decays_trail() {
        let start = Instant::now();
        let mut layer = EffectsLayer::mount_at(EffectsConfig::default(), start).unwrap();
        layer.handle_pointer_move(10.0, 10.0);

        assert_eq!(layer.poll_timers(start + Duration::from_millis(120)), 2);
        let opacity = layer.cursor().trail().next().unwrap().opacity;
        assert!((opacity - 0.9).abs() < 1e-6);

        assert_eq!(layer.poll_timers(start + Duration::from_millis(1000)), 18);
        assert_eq!(layer.cursor().trail_len(), 0);
    }

    #[test]
    fn test_pointer_button_ignored_when_decorative() {
        let mut layer = layer();
        layer.handle_pointer_button(true);
        layer.handle_pointer_move(0.0, 0.0);
        layer.handle_pointer_move(100.0, 0.0);
        assert_eq!(layer.camera(), &Camera::default());
        assert!(!layer.routes_pointer_to_surface());
    }

    #[test]
    fn test_interactable_drag_rotates() {
        let mut layer = layer();
        layer.set_interactable(true);
        assert!(layer.routes_pointer_to_surface());
        layer.handle_pointer_button(true);
        layer.handle_pointer_move(0.0, 0.0);
        layer.handle_pointer_move(100.0, 0.0);
        assert!(layer.camera().yaw != Camera::default().yaw);
        assert!(!layer.handle_scroll(3.0));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut layer = layer();
        layer.dispose();
        layer.dispose();
        assert!(!layer.is_mounted());
        assert_eq!(layer.next_timer_deadline(), None);
    }
}
