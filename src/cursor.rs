//! Cursor trail engine.
//!
//! Tracks the pointer, whether it is over an interactive element, and a
//! short buffer of decaying trail points. The engine never touches the GPU:
//! each frame it exposes a list of [`OverlayShape`]s that the overlay pass
//! draws above everything else.
//!
//! Three inputs drive it:
//!
//! - [`CursorTrail::handle_pointer_move`] on every pointer move
//! - [`CursorTrail::handle_pointer_over`] whenever the element under the
//!   pointer changes
//! - [`CursorTrail::decay_tick`] from a fixed-period timer (50 ms by default),
//!   independent of the frame rate
//!
//! [`CursorTrail::update`] advances the dot and ring springs once per frame.
//! After [`CursorTrail::dispose`] every input is ignored and no shapes are
//! produced.

use std::collections::VecDeque;
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{ensure_positive, ensure_unit, Accent, Rgb, Theme};
use crate::error::ConfigError;
use crate::spring::{Spring, Spring2, SpringParams};

// ============================================================================
// Hover targets
// ============================================================================

/// Semantic role of an element under the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRole {
    Link,
    Button,
    Other,
}

impl ElementRole {
    #[inline]
    pub fn is_interactive(self) -> bool {
        matches!(self, ElementRole::Link | ElementRole::Button)
    }
}

/// True if the target, or any of its ancestors, is a link or a button.
///
/// `chain` lists the target first and the document root last.
pub fn is_interactive(chain: &[ElementRole]) -> bool {
    chain.iter().any(|role| role.is_interactive())
}

/// Answers "what is under the pointer" for the host's content layer.
pub trait HitTest {
    /// Ancestry chain of the element at `position`, target first.
    fn target_at(&self, position: Vec2) -> &[ElementRole];
}

/// A rectangle of host content with a fixed ancestry chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub min: Vec2,
    pub max: Vec2,
    pub chain: Vec<ElementRole>,
}

impl Region {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x < self.max.x && p.y < self.max.y
    }
}

/// Hit tester over a list of rectangles. Later regions sit on top.
#[derive(Clone, Debug)]
pub struct RegionMap {
    regions: Vec<Region>,
    background: Vec<ElementRole>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            background: vec![ElementRole::Other],
        }
    }

    /// Add a region whose element has `role` and sits inside `ancestors`
    /// (innermost first).
    pub fn with_region(
        mut self,
        min: Vec2,
        max: Vec2,
        role: ElementRole,
        ancestors: &[ElementRole],
    ) -> Self {
        let mut chain = Vec::with_capacity(ancestors.len() + 2);
        chain.push(role);
        chain.extend_from_slice(ancestors);
        chain.push(ElementRole::Other);
        self.regions.push(Region { min, max, chain });
        self
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl Default for RegionMap {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTest for RegionMap {
    fn target_at(&self, position: Vec2) -> &[ElementRole] {
        self.regions
            .iter()
            .rev()
            .find(|r| r.contains(position))
            .map(|r| r.chain.as_slice())
            .unwrap_or(&self.background)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for the trail engine and its overlay.
///
/// Sizes are in logical pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    /// Maximum number of trail points kept.
    pub trail_capacity: usize,
    /// A point is recorded on every Nth pointer move, starting with the first.
    pub sample_every: u32,
    /// Opacity removed from every point per decay tick.
    pub decay_step: f32,
    /// Period of the decay timer in milliseconds.
    pub decay_period_ms: u64,
    pub dot_size: f32,
    pub dot_hover_size: f32,
    pub dot_hover_scale: f32,
    pub dot_opacity: f32,
    pub ring_size: f32,
    pub ring_hover_size: f32,
    pub ring_hover_scale: f32,
    pub ring_opacity: f32,
    pub ring_width: f32,
    pub trail_size: f32,
    /// Blur radius of the glow around each trail point.
    pub trail_glow: f32,
    /// Duration of the fade a trail point runs right after insertion.
    pub trail_fade_secs: f32,
    pub dot_spring: SpringParams,
    pub ring_spring: SpringParams,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            trail_capacity: 20,
            sample_every: 3,
            decay_step: 0.05,
            decay_period_ms: 50,
            dot_size: 8.0,
            dot_hover_size: 12.0,
            dot_hover_scale: 1.2,
            dot_opacity: 0.7,
            ring_size: 30.0,
            ring_hover_size: 36.0,
            ring_hover_scale: 1.1,
            ring_opacity: 0.5,
            ring_width: 1.0,
            trail_size: 5.0,
            trail_glow: 8.0,
            trail_fade_secs: 0.5,
            dot_spring: SpringParams::new(100.0, 10.0),
            ring_spring: SpringParams::new(100.0, 15.0),
        }
    }
}

impl CursorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trail_capacity == 0 {
            return Err(ConfigError::invalid("cursor.trail_capacity", "must be at least 1"));
        }
        if self.sample_every == 0 {
            return Err(ConfigError::invalid("cursor.sample_every", "must be at least 1"));
        }
        if self.decay_period_ms == 0 {
            return Err(ConfigError::invalid("cursor.decay_period_ms", "must be at least 1"));
        }
        if !(self.decay_step.is_finite() && self.decay_step > 0.0 && self.decay_step <= 1.0) {
            return Err(ConfigError::invalid(
                "cursor.decay_step",
                format!("must be within (0, 1], got {}", self.decay_step),
            ));
        }
        ensure_positive("cursor.dot_size", self.dot_size)?;
        ensure_positive("cursor.dot_hover_size", self.dot_hover_size)?;
        ensure_positive("cursor.dot_hover_scale", self.dot_hover_scale)?;
        ensure_positive("cursor.ring_size", self.ring_size)?;
        ensure_positive("cursor.ring_hover_size", self.ring_hover_size)?;
        ensure_positive("cursor.ring_hover_scale", self.ring_hover_scale)?;
        ensure_positive("cursor.ring_width", self.ring_width)?;
        ensure_positive("cursor.trail_size", self.trail_size)?;
        ensure_positive("cursor.trail_fade_secs", self.trail_fade_secs)?;
        ensure_unit("cursor.dot_opacity", self.dot_opacity)?;
        ensure_unit("cursor.ring_opacity", self.ring_opacity)?;
        if !(self.trail_glow.is_finite() && self.trail_glow >= 0.0) {
            return Err(ConfigError::invalid("cursor.trail_glow", "must be zero or positive"));
        }
        if !self.dot_spring.is_valid() {
            return Err(ConfigError::invalid("cursor.dot_spring", "stiffness and mass must be positive"));
        }
        if !self.ring_spring.is_valid() {
            return Err(ConfigError::invalid("cursor.ring_spring", "stiffness and mass must be positive"));
        }
        Ok(())
    }

    pub fn decay_period(&self) -> Duration {
        Duration::from_millis(self.decay_period_ms)
    }

    /// Decay ticks a fresh point survives.
    pub fn ticks_to_fade(&self) -> u32 {
        // 1.0 / 0.05 is 20.0000003 in f32; shave the rounding noise first.
        ((1.0 / self.decay_step) - 1e-4).ceil().max(1.0) as u32
    }
}

// ============================================================================
// State
// ============================================================================

/// Pointer state owned by the trail engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorState {
    /// Viewport position in logical pixels.
    pub position: Vec2,
    pub is_hovering: bool,
    pub active_color: Accent,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            is_hovering: false,
            active_color: Accent::Primary,
        }
    }
}

/// A decaying marker left behind by the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    /// Value of the move counter when the point was recorded.
    pub id: u64,
    /// Decay opacity in `[0, 1]`.
    pub opacity: f32,
    /// Engine time at insertion, in seconds.
    pub born: f32,
    ticks: u32,
}

impl TrailPoint {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// How an overlay shape is composited onto the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayBlend {
    Alpha,
    /// Difference-style blend that stays visible on light and dark content.
    Difference,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Disc,
    Ring,
    /// Disc with a soft glow halo.
    Glow,
}

/// One primitive for the overlay pass, in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayShape {
    pub kind: ShapeKind,
    pub center: Vec2,
    pub radius: f32,
    /// Stroke width for rings, halo radius for glows, unused for discs.
    pub width: f32,
    /// Linear RGBA, not premultiplied.
    pub color: [f32; 4],
    pub blend: OverlayBlend,
}

/// Spring-driven dot and ring following the pointer.
#[derive(Clone, Debug)]
struct CursorVisual {
    dot: Spring2,
    ring: Spring2,
    dot_scale: Spring,
    ring_scale: Spring,
}

impl CursorVisual {
    fn new(config: &CursorConfig) -> Self {
        Self {
            dot: Spring2::new(config.dot_spring, Vec2::ZERO),
            ring: Spring2::new(config.ring_spring, Vec2::ZERO),
            dot_scale: Spring::new(config.dot_spring, 1.0),
            ring_scale: Spring::new(config.ring_spring, 1.0),
        }
    }
}

/// The cursor trail engine.
#[derive(Debug)]
pub struct CursorTrail {
    config: CursorConfig,
    accents: [Rgb; 2],
    state: CursorState,
    trail: VecDeque<TrailPoint>,
    move_count: u64,
    ticks_to_fade: u32,
    now: f32,
    visual: CursorVisual,
    mounted: bool,
}

impl CursorTrail {
    /// Create a mounted engine with default cursor state.
    pub fn new(config: &CursorConfig, theme: &Theme) -> Self {
        Self {
            config: config.clone(),
            accents: [theme.accent_a, theme.accent_b],
            state: CursorState::default(),
            trail: VecDeque::with_capacity(config.trail_capacity),
            move_count: 0,
            ticks_to_fade: config.ticks_to_fade(),
            now: 0.0,
            visual: CursorVisual::new(config),
            mounted: true,
        }
    }

    /// Record a pointer move to `(x, y)` in logical pixels.
    pub fn handle_pointer_move(&mut self, x: f32, y: f32) {
        if !self.mounted {
            return;
        }
        self.state.position = Vec2::new(x, y);

        if self.move_count % self.config.sample_every as u64 == 0 {
            if self.trail.len() == self.config.trail_capacity {
                self.trail.pop_front();
            }
            self.trail.push_back(TrailPoint {
                x,
                y,
                id: self.move_count,
                opacity: 1.0,
                born: self.now,
                ticks: 0,
            });
        }
        self.move_count += 1;
    }

    /// Update hover state from the ancestry chain of the element under the pointer.
    pub fn handle_pointer_over(&mut self, chain: &[ElementRole]) {
        if !self.mounted {
            return;
        }
        if is_interactive(chain) {
            self.state.is_hovering = true;
            self.state.active_color = Accent::Secondary;
        } else {
            self.state.is_hovering = false;
            self.state.active_color = Accent::Primary;
        }
    }

    /// Fade every trail point by one step and drop the ones that reached 0.
    pub fn decay_tick(&mut self) {
        if !self.mounted {
            return;
        }
        let step = self.config.decay_step;
        let limit = self.ticks_to_fade;
        for point in self.trail.iter_mut() {
            point.ticks += 1;
            point.opacity = if point.ticks >= limit {
                0.0
            } else {
                (1.0 - step * point.ticks as f32).max(0.0)
            };
        }
        self.trail.retain(|p| p.opacity > 0.0);
    }

    /// Advance the dot and ring animation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !self.mounted || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.now += dt;

        let hovering = self.state.is_hovering;
        let v = &mut self.visual;
        v.dot.set_target(self.state.position);
        v.ring.set_target(self.state.position);
        v.dot_scale
            .set_target(if hovering { self.config.dot_hover_scale } else { 1.0 });
        v.ring_scale
            .set_target(if hovering { self.config.ring_hover_scale } else { 1.0 });

        v.dot.step(dt);
        v.ring.step(dt);
        v.dot_scale.step(dt);
        v.ring_scale.step(dt);
    }

    /// Tear down. Clears the trail and ignores every later input.
    pub fn dispose(&mut self) {
        self.mounted = false;
        self.trail.clear();
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[inline]
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Trail points, oldest first.
    pub fn trail(&self) -> impl ExactSizeIterator<Item = &TrailPoint> + '_ {
        self.trail.iter()
    }

    #[inline]
    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    #[inline]
    pub fn move_count(&self) -> u64 {
        self.move_count
    }

    /// Current (spring-smoothed) dot center.
    pub fn dot_position(&self) -> Vec2 {
        self.visual.dot.value()
    }

    /// Current (spring-smoothed) ring center.
    pub fn ring_position(&self) -> Vec2 {
        self.visual.ring.value()
    }

    /// Render opacity of a trail point: its decay opacity times the
    /// insertion fade.
    pub fn trail_render_opacity(&self, point: &TrailPoint) -> f32 {
        let age = (self.now - point.born).max(0.0);
        let fade = (1.0 - age / self.config.trail_fade_secs).clamp(0.0, 1.0);
        point.opacity * fade
    }

    /// Shapes to draw this frame, back to front: trail, ring, dot.
    ///
    /// A disposed engine yields nothing.
    pub fn shapes(&self) -> impl Iterator<Item = OverlayShape> + '_ {
        let live = self.mounted;
        let color = self.accents[match self.state.active_color {
            Accent::Primary => 0,
            Accent::Secondary => 1,
        }];
        let hovering = self.state.is_hovering;
        let cfg = &self.config;

        let trail = self
            .trail
            .iter()
            .filter(move |_| live)
            .filter_map(move |p| {
                let alpha = self.trail_render_opacity(p);
                (alpha > 0.0).then(|| OverlayShape {
                    kind: ShapeKind::Glow,
                    center: p.position(),
                    radius: cfg.trail_size * 0.5,
                    width: cfg.trail_glow,
                    color: color.with_alpha(alpha),
                    blend: OverlayBlend::Alpha,
                })
            });

        let ring_size = if hovering { cfg.ring_hover_size } else { cfg.ring_size };
        let ring = OverlayShape {
            kind: ShapeKind::Ring,
            center: self.visual.ring.value(),
            radius: ring_size * 0.5 * self.visual.ring_scale.value(),
            width: cfg.ring_width,
            color: color.with_alpha(cfg.ring_opacity),
            blend: OverlayBlend::Alpha,
        };

        let dot_size = if hovering { cfg.dot_hover_size } else { cfg.dot_size };
        let dot = OverlayShape {
            kind: ShapeKind::Disc,
            center: self.visual.dot.value(),
            radius: dot_size * 0.5 * self.visual.dot_scale.value(),
            width: 0.0,
            color: color.with_alpha(cfg.dot_opacity),
            blend: OverlayBlend::Difference,
        };

        trail.chain([ring, dot].into_iter().filter(move |_| live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CursorTrail {
        CursorTrail::new(&CursorConfig::default(), &Theme::default())
    }

    #[test]
    fn test_every_third_move_records_a_point() {
        let mut trail = engine();
        for i in 0..4 {
            trail.handle_pointer_move(i as f32, 0.0);
        }
        let ids: Vec<u64> = trail.trail().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 3]);
        assert_eq!(trail.move_count(), 4);
        assert_eq!(trail.state().position, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_trail_never_exceeds_capacity() {
        let mut trail = engine();
        for i in 0..500 {
            trail.handle_pointer_move(i as f32, i as f32);
            assert!(trail.trail_len() <= 20);
        }
        assert_eq!(trail.trail_len(), 20);

        // Oldest dropped first: the survivors are the 20 most recent samples.
        let ids: Vec<u64> = trail.trail().map(|p| p.id).collect();
        let mut expected: Vec<u64> = (0..500u64).filter(|i| i % 3 == 0).rev().take(20).collect();
        expected.reverse();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_decay_step_is_exact() {
        let mut trail = engine();
        trail.handle_pointer_move(10.0, 10.0);
        for tick in 1..=5 {
            trail.decay_tick();
            let opacity = trail.trail().next().unwrap().opacity;
            assert!((opacity - (1.0 - 0.05 * tick as f32)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_point_removed_after_exactly_twenty_ticks() {
        let mut trail = engine();
        trail.handle_pointer_move(10.0, 10.0);
        for _ in 0..19 {
            trail.decay_tick();
        }
        assert_eq!(trail.trail_len(), 1);
        assert!(trail.trail().next().unwrap().opacity > 0.0);

        trail.decay_tick();
        assert_eq!(trail.trail_len(), 0);
    }

    #[test]
    fn test_decay_never_moves_points() {
        let mut trail = engine();
        trail.handle_pointer_move(12.0, 34.0);
        trail.decay_tick();
        trail.handle_pointer_move(100.0, 100.0);
        let p = trail.trail().next().unwrap();
        assert_eq!(p.position(), Vec2::new(12.0, 34.0));
    }

    #[test]
    fn test_hover_toggles_accent() {
        let mut trail = engine();

        trail.handle_pointer_over(&[ElementRole::Link, ElementRole::Other]);
        assert!(trail.state().is_hovering);
        assert_eq!(trail.state().active_color, Accent::Secondary);

        trail.handle_pointer_over(&[ElementRole::Other]);
        assert!(!trail.state().is_hovering);
        assert_eq!(trail.state().active_color, Accent::Primary);

        // Nested inside a button still counts.
        trail.handle_pointer_over(&[ElementRole::Other, ElementRole::Button, ElementRole::Other]);
        assert!(trail.state().is_hovering);
    }

    #[test]
    fn test_region_map_picks_topmost() {
        let map = RegionMap::new()
            .with_region(Vec2::ZERO, Vec2::new(100.0, 100.0), ElementRole::Other, &[])
            .with_region(Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0), ElementRole::Other, &[ElementRole::Link]);

        assert!(is_interactive(map.target_at(Vec2::new(15.0, 15.0))));
        assert!(!is_interactive(map.target_at(Vec2::new(50.0, 50.0))));
        assert_eq!(map.target_at(Vec2::new(500.0, 500.0)), &[ElementRole::Other]);
    }

    #[test]
    fn test_dot_follows_with_spring() {
        let mut trail = engine();
        trail.handle_pointer_move(300.0, 200.0);
        trail.update(1.0 / 60.0);
        let p = trail.dot_position();
        assert!(p.x > 0.0 && p.x < 300.0);

        for _ in 0..300 {
            trail.update(1.0 / 60.0);
        }
        assert!(trail.dot_position().distance(Vec2::new(300.0, 200.0)) < 0.01);
        assert!(trail.ring_position().distance(Vec2::new(300.0, 200.0)) < 0.01);
    }

    #[test]
    fn test_hover_grows_shapes() {
        let mut trail = engine();
        trail.handle_pointer_over(&[ElementRole::Button]);
        for _ in 0..300 {
            trail.update(1.0 / 60.0);
        }
        let shapes: Vec<_> = trail.shapes().collect();
        let dot = shapes.last().unwrap();
        assert_eq!(dot.kind, ShapeKind::Disc);
        assert!((dot.radius - 6.0 * 1.2).abs() < 0.01);
        assert_eq!(dot.blend, OverlayBlend::Difference);
        let ring = &shapes[shapes.len() - 2];
        assert!((ring.radius - 18.0 * 1.1).abs() < 0.01);
    }

    #[test]
    fn test_trail_insertion_fade() {
        let mut trail = engine();
        trail.handle_pointer_move(5.0, 5.0);
        let p = *trail.trail().next().unwrap();
        assert_eq!(trail.trail_render_opacity(&p), p.opacity);
        assert_eq!(trail.trail_render_opacity(&p), 1.0);

        trail.update(0.25);
        let p = *trail.trail().next().unwrap();
        assert!((trail.trail_render_opacity(&p) - 0.5).abs() < 1e-4);

        trail.update(0.25);
        let p = *trail.trail().next().unwrap();
        assert_eq!(trail.trail_render_opacity(&p), 0.0);
    }

    #[test]
    fn test_trail_glow_alpha_is_decay_opacity() {
        let mut trail = engine();
        trail.handle_pointer_move(5.0, 5.0);
        let glow = trail.shapes().next().unwrap();
        assert_eq!(glow.kind, ShapeKind::Glow);
        assert_eq!(glow.color[3], 1.0);

        for _ in 0..4 {
            trail.decay_tick();
        }
        let p = *trail.trail().next().unwrap();
        let glow = trail.shapes().next().unwrap();
        assert!((glow.color[3] - p.opacity).abs() < 1e-6);
        assert!((glow.color[3] - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_disposed_engine_ignores_input() {
        let mut trail = engine();
        trail.handle_pointer_move(1.0, 1.0);
        trail.dispose();

        trail.handle_pointer_move(50.0, 50.0);
        trail.handle_pointer_over(&[ElementRole::Link]);
        trail.decay_tick();
        trail.update(0.1);

        assert_eq!(trail.trail_len(), 0);
        assert_eq!(trail.move_count(), 1);
        assert_eq!(trail.state().position, Vec2::new(1.0, 1.0));
        assert!(!trail.state().is_hovering);
        assert_eq!(trail.shapes().count(), 0);
    }

    #[test]
    fn test_ticks_to_fade() {
        assert_eq!(CursorConfig::default().ticks_to_fade(), 20);
        let cfg = CursorConfig { decay_step: 0.3, ..Default::default() };
        assert_eq!(cfg.ticks_to_fade(), 4);
    }

    #[test]
    fn test_validation() {
        assert!(CursorConfig::default().validate().is_ok());
        let cfg = CursorConfig { trail_capacity: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = CursorConfig { decay_step: 0.0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = CursorConfig { sample_every: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
