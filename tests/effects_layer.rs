//! Integration tests for the mounted effects layer.
//!
//! These drive [`EffectsLayer`] through its public lifecycle API only:
//! pointer events, timer polls, frame updates and disposal.

use std::time::{Duration, Instant};

use backdrop::cursor::is_interactive;
use backdrop::prelude::*;

fn mount() -> EffectsLayer {
    EffectsLayer::mount(EffectsConfig::default().with_seed(11)).unwrap()
}

fn mount_at(start: Instant) -> EffectsLayer {
    EffectsLayer::mount_at(EffectsConfig::default().with_seed(11), start).unwrap()
}

// ============================================================================
// Cursor trail
// ============================================================================

#[test]
fn test_trail_never_exceeds_capacity() {
    let mut layer = mount();
    for i in 0..500 {
        layer.handle_pointer_move(i as f32, (i * 2) as f32);
        assert!(layer.cursor().trail_len() <= 20);
    }
    assert_eq!(layer.cursor().trail_len(), 20);

    // Oldest points were dropped first.
    let ids: Vec<u64> = layer.cursor().trail().map(|p| p.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*ids.last().unwrap(), 498);
}

#[test]
fn test_trail_samples_every_third_move() {
    let mut layer = mount();
    for i in 0..4 {
        layer.handle_pointer_move(10.0 * i as f32, 0.0);
    }
    let ids: Vec<u64> = layer.cursor().trail().map(|p| p.id).collect();
    assert_eq!(ids, vec![0, 3]);
    assert_eq!(layer.cursor().state().position, Vec2::new(30.0, 0.0));
}

#[test]
fn test_trail_point_fades_after_twenty_ticks() {
    let start = Instant::now();
    let mut layer = mount_at(start);
    layer.handle_pointer_move(5.0, 5.0);

    let period = Duration::from_millis(50);
    assert_eq!(layer.poll_timers(start + period * 19), 19);
    let point = layer.cursor().trail().next().copied().unwrap();
    assert!((point.opacity - 0.05).abs() < 1e-4);

    assert_eq!(layer.poll_timers(start + period * 20), 1);
    assert_eq!(layer.cursor().trail_len(), 0);
}

#[test]
fn test_decay_reduces_each_point_by_one_step() {
    let start = Instant::now();
    let mut layer = mount_at(start);
    for i in 0..7 {
        layer.handle_pointer_move(i as f32, 0.0);
    }
    let before: Vec<f32> = layer.cursor().trail().map(|p| p.opacity).collect();

    layer.poll_timers(start + Duration::from_millis(50));
    let after: Vec<f32> = layer.cursor().trail().map(|p| p.opacity).collect();

    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert!((b - a - 0.05).abs() < 1e-6);
    }
}

#[test]
fn test_hover_follows_ancestry_chain() {
    let mut layer = mount();
    let page = RegionMap::new()
        .with_region(Vec2::ZERO, Vec2::new(100.0, 40.0), ElementRole::Button, &[])
        .with_region(
            Vec2::new(200.0, 0.0),
            Vec2::new(300.0, 40.0),
            ElementRole::Other,
            &[ElementRole::Link],
        );

    let over_button = page.target_at(Vec2::new(50.0, 20.0));
    layer.handle_pointer_over(over_button);
    assert!(layer.cursor().state().is_hovering);
    assert_eq!(layer.cursor().state().active_color, Accent::Secondary);

    // A span nested inside a link still counts.
    let inside_link = page.target_at(Vec2::new(250.0, 20.0));
    assert!(is_interactive(inside_link));
    layer.handle_pointer_over(inside_link);
    assert!(layer.cursor().state().is_hovering);

    layer.handle_pointer_over(page.target_at(Vec2::new(500.0, 500.0)));
    assert!(!layer.cursor().state().is_hovering);
    assert_eq!(layer.cursor().state().active_color, Accent::Primary);
}

#[test]
fn test_dot_springs_toward_pointer() {
    let mut layer = mount();
    layer.handle_pointer_move(400.0, 300.0);
    for _ in 0..240 {
        layer.update(1.0 / 60.0);
    }
    let dot = layer.cursor().dot_position();
    let ring = layer.cursor().ring_position();
    assert!(dot.distance(Vec2::new(400.0, 300.0)) < 1.0);
    assert!(ring.distance(Vec2::new(400.0, 300.0)) < 1.0);
}

// ============================================================================
// Backdrop
// ============================================================================

#[test]
fn test_particles_jitter_within_bound() {
    let mut layer = mount();
    let before: Vec<Vec3> = layer.particles().positions().collect();
    let ptr = layer.particles().buffer_ptr();

    layer.update(1.0 / 60.0);

    let after: Vec<Vec3> = layer.particles().positions().collect();
    assert_eq!(after.len(), 50);
    for (b, a) in before.iter().zip(&after) {
        let d = (*a - *b).abs();
        assert!(d.max_element() <= 0.005 + 1e-6);
    }
    assert_eq!(layer.particles().buffer_ptr(), ptr);
}

#[test]
fn test_particles_start_inside_cube() {
    let layer = mount();
    for p in layer.particles().positions() {
        assert!(p.abs().max_element() <= 7.5);
    }
}

#[test]
fn test_same_seed_same_scene() {
    let a = mount();
    let b = mount();
    let pa: Vec<Vec3> = a.particles().positions().collect();
    let pb: Vec<Vec3> = b.particles().positions().collect();
    assert_eq!(pa, pb);
    assert_eq!(a.starfield().stars(), b.starfield().stars());
}

#[test]
fn test_terrain_time_increases_and_resets_on_remount() {
    let mut layer = mount();
    let mut last = layer.terrain().time();
    assert_eq!(last, 0.0);
    for _ in 0..30 {
        layer.update(1.0 / 60.0);
        let t = layer.terrain().time();
        assert!(t > last);
        last = t;
    }

    layer.dispose();
    let fresh = mount();
    assert_eq!(fresh.terrain().time(), 0.0);
}

#[test]
fn test_decorative_mode_ignores_drag() {
    let mut layer = mount();
    let camera = layer.camera().clone();

    layer.handle_pointer_button(true);
    layer.handle_pointer_move(100.0, 100.0);
    layer.handle_pointer_move(300.0, 200.0);

    assert!(!layer.routes_pointer_to_surface());
    assert_eq!(*layer.camera(), camera);
}

#[test]
fn test_interactable_mode_orbits_without_zoom() {
    let mut layer = EffectsLayer::mount(EffectsConfig::default().with_seed(11).with_interactable(true)).unwrap();
    let camera = layer.camera().clone();

    layer.handle_pointer_button(true);
    layer.handle_pointer_move(100.0, 100.0);
    layer.handle_pointer_move(160.0, 120.0);
    layer.handle_pointer_button(false);

    assert!(layer.routes_pointer_to_surface());
    assert_ne!(layer.camera().yaw, camera.yaw);
    assert_eq!(layer.camera().distance, camera.distance);

    assert!(!layer.handle_scroll(3.0));
    assert_eq!(layer.camera().distance, camera.distance);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_dispose_freezes_everything() {
    let start = Instant::now();
    let mut layer = mount_at(start);
    layer.handle_pointer_move(1.0, 1.0);
    layer.update(0.1);

    layer.dispose();
    layer.dispose();
    assert!(!layer.is_mounted());

    let elapsed = layer.elapsed();
    let particles: Vec<Vec3> = layer.particles().positions().collect();

    layer.handle_pointer_move(50.0, 50.0);
    layer.handle_pointer_over(&[ElementRole::Button]);
    layer.update(0.1);

    assert_eq!(layer.poll_timers(start + Duration::from_secs(5)), 0);
    assert_eq!(layer.next_timer_deadline(), None);
    assert_eq!(layer.cursor().trail_len(), 0);
    assert!(!layer.cursor().state().is_hovering);
    assert_eq!(layer.elapsed(), elapsed);
    assert_eq!(layer.particles().positions().collect::<Vec<_>>(), particles);
    assert_eq!(layer.cursor().shapes().count(), 0);
}

#[test]
fn test_mount_rejects_invalid_config() {
    let config = EffectsConfig::default().with_particle_count(0);
    assert!(matches!(
        EffectsLayer::mount(config),
        Err(ConfigError::InvalidValue { field: "particles.count", .. })
    ));

    let mut config = EffectsConfig::default();
    config.cursor.decay_period_ms = 0;
    assert!(EffectsLayer::mount(config).is_err());
}

#[test]
fn test_config_json_round_trip() {
    let config = EffectsConfig::default().with_seed(5).with_interactable(true);
    let json = serde_json::to_string(&config).unwrap();
    let back = EffectsConfig::from_json(&json).unwrap();
    assert_eq!(back.seed, Some(5));
    assert!(back.scene.interactable);
    assert_eq!(back.theme.accent_a.to_hex(), "#00e5ff");
}
