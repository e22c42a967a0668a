//! # backdrop
//!
//! An ambient visual-effects layer for an application window: a
//! spring-animated cursor with a decaying trail drawn above everything, and
//! an animated 3D backdrop (grid terrain, jittering particles, a twinkling
//! starfield) drawn below the host's content with bloom and film noise.
//!
//! ## Quick Start
//!
//! ```ignore
//! use backdrop::prelude::*;
//!
//! fn main() -> Result<(), EffectsError> {
//!     let config = EffectsConfig::default().with_seed(7);
//!     backdrop::app::run(config)
//! }
//! ```
//!
//! ## Embedding
//!
//! Hosts with their own event loop mount an [`EffectsLayer`] and drive it
//! directly, then hand it to a [`gpu::Renderer`] once per frame:
//!
//! ```ignore
//! let mut layer = EffectsLayer::mount(EffectsConfig::default())?;
//! layer.handle_pointer_move(x, y);
//! layer.handle_pointer_over(page.target_at(Vec2::new(x, y)));
//! layer.poll_timers(Instant::now());
//! layer.update(dt);
//! renderer.render(&layer, None)?;
//! ```
//!
//! ## Modes
//!
//! By default the 3D surface is decorative: every pointer event belongs to
//! the host and only the cursor overlay reacts. With
//! [`EffectsConfig::with_interactable`] left-drag orbits the camera.
//! Zoom and pan stay disabled in both modes.

pub mod app;
pub mod camera;
pub mod config;
pub mod cursor;
#[cfg(feature = "egui")]
pub mod debug;
pub mod error;
pub mod gpu;
pub mod particles;
pub mod post;
pub mod scene;
pub mod shaders;
pub mod spring;
pub mod starfield;
pub mod terrain;
pub mod time;

pub use config::{Accent, EffectsConfig, Rgb, Theme};
pub use cursor::{CursorTrail, ElementRole, HitTest, RegionMap};
pub use error::{ConfigError, EffectsError, GpuError};
pub use glam::{Vec2, Vec3};
pub use scene::EffectsLayer;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use backdrop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::{Camera, CameraConfig};
    pub use crate::config::{Accent, EffectsConfig, Rgb, SceneConfig, Theme};
    pub use crate::cursor::{CursorConfig, CursorTrail, ElementRole, HitTest, RegionMap};
    pub use crate::error::{ConfigError, EffectsError, GpuError};
    pub use crate::gpu::Renderer;
    pub use crate::particles::ParticleConfig;
    pub use crate::post::{BloomConfig, NoiseConfig, PostConfig};
    pub use crate::scene::EffectsLayer;
    pub use crate::starfield::{FogConfig, LightingConfig, PointLight, StarfieldConfig};
    pub use crate::terrain::TerrainConfig;
    pub use crate::{Vec2, Vec3};
}
