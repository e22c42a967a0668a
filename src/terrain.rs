//! Animated wave terrain.
//!
//! A flat grid in the XZ plane whose vertices are displaced on the GPU by a
//! product of two sine waves. The functions in this module mirror the WGSL
//! in `shaders/terrain.wgsl` one for one, so the look can be checked on the
//! CPU.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::{ensure_positive, Theme};
use crate::error::ConfigError;

/// Grid lines per UV unit.
pub const GRID_FREQUENCY: f32 = 15.0;
/// Fraction of each grid cell drawn as a line.
pub const GRID_THRESHOLD: f32 = 0.98;
/// How far a grid line pulls the color toward white.
pub const GRID_STRENGTH: f32 = 0.15;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Edge length of the square plane, in world units.
    pub size: f32,
    /// Cells along each edge.
    pub segments: u32,
    /// Height at which the plane sits.
    pub y_offset: f32,
    /// Multiplier from elapsed seconds to wave time.
    pub time_scale: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 20.0,
            segments: 20,
            y_offset: -5.0,
            time_scale: 0.3,
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("terrain.size", self.size)?;
        ensure_positive("terrain.time_scale", self.time_scale)?;
        if self.segments == 0 || self.segments > 1024 {
            return Err(ConfigError::invalid(
                "terrain.segments",
                format!("must be within 1..=1024, got {}", self.segments),
            ));
        }
        if !self.y_offset.is_finite() {
            return Err(ConfigError::invalid("terrain.y_offset", "must be finite"));
        }
        Ok(())
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle grid.
#[derive(Clone, Debug)]
pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    /// Build a `segments × segments` grid of edge `size`, centred at the origin.
    ///
    /// `uv.y` is 0 on the +Z edge (toward the camera) and 1 on the -Z edge.
    pub fn grid(size: f32, segments: u32) -> Self {
        let n = segments.max(1);
        let row = n + 1;
        let half = size * 0.5;
        let step = size / n as f32;

        let mut vertices = Vec::with_capacity((row * row) as usize);
        for j in 0..row {
            let v = j as f32 / n as f32;
            let z = half - j as f32 * step;
            for i in 0..row {
                let u = i as f32 / n as f32;
                let x = -half + i as f32 * step;
                vertices.push(TerrainVertex {
                    position: [x, 0.0, z],
                    uv: [u, v],
                });
            }
        }

        let mut indices = Vec::with_capacity((n * n * 6) as usize);
        for j in 0..n {
            for i in 0..n {
                let a = j * row + i;
                let b = a + 1;
                let c = a + row;
                let d = c + 1;
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }

        Self { vertices, indices }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::grid(config.size, config.segments)
    }
}

/// Uniform block for `terrain.wgsl` (group 1).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainUniforms {
    pub color_a: [f32; 4],
    pub color_b: [f32; 4],
    pub time: f32,
    pub y_offset: f32,
    pub _pad: [f32; 2],
}

/// Time state of the mounted terrain.
#[derive(Clone, Debug)]
pub struct Terrain {
    config: TerrainConfig,
    color_a: [f32; 3],
    color_b: [f32; 3],
    time: f32,
}

impl Terrain {
    pub fn new(config: &TerrainConfig, theme: &Theme) -> Self {
        Self {
            config: config.clone(),
            color_a: theme.terrain_a.linear(),
            color_b: theme.terrain_b.linear(),
            time: 0.0,
        }
    }

    /// Set wave time from the layer's elapsed seconds.
    pub fn update(&mut self, elapsed: f32) {
        self.time = elapsed * self.config.time_scale;
    }

    /// Current wave time.
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn uniforms(&self) -> TerrainUniforms {
        let [ar, ag, ab] = self.color_a;
        let [br, bg, bb] = self.color_b;
        TerrainUniforms {
            color_a: [ar, ag, ab, 1.0],
            color_b: [br, bg, bb, 1.0],
            time: self.time,
            y_offset: self.config.y_offset,
            _pad: [0.0; 2],
        }
    }

    /// Linear RGBA of the surface at plane position `(x, z)` with texture
    /// coordinate `uv`, at the current time.
    pub fn shade(&self, x: f32, z: f32, uv: Vec2) -> [f32; 4] {
        let e = elevation(x, z, self.time);
        let a = Vec3::from(self.color_a);
        let b = Vec3::from(self.color_b);
        let base = a.lerp(b, mix_strength(e));
        let color = base.lerp(Vec3::ONE, grid_line(uv) * GRID_STRENGTH);
        [color.x, color.y, color.z, alpha(uv)]
    }
}

/// Vertical displacement of the plane at `(x, z)`.
#[inline]
pub fn elevation(x: f32, z: f32, t: f32) -> f32 {
    (x * 1.2 + t).sin() * 0.1 * (z * 1.5 + t * 0.6).sin()
}

/// Blend factor between the two terrain colors for an elevation.
///
/// Not clamped: peaks extrapolate slightly past `color_b`, as in the shader.
#[inline]
pub fn mix_strength(elevation: f32) -> f32 {
    (elevation + 0.1) * 1.5
}

/// 0, 1 or 2 depending on how many grid lines pass through `uv`.
#[inline]
pub fn grid_line(uv: Vec2) -> f32 {
    let g = (uv * GRID_FREQUENCY).fract();
    step(GRID_THRESHOLD, g.x) + step(GRID_THRESHOLD, g.y)
}

/// Opacity at `uv`; fades toward the far edge.
#[inline]
pub fn alpha(uv: Vec2) -> f32 {
    0.3 - uv.y * 0.2
}

#[inline]
fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dimensions() {
        let mesh = TerrainMesh::grid(20.0, 20);
        assert_eq!(mesh.vertices.len(), 21 * 21);
        assert_eq!(mesh.indices.len(), 20 * 20 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_grid_extent_and_uv() {
        let mesh = TerrainMesh::grid(20.0, 20);
        let first = mesh.vertices[0];
        let last = mesh.vertices[mesh.vertices.len() - 1];
        assert_eq!(first.position, [-10.0, 0.0, 10.0]);
        assert_eq!(first.uv, [0.0, 0.0]);
        assert_eq!(last.position, [10.0, 0.0, -10.0]);
        assert_eq!(last.uv, [1.0, 1.0]);
    }

    #[test]
    fn test_elevation_is_bounded() {
        for i in 0..100 {
            let t = i as f32 * 0.37;
            let e = elevation(i as f32 * 0.2 - 10.0, 10.0 - i as f32 * 0.2, t);
            assert!(e.abs() <= 0.1 + 1e-6);
        }
        assert_eq!(elevation(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_update_scales_time() {
        let mut terrain = Terrain::new(&TerrainConfig::default(), &Theme::default());
        terrain.update(10.0);
        assert!((terrain.time() - 3.0).abs() < 1e-6);
        assert!((terrain.uniforms().time - 3.0).abs() < 1e-6);
        assert_eq!(terrain.uniforms().y_offset, -5.0);
    }

    #[test]
    fn test_alpha_fades_to_horizon() {
        assert!((alpha(Vec2::new(0.5, 0.0)) - 0.3).abs() < 1e-6);
        assert!((alpha(Vec2::new(0.5, 1.0)) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_grid_lines() {
        assert_eq!(grid_line(Vec2::new(0.5 / 15.0, 0.5 / 15.0)), 0.0);
        assert_eq!(grid_line(Vec2::new(0.99 / 15.0, 0.5 / 15.0)), 1.0);
        assert_eq!(grid_line(Vec2::new(0.99 / 15.0, 0.99 / 15.0)), 2.0);
    }

    #[test]
    fn test_flat_shade_mixes_colors() {
        let theme = Theme::default();
        let terrain = Terrain::new(&TerrainConfig::default(), &theme);
        // At t = 0 and x = 0 elevation is 0, so the mix factor is 0.15.
        let c = terrain.shade(0.0, 3.0, Vec2::new(0.5 / 15.0, 0.5 / 15.0));
        let a = theme.terrain_a.linear();
        let b = theme.terrain_b.linear();
        for k in 0..3 {
            let expected = a[k] + (b[k] - a[k]) * 0.15;
            assert!((c[k] - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_validation() {
        assert!(TerrainConfig::default().validate().is_ok());
        let cfg = TerrainConfig { segments: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
