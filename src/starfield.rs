//! Starfield and scene atmosphere.
//!
//! Stars are generated once per mount and never move; only their size
//! twinkles in the shader. Lighting and fog are constant for the life of
//! the scene.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ensure_positive, ensure_unit, Rgb};
use crate::error::ConfigError;

/// Point lights supported by the scene uniform.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    /// Radius of the innermost shell.
    pub radius: f32,
    /// Thickness of the shell stars are spread through.
    pub depth: f32,
    pub count: u32,
    /// Size multiplier.
    pub factor: f32,
    /// HSL saturation of star colors; 0 gives white stars.
    pub saturation: f32,
    /// Soften each sprite toward its edge.
    pub fade: bool,
    /// Twinkle speed.
    pub speed: f32,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            radius: 60.0,
            depth: 50.0,
            count: 500,
            factor: 2.0,
            saturation: 0.0,
            fade: true,
            speed: 0.5,
        }
    }
}

impl StarfieldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("stars.radius", self.radius)?;
        ensure_positive("stars.factor", self.factor)?;
        ensure_unit("stars.saturation", self.saturation)?;
        if !(self.depth.is_finite() && self.depth >= 0.0) {
            return Err(ConfigError::invalid("stars.depth", "must be zero or positive"));
        }
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(ConfigError::invalid("stars.speed", "must be zero or positive"));
        }
        if self.count > 100_000 {
            return Err(ConfigError::invalid(
                "stars.count",
                format!("must be at most 100000, got {}", self.count),
            ));
        }
        Ok(())
    }
}

/// One star as uploaded to the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Star {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

/// Immutable set of stars.
#[derive(Clone, Debug)]
pub struct Starfield {
    stars: Vec<Star>,
    fade: bool,
    speed: f32,
}

impl Starfield {
    /// Place `config.count` stars on shells shrinking from `radius + depth`
    /// toward `radius`.
    pub fn generate(config: &StarfieldConfig, rng: &mut impl Rng) -> Self {
        let count = config.count.max(1) as f32;
        let mut r = config.radius + config.depth;
        let increment = config.depth / count;

        let stars = (0..config.count)
            .map(|i| {
                r -= increment * rng.gen::<f32>();
                let dir = random_direction(rng);
                let [cr, cg, cb] = hsl_to_rgb(i as f32 / count, config.saturation, 0.9);
                Star {
                    position: (dir * r).to_array(),
                    size: (0.5 + 0.5 * rng.gen::<f32>()) * config.factor,
                    color: [cr, cg, cb, 1.0],
                }
            })
            .collect();

        Self {
            stars,
            fade: config.fade,
            speed: config.speed,
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    pub fn fade(&self) -> bool {
        self.fade
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.stars)
    }
}

/// Uniform direction on the unit sphere.
fn random_direction(rng: &mut impl Rng) -> Vec3 {
    let phi = rng.gen::<f32>() * TAU;
    let cos_theta = rng.gen_range(-1.0f32..=1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    Vec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin())
}

/// HSL (all components in `[0, 1]`) to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s <= 0.0 {
        return [l, l, l];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h.rem_euclid(1.0);
    [
        hue_channel(p, q, h + 1.0 / 3.0),
        hue_channel(p, q, h),
        hue_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

// ============================================================================
// Lighting and fog
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Rgb,
    pub intensity: f32,
}

/// Linear distance fog. The color is the theme background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub enabled: bool,
    pub near: f32,
    pub far: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            near: 8.0,
            far: 25.0,
        }
    }
}

impl FogConfig {
    /// Fog amount in `[0, 1]` at view distance `d`.
    pub fn factor(&self, d: f32) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        ((d - self.near) / (self.far - self.near)).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_intensity: f32,
    pub point_lights: Vec<PointLight>,
    pub fog: FogConfig,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.1,
            point_lights: vec![
                PointLight {
                    position: Vec3::splat(10.0),
                    color: Rgb::from_srgb8([0x9a, 0x7f, 0xd1]),
                    intensity: 0.3,
                },
                PointLight {
                    position: Vec3::splat(-10.0),
                    color: Rgb::from_srgb8([0x4f, 0x98, 0xca]),
                    intensity: 0.3,
                },
            ],
            fog: FogConfig::default(),
        }
    }
}

impl LightingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ambient_intensity.is_finite() && self.ambient_intensity >= 0.0) {
            return Err(ConfigError::invalid(
                "lighting.ambient_intensity",
                "must be zero or positive",
            ));
        }
        if self.point_lights.len() > MAX_POINT_LIGHTS {
            return Err(ConfigError::invalid(
                "lighting.point_lights",
                format!("at most {} lights are supported", MAX_POINT_LIGHTS),
            ));
        }
        for light in &self.point_lights {
            if !(light.intensity.is_finite() && light.intensity >= 0.0) || !light.position.is_finite() {
                return Err(ConfigError::invalid(
                    "lighting.point_lights",
                    "positions must be finite and intensities non-negative",
                ));
            }
        }
        if self.fog.enabled {
            ensure_positive("lighting.fog.far", self.fog.far)?;
            if !(self.fog.near.is_finite() && self.fog.near >= 0.0 && self.fog.near < self.fog.far) {
                return Err(ConfigError::invalid(
                    "lighting.fog.near",
                    "must be non-negative and less than fog.far",
                ));
            }
        }
        Ok(())
    }

    /// Light reaching a surface at `position`: ambient plus each point light
    /// with inverse-square falloff (no normal term, sprites face the camera).
    pub fn irradiance(&self, position: Vec3) -> Vec3 {
        self.point_lights.iter().fold(Vec3::splat(self.ambient_intensity), |acc, light| {
            let d2 = (light.position - position).length_squared().max(1.0);
            acc + Vec3::from(light.color.linear()) * light.intensity * (100.0 / d2)
        })
    }

    /// Particle color after lighting. Ambient alone leaves `base` unchanged;
    /// nearby point lights tint it.
    pub fn tint(&self, base: [f32; 3], position: Vec3) -> Vec3 {
        let base = Vec3::from(base);
        base * (1.0 - self.ambient_intensity) + base * self.irradiance(position)
    }
}
