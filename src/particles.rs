//! Drifting particle field.
//!
//! A fixed number of points scattered uniformly in a cube and nudged each
//! frame by slow sine/cosine offsets. Positions are updated in place; the
//! buffer is allocated once at construction and never grows.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ensure_positive, ensure_unit, Rgb};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: u32,
    /// Initial positions are drawn from `[-half_extent, half_extent]³`.
    pub half_extent: f32,
    /// Largest per-axis displacement in one frame.
    pub jitter: f32,
    /// Sprite size in world units.
    pub size: f32,
    pub color: Rgb,
    pub opacity: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 50,
            half_extent: 7.5,
            jitter: 0.005,
            size: 0.1,
            color: Rgb::from_srgb8([0x9a, 0x7f, 0xd1]),
            opacity: 0.6,
        }
    }
}

impl ParticleConfig {
    /// Largest supported particle count.
    pub const MAX_COUNT: u32 = 100_000;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 || self.count > Self::MAX_COUNT {
            return Err(ConfigError::invalid(
                "particles.count",
                format!("must be within 1..={}, got {}", Self::MAX_COUNT, self.count),
            ));
        }
        ensure_positive("particles.half_extent", self.half_extent)?;
        ensure_unit("particles.jitter", self.jitter)?;
        ensure_positive("particles.size", self.size)?;
        ensure_unit("particles.opacity", self.opacity)?;
        Ok(())
    }
}

/// GPU layout of one particle position.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub _pad: f32,
}

/// Fixed-size set of drifting points.
#[derive(Clone, Debug)]
pub struct ParticleField {
    instances: Vec<ParticleInstance>,
    jitter: f32,
}

impl ParticleField {
    /// Scatter `config.count` particles using `rng`.
    pub fn new(config: &ParticleConfig, rng: &mut impl Rng) -> Self {
        let h = config.half_extent;
        let instances = (0..config.count)
            .map(|_| ParticleInstance {
                position: [
                    rng.gen_range(-h..=h),
                    rng.gen_range(-h..=h),
                    rng.gen_range(-h..=h),
                ],
                _pad: 0.0,
            })
            .collect();

        Self {
            instances,
            jitter: config.jitter,
        }
    }

    /// Apply one frame of drift at elapsed time `t` seconds.
    pub fn update(&mut self, t: f32) {
        let j = self.jitter;
        for (i, p) in self.instances.iter_mut().enumerate() {
            let i = i as f32;
            p.position[0] += (t * 0.1 + i * 0.1).sin() * j;
            p.position[1] += (t * 0.15 + i * 0.05).cos() * j;
            p.position[2] += (t * 0.05 + i * 0.07).sin() * j;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.instances.get(index).map(|p| Vec3::from(p.position))
    }

    pub fn positions(&self) -> impl ExactSizeIterator<Item = Vec3> + '_ {
        self.instances.iter().map(|p| Vec3::from(p.position))
    }

    /// Raw instance data for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Address of the backing buffer; stable for the life of the field.
    pub fn buffer_ptr(&self) -> *const ParticleInstance {
        self.instances.as_ptr()
    }
}
