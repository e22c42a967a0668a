//! Post-processing settings and the CPU reference for the compositor math.
//!
//! The stack runs in a fixed order: bloom (bright pass, separable blur,
//! screen blend) then film noise (overlay blend). The helpers below mirror
//! `post_bright.wgsl` and `post_composite.wgsl`.

use serde::{Deserialize, Serialize};

use crate::config::{ensure_positive, ensure_unit};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    pub intensity: f32,
    /// Luminance at which pixels start to glow.
    pub threshold: f32,
    /// Width of the soft knee above the threshold.
    pub smoothing: f32,
    /// Height of the blur targets in pixels; width follows the aspect ratio.
    pub height: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 0.3,
            threshold: 0.3,
            smoothing: 0.9,
            height: 200,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub enabled: bool,
    pub opacity: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: 0.02,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub bloom: BloomConfig,
    pub noise: NoiseConfig,
}

impl PostConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.bloom;
        if !(b.intensity.is_finite() && b.intensity >= 0.0) {
            return Err(ConfigError::invalid("post.bloom.intensity", "must be zero or positive"));
        }
        ensure_unit("post.bloom.threshold", b.threshold)?;
        ensure_positive("post.bloom.smoothing", b.smoothing)?;
        if b.height == 0 || b.height > 4096 {
            return Err(ConfigError::invalid(
                "post.bloom.height",
                format!("must be within 1..=4096, got {}", b.height),
            ));
        }
        ensure_unit("post.noise.opacity", self.noise.opacity)?;
        Ok(())
    }

    /// Size of the blur targets for a surface of `width × height`.
    ///
    /// Never larger than the surface and never zero.
    pub fn bloom_extent(&self, width: u32, height: u32) -> (u32, u32) {
        let width = width.max(1);
        let height = height.max(1);
        let h = self.bloom.height.min(height).max(1);
        let w = ((width as u64 * h as u64) / height as u64).max(1) as u32;
        (w, h)
    }
}

/// Rec. 709 luma of a linear color.
#[inline]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}

/// Bright-pass weight for a pixel of luminance `luma`.
pub fn bright_weight(luma: f32, threshold: f32, smoothing: f32) -> f32 {
    smoothstep(threshold, threshold + smoothing, luma)
}

/// Screen blend of `bloom × intensity` over `base`.
#[inline]
pub fn screen(base: f32, bloom: f32, intensity: f32) -> f32 {
    let b = (bloom * intensity).clamp(0.0, 1.0);
    1.0 - (1.0 - base) * (1.0 - b)
}

/// Overlay blend of `noise` onto `base`, mixed in at `opacity`.
#[inline]
pub fn overlay(base: f32, noise: f32, opacity: f32) -> f32 {
    let blended = if base < 0.5 {
        2.0 * base * noise
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - noise)
    };
    base + (blended - base) * opacity
}

/// Normalised 9-tap Gaussian weights for the separable blur.
pub fn gaussian_weights() -> [f32; 5] {
    let sigma = 2.0f32;
    let mut w = [0.0f32; 5];
    for (i, slot) in w.iter_mut().enumerate() {
        let x = i as f32;
        *slot = (-(x * x) / (2.0 * sigma * sigma)).exp();
    }
    let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
    w.map(|v| v / total)
}

fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bloom_extent_follows_aspect() {
        let post = PostConfig::default();
        assert_eq!(post.bloom_extent(1600, 800), (400, 200));
        assert_eq!(post.bloom_extent(100, 50), (100, 50));
        assert_eq!(post.bloom_extent(0, 0), (1, 1));
    }

    #[test]
    fn test_bright_pass_threshold() {
        assert_eq!(bright_weight(0.2, 0.3, 0.9), 0.0);
        assert_eq!(bright_weight(1.5, 0.3, 0.9), 1.0);
        let mid = bright_weight(0.75, 0.3, 0.9);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_screen_never_darkens() {
        for i in 0..=10 {
            let base = i as f32 / 10.0;
            assert!(screen(base, 0.8, 0.3) >= base);
        }
        assert_eq!(screen(0.4, 0.0, 0.3), 0.4);
    }

    #[test]
    fn test_overlay_is_subtle() {
        for i in 0..=10 {
            let base = i as f32 / 10.0;
            assert!((overlay(base, 1.0, 0.02) - base).abs() <= 0.02);
            assert!((overlay(base, 0.0, 0.02) - base).abs() <= 0.02);
        }
    }

    #[test]
    fn test_gaussian_weights_sum_to_one() {
        let w = gaussian_weights();
        let sum = w[0] + 2.0 * (w[1] + w[2] + w[3] + w[4]);
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(w.windows(2).all(|p| p[0] > p[1]));
    }

    #[test]
    fn test_validation() {
        assert!(PostConfig::default().validate().is_ok());
        let mut cfg = PostConfig::default();
        cfg.noise.opacity = 1.5;
        assert!(cfg.validate().is_err());
    }
}
