//! Configuration for a mounted effects layer.
//!
//! Every section has sensible defaults matching the reference look, so an
//! empty JSON object is a valid configuration. Colors are written as CSS hex
//! strings and converted to linear RGB on load.
//!
//! ```ignore
//! let config = EffectsConfig::default()
//!     .with_interactable(true)
//!     .with_seed(7);
//! config.validate()?;
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::cursor::CursorConfig;
use crate::error::ConfigError;
use crate::particles::ParticleConfig;
use crate::post::PostConfig;
use crate::starfield::{LightingConfig, StarfieldConfig};
use crate::terrain::TerrainConfig;

/// Linear RGB color, serialized as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    linear: [f32; 3],
    srgb: [u8; 3],
}

impl Rgb {
    /// Parse `#rrggbb` or `#rgb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let srgb = match digits.len() {
            6 => [
                u8::from_str_radix(digits.get(0..2)?, 16).ok()?,
                u8::from_str_radix(digits.get(2..4)?, 16).ok()?,
                u8::from_str_radix(digits.get(4..6)?, 16).ok()?,
            ],
            3 => {
                let mut out = [0u8; 3];
                for (slot, ch) in out.iter_mut().zip(digits.chars()) {
                    let v = ch.to_digit(16)? as u8;
                    *slot = v * 17;
                }
                out
            }
            _ => return None,
        };
        Some(Self::from_srgb8(srgb))
    }

    /// Parse a hex color, naming `field` in the error.
    pub fn parse(field: &'static str, hex: &str) -> Result<Self, ConfigError> {
        Self::from_hex(hex).ok_or_else(|| ConfigError::InvalidColor {
            field,
            value: hex.to_string(),
        })
    }

    pub fn from_srgb8(srgb: [u8; 3]) -> Self {
        Self {
            linear: srgb.map(|c| srgb_to_linear(c as f32 / 255.0)),
            srgb,
        }
    }

    /// Linear RGB components, ready for the GPU.
    #[inline]
    pub fn linear(&self) -> [f32; 3] {
        self.linear
    }

    /// Linear RGB with an alpha channel appended.
    #[inline]
    pub fn with_alpha(&self, alpha: f32) -> [f32; 4] {
        let [r, g, b] = self.linear;
        [r, g, b, alpha]
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.srgb;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value).ok_or_else(|| format!("invalid color {:?}", value))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Which of the two theme accents the cursor is drawn in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Accent {
    /// Resting accent (cyan).
    #[default]
    Primary,
    /// Accent used while hovering an interactive element (magenta).
    Secondary,
}

/// Immutable color theme shared by the cursor overlay and the backdrop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub accent_a: Rgb,
    pub accent_b: Rgb,
    /// Terrain color at the lowest elevation.
    pub terrain_a: Rgb,
    /// Terrain color at the highest elevation.
    pub terrain_b: Rgb,
    /// Clear color behind the scene; also used as fog color.
    pub background: Rgb,
}

impl Theme {
    pub fn accent(&self, accent: Accent) -> Rgb {
        match accent {
            Accent::Primary => self.accent_a,
            Accent::Secondary => self.accent_b,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent_a: Rgb::from_srgb8([0x00, 0xe5, 0xff]),
            accent_b: Rgb::from_srgb8([0xff, 0x2b, 0xd6]),
            terrain_a: Rgb::from_srgb8([0x4f, 0x98, 0xca]),
            terrain_b: Rgb::from_srgb8([0x6a, 0x5a, 0xcd]),
            background: Rgb::from_srgb8([0x12, 0x12, 0x12]),
        }
    }
}

/// The only setting the host must decide at mount time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// When true, pointer events reach the 3D surface and orbit dragging is
    /// enabled. When false, the surface passes every event through.
    pub interactable: bool,
}

/// Complete configuration of an effects layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub scene: SceneConfig,
    pub theme: Theme,
    pub camera: CameraConfig,
    pub terrain: TerrainConfig,
    pub particles: ParticleConfig,
    pub stars: StarfieldConfig,
    pub lighting: LightingConfig,
    pub post: PostConfig,
    pub cursor: CursorConfig,
    /// Seed for particle and star placement. `None` draws from the OS RNG.
    pub seed: Option<u64>,
}

impl EffectsConfig {
    pub fn with_interactable(mut self, interactable: bool) -> Self {
        self.scene.interactable = interactable;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Set both cursor accents from hex strings.
    pub fn with_accents(mut self, primary: &str, secondary: &str) -> Result<Self, ConfigError> {
        self.theme.accent_a = Rgb::parse("theme.accent_a", primary)?;
        self.theme.accent_b = Rgb::parse("theme.accent_b", secondary)?;
        Ok(self)
    }

    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particles.count = count;
        self
    }

    /// Check every section. Called by [`EffectsLayer::mount`](crate::EffectsLayer::mount).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        self.terrain.validate()?;
        self.particles.validate()?;
        self.stars.validate()?;
        self.lighting.validate()?;
        self.post.validate()?;
        self.cursor.validate()?;
        Ok(())
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and validate a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Shared range check used by the section validators.
pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be a positive number, got {}", value)))
    }
}

pub(crate) fn ensure_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be within [0, 1], got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        let c = Rgb::from_hex("#4f98ca").unwrap();
        assert_eq!(c.to_hex(), "#4f98ca");
        assert_eq!(Rgb::from_hex("fff").unwrap().to_hex(), "#ffffff");
        assert!(Rgb::from_hex("#12345").is_none());
        assert!(Rgb::from_hex("#gg0000").is_none());
    }

    #[test]
    fn test_linear_conversion() {
        let white = Rgb::from_hex("#ffffff").unwrap().linear();
        let black = Rgb::from_hex("#000000").unwrap().linear();
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));
        assert!(black.iter().all(|c| *c == 0.0));

        // sRGB mid-grey is darker in linear space.
        let grey = Rgb::from_hex("#808080").unwrap().linear();
        assert!(grey[0] > 0.2 && grey[0] < 0.23);
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = EffectsConfig::from_json("{}").unwrap();
        assert_eq!(config, EffectsConfig::default());
        assert!(!config.scene.interactable);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EffectsConfig::default().with_interactable(true).with_seed(42);
        let json = serde_json::to_string(&config).unwrap();
        let back = EffectsConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
        assert!(json.contains("\"#4f98ca\""));
    }

    #[test]
    fn test_bad_color_in_json_is_rejected() {
        let err = EffectsConfig::from_json(r#"{ "theme": { "accent_a": "teal" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_with_accents() {
        let config = EffectsConfig::default().with_accents("#ff0000", "#00ff00").unwrap();
        assert_eq!(config.theme.accent(Accent::Primary).to_hex(), "#ff0000");
        assert_eq!(config.theme.accent(Accent::Secondary).to_hex(), "#00ff00");

        let err = EffectsConfig::default().with_accents("red", "#00ff00").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidColor { field: "theme.accent_a", .. }));
    }

    #[test]
    fn test_zero_particle_count_fails_validation() {
        let err = EffectsConfig::default().with_particle_count(0).validate().unwrap_err();
        assert!(err.to_string().contains("particles.count"));
    }
}
