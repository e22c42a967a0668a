//! Perspective camera and orbit controls.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::ensure_positive;
use crate::error::ConfigError;

/// Pitch is kept just short of the poles so `look_at` stays defined.
const PITCH_LIMIT: f32 = 1.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of orbit per logical pixel of drag.
    pub rotate_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            rotate_speed: 0.005,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_degrees.is_finite() && self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::invalid(
                "camera.fov_degrees",
                format!("must be within (0, 180), got {}", self.fov_degrees),
            ));
        }
        ensure_positive("camera.near", self.near)?;
        ensure_positive("camera.rotate_speed", self.rotate_speed)?;
        if !(self.far.is_finite() && self.far > self.near) {
            return Err(ConfigError::invalid("camera.far", "must be greater than camera.near"));
        }
        if !self.position.is_finite() || !self.target.is_finite() {
            return Err(ConfigError::invalid("camera.position", "must be finite"));
        }
        if self.position.distance_squared(self.target) <= f32::EPSILON {
            return Err(ConfigError::invalid(
                "camera.position",
                "must differ from camera.target",
            ));
        }
        Ok(())
    }
}

/// Orbit camera around a target point.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Camera placed at `config.position` looking at `config.target`.
    pub fn from_config(config: &CameraConfig) -> Self {
        let offset = config.position - config.target;
        let distance = offset.length();
        let pitch = (offset.y / distance)
            .clamp(-1.0, 1.0)
            .asin()
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let yaw = offset.x.atan2(offset.z);
        Self {
            yaw,
            pitch,
            distance,
            target: config.target,
            fov_y: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(1e-3), self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Rotate around the target by a drag of `delta` logical pixels.
    pub fn orbit(&mut self, delta: Vec2, speed: f32) {
        self.yaw -= delta.x * speed;
        self.pitch = (self.pitch + delta.y * speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

/// Drag-to-rotate controls. Zoom and pan are always off.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    enabled: bool,
    rotate_speed: f32,
    dragging: bool,
    last: Option<Vec2>,
}

impl OrbitControls {
    pub fn new(enabled: bool, rotate_speed: f32) -> Self {
        Self {
            enabled,
            rotate_speed,
            dragging: false,
            last: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.dragging = false;
            self.last = None;
        }
    }

    pub fn enable_zoom(&self) -> bool {
        false
    }

    pub fn enable_pan(&self) -> bool {
        false
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Primary button state change.
    pub fn handle_button(&mut self, pressed: bool) {
        if !self.enabled {
            return;
        }
        self.dragging = pressed;
        if !pressed {
            self.last = None;
        }
    }

    /// Pointer moved to `position`. Returns `true` if the camera changed.
    pub fn handle_move(&mut self, camera: &mut Camera, position: Vec2) -> bool {
        if !self.enabled || !self.dragging {
            return false;
        }
        let moved = match self.last {
            Some(last) => {
                camera.orbit(position - last, self.rotate_speed);
                true
            }
            None => false,
        };
        self.last = Some(position);
        moved
    }

    /// Wheel input. Zoom is disabled, so this never changes the camera.
    pub fn handle_scroll(&mut self, _camera: &mut Camera, _delta: f32) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_restores_position() {
        let cam = Camera::default();
        let p = cam.position();
        assert!((p - Vec3::new(0.0, 5.0, 10.0)).length() < 1e-4);
        assert!((cam.fov_y - 75f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_drag_rotates_only_when_enabled() {
        let mut cam = Camera::default();
        let mut controls = OrbitControls::new(false, 0.005);
        controls.handle_button(true);
        assert!(!controls.handle_move(&mut cam, Vec2::new(10.0, 10.0)));
        assert_eq!(cam, Camera::default());

        controls.set_enabled(true);
        controls.handle_button(true);
        assert!(!controls.handle_move(&mut cam, Vec2::new(10.0, 10.0)));
        assert!(controls.handle_move(&mut cam, Vec2::new(40.0, 10.0)));
        assert!(cam.yaw != Camera::default().yaw);
        assert!((cam.distance - Camera::default().distance).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = Camera::default();
        cam.orbit(Vec2::new(0.0, 100_000.0), 0.005);
        assert!(cam.pitch <= PITCH_LIMIT);
    }

    #[test]
    fn test_overhead_config_pitch_is_clamped() {
        let config = CameraConfig {
            position: Vec3::new(0.0, 10.0, 0.0),
            ..Default::default()
        };
        let camera = Camera::from_config(&config);
        assert_eq!(camera.pitch, PITCH_LIMIT);

        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn test_scroll_never_zooms() {
        let mut cam = Camera::default();
        let mut controls = OrbitControls::new(true, 0.005);
        assert!(!controls.handle_scroll(&mut cam, 5.0));
        assert_eq!(cam, Camera::default());
        assert!(!controls.enable_zoom() && !controls.enable_pan());
    }

    #[test]
    fn test_validation() {
        assert!(CameraConfig::default().validate().is_ok());
        let cfg = CameraConfig { near: 10.0, far: 5.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
