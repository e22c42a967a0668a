//! Error types for backdrop.
//!
//! Configuration problems fail fast at mount time. GPU problems are
//! reported but never fatal to the host: the layer is decorative and
//! degrades to a no-op overlay instead.

use std::fmt;

/// Errors raised while validating or loading an [`EffectsConfig`](crate::EffectsConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    InvalidValue {
        /// Dotted path of the offending field, e.g. `particles.count`.
        field: &'static str,
        /// Human readable description of the constraint.
        reason: String,
    },
    /// A color string could not be parsed as `#rrggbb` or `#rgb`.
    InvalidColor {
        field: &'static str,
        value: String,
    },
    /// Failed to read or write a configuration file.
    Io(std::io::Error),
    /// Failed to parse or serialize configuration JSON.
    Json(serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for `{}`: {}", field, reason)
            }
            ConfigError::InvalidColor { field, value } => write!(
                f,
                "Invalid color for `{}`: {:?} (expected #rrggbb or #rgb)",
                field, value
            ),
            ConfigError::Io(e) => write!(f, "Failed to access configuration file: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    NoSurfaceFormat,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::NoSurfaceFormat => write!(f, "The window surface does not support any texture format"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur when running the native host.
#[derive(Debug)]
pub enum EffectsError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// The effects configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for EffectsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectsError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            EffectsError::Window(e) => write!(f, "Failed to create window: {}", e),
            EffectsError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for EffectsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EffectsError::EventLoop(e) => Some(e),
            EffectsError::Window(e) => Some(e),
            EffectsError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for EffectsError {
    fn from(e: winit::error::EventLoopError) -> Self {
        EffectsError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for EffectsError {
    fn from(e: winit::error::OsError) -> Self {
        EffectsError::Window(e)
    }
}

impl From<ConfigError> for EffectsError {
    fn from(e: ConfigError) -> Self {
        EffectsError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message_names_field() {
        let err = ConfigError::invalid("particles.count", "must be greater than zero");
        let msg = err.to_string();
        assert!(msg.contains("particles.count"));
        assert!(msg.contains("greater than zero"));
    }

    #[test]
    fn test_config_error_wraps_into_effects_error() {
        let err: EffectsError = ConfigError::InvalidColor {
            field: "theme.accent_a",
            value: "teal".into(),
        }
        .into();
        assert!(matches!(err, EffectsError::Config(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
