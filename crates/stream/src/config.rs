use std::path::Path;

use serde::{Deserialize, Serialize};
use tilestream_tile::{TileConfig, TileError};

/// Errors from loading or validating a stream config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Tile(#[from] TileError),
    #[error("invalid camera config: {0}")]
    Camera(String),
    #[error("invalid controls config: {0}")]
    Controls(String),
}

/// Orthographic camera parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical extent of the view at zoom 1.
    pub ortho_size: f64,
    pub aspect: f64,
    /// Distance along each axis from the look-at point to the eye.
    pub offset_scalar: f64,
    pub near: f64,
    pub far: f64,
    pub min_zoom: f64,
    /// `None` means unbounded.
    pub max_zoom: Option<f64>,
    pub zoom_speed: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ortho_size: 20.0,
            aspect: 16.0 / 9.0,
            offset_scalar: 1000.0,
            near: 0.1,
            far: 10000.0,
            min_zoom: 0.0,
            max_zoom: None,
            zoom_speed: 1.0,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("ortho_size", self.ortho_size),
            ("aspect", self.aspect),
            ("offset_scalar", self.offset_scalar),
            ("near", self.near),
            ("far", self.far),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom.unwrap_or(1.0)),
            ("zoom_speed", self.zoom_speed),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Camera(format!("{name} must be finite, got {value}")));
        }
        if !(self.ortho_size > 0.0 && self.aspect > 0.0) {
            return Err(ConfigError::Camera(format!(
                "ortho_size and aspect must be positive, got {} and {}",
                self.ortho_size, self.aspect
            )));
        }
        // A zero offset puts the eye on the look-at point.
        if self.offset_scalar <= 0.0 {
            return Err(ConfigError::Camera(format!(
                "offset_scalar must be positive, got {}",
                self.offset_scalar
            )));
        }
        if self.near >= self.far {
            return Err(ConfigError::Camera(format!(
                "near ({}) must be below far ({})",
                self.near, self.far
            )));
        }
        if self.min_zoom < 0.0 {
            return Err(ConfigError::Camera(format!(
                "min_zoom must not be negative, got {}",
                self.min_zoom
            )));
        }
        if let Some(max) = self.max_zoom {
            if max <= 0.0 || max < self.min_zoom {
                return Err(ConfigError::Camera(format!(
                    "max_zoom ({max}) must be positive and at least min_zoom ({})",
                    self.min_zoom
                )));
            }
        }
        Ok(())
    }

    /// World extent of the view at zoom 1, as `(width, height)`.
    pub fn extent(&self) -> (f64, f64) {
        (self.ortho_size * self.aspect, self.ortho_size)
    }
}

/// Drag, wheel and idle auto-pan behaviour of [`TopDownControls`].
///
/// [`TopDownControls`]: crate::TopDownControls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Multiplier on drag distance.
    pub pan_speed: f64,
    /// Viewport size in pixels; drag deltas are measured against it.
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Idle time before auto-pan starts.
    pub idle_secs: f64,
    /// Auto-pan speed in pixels per millisecond.
    pub auto_pan_rate: f64,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            pan_speed: 1.0,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            idle_secs: 2.0,
            auto_pan_rate: 0.1,
        }
    }
}

impl ControlsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("pan_speed", self.pan_speed),
            ("viewport_width", self.viewport_width),
            ("viewport_height", self.viewport_height),
            ("idle_secs", self.idle_secs),
            ("auto_pan_rate", self.auto_pan_rate),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Controls(format!("{name} must be finite, got {value}")));
        }
        if self.viewport_width <= 0.0 || self.viewport_height <= 0.0 {
            return Err(ConfigError::Controls(format!(
                "viewport must be positive, got {}x{}",
                self.viewport_width, self.viewport_height
            )));
        }
        if self.idle_secs < 0.0 {
            return Err(ConfigError::Controls(format!(
                "idle_secs must not be negative, got {}",
                self.idle_secs
            )));
        }
        Ok(())
    }
}

/// Everything the streamer needs besides assets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Noise seed shared by every tile.
    pub seed: u64,
    pub tile: TileConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
}

impl StreamConfig {
    /// Parse and validate a YAML document. Missing fields take defaults.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.as_ref().display(), seed = config.seed, "config loaded");
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tile.validate()?;
        self.camera.validate()?;
        self.controls.validate()
    }
}
