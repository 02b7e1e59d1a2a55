//! Startup configuration loaded from an optional TOML file.
//!
//! Every section uses `#[serde(default)]`, so a file that only overrides a
//! single value (say `[interaction] fly_duration = 0.5`) is valid.

use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::SceneError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) scene: SceneConfig,
    pub(crate) camera: CameraConfig,
    pub(crate) interaction: InteractionConfig,
    pub(crate) screenshot_dir: PathBuf,
}

/// Placement of the photo billboards and the procedural city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SceneConfig {
    pub(crate) photo_count: usize,
    /// Photos are scattered over `[-world_extent, world_extent]` on X and Z
    pub(crate) world_extent: f32,
    pub(crate) min_height: f32,
    pub(crate) max_height: f32,
    pub(crate) photo_width: f32,
    pub(crate) photo_height: f32,
    pub(crate) seed: u64,
    /// City blocks per side of the square grid
    pub(crate) city_blocks: usize,
    pub(crate) photo_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CameraConfig {
    pub(crate) fovy_degrees: f32,
    pub(crate) znear: f32,
    pub(crate) zfar: f32,
    pub(crate) eye: [f32; 3],
    pub(crate) target: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct InteractionConfig {
    /// Seconds for a fly-to transition
    pub(crate) fly_duration: f32,
    /// Radians of yaw per pixel of horizontal drag
    pub(crate) orbit_sensitivity: f32,
    /// World units of height per pixel of vertical drag
    pub(crate) height_sensitivity: f32,
    /// Floor the camera can never be dragged below
    pub(crate) min_camera_height: f32,
    /// Fraction of the eye-to-target distance kept per wheel notch
    pub(crate) zoom_factor: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scene: SceneConfig::default(),
            camera: CameraConfig::default(),
            interaction: InteractionConfig::default(),
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            photo_count: 40,
            world_extent: 60.0,
            min_height: 8.0,
            max_height: 30.0,
            photo_width: 4.0,
            photo_height: 3.0,
            seed: 7,
            city_blocks: 12,
            photo_dir: PathBuf::from("photos"),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy_degrees: 45.0,
            znear: 0.1,
            zfar: 500.0,
            eye: [0.0, 60.0, 120.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            fly_duration: 1.5,
            orbit_sensitivity: 0.005,
            height_sensitivity: 0.1,
            min_camera_height: 1.0,
            zoom_factor: 0.6,
        }
    }
}

impl CameraConfig {
    pub(crate) fn build_camera(&self) -> Camera {
        Camera {
            eye: Point3::from(self.eye),
            target: Point3::from(self.target),
            up: Vector3::y(),
            fovy: self.fovy_degrees.to_radians(),
            znear: self.znear,
            zfar: self.zfar,
        }
    }
}

impl Config {
    pub(crate) fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub(crate) fn from_toml(content: &str) -> Result<Self, SceneError> {
        toml::from_str(content).map_err(|e| SceneError::Config(e.to_string()))
    }

    /// Configuration from the file named by the first command line argument,
    /// falling back to defaults when there is none or it cannot be read.
    pub(crate) fn from_args() -> Self {
        let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
            log::info!("no config file given, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("failed to load {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }
}
