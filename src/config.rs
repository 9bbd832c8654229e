//! Render configuration loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable config files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RasterResult;
use crate::rasterizer::{PixelFormat, Vec3, HEIGHT, WIDTH};

/// Which shader the frame driver binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaderKind {
    /// Corner colors blended across each face
    Flat,
    /// Diffuse map only
    Textured,
    /// Ambient + diffuse lighting
    Lit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub distance: f32,
    /// Pitch in radians
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 4.0,
            pitch: 0.35,
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    /// Model file; the built-in cube when absent
    pub model: Option<PathBuf>,
    pub shader: ShaderKind,
    pub camera: CameraConfig,
    /// Direction toward the light
    pub light_dir: Vec3,
    pub light_color: Vec3,
    pub ambient: f32,
    /// Albedo used when the model has no diffuse map
    pub base_color: Vec3,
    /// Model spin in radians per second
    pub spin_speed: f32,
    /// Shade triangle rows in parallel
    pub parallel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            format: PixelFormat::Rgba,
            model: None,
            shader: ShaderKind::Lit,
            camera: CameraConfig::default(),
            light_dir: Vec3::new(1.0, 1.0, 1.0),
            light_color: Vec3::ONE,
            ambient: 0.2,
            base_color: Vec3::new(0.85, 0.75, 0.6),
            spin_speed: 0.8,
            parallel: true,
        }
    }
}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> RasterResult<RenderConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents)?;
    tracing::info!("loaded config {}", path.display());
    Ok(config)
}

/// Save a config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &RenderConfig, path: P) -> RasterResult<()> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load a config from a RON string (for embedded configs or testing)
pub fn load_config_from_str(s: &str) -> RasterResult<RenderConfig> {
    Ok(ron::from_str(s)?)
}
