//! Bonnie Raster: a software 3D rasterizer
//!
//! Turns meshes into pixels without touching the GPU:
//! - Programmable vertex/fragment shaders
//! - Bresenham lines, barycentric triangle fill
//! - Z-buffer depth testing
//! - Text model loading with companion texture maps

pub mod rasterizer;
pub mod config;
pub mod scene;
mod error;

pub use error::{RasterError, RasterResult};

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
