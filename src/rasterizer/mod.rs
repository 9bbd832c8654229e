//! Software rasterizer
//!
//! Features:
//! - Programmable vertex and fragment stages (`Shader`)
//! - Points, Bresenham lines and barycentric triangle fill
//! - Z-buffer depth testing
//! - Nearest-neighbour texture sampling

mod math;
mod types;
mod image;
mod mesh;
mod shader;
mod render;

pub use math::*;
pub use types::*;
pub use self::image::*;
pub use mesh::*;
pub use shader::*;
pub use render::*;

/// Default target dimensions (PS1 resolution)
pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 240;
