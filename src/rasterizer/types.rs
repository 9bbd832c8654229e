//! Core types for the rasterizer

use serde::{Deserialize, Serialize};
use super::math::Vec4;

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Quantize a normalized RGBA vector. Truncates; `as` saturates out-of-range channels.
    pub fn from_vec4(c: Vec4) -> Self {
        Self {
            r: (c.x * 255.0) as u8,
            g: (c.y * 255.0) as u8,
            b: (c.z * 255.0) as u8,
            a: (c.w * 255.0) as u8,
        }
    }

    /// Back to normalized floats in [0, 1]
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }

    /// Integer luma (Rec. 601 weights)
    pub fn luma(self) -> u8 {
        ((self.r as u32 * 299 + self.g as u32 * 587 + self.b as u32 * 114) / 1000) as u8
    }

    /// Convert to [u8; 4] in RGBA order
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Channel layout of an image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    Grayscale,
    Rgb,
    #[default]
    Rgba,
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel
    pub const fn stride(self) -> usize {
        match self {
            PixelFormat::Grayscale => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
        }
    }

    /// Pack a color into `out` (exactly `stride()` bytes)
    pub fn pack(self, c: Color, out: &mut [u8]) {
        match self {
            PixelFormat::Grayscale => out[0] = c.luma(),
            PixelFormat::Rgb => out.copy_from_slice(&[c.r, c.g, c.b]),
            PixelFormat::Rgba => out.copy_from_slice(&[c.r, c.g, c.b, c.a]),
            PixelFormat::Bgra => out.copy_from_slice(&[c.b, c.g, c.r, c.a]),
        }
    }

    /// Unpack `stride()` bytes back into a color
    pub fn unpack(self, bytes: &[u8]) -> Color {
        match self {
            PixelFormat::Grayscale => Color::new(bytes[0], bytes[0], bytes[0]),
            PixelFormat::Rgb => Color::new(bytes[0], bytes[1], bytes[2]),
            PixelFormat::Rgba => Color::with_alpha(bytes[0], bytes[1], bytes[2], bytes[3]),
            PixelFormat::Bgra => Color::with_alpha(bytes[2], bytes[1], bytes[0], bytes[3]),
        }
    }
}

/// Primitive assembly mode for a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Point,
    Line,
    Triangle,
}

impl PrimitiveMode {
    /// Vertices consumed per primitive
    pub const fn vertex_count(self) -> usize {
        match self {
            PrimitiveMode::Point => 1,
            PrimitiveMode::Line => 2,
            PrimitiveMode::Triangle => 3,
        }
    }
}
