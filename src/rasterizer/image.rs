//! Pixel buffers: render targets and textures
//!
//! An `Image` is a flat byte buffer in one of the `PixelFormat` layouts.
//! Render targets default to a flipped vertical axis so that y grows upward
//! from the bottom row; decoded textures keep the file's top-down rows.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{RasterError, RasterResult};
use super::math::Vec2;
use super::types::{Color, PixelFormat};

#[derive(Debug, Clone, Default)]
pub struct Image {
    width: usize,
    height: usize,
    format: PixelFormat,
    flip_vertical: bool,
    pixels: Vec<u8>,
    pub name: String,
}

impl Image {
    /// Allocate a zeroed render target
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            flip_vertical: true,
            pixels: vec![0; width * height * format.stride()],
            name: String::new(),
        }
    }

    /// Zero-sized image; every read returns a zero color
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode an image file, detecting the channel count from the file
    pub fn load<P: AsRef<Path>>(path: P) -> RasterResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| {
            tracing::warn!("failed to load image {}: {}", path.display(), source);
            RasterError::ImageDecode { path: path.to_path_buf(), source }
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let image = Self::from_dynamic(img, name);
        tracing::debug!(
            "loaded image {} ({}x{}, {:?})",
            path.display(),
            image.width,
            image.height,
            image.format
        );
        Ok(image)
    }

    /// Decode an in-memory encoded image
    pub fn from_bytes(bytes: &[u8], name: String) -> RasterResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|source| RasterError::ImageDecode {
            path: name.clone().into(),
            source,
        })?;
        Ok(Self::from_dynamic(img, name))
    }

    fn from_dynamic(img: image::DynamicImage, name: String) -> Self {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let (format, pixels) = match img.color().channel_count() {
            1 => (PixelFormat::Grayscale, img.to_luma8().into_raw()),
            3 => (PixelFormat::Rgb, img.to_rgb8().into_raw()),
            _ => (PixelFormat::Rgba, img.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            format,
            flip_vertical: false,
            pixels,
            name,
        }
    }

    /// Encode the buffer to disk; the format is chosen from the extension.
    /// Rows are written in memory order.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RasterResult<()> {
        let path = path.as_ref();
        let (bytes, color) = match self.format {
            PixelFormat::Grayscale => (Cow::Borrowed(&self.pixels[..]), image::ColorType::L8),
            PixelFormat::Rgb => (Cow::Borrowed(&self.pixels[..]), image::ColorType::Rgb8),
            PixelFormat::Rgba => (Cow::Borrowed(&self.pixels[..]), image::ColorType::Rgba8),
            PixelFormat::Bgra => {
                let mut rgba = self.pixels.clone();
                for px in rgba.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                (Cow::Owned(rgba), image::ColorType::Rgba8)
            }
        };
        image::save_buffer(path, &bytes, self.width as u32, self.height as u32, color).map_err(
            |source| RasterError::ImageEncode { path: path.to_path_buf(), source },
        )
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn flip_vertical(&self) -> bool {
        self.flip_vertical
    }

    pub fn set_flip_vertical(&mut self, flip: bool) {
        self.flip_vertical = flip;
    }

    /// Raw bytes in memory row order (row 0 is the top of the picture)
    pub fn data(&self) -> &[u8] {
        &self.pixels
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Byte offset of logical pixel (x, y) after the vertical flip
    fn offset(&self, x: usize, y: usize) -> usize {
        let row = if self.flip_vertical { self.height - 1 - y } else { y };
        (row * self.width + x) * self.format.stride()
    }

    /// Write a pixel. The caller keeps (x, y) inside the image; out-of-range
    /// coordinates panic on the slice index.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let stride = self.format.stride();
        let idx = self.offset(x as usize, y as usize);
        self.format.pack(color, &mut self.pixels[idx..idx + stride]);
    }

    /// Read a pixel; zero for out-of-range coordinates or an empty image
    pub fn pixel(&self, x: i32, y: i32) -> Color {
        if self.is_empty() || !self.contains(x, y) {
            return Color::TRANSPARENT;
        }
        let stride = self.format.stride();
        let idx = self.offset(x as usize, y as usize);
        self.format.unpack(&self.pixels[idx..idx + stride])
    }

    /// Nearest-neighbour lookup at normalized coordinates, clamped to the edges
    pub fn sample(&self, uv: Vec2) -> Color {
        if self.is_empty() {
            return Color::TRANSPARENT;
        }
        let max_x = self.width as i32 - 1;
        let max_y = self.height as i32 - 1;
        let x = ((uv.x * self.width as f32) as i32).clamp(0, max_x);
        let y = ((uv.y * self.height as f32) as i32).clamp(0, max_y);
        self.pixel(x, y)
    }

    /// Zero-fill the whole buffer
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }
}
