//! Owned RGBA raster produced by every render tier.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tiny_skia::Pixmap;

use super::graphics_state::Color;
use crate::core::error::EpsResult;

/// A width x height grid of straight-alpha RGBA pixels, row-major, top row
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    /// Image of the given size filled with opaque `color`.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let pixel = color.rgba8();
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        RasterImage {
            width,
            height,
            data,
        }
    }

    /// Convert a rendered pixmap, undoing premultiplied alpha.
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        let mut data = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RasterImage {
            width: pixmap.width(),
            height: pixmap.height(),
            data,
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        RasterImage {
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
        }
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA value at (x, y), or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Encode as PNG.
    pub fn encode_png(&self) -> EpsResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_rgba_image()
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    /// Write a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> EpsResult<()> {
        self.to_rgba_image()
            .save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    /// Encode as baseline JPEG at `quality` (1-100). Alpha is dropped.
    pub fn encode_jpeg(&self, quality: u8) -> EpsResult<Vec<u8>> {
        let rgb = DynamicImage::ImageRgba8(self.to_rgba_image()).to_rgb8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
        Ok(buf)
    }

    /// Write a JPEG file.
    pub fn save_jpeg(&self, path: impl AsRef<Path>, quality: u8) -> EpsResult<()> {
        fs::write(path, self.encode_jpeg(quality)?)?;
        Ok(())
    }
}
