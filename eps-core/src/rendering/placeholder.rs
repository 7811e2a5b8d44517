//! Informational images for documents the interpreter cannot draw.
//!
//! Text is set with a built-in 5x7 bitmap face so that these images never
//! depend on a font being installed.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use super::graphics_state::Color;
use super::raster::RasterImage;
use crate::core::error::{EpsError, EpsResult};
use crate::core::prescan::BoundingBox;

static DRAWING_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(moveto|lineto|stroke|fill|show|setrgbcolor)\b")
        .expect("valid drawing command regex")
});

/// Number of lines that mention at least one common drawing command.
pub fn count_drawing_commands(text: &str) -> usize {
    text.lines()
        .filter(|line| DRAWING_COMMAND.is_match(line))
        .count()
}

/// Application that produced an image-based document, guessed from its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creator {
    ImageMagick,
    Adobe,
    Unknown,
}

impl Creator {
    pub fn detect(text: &str) -> Self {
        if text.contains("ImageMagick") {
            Creator::ImageMagick
        } else if text.contains("Adobe") {
            Creator::Adobe
        } else {
            Creator::Unknown
        }
    }
}

impl fmt::Display for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Creator::ImageMagick => "ImageMagick",
            Creator::Adobe => "Adobe",
            Creator::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Bordered summary for a vector document: size and a rough command count.
pub fn vector_placeholder(
    width: u32,
    height: u32,
    bbox: &BoundingBox,
    command_count: usize,
    background: Color,
) -> EpsResult<RasterImage> {
    let mut canvas = Canvas::new(width, height, background)?;
    let h = height as f32;

    canvas.border(Color::from_rgb8(0x21, 0x96, 0xF3));
    canvas.text("EPS FILE LOADED", h * 0.25, 3, Color::from_rgb8(0x19, 0x76, 0xD2));
    let dark = Color::from_rgb8(0x42, 0x42, 0x42);
    canvas.text(
        &format!("SIZE: {} X {} PT", bbox.width(), bbox.height()),
        h * 0.35,
        2,
        dark,
    );
    canvas.text(
        &format!("POSTSCRIPT COMMANDS: {}", command_count),
        h * 0.42,
        2,
        dark,
    );
    canvas.text("FILE PARSED", h * 0.55, 2, Color::from_rgb8(0x66, 0x66, 0x66));

    // Check mark badge
    let (cx, cy) = (width as f32 / 2.0, h * 0.68);
    let r = canvas.badge_radius();
    canvas.circle(cx, cy, r, Color::from_rgb8(0x4C, 0xAF, 0x50));
    let s = r * 0.375;
    canvas.polyline(
        &[(cx - s, cy), (cx - s / 3.0, cy + s * 0.66), (cx + s, cy - s * 0.66)],
        (r * 0.15).max(1.0),
        Color::white(),
    );

    Ok(canvas.finish())
}

/// Summary for an image-based document whose pixels could not be recovered.
pub fn image_based_placeholder(
    width: u32,
    height: u32,
    bbox: &BoundingBox,
    creator: Creator,
    line_count: usize,
    background: Color,
) -> EpsResult<RasterImage> {
    let mut canvas = Canvas::new(width, height, background)?;
    let h = height as f32;
    let orange = Color::from_rgb8(0xFF, 0x98, 0x00);
    let dark = Color::from_rgb8(0x42, 0x42, 0x42);
    let grey = Color::from_rgb8(0x66, 0x66, 0x66);

    canvas.border(orange);
    canvas.text("IMAGE-BASED EPS", h * 0.2, 3, Color::from_rgb8(0xFF, 0x6F, 0x00));
    canvas.text(&format!("CREATOR: {}", creator), h * 0.3, 2, dark);
    canvas.text(
        &format!("SIZE: {} X {} PT", bbox.width(), bbox.height()),
        h * 0.38,
        2,
        dark,
    );
    canvas.text(&format!("{} LINES OF POSTSCRIPT", line_count), h * 0.46, 2, dark);

    let r = canvas.badge_radius();
    canvas.circle(width as f32 / 2.0, h * 0.58, r, orange);
    canvas.text("I", h * 0.58, 3, Color::white());

    canvas.text("EMBEDDED RASTER DATA", h * 0.72, 1, grey);
    canvas.text("NEEDS A NATIVE ENGINE TO RENDER", h * 0.77, 1, grey);

    Ok(canvas.finish())
}

/// Last-resort image. Falls back to a flat fill if drawing is impossible.
pub fn error_image(width: u32, height: u32) -> RasterImage {
    let background = Color::from_rgb8(0xFF, 0xEB, 0xEE);
    match draw_error_image(width, height, background) {
        Ok(image) => image,
        Err(e) => {
            log::debug!("error image drawn flat: {}", e);
            RasterImage::filled(width, height, background)
        }
    }
}

fn draw_error_image(width: u32, height: u32, background: Color) -> EpsResult<RasterImage> {
    let mut canvas = Canvas::new(width, height, background)?;
    let h = height as f32;

    let r = canvas.badge_radius() * 1.5;
    canvas.circle(width as f32 / 2.0, h * 0.35, r, Color::from_rgb8(0xD3, 0x2F, 0x2F));
    canvas.text("!", h * 0.35, 4, Color::white());
    canvas.text(
        "ERROR RENDERING EPS",
        h * 0.55,
        2,
        Color::from_rgb8(0xC6, 0x28, 0x28),
    );

    Ok(canvas.finish())
}

/// Pixmap with a few drawing helpers in pixel coordinates.
struct Canvas {
    pixmap: Pixmap,
    /// Base pixel size of one font cell
    unit: u32,
}

impl Canvas {
    fn new(width: u32, height: u32, background: Color) -> EpsResult<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            EpsError::rendering(format!("cannot allocate {}x{} placeholder", width, height))
        })?;
        pixmap.fill(background.to_skia());
        let unit = (width.min(height) / 250).max(1);
        Ok(Canvas { pixmap, unit })
    }

    fn paint(color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = true;
        paint
    }

    fn badge_radius(&self) -> f32 {
        (self.pixmap.width().min(self.pixmap.height()) as f32 * 0.06).max(4.0)
    }

    fn border(&mut self, color: Color) {
        let (w, h) = (self.pixmap.width() as f32, self.pixmap.height() as f32);
        let inset = (w.min(h) * 0.01).clamp(2.0, 10.0);
        let Some(rect) = Rect::from_ltrb(inset, inset, w - inset, h - inset) else {
            return;
        };
        let stroke = Stroke {
            width: (inset * 0.4).max(1.0),
            ..Stroke::default()
        };
        let path = PathBuilder::from_rect(rect);
        self.pixmap.stroke_path(
            &path,
            &Self::paint(color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    fn circle(&mut self, cx: f32, cy: f32, r: f32, color: Color) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, r) {
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn polyline(&mut self, points: &[(f32, f32)], width: f32, color: Color) {
        let mut pb = PathBuilder::new();
        for (i, &(x, y)) in points.iter().enumerate() {
            if i == 0 {
                pb.move_to(x, y);
            } else {
                pb.line_to(x, y);
            }
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: tiny_skia::LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &Self::paint(color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    /// Draw `text` centered horizontally with its middle on `center_y`.
    ///
    /// `size` is a multiple of the base unit; it shrinks until the line fits
    /// the width, down to one pixel per cell.
    fn text(&mut self, text: &str, center_y: f32, size: u32, color: Color) {
        let chars: Vec<char> = text.chars().map(|c| c.to_ascii_uppercase()).collect();
        if chars.is_empty() {
            return;
        }
        let width = self.pixmap.width();
        let columns = chars.len() as u32 * GLYPH_ADVANCE - 1;
        let mut cell = size * self.unit;
        while cell > 1 && columns * cell > width.saturating_sub(width / 10) {
            cell -= 1;
        }

        let cell_f = cell as f32;
        let left = (width as f32 - (columns * cell) as f32) / 2.0;
        let top = center_y - GLYPH_ROWS as f32 * cell_f / 2.0;

        let mut pb = PathBuilder::new();
        for (i, ch) in chars.iter().enumerate() {
            let origin = left + (i as u32 * GLYPH_ADVANCE) as f32 * cell_f;
            for (row, bits) in glyph(*ch).iter().enumerate() {
                for col in 0..GLYPH_COLUMNS {
                    if bits & (0x10 >> col) != 0 {
                        if let Some(rect) = Rect::from_xywh(
                            origin + col as f32 * cell_f,
                            top + row as f32 * cell_f,
                            cell_f,
                            cell_f,
                        ) {
                            pb.push_rect(rect);
                        }
                    }
                }
            }
        }

        if let Some(path) = pb.finish() {
            let mut paint = Self::paint(color);
            paint.anti_alias = false;
            self.pixmap.fill_path(
                &path,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn finish(self) -> RasterImage {
        RasterImage::from_pixmap(self.pixmap)
    }
}

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_COLUMNS + 1;

/// Row bitmaps, top row first, bit 4 is the leftmost column.
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        _ => [0; 7],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_drawing_commands() {
        let text = "0 0 moveto 1 1 lineto stroke\n/foo { fill } def\n% comment only\nnewpath\nshowpage";
        assert_eq!(count_drawing_commands(text), 2);
        assert_eq!(count_drawing_commands("setrgbcolorx filled"), 0);
    }

    #[test]
    fn test_creator_detection() {
        assert_eq!(Creator::detect("%%Creator: ImageMagick 7"), Creator::ImageMagick);
        assert_eq!(Creator::detect("%%Creator: Adobe Illustrator"), Creator::Adobe);
        assert_eq!(Creator::detect("%%Creator: gnuplot"), Creator::Unknown);
        assert_eq!(Creator::ImageMagick.to_string(), "ImageMagick");
    }

    #[test]
    fn test_vector_placeholder_dimensions() {
        let bbox = BoundingBox::new(0, 0, 200, 100).unwrap();
        let img = vector_placeholder(200, 100, &bbox, 7, Color::white()).unwrap();
        assert_eq!((img.width(), img.height()), (200, 100));
        // Corner sits outside the border
        assert_eq!(img.pixel(0, 0), Some([255, 255, 255, 255]));
        // Badge center is filled green
        assert_eq!(img.pixel(100, 72), Some([0x4C, 0xAF, 0x50, 255]));
    }

    #[test]
    fn test_image_based_placeholder_dimensions() {
        let bbox = BoundingBox::default();
        let img = image_based_placeholder(300, 400, &bbox, Creator::Adobe, 12, Color::white())
            .unwrap();
        assert_eq!((img.width(), img.height()), (300, 400));
    }

    #[test]
    fn test_error_image() {
        let img = error_image(120, 100);
        assert_eq!((img.width(), img.height()), (120, 100));
        assert_eq!(img.pixel(0, 0), Some([0xFF, 0xEB, 0xEE, 255]));
    }

    #[test]
    fn test_error_image_with_zero_size_does_not_panic() {
        let img = error_image(0, 10);
        assert_eq!(img.width(), 0);
        assert!(img.data().is_empty());
    }

    #[test]
    fn test_unknown_glyph_is_blank() {
        assert_eq!(glyph('~'), [0; 7]);
        assert_ne!(glyph('A'), [0; 7]);
    }
}
